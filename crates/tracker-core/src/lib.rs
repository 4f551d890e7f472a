//! Task tracking core: a task list with per-task notes, three status
//! columns, search, statistics and a confirmation step in front of every
//! delete. Storage and the view layer are injected, see [`datastore`] and
//! [`view`].

pub mod confirm;
pub mod datastore;
pub mod datetime;
pub mod filter;
pub mod forms;
pub mod render;
pub mod store;
pub mod task;
pub mod view;

pub use confirm::{ConfirmationGate, PendingAction};
pub use datastore::{FileSlot, JsonRepository, MemorySlot, RecoveryPolicy, Slot, TaskRepository};
pub use store::TaskStore;
pub use task::{NewNote, NewTask, Note, Status, Task, TaskPatch};
pub use view::{ModalState, NullView, TaskView};

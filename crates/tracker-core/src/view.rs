use tracing::trace;

use crate::forms::{EditorForm, EditorMode};
use crate::render::Stats;
use crate::task::{Task, TaskId};

/// What the store tells the view layer. Every method defaults to doing
/// nothing so a view only implements the signals it cares about.
pub trait TaskView {
    /// After every mutation. Re-render columns and statistics from `tasks`.
    fn tasks_changed(&mut self, _tasks: &[Task]) {}

    /// After a note was added to or removed from `task`.
    fn notes_changed(&mut self, _task: &Task) {}

    fn show_confirmation(&mut self, _message: &str) {}

    fn dismiss_confirmation(&mut self) {}

    fn open_editor(&mut self, _form: EditorForm) {}

    fn close_editor(&mut self) {}

    /// `task_id` was deleted; close the editor if it is editing that task.
    fn close_editor_for(&mut self, _task_id: &str) {}

    fn open_details(&mut self, _task: &Task) {}

    fn close_details(&mut self) {}

    /// `task_id` was deleted; close its details dialog if open.
    fn close_details_for(&mut self, _task_id: &str) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullView;

impl TaskView for NullView {}

/// Headless view: tracks which dialogs are open and what they point at.
#[derive(Debug, Clone, Default)]
pub struct ModalState {
    pub editor: Option<EditorForm>,
    pub details: Option<TaskId>,
    pub confirmation: Option<String>,
    pub stats: Stats,
    pub task_renders: usize,
    pub notes_renders: Vec<TaskId>,
}

impl ModalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn editor_open(&self) -> bool {
        self.editor.is_some()
    }

    pub fn details_open_for(&self, task_id: &str) -> bool {
        self.details.as_deref() == Some(task_id)
    }

    pub fn confirmation_open(&self) -> bool {
        self.confirmation.is_some()
    }
}

impl TaskView for ModalState {
    fn tasks_changed(&mut self, tasks: &[Task]) {
        self.stats = Stats::from_tasks(tasks);
        self.task_renders += 1;
        trace!(renders = self.task_renders, "tasks re-rendered");
    }

    fn notes_changed(&mut self, task: &Task) {
        self.notes_renders.push(task.id.clone());
    }

    fn show_confirmation(&mut self, message: &str) {
        self.confirmation = Some(message.to_string());
    }

    fn dismiss_confirmation(&mut self) {
        self.confirmation = None;
    }

    fn open_editor(&mut self, form: EditorForm) {
        self.editor = Some(form);
    }

    fn close_editor(&mut self) {
        self.editor = None;
    }

    fn close_editor_for(&mut self, task_id: &str) {
        let editing_it = matches!(
            self.editor.as_ref().map(|f| &f.mode),
            Some(EditorMode::Edit(id)) if id == task_id
        );
        if editing_it {
            self.editor = None;
        }
    }

    fn open_details(&mut self, task: &Task) {
        self.details = Some(task.id.clone());
    }

    fn close_details(&mut self) {
        self.details = None;
    }

    fn close_details_for(&mut self, task_id: &str) {
        if self.details_open_for(task_id) {
            self.details = None;
        }
    }
}

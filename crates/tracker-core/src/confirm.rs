use tracing::debug;

use crate::task::{NoteId, TaskId};

pub const DELETE_TASK_MESSAGE: &str =
    "Are you sure you want to delete this task? This action cannot be undone.";
pub const DELETE_NOTE_MESSAGE: &str = "Are you sure you want to delete this note?";

/// Destructive operations that wait for an explicit yes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    DeleteTask { task_id: TaskId },
    DeleteNote { task_id: TaskId, note_id: NoteId },
}

impl PendingAction {
    pub fn message(&self) -> &'static str {
        match self {
            PendingAction::DeleteTask { .. } => DELETE_TASK_MESSAGE,
            PendingAction::DeleteNote { .. } => DELETE_NOTE_MESSAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub message: String,
    pub action: PendingAction,
}

/// Holds at most one pending action. A new request replaces whatever was
/// waiting; the old action is dropped without running.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationGate {
    pending: Option<PendingConfirmation>,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, message: impl Into<String>, action: PendingAction) {
        if let Some(previous) = &self.pending {
            debug!(dropped = ?previous.action, "replacing pending confirmation");
        }
        self.pending = Some(PendingConfirmation {
            message: message.into(),
            action,
        });
    }

    /// Hands the held action to the caller exactly once and returns to idle.
    pub fn take(&mut self) -> Option<PendingAction> {
        self.pending.take().map(|p| p.action)
    }

    /// Drops the held action, if any. Returns whether anything was dropped.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn pending(&self) -> Option<&PendingConfirmation> {
        self.pending.as_ref()
    }

    pub fn is_awaiting(&self) -> bool {
        self.pending.is_some()
    }
}

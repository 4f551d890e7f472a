//! Task editor and note forms. The store trusts its input; these forms are
//! where titles get checked before anything reaches it.

use anyhow::anyhow;
use chrono::NaiveDate;
use tracing::debug;

use crate::datastore::TaskRepository;
use crate::datetime::Clock;
use crate::store::TaskStore;
use crate::task::{NewNote, NewTask, NoteId, Status, Task, TaskId, TaskPatch};
use crate::view::TaskView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit(TaskId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorForm {
    pub mode: EditorMode,
    pub title: String,
    pub deadline: NaiveDate,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    Created(TaskId),
    Updated(TaskId),
    /// The task being edited disappeared before submit.
    Missing(TaskId),
}

impl EditorForm {
    /// Blank form with the deadline preset to today.
    pub fn for_new(today: NaiveDate) -> Self {
        Self {
            mode: EditorMode::Create,
            title: String::new(),
            deadline: today,
            status: Status::default(),
        }
    }

    pub fn for_task(task: &Task) -> Self {
        Self {
            mode: EditorMode::Edit(task.id.clone()),
            title: task.title.clone(),
            deadline: task.deadline,
            status: task.status,
        }
    }

    pub fn heading(&self) -> &'static str {
        match self.mode {
            EditorMode::Create => "New Task",
            EditorMode::Edit(_) => "Edit Task",
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.title.trim().is_empty() {
            return Err(anyhow!("task title cannot be empty"));
        }
        Ok(())
    }

    /// Creates or updates depending on the mode, then closes the editor.
    pub fn submit<R, V, C>(self, store: &mut TaskStore<R, V, C>) -> anyhow::Result<Submitted>
    where
        R: TaskRepository,
        V: TaskView,
        C: Clock,
    {
        self.validate()?;

        let outcome = match self.mode {
            EditorMode::Create => {
                let fields = NewTask::new(self.title, self.deadline).with_status(self.status);
                Submitted::Created(store.add_task(fields)?)
            }
            EditorMode::Edit(id) => {
                let patch = TaskPatch {
                    title: Some(self.title),
                    deadline: Some(self.deadline),
                    status: Some(self.status),
                };
                if store.update_task(&id, patch)? {
                    Submitted::Updated(id)
                } else {
                    Submitted::Missing(id)
                }
            }
        };

        debug!(?outcome, "editor submitted");
        store.close_editor();
        Ok(outcome)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteForm {
    pub task_id: TaskId,
    pub date: NaiveDate,
    pub content: String,
}

impl NoteForm {
    pub fn for_task(task_id: impl Into<TaskId>, today: NaiveDate) -> Self {
        Self {
            task_id: task_id.into(),
            date: today,
            content: String::new(),
        }
    }

    /// Adds the note and clears the text, keeping the date for the next one.
    pub fn submit<R, V, C>(
        &mut self,
        store: &mut TaskStore<R, V, C>,
    ) -> anyhow::Result<Option<NoteId>>
    where
        R: TaskRepository,
        V: TaskView,
        C: Clock,
    {
        let fields = NewNote {
            date: self.date,
            content: std::mem::take(&mut self.content),
        };
        store.add_note(&self.task_id, fields)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::datastore::{JsonRepository, MemorySlot};
    use crate::datetime::FixedClock;
    use crate::view::ModalState;

    type Store = TaskStore<JsonRepository<MemorySlot>, ModalState, FixedClock>;

    fn store() -> Store {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 4, 2, 8, 0, 0).unwrap());
        TaskStore::open_with_clock(JsonRepository::new(MemorySlot::new()), ModalState::new(), clock)
            .unwrap()
    }

    #[test]
    fn blank_title_is_rejected_before_the_store() {
        let mut store = store();
        let mut form = EditorForm::for_new(store.today());
        form.title = "   ".to_string();
        assert!(form.submit(&mut store).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn create_then_edit_round() {
        let mut store = store();
        store.open_new_task_editor();
        let form = store.view().editor.clone().unwrap();
        assert_eq!(form.heading(), "New Task");
        assert_eq!(form.deadline, NaiveDate::from_ymd_opt(2024, 4, 2).unwrap());

        let mut form = form;
        form.title = "Write report".to_string();
        let Submitted::Created(id) = form.submit(&mut store).unwrap() else {
            panic!("expected a new task");
        };
        assert!(!store.view().editor_open());

        let mut edit = EditorForm::for_task(store.get_task(&id).unwrap());
        assert_eq!(edit.heading(), "Edit Task");
        edit.status = Status::InProgress;
        assert_eq!(edit.submit(&mut store).unwrap(), Submitted::Updated(id.clone()));
        assert_eq!(store.get_task(&id).unwrap().status, Status::InProgress);
    }

    #[test]
    fn editing_a_vanished_task_reports_missing() {
        let mut store = store();
        let form = EditorForm {
            mode: EditorMode::Edit("gone".to_string()),
            title: "x".to_string(),
            deadline: store.today(),
            status: Status::Completed,
        };
        assert_eq!(form.submit(&mut store).unwrap(), Submitted::Missing("gone".to_string()));
        assert!(store.is_empty());
    }

    #[test]
    fn note_form_clears_content_after_submit() {
        let mut store = store();
        let id = store
            .add_task(NewTask::new("t", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()))
            .unwrap();
        let mut form = NoteForm::for_task(id.clone(), store.today());
        form.content = "called the vendor".to_string();
        assert!(form.submit(&mut store).unwrap().is_some());
        assert!(form.content.is_empty());
        assert_eq!(form.date, store.today());
        assert_eq!(store.get_task(&id).unwrap().notes[0].content, "called the vendor");
    }
}

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::confirm::{ConfirmationGate, PendingAction, PendingConfirmation};
use crate::datastore::TaskRepository;
use crate::datetime::{Clock, SystemClock};
use crate::filter::{Board, partition};
use crate::forms::EditorForm;
use crate::render::{NotesPanel, RenderOptions, RenderedColumn, RowAction, Stats, render_board};
use crate::task::{NewNote, NewTask, Note, NoteId, Task, TaskId, TaskPatch, new_id};
use crate::view::TaskView;

/// Owns the task list. Every mutation is written through the repository
/// and announced to the view before the call returns.
///
/// Lookups by id never fail: a missing task or note makes the operation a
/// no-op, reported through the `bool`/`Option` return value. The only errors
/// are persistence failures, and a failed save leaves the store as it was.
pub struct TaskStore<R, V, C = SystemClock> {
    tasks: Vec<Task>,
    repo: R,
    view: V,
    clock: C,
    gate: ConfirmationGate,
    render: RenderOptions,
}

impl<R: TaskRepository, V: TaskView> TaskStore<R, V, SystemClock> {
    pub fn open(repo: R, view: V) -> anyhow::Result<Self> {
        Self::open_with_clock(repo, view, SystemClock)
    }
}

impl<R, V, C> TaskStore<R, V, C>
where
    R: TaskRepository,
    V: TaskView,
    C: Clock,
{
    #[tracing::instrument(skip_all)]
    pub fn open_with_clock(repo: R, view: V, clock: C) -> anyhow::Result<Self> {
        let tasks = repo.load()?;
        info!(count = tasks.len(), "opened task store");

        let mut store = Self {
            tasks,
            repo,
            view,
            clock,
            gate: ConfirmationGate::new(),
            render: RenderOptions::default(),
        };
        store.view.tasks_changed(&store.tasks);
        Ok(store)
    }

    pub fn with_render_options(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn render_options(&self) -> &RenderOptions {
        &self.render
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    #[tracing::instrument(skip(self, fields), fields(title = %fields.title))]
    pub fn add_task(&mut self, fields: NewTask) -> anyhow::Result<TaskId> {
        let id = self.fresh_task_id();
        let mut next = self.tasks.clone();
        next.push(Task::new(id.clone(), fields, self.clock.now()));
        self.commit(next)?;

        debug!(task_id = %id, count = self.tasks.len(), "task added");
        Ok(id)
    }

    #[tracing::instrument(skip(self, patch))]
    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> anyhow::Result<bool> {
        let mut next = self.tasks.clone();
        let Some(task) = next.iter_mut().find(|t| t.id == id) else {
            debug!("update for unknown task ignored");
            return Ok(false);
        };

        patch.apply(task);
        self.commit(next)?;
        Ok(true)
    }

    /// Asks for confirmation; the task goes away on `confirm`.
    #[tracing::instrument(skip(self))]
    pub fn delete_task(&mut self, id: &str) {
        self.request_confirmation(PendingAction::DeleteTask {
            task_id: id.to_string(),
        });
    }

    #[tracing::instrument(skip(self, fields))]
    pub fn add_note(&mut self, task_id: &str, fields: NewNote) -> anyhow::Result<Option<NoteId>> {
        let now = self.clock.now();
        let mut next = self.tasks.clone();
        let Some(task) = next.iter_mut().find(|t| t.id == task_id) else {
            debug!("note for unknown task ignored");
            return Ok(None);
        };

        let mut note_id = new_id();
        while task.note(&note_id).is_some() {
            note_id = new_id();
        }
        task.notes.insert(0, Note::new(note_id.clone(), fields, now));

        self.commit(next)?;
        self.refresh_notes(task_id);
        debug!(note_id = %note_id, "note added");
        Ok(Some(note_id))
    }

    /// Asks for confirmation; the note goes away on `confirm`.
    #[tracing::instrument(skip(self))]
    pub fn delete_note(&mut self, task_id: &str, note_id: &str) {
        self.request_confirmation(PendingAction::DeleteNote {
            task_id: task_id.to_string(),
            note_id: note_id.to_string(),
        });
    }

    pub fn pending_confirmation(&self) -> Option<&PendingConfirmation> {
        self.gate.pending()
    }

    /// Runs the held action, if any, and closes the confirmation dialog.
    #[tracing::instrument(skip(self))]
    pub fn confirm(&mut self) -> anyhow::Result<Option<PendingAction>> {
        let Some(action) = self.gate.take() else {
            self.view.dismiss_confirmation();
            return Ok(None);
        };

        let result = self.execute(&action);
        self.view.dismiss_confirmation();
        result?;
        Ok(Some(action))
    }

    #[tracing::instrument(skip(self))]
    pub fn cancel(&mut self) -> bool {
        let dropped = self.gate.cancel();
        self.view.dismiss_confirmation();
        dropped
    }

    pub fn board(&self, search: &str) -> Board<'_> {
        partition(&self.tasks, search)
    }

    pub fn rendered_board(&self, search: &str) -> Vec<RenderedColumn> {
        render_board(&self.board(search), &self.render)
    }

    pub fn stats(&self) -> Stats {
        Stats::from_tasks(&self.tasks)
    }

    pub fn notes_panel(&self, task_id: &str) -> Option<NotesPanel> {
        self.get_task(task_id)
            .map(|task| NotesPanel::from_notes(&task.notes, &self.render))
    }

    /// Routes a row affordance. Returns false when the row's task is gone.
    #[tracing::instrument(skip(self))]
    pub fn dispatch(&mut self, action: RowAction) -> bool {
        debug!(task_id = action.task_id(), "row action");
        match action {
            RowAction::ViewDetails(id) => match self.tasks.iter().find(|t| t.id == id) {
                Some(task) => {
                    self.view.open_details(task);
                    self.view.notes_changed(task);
                    true
                }
                None => false,
            },
            RowAction::Edit(id) => match self.tasks.iter().find(|t| t.id == id) {
                Some(task) => {
                    self.view.open_editor(EditorForm::for_task(task));
                    true
                }
                None => false,
            },
            RowAction::Delete(id) => {
                let found = self.get_task(&id).is_some();
                self.delete_task(&id);
                found
            }
        }
    }

    pub fn open_new_task_editor(&mut self) {
        let form = EditorForm::for_new(self.clock.today());
        self.view.open_editor(form);
    }

    pub fn close_editor(&mut self) {
        self.view.close_editor();
    }

    pub fn close_details(&mut self) {
        self.view.close_details();
    }

    fn request_confirmation(&mut self, action: PendingAction) {
        let message = action.message();
        self.gate.request(message, action);
        self.view.show_confirmation(message);
    }

    fn execute(&mut self, action: &PendingAction) -> anyhow::Result<bool> {
        match action {
            PendingAction::DeleteTask { task_id } => {
                let mut next = self.tasks.clone();
                next.retain(|t| &t.id != task_id);
                let removed = next.len() != self.tasks.len();

                self.commit(next)?;
                self.view.close_editor_for(task_id);
                self.view.close_details_for(task_id);
                info!(task_id = %task_id, removed, "task deleted");
                Ok(removed)
            }
            PendingAction::DeleteNote { task_id, note_id } => {
                let mut next = self.tasks.clone();
                let Some(task) = next.iter_mut().find(|t| &t.id == task_id) else {
                    debug!(task_id = %task_id, "note delete for unknown task ignored");
                    return Ok(false);
                };
                let before = task.notes.len();
                task.notes.retain(|n| &n.id != note_id);
                let removed = task.notes.len() != before;

                self.commit(next)?;
                self.refresh_notes(task_id);
                info!(task_id = %task_id, note_id = %note_id, removed, "note deleted");
                Ok(removed)
            }
        }
    }

    /// Saves `next` and only then makes it the current list. A failed save
    /// leaves memory, storage and the view as they were.
    fn commit(&mut self, next: Vec<Task>) -> anyhow::Result<()> {
        self.repo.save(&next)?;
        self.tasks = next;
        self.view.tasks_changed(&self.tasks);
        Ok(())
    }

    fn refresh_notes(&mut self, task_id: &str) {
        if let Some(task) = self.tasks.iter().find(|t| t.id == task_id) {
            self.view.notes_changed(task);
        }
    }

    fn fresh_task_id(&self) -> TaskId {
        loop {
            let id = new_id();
            if self.get_task(&id).is_none() {
                return id;
            }
        }
    }
}

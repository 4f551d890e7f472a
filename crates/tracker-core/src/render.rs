use chrono::Local;

use crate::datetime::{DEFAULT_DATE_FORMAT, format_date};
use crate::filter::Board;
use crate::task::{Note, NoteId, Status, Task, TaskId};

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub date_format: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl RenderOptions {
    pub fn new(date_format: impl Into<String>) -> Self {
        Self {
            date_format: date_format.into(),
        }
    }
}

/// Affordances attached to every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAction {
    ViewDetails(TaskId),
    Edit(TaskId),
    Delete(TaskId),
}

impl RowAction {
    pub fn task_id(&self) -> &str {
        match self {
            RowAction::ViewDetails(id) | RowAction::Edit(id) | RowAction::Delete(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePreview {
    pub content: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub id: TaskId,
    pub title: String,
    pub deadline: String,
    pub status: Status,
    pub latest_note: Option<NotePreview>,
    pub actions: [RowAction; 3],
}

impl TaskRow {
    pub fn from_task(task: &Task, opts: &RenderOptions) -> Self {
        // Preview is the most recently added note, not the latest by date.
        let latest_note = task.latest_note().map(|note| NotePreview {
            content: note.content.clone(),
            date: format_date(note.date, &opts.date_format),
        });

        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            deadline: format_date(task.deadline, &opts.date_format),
            status: task.status,
            latest_note,
            actions: [
                RowAction::ViewDetails(task.id.clone()),
                RowAction::Edit(task.id.clone()),
                RowAction::Delete(task.id.clone()),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedColumn {
    pub status: Status,
    pub rows: Vec<TaskRow>,
}

impl RenderedColumn {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[tracing::instrument(skip_all)]
pub fn render_board(board: &Board<'_>, opts: &RenderOptions) -> Vec<RenderedColumn> {
    board
        .columns()
        .iter()
        .map(|column| RenderedColumn {
            status: column.status,
            rows: column
                .tasks
                .iter()
                .map(|task| TaskRow::from_task(task, opts))
                .collect(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEntry {
    pub id: NoteId,
    pub date: String,
    pub created_time: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesPanel {
    Empty,
    Timeline(Vec<NoteEntry>),
}

impl NotesPanel {
    pub fn from_notes(notes: &[Note], opts: &RenderOptions) -> Self {
        if notes.is_empty() {
            return NotesPanel::Empty;
        }

        let entries = sorted_by_date_desc(notes)
            .into_iter()
            .map(|note| NoteEntry {
                id: note.id.clone(),
                date: format_date(note.date, &opts.date_format),
                created_time: note
                    .created_at
                    .with_timezone(&Local)
                    .format("%H:%M")
                    .to_string(),
                content: note.content.clone(),
            })
            .collect();
        NotesPanel::Timeline(entries)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, NotesPanel::Empty)
    }

    pub fn entries(&self) -> &[NoteEntry] {
        match self {
            NotesPanel::Empty => &[],
            NotesPanel::Timeline(entries) => entries,
        }
    }
}

/// Newest `date` first. The sort is stable, so notes sharing a date keep
/// their storage order.
pub fn sorted_by_date_desc(notes: &[Note]) -> Vec<&Note> {
    let mut sorted: Vec<&Note> = notes.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl Stats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut stats = Stats {
            total: tasks.len(),
            ..Stats::default()
        };
        for task in tasks {
            match task.status {
                Status::NotStarted => stats.not_started += 1,
                Status::InProgress => stats.in_progress += 1,
                Status::Completed => stats.completed += 1,
            }
        }
        stats
    }

    /// Tasks nobody has started yet.
    pub fn pending(&self) -> usize {
        self.not_started
    }

    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::NotStarted => self.not_started,
            Status::InProgress => self.in_progress,
            Status::Completed => self.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::filter::partition;
    use crate::task::{NewNote, NewTask};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn note(id: &str, on: NaiveDate, content: &str) -> Note {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        Note::new(
            id.to_string(),
            NewNote {
                date: on,
                content: content.to_string(),
            },
            now,
        )
    }

    fn task(id: &str, status: Status) -> Task {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        Task::new(
            id.to_string(),
            NewTask::new(format!("task {id}"), date(2024, 6, 30)).with_status(status),
            now,
        )
    }

    #[test]
    fn notes_panel_sorts_by_date_descending() {
        let notes = vec![
            note("a", date(2024, 1, 5), "first"),
            note("b", date(2024, 3, 1), "second"),
            note("c", date(2024, 2, 10), "third"),
        ];
        let dates: Vec<NaiveDate> = sorted_by_date_desc(&notes).iter().map(|n| n.date).collect();
        assert_eq!(dates, vec![date(2024, 3, 1), date(2024, 2, 10), date(2024, 1, 5)]);

        let panel = NotesPanel::from_notes(&notes, &RenderOptions::default());
        let shown: Vec<&str> = panel.entries().iter().map(|e| e.date.as_str()).collect();
        assert_eq!(shown, vec!["3/1/2024", "2/10/2024", "1/5/2024"]);
    }

    #[test]
    fn equal_dates_keep_storage_order() {
        let notes = vec![
            note("x", date(2024, 1, 1), ""),
            note("y", date(2024, 1, 1), ""),
        ];
        let ids: Vec<&str> = sorted_by_date_desc(&notes).iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[test]
    fn empty_notes_render_empty_panel() {
        let panel = NotesPanel::from_notes(&[], &RenderOptions::default());
        assert!(panel.is_empty());
        assert!(panel.entries().is_empty());
    }

    #[test]
    fn row_previews_first_stored_note() {
        let mut t = task("1", Status::InProgress);
        // Storage order is newest-added first; the older-dated note was added last.
        t.notes = vec![
            note("new", date(2024, 1, 2), "added last"),
            note("old", date(2024, 5, 1), "added first"),
        ];
        let row = TaskRow::from_task(&t, &RenderOptions::default());
        assert_eq!(
            row.latest_note,
            Some(NotePreview {
                content: "added last".to_string(),
                date: "1/2/2024".to_string(),
            })
        );
        assert_eq!(row.deadline, "6/30/2024");
        assert_eq!(row.actions[2], RowAction::Delete("1".to_string()));
    }

    #[test]
    fn row_without_notes_has_no_preview() {
        let opts = RenderOptions::new("%Y-%m-%d");
        let row = TaskRow::from_task(&task("1", Status::NotStarted), &opts);
        assert_eq!(row.latest_note, None);
        assert_eq!(row.deadline, "2024-06-30");
    }

    #[test]
    fn stats_count_every_status() {
        let tasks = vec![
            task("1", Status::NotStarted),
            task("2", Status::NotStarted),
            task("3", Status::InProgress),
            task("4", Status::Completed),
            task("5", Status::Completed),
            task("6", Status::Completed),
        ];
        let stats = Stats::from_tasks(&tasks);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.pending(), 2);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.completed, 3);
    }

    #[test]
    fn board_renders_columns_in_display_order() {
        let tasks = vec![task("1", Status::Completed), task("2", Status::NotStarted)];
        let board = partition(&tasks, "");
        let columns = render_board(&board, &RenderOptions::default());
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].rows[0].id, "2");
        assert!(columns[1].is_empty());
        assert_eq!(columns[2].rows[0].id, "1");
    }
}

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::datetime::iso_millis_serde;

pub type TaskId = String;
pub type NoteId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl Status {
    /// Column order on the board.
    pub const ALL: [Status; 3] = [Status::NotStarted, Status::InProgress, Status::Completed];

    pub fn label(self) -> &'static str {
        match self {
            Status::NotStarted => "Not Started",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "notstarted" | "pending" | "todo" => Ok(Status::NotStarted),
            "inprogress" | "progress" | "doing" => Ok(Status::InProgress),
            "completed" | "done" => Ok(Status::Completed),
            _ => Err(anyhow!(
                "invalid status: {s} (expected not-started, in-progress or completed)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,

    pub date: NaiveDate,

    #[serde(default)]
    pub content: String,

    #[serde(with = "iso_millis_serde")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,

    pub title: String,

    pub deadline: NaiveDate,

    #[serde(default)]
    pub status: Status,

    #[serde(with = "iso_millis_serde")]
    pub created_at: DateTime<Utc>,

    /// Newest first: `add_note` prepends.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notes: Vec<Note>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Caller-supplied fields for a new task. The store fills in id, creation
/// time and the empty notes list. Nothing here is validated by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub deadline: NaiveDate,
    pub status: Status,
}

impl NewTask {
    pub fn new(title: impl Into<String>, deadline: NaiveDate) -> Self {
        Self {
            title: title.into(),
            deadline,
            status: Status::default(),
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }
}

/// Shallow partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: Option<Status>,
}

impl TaskPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub date: NaiveDate,
    pub content: String,
}

impl Task {
    pub fn new(id: TaskId, fields: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: fields.title,
            deadline: fields.deadline,
            status: fields.status,
            created_at: now,
            notes: vec![],
            extra: BTreeMap::new(),
        }
    }

    /// The most recently added note, which is not necessarily the one with
    /// the latest `date`.
    pub fn latest_note(&self) -> Option<&Note> {
        self.notes.first()
    }

    pub fn note(&self, note_id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == note_id)
    }

    pub fn matches_title(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
    }
}

impl Note {
    pub fn new(id: NoteId, fields: NewNote, now: DateTime<Utc>) -> Self {
        Self {
            id,
            date: fields.date,
            content: fields.content,
            created_at: now,
        }
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Note>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Note>>::deserialize(deserializer)?.unwrap_or_default())
}

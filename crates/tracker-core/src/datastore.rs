use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::task::Task;

/// Storage key the browser build has always used.
pub const DEFAULT_STORAGE_KEY: &str = "projectTrackerTasks";

/// A durable string key-value slot.
pub trait Slot {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// Loads and saves the whole task list in one go.
pub trait TaskRepository {
    fn load(&self) -> anyhow::Result<Vec<Task>>;
    fn save(&self, tasks: &[Task]) -> anyhow::Result<()>;
}

/// What to do when the stored payload cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryPolicy {
    #[default]
    FailFast,
    StartEmpty,
}

impl FromStr for RecoveryPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" | "failfast" | "fail-fast" => Ok(Self::FailFast),
            "empty" | "start-empty" => Ok(Self::StartEmpty),
            other => Err(anyhow!("invalid storage.recovery setting: {other}")),
        }
    }
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug)]
pub struct FileSlot {
    pub data_dir: PathBuf,
}

impl FileSlot {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened file slot");
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }
}

impl Slot for FileSlot {
    #[tracing::instrument(skip(self))]
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => {
                debug!(file = %path.display(), bytes = raw.len(), "read slot");
                Ok(Some(raw))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed reading {}", path.display())),
        }
    }

    #[tracing::instrument(skip(self, value))]
    fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        debug!(file = %path.display(), bytes = value.len(), "writing slot atomically");

        let mut temp = NamedTempFile::new_in(&self.data_dir)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }
}

/// In-process slot. Clones share the same map, so a test can keep a handle
/// and inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    entries: Rc<RefCell<HashMap<String, String>>>,
    writes: Rc<RefCell<usize>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let slot = Self::default();
        slot.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        slot
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }
}

impl Slot for MemorySlot {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.get(key))
    }

    fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        *self.writes.borrow_mut() += 1;
        Ok(())
    }
}

/// JSON array of tasks stored under a single key.
#[derive(Debug)]
pub struct JsonRepository<S> {
    slot: S,
    key: String,
    recovery: RecoveryPolicy,
}

impl<S: Slot> JsonRepository<S> {
    pub fn new(slot: S) -> Self {
        Self {
            slot,
            key: DEFAULT_STORAGE_KEY.to_string(),
            recovery: RecoveryPolicy::default(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_recovery(mut self, recovery: RecoveryPolicy) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn quarantine_key(&self) -> String {
        format!("{}.corrupt", self.key)
    }
}

impl<S: Slot> TaskRepository for JsonRepository<S> {
    #[tracing::instrument(skip(self), fields(key = %self.key))]
    fn load(&self) -> anyhow::Result<Vec<Task>> {
        let Some(raw) = self.slot.read(&self.key)? else {
            debug!("no stored tasks");
            return Ok(Vec::new());
        };

        // Missing `notes` containers are filled in by the Task decoder.
        match serde_json::from_str::<Vec<Task>>(&raw) {
            Ok(tasks) => {
                debug!(count = tasks.len(), "loaded tasks");
                Ok(tasks)
            }
            Err(err) => match self.recovery {
                RecoveryPolicy::FailFast => {
                    Err(err)
                        .with_context(|| format!("failed parsing stored tasks under {}", self.key))
                }
                RecoveryPolicy::StartEmpty => {
                    warn!(
                        error = %err,
                        quarantine = %self.quarantine_key(),
                        "stored tasks unreadable; starting empty"
                    );
                    self.slot.write(&self.quarantine_key(), &raw)?;
                    Ok(Vec::new())
                }
            },
        }
    }

    #[tracing::instrument(skip(self, tasks), fields(key = %self.key, count = tasks.len()))]
    fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        let encoded = serde_json::to_string(tasks).context("failed encoding tasks")?;
        self.slot
            .write(&self.key, &encoded)
            .with_context(|| format!("failed saving tasks under {}", self.key))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::task::{NewNote, NewTask, Note, Status};

    fn tasks() -> Vec<Task> {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 9, 30, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let mut first = Task::new("a".into(), NewTask::new("Alpha", date), now);
        first.notes.push(Note::new(
            "n".into(),
            NewNote {
                date,
                content: "hello".into(),
            },
            now,
        ));
        let second = Task::new(
            "b".into(),
            NewTask::new("Beta", date).with_status(Status::Completed),
            now,
        );
        vec![first, second]
    }

    #[test]
    fn absent_key_loads_empty() {
        let repo = JsonRepository::new(MemorySlot::new());
        assert!(repo.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let repo = JsonRepository::new(MemorySlot::new());
        let original = tasks();
        repo.save(&original).unwrap();
        assert_eq!(repo.load().unwrap(), original);
    }

    #[test]
    fn legacy_records_gain_notes() {
        let raw = r#"[{"id":"1700000000000","title":"old","deadline":"2023-11-14","status":"Not Started","createdAt":"2023-11-14T22:13:20.000Z"}]"#;
        let repo = JsonRepository::new(MemorySlot::with_entry(DEFAULT_STORAGE_KEY, raw));
        let loaded = repo.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "1700000000000");
        assert!(loaded[0].notes.is_empty());
    }

    #[test]
    fn corrupt_payload_fails_fast_by_default() {
        let slot = MemorySlot::with_entry(DEFAULT_STORAGE_KEY, "{not json");
        let repo = JsonRepository::new(slot.clone());
        let err = repo.load().unwrap_err();
        assert!(format!("{err:#}").contains(DEFAULT_STORAGE_KEY));
        assert_eq!(slot.write_count(), 0);
    }

    #[test]
    fn corrupt_payload_can_start_empty() {
        let slot = MemorySlot::with_entry("k", "{not json");
        let repo = JsonRepository::new(slot.clone())
            .with_key("k")
            .with_recovery(RecoveryPolicy::StartEmpty);
        assert!(repo.load().unwrap().is_empty());
        assert_eq!(slot.get("k.corrupt").as_deref(), Some("{not json"));
    }

    #[test]
    fn recovery_policy_parses() {
        assert_eq!("fail".parse::<RecoveryPolicy>().unwrap(), RecoveryPolicy::FailFast);
        assert_eq!("empty".parse::<RecoveryPolicy>().unwrap(), RecoveryPolicy::StartEmpty);
        assert!("maybe".parse::<RecoveryPolicy>().is_err());
    }

    #[test]
    fn file_slot_reads_back_writes() {
        let temp = tempfile::tempdir().unwrap();
        let slot = FileSlot::open(temp.path()).unwrap();
        assert_eq!(slot.read("k").unwrap(), None);
        slot.write("k", "[]").unwrap();
        assert_eq!(slot.read("k").unwrap().as_deref(), Some("[]"));
        assert!(slot.path_for("k").exists());
    }
}

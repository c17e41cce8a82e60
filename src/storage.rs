use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{SettingsFile, TaskRecord};

const TASKS_FILE: &str = "tasks.json";
const SETTINGS_FILE: &str = "settings.json";
const UNREADABLE_PREFIX: &str = "tasks-unreadable";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Format(String),
}

impl StorageError {
    /// True when the file exists but its content cannot be used, as opposed to
    /// failing to read it at all.
    pub fn is_content_error(&self) -> bool {
        matches!(self, StorageError::Json(_) | StorageError::Format(_))
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Json(err) => write!(f, "json error: {err}"),
            StorageError::Format(message) => write!(f, "format error: {message}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// Records read from `tasks.json`, plus how many entries were dropped.
#[derive(Debug, Default)]
pub struct LoadedTasks {
    pub records: Vec<TaskRecord>,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.root.join(TASKS_FILE)
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Reads the task list.
    ///
    /// Returns `Ok(None)` when no file exists yet. Entries that are not valid
    /// task records are skipped with a warning instead of failing the load;
    /// only a file that is not a JSON array at all is an error.
    pub fn load_tasks(&self) -> Result<Option<LoadedTasks>, StorageError> {
        let path = self.tasks_path();
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;

        // Parsed from bytes so bad encoding is a content error, not an IO one.
        let value: serde_json::Value = serde_json::from_slice(&buf)?;
        let entries = match value {
            serde_json::Value::Array(entries) => entries,
            other => {
                return Err(StorageError::Format(format!(
                    "expected a list of tasks, found {}",
                    json_kind(&other)
                )))
            }
        };

        let mut loaded = LoadedTasks::default();
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<TaskRecord>(entry) {
                Ok(record) if !record.description.trim().is_empty() => {
                    loaded.records.push(record)
                }
                Ok(_) => {
                    log::warn!("storage: skipping task record index={index} reason=blank description");
                    loaded.skipped += 1;
                }
                Err(err) => {
                    log::warn!("storage: skipping task record index={index} reason={err}");
                    loaded.skipped += 1;
                }
            }
        }
        Ok(Some(loaded))
    }

    pub fn save_tasks(&self, records: &[TaskRecord]) -> Result<(), StorageError> {
        self.ensure_dirs()?;
        self.write_atomic(self.tasks_path(), &records)
    }

    /// Moves an unreadable `tasks.json` out of the way so the next save does
    /// not overwrite it. Returns the new location.
    pub fn quarantine_tasks(&self) -> Result<PathBuf, StorageError> {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        let mut target = self
            .root
            .join(format!("{UNREADABLE_PREFIX}-{timestamp}.json"));
        let mut suffix = 1;
        while target.exists() {
            target = self
                .root
                .join(format!("{UNREADABLE_PREFIX}-{timestamp}-{suffix}.json"));
            suffix += 1;
        }
        fs::rename(self.tasks_path(), &target)?;
        Ok(target)
    }

    pub fn load_settings(&self) -> Result<SettingsFile, StorageError> {
        self.load_json(self.root.join(SETTINGS_FILE))
    }

    pub fn save_settings(&self, data: &SettingsFile) -> Result<(), StorageError> {
        self.ensure_dirs()?;
        self.write_atomic(self.root.join(SETTINGS_FILE), data)
    }

    fn load_json<T: DeserializeOwned>(&self, path: PathBuf) -> Result<T, StorageError> {
        let mut file = File::open(path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }

    fn write_atomic<T: Serialize>(&self, path: PathBuf, data: &T) -> Result<(), StorageError> {
        let temp_path = path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(data)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}

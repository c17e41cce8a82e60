use serde::{Deserialize, Serialize};

/// Stable identity of a task inside one running store.
///
/// Ids are handed out by the store from a counter that only grows, so an id
/// is never reused even after its task is deleted. They are not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub completed: bool,
    pub prioritized: bool,
}

impl Task {
    pub fn from_record(id: TaskId, record: TaskRecord) -> Self {
        Self {
            id,
            description: record.description,
            completed: record.completed,
            prioritized: record.prioritized,
        }
    }

    pub fn to_record(&self) -> TaskRecord {
        TaskRecord {
            description: self.description.clone(),
            completed: self.completed,
            prioritized: self.prioritized,
        }
    }
}

/// One entry of `tasks.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct TaskRecord {
    pub description: String,
    pub completed: bool,
    // Files written before priorities existed lack this field.
    #[serde(default)]
    pub prioritized: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_true")]
    pub completed_expanded: bool,
    #[serde(default = "default_true")]
    pub mini_always_on_top: bool,
    #[serde(default)]
    pub mini_bounds: Option<WindowBounds>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            completed_expanded: true,
            mini_always_on_top: true,
            mini_bounds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct WindowBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingsFile {
    pub schema_version: u32,
    pub settings: Settings,
}

use crate::models::Settings;

pub const EVENT_VIEW_UPDATED: &str = "view_updated";
pub const EVENT_TASK_COMPLETED: &str = "task_completed";
pub const EVENT_SETTINGS_UPDATED: &str = "settings_updated";

#[derive(Debug, Clone, serde::Serialize)]
pub struct SettingsPayload {
    pub settings: Settings,
}

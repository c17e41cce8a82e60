use serde::{Deserialize, Serialize};

use crate::models::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Main,
    Mini,
}

impl SurfaceKind {
    pub fn project(self, tasks: &[Task]) -> SurfaceView {
        match self {
            SurfaceKind::Main => SurfaceView::Main(MainView::from_tasks(tasks)),
            SurfaceKind::Mini => SurfaceView::Mini(MiniView::from_tasks(tasks)),
        }
    }
}

/// What one window needs to draw its rows.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "surface", rename_all = "snake_case")]
pub enum SurfaceView {
    Main(MainView),
    Mini(MiniView),
}

impl SurfaceView {
    pub fn kind(&self) -> SurfaceKind {
        match self {
            SurfaceView::Main(_) => SurfaceKind::Main,
            SurfaceView::Mini(_) => SurfaceKind::Mini,
        }
    }

    pub fn active(&self) -> &[Task] {
        match self {
            SurfaceView::Main(view) => &view.active,
            SurfaceView::Mini(view) => &view.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct MainView {
    pub active: Vec<Task>,
    pub completed: Vec<Task>,
}

impl MainView {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        Self {
            active: active_tasks(tasks),
            completed: completed_tasks(tasks),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct MiniView {
    pub active: Vec<Task>,
}

impl MiniView {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        Self {
            active: active_tasks(tasks),
        }
    }
}

/// Open tasks, prioritized ones first. Insertion order is kept inside each
/// group (`sort_by_key` is stable).
pub fn active_tasks(tasks: &[Task]) -> Vec<Task> {
    let mut active: Vec<Task> = tasks.iter().filter(|task| !task.completed).cloned().collect();
    active.sort_by_key(|task| !task.prioritized);
    active
}

/// Completed tasks in insertion order.
pub fn completed_tasks(tasks: &[Task]) -> Vec<Task> {
    tasks.iter().filter(|task| task.completed).cloned().collect()
}

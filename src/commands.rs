use crate::events::SettingsPayload;
#[cfg(all(feature = "app", not(test)))]
use crate::events::EVENT_SETTINGS_UPDATED;
use crate::models::{Settings, TaskId};
use crate::projection::{SurfaceKind, SurfaceView};
use crate::state::AppState;

#[cfg(all(feature = "app", not(test)))]
use crate::windows;
#[cfg(all(feature = "app", not(test)))]
use tauri::{AppHandle, Emitter, Runtime, State};

#[derive(Debug, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

trait CommandCtx {
    fn emit_settings_updated(&self, payload: SettingsPayload);
    fn apply_mini_always_on_top(&self, on_top: bool);
    fn open_mini_window(&self) -> Result<(), String>;
    fn open_main_window(&self) -> Result<(), String>;
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

#[cfg(all(feature = "app", not(test)))]
struct TauriCommandCtx<'a, R: Runtime> {
    app: &'a AppHandle<R>,
}

#[cfg(all(feature = "app", not(test)))]
impl<R: Runtime> CommandCtx for TauriCommandCtx<'_, R> {
    fn emit_settings_updated(&self, payload: SettingsPayload) {
        let _ = self.app.emit(EVENT_SETTINGS_UPDATED, payload);
    }

    fn apply_mini_always_on_top(&self, on_top: bool) {
        windows::set_mini_always_on_top(self.app, on_top);
    }

    fn open_mini_window(&self) -> Result<(), String> {
        windows::open_mini_window(self.app).map_err(|e| e.to_string())
    }

    fn open_main_window(&self) -> Result<(), String> {
        windows::open_main_window(self.app).map_err(|e| e.to_string())
    }
}

// Rows only ever carry the ids handed out by the store, so an unknown id
// means the row was stale. The store logs and ignores it; the command still
// succeeds and reports that nothing changed.

fn load_view_impl(state: &AppState, surface: SurfaceKind) -> CommandResult<SurfaceView> {
    ok(surface.project(&state.store().tasks()))
}

fn add_task_impl(state: &AppState, description: String) -> CommandResult<Option<TaskId>> {
    ok(state.store().add(&description))
}

fn delete_task_impl(state: &AppState, task_id: TaskId) -> CommandResult<bool> {
    ok(state.store().delete(task_id))
}

fn toggle_completed_impl(state: &AppState, task_id: TaskId) -> CommandResult<Option<bool>> {
    ok(state.store().toggle_completed(task_id))
}

fn toggle_prioritized_impl(state: &AppState, task_id: TaskId) -> CommandResult<Option<bool>> {
    ok(state.store().toggle_prioritized(task_id))
}

fn edit_task_impl(state: &AppState, task_id: TaskId, description: String) -> CommandResult<bool> {
    ok(state.store().edit(task_id, &description))
}

fn load_settings_impl(state: &AppState) -> CommandResult<Settings> {
    ok(state.settings())
}

fn update_settings_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    mut settings: Settings,
) -> CommandResult<Settings> {
    let previous = state.settings();
    // Mini bounds are recorded by the backend when the mini window closes;
    // a front-end copy of the settings may predate that.
    settings.mini_bounds = previous.mini_bounds.clone();
    state.update_settings(settings.clone());
    if let Err(error) = state.save_settings() {
        log::error!("commands: failed to save settings: {error}");
        return err(&format!("storage error: {error}"));
    }
    if previous.mini_always_on_top != settings.mini_always_on_top {
        ctx.apply_mini_always_on_top(settings.mini_always_on_top);
    }
    ctx.emit_settings_updated(SettingsPayload {
        settings: settings.clone(),
    });
    ok(settings)
}

fn show_mini_window_impl(ctx: &impl CommandCtx) -> CommandResult<bool> {
    match ctx.open_mini_window() {
        Ok(()) => ok(true),
        Err(error) => {
            log::error!("commands: failed to open mini window: {error}");
            err(&format!("window error: {error}"))
        }
    }
}

fn show_main_window_impl(ctx: &impl CommandCtx) -> CommandResult<bool> {
    match ctx.open_main_window() {
        Ok(()) => ok(true),
        Err(error) => {
            log::error!("commands: failed to open main window: {error}");
            err(&format!("window error: {error}"))
        }
    }
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn load_view(state: State<AppState>, surface: SurfaceKind) -> CommandResult<SurfaceView> {
    load_view_impl(state.inner(), surface)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn add_task(state: State<AppState>, description: String) -> CommandResult<Option<TaskId>> {
    add_task_impl(state.inner(), description)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn delete_task(state: State<AppState>, task_id: TaskId) -> CommandResult<bool> {
    delete_task_impl(state.inner(), task_id)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn toggle_completed(state: State<AppState>, task_id: TaskId) -> CommandResult<Option<bool>> {
    toggle_completed_impl(state.inner(), task_id)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn toggle_prioritized(state: State<AppState>, task_id: TaskId) -> CommandResult<Option<bool>> {
    toggle_prioritized_impl(state.inner(), task_id)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn edit_task(
    state: State<AppState>,
    task_id: TaskId,
    description: String,
) -> CommandResult<bool> {
    edit_task_impl(state.inner(), task_id, description)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn load_settings(state: State<AppState>) -> CommandResult<Settings> {
    load_settings_impl(state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn update_settings(
    app: AppHandle,
    state: State<AppState>,
    settings: Settings,
) -> CommandResult<Settings> {
    let ctx = TauriCommandCtx { app: &app };
    update_settings_impl(&ctx, state.inner(), settings)
}

#[cfg(all(feature = "app", not(test)))]
// Async so the window is built off the event-loop thread; building a
// webview from a sync command deadlocks on Windows.
#[tauri::command]
pub async fn show_mini_window(app: AppHandle) -> CommandResult<bool> {
    let ctx = TauriCommandCtx { app: &app };
    show_mini_window_impl(&ctx)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub async fn show_main_window(app: AppHandle) -> CommandResult<bool> {
    let ctx = TauriCommandCtx { app: &app };
    show_main_window_impl(&ctx)
}

#[cfg(all(feature = "app", not(test)))]
use crate::events::EVENT_TASK_COMPLETED;
#[cfg(all(feature = "app", not(test)))]
use crate::state::AppState;
#[cfg(all(feature = "app", not(test)))]
use crate::windows::{MAIN_WINDOW, MINI_WINDOW};
#[cfg(all(feature = "app", not(test)))]
use tauri::{AppHandle, Emitter, EventTarget, Manager, Runtime};

/// Plays the "task done" chime.
///
/// Called once per transition of a task to completed. Errors are reported
/// back so the caller can log them; they never change task state.
pub trait CompletionSound: Send + Sync {
    fn play(&self) -> Result<(), String>;
}

/// No-op player used until a real one is installed.
pub struct Silent;

impl CompletionSound for Silent {
    fn play(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Asks the front end to play the chime. Respects `sound_enabled`.
///
/// Only the window currently in use gets the event; the main window stays
/// loaded while hidden behind the mini one.
#[cfg(all(feature = "app", not(test)))]
pub struct FrontendChime<R: Runtime> {
    app: AppHandle<R>,
}

#[cfg(all(feature = "app", not(test)))]
impl<R: Runtime> FrontendChime<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }
}

#[cfg(all(feature = "app", not(test)))]
impl<R: Runtime> CompletionSound for FrontendChime<R> {
    fn play(&self) -> Result<(), String> {
        if !self.app.state::<AppState>().settings().sound_enabled {
            return Ok(());
        }
        let label = if self.app.get_webview_window(MINI_WINDOW).is_some() {
            MINI_WINDOW
        } else {
            MAIN_WINDOW
        };
        self.app
            .emit_to(EventTarget::webview_window(label), EVENT_TASK_COMPLETED, ())
            .map_err(|err| err.to_string())
    }
}

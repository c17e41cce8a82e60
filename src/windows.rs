use std::sync::Arc;

use tauri::{
    AppHandle, Emitter, EventTarget, LogicalPosition, Manager, Runtime, WebviewUrl, WebviewWindow,
    WebviewWindowBuilder, Window,
};

use crate::events::{SettingsPayload, EVENT_SETTINGS_UPDATED, EVENT_VIEW_UPDATED};
use crate::models::WindowBounds;
use crate::projection::{SurfaceKind, SurfaceView};
use crate::state::AppState;
use crate::sync::SurfaceRenderer;

pub const MAIN_WINDOW: &str = "main";
pub const MINI_WINDOW: &str = "mini";

const MINI_WIDTH: f64 = 270.0;
const MINI_HEIGHT: f64 = 320.0;
const MINI_MARGIN: f64 = 20.0;

/// Pushes projections to one webview window as `view_updated` events.
struct WindowRenderer<R: Runtime> {
    app: AppHandle<R>,
    label: String,
}

impl<R: Runtime> SurfaceRenderer for WindowRenderer<R> {
    fn render(&self, view: SurfaceView) {
        let target = EventTarget::webview_window(self.label.clone());
        if let Err(err) = self.app.emit_to(target, EVENT_VIEW_UPDATED, view) {
            log::warn!("windows: failed to render label={} error={err}", self.label);
        }
    }
}

pub fn attach_surface<R: Runtime>(app: &AppHandle<R>, label: &str, kind: SurfaceKind) {
    let state = app.state::<AppState>();
    let renderer = Arc::new(WindowRenderer {
        app: app.clone(),
        label: label.to_string(),
    });
    state
        .surfaces()
        .attach(state.store(), label, kind, renderer);
}

/// Shows the mini window (building it on first use) and hides the main one.
///
/// Call from an async command or a spawned task. Building a webview on the
/// event-loop thread deadlocks on Windows.
pub fn open_mini_window<R: Runtime>(app: &AppHandle<R>) -> tauri::Result<()> {
    let window = match app.get_webview_window(MINI_WINDOW) {
        Some(window) => window,
        None => build_mini_window(app)?,
    };
    window.show()?;
    window.set_focus()?;
    if let Some(main) = app.get_webview_window(MAIN_WINDOW) {
        main.hide()?;
    }
    log::info!("windows: switched to mini");
    Ok(())
}

/// Closes the mini window if present and brings the main window back.
pub fn open_main_window<R: Runtime>(app: &AppHandle<R>) -> tauri::Result<()> {
    if let Some(mini) = app.get_webview_window(MINI_WINDOW) {
        mini.close()?;
    }
    show_main(app)
}

fn show_main<R: Runtime>(app: &AppHandle<R>) -> tauri::Result<()> {
    if let Some(main) = app.get_webview_window(MAIN_WINDOW) {
        main.unminimize()?;
        main.show()?;
        main.set_focus()?;
    } else {
        log::warn!("windows: main window missing");
    }
    Ok(())
}

fn build_mini_window<R: Runtime>(app: &AppHandle<R>) -> tauri::Result<WebviewWindow<R>> {
    let settings = app.state::<AppState>().settings();
    let builder =
        WebviewWindowBuilder::new(app, MINI_WINDOW, WebviewUrl::App("/#/mini".into()))
            .title("Tasks Mini")
            .decorations(false)
            .resizable(true)
            .always_on_top(settings.mini_always_on_top)
            .skip_taskbar(true)
            .visible(false);
    let window = match &settings.mini_bounds {
        Some(bounds) => builder
            .inner_size(bounds.width, bounds.height)
            .position(bounds.x, bounds.y)
            .build()?,
        None => {
            let window = builder.inner_size(MINI_WIDTH, MINI_HEIGHT).build()?;
            place_top_right(&window);
            window
        }
    };
    attach_surface(app, MINI_WINDOW, SurfaceKind::Mini);
    Ok(window)
}

fn place_top_right<R: Runtime>(window: &WebviewWindow<R>) {
    let monitor = match window.primary_monitor() {
        Ok(Some(monitor)) => monitor,
        Ok(None) => return,
        Err(err) => {
            log::warn!("windows: could not read primary monitor: {err}");
            return;
        }
    };
    let scale = monitor.scale_factor();
    let size = monitor.size().to_logical::<f64>(scale);
    let origin = monitor.position().to_logical::<f64>(scale);
    let position = LogicalPosition::new(
        origin.x + size.width - MINI_WIDTH - MINI_MARGIN,
        origin.y + MINI_MARGIN,
    );
    if let Err(err) = window.set_position(position) {
        log::warn!("windows: failed to position mini window: {err}");
    }
}

pub fn set_mini_always_on_top<R: Runtime>(app: &AppHandle<R>, on_top: bool) {
    if let Some(window) = app.get_webview_window(MINI_WINDOW) {
        if let Err(err) = window.set_always_on_top(on_top) {
            log::warn!("windows: failed to set always-on-top: {err}");
        }
    }
}

/// Stores the mini window's position and size so the next one opens there.
pub fn remember_mini_bounds<R: Runtime>(window: &Window<R>) {
    let state = window.state::<AppState>();
    let scale = match window.scale_factor() {
        Ok(scale) => scale,
        Err(err) => {
            log::warn!("windows: failed to read scale factor: {err}");
            return;
        }
    };
    let (position, size) = match (window.outer_position(), window.inner_size()) {
        (Ok(position), Ok(size)) => (position.to_logical::<f64>(scale), size.to_logical::<f64>(scale)),
        _ => return,
    };
    let mut settings = state.settings();
    settings.mini_bounds = Some(WindowBounds {
        x: position.x,
        y: position.y,
        width: size.width,
        height: size.height,
    });
    state.update_settings(settings.clone());
    if let Err(err) = state.save_settings() {
        log::warn!("windows: failed to save mini bounds: {err}");
    }
    let _ = window.emit(EVENT_SETTINGS_UPDATED, SettingsPayload { settings });
}

/// The mini window is gone: stop rendering it and make sure a window is visible.
pub fn on_mini_destroyed<R: Runtime>(app: &AppHandle<R>) {
    app.state::<AppState>().surfaces().detach(MINI_WINDOW);
    if let Err(err) = show_main(app) {
        log::warn!("windows: failed to restore main window: {err}");
    }
}

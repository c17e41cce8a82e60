pub mod commands;
pub mod events;
pub mod logging;
pub mod models;
pub mod projection;
pub mod sound;
pub mod state;
pub mod storage;
pub mod store;
pub mod sync;
#[cfg_attr(not(feature = "app"), allow(dead_code))]
mod tray;
#[cfg(all(feature = "app", not(test)))]
mod windows;

#[cfg(all(feature = "app", not(test)))]
use std::sync::Arc;

#[cfg(all(feature = "app", not(test)))]
use tauri::{Manager, RunEvent, WindowEvent};

#[cfg(all(feature = "app", not(test)))]
use crate::commands::*;
#[cfg(all(feature = "app", not(test)))]
use crate::logging::{init_logging, LoggingState};
#[cfg(all(feature = "app", not(test)))]
use crate::projection::SurfaceKind;
#[cfg(all(feature = "app", not(test)))]
use crate::sound::FrontendChime;
#[cfg(all(feature = "app", not(test)))]
use crate::state::AppState;
#[cfg(all(feature = "app", not(test)))]
use crate::storage::Storage;
#[cfg(all(feature = "app", not(test)))]
use crate::tray::init_tray;
#[cfg(all(feature = "app", not(test)))]
use crate::windows::{
    attach_surface, on_mini_destroyed, remember_mini_bounds, MAIN_WINDOW, MINI_WINDOW,
};

#[cfg_attr(mobile, tauri::mobile_entry_point)]
#[cfg(all(feature = "app", not(test)))]
pub fn run() {
    tauri::Builder::default()
        .setup(|app| {
            let data_dir = app.path().app_data_dir()?;
            match init_logging(&data_dir) {
                Ok(logging) => {
                    app.manage(logging);
                }
                Err(err) => eprintln!("failed to initialize logging: {err}"),
            }

            let storage = Storage::new(data_dir);
            storage.ensure_dirs()?;

            let state = AppState::load(storage);
            state
                .store()
                .set_completion_sound(Arc::new(FrontendChime::new(app.handle().clone())));
            app.manage(state.clone());

            attach_surface(app.handle(), MAIN_WINDOW, SurfaceKind::Main);
            init_tray(app, &state)?;

            log::info!("app: started tasks={}", state.store().len());
            Ok(())
        })
        .on_window_event(|window, event| {
            let label = window.label().to_string();
            match event {
                WindowEvent::CloseRequested { .. } if label == MINI_WINDOW => {
                    remember_mini_bounds(window);
                }
                WindowEvent::Destroyed if label == MINI_WINDOW => {
                    on_mini_destroyed(window.app_handle());
                }
                WindowEvent::CloseRequested { .. } if label == MAIN_WINDOW => {
                    log::info!("app: main window closed, exiting");
                    window.app_handle().exit(0);
                }
                _ => {}
            }
        })
        .invoke_handler(tauri::generate_handler![
            load_view,
            add_task,
            delete_task,
            toggle_completed,
            toggle_prioritized,
            edit_task,
            load_settings,
            update_settings,
            show_mini_window,
            show_main_window,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app, event| {
            if let RunEvent::Exit = event {
                log::info!("app: exiting");
                if let Some(logging) = app.try_state::<LoggingState>() {
                    logging.flush();
                }
            }
        });
}

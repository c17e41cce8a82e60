#[cfg(all(feature = "app", not(test)))]
use sys_locale::get_locale;

use crate::models::Task;

#[cfg(all(feature = "app", not(test)))]
use crate::state::AppState;
#[cfg(all(feature = "app", not(test)))]
use crate::windows::{open_main_window, open_mini_window};
#[cfg(all(feature = "app", not(test)))]
use tauri::{
    menu::{Menu, MenuItem},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    App, AppHandle, Manager, Runtime,
};

#[cfg(all(feature = "app", not(test)))]
const TRAY_ID: &str = "main";

#[derive(Clone, Copy)]
enum TrayLanguage {
    Zh,
    En,
}

#[allow(dead_code)]
struct TrayLabels {
    show_main: &'static str,
    show_mini: &'static str,
    quit: &'static str,
    tooltip_prefix: &'static str,
}

#[cfg(all(feature = "app", not(test)))]
fn detect_system_language() -> TrayLanguage {
    language_for_locale(&get_locale().unwrap_or_default())
}

fn language_for_locale(locale: &str) -> TrayLanguage {
    if locale.trim().to_lowercase().starts_with("zh") {
        TrayLanguage::Zh
    } else {
        TrayLanguage::En
    }
}

fn tray_labels(lang: TrayLanguage) -> TrayLabels {
    match lang {
        TrayLanguage::Zh => TrayLabels {
            show_main: "打开主界面",
            show_mini: "打开迷你窗口",
            quit: "退出",
            tooltip_prefix: "待办",
        },
        TrayLanguage::En => TrayLabels {
            show_main: "Open main window",
            show_mini: "Open mini window",
            quit: "Quit",
            tooltip_prefix: "Active tasks",
        },
    }
}

#[cfg(all(feature = "app", not(test)))]
fn build_tray_menu<R: Runtime, M: Manager<R>>(
    app: &M,
    lang: TrayLanguage,
) -> Result<Menu<R>, Box<dyn std::error::Error>> {
    let labels = tray_labels(lang);
    let show_main = MenuItem::with_id(app, "show_main", labels.show_main, true, None::<&str>)?;
    let show_mini = MenuItem::with_id(app, "show_mini", labels.show_mini, true, None::<&str>)?;
    let quit = MenuItem::with_id(app, "quit", labels.quit, true, None::<&str>)?;
    Ok(Menu::with_items(app, &[&show_main, &show_mini, &quit])?)
}

/// Builds the tray icon and subscribes it to the store so the tooltip
/// always shows the current number of open tasks.
#[cfg(all(feature = "app", not(test)))]
pub fn init_tray(app: &mut App, state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    let icon = app.default_window_icon().cloned().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "default window icon is missing",
        )
    })?;

    let lang = detect_system_language();
    let menu = build_tray_menu(app, lang)?;

    let _tray = TrayIconBuilder::with_id(TRAY_ID)
        .icon(icon)
        .menu(&menu)
        .tooltip(tray_tooltip(&state.store().tasks(), lang))
        .show_menu_on_left_click(false)
        .on_menu_event(|app, event| {
            let id = event.id.as_ref();
            log::info!("tray: menu_event id={id}");

            match id {
                "quit" => app.exit(0),
                "show_main" => {
                    if let Err(err) = open_main_window(app) {
                        log::warn!("tray: failed to show main window: {err}");
                    }
                }
                "show_mini" => {
                    // The mini webview may need building, which must not
                    // happen inside an event handler.
                    let app = app.clone();
                    tauri::async_runtime::spawn(async move {
                        if let Err(err) = open_mini_window(&app) {
                            log::warn!("tray: failed to show mini window: {err}");
                        }
                    });
                }
                _ => {}
            }
        })
        .on_tray_icon_event(|tray, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                log::info!("tray: left_click");
                if let Err(err) = open_main_window(tray.app_handle()) {
                    log::warn!("tray: failed to show main window (left click): {err}");
                }
            }
        })
        .build(app)?;

    let handle = app.handle().clone();
    state.store().subscribe(move |store| {
        update_tray_count(&handle, &store.tasks(), lang);
    });

    Ok(())
}

#[cfg(all(feature = "app", not(test)))]
fn update_tray_count<R: Runtime>(app: &AppHandle<R>, tasks: &[Task], lang: TrayLanguage) {
    if let Some(tray) = app.tray_by_id(TRAY_ID) {
        if let Err(err) = tray.set_tooltip(Some(tray_tooltip(tasks, lang))) {
            log::warn!("tray: failed to update tooltip: {err}");
        }
    }
}

fn active_count(tasks: &[Task]) -> usize {
    tasks.iter().filter(|task| !task.completed).count()
}

fn tray_tooltip(tasks: &[Task], lang: TrayLanguage) -> String {
    let count = active_count(tasks);
    let labels = tray_labels(lang);
    format!("{}: {count}", labels.tooltip_prefix)
}

use std::path::Path;

pub const LOG_FILE_BASENAME: &str = "tasks";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 10;
pub const LOG_ENV_VAR: &str = "TASKS_LOG";

/// Log files live next to `tasks.json` and `settings.json`.
pub fn log_directory(app_data_dir: &Path) -> &Path {
    app_data_dir
}

/// Picks the filter spec: `TASKS_LOG`, then `RUST_LOG`, then the default.
/// Blank values count as unset.
pub fn log_spec(tasks_log: Option<String>, rust_log: Option<String>, debug: bool) -> String {
    let default_spec = if debug {
        "warn,tasks_desktop_lib=debug"
    } else {
        "warn,tasks_desktop_lib=info"
    };
    tasks_log
        .filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

/// Owns the file logger. Kept in managed state for the life of the app;
/// `flush` runs on exit so buffered lines reach the file.
#[cfg(all(feature = "app", not(test)))]
pub struct LoggingState {
    handle: flexi_logger::LoggerHandle,
}

#[cfg(all(feature = "app", not(test)))]
impl LoggingState {
    pub fn flush(&self) {
        self.handle.flush();
    }
}

#[cfg(all(feature = "app", not(test)))]
pub fn init_logging(
    app_data_dir: &Path,
) -> Result<LoggingState, flexi_logger::FlexiLoggerError> {
    use flexi_logger::{
        detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode,
    };

    std::fs::create_dir_all(app_data_dir)?;

    let spec = log_spec(
        std::env::var(LOG_ENV_VAR).ok(),
        std::env::var("RUST_LOG").ok(),
        cfg!(debug_assertions),
    );

    let handle = Logger::try_with_str(spec)?
        .log_to_file(
            FileSpec::default()
                .directory(log_directory(app_data_dir))
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stdout(if cfg!(debug_assertions) {
            Duplicate::Info
        } else {
            Duplicate::None
        })
        .start()?;

    install_panic_hook();

    log::info!(
        "logger initialized dir={} rotate_size_bytes={} keep_files={}",
        log_directory(app_data_dir).display(),
        LOG_ROTATE_SIZE_BYTES,
        LOG_ROTATE_KEEP_FILES
    );
    Ok(LoggingState { handle })
}

#[cfg(all(feature = "app", not(test)))]
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("<non-string panic payload>");
        let location = info
            .location()
            .map(|loc| format!("{loc}"))
            .unwrap_or_else(|| "<unknown>".to_string());
        let backtrace = std::backtrace::Backtrace::force_capture();

        // Best-effort: even if the logger is unavailable, still run the default hook.
        log::error!("panic: payload={payload} location={location}\nbacktrace:\n{backtrace}");
        default_hook(info);
    }));
}

// Logging module
// Console and optional file logging on top of the tracing crate
//
// Library code only emits `tracing` events. The front end decides where they go:
// - a coloured console layer filtered by RUST_LOG or the configured level
// - an optional plain-text file layer written through a non-blocking appender

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Map a numeric verbosity (as used in the config file) to a tracing filter directive.
/// 0 = errors only, 1 = warnings, 2 = info, 3 = debug, anything higher = trace.
pub fn map_log_level(level: i32) -> &'static str {
    match level {
        i32::MIN..=0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    }
}

/// Initialize the logging system.
///
/// When `log_dir` is set, a second layer writes `file_name` inside it. The returned guard
/// flushes that file on drop and must be kept alive for the duration of the program.
pub fn initialize_logging(
    log_dir: Option<&str>,
    log_level: &str,
    file_name: &str,
) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let console = fmt::layer()
        .with_ansi(true)
        .with_target(false)
        .with_thread_ids(false);

    if let Some(dir) = log_dir {
        let path = Path::new(dir);
        if !path.exists() {
            let _ = std::fs::create_dir_all(path);
        }

        let file_appender = rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let result = tracing_subscriber::registry()
            .with(env_filter)
            .with(console)
            .with(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true),
            )
            .try_init();

        // A subscriber may already be installed (tests, embedding); keep going silently
        if result.is_err() {
            return None;
        }
        Some(guard)
    } else {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(console)
            .try_init();
        None
    }
}

//! Logging and tracing configuration
//!
//! Everything logs to stderr: the CLI's stdout carries reports, a worker's
//! stdout carries result frames back to the supervisor.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::config::LoggingConfig;
use super::paths;

/// Initialize tracing for the CLI
///
/// Logs are controlled by the `RUST_LOG` environment variable, then by
/// `logging.level`. Default level is INFO for this crate, WARN for dependencies.
/// The returned guard must be kept alive for file logging to flush.
pub fn init_cli(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.level.as_deref().unwrap_or("scenarist=info,warn"))
    });

    let (file_layer, guard) = match config.file.as_deref().map(resolve_log_file) {
        Some(path) => {
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            let name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
            if let Err(e) = std::fs::create_dir_all(&dir) {
                eprintln!("Warning: Could not create log directory: {}", e);
                (None, None)
            } else {
                let appender = tracing_appender::rolling::never(dir, name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true);
                (Some(layer), Some(guard))
            }
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .with(file_layer)
        .init();

    guard
}

/// Initialize tracing for a worker process (stderr only)
pub fn init_worker() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scenarist=warn,error"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true)
                .compact(),
        )
        .init();
}

/// Bare file names land in the platform log directory
fn resolve_log_file(file: &Path) -> PathBuf {
    if file.components().count() == 1 {
        if let Some(dir) = paths::log_dir() {
            return dir.join(file);
        }
    }
    file.to_path_buf()
}

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use readmesmith_core::Config;

const LOG_FILE: &str = "readmesmith.log";

/// Filter from `RUST_LOG`, defaulting to `default` when unset or invalid.
fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log to a file under the config dir while the terminal UI owns the screen.
/// `READMESMITH_LOG` overrides the file location. The returned guard must stay
/// alive for buffered lines to be flushed.
pub fn init_file_logging() -> Result<WorkerGuard> {
    let path = match std::env::var("READMESMITH_LOG") {
        Ok(path) if !path.trim().is_empty() => std::path::PathBuf::from(path),
        _ => Config::config_dir()?.join(LOG_FILE),
    };
    let directory = path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(LOG_FILE);
    std::fs::create_dir_all(directory)?;

    let file_appender = tracing_appender::rolling::never(directory, filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!(log_file = %path.display(), "logging initialized");
    Ok(guard)
}

/// Warnings and above to stderr for one-shot commands, so stdout stays clean
/// for the generated artifact.
pub fn init_stderr_logging() {
    tracing_subscriber::registry()
        .with(env_filter("warn"))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::path::Path;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

pub const LOG_FILE_PREFIX: &str = "tap-me.log";
const DEFAULT_FILTER: &str = "tap_me=info";

/// Sends tracing output to a daily rolling file; the terminal belongs to the UI.
///
/// Keep the returned guard alive for the whole run or buffered lines are lost.
pub fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("failed to create log directory {}", log_dir.display()))?;
    let appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("failed to install tracing subscriber: {e}"))?;
    Ok(guard)
}

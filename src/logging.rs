//! File logging for processes embedding the recorder
//!
//! Engine sessions run unattended, so events go to a daily-rolling file in
//! [`RecorderConfig::log_directory`] rather than to the terminal.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::RecorderConfig;

const LOG_FILE_PREFIX: &str = "obs-recorder.log";

/// Install a global subscriber writing to the configured log directory
///
/// `RUST_LOG` takes precedence over the configured level. The returned guard
/// flushes pending lines when dropped; keep it alive for the lifetime of the
/// process.
pub fn init_logging(config: &RecorderConfig) -> Result<WorkerGuard> {
    let log_dir = config.log_directory()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    let retention = Duration::from_secs(60 * 60 * 24 * config.logging.retention_days);
    let pruned = prune_old_logs(&log_dir, retention);

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.logging.level)
            .with_context(|| format!("Invalid log level {:?}", config.logging.level))?,
    };

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    info!(
        "Logging to {:?} (removed {} expired log files)",
        log_dir, pruned
    );
    Ok(guard)
}

/// Remove rolled log files last modified before `max_age` ago
///
/// Unreadable entries are skipped. Returns how many files were removed.
fn prune_old_logs(log_dir: &Path, max_age: Duration) -> usize {
    let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
        return 0;
    };
    let Ok(entries) = std::fs::read_dir(log_dir) else {
        return 0;
    };

    entries
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX))
        })
        .filter(|entry| {
            entry
                .metadata()
                .and_then(|meta| meta.modified())
                .is_ok_and(|modified| modified < cutoff)
        })
        .filter(|entry| entry.path().is_file())
        .filter(|entry| std::fs::remove_file(entry.path()).is_ok())
        .count()
}

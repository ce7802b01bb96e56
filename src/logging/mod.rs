//! Logging setup
//!
//! stderr logging always; a daily-rolling file log when debug mode is on.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "tradein.log";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub debug_mode: bool,
    pub log_dir: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self {
            level: "info".to_string(),
            debug_mode: false,
            log_dir: default_log_dir(),
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Debug mode lowers the default level to `debug` and enables file output
    pub fn with_debug_mode(mut self, debug: bool) -> Self {
        self.debug_mode = debug;
        if debug {
            self.level = "debug".to_string();
        }
        self
    }

    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = dir;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".tradein").join("logs")
}

/// Install the global subscriber.
///
/// The returned guard must be held for the lifetime of the program when
/// file logging is active, or buffered lines are lost.
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    if config.debug_mode {
        std::fs::create_dir_all(&config.log_dir)
            .with_context(|| format!("Failed to create log directory: {:?}", config.log_dir))?;

        let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let file_layer = fmt::layer().with_writer(writer).with_ansi(false);

        tracing_subscriber::registry()
            .with(config.filter())
            .with(stderr_layer)
            .with(file_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;

        tracing::debug!("File logging enabled in {:?}", config.log_dir);
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(config.filter())
            .with(stderr_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;
        Ok(None)
    }
}

/// Delete rolled log files older than `days`. Returns how many were removed.
pub fn cleanup_old_logs(dir: &std::path::Path, days: u64) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let cutoff = chrono::Utc::now() - chrono::Duration::days(days as i64);
    let mut removed = 0;

    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let entry = entry?;
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(LOG_FILE_PREFIX) {
            continue;
        }

        let modified: chrono::DateTime<chrono::Utc> = entry.metadata()?.modified()?.into();
        if modified < cutoff {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_mode_raises_verbosity() {
        let config = LogConfig::new().with_level("warn").with_debug_mode(true);
        assert!(config.debug_mode);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_cleanup_missing_dir() {
        let removed = cleanup_old_logs(std::path::Path::new("/nonexistent/tradein/logs"), 7).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_cleanup_keeps_fresh_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tradein.log.2026-10-19"), "fresh").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "other").unwrap();

        let removed = cleanup_old_logs(dir.path(), 7).unwrap();
        assert_eq!(removed, 0);
        assert!(dir.path().join("tradein.log.2026-10-19").exists());
        assert!(dir.path().join("notes.txt").exists());
    }
}

//! Structured logging setup. Console output is always on; a rotating file
//! layer is added when [`LoggingConfig::log_dir`] is set, mirroring the
//! always-console / optional-file layering the Nacos-derived server uses,
//! scaled down to what this service actually needs (no OTLP exporter).

use std::path::PathBuf;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    /// When set, logs are additionally written to a daily-rotated file
    /// under this directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_dir: None,
        }
    }
}

/// Keeps the non-blocking file writer's background thread alive; drop it
/// only at process shutdown.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let console_layer = fmt::layer().with_target(true).with_line_number(true);

    match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "ezekiel.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

            Registry::default()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .try_init()?;

            Ok(LoggingGuard { _file_guard: Some(guard) })
        }
        None => {
            Registry::default().with(env_filter).with(console_layer).try_init()?;
            Ok(LoggingGuard { _file_guard: None })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_file_dir() {
        let config = LoggingConfig::default();
        assert!(config.log_dir.is_none());
        assert_eq!(config.level, Level::INFO);
    }

    // Only one test in this module may actually call `init_logging`: it
    // installs a process-global subscriber, and a second `try_init()` call
    // would return an error rather than panicking the test.
    #[test]
    fn file_layer_creates_log_dir_and_rotated_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            level: Level::INFO,
            log_dir: Some(dir.path().to_path_buf()),
        };

        let guard = init_logging(&config).unwrap();
        tracing::info!("hello from the log dir test");
        drop(guard);

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(!entries.is_empty(), "expected a rotated log file to be created");
    }
}

//! src/logging.rs
//! ============================================================================
//! # Logging setup
//!
//! Installs the global `tracing` subscriber from a [`LoggingConfig`]:
//! - an [`EnvFilter`] built from the configured level, overridden by the
//!   `TURNFLOW_LOG` environment variable when set,
//! - a human-readable `fmt` layer on stderr when `console` is on,
//! - a non-blocking rolling file layer (JSON lines when `json` is on) when
//!   `log_dir` is set.
//!
//! The returned [`WorkerGuard`] flushes the file writer on drop and must be
//! held for the life of the process.

use std::path::{Component, Path};

use anyhow::{Context, Result};
use tokio::fs as TokioFs;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt::time::ChronoUtc, layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::{LogRotation, LoggingConfig};

/// Environment variable that overrides the configured filter.
pub const LOG_ENV_VAR: &str = "TURNFLOW_LOG";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logger already initialized")]
    AlreadyInitialized,

    #[error("Invalid log directory: {0}")]
    InvalidLogDirectory(String),

    #[error("Failed to create log directory: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
        }
    }
}

// Logger builder
#[derive(Debug, Clone, Default)]
pub struct LoggerBuilder {
    config: LoggingConfig,
}

impl LoggerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: LoggingConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: &str) -> Self {
        self.config.level = level.to_string();
        self
    }

    #[must_use]
    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    /// Install the subscriber. Returns the file writer guard when file
    /// output is configured.
    pub async fn build(self) -> Result<Option<WorkerGuard>> {
        validate_config(&self.config)?;

        let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
        let mut guard: Option<WorkerGuard> = None;

        if self.config.console {
            let console = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_timer(ChronoUtc::rfc_3339())
                .with_filter(make_filter(&self.config.level)?)
                .boxed();
            layers.push(console);
        }

        if let Some(log_dir) = &self.config.log_dir {
            setup_log_directory(log_dir).await?;

            let appender = RollingFileAppender::new(
                self.config.rotation.into(),
                log_dir,
                &self.config.log_file_prefix,
            );
            let (writer, file_guard) = tracing_appender::non_blocking(appender);

            let file_layer: BoxedLayer = if self.config.json {
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(writer)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_filter(make_filter(&self.config.level)?)
                    .boxed()
            } else {
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_filter(make_filter(&self.config.level)?)
                    .boxed()
            };

            layers.push(file_layer);
            guard = Some(file_guard);
        }

        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .map_err(|_| LoggingError::AlreadyInitialized)?;

        Ok(guard)
    }
}

/// `TURNFLOW_LOG` wins over the configured level.
fn make_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_env(LOG_ENV_VAR) {
        Ok(filter) => Ok(filter),

        Err(_) => EnvFilter::try_new(level).context("Invalid log level in config"),
    }
}

fn validate_config(config: &LoggingConfig) -> Result<()> {
    if config.level.trim().is_empty() {
        return Err(LoggingError::ConfigError("Log level must not be empty".to_string()).into());
    }

    if config.log_file_prefix.trim().is_empty() {
        return Err(
            LoggingError::ConfigError("Log file prefix must not be empty".to_string()).into(),
        );
    }

    if let Some(log_dir) = &config.log_dir {
        validate_log_directory(log_dir)?;
    }

    Ok(())
}

fn validate_log_directory(path: &Path) -> Result<()> {
    if path.components().count() == 0 {
        return Err(LoggingError::InvalidLogDirectory("Empty path".to_string()).into());
    }

    for component in path.components() {
        if component == Component::ParentDir {
            return Err(LoggingError::InvalidLogDirectory(
                "Path contains parent directory references".to_string(),
            )
            .into());
        }
    }

    Ok(())
}

async fn setup_log_directory(log_dir: &Path) -> Result<()> {
    if !TokioFs::try_exists(log_dir).await.unwrap_or(false) {
        TokioFs::create_dir_all(log_dir)
            .await
            .map_err(LoggingError::DirectoryCreationFailed)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }
    Ok(())
}

pub async fn init_logging_with_config(config: LoggingConfig) -> Result<Option<WorkerGuard>> {
    LoggerBuilder::new().with_config(config).build().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_rejects_parent_dir_components() {
        let config = LoggingConfig {
            log_dir: Some(PathBuf::from("logs/../../etc")),
            ..LoggingConfig::default()
        };

        let err = validate_config(&config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoggingError>(),
            Some(LoggingError::InvalidLogDirectory(_))
        ));
    }

    #[test]
    fn test_rejects_blank_level() {
        let config = LoggerBuilder::new().with_level("  ").config().clone();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&LoggingConfig::default()).is_ok());
        assert!(make_filter("turnflow_core=debug,info").is_ok());
    }

    #[test]
    fn test_rotation_mapping() {
        assert_eq!(Rotation::from(LogRotation::Hourly), Rotation::HOURLY);
        assert_eq!(Rotation::from(LogRotation::Never), Rotation::NEVER);
    }

    #[tokio::test]
    async fn test_log_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        setup_log_directory(&nested).await.unwrap();

        assert!(nested.is_dir());
    }
}

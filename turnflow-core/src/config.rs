//! src/config.rs
//! ============================================================================
//! # Config: turnflow configuration loader and saver
//!
//! Loads and saves settings as TOML from the platform config path using the
//! [`directories`](https://docs.rs/directories) crate. Every section and field
//! is defaulted, so a partial (or empty) file is valid.
//!
//! ## Example
//! ```rust,ignore
//! let config = Config::load().await?;
//! let router = registry.freeze().with_config(config.dispatch.clone());
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use tokio::fs as TokioFs;

use crate::error::{AppError, AppResult};

/// Dispatcher tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Turns slower than this are logged at `warn`.
    #[serde(with = "humantime_serde")]
    pub slow_turn_threshold: Duration,

    /// Emit a `trace!` event for every handler invocation.
    pub trace_handlers: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            slow_turn_threshold: Duration::from_millis(500),
            trace_handlers: false,
        }
    }
}

/// Log file rotation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Never,

    Hourly,

    #[default]
    Daily,
}

/// Logging setup consumed by [`LoggerBuilder`](crate::logging::LoggerBuilder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `turnflow_core=debug`.
    pub level: String,

    /// Write logs to stderr.
    pub console: bool,

    /// Directory for rolling log files; no file output when unset.
    pub log_dir: Option<PathBuf>,

    pub log_file_prefix: String,

    pub rotation: LogRotation,

    /// JSON lines instead of plain text in the log files.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: true,
            log_dir: None,
            log_file_prefix: "turnflow".to_string(),
            rotation: LogRotation::Daily,
            json: true,
        }
    }
}

/// Main configuration struct for the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dispatch: DispatchConfig,

    pub logging: LoggingConfig,
}

impl Config {
    /// Loads config from `config.toml` in the platform config dir, or writes
    /// and returns defaults when no file exists yet.
    ///
    /// The config is expected at `$XDG_CONFIG_HOME/turnflow/config.toml`
    /// (Linux), or equivalent on Windows/macOS.
    pub async fn load() -> AppResult<Self> {
        let path = Self::config_path()?;

        if TokioFs::try_exists(&path)
            .await
            .map_err(|e| AppError::config_io(&path, e))?
        {
            Self::load_from(&path).await
        } else {
            info!(
                "No config file found at {}, using default configuration. Creating it now.",
                path.display()
            );

            let default_config = Self::default();
            default_config.save_to(&path).await?;

            Ok(default_config)
        }
    }

    /// Loads config from an explicit path. The file must exist.
    pub async fn load_from(path: &Path) -> AppResult<Self> {
        info!("Loading config from {}", path.display());

        let text = TokioFs::read_to_string(path)
            .await
            .map_err(|e| AppError::config_io(path, e))?;

        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> AppResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Saves config to the platform config dir.
    pub async fn save(&self) -> AppResult<()> {
        self.save_to(&Self::config_path()?).await
    }

    pub async fn save_to(&self, path: &Path) -> AppResult<()> {
        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::config_io(parent, e))?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        TokioFs::write(path, toml_str)
            .await
            .map_err(|e| AppError::config_io(path, e))?;

        Ok(())
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> AppResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the config directory (without filename).
    pub fn config_dir() -> AppResult<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("org", "turnflow", "turnflow").ok_or(AppError::ConfigDirUnavailable)?;

        Ok(proj_dirs.config_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_and_humantime() {
        let config = Config::from_toml_str(
            r#"
            [dispatch]
            slow_turn_threshold = "2s 500ms"

            [logging]
            level = "turnflow_core=debug"
            rotation = "hourly"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.dispatch.slow_turn_threshold,
            Duration::from_millis(2500)
        );
        assert!(!config.dispatch.trace_handlers);
        assert_eq!(config.logging.level, "turnflow_core=debug");
        assert_eq!(config.logging.rotation, LogRotation::Hourly);
        assert!(config.logging.console);
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let err = Config::from_toml_str("[dispatch]\ntrace_handlers = \"yes\"").unwrap_err();
        assert!(matches!(err, AppError::ConfigParse(_)));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.dispatch.trace_handlers = true;
        config.logging.log_dir = Some(dir.path().join("logs"));

        config.save_to(&path).await.unwrap();
        let loaded = Config::load_from(&path).await.unwrap();

        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = Config::load_from(&path).await.unwrap_err();
        assert!(matches!(err, AppError::ConfigIo { path: p, .. } if p == path));
    }
}

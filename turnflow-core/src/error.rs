//! src/error.rs
//! ============================================================================
//! # Error types for turnflow
//!
//! Two families live here:
//! - [`DispatchError`]: what `ActivityRouter::run` reports to its caller. The
//!   three precondition variants are raised before any handler executes; the
//!   `Handler` variant carries a bound handler's own failure untouched.
//! - [`AppError`]: configuration, I/O and serialization failures of the
//!   surrounding application (config loader, replay binary).

use std::{io, path::PathBuf};
use thiserror::Error;

/// Failure reported by a dispatch call.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// `run` was invoked without a turn context.
    #[error("Turn context is missing")]
    MissingContext,

    /// The turn context carries no activity.
    #[error("Turn context has no activity")]
    MissingActivity,

    /// The activity has no type, or an empty one.
    #[error("Activity is missing a type")]
    MissingActivityType,

    /// A bound handler failed. The source error is kept as the handler
    /// raised it and can be recovered with `anyhow::Error::downcast_ref`.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl DispatchError {
    /// True for the caller-misuse variants raised before dispatch starts.
    #[inline]
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::MissingContext | Self::MissingActivity | Self::MissingActivityType
        )
    }

    /// The handler failure, if this is one.
    #[must_use]
    pub fn handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Handler(e) => Some(e),
            _ => None,
        }
    }

    /// Grouping key used in structured logs.
    #[inline]
    #[must_use]
    pub const fn operation_type(&self) -> &'static str {
        match self {
            Self::MissingContext | Self::MissingActivity | Self::MissingActivityType => {
                "precondition"
            }

            Self::Handler(_) => "handler_failure",
        }
    }
}

/// Unified error type for the application around the dispatcher.
#[derive(Debug, Error)]
pub enum AppError {
    /// Standard IO error, auto-converted from `io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TOML config parsing error.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// TOML config rendering error.
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Config file I/O error with path.
    #[error("Failed to access config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No platform configuration directory could be determined.
    #[error("Could not determine config directory")]
    ConfigDirUnavailable,

    /// Serialization or deserialization error (e.g., JSON activities).
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Input validation errors
    #[error("Invalid input: {field} - {message}")]
    InvalidInput {
        field: String, // "label", "log_level", etc.
        message: String,
    },

    /// A dispatch call failed.
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// Any other error, with description.
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl AppError {
    #[must_use]
    /// Attach extra context to an error.
    pub fn with_context<S: Into<String>>(self, ctx: S) -> Self {
        Self::Other(format!("{}: {}", ctx.into(), self))
    }

    /// Create an input validation error
    pub fn invalid_input<S1: Into<String>, S2: Into<String>>(field: S1, message: S2) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a config file I/O error
    pub fn config_io<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Self::ConfigIo {
            path: path.into(),
            source,
        }
    }
}

// Allow conversion from `anyhow::Error` as fallback.
impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

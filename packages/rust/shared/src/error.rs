//! Error types for ManyBodyLab.
//!
//! Library crates use [`ManyBodyLabError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Note that the directory pipeline never hands these to its callers: the
//! client collapses them into empty/absent results at its public boundary.

use std::path::PathBuf;

/// Top-level error type for all ManyBodyLab operations.
#[derive(Debug, thiserror::Error)]
pub enum ManyBodyLabError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport failure or non-success HTTP status from the directory.
    #[error("network error: {0}")]
    Network(String),

    /// Response body did not match the expected record shape.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (empty identifiers, unusable URLs, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ManyBodyLabError>;

impl ManyBodyLabError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a decode error from any displayable message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

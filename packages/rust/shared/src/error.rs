//! Error types for ReadWatch.
//!
//! Library crates use [`ReadWatchError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all ReadWatch operations.
#[derive(Debug, thiserror::Error)]
pub enum ReadWatchError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP transport error.
    #[error("network error: {0}")]
    Network(String),

    /// HTML or response parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad input, malformed record).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The page probe could not classify the page (tab gone, probe failed).
    #[error("classification unavailable: {0}")]
    ClassificationUnavailable(String),

    /// The page probe could not extract content (tab gone, unresponsive).
    #[error("extraction unavailable: {0}")]
    ExtractionUnavailable(String),

    /// The inference engine failed to load.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// A generation request failed.
    #[error("inference error: {0}")]
    Inference(String),

    /// The inference engine was asked to generate before it became ready.
    #[error("inference engine is not ready")]
    NotReady,

    /// The backend already holds this URL for the user.
    #[error("duplicate content: {0}")]
    DuplicateContent(String),

    /// The backend rejected the request.
    #[error("backend error ({status}): {message}")]
    Api { status: u16, message: String },

    /// No credentials stored, or the backend rejected them.
    #[error("not authenticated: {0}")]
    Unauthenticated(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ReadWatchError>;

impl ReadWatchError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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

    /// Whether this is the backend's duplicate-item rejection.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateContent(_))
    }
}

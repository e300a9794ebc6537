//! Error types for jbook-nav.
//!
//! Library crates use [`NavError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all navigation operations.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport failure talking to the Jupyter server.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// JSON, YAML or HTML parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Parsed data does not have the expected shape.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// No common segment between the book root and the browser path.
    #[error("cannot reconcile book root {book_root:?} with browser path {browser_path:?}")]
    Resolution {
        book_root: String,
        browser_path: String,
    },

    /// A required piece of host or tree context is absent.
    #[error("missing context: {0}")]
    MissingContext(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, NavError>;

impl NavError {
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

    /// Create a missing-context error.
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingContext(msg.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

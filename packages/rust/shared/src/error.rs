//! Error types for contextpairs.
//!
//! Library crates use [`ContextPairsError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all contextpairs operations.
#[derive(Debug, thiserror::Error)]
pub enum ContextPairsError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the archive.
    #[error("network error: {0}")]
    Network(String),

    /// Archive response could not be decoded.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input export could not be read (missing header, unreadable file).
    #[error("input error: {0}")]
    Input(String),

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ContextPairsError>;

impl ContextPairsError {
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

    /// Whether this error came from talking to the archive (and may be transient).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Parse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ContextPairsError::config("buffer_size must be at least 1");
        assert_eq!(err.to_string(), "config error: buffer_size must be at least 1");

        let err = ContextPairsError::Network("https://archive.test: HTTP 502".into());
        assert!(err.to_string().contains("HTTP 502"));
    }

    #[test]
    fn transport_classification() {
        assert!(ContextPairsError::Network("timeout".into()).is_transport());
        assert!(ContextPairsError::parse("expected value").is_transport());
        assert!(!ContextPairsError::Input("missing header".into()).is_transport());
        assert!(
            !ContextPairsError::io("out.jsonl", std::io::Error::other("disk full")).is_transport()
        );
    }
}

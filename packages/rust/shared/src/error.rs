//! Error types for BookForge.
//!
//! Library crates use [`BookForgeError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all BookForge operations.
#[derive(Debug, thiserror::Error)]
pub enum BookForgeError {
    /// Configuration loading or missing-credential error. Fatal at startup.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error calling the search or generation APIs.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed or unusable chat-completion response.
    #[error("text generation error: {0}")]
    TextGeneration(String),

    /// Image-generation request failed. Non-fatal; that asset is skipped.
    #[error("image generation error: {0}")]
    ImageGeneration(String),

    /// Fetching generated image bytes failed. Non-fatal; that asset is skipped.
    #[error("image download error: {0}")]
    Download(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (topic too short, degraded research data, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BookForgeError>;

impl BookForgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = BookForgeError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = BookForgeError::Download("HTTP 404".into());
        assert!(err.to_string().contains("HTTP 404"));
    }
}

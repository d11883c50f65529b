//! Error types for Postforge.
//!
//! Library crates use [`PostforgeError`] via `thiserror`.
//! The CLI binary wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Postforge operations.
#[derive(Debug, thiserror::Error)]
pub enum PostforgeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during harvesting or source fetching.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Web search provider error (transport, HTTP, or response shape).
    #[error("search error: {0}")]
    Search(String),

    /// LLM rewrite error (API, response parsing, or degenerate output).
    #[error("rewrite error: {0}")]
    Rewrite(String),

    /// The source-gathering loop ran out of links before reaching its target.
    #[error("found {found}/{required} valid sources")]
    InsufficientSources { found: usize, required: usize },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PostforgeError>;

impl PostforgeError {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PostforgeError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = PostforgeError::validation("URL has no host");
        assert!(err.to_string().contains("no host"));
    }

    #[test]
    fn insufficient_sources_message() {
        let err = PostforgeError::InsufficientSources {
            found: 1,
            required: 2,
        };
        assert_eq!(err.to_string(), "found 1/2 valid sources");
    }
}

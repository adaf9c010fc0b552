//! Error types for title_parser
//!
//! This module provides structured error handling using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for parser operations
pub type Result<T> = std::result::Result<T, ParserError>;

/// Errors that can occur while loading patterns or processing titles
#[derive(Error, Debug)]
pub enum ParserError {
    /// IO error during store or report operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pattern store could not be opened at startup
    #[error("Pattern store unreachable: {path}: {message}")]
    StoreUnreachable { path: PathBuf, message: String },

    /// A pattern's regex source failed to compile
    #[error("Pattern '{term}' failed to compile: {message}")]
    PatternCompile { term: String, message: String },

    /// A stage reported an internal failure
    #[error("Stage '{stage}' failed: {message}")]
    StageFailure {
        stage: &'static str,
        message: String,
    },

    /// A single title exceeded its processing budget
    #[error("Title processing timed out after {elapsed_ms}ms (budget {budget_ms}ms)")]
    Timeout { elapsed_ms: u64, budget_ms: u64 },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Result persistence failure
    #[error("Persistence error: {message}")]
    Persistence { message: String },
}

impl ParserError {
    /// Build a stage failure with a formatted message.
    pub fn stage(stage: &'static str, message: impl Into<String>) -> Self {
        Self::StageFailure {
            stage,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParserError::StoreUnreachable {
            path: PathBuf::from("/tmp/patterns.json"),
            message: "no such file".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Pattern store unreachable"));
        assert!(msg.contains("patterns.json"));
    }

    #[test]
    fn test_stage_helper() {
        let err = ParserError::stage("date_extraction", "bad span");
        assert!(err.to_string().contains("date_extraction"));
        assert!(err.to_string().contains("bad span"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ParserError = io.into();
        assert!(matches!(err, ParserError::Io(_)));
    }
}

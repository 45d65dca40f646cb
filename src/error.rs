//! Error handling for visnet
//!
//! Each subsystem has its own error enum; [`VisError`] gathers them for
//! callers that cross subsystem boundaries (document I/O, the CLI).

use crate::datastructures::DataError;
use crate::network::{NetworkError, ProcessorError};
use thiserror::Error;

/// Main error type for visnet operations
#[derive(Error, Debug)]
pub enum VisError {
    /// Structural network edits and document loading
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Representation conversion and data access
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Errors raised by a processor outside an evaluation pass
    #[error("Processor error: {0}")]
    Processor(#[from] ProcessorError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<VisError>,
    },
}

impl VisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        VisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for VisError {
    fn from(err: serde_json::Error) -> Self {
        VisError::Serialization(err.to_string())
    }
}

/// Result type alias for visnet operations
pub type Result<T> = std::result::Result<T, VisError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<VisError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VisError::Config("missing evaluation table".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: missing evaluation table"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = VisError::Serialization("test".to_string());
        let with_ctx = err.with_context("Failed to parse");
        assert!(with_ctx.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_network_error_context() {
        let result: std::result::Result<(), NetworkError> =
            Err(NetworkError::UnknownProcessor("reader".to_string()));
        let err = result.context("Loading workspace").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Loading workspace: Network error: Unknown processor: reader"
        );
    }
}

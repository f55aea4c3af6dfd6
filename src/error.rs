//! Error types for atencion
//!
//! Every failure is fatal to the enclosing protocol: configuration and data
//! errors abort before any training, composition and evaluation errors abort
//! the protocol that raised them, and a single worker error fails the whole
//! multi-fold dispatch.

use crate::config::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Harness error types
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Configuration parsed but failed validation
    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    /// A registry lookup failed
    #[error("Unknown {kind} '{name}' (registered: {known})")]
    UnknownName {
        /// Registry kind ("model", "optimizer", "loss")
        kind: &'static str,
        /// Requested name
        name: String,
        /// Comma separated list of registered names
        known: String,
    },

    /// A recording is missing, unreadable or malformed
    #[error("Data error in {path}: {message}")]
    DataError {
        /// Offending recording path
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// A composed collection contains no samples
    #[error("Empty {role} collection ({context})")]
    EmptyCollection {
        /// Collection role ("train", "validation", "test", "breakdown")
        role: &'static str,
        /// Protocol iteration description
        context: String,
    },

    /// Fold or subject selection is out of range
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// Evaluation collaborator failed
    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    /// A multi-fold worker failed
    #[error("Fold worker failed: {0}")]
    Worker(String),

    /// Figure rendering failed
    #[error("Plot error: {0}")]
    Plot(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a data error for a recording path
    pub fn data(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DataError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the error was raised before any data was touched
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigError(_) | Self::Validation(_) | Self::UnknownName { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_error_mentions_path() {
        let err = Error::data("/data/erp/sbj01.json", "signal length mismatch");
        let msg = err.to_string();
        assert!(msg.contains("sbj01.json"));
        assert!(msg.contains("signal length mismatch"));
    }

    #[test]
    fn test_config_errors_are_classified() {
        assert!(Error::ConfigError("x".into()).is_config_error());
        assert!(Error::UnknownName {
            kind: "model",
            name: "Nope".into(),
            known: "LinearProbe".into(),
        }
        .is_config_error());
        assert!(!Error::Worker("boom".into()).is_config_error());
    }
}

//! Error types shared by the recommender crates
//!
//! Configuration and dataset errors are fatal and surface at the call that
//! detects them. Catalog misses are not errors; see `artist_rec::catalog`.

use thiserror::Error;

/// Errors produced while loading data, training, ranking or evaluating
#[derive(Debug, Error)]
pub enum RecommenderError {
    /// A hyperparameter or configuration value is out of range
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
        key: Option<String>,
    },

    /// A dataset required to be non-empty was empty
    #[error("Empty dataset: {dataset}")]
    EmptyDataset { dataset: String },

    /// A normal-equation system could not be solved
    #[error("Numerical failure: {message}")]
    Numerical { message: String },

    /// Training observed a cancellation request
    #[error("Training cancelled after {completed_iterations} completed iterations")]
    Cancelled { completed_iterations: usize },

    /// Malformed input line
    #[error("Failed to parse {source_name} line {line}: {message}")]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecommenderError {
    /// Create an `InvalidConfiguration` error tied to a configuration key
    pub fn invalid_config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create an `InvalidConfiguration` error without a key
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
            key: None,
        }
    }

    pub fn empty(dataset: impl Into<String>) -> Self {
        Self::EmptyDataset {
            dataset: dataset.into(),
        }
    }

    pub fn numerical(message: impl Into<String>) -> Self {
        Self::Numerical {
            message: message.into(),
        }
    }

    /// Configuration key responsible for the error, if known
    pub fn config_key(&self) -> Option<&str> {
        match self {
            Self::InvalidConfiguration { key, .. } => key.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_carries_key() {
        let err = RecommenderError::invalid_config("rank must be at least 1", "rank");
        assert_eq!(err.config_key(), Some("rank"));
        assert_eq!(
            err.to_string(),
            "Invalid configuration: rank must be at least 1"
        );
    }

    #[test]
    fn test_empty_dataset_message() {
        let err = RecommenderError::empty("training set");
        assert_eq!(err.to_string(), "Empty dataset: training set");
        assert!(err.config_key().is_none());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: RecommenderError = io.into();
        assert!(matches!(err, RecommenderError::Io(_)));
    }
}

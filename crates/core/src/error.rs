use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// A structural mismatch found while decoding stored data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// Dotted location of the offending value, e.g. `projects[0].status`.
    pub path: String,
    pub expected: String,
}

impl DecodeError {
    pub fn new(path: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "<root>" } else { &self.path };
        write!(f, "at {path}: expected {}", self.expected)
    }
}

impl std::error::Error for DecodeError {}

/// The persisted collection cannot be trusted. Recovery means discarding it.
#[derive(Debug, Error)]
pub enum CorruptStoreError {
    #[error("stored project data is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("stored project data has an invalid shape: {0}")]
    InvalidShape(#[from] DecodeError),
}

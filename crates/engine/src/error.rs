use courseforge_core::{CoreError, CorruptStoreError, ProjectId};
use courseforge_storage::StorageError;
use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error(transparent)]
    Corrupt(#[from] CorruptStoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// The validation failure, if this is one. Validation failures are the
    /// only recoverable kind: nothing was written.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }
}

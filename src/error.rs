use crate::models::Permission;
use crate::utils::path_codec::PathCodecError;
use std::time::Duration;

/// Result type used across the block core.
pub type BlockResult<T> = Result<T, BlockError>;

/// Error kinds surfaced to adapters.
///
/// Storage failures keep the underlying `sqlx::Error` as their source so the
/// caller can log it; the core never retries them.
#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("block not found: {0}")]
    BlockNotFound(String),

    #[error("access grant not found: {0}")]
    GrantNotFound(String),

    #[error("access denied: '{actor_id}' needs {required} on block '{block_id}'")]
    BlockAccessDenied {
        actor_id: String,
        block_id: String,
        required: Permission,
    },

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("failed to create: {0}")]
    FailedToCreate(#[source] sqlx::Error),

    #[error("failed to update: {0}")]
    FailedToUpdate(#[source] sqlx::Error),

    #[error("failed to delete: {0}")]
    FailedToDelete(#[source] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(#[source] sqlx::Error),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("operation cancelled")]
    Cancelled,
}

impl BlockError {
    pub fn validation(details: impl Into<String>) -> Self {
        BlockError::ValidationFailed(details.into())
    }

    pub fn access_denied(actor_id: &str, block_id: &str, required: Permission) -> Self {
        BlockError::BlockAccessDenied {
            actor_id: actor_id.to_string(),
            block_id: block_id.to_string(),
            required,
        }
    }

    /// True when the underlying storage error is a unique constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            BlockError::FailedToCreate(e)
            | BlockError::FailedToUpdate(e)
            | BlockError::FailedToDelete(e)
            | BlockError::Storage(e) => e
                .as_database_error()
                .map(|db| db.is_unique_violation())
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl From<PathCodecError> for BlockError {
    fn from(e: PathCodecError) -> Self {
        BlockError::ValidationFailed(e.to_string())
    }
}

use thiserror::Error;

/// Errors that can occur in the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A document body could not be encoded or decoded.
    #[error("Document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The target definition failed validation before the write.
    #[error(transparent)]
    InvalidTarget(#[from] pagewatch_core::CoreError),

    /// No target with the given id exists in the config document.
    #[error("Target not found: {id}")]
    TargetNotFound { id: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

//! Storage error types.

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested key was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A backend operation failed.
    #[error("storage error: {0}")]
    Internal(String),

    /// The backend could not be opened.
    #[error("connection error: {0}")]
    Connection(String),

    /// A stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The namespace or key is malformed.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

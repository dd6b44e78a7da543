//! Audit-related error types.

use hearth_storage::StorageError;
use thiserror::Error;

use crate::entry::AuditStatus;

/// Errors that can occur with audit logging.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The backing store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An entry could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Entry not found.
    #[error("audit entry not found: {entry_id}")]
    EntryNotFound {
        /// The entry ID that was not found.
        entry_id: String,
    },

    /// The requested status change is not allowed.
    #[error("audit entry {entry_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The entry being changed.
        entry_id: String,
        /// Current status.
        from: AuditStatus,
        /// Requested status.
        to: AuditStatus,
    },

    /// Another writer changed the entry between read and write.
    #[error("audit entry {entry_id} was modified concurrently")]
    Conflict {
        /// The contended entry.
        entry_id: String,
    },
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

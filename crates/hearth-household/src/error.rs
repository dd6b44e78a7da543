//! Household domain errors.

use hearth_storage::StorageError;
use thiserror::Error;

use crate::entity::EntityRef;

/// Errors from parsing or applying household function calls.
#[derive(Debug, Error)]
pub enum HouseholdError {
    /// The function name is not in the catalog.
    #[error("unknown function: {name}")]
    UnknownFunction {
        /// The rejected name.
        name: String,
    },

    /// The arguments do not match the function's schema or constraints.
    #[error("invalid arguments for {function}: {message}")]
    InvalidArguments {
        /// Function the arguments were meant for.
        function: String,
        /// What was wrong.
        message: String,
    },

    /// The call references an entity that does not exist.
    #[error("{entity} not found")]
    EntityNotFound {
        /// The missing entity.
        entity: EntityRef,
    },

    /// A create call collides with an existing entity.
    #[error("{entity} already exists")]
    EntityExists {
        /// The existing entity.
        entity: EntityRef,
    },

    /// A stored entity or snapshot could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The underlying store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl HouseholdError {
    pub(crate) fn invalid(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// Result type for household operations.
pub type HouseholdResult<T> = Result<T, HouseholdError>;

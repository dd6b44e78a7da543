use hearth_audit::AuditError;
use hearth_household::HouseholdError;
use hearth_storage::StorageError;

use crate::trust::DecisionReason;

/// Errors returned by the proposal and trust engine.
///
/// Everything except [`ExecutionFailed`](Self::ExecutionFailed),
/// [`Storage`](Self::Storage) and [`Internal`](Self::Internal) is detected
/// before any household data or audit entry is written.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// The proposal or audit entry does not exist for this household.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// What was looked up (`"proposal"`, `"audit entry"`).
        resource: &'static str,
        /// The id that was not found.
        id: String,
    },

    /// The proposal was already decided.
    #[error("proposal {id} is already resolved ({status})")]
    AlreadyResolved {
        /// The proposal.
        id: String,
        /// Its current status.
        status: String,
    },

    /// A proposal TTL or undo window elapsed.
    #[error("{what} expired")]
    Expired {
        /// What expired (`"proposal proposal:.."`, `"undo window for audit:.."`).
        what: String,
    },

    /// The household's trust window is full.
    #[error("rate limited: {recent} of {max} actions used in the last {window_seconds}s")]
    RateLimited {
        /// Executions inside the current window.
        recent: u32,
        /// Allowed executions per window.
        max: u32,
        /// Window length.
        window_seconds: u64,
    },

    /// The action cannot be undone.
    #[error("audit entry {id} is not reversible")]
    NotReversible {
        /// The audit entry.
        id: String,
    },

    /// The underlying mutation or restore failed.
    #[error("execution failed: {message}")]
    ExecutionFailed {
        /// Error detail from the household store.
        message: String,
    },

    /// Partial approval selected nothing or unknown actions.
    #[error("invalid selection: {message}")]
    InvalidSelection {
        /// What was wrong with the selection.
        message: String,
    },

    /// The target is not in a state that allows the operation.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Why the operation is not allowed.
        message: String,
    },

    /// The intent names an unknown function or has bad arguments.
    #[error("invalid intent: {message}")]
    InvalidArguments {
        /// Validation detail.
        message: String,
    },

    /// Auto-execution was requested for an intent that needs confirmation.
    #[error("not auto-approved: {reason}")]
    NotAutoApproved {
        /// Why trust denied it.
        reason: DecisionReason,
    },

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal engine error.
    #[error("internal approval error: {0}")]
    Internal(String),
}

impl ApprovalError {
    /// Stable machine-readable code for the error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyResolved { .. } => "ALREADY_RESOLVED",
            Self::Expired { .. } => "EXPIRED",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::NotReversible { .. } => "NOT_REVERSIBLE",
            Self::ExecutionFailed { .. } => "EXECUTION_FAILED",
            Self::InvalidSelection { .. } => "INVALID_SELECTION",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::InvalidArguments { .. } => "INVALID_ARGUMENTS",
            Self::NotAutoApproved { .. } => "NOT_AUTO_APPROVED",
            Self::Storage(_) => "STORAGE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_selection(message: impl Into<String>) -> Self {
        Self::InvalidSelection {
            message: message.into(),
        }
    }
}

impl From<StorageError> for ApprovalError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<AuditError> for ApprovalError {
    fn from(e: AuditError) -> Self {
        match e {
            AuditError::EntryNotFound { entry_id } => Self::NotFound {
                resource: "audit entry",
                id: entry_id,
            },
            AuditError::InvalidTransition { entry_id, from, to } => Self::InvalidState {
                message: format!("audit entry {entry_id} cannot move from {from} to {to}"),
            },
            AuditError::Conflict { entry_id } => Self::InvalidState {
                message: format!("audit entry {entry_id} was changed concurrently"),
            },
            AuditError::Storage(e) => Self::Storage(e.to_string()),
            AuditError::Serialization(msg) => Self::Storage(msg),
        }
    }
}

impl From<HouseholdError> for ApprovalError {
    fn from(e: HouseholdError) -> Self {
        match e {
            HouseholdError::UnknownFunction { .. } | HouseholdError::InvalidArguments { .. } => {
                Self::InvalidArguments {
                    message: e.to_string(),
                }
            },
            HouseholdError::EntityNotFound { .. }
            | HouseholdError::EntityExists { .. }
            | HouseholdError::Serialization(_) => Self::ExecutionFailed {
                message: e.to_string(),
            },
            HouseholdError::Storage(e) => Self::Storage(e.to_string()),
        }
    }
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_household::{EntityKind, EntityRef};

    #[test]
    fn test_household_errors_map_by_phase() {
        let parse: ApprovalError = HouseholdError::UnknownFunction {
            name: "launch_rocket".into(),
        }
        .into();
        assert_eq!(parse.code(), "INVALID_ARGUMENTS");

        let apply: ApprovalError = HouseholdError::EntityNotFound {
            entity: EntityRef::new(EntityKind::Recipe, "r1"),
        }
        .into();
        assert_eq!(apply.code(), "EXECUTION_FAILED");
    }

    #[test]
    fn test_rate_limited_message() {
        let e = ApprovalError::RateLimited {
            recent: 3,
            max: 3,
            window_seconds: 60,
        };
        assert_eq!(
            e.to_string(),
            "rate limited: 3 of 3 actions used in the last 60s"
        );
    }
}

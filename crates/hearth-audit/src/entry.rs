//! Audit entry types.
//!
//! One entry is written per executed action, before the action mutates any
//! household data. Its status then moves forward exactly once or twice:
//!
//! ```text
//! STARTED ──► SUCCEEDED ──► UNDONE
//!    │
//!    └──────► FAILED
//! ```

use std::fmt;

use hearth_core::{ActionId, HouseholdId, ProposalId, RiskLevel, Timestamp, UserId};
use hearth_household::{ActionOutput, StateSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AuditError, AuditResult};

/// Unique identifier for an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEntryId(pub Uuid);

impl AuditEntryId {
    /// Create a new random entry ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuditEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "audit:{}", self.0)
    }
}

impl std::str::FromStr for AuditEntryId {
    type Err = hearth_core::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("audit:").unwrap_or(s);
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| hearth_core::ParseError {
                kind: "audit entry id",
                value: s.to_owned(),
            })
    }
}

/// Lifecycle state of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    /// Recorded, mutation not yet finished.
    Started,
    /// The mutation was applied.
    Succeeded,
    /// The mutation failed; nothing was applied.
    Failed,
    /// The mutation was applied and later reverted.
    Undone,
}

impl AuditStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Undone)
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Started => "STARTED",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Undone => "UNDONE",
        };
        f.write_str(s)
    }
}

/// Fields supplied when an entry is first recorded.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    /// Owning household.
    pub household_id: HouseholdId,
    /// Member on whose behalf the action ran.
    pub user_id: Option<UserId>,
    /// Originating proposal, if any.
    pub proposal_id: Option<ProposalId>,
    /// Originating proposed action, if any.
    pub action_id: Option<ActionId>,
    /// Catalog function name.
    pub function_name: String,
    /// Arguments the function ran with.
    pub arguments: Value,
    /// Risk level at execution time.
    pub risk_level: RiskLevel,
    /// Reversibility at execution time.
    pub is_reversible: bool,
    /// State captured before the mutation (reversible actions only).
    pub pre_state: Option<StateSnapshot>,
}

/// A single audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry identifier.
    pub id: AuditEntryId,
    /// Owning household.
    pub household_id: HouseholdId,
    /// Member on whose behalf the action ran.
    pub user_id: Option<UserId>,
    /// Originating proposal, if any.
    pub proposal_id: Option<ProposalId>,
    /// Originating proposed action, if any.
    pub action_id: Option<ActionId>,
    /// Catalog function name.
    pub function_name: String,
    /// Arguments the function ran with.
    pub arguments: Value,
    /// Risk level at execution time.
    pub risk_level: RiskLevel,
    /// Reversibility at execution time.
    pub is_reversible: bool,
    /// What the mutation produced.
    pub result: Option<ActionOutput>,
    /// Why the mutation failed.
    pub error: Option<String>,
    /// State captured before the mutation.
    pub pre_state: Option<StateSnapshot>,
    /// Lifecycle state.
    pub status: AuditStatus,
    /// When the entry was recorded.
    pub started_at: Timestamp,
    /// When the mutation finished (success or failure).
    pub completed_at: Option<Timestamp>,
    /// When the mutation was reverted.
    pub undone_at: Option<Timestamp>,
    /// Who reverted it.
    pub undone_by: Option<UserId>,
}

impl AuditEntry {
    /// Build a STARTED entry.
    #[must_use]
    pub fn started(new: NewAuditEntry, at: Timestamp) -> Self {
        Self {
            id: AuditEntryId::new(),
            household_id: new.household_id,
            user_id: new.user_id,
            proposal_id: new.proposal_id,
            action_id: new.action_id,
            function_name: new.function_name,
            arguments: new.arguments,
            risk_level: new.risk_level,
            is_reversible: new.is_reversible,
            result: None,
            error: None,
            pre_state: new.pre_state,
            status: AuditStatus::Started,
            started_at: at,
            completed_at: None,
            undone_at: None,
            undone_by: None,
        }
    }

    fn transition(&mut self, from: AuditStatus, to: AuditStatus) -> AuditResult<()> {
        if self.status != from {
            return Err(AuditError::InvalidTransition {
                entry_id: self.id.to_string(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// STARTED → SUCCEEDED.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidTransition`] from any other status.
    pub fn succeed(&mut self, result: ActionOutput, at: Timestamp) -> AuditResult<()> {
        self.transition(AuditStatus::Started, AuditStatus::Succeeded)?;
        self.result = Some(result);
        self.completed_at = Some(at);
        Ok(())
    }

    /// STARTED → FAILED.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidTransition`] from any other status.
    pub fn fail(&mut self, error: impl Into<String>, at: Timestamp) -> AuditResult<()> {
        self.transition(AuditStatus::Started, AuditStatus::Failed)?;
        self.error = Some(error.into());
        self.completed_at = Some(at);
        Ok(())
    }

    /// SUCCEEDED → UNDONE.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidTransition`] from any other status.
    pub fn mark_undone(&mut self, by: Option<UserId>, at: Timestamp) -> AuditResult<()> {
        self.transition(AuditStatus::Succeeded, AuditStatus::Undone)?;
        self.undone_at = Some(at);
        self.undone_by = by;
        Ok(())
    }

    /// UNDONE → SUCCEEDED, for an undo whose restore did not go through.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidTransition`] from any other status.
    pub fn reopen(&mut self) -> AuditResult<()> {
        self.transition(AuditStatus::Undone, AuditStatus::Succeeded)?;
        self.undone_at = None;
        self.undone_by = None;
        Ok(())
    }

    /// Whether this entry can still be reverted, ignoring the time window.
    #[must_use]
    pub fn is_undoable(&self) -> bool {
        self.status == AuditStatus::Succeeded && self.is_reversible && self.pre_state.is_some()
    }
}

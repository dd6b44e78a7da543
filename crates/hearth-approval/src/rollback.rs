//! Undo of executed actions from their audit entries.

use std::fmt;
use std::sync::Arc;

use hearth_audit::{AuditEntry, AuditEntryId, AuditLog, AuditStatus};
use hearth_core::{Clock, HouseholdId, Timestamp, UserId};
use hearth_household::HouseholdData;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApprovalError, ApprovalResult};

/// Default time after completion during which an action can be undone.
pub const DEFAULT_UNDO_WINDOW_SECS: u64 = 300;

/// What an undo restored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackResult {
    /// The reverted entry.
    pub audit_log_id: AuditEntryId,
    /// Function that was reverted.
    pub function_name: String,
    /// Number of entities written back or deleted.
    pub restored_entities: usize,
    /// When the entry was marked UNDONE.
    pub undone_at: Timestamp,
}

/// Reverts single actions by restoring their captured pre-state.
#[derive(Clone)]
pub struct RollbackEngine {
    household: Arc<dyn HouseholdData>,
    audit: AuditLog,
    clock: Arc<dyn Clock>,
    undo_window_secs: u64,
}

impl fmt::Debug for RollbackEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollbackEngine")
            .field("undo_window_secs", &self.undo_window_secs)
            .finish_non_exhaustive()
    }
}

impl RollbackEngine {
    /// Create a rollback engine.
    #[must_use]
    pub fn new(
        household: Arc<dyn HouseholdData>,
        audit: AuditLog,
        clock: Arc<dyn Clock>,
        undo_window_secs: u64,
    ) -> Self {
        Self {
            household,
            audit,
            clock,
            undo_window_secs,
        }
    }

    /// Configured undo window.
    #[must_use]
    pub fn undo_window_secs(&self) -> u64 {
        self.undo_window_secs
    }

    /// Last instant at which `entry` may still be undone.
    fn deadline(&self, entry: &AuditEntry) -> Option<Timestamp> {
        entry
            .completed_at
            .unwrap_or(entry.started_at)
            .checked_add_secs(self.undo_window_secs)
    }

    fn within_window(&self, entry: &AuditEntry, now: Timestamp) -> bool {
        // A deadline past the representable range never elapses.
        self.deadline(entry).is_none_or(|deadline| now <= deadline)
    }

    /// Undo one action.
    ///
    /// Only the named entry is reverted. Later actions of the same proposal
    /// are left alone even if they touched the same entities.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    /// - [`ApprovalError::NotFound`] if the entry does not exist for `household`
    /// - [`ApprovalError::InvalidState`] unless the entry SUCCEEDED
    /// - [`ApprovalError::NotReversible`] if it has no usable pre-state
    /// - [`ApprovalError::Expired`] once the undo window has passed
    ///
    /// The entry is marked UNDONE before the pre-state is written back, so a
    /// concurrent undo of the same entry fails with
    /// [`ApprovalError::InvalidState`] without restoring anything. A failed
    /// restore returns [`ApprovalError::ExecutionFailed`] and puts the entry
    /// back to SUCCEEDED.
    pub async fn undo(
        &self,
        household: HouseholdId,
        audit_log_id: &AuditEntryId,
        actor: Option<UserId>,
    ) -> ApprovalResult<RollbackResult> {
        let entry = self
            .audit
            .get(&household, audit_log_id)
            .await?
            .ok_or_else(|| ApprovalError::NotFound {
                resource: "audit entry",
                id: audit_log_id.to_string(),
            })?;

        if entry.status != AuditStatus::Succeeded {
            return Err(ApprovalError::invalid_state(format!(
                "audit entry {} is {} and cannot be undone",
                entry.id, entry.status
            )));
        }
        let Some(pre_state) = entry.pre_state.as_ref().filter(|_| entry.is_reversible) else {
            return Err(ApprovalError::NotReversible {
                id: entry.id.to_string(),
            });
        };
        let now = self.clock.now();
        if !self.within_window(&entry, now) {
            return Err(ApprovalError::Expired {
                what: format!("undo window for {}", entry.id),
            });
        }

        // Claiming the entry first means only one concurrent undo restores.
        let undone = self.audit.mark_undone(&entry.id, actor).await?;
        if let Err(e) = self.household.restore(household, pre_state).await {
            warn!(audit_id = %entry.id, household = %household, error = %e, "restore failed");
            if let Err(reopen) = self.audit.reopen(&entry.id).await {
                warn!(audit_id = %entry.id, error = %reopen, "undo claim could not be released");
            }
            return Err(ApprovalError::ExecutionFailed {
                message: e.to_string(),
            });
        }

        info!(
            audit_id = %entry.id,
            household = %household,
            function = %entry.function_name,
            restored = pre_state.entities.len(),
            "action rolled back"
        );
        Ok(RollbackResult {
            audit_log_id: undone.id,
            function_name: undone.function_name,
            restored_entities: pre_state.entities.len(),
            undone_at: undone.undone_at.unwrap_or(now),
        })
    }

    /// Entries of `household` that can still be undone right now, newest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns an error if the audit log cannot be read.
    pub async fn undoable_entries(
        &self,
        household: &HouseholdId,
    ) -> ApprovalResult<Vec<AuditEntry>> {
        let now = self.clock.now();
        let mut entries: Vec<AuditEntry> = self
            .audit
            .household_entries(household)
            .await?
            .into_iter()
            .filter(|e| e.is_undoable() && self.within_window(e, now))
            .collect();
        entries.reverse();
        Ok(entries)
    }
}

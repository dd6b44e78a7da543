//! The audit log facade.

use std::sync::Arc;

use hearth_core::{Clock, HouseholdId, Timestamp, UserId};
use hearth_household::ActionOutput;
use tracing::{debug, info};

use crate::entry::{AuditEntry, AuditEntryId, AuditStatus, NewAuditEntry};
use crate::error::{AuditError, AuditResult};
use crate::storage::AuditStorage;

/// Records assistant actions and their outcomes.
///
/// Every method that changes an entry reads it, applies the transition on
/// [`AuditEntry`], and writes it back conditional on the status it read.
#[derive(Clone)]
pub struct AuditLog {
    storage: Arc<dyn AuditStorage>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl AuditLog {
    /// Create an audit log over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn AuditStorage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Record a STARTED entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be persisted.
    pub async fn begin(&self, new: NewAuditEntry) -> AuditResult<AuditEntry> {
        let entry = AuditEntry::started(new, self.clock.now());
        self.storage.insert(&entry).await?;
        debug!(
            audit_id = %entry.id,
            household = %entry.household_id,
            function = %entry.function_name,
            risk = %entry.risk_level,
            "audit entry started"
        );
        Ok(entry)
    }

    /// Mark an entry SUCCEEDED with its result.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::EntryNotFound`], [`AuditError::InvalidTransition`]
    /// or [`AuditError::Conflict`].
    pub async fn succeed(
        &self,
        id: &AuditEntryId,
        result: ActionOutput,
    ) -> AuditResult<AuditEntry> {
        let now = self.clock.now();
        let entry = self
            .update(id, AuditStatus::Started, |e| e.succeed(result, now))
            .await?;
        info!(
            audit_id = %entry.id,
            household = %entry.household_id,
            function = %entry.function_name,
            "assistant action succeeded"
        );
        Ok(entry)
    }

    /// Mark an entry FAILED with an error message.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::EntryNotFound`], [`AuditError::InvalidTransition`]
    /// or [`AuditError::Conflict`].
    pub async fn fail(
        &self,
        id: &AuditEntryId,
        error: impl Into<String>,
    ) -> AuditResult<AuditEntry> {
        let now = self.clock.now();
        let error = error.into();
        let entry = self
            .update(id, AuditStatus::Started, |e| e.fail(error, now))
            .await?;
        info!(
            audit_id = %entry.id,
            household = %entry.household_id,
            function = %entry.function_name,
            error = entry.error.as_deref().unwrap_or_default(),
            "assistant action failed"
        );
        Ok(entry)
    }

    /// Mark a SUCCEEDED entry UNDONE.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::EntryNotFound`], [`AuditError::InvalidTransition`]
    /// or [`AuditError::Conflict`].
    pub async fn mark_undone(
        &self,
        id: &AuditEntryId,
        by: Option<UserId>,
    ) -> AuditResult<AuditEntry> {
        let now = self.clock.now();
        let entry = self
            .update(id, AuditStatus::Succeeded, |e| e.mark_undone(by, now))
            .await?;
        info!(audit_id = %entry.id, household = %entry.household_id, "assistant action undone");
        Ok(entry)
    }

    /// Return an UNDONE entry to SUCCEEDED.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::EntryNotFound`], [`AuditError::InvalidTransition`]
    /// or [`AuditError::Conflict`].
    pub async fn reopen(&self, id: &AuditEntryId) -> AuditResult<AuditEntry> {
        let entry = self
            .update(id, AuditStatus::Undone, AuditEntry::reopen)
            .await?;
        info!(audit_id = %entry.id, household = %entry.household_id, "undo released");
        Ok(entry)
    }

    async fn update(
        &self,
        id: &AuditEntryId,
        expected: AuditStatus,
        apply: impl FnOnce(&mut AuditEntry) -> AuditResult<()>,
    ) -> AuditResult<AuditEntry> {
        let mut entry = self
            .storage
            .get(id)
            .await?
            .ok_or_else(|| AuditError::EntryNotFound {
                entry_id: id.to_string(),
            })?;
        apply(&mut entry)?;
        self.storage.replace(&entry, expected).await?;
        Ok(entry)
    }

    /// Get an entry, scoped to `household`. Entries of other households are
    /// reported as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    pub async fn get(
        &self,
        household: &HouseholdId,
        id: &AuditEntryId,
    ) -> AuditResult<Option<AuditEntry>> {
        Ok(self
            .storage
            .get(id)
            .await?
            .filter(|e| &e.household_id == household))
    }

    /// All entries of a household, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    pub async fn household_entries(&self, household: &HouseholdId) -> AuditResult<Vec<AuditEntry>> {
        self.storage.household_entries(household).await
    }

    /// Entries of a household started within `[start, end]`.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    pub async fn entries_in_range(
        &self,
        household: &HouseholdId,
        start: Timestamp,
        end: Timestamp,
    ) -> AuditResult<Vec<AuditEntry>> {
        Ok(self
            .household_entries(household)
            .await?
            .into_iter()
            .filter(|e| e.started_at >= start && e.started_at <= end)
            .collect())
    }

    /// Number of entries recorded for a household.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    pub async fn count_household(&self, household: &HouseholdId) -> AuditResult<usize> {
        Ok(self.household_entries(household).await?.len())
    }
}

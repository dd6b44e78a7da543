//! Mock collaborators for failure injection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hearth_audit::{AuditEntry, AuditEntryId, AuditError, AuditResult, AuditStatus, AuditStorage};
use hearth_core::HouseholdId;
use hearth_household::{
    ActionOutput, FunctionCall, HouseholdData, HouseholdError, HouseholdResult, StateSnapshot,
};
use hearth_storage::StorageError;

/// Message carried by every injected failure.
pub const INJECTED_FAILURE: &str = "injected failure";

/// Which calls a [`FailingHouseholdData`] should fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailurePlan {
    /// Zero-based index of the `apply` call to fail.
    pub fail_apply_at: Option<usize>,
    /// Fail every `snapshot` call.
    pub fail_snapshots: bool,
    /// Fail every `restore` call.
    pub fail_restores: bool,
}

impl FailurePlan {
    /// Fail the `index`-th apply call (zero-based).
    #[must_use]
    pub fn apply_at(index: usize) -> Self {
        Self {
            fail_apply_at: Some(index),
            ..Self::default()
        }
    }

    /// Fail every restore.
    #[must_use]
    pub fn restores() -> Self {
        Self {
            fail_restores: true,
            ..Self::default()
        }
    }

    /// Fail every snapshot.
    #[must_use]
    pub fn snapshots() -> Self {
        Self {
            fail_snapshots: true,
            ..Self::default()
        }
    }
}

fn injected() -> HouseholdError {
    HouseholdError::Storage(StorageError::Internal(INJECTED_FAILURE.to_owned()))
}

/// Wraps a real [`HouseholdData`] and fails the calls named by a
/// [`FailurePlan`]. Calls that are not failed pass through unchanged.
pub struct FailingHouseholdData {
    inner: Arc<dyn HouseholdData>,
    plan: FailurePlan,
    apply_calls: AtomicUsize,
    restore_calls: AtomicUsize,
    applied: Mutex<Vec<String>>,
}

impl std::fmt::Debug for FailingHouseholdData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailingHouseholdData")
            .field("plan", &self.plan)
            .field("apply_calls", &self.apply_calls())
            .finish_non_exhaustive()
    }
}

impl FailingHouseholdData {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn HouseholdData>, plan: FailurePlan) -> Self {
        Self {
            inner,
            plan,
            apply_calls: AtomicUsize::new(0),
            restore_calls: AtomicUsize::new(0),
            applied: Mutex::new(Vec::new()),
        }
    }

    /// Number of `apply` calls seen, failed ones included.
    #[must_use]
    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    /// Number of `restore` calls seen, failed ones included.
    #[must_use]
    pub fn restore_calls(&self) -> usize {
        self.restore_calls.load(Ordering::SeqCst)
    }

    /// Names of the functions that were applied successfully, in order.
    #[must_use]
    pub fn applied_functions(&self) -> Vec<String> {
        if let Ok(guard) = self.applied.lock() {
            guard.clone()
        } else {
            Vec::new()
        }
    }
}

#[async_trait]
impl HouseholdData for FailingHouseholdData {
    async fn snapshot(
        &self,
        household: HouseholdId,
        call: &FunctionCall,
    ) -> HouseholdResult<StateSnapshot> {
        if self.plan.fail_snapshots {
            return Err(injected());
        }
        self.inner.snapshot(household, call).await
    }

    async fn apply(
        &self,
        household: HouseholdId,
        call: &FunctionCall,
    ) -> HouseholdResult<ActionOutput> {
        let index = self.apply_calls.fetch_add(1, Ordering::SeqCst);
        if self.plan.fail_apply_at == Some(index) {
            return Err(injected());
        }
        let output = self.inner.apply(household, call).await?;
        if let Ok(mut guard) = self.applied.lock() {
            guard.push(call.function().as_str().to_owned());
        }
        Ok(output)
    }

    async fn restore(
        &self,
        household: HouseholdId,
        snapshot: &StateSnapshot,
    ) -> HouseholdResult<()> {
        self.restore_calls.fetch_add(1, Ordering::SeqCst);
        if self.plan.fail_restores {
            return Err(injected());
        }
        self.inner.restore(household, snapshot).await
    }
}

/// Which writes a [`FailingAuditStorage`] should fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFailurePlan {
    /// Zero-based index of the `insert` call to fail.
    pub fail_insert_at: Option<usize>,
    /// Zero-based index of the `replace` call to fail.
    pub fail_replace_at: Option<usize>,
}

impl AuditFailurePlan {
    /// Fail the `index`-th insert (zero-based).
    #[must_use]
    pub fn insert_at(index: usize) -> Self {
        Self {
            fail_insert_at: Some(index),
            ..Self::default()
        }
    }

    /// Fail the `index`-th replace (zero-based).
    #[must_use]
    pub fn replace_at(index: usize) -> Self {
        Self {
            fail_replace_at: Some(index),
            ..Self::default()
        }
    }
}

fn audit_injected() -> AuditError {
    AuditError::Storage(StorageError::Internal(INJECTED_FAILURE.to_owned()))
}

/// Wraps a real [`AuditStorage`] and fails the writes named by an
/// [`AuditFailurePlan`]. Reads always pass through.
pub struct FailingAuditStorage {
    inner: Arc<dyn AuditStorage>,
    plan: AuditFailurePlan,
    insert_calls: AtomicUsize,
    replace_calls: AtomicUsize,
}

impl std::fmt::Debug for FailingAuditStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailingAuditStorage")
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

impl FailingAuditStorage {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn AuditStorage>, plan: AuditFailurePlan) -> Self {
        Self {
            inner,
            plan,
            insert_calls: AtomicUsize::new(0),
            replace_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `insert` calls seen, failed ones included.
    #[must_use]
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Number of `replace` calls seen, failed ones included.
    #[must_use]
    pub fn replace_calls(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditStorage for FailingAuditStorage {
    async fn insert(&self, entry: &AuditEntry) -> AuditResult<()> {
        let index = self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.plan.fail_insert_at == Some(index) {
            return Err(audit_injected());
        }
        self.inner.insert(entry).await
    }

    async fn replace(&self, entry: &AuditEntry, expected: AuditStatus) -> AuditResult<()> {
        let index = self.replace_calls.fetch_add(1, Ordering::SeqCst);
        if self.plan.fail_replace_at == Some(index) {
            return Err(audit_injected());
        }
        self.inner.replace(entry, expected).await
    }

    async fn get(&self, id: &AuditEntryId) -> AuditResult<Option<AuditEntry>> {
        self.inner.get(id).await
    }

    async fn household_entries(&self, household: &HouseholdId) -> AuditResult<Vec<AuditEntry>> {
        self.inner.household_entries(household).await
    }

    async fn count(&self) -> AuditResult<usize> {
        self.inner.count().await
    }
}

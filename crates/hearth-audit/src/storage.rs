//! Audit log storage trait and key-value implementation.

use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::HouseholdId;
use hearth_storage::{KvStore, MemoryKvStore, ScopedKvStore};
use tracing::warn;

use crate::entry::{AuditEntry, AuditEntryId, AuditStatus};
use crate::error::{AuditError, AuditResult};

/// Storage backend for audit entries.
///
/// Entries are never deleted. Status changes go through
/// [`replace`](Self::replace), which only succeeds if the stored entry still
/// has the status the caller observed.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Persist a new entry and index it under its household.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Conflict`] if an entry with this id exists.
    async fn insert(&self, entry: &AuditEntry) -> AuditResult<()>;

    /// Overwrite an entry whose stored status is still `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::EntryNotFound`] if the entry does not exist and
    /// [`AuditError::Conflict`] if its status moved on.
    async fn replace(&self, entry: &AuditEntry, expected: AuditStatus) -> AuditResult<()>;

    /// Get an entry by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    async fn get(&self, id: &AuditEntryId) -> AuditResult<Option<AuditEntry>>;

    /// All entries of a household, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    async fn household_entries(&self, household: &HouseholdId) -> AuditResult<Vec<AuditEntry>>;

    /// Total number of entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn count(&self) -> AuditResult<usize>;
}

// -- Namespace constants --

const NS_ENTRIES: &str = "ai:audit_log";
const NS_HOUSEHOLD_INDEX: &str = "ai:audit_index";

/// Retries for the household index append before giving up.
const INDEX_CAS_ATTEMPTS: usize = 64;

/// [`AuditStorage`] over a [`KvStore`].
///
/// Entries live in `ai:audit_log` keyed by id. A per-household list of ids
/// in `ai:audit_index` preserves insertion order and is appended with
/// compare-and-swap so concurrent inserts never drop each other.
#[derive(Debug, Clone)]
pub struct KvAuditStorage {
    entries: ScopedKvStore,
    index: ScopedKvStore,
}

impl KvAuditStorage {
    /// Create audit storage over `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespaces are rejected by the store.
    pub fn new(store: Arc<dyn KvStore>) -> AuditResult<Self> {
        Ok(Self {
            entries: ScopedKvStore::new(Arc::clone(&store), NS_ENTRIES)?,
            index: ScopedKvStore::new(store, NS_HOUSEHOLD_INDEX)?,
        })
    }

    /// Create an in-memory storage (for testing).
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature mirrors [`new`](Self::new).
    pub fn in_memory() -> AuditResult<Self> {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    async fn household_ids(&self, household: &HouseholdId) -> AuditResult<Vec<AuditEntryId>> {
        Ok(self
            .index
            .get_json(&household.0.to_string())
            .await?
            .unwrap_or_default())
    }

    async fn append_to_index(&self, household: &HouseholdId, id: AuditEntryId) -> AuditResult<()> {
        let key = household.0.to_string();
        for _ in 0..INDEX_CAS_ATTEMPTS {
            let current = self
                .index
                .get_json_versioned::<Vec<AuditEntryId>>(&key)
                .await?;
            let (mut ids, raw) = match current {
                Some((ids, raw)) => (ids, Some(raw)),
                None => (Vec::new(), None),
            };
            ids.push(id);
            if self.index.compare_and_swap_json(&key, raw, &ids).await? {
                return Ok(());
            }
        }
        warn!(household = %household, entry = %id, "audit index append kept conflicting");
        Err(AuditError::Conflict {
            entry_id: id.to_string(),
        })
    }
}

#[async_trait]
impl AuditStorage for KvAuditStorage {
    async fn insert(&self, entry: &AuditEntry) -> AuditResult<()> {
        let key = entry.id.0.to_string();
        if !self.entries.compare_and_swap_json(&key, None, entry).await? {
            return Err(AuditError::Conflict {
                entry_id: entry.id.to_string(),
            });
        }
        self.append_to_index(&entry.household_id, entry.id).await
    }

    async fn replace(&self, entry: &AuditEntry, expected: AuditStatus) -> AuditResult<()> {
        let key = entry.id.0.to_string();
        let Some((stored, raw)) = self
            .entries
            .get_json_versioned::<AuditEntry>(&key)
            .await?
        else {
            return Err(AuditError::EntryNotFound {
                entry_id: entry.id.to_string(),
            });
        };
        if stored.status != expected
            || !self
                .entries
                .compare_and_swap_json(&key, Some(raw), entry)
                .await?
        {
            return Err(AuditError::Conflict {
                entry_id: entry.id.to_string(),
            });
        }
        Ok(())
    }

    async fn get(&self, id: &AuditEntryId) -> AuditResult<Option<AuditEntry>> {
        Ok(self.entries.get_json(&id.0.to_string()).await?)
    }

    async fn household_entries(&self, household: &HouseholdId) -> AuditResult<Vec<AuditEntry>> {
        let ids = self.household_ids(household).await?;
        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(&id).await? {
                Some(entry) => entries.push(entry),
                None => warn!(entry = %id, "audit index points at a missing entry"),
            }
        }
        Ok(entries)
    }

    async fn count(&self) -> AuditResult<usize> {
        Ok(self.entries.list_keys().await?.len())
    }
}

//! Key-value store trait and implementations.
//!
//! The [`KvStore`] trait provides byte-level operations on namespaced keys.
//! Hearth derives namespaces from the table and, for household data, from
//! the household id (`household:<uuid>`), so a store handle scoped to one
//! household cannot reach another household's rows.
//!
//! # Atomic primitives
//!
//! State transitions (proposal approval, trust window reservation, audit
//! status changes) are read-check-write sequences. Doing them as separate
//! `get` and `set` calls would let two callers both observe the old value
//! and both succeed. Instead callers read, compute the new value, and commit
//! it with [`KvStore::compare_and_swap`], retrying or failing when the
//! stored value moved underneath them.
//!
//! Multi-key writes (applying a household mutation, restoring a snapshot)
//! go through [`KvStore::write_batch`] so a failure never leaves half of
//! the keys written.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{StorageError, StorageResult};

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Namespaces must be non-empty and free of the NUL separator byte.
fn validate_namespace(namespace: &str) -> StorageResult<()> {
    if namespace.is_empty() {
        return Err(StorageError::InvalidKey(
            "namespace must not be empty".into(),
        ));
    }
    if namespace.contains('\0') {
        return Err(StorageError::InvalidKey(
            "namespace must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Keys follow the same rules as namespaces.
fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    if key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "key must not contain null bytes".into(),
        ));
    }
    Ok(())
}

fn validate_batch(namespace: &str, ops: &[KvWrite]) -> StorageResult<()> {
    validate_namespace(namespace)?;
    ops.iter().try_for_each(|op| validate_key(op.key()))
}

fn encode_json<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One operation inside a [`KvStore::write_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvWrite {
    /// Insert or overwrite `key`.
    Put {
        /// Key within the batch namespace.
        key: String,
        /// Raw value bytes.
        value: Vec<u8>,
    },
    /// Remove `key` if present.
    Delete {
        /// Key within the batch namespace.
        key: String,
    },
}

impl KvWrite {
    /// Build a put operation.
    #[must_use]
    pub fn put(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self::Put {
            key: key.into(),
            value,
        }
    }

    /// Build a delete operation.
    #[must_use]
    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }

    /// Build a put operation from a JSON-serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if encoding fails.
    pub fn put_json<T: Serialize>(key: impl Into<String>, value: &T) -> StorageResult<Self> {
        Ok(Self::put(key, encode_json(value)?))
    }

    /// The key this operation targets.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Namespaced byte-level key-value store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get a value. Returns `None` if the key does not exist.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Set a value, overwriting any existing one.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Delete a key. Returns `true` if it existed.
    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// Check whether a key exists.
    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// List all keys in a namespace.
    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>>;

    /// Delete every key in a namespace, returning how many were removed.
    async fn clear_namespace(&self, namespace: &str) -> StorageResult<u64>;

    /// Atomically replace the value at `key` if it still equals `expected`.
    ///
    /// `expected = None` means "the key must be absent". Returns `true` if
    /// the write happened and `false` if the current value differed.
    async fn compare_and_swap(
        &self,
        namespace: &str,
        key: &str,
        expected: Option<Vec<u8>>,
        new: Vec<u8>,
    ) -> StorageResult<bool>;

    /// Apply all `ops` in one atomic commit.
    async fn write_batch(&self, namespace: &str, ops: Vec<KvWrite>) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

type Namespaces = HashMap<String, BTreeMap<String, Vec<u8>>>;

/// In-memory store for tests and ephemeral runs.
///
/// Every operation, including `compare_and_swap` and `write_batch`, runs
/// under a single lock acquisition, so each is atomic with respect to the
/// others.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    namespaces: RwLock<Namespaces>,
}

impl MemoryKvStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, Namespaces>> {
        self.namespaces
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))
    }

    fn write(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, Namespaces>> {
        self.namespaces
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        Ok(self
            .read()?
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .cloned())
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        self.write()?
            .entry(namespace.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        Ok(self
            .write()?
            .get_mut(namespace)
            .is_some_and(|ns| ns.remove(key).is_some()))
    }

    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        Ok(self
            .read()?
            .get(namespace)
            .is_some_and(|ns| ns.contains_key(key)))
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        validate_namespace(namespace)?;
        Ok(self
            .read()?
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear_namespace(&self, namespace: &str) -> StorageResult<u64> {
        validate_namespace(namespace)?;
        let removed = self.write()?.remove(namespace);
        Ok(removed.map_or(0, |ns| ns.len() as u64))
    }

    async fn compare_and_swap(
        &self,
        namespace: &str,
        key: &str,
        expected: Option<Vec<u8>>,
        new: Vec<u8>,
    ) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let mut guard = self.write()?;
        let ns = guard.entry(namespace.to_owned()).or_default();
        if ns.get(key) != expected.as_ref() {
            return Ok(false);
        }
        ns.insert(key.to_owned(), new);
        Ok(true)
    }

    async fn write_batch(&self, namespace: &str, ops: Vec<KvWrite>) -> StorageResult<()> {
        validate_batch(namespace, &ops)?;
        let mut guard = self.write()?;
        let ns = guard.entry(namespace.to_owned()).or_default();
        for op in ops {
            match op {
                KvWrite::Put { key, value } => {
                    ns.insert(key, value);
                },
                KvWrite::Delete { key } => {
                    ns.remove(&key);
                },
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SurrealKV implementation (behind `kv` feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "kv")]
mod surreal {
    use super::{
        KvStore, KvWrite, StorageError, StorageResult, async_trait, validate_batch, validate_key,
        validate_namespace,
    };

    /// `"{namespace}\0{key}"` as bytes.
    fn composite_key(namespace: &str, key: &str) -> Vec<u8> {
        let mut buf = namespace_prefix(namespace, 0);
        buf.extend_from_slice(key.as_bytes());
        buf
    }

    /// `"{namespace}{terminator}"`. With `0` this is the inclusive start of
    /// the namespace range, with `1` its exclusive end.
    fn namespace_prefix(namespace: &str, terminator: u8) -> Vec<u8> {
        let mut buf = Vec::with_capacity(namespace.len().saturating_add(1));
        buf.extend_from_slice(namespace.as_bytes());
        buf.push(terminator);
        buf
    }

    fn map_kv_err(e: &surrealkv::Error) -> StorageError {
        StorageError::Internal(e.to_string())
    }

    /// Persistent store backed by `SurrealKV`.
    ///
    /// Each trait method runs in its own transaction; `compare_and_swap` and
    /// `write_batch` read and write inside one transaction and commit once.
    pub struct SurrealKvStore {
        tree: surrealkv::Tree,
    }

    impl std::fmt::Debug for SurrealKvStore {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("SurrealKvStore").finish_non_exhaustive()
        }
    }

    impl SurrealKvStore {
        /// Open (or create) a store in the given directory.
        ///
        /// # Errors
        ///
        /// Returns [`StorageError::Connection`] if the store cannot be opened.
        pub fn open(path: impl AsRef<std::path::Path>) -> StorageResult<Self> {
            let tree = surrealkv::TreeBuilder::new()
                .with_path(path.as_ref().to_path_buf())
                .build()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            tracing::debug!(path = %path.as_ref().display(), "opened surrealkv store");
            Ok(Self { tree })
        }

        /// Flush pending writes and close the store.
        ///
        /// # Errors
        ///
        /// Returns [`StorageError::Internal`] if the flush fails.
        pub async fn close(&self) -> StorageResult<()> {
            self.tree
                .close()
                .await
                .map_err(|ref e| map_kv_err(e))
        }

        fn keys_in(&self, namespace: &str) -> StorageResult<Vec<Vec<u8>>> {
            let start = namespace_prefix(namespace, 0);
            let end = namespace_prefix(namespace, 1);
            let tx = self
                .tree
                .begin_with_mode(surrealkv::Mode::ReadOnly)
                .map_err(|ref e| map_kv_err(e))?;
            let mut iter = tx.range(&start, &end).map_err(|ref e| map_kv_err(e))?;
            iter.seek_first().map_err(|ref e| map_kv_err(e))?;
            let mut keys = Vec::new();
            while iter.valid() {
                keys.push(iter.key());
                iter.next().map_err(|ref e| map_kv_err(e))?;
            }
            Ok(keys)
        }
    }

    #[async_trait]
    impl KvStore for SurrealKvStore {
        async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
            validate_namespace(namespace)?;
            validate_key(key)?;
            let tx = self
                .tree
                .begin_with_mode(surrealkv::Mode::ReadOnly)
                .map_err(|ref e| map_kv_err(e))?;
            tx.get(&composite_key(namespace, key))
                .map_err(|ref e| map_kv_err(e))
        }

        async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
            validate_namespace(namespace)?;
            validate_key(key)?;
            let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
            tx.set(&composite_key(namespace, key), &value)
                .map_err(|ref e| map_kv_err(e))?;
            tx.commit().await.map_err(|ref e| map_kv_err(e))
        }

        async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
            validate_namespace(namespace)?;
            validate_key(key)?;
            let ck = composite_key(namespace, key);
            let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
            let existed = tx.get(&ck).map_err(|ref e| map_kv_err(e))?.is_some();
            if existed {
                tx.delete(&ck).map_err(|ref e| map_kv_err(e))?;
                tx.commit().await.map_err(|ref e| map_kv_err(e))?;
            }
            Ok(existed)
        }

        async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool> {
            Ok(self.get(namespace, key).await?.is_some())
        }

        async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
            validate_namespace(namespace)?;
            let prefix_len = namespace.len().saturating_add(1);
            Ok(self
                .keys_in(namespace)?
                .into_iter()
                .filter_map(|raw| {
                    raw.get(prefix_len..)
                        .filter(|k| !k.is_empty())
                        .and_then(|k| std::str::from_utf8(k).ok())
                        .map(str::to_owned)
                })
                .collect())
        }

        async fn clear_namespace(&self, namespace: &str) -> StorageResult<u64> {
            validate_namespace(namespace)?;
            let keys = self.keys_in(namespace)?;
            if keys.is_empty() {
                return Ok(0);
            }
            let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
            for key in &keys {
                tx.delete(key).map_err(|ref e| map_kv_err(e))?;
            }
            tx.commit().await.map_err(|ref e| map_kv_err(e))?;
            Ok(keys.len() as u64)
        }

        async fn compare_and_swap(
            &self,
            namespace: &str,
            key: &str,
            expected: Option<Vec<u8>>,
            new: Vec<u8>,
        ) -> StorageResult<bool> {
            validate_namespace(namespace)?;
            validate_key(key)?;
            let ck = composite_key(namespace, key);
            let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
            let current = tx.get(&ck).map_err(|ref e| map_kv_err(e))?;
            if current != expected {
                return Ok(false);
            }
            tx.set(&ck, &new).map_err(|ref e| map_kv_err(e))?;
            // A concurrent writer on the same key makes the commit fail with
            // a conflict, which surfaces as an error rather than a lost update.
            tx.commit().await.map_err(|ref e| map_kv_err(e))?;
            Ok(true)
        }

        async fn write_batch(&self, namespace: &str, ops: Vec<KvWrite>) -> StorageResult<()> {
            validate_batch(namespace, &ops)?;
            if ops.is_empty() {
                return Ok(());
            }
            let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
            for op in &ops {
                match op {
                    KvWrite::Put { key, value } => tx
                        .set(&composite_key(namespace, key), value)
                        .map_err(|ref e| map_kv_err(e))?,
                    KvWrite::Delete { key } => tx
                        .delete(&composite_key(namespace, key))
                        .map_err(|ref e| map_kv_err(e))?,
                }
            }
            tx.commit().await.map_err(|ref e| map_kv_err(e))
        }
    }
}

#[cfg(feature = "kv")]
pub use surreal::SurrealKvStore;

// ---------------------------------------------------------------------------
// Scoped store (namespace pre-bound)
// ---------------------------------------------------------------------------

/// A namespace-bound view into a [`KvStore`] with typed JSON helpers.
///
/// Hearth components hold one of these per table, e.g. the proposal store
/// holds a view over `ai:proposals`.
#[derive(Clone)]
pub struct ScopedKvStore {
    inner: Arc<dyn KvStore>,
    namespace: String,
}

impl std::fmt::Debug for ScopedKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedKvStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl ScopedKvStore {
    /// Create a view over `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the namespace is empty or
    /// contains null bytes.
    pub fn new(store: Arc<dyn KvStore>, namespace: impl Into<String>) -> StorageResult<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        Ok(Self {
            inner: store,
            namespace,
        })
    }

    /// The namespace this view is bound to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Get a raw value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backend fails.
    pub async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(&self.namespace, key).await
    }

    /// Set a raw value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backend fails.
    pub async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.inner.set(&self.namespace, key, value).await
    }

    /// Delete a key, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backend fails.
    pub async fn delete(&self, key: &str) -> StorageResult<bool> {
        self.inner.delete(&self.namespace, key).await
    }

    /// Check whether a key exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backend fails.
    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(&self.namespace, key).await
    }

    /// List every key in this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn list_keys(&self) -> StorageResult<Vec<String>> {
        self.inner.list_keys(&self.namespace).await
    }

    /// Delete every key in this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn clear(&self) -> StorageResult<u64> {
        self.inner.clear_namespace(&self.namespace).await
    }

    /// Raw compare-and-swap within this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backend fails.
    pub async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<Vec<u8>>,
        new: Vec<u8>,
    ) -> StorageResult<bool> {
        self.inner
            .compare_and_swap(&self.namespace, key, expected, new)
            .await
    }

    /// Apply a batch of writes within this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if any key is invalid or the backend fails. On
    /// error nothing is written.
    pub async fn write_batch(&self, ops: Vec<KvWrite>) -> StorageResult<()> {
        self.inner.write_batch(&self.namespace, ops).await
    }

    // -- Typed convenience (JSON) --

    /// Read and decode a JSON value. Returns `None` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if decoding fails.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        self.get(key)
            .await?
            .map(|bytes| decode_json(&bytes))
            .transpose()
    }

    /// Read a JSON value together with the raw bytes it was decoded from.
    ///
    /// The raw bytes are what [`compare_and_swap_json`](Self::compare_and_swap_json)
    /// expects as its `expected` argument.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if decoding fails.
    pub async fn get_json_versioned<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> StorageResult<Option<(T, Vec<u8>)>> {
        match self.get(key).await? {
            Some(bytes) => Ok(Some((decode_json(&bytes)?, bytes))),
            None => Ok(None),
        }
    }

    /// Encode a value as JSON and store it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if encoding fails.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        self.set(key, encode_json(value)?).await
    }

    /// Store `value` as JSON only if the stored bytes still equal `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if encoding fails.
    pub async fn compare_and_swap_json<T: Serialize>(
        &self,
        key: &str,
        expected: Option<Vec<u8>>,
        value: &T,
    ) -> StorageResult<bool> {
        self.compare_and_swap(key, expected, encode_json(value)?)
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_get_set_overwrite() {
        let store = MemoryKvStore::new();
        assert!(store.get("ns", "k").await.unwrap().is_none());
        store.set("ns", "k", b"v1".to_vec()).await.unwrap();
        store.set("ns", "k", b"v2".to_vec()).await.unwrap();
        assert_eq!(store.get("ns", "k").await.unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn test_memory_delete_and_exists() {
        let store = MemoryKvStore::new();
        store.set("ns", "k", b"v".to_vec()).await.unwrap();
        assert!(store.exists("ns", "k").await.unwrap());
        assert!(store.delete("ns", "k").await.unwrap());
        assert!(!store.delete("ns", "k").await.unwrap());
        assert!(!store.exists("ns", "k").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_namespace_isolation() {
        let store = MemoryKvStore::new();
        store.set("household:a", "k", b"a".to_vec()).await.unwrap();
        store.set("household:b", "k", b"b".to_vec()).await.unwrap();
        assert_eq!(
            store.get("household:a", "k").await.unwrap(),
            Some(b"a".to_vec())
        );
        assert_eq!(store.list_keys("household:b").await.unwrap(), vec!["k"]);
    }

    #[tokio::test]
    async fn test_memory_list_keys_sorted() {
        let store = MemoryKvStore::new();
        store.set("ns", "b", b"2".to_vec()).await.unwrap();
        store.set("ns", "a", b"1".to_vec()).await.unwrap();
        assert_eq!(store.list_keys("ns").await.unwrap(), vec!["a", "b"]);
        assert!(store.list_keys("empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_clear_namespace() {
        let store = MemoryKvStore::new();
        store.set("ns1", "a", b"1".to_vec()).await.unwrap();
        store.set("ns1", "b", b"2".to_vec()).await.unwrap();
        store.set("ns2", "c", b"3".to_vec()).await.unwrap();
        assert_eq!(store.clear_namespace("ns1").await.unwrap(), 2);
        assert!(store.list_keys("ns1").await.unwrap().is_empty());
        assert_eq!(store.list_keys("ns2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_cas_absent() {
        let store = MemoryKvStore::new();
        assert!(
            store
                .compare_and_swap("ns", "k", None, b"v1".to_vec())
                .await
                .unwrap()
        );
        // Key now exists, so "expect absent" must fail.
        assert!(
            !store
                .compare_and_swap("ns", "k", None, b"v2".to_vec())
                .await
                .unwrap()
        );
        assert_eq!(store.get("ns", "k").await.unwrap(), Some(b"v1".to_vec()));
    }

    #[tokio::test]
    async fn test_memory_cas_stale_expected() {
        let store = MemoryKvStore::new();
        store.set("ns", "k", b"v1".to_vec()).await.unwrap();
        assert!(
            store
                .compare_and_swap("ns", "k", Some(b"v1".to_vec()), b"v2".to_vec())
                .await
                .unwrap()
        );
        assert!(
            !store
                .compare_and_swap("ns", "k", Some(b"v1".to_vec()), b"v3".to_vec())
                .await
                .unwrap()
        );
        assert_eq!(store.get("ns", "k").await.unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn test_memory_cas_single_winner_under_contention() {
        let store = Arc::new(MemoryKvStore::new());
        store.set("ns", "k", b"pending".to_vec()).await.unwrap();

        let attempts = (0..16).map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .compare_and_swap(
                        "ns",
                        "k",
                        Some(b"pending".to_vec()),
                        format!("winner-{i}").into_bytes(),
                    )
                    .await
                    .unwrap()
            })
        });
        let results = futures::future::join_all(attempts).await;
        let winners = results.into_iter().filter(|r| *r.as_ref().unwrap()).count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_memory_write_batch() {
        let store = MemoryKvStore::new();
        store.set("ns", "old", b"x".to_vec()).await.unwrap();
        store
            .write_batch(
                "ns",
                vec![
                    KvWrite::put("a", b"1".to_vec()),
                    KvWrite::put("b", b"2".to_vec()),
                    KvWrite::delete("old"),
                    KvWrite::delete("never-existed"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(store.list_keys("ns").await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_memory_write_batch_rejects_bad_key_without_writing() {
        let store = MemoryKvStore::new();
        let result = store
            .write_batch(
                "ns",
                vec![KvWrite::put("a", b"1".to_vec()), KvWrite::delete("")],
            )
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert!(store.get("ns", "a").await.unwrap().is_none());
    }

    #[test]
    fn test_validation() {
        assert!(validate_namespace("").is_err());
        assert!(validate_namespace("ns\0bad").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("k\0bad").is_err());
        assert!(validate_key("shopping_item:42").is_ok());
    }

    #[tokio::test]
    async fn test_scoped_json_helpers() {
        #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
        struct Row {
            name: String,
            quantity: u32,
        }

        let store = Arc::new(MemoryKvStore::new());
        let scoped = ScopedKvStore::new(store, "ai:proposals").unwrap();

        let row = Row {
            name: "milk".into(),
            quantity: 2,
        };
        scoped.set_json("r1", &row).await.unwrap();
        let (loaded, raw): (Row, Vec<u8>) = scoped.get_json_versioned("r1").await.unwrap().unwrap();
        assert_eq!(loaded, row);

        let updated = Row {
            name: "milk".into(),
            quantity: 3,
        };
        assert!(
            scoped
                .compare_and_swap_json("r1", Some(raw.clone()), &updated)
                .await
                .unwrap()
        );
        assert!(
            !scoped
                .compare_and_swap_json("r1", Some(raw), &row)
                .await
                .unwrap()
        );
        let current: Row = scoped.get_json("r1").await.unwrap().unwrap();
        assert_eq!(current.quantity, 3);
    }

    #[tokio::test]
    async fn test_scoped_json_decode_error() {
        let store = Arc::new(MemoryKvStore::new());
        let scoped = ScopedKvStore::new(store, "ns").unwrap();
        scoped.set("bad", b"not json".to_vec()).await.unwrap();
        let result: StorageResult<Option<u32>> = scoped.get_json("bad").await;
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_scoped_rejects_empty_namespace() {
        let store = Arc::new(MemoryKvStore::new());
        assert!(ScopedKvStore::new(store, "").is_err());
    }

    #[cfg(feature = "kv")]
    mod surreal_kv_tests {
        use super::*;

        fn make_store() -> (SurrealKvStore, tempfile::TempDir) {
            let dir = tempfile::tempdir().unwrap();
            let store = SurrealKvStore::open(dir.path()).unwrap();
            (store, dir)
        }

        #[tokio::test]
        async fn test_surreal_basic_ops() {
            let (store, _dir) = make_store();
            store.set("ns1", "a", b"1".to_vec()).await.unwrap();
            store.set("ns1", "b", b"2".to_vec()).await.unwrap();
            store.set("ns2", "a", b"3".to_vec()).await.unwrap();
            assert_eq!(store.get("ns1", "a").await.unwrap(), Some(b"1".to_vec()));
            let mut keys = store.list_keys("ns1").await.unwrap();
            keys.sort();
            assert_eq!(keys, vec!["a", "b"]);
            assert!(store.delete("ns1", "a").await.unwrap());
            assert!(!store.exists("ns1", "a").await.unwrap());
            assert_eq!(store.clear_namespace("ns1").await.unwrap(), 1);
            assert_eq!(store.list_keys("ns2").await.unwrap(), vec!["a"]);
        }

        #[tokio::test]
        async fn test_surreal_compare_and_swap() {
            let (store, _dir) = make_store();
            assert!(
                store
                    .compare_and_swap("ns", "k", None, b"v1".to_vec())
                    .await
                    .unwrap()
            );
            assert!(
                !store
                    .compare_and_swap("ns", "k", None, b"v2".to_vec())
                    .await
                    .unwrap()
            );
            assert!(
                store
                    .compare_and_swap("ns", "k", Some(b"v1".to_vec()), b"v2".to_vec())
                    .await
                    .unwrap()
            );
            assert_eq!(store.get("ns", "k").await.unwrap(), Some(b"v2".to_vec()));
        }

        #[tokio::test]
        async fn test_surreal_write_batch() {
            let (store, _dir) = make_store();
            store.set("ns", "old", b"x".to_vec()).await.unwrap();
            store
                .write_batch(
                    "ns",
                    vec![KvWrite::put("new", b"y".to_vec()), KvWrite::delete("old")],
                )
                .await
                .unwrap();
            assert_eq!(store.list_keys("ns").await.unwrap(), vec!["new"]);
        }
    }
}

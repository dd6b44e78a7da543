//! Prelude module - commonly used types for convenient import.
//!
//! Use `use hearth_storage::prelude::*;` to import all essential types.

pub use crate::{KvStore, KvWrite, MemoryKvStore, ScopedKvStore, StorageError, StorageResult};

#[cfg(feature = "kv")]
pub use crate::SurrealKvStore;

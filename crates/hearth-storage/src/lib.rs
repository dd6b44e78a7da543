//! Hearth Storage - namespaced key-value persistence.
//!
//! Every Hearth table (household entities, proposals, trust rows, audit
//! entries) lives in its own namespace of a single [`KvStore`]. Two
//! primitives beyond plain `get`/`set` make the engine's state transitions
//! safe under concurrent callers:
//!
//! - [`KvStore::compare_and_swap`] - write only if the current value is
//!   still the one the caller read
//! - [`KvStore::write_batch`] - apply several puts and deletes as one commit
//!
//! # Backends
//!
//! - [`MemoryKvStore`] (always available): tests and ephemeral runs
//! - `SurrealKvStore` (feature **`kv`**): embedded, ACID, on-disk

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, KvWrite, MemoryKvStore, ScopedKvStore};

#[cfg(feature = "kv")]
pub use kv::SurrealKvStore;

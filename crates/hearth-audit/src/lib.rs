//! Hearth Audit - append-only record of every assistant action.
//!
//! Each executed action gets exactly one [`AuditEntry`], written before the
//! action touches household data. The entry carries the arguments, the risk
//! and reversibility the action ran with, the pre-state snapshot used for
//! undo, and the outcome.
//!
//! # Example
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use std::sync::Arc;
//! use hearth_audit::{AuditLog, AuditStatus, KvAuditStorage, NewAuditEntry};
//! use hearth_core::{HouseholdId, RiskLevel, SystemClock};
//!
//! let storage = Arc::new(KvAuditStorage::in_memory().unwrap());
//! let log = AuditLog::new(storage, Arc::new(SystemClock));
//!
//! let entry = log
//!     .begin(NewAuditEntry {
//!         household_id: HouseholdId::new(),
//!         user_id: None,
//!         proposal_id: None,
//!         action_id: None,
//!         function_name: "add_shopping_item".into(),
//!         arguments: serde_json::json!({"name": "milk"}),
//!         risk_level: RiskLevel::Low,
//!         is_reversible: true,
//!         pre_state: None,
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(entry.status, AuditStatus::Started);
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod entry;
mod error;
mod log;
mod storage;

pub use entry::{AuditEntry, AuditEntryId, AuditStatus, NewAuditEntry};
pub use error::{AuditError, AuditResult};
pub use log::AuditLog;
pub use storage::{AuditStorage, KvAuditStorage};

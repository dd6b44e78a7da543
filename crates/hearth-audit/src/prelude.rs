//! Prelude module - commonly used types for convenient import.
//!
//! Use `use hearth_audit::prelude::*;` to import all essential types.

pub use crate::{
    AuditEntry, AuditEntryId, AuditError, AuditLog, AuditResult, AuditStatus, AuditStorage,
    KvAuditStorage, NewAuditEntry,
};

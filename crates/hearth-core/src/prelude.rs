//! Prelude module - commonly used types for convenient import.
//!
//! Use `use hearth_core::prelude::*;` to import all essential types.

// Identifiers
pub use crate::{ActionId, HouseholdId, ProposalId, SessionId, UserId};

// Common types
pub use crate::{ParseError, RiskLevel, Timestamp};

// Time source
pub use crate::{Clock, ManualClock, SystemClock};

//! Prelude module - commonly used test helpers.
//!
//! Use `use hearth_test::prelude::*;` in test modules.

pub use crate::fixtures::*;
pub use crate::harness::{TestEngine, setup_test_logging, test_dir};
pub use crate::mocks::{
    AuditFailurePlan, FailingAuditStorage, FailingHouseholdData, FailurePlan,
};

//! Prelude module - commonly used types for convenient import.
//!
//! Use `use hearth_household::prelude::*;` to import all essential types.

// Calls
pub use crate::{FunctionCall, FunctionIntent, FunctionName};

// Data access
pub use crate::{ActionOutput, HouseholdData, KvHouseholdData, StateSnapshot};

// Errors
pub use crate::{HouseholdError, HouseholdResult};

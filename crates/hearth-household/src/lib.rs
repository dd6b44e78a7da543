//! Hearth Household - the household data the assistant acts on.
//!
//! This crate provides:
//! - The static function catalog ([`FunctionName`]) with default risk and
//!   reversibility
//! - Typed calls ([`FunctionCall`]) parsed and validated from intents
//! - Household entities and [`StateSnapshot`] captures for undo
//! - The [`HouseholdData`] seam and its key-value implementation

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod call;
pub mod catalog;
pub mod data;
pub mod entity;
pub mod error;
pub mod output;
pub mod snapshot;

pub use call::{FunctionCall, FunctionIntent};
pub use catalog::FunctionName;
pub use data::{HouseholdData, KvHouseholdData};
pub use entity::{
    CleaningTask, Entity, EntityKind, EntityRef, InventoryItem, MealPlanEntry, MealSlot, Recipe,
    ShoppingItem,
};
pub use error::{HouseholdError, HouseholdResult};
pub use output::ActionOutput;
pub use snapshot::{EntitySnapshot, StateSnapshot};

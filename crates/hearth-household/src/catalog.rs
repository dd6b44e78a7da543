//! The static catalog of functions the assistant may invoke.

use std::fmt;
use std::str::FromStr;

use hearth_core::RiskLevel;
use serde::{Deserialize, Serialize};

use crate::error::HouseholdError;

/// Every household operation the assistant is able to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionName {
    /// Put an item on the shopping list.
    AddShoppingItem,
    /// Tick (or untick) a shopping list item.
    CheckShoppingItem,
    /// Remove one item from the shopping list.
    RemoveShoppingItem,
    /// Remove every (or every checked) item from the shopping list.
    ClearShoppingList,
    /// Record a new pantry/fridge item.
    AddInventoryItem,
    /// Change the stocked quantity of an inventory item.
    UpdateInventoryQuantity,
    /// Remove an inventory item.
    RemoveInventoryItem,
    /// Save a new recipe.
    CreateRecipe,
    /// Delete a saved recipe.
    DeleteRecipe,
    /// Put a meal on the weekly plan.
    PlanMeal,
    /// Mark a cleaning task done.
    CompleteCleaningTask,
    /// Hand a cleaning task to a household member.
    AssignCleaningTask,
    /// Wipe the whole inventory.
    ResetInventory,
}

impl FunctionName {
    /// The full catalog, in display order.
    pub const ALL: [FunctionName; 13] = [
        Self::AddShoppingItem,
        Self::CheckShoppingItem,
        Self::RemoveShoppingItem,
        Self::ClearShoppingList,
        Self::AddInventoryItem,
        Self::UpdateInventoryQuantity,
        Self::RemoveInventoryItem,
        Self::CreateRecipe,
        Self::DeleteRecipe,
        Self::PlanMeal,
        Self::CompleteCleaningTask,
        Self::AssignCleaningTask,
        Self::ResetInventory,
    ];

    /// Wire name, as emitted by the intent parser.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddShoppingItem => "add_shopping_item",
            Self::CheckShoppingItem => "check_shopping_item",
            Self::RemoveShoppingItem => "remove_shopping_item",
            Self::ClearShoppingList => "clear_shopping_list",
            Self::AddInventoryItem => "add_inventory_item",
            Self::UpdateInventoryQuantity => "update_inventory_quantity",
            Self::RemoveInventoryItem => "remove_inventory_item",
            Self::CreateRecipe => "create_recipe",
            Self::DeleteRecipe => "delete_recipe",
            Self::PlanMeal => "plan_meal",
            Self::CompleteCleaningTask => "complete_cleaning_task",
            Self::AssignCleaningTask => "assign_cleaning_task",
            Self::ResetInventory => "reset_inventory",
        }
    }

    /// Look up a catalog entry by wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    /// Built-in risk level, before configuration overrides.
    #[must_use]
    pub fn default_risk_level(&self) -> RiskLevel {
        match self {
            Self::AddShoppingItem
            | Self::CheckShoppingItem
            | Self::AddInventoryItem
            | Self::CreateRecipe
            | Self::PlanMeal
            | Self::CompleteCleaningTask => RiskLevel::Low,
            Self::RemoveShoppingItem
            | Self::UpdateInventoryQuantity
            | Self::RemoveInventoryItem
            | Self::AssignCleaningTask => RiskLevel::Medium,
            Self::ClearShoppingList | Self::DeleteRecipe => RiskLevel::High,
            Self::ResetInventory => RiskLevel::Critical,
        }
    }

    /// Whether the effect can be undone by restoring a snapshot.
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        !matches!(self, Self::ResetInventory)
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FunctionName {
    type Err = HouseholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| HouseholdError::UnknownFunction {
            name: s.to_owned(),
        })
    }
}

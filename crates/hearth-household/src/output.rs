//! Results of applied function calls.

use serde::{Deserialize, Serialize};

use crate::entity::{CleaningTask, InventoryItem, MealPlanEntry, Recipe, ShoppingItem};

/// What an applied call did. Stored as the audit entry's `result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionOutput {
    /// A shopping item was added.
    ShoppingItemAdded {
        /// The new item.
        item: ShoppingItem,
    },
    /// A shopping item was checked or unchecked.
    ShoppingItemChecked {
        /// The item after the change.
        item: ShoppingItem,
    },
    /// A shopping item was removed.
    ShoppingItemRemoved {
        /// The removed item.
        item: ShoppingItem,
    },
    /// Shopping items were removed in bulk.
    ShoppingListCleared {
        /// How many items were removed.
        removed: u32,
    },
    /// An inventory item was added.
    InventoryItemAdded {
        /// The new item.
        item: InventoryItem,
    },
    /// An inventory quantity changed.
    InventoryQuantityUpdated {
        /// The item after the change.
        item: InventoryItem,
        /// Quantity before the change.
        previous: u32,
    },
    /// An inventory item was removed.
    InventoryItemRemoved {
        /// The removed item.
        item: InventoryItem,
    },
    /// A recipe was saved.
    RecipeCreated {
        /// The new recipe.
        recipe: Recipe,
    },
    /// A recipe was deleted.
    RecipeDeleted {
        /// The deleted recipe.
        recipe: Recipe,
    },
    /// A meal plan slot was filled.
    MealPlanned {
        /// The planned entry.
        entry: MealPlanEntry,
        /// Whether an earlier entry in the same slot was replaced.
        replaced: bool,
    },
    /// A cleaning task was marked done.
    CleaningTaskCompleted {
        /// The task after the change.
        task: CleaningTask,
    },
    /// A cleaning task changed hands.
    CleaningTaskAssigned {
        /// The task after the change.
        task: CleaningTask,
    },
    /// The inventory was wiped.
    InventoryReset {
        /// How many items were removed.
        removed: u32,
    },
}

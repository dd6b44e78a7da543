//! Intent and entity fixtures for the household function catalog.

use chrono::NaiveDate;
use hearth_household::{CleaningTask, FunctionIntent};
use serde_json::{Value, json};

/// Intent for any function name, valid or not.
#[must_use]
pub fn intent(name: &str, arguments: Value) -> FunctionIntent {
    FunctionIntent::new(name, arguments)
}

/// `add_shopping_item` with a generated id.
#[must_use]
pub fn add_shopping_item(name: &str) -> FunctionIntent {
    intent("add_shopping_item", json!({ "name": name }))
}

/// `add_shopping_item` with a fixed id, so later calls can target it.
#[must_use]
pub fn add_shopping_item_with_id(id: &str, name: &str) -> FunctionIntent {
    intent("add_shopping_item", json!({ "id": id, "name": name }))
}

/// `check_shopping_item`.
#[must_use]
pub fn check_shopping_item(id: &str) -> FunctionIntent {
    intent("check_shopping_item", json!({ "id": id }))
}

/// `remove_shopping_item`.
#[must_use]
pub fn remove_shopping_item(id: &str) -> FunctionIntent {
    intent("remove_shopping_item", json!({ "id": id }))
}

/// `clear_shopping_list`, removing every item.
#[must_use]
pub fn clear_shopping_list() -> FunctionIntent {
    intent("clear_shopping_list", json!({}))
}

/// `add_inventory_item`.
#[must_use]
pub fn add_inventory_item(id: &str, name: &str, quantity: u32) -> FunctionIntent {
    intent(
        "add_inventory_item",
        json!({ "id": id, "name": name, "quantity": quantity }),
    )
}

/// `update_inventory_quantity`.
#[must_use]
pub fn update_inventory_quantity(id: &str, quantity: u32) -> FunctionIntent {
    intent(
        "update_inventory_quantity",
        json!({ "id": id, "quantity": quantity }),
    )
}

/// `remove_inventory_item`.
#[must_use]
pub fn remove_inventory_item(id: &str) -> FunctionIntent {
    intent("remove_inventory_item", json!({ "id": id }))
}

/// `create_recipe` with a fixed id.
#[must_use]
pub fn create_recipe(id: &str, name: &str) -> FunctionIntent {
    intent(
        "create_recipe",
        json!({ "id": id, "name": name, "ingredients": ["salt"] }),
    )
}

/// `delete_recipe`.
#[must_use]
pub fn delete_recipe(id: &str) -> FunctionIntent {
    intent("delete_recipe", json!({ "id": id }))
}

/// `plan_meal` for dinner on `date`.
#[must_use]
pub fn plan_dinner(date: NaiveDate, recipe_id: Option<&str>) -> FunctionIntent {
    intent(
        "plan_meal",
        json!({ "date": date, "slot": "dinner", "recipe_id": recipe_id }),
    )
}

/// `complete_cleaning_task`.
#[must_use]
pub fn complete_cleaning_task(id: &str) -> FunctionIntent {
    intent("complete_cleaning_task", json!({ "id": id }))
}

/// `assign_cleaning_task`.
#[must_use]
pub fn assign_cleaning_task(id: &str, assignee: &str) -> FunctionIntent {
    intent(
        "assign_cleaning_task",
        json!({ "id": id, "assignee": assignee }),
    )
}

/// `reset_inventory`.
#[must_use]
pub fn reset_inventory() -> FunctionIntent {
    intent("reset_inventory", json!({}))
}

/// An unassigned weekly chore. No catalog function creates chores, so tests
/// seed them directly.
#[must_use]
pub fn cleaning_task(id: &str, name: &str) -> CleaningTask {
    CleaningTask {
        id: id.to_owned(),
        name: name.to_owned(),
        assignee: None,
        frequency_days: Some(7),
        last_completed_at: None,
    }
}

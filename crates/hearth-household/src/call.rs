//! Typed function calls.
//!
//! The intent parser hands over a [`FunctionIntent`]: a function name and a
//! loose JSON argument object. [`FunctionCall::from_intent`] is the single
//! validation boundary that turns it into a typed call, rejecting unknown
//! names and malformed arguments before anything is proposed, audited or
//! executed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::catalog::FunctionName;
use crate::entity::{EntityKind, EntityRef, MealPlanEntry, MealSlot};
use crate::error::{HouseholdError, HouseholdResult};

const MAX_NAME_LEN: usize = 200;

/// A structured request produced by the upstream intent parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionIntent {
    /// Catalog function name.
    pub name: String,
    /// Function arguments.
    #[serde(default)]
    pub arguments: Value,
}

impl FunctionIntent {
    /// Build an intent.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

fn default_quantity() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// Arguments of `add_shopping_item`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddShoppingItem {
    /// Item id; generated by [`FunctionCall::normalize`] when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// What to buy.
    pub name: String,
    /// How many units.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Unit of measure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Aisle or category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Arguments of `check_shopping_item`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckShoppingItem {
    /// Item id.
    pub id: String,
    /// New checked state.
    #[serde(default = "default_true")]
    pub checked: bool,
}

/// Arguments of calls that only name one existing entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTarget {
    /// Entity id.
    pub id: String,
}

/// Arguments of `clear_shopping_list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearShoppingList {
    /// Only remove items already checked off.
    #[serde(default)]
    pub only_checked: bool,
}

/// Arguments of `add_inventory_item`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddInventoryItem {
    /// Item id; generated by [`FunctionCall::normalize`] when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Item name.
    pub name: String,
    /// Units in stock.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Unit of measure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Storage location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Best-before date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
}

/// Arguments of `update_inventory_quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInventoryQuantity {
    /// Item id.
    pub id: String,
    /// New stock level; zero is allowed.
    pub quantity: u32,
}

/// Arguments of `create_recipe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRecipe {
    /// Recipe id; generated by [`FunctionCall::normalize`] when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Title.
    pub name: String,
    /// Ingredient lines.
    #[serde(default)]
    pub ingredients: Vec<String>,
    /// Preparation steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Servings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
}

/// Arguments of `plan_meal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMeal {
    /// Day.
    pub date: NaiveDate,
    /// Slot.
    pub slot: MealSlot,
    /// Recipe to cook; must exist when given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<String>,
    /// Free-form note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Arguments of `assign_cleaning_task`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignCleaningTask {
    /// Task id.
    pub id: String,
    /// Member taking it on.
    pub assignee: String,
}

/// Arguments of `reset_inventory`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetInventory {}

/// A validated call to one catalog function.
///
/// Serialized adjacently tagged, e.g.
/// `{"function": "add_shopping_item", "arguments": {"name": "milk"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "function", content = "arguments", rename_all = "snake_case")]
pub enum FunctionCall {
    /// `add_shopping_item`
    AddShoppingItem(AddShoppingItem),
    /// `check_shopping_item`
    CheckShoppingItem(CheckShoppingItem),
    /// `remove_shopping_item`
    RemoveShoppingItem(EntityTarget),
    /// `clear_shopping_list`
    ClearShoppingList(ClearShoppingList),
    /// `add_inventory_item`
    AddInventoryItem(AddInventoryItem),
    /// `update_inventory_quantity`
    UpdateInventoryQuantity(UpdateInventoryQuantity),
    /// `remove_inventory_item`
    RemoveInventoryItem(EntityTarget),
    /// `create_recipe`
    CreateRecipe(CreateRecipe),
    /// `delete_recipe`
    DeleteRecipe(EntityTarget),
    /// `plan_meal`
    PlanMeal(PlanMeal),
    /// `complete_cleaning_task`
    CompleteCleaningTask(EntityTarget),
    /// `assign_cleaning_task`
    AssignCleaningTask(AssignCleaningTask),
    /// `reset_inventory`
    ResetInventory(ResetInventory),
}

fn check_text(function: FunctionName, field: &str, value: &str) -> HouseholdResult<()> {
    if value.trim().is_empty() {
        return Err(HouseholdError::invalid(
            function.as_str(),
            format!("{field} must not be empty"),
        ));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(HouseholdError::invalid(
            function.as_str(),
            format!("{field} must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(())
}

fn check_id(function: FunctionName, id: &str) -> HouseholdResult<()> {
    check_text(function, "id", id)?;
    if id.contains('\0') {
        return Err(HouseholdError::invalid(
            function.as_str(),
            "id must not contain null bytes",
        ));
    }
    Ok(())
}

fn check_optional_id(function: FunctionName, id: Option<&String>) -> HouseholdResult<()> {
    id.map_or(Ok(()), |id| check_id(function, id))
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_owned();
    }
}

fn trim_option(value: &mut Option<String>) {
    if let Some(inner) = value.as_mut() {
        trim_in_place(inner);
    }
    if value.as_deref().is_some_and(str::is_empty) {
        *value = None;
    }
}

fn fill_id(id: &mut Option<String>) {
    if id.is_none() {
        *id = Some(Uuid::new_v4().to_string());
    }
}

impl FunctionCall {
    /// Validate an intent and turn it into a typed call.
    ///
    /// # Errors
    ///
    /// - [`HouseholdError::UnknownFunction`] if the name is not in the catalog
    /// - [`HouseholdError::InvalidArguments`] if the arguments do not fit
    pub fn from_intent(intent: &FunctionIntent) -> HouseholdResult<Self> {
        Self::from_parts(&intent.name, &intent.arguments)
    }

    /// Same as [`from_intent`](Self::from_intent) for a name and arguments
    /// stored separately (as on a proposed action or audit entry).
    ///
    /// # Errors
    ///
    /// See [`from_intent`](Self::from_intent).
    pub fn from_parts(name: &str, arguments: &Value) -> HouseholdResult<Self> {
        let function: FunctionName = name.parse()?;
        let arguments = match arguments {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other.clone(),
        };
        if !arguments.is_object() {
            return Err(HouseholdError::invalid(
                name,
                "arguments must be a JSON object",
            ));
        }
        let tagged = serde_json::json!({ "function": function.as_str(), "arguments": arguments });
        let call: Self = serde_json::from_value(tagged)
            .map_err(|e| HouseholdError::invalid(name, e.to_string()))?;
        call.validate()?;
        Ok(call)
    }

    /// The catalog entry this call invokes.
    #[must_use]
    pub fn function(&self) -> FunctionName {
        match self {
            Self::AddShoppingItem(_) => FunctionName::AddShoppingItem,
            Self::CheckShoppingItem(_) => FunctionName::CheckShoppingItem,
            Self::RemoveShoppingItem(_) => FunctionName::RemoveShoppingItem,
            Self::ClearShoppingList(_) => FunctionName::ClearShoppingList,
            Self::AddInventoryItem(_) => FunctionName::AddInventoryItem,
            Self::UpdateInventoryQuantity(_) => FunctionName::UpdateInventoryQuantity,
            Self::RemoveInventoryItem(_) => FunctionName::RemoveInventoryItem,
            Self::CreateRecipe(_) => FunctionName::CreateRecipe,
            Self::DeleteRecipe(_) => FunctionName::DeleteRecipe,
            Self::PlanMeal(_) => FunctionName::PlanMeal,
            Self::CompleteCleaningTask(_) => FunctionName::CompleteCleaningTask,
            Self::AssignCleaningTask(_) => FunctionName::AssignCleaningTask,
            Self::ResetInventory(_) => FunctionName::ResetInventory,
        }
    }

    fn validate(&self) -> HouseholdResult<()> {
        let f = self.function();
        match self {
            Self::AddShoppingItem(a) => {
                check_optional_id(f, a.id.as_ref())?;
                check_text(f, "name", &a.name)?;
                if a.quantity == 0 {
                    return Err(HouseholdError::invalid(f.as_str(), "quantity must be at least 1"));
                }
            },
            Self::AddInventoryItem(a) => {
                check_optional_id(f, a.id.as_ref())?;
                check_text(f, "name", &a.name)?;
            },
            Self::CreateRecipe(a) => {
                check_optional_id(f, a.id.as_ref())?;
                check_text(f, "name", &a.name)?;
                if a.servings == Some(0) {
                    return Err(HouseholdError::invalid(f.as_str(), "servings must be at least 1"));
                }
            },
            Self::CheckShoppingItem(CheckShoppingItem { id, .. })
            | Self::RemoveShoppingItem(EntityTarget { id })
            | Self::UpdateInventoryQuantity(UpdateInventoryQuantity { id, .. })
            | Self::RemoveInventoryItem(EntityTarget { id })
            | Self::DeleteRecipe(EntityTarget { id })
            | Self::CompleteCleaningTask(EntityTarget { id }) => check_id(f, id)?,
            Self::AssignCleaningTask(a) => {
                check_id(f, &a.id)?;
                check_text(f, "assignee", &a.assignee)?;
            },
            Self::PlanMeal(a) => check_optional_id(f, a.recipe_id.as_ref())?,
            Self::ClearShoppingList(_) | Self::ResetInventory(_) => {},
        }
        Ok(())
    }

    /// Fill generated ids for create-style calls and trim free text.
    ///
    /// After normalization every entity a call writes is known up front, so
    /// a snapshot taken before execution records it as absent and undo can
    /// delete it again. Proposals store the normalized arguments.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        match &mut self {
            Self::AddShoppingItem(a) => {
                fill_id(&mut a.id);
                trim_in_place(&mut a.name);
                trim_option(&mut a.unit);
                trim_option(&mut a.category);
            },
            Self::AddInventoryItem(a) => {
                fill_id(&mut a.id);
                trim_in_place(&mut a.name);
                trim_option(&mut a.unit);
                trim_option(&mut a.location);
            },
            Self::CreateRecipe(a) => {
                fill_id(&mut a.id);
                trim_in_place(&mut a.name);
                a.ingredients.iter_mut().for_each(trim_in_place);
                a.ingredients.retain(|line| !line.is_empty());
                trim_option(&mut a.instructions);
            },
            Self::PlanMeal(a) => trim_option(&mut a.note),
            Self::AssignCleaningTask(a) => trim_in_place(&mut a.assignee),
            _ => {},
        }
        self
    }

    /// The argument object alone, without the function tag.
    #[must_use]
    pub fn arguments(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map
                .remove("arguments")
                .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
            _ => Value::Object(serde_json::Map::new()),
        }
    }

    /// Entities this call reads or writes, when they are known from the
    /// arguments alone. Bulk calls (`clear_shopping_list`,
    /// `reset_inventory`) return `None`; their scope depends on what is
    /// stored when they run.
    #[must_use]
    pub fn touched_entities(&self) -> Option<Vec<EntityRef>> {
        let one = |kind, id: &str| Some(vec![EntityRef::new(kind, id)]);
        match self {
            Self::AddShoppingItem(a) => {
                a.id.as_deref().and_then(|id| one(EntityKind::ShoppingItem, id))
            },
            Self::CheckShoppingItem(CheckShoppingItem { id, .. })
            | Self::RemoveShoppingItem(EntityTarget { id }) => one(EntityKind::ShoppingItem, id),
            Self::AddInventoryItem(a) => {
                a.id.as_deref().and_then(|id| one(EntityKind::InventoryItem, id))
            },
            Self::UpdateInventoryQuantity(UpdateInventoryQuantity { id, .. })
            | Self::RemoveInventoryItem(EntityTarget { id }) => one(EntityKind::InventoryItem, id),
            Self::CreateRecipe(a) => a.id.as_deref().and_then(|id| one(EntityKind::Recipe, id)),
            Self::DeleteRecipe(EntityTarget { id }) => one(EntityKind::Recipe, id),
            Self::PlanMeal(a) => one(EntityKind::MealPlan, &MealPlanEntry::id_for(a.date, a.slot)),
            Self::CompleteCleaningTask(EntityTarget { id })
            | Self::AssignCleaningTask(AssignCleaningTask { id, .. }) => {
                one(EntityKind::CleaningTask, id)
            },
            Self::ClearShoppingList(_) | Self::ResetInventory(_) => None,
        }
    }

    /// Short English description shown on proposal cards.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::AddShoppingItem(a) => {
                let what = quantity_phrase(a.quantity, a.unit.as_deref(), &a.name);
                format!("Add {what} to the shopping list")
            },
            Self::CheckShoppingItem(a) if a.checked => format!("Check off shopping item {}", a.id),
            Self::CheckShoppingItem(a) => format!("Uncheck shopping item {}", a.id),
            Self::RemoveShoppingItem(a) => format!("Remove shopping item {}", a.id),
            Self::ClearShoppingList(a) if a.only_checked => {
                "Remove all checked items from the shopping list".to_owned()
            },
            Self::ClearShoppingList(_) => "Clear the entire shopping list".to_owned(),
            Self::AddInventoryItem(a) => {
                let what = quantity_phrase(a.quantity, a.unit.as_deref(), &a.name);
                format!("Add {what} to the inventory")
            },
            Self::UpdateInventoryQuantity(a) => {
                format!("Set the quantity of inventory item {} to {}", a.id, a.quantity)
            },
            Self::RemoveInventoryItem(a) => format!("Remove inventory item {}", a.id),
            Self::CreateRecipe(a) => format!("Create recipe \"{}\"", a.name),
            Self::DeleteRecipe(a) => format!("Delete recipe {}", a.id),
            Self::PlanMeal(a) => match &a.recipe_id {
                Some(recipe) => format!("Plan recipe {recipe} for {} on {}", a.slot, a.date),
                None => format!("Plan {} on {}", a.slot, a.date),
            },
            Self::CompleteCleaningTask(a) => format!("Mark cleaning task {} as done", a.id),
            Self::AssignCleaningTask(a) => {
                format!("Assign cleaning task {} to {}", a.id, a.assignee)
            },
            Self::ResetInventory(_) => "Delete every item in the inventory".to_owned(),
        }
    }

    /// Spanish counterpart of [`describe`](Self::describe).
    #[must_use]
    pub fn describe_es(&self) -> String {
        match self {
            Self::AddShoppingItem(a) => format!(
                "Añadir {} a la lista de la compra",
                quantity_phrase(a.quantity, a.unit.as_deref(), &a.name)
            ),
            Self::CheckShoppingItem(a) if a.checked => {
                format!("Marcar como comprado el artículo {}", a.id)
            },
            Self::CheckShoppingItem(a) => format!("Desmarcar el artículo {}", a.id),
            Self::RemoveShoppingItem(a) => {
                format!("Quitar el artículo {} de la lista de la compra", a.id)
            },
            Self::ClearShoppingList(a) if a.only_checked => {
                "Quitar los artículos marcados de la lista de la compra".to_owned()
            },
            Self::ClearShoppingList(_) => "Vaciar toda la lista de la compra".to_owned(),
            Self::AddInventoryItem(a) => format!(
                "Añadir {} al inventario",
                quantity_phrase(a.quantity, a.unit.as_deref(), &a.name)
            ),
            Self::UpdateInventoryQuantity(a) => format!(
                "Cambiar la cantidad del artículo {} del inventario a {}",
                a.id, a.quantity
            ),
            Self::RemoveInventoryItem(a) => format!("Quitar el artículo {} del inventario", a.id),
            Self::CreateRecipe(a) => format!("Crear la receta \"{}\"", a.name),
            Self::DeleteRecipe(a) => format!("Eliminar la receta {}", a.id),
            Self::PlanMeal(a) => match &a.recipe_id {
                Some(recipe) => format!(
                    "Planificar la receta {recipe} para el {} del {}",
                    a.slot.as_str_es(),
                    a.date
                ),
                None => format!("Planificar el {} del {}", a.slot.as_str_es(), a.date),
            },
            Self::CompleteCleaningTask(a) => {
                format!("Marcar la tarea de limpieza {} como hecha", a.id)
            },
            Self::AssignCleaningTask(a) => {
                format!("Asignar la tarea de limpieza {} a {}", a.id, a.assignee)
            },
            Self::ResetInventory(_) => "Eliminar todos los artículos del inventario".to_owned(),
        }
    }
}

fn quantity_phrase(quantity: u32, unit: Option<&str>, name: &str) -> String {
    match (quantity, unit) {
        (1, None) => name.to_owned(),
        (q, None) => format!("{q} × {name}"),
        (q, Some(unit)) => format!("{q} {unit} {name}"),
    }
}

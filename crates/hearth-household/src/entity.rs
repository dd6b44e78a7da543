//! Household entities and the references used to snapshot them.

use std::fmt;

use chrono::NaiveDate;
use hearth_core::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The tables of household data the assistant can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Shopping list rows.
    ShoppingItem,
    /// Pantry and fridge stock.
    InventoryItem,
    /// Saved recipes.
    Recipe,
    /// Weekly meal plan slots.
    MealPlan,
    /// Recurring chores.
    CleaningTask,
}

impl EntityKind {
    /// Storage prefix for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShoppingItem => "shopping_item",
            Self::InventoryItem => "inventory_item",
            Self::Recipe => "recipe",
            Self::MealPlan => "meal_plan",
            Self::CleaningTask => "cleaning_task",
        }
    }

    /// Key prefix shared by every entity of this kind (`"<kind>:"`).
    #[must_use]
    pub fn key_prefix(&self) -> String {
        format!("{}:", self.as_str())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Points at one stored entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    /// Which table.
    pub kind: EntityKind,
    /// Id within the table.
    pub id: String,
}

impl EntityRef {
    /// Build a reference.
    #[must_use]
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Storage key, `<kind>:<id>`.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.id)
    }
}

/// A persisted household record.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// The table this entity lives in.
    const KIND: EntityKind;

    /// Id within the table.
    fn entity_id(&self) -> String;

    /// Reference to this entity.
    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(Self::KIND, self.entity_id())
    }
}

/// A line on the shared shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItem {
    /// Item id.
    pub id: String,
    /// What to buy.
    pub name: String,
    /// How many units.
    pub quantity: u32,
    /// Unit of measure, if any.
    pub unit: Option<String>,
    /// Aisle or category.
    pub category: Option<String>,
    /// Already in the basket.
    pub checked: bool,
    /// When it was added.
    pub added_at: Timestamp,
}

impl Entity for ShoppingItem {
    const KIND: EntityKind = EntityKind::ShoppingItem;

    fn entity_id(&self) -> String {
        self.id.clone()
    }
}

/// Something the household has in stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Item id.
    pub id: String,
    /// Item name.
    pub name: String,
    /// Units in stock.
    pub quantity: u32,
    /// Unit of measure, if any.
    pub unit: Option<String>,
    /// Where it is kept (pantry, fridge, freezer).
    pub location: Option<String>,
    /// Best-before date.
    pub expires_on: Option<NaiveDate>,
    /// Last change.
    pub updated_at: Timestamp,
}

impl Entity for InventoryItem {
    const KIND: EntityKind = EntityKind::InventoryItem;

    fn entity_id(&self) -> String {
        self.id.clone()
    }
}

/// A saved recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Recipe id.
    pub id: String,
    /// Recipe title.
    pub name: String,
    /// Free-form ingredient lines.
    pub ingredients: Vec<String>,
    /// Preparation steps.
    pub instructions: Option<String>,
    /// Number of servings.
    pub servings: Option<u32>,
    /// When it was saved.
    pub created_at: Timestamp,
}

impl Entity for Recipe {
    const KIND: EntityKind = EntityKind::Recipe;

    fn entity_id(&self) -> String {
        self.id.clone()
    }
}

/// Slot of the day a meal is planned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    /// Morning.
    Breakfast,
    /// Midday.
    Lunch,
    /// Evening.
    Dinner,
    /// Anything in between.
    Snack,
}

impl MealSlot {
    /// Wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        }
    }

    /// Spanish label used in `description_es`.
    #[must_use]
    pub fn as_str_es(&self) -> &'static str {
        match self {
            Self::Breakfast => "desayuno",
            Self::Lunch => "almuerzo",
            Self::Dinner => "cena",
            Self::Snack => "merienda",
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One slot of the meal plan. Keyed by date and slot, so planning the same
/// slot twice replaces the earlier entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealPlanEntry {
    /// Day.
    pub date: NaiveDate,
    /// Slot within the day.
    pub slot: MealSlot,
    /// Recipe to cook, if any.
    pub recipe_id: Option<String>,
    /// Free-form note ("leftovers", "eat out").
    pub note: Option<String>,
}

impl MealPlanEntry {
    /// Id for a date/slot pair, e.g. `2026-03-02:dinner`.
    #[must_use]
    pub fn id_for(date: NaiveDate, slot: MealSlot) -> String {
        format!("{date}:{slot}")
    }
}

impl Entity for MealPlanEntry {
    const KIND: EntityKind = EntityKind::MealPlan;

    fn entity_id(&self) -> String {
        Self::id_for(self.date, self.slot)
    }
}

/// A recurring chore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningTask {
    /// Task id.
    pub id: String,
    /// Task name.
    pub name: String,
    /// Member responsible, if any.
    pub assignee: Option<String>,
    /// Intended cadence in days.
    pub frequency_days: Option<u32>,
    /// Last time it was marked done.
    pub last_completed_at: Option<Timestamp>,
}

impl Entity for CleaningTask {
    const KIND: EntityKind = EntityKind::CleaningTask;

    fn entity_id(&self) -> String {
        self.id.clone()
    }
}

//! Reading and mutating household data.
//!
//! The engine never touches household tables directly. It goes through the
//! [`HouseholdData`] seam to capture snapshots before an action, apply the
//! action, and restore a snapshot on undo.

use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::{Clock, HouseholdId};
use hearth_storage::{KvStore, KvWrite, ScopedKvStore};
use serde_json::Value;
use tracing::debug;

use crate::call::FunctionCall;
use crate::entity::{
    CleaningTask, Entity, EntityRef, InventoryItem, MealPlanEntry, Recipe, ShoppingItem,
};
use crate::error::{HouseholdError, HouseholdResult};
use crate::output::ActionOutput;
use crate::snapshot::{EntitySnapshot, StateSnapshot};

/// Household data operations used by the executor and rollback engine.
#[async_trait]
pub trait HouseholdData: Send + Sync {
    /// Capture the current state of every entity `call` would change.
    async fn snapshot(
        &self,
        household: HouseholdId,
        call: &FunctionCall,
    ) -> HouseholdResult<StateSnapshot>;

    /// Apply `call` as a single atomic write. Nothing is written on error.
    async fn apply(
        &self,
        household: HouseholdId,
        call: &FunctionCall,
    ) -> HouseholdResult<ActionOutput>;

    /// Put every entity in `snapshot` back to its captured state.
    async fn restore(&self, household: HouseholdId, snapshot: &StateSnapshot)
    -> HouseholdResult<()>;
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// [`HouseholdData`] over a [`KvStore`], one namespace per household.
///
/// The namespace is the household id's display form (`household:<uuid>`),
/// so one household's calls cannot read or write another's rows.
#[derive(Clone)]
pub struct KvHouseholdData {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for KvHouseholdData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvHouseholdData")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl KvHouseholdData {
    /// Create a household data layer over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn scope(&self, household: HouseholdId) -> HouseholdResult<ScopedKvStore> {
        Ok(ScopedKvStore::new(
            Arc::clone(&self.store),
            household.to_string(),
        )?)
    }

    /// Read one entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the row cannot be decoded.
    pub async fn get<E: Entity>(
        &self,
        household: HouseholdId,
        id: &str,
    ) -> HouseholdResult<Option<E>> {
        let scope = self.scope(household)?;
        load(&scope, &EntityRef::new(E::KIND, id)).await
    }

    /// Read every entity of one kind, ordered by storage key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or a row cannot be decoded.
    pub async fn list<E: Entity>(&self, household: HouseholdId) -> HouseholdResult<Vec<E>> {
        let scope = self.scope(household)?;
        list_kind(&scope).await
    }

    /// Write an entity directly, bypassing the assistant.
    ///
    /// Used for data entered through the regular screens and for seeding.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn put<E: Entity>(&self, household: HouseholdId, entity: &E) -> HouseholdResult<()> {
        let scope = self.scope(household)?;
        scope
            .set_json(&entity.entity_ref().storage_key(), entity)
            .await?;
        Ok(())
    }

    async fn apply_in(
        &self,
        scope: &ScopedKvStore,
        call: FunctionCall,
    ) -> HouseholdResult<ActionOutput> {
        let now = self.clock.now();
        let (writes, output) = match call {
            FunctionCall::AddShoppingItem(args) => {
                let item = ShoppingItem {
                    id: args.id.unwrap_or_default(),
                    name: args.name,
                    quantity: args.quantity,
                    unit: args.unit,
                    category: args.category,
                    checked: false,
                    added_at: now,
                };
                ensure_absent(scope, &item.entity_ref()).await?;
                (vec![put(&item)?], ActionOutput::ShoppingItemAdded { item })
            },
            FunctionCall::CheckShoppingItem(args) => {
                let mut item: ShoppingItem = require(scope, &args.id).await?;
                item.checked = args.checked;
                (vec![put(&item)?], ActionOutput::ShoppingItemChecked { item })
            },
            FunctionCall::RemoveShoppingItem(args) => {
                let item: ShoppingItem = require(scope, &args.id).await?;
                (
                    vec![remove(&item)],
                    ActionOutput::ShoppingItemRemoved { item },
                )
            },
            FunctionCall::ClearShoppingList(args) => {
                let doomed: Vec<ShoppingItem> = list_kind::<ShoppingItem>(scope)
                    .await?
                    .into_iter()
                    .filter(|item| !args.only_checked || item.checked)
                    .collect();
                let removed = count(doomed.len());
                (
                    doomed.iter().map(remove).collect(),
                    ActionOutput::ShoppingListCleared { removed },
                )
            },
            FunctionCall::AddInventoryItem(args) => {
                let item = InventoryItem {
                    id: args.id.unwrap_or_default(),
                    name: args.name,
                    quantity: args.quantity,
                    unit: args.unit,
                    location: args.location,
                    expires_on: args.expires_on,
                    updated_at: now,
                };
                ensure_absent(scope, &item.entity_ref()).await?;
                (vec![put(&item)?], ActionOutput::InventoryItemAdded { item })
            },
            FunctionCall::UpdateInventoryQuantity(args) => {
                let mut item: InventoryItem = require(scope, &args.id).await?;
                let previous = item.quantity;
                item.quantity = args.quantity;
                item.updated_at = now;
                (
                    vec![put(&item)?],
                    ActionOutput::InventoryQuantityUpdated { item, previous },
                )
            },
            FunctionCall::RemoveInventoryItem(args) => {
                let item: InventoryItem = require(scope, &args.id).await?;
                (
                    vec![remove(&item)],
                    ActionOutput::InventoryItemRemoved { item },
                )
            },
            FunctionCall::CreateRecipe(args) => {
                let recipe = Recipe {
                    id: args.id.unwrap_or_default(),
                    name: args.name,
                    ingredients: args.ingredients,
                    instructions: args.instructions,
                    servings: args.servings,
                    created_at: now,
                };
                ensure_absent(scope, &recipe.entity_ref()).await?;
                (vec![put(&recipe)?], ActionOutput::RecipeCreated { recipe })
            },
            FunctionCall::DeleteRecipe(args) => {
                let recipe: Recipe = require(scope, &args.id).await?;
                (vec![remove(&recipe)], ActionOutput::RecipeDeleted { recipe })
            },
            FunctionCall::PlanMeal(args) => {
                if let Some(recipe_id) = &args.recipe_id {
                    require::<Recipe>(scope, recipe_id).await?;
                }
                let entry = MealPlanEntry {
                    date: args.date,
                    slot: args.slot,
                    recipe_id: args.recipe_id,
                    note: args.note,
                };
                let replaced = scope
                    .exists(&entry.entity_ref().storage_key())
                    .await?;
                (
                    vec![put(&entry)?],
                    ActionOutput::MealPlanned { entry, replaced },
                )
            },
            FunctionCall::CompleteCleaningTask(args) => {
                let mut task: CleaningTask = require(scope, &args.id).await?;
                task.last_completed_at = Some(now);
                (
                    vec![put(&task)?],
                    ActionOutput::CleaningTaskCompleted { task },
                )
            },
            FunctionCall::AssignCleaningTask(args) => {
                let mut task: CleaningTask = require(scope, &args.id).await?;
                task.assignee = Some(args.assignee);
                (
                    vec![put(&task)?],
                    ActionOutput::CleaningTaskAssigned { task },
                )
            },
            FunctionCall::ResetInventory(_) => {
                let items = list_kind::<InventoryItem>(scope).await?;
                let removed = count(items.len());
                (
                    items.iter().map(remove).collect(),
                    ActionOutput::InventoryReset { removed },
                )
            },
        };
        scope.write_batch(writes).await?;
        Ok(output)
    }
}

#[async_trait]
impl HouseholdData for KvHouseholdData {
    async fn snapshot(
        &self,
        household: HouseholdId,
        call: &FunctionCall,
    ) -> HouseholdResult<StateSnapshot> {
        let scope = self.scope(household)?;
        let mut entities = Vec::new();
        for entity in scope_refs(&scope, call).await? {
            let state: Option<Value> = scope.get_json(&entity.storage_key()).await?;
            entities.push(EntitySnapshot { entity, state });
        }
        debug!(
            household = %household,
            function = %call.function(),
            captured = entities.len(),
            "captured pre-state snapshot"
        );
        Ok(StateSnapshot { entities })
    }

    async fn apply(
        &self,
        household: HouseholdId,
        call: &FunctionCall,
    ) -> HouseholdResult<ActionOutput> {
        let scope = self.scope(household)?;
        let call = call.clone().normalize();
        let function = call.function();
        let output = self.apply_in(&scope, call).await?;
        debug!(household = %household, function = %function, "applied household call");
        Ok(output)
    }

    async fn restore(
        &self,
        household: HouseholdId,
        snapshot: &StateSnapshot,
    ) -> HouseholdResult<()> {
        let scope = self.scope(household)?;
        let writes = snapshot
            .entities
            .iter()
            .map(|captured| {
                let key = captured.entity.storage_key();
                match &captured.state {
                    Some(state) => KvWrite::put_json(key, state).map_err(HouseholdError::from),
                    None => Ok(KvWrite::delete(key)),
                }
            })
            .collect::<HouseholdResult<Vec<_>>>()?;
        scope.write_batch(writes).await?;
        debug!(
            household = %household,
            restored = snapshot.entities.len(),
            "restored snapshot"
        );
        Ok(())
    }
}

async fn scope_refs(
    scope: &ScopedKvStore,
    call: &FunctionCall,
) -> HouseholdResult<Vec<EntityRef>> {
    if let Some(refs) = call.touched_entities() {
        return Ok(refs);
    }
    match call {
        FunctionCall::ClearShoppingList(args) => Ok(list_kind::<ShoppingItem>(scope)
            .await?
            .into_iter()
            .filter(|item| !args.only_checked || item.checked)
            .map(|item| item.entity_ref())
            .collect()),
        FunctionCall::ResetInventory(_) => Ok(list_kind::<InventoryItem>(scope)
            .await?
            .into_iter()
            .map(|item| item.entity_ref())
            .collect()),
        // Create calls without an id: nothing exists yet to capture.
        _ => Ok(Vec::new()),
    }
}

fn put<E: Entity>(entity: &E) -> HouseholdResult<KvWrite> {
    Ok(KvWrite::put_json(entity.entity_ref().storage_key(), entity)?)
}

fn remove<E: Entity>(entity: &E) -> KvWrite {
    KvWrite::delete(entity.entity_ref().storage_key())
}

async fn load<E: Entity>(scope: &ScopedKvStore, entity: &EntityRef) -> HouseholdResult<Option<E>> {
    Ok(scope.get_json(&entity.storage_key()).await?)
}

async fn require<E: Entity>(scope: &ScopedKvStore, id: &str) -> HouseholdResult<E> {
    let entity = EntityRef::new(E::KIND, id);
    load(scope, &entity)
        .await?
        .ok_or(HouseholdError::EntityNotFound { entity })
}

async fn ensure_absent(scope: &ScopedKvStore, entity: &EntityRef) -> HouseholdResult<()> {
    if scope.exists(&entity.storage_key()).await? {
        return Err(HouseholdError::EntityExists {
            entity: entity.clone(),
        });
    }
    Ok(())
}

async fn list_kind<E: Entity>(scope: &ScopedKvStore) -> HouseholdResult<Vec<E>> {
    let prefix = E::KIND.key_prefix();
    let mut keys: Vec<String> = scope
        .list_keys()
        .await?
        .into_iter()
        .filter(|k| k.starts_with(&prefix))
        .collect();
    keys.sort();
    let mut out = Vec::with_capacity(keys.len());
    for key in keys {
        if let Some(entity) = scope.get_json(&key).await? {
            out.push(entity);
        }
    }
    Ok(out)
}

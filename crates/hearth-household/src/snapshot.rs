//! Pre-execution state captures used for undo.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::EntityRef;

/// The captured state of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Which entity.
    pub entity: EntityRef,
    /// Its stored JSON, or `None` if it did not exist.
    pub state: Option<Value>,
}

/// Everything an action could change, as it was before the action ran.
///
/// Restoring is a full replace: every entity with a `state` is written back
/// verbatim and every entity recorded as absent is deleted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Captured entities.
    pub entities: Vec<EntitySnapshot>,
}

impl StateSnapshot {
    /// Whether nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Captured state of `entity`, if it is part of this snapshot.
    #[must_use]
    pub fn state_of(&self, entity: &EntityRef) -> Option<&EntitySnapshot> {
        self.entities.iter().find(|e| &e.entity == entity)
    }
}

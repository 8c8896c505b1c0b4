//! The entity registry: every live world entity keyed by identity.
//!
//! The registry is mutated only by the spawn authority (and by the tick
//! cycle applying agent effects through it). Agents read it to resolve
//! targets; a lookup miss is how a behavior detects that its target has
//! been destroyed.

use std::collections::BTreeMap;

use habitat_types::{Entity, EntityCategory, EntityId, Position};

use crate::error::WorldError;

/// All live entities, ordered by identifier for deterministic iteration.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: BTreeMap<EntityId, Entity>,
}

impl EntityRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
        }
    }

    /// Insert a new entity.
    pub fn insert(&mut self, entity: Entity) -> Result<(), WorldError> {
        if self.entities.contains_key(&entity.id) {
            return Err(WorldError::DuplicateEntity(entity.id));
        }
        self.entities.insert(entity.id, entity);
        Ok(())
    }

    /// Remove an entity, returning it if it was live.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Look up an entity.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Whether the entity is still live.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Move an entity.
    pub fn set_position(&mut self, id: EntityId, position: Position) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        entity.position = position;
        Ok(())
    }

    /// Iterate over all live entities.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Iterate over live entities of one category.
    pub fn by_category(&self, category: EntityCategory) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(move |e| e.category == category)
    }

    /// Number of live entities of one category.
    pub fn count(&self, category: EntityCategory) -> usize {
        self.by_category(category).count()
    }

    /// Total number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

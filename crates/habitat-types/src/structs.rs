//! Core records shared by the world, the marker bus and agent knowledge.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EntityCategory, MarkerEventKind};
use crate::geometry::Position;
use crate::ids::{AgentId, EntityId, MapId};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A live world entity. Entities carry no behavior of their own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Entity {
    /// Stable identity for the entity's lifetime.
    pub id: EntityId,
    /// Category tag.
    pub category: EntityCategory,
    /// Current world position.
    pub position: Position,
}

impl Entity {
    /// Create an entity with a fresh identifier.
    pub fn new(category: EntityCategory, position: Position) -> Self {
        Self {
            id: EntityId::new(),
            category,
            position,
        }
    }
}

// ---------------------------------------------------------------------------
// Marker events
// ---------------------------------------------------------------------------

/// An immutable notification that an entity appeared or disappeared.
///
/// The position is where the entity was at the moment of the transition,
/// which is what knowledge stores measure their detection range against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarkerEvent {
    /// The entity the event refers to.
    pub entity: EntityId,
    /// The entity's category.
    pub category: EntityCategory,
    /// Spawned or removed.
    pub kind: MarkerEventKind,
    /// Where the entity was when the event fired.
    pub position: Position,
}

impl MarkerEvent {
    /// A `Spawned` event for `entity`.
    pub const fn spawned(entity: &Entity) -> Self {
        Self {
            entity: entity.id,
            category: entity.category,
            kind: MarkerEventKind::Spawned,
            position: entity.position,
        }
    }

    /// A `Removed` event for `entity`.
    pub const fn removed(entity: &Entity) -> Self {
        Self {
            entity: entity.id,
            category: entity.category,
            kind: MarkerEventKind::Removed,
            position: entity.position,
        }
    }
}

// ---------------------------------------------------------------------------
// Known markers
// ---------------------------------------------------------------------------

/// An agent-local record that an entity has been discovered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct KnownMarker {
    /// The discovered entity.
    pub entity: EntityId,
    /// Its category.
    pub category: EntityCategory,
    /// Where it was at discovery time.
    pub position: Position,
}

// ---------------------------------------------------------------------------
// Bus subscribers
// ---------------------------------------------------------------------------

/// Identity of a marker bus subscriber.
///
/// Subscribers are addressed by identity rather than by handler reference so
/// that registration is idempotent and the owning context can hand out
/// mutable access at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum SubscriberId {
    /// An agent's knowledge store.
    Agent(AgentId),
    /// A map projection consumer.
    Map(MapId),
}

impl core::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Agent(id) => write!(f, "agent:{id}"),
            Self::Map(id) => write!(f, "map:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_events_copy_entity_fields() {
        let food = Entity::new(EntityCategory::Food, Position::new(1.0, 2.0));
        let spawned = MarkerEvent::spawned(&food);
        let removed = MarkerEvent::removed(&food);
        assert_eq!(spawned.entity, food.id);
        assert_eq!(spawned.kind, MarkerEventKind::Spawned);
        assert_eq!(removed.kind, MarkerEventKind::Removed);
        assert_eq!(removed.category, EntityCategory::Food);
    }

    #[test]
    fn subscriber_ids_order_agents_before_maps() {
        let agent = SubscriberId::Agent(AgentId(9));
        let map = SubscriberId::Map(MapId::new());
        assert!(agent < map);
        assert_eq!(agent.to_string(), "agent:9");
    }
}

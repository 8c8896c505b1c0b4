//! Continuous spawn point discovery.
//!
//! Every tick the agent checks its distance to *all* spawn points, not just
//! those announced after it existed. The first time a point comes within
//! range it is recorded, and any food already mapped to it is recorded too
//! and re-announced so other listeners can react.

use std::collections::BTreeSet;

use habitat_types::{AgentId, EntityId, KnownMarker, MarkerEvent, Position};
use habitat_world::{EntityRegistry, SpawnAuthority};
use tracing::debug;

use crate::knowledge::KnowledgeStore;

/// Spawn points this agent has already found.
#[derive(Debug, Clone, Default)]
pub struct SpawnPointDiscovery {
    detection_range: f64,
    discovered: BTreeSet<EntityId>,
}

impl SpawnPointDiscovery {
    /// Nothing discovered yet.
    pub const fn new(detection_range: f64) -> Self {
        Self {
            detection_range,
            discovered: BTreeSet::new(),
        }
    }

    /// Check every spawn point against `position`.
    ///
    /// Returns the `Spawned` events to republish on the marker bus: one per
    /// newly found spawn point, plus one per live food item mapped to a
    /// newly found food point.
    pub fn poll(
        &mut self,
        agent: AgentId,
        position: Position,
        spawns: &SpawnAuthority,
        registry: &EntityRegistry,
        knowledge: &mut KnowledgeStore,
    ) -> Vec<MarkerEvent> {
        let mut republish = Vec::new();

        for point in spawns.food_spawn_points() {
            if !self.first_contact(point.id, point.position, position) {
                continue;
            }
            knowledge.record(KnownMarker {
                entity: point.id,
                category: point.category,
                position: point.position,
            });
            republish.push(MarkerEvent::spawned(point));
            debug!(agent_id = %agent, point = %point.id, "Discovered food spawn point");

            for event in spawns.food_events_for_point(registry, point.id) {
                knowledge.record(KnownMarker {
                    entity: event.entity,
                    category: event.category,
                    position: event.position,
                });
                republish.push(event);
            }
        }

        for point in spawns.enemy_spawn_points() {
            if !self.first_contact(point.id, point.position, position) {
                continue;
            }
            knowledge.record(KnownMarker {
                entity: point.id,
                category: point.category,
                position: point.position,
            });
            republish.push(MarkerEvent::spawned(point));
            debug!(agent_id = %agent, point = %point.id, "Discovered enemy spawn point");
        }

        republish
    }

    /// Whether the point is in range and was not found before (marks it found).
    fn first_contact(&mut self, point: EntityId, at: Position, observer: Position) -> bool {
        observer.distance(at) <= self.detection_range && self.discovered.insert(point)
    }

    /// Whether `point` has been found.
    pub fn has_found(&self, point: EntityId) -> bool {
        self.discovered.contains(&point)
    }

    /// Number of spawn points found.
    pub fn found_count(&self) -> usize {
        self.discovered.len()
    }
}

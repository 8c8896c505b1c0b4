//! The agent knowledge store: which entities this agent has discovered.
//!
//! Discovery through the marker bus is a one-shot range check at spawn
//! time. An agent far away when something spawns does not learn about it
//! by walking past later; spawn point polling (see [`crate::discovery`])
//! covers that gap and records into the same store. Recording is
//! idempotent per `(entity, category)`, so both mechanisms can report the
//! same entity without duplicates.

use habitat_types::{EntityCategory, EntityId, KnownMarker, MarkerEvent, MarkerEventKind, Position};
use tracing::debug;

/// Known markers for one agent.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeStore {
    detection_range: f64,
    markers: Vec<KnownMarker>,
}

impl KnowledgeStore {
    /// An empty store with the given spawn-time detection range.
    pub const fn new(detection_range: f64) -> Self {
        Self {
            detection_range,
            markers: Vec::new(),
        }
    }

    /// Sensor range for spawn announcements.
    pub const fn detection_range(&self) -> f64 {
        self.detection_range
    }

    /// React to a marker event seen from `observer`.
    ///
    /// Spawned events within range are recorded; Removed events drop every
    /// marker for the entity, whatever its category. Returns whether the
    /// store changed.
    pub fn observe(&mut self, event: &MarkerEvent, observer: Position) -> bool {
        match event.kind {
            MarkerEventKind::Spawned => {
                if observer.distance(event.position) <= self.detection_range {
                    self.record(KnownMarker {
                        entity: event.entity,
                        category: event.category,
                        position: event.position,
                    })
                } else {
                    false
                }
            }
            MarkerEventKind::Removed => self.forget(event.entity) > 0,
        }
    }

    /// Record a discovery. Returns `false` if it was already known.
    pub fn record(&mut self, marker: KnownMarker) -> bool {
        if self.has_discovered(marker.entity, marker.category) {
            return false;
        }
        debug!(entity = %marker.entity, category = ?marker.category, "Marker discovered");
        self.markers.push(marker);
        true
    }

    /// Drop every marker referencing `entity`. Returns how many were removed.
    pub fn forget(&mut self, entity: EntityId) -> usize {
        let before = self.markers.len();
        self.markers.retain(|m| m.entity != entity);
        before.saturating_sub(self.markers.len())
    }

    /// Whether `entity` is known under `category`.
    pub fn has_discovered(&self, entity: EntityId, category: EntityCategory) -> bool {
        self.markers
            .iter()
            .any(|m| m.entity == entity && m.category == category)
    }

    /// Every known marker, in discovery order.
    pub fn all_known(&self) -> &[KnownMarker] {
        &self.markers
    }

    /// Known markers of one category.
    pub fn known_of(&self, category: EntityCategory) -> impl Iterator<Item = &KnownMarker> {
        self.markers.iter().filter(move |m| m.category == category)
    }

    /// Forget everything (used when the agent dies).
    pub fn clear(&mut self) {
        self.markers.clear();
    }
}

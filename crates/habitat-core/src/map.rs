//! Map projection: turns known markers into normalised map coordinates.
//!
//! [`GlobalMap`] subscribes to the marker bus and mirrors every live
//! marker in the world. Per-agent maps are built on demand from the
//! agent's knowledge store with [`agent_map`].

use std::collections::BTreeMap;

use habitat_events::MarkerSubscriber;
use habitat_types::{EntityId, KnownMarker, MapEncoding, MapId, MapObject, MarkerEvent, MarkerEventKind, Position};

/// Project a world position onto `[0, 1]²`.
///
/// `(-half_extent, -half_extent)` maps to `(0, 0)`; points outside the
/// field are clamped to the edge.
pub fn project(half_extent: f64, position: Position) -> (f64, f64) {
    if half_extent <= 0.0 {
        return (0.5, 0.5);
    }
    let side = 2.0 * half_extent;
    let u = ((position.x + half_extent) / side).clamp(0.0, 1.0);
    let v = ((position.y + half_extent) / side).clamp(0.0, 1.0);
    (u, v)
}

fn map_object(half_extent: f64, marker: &KnownMarker) -> MapObject {
    let (u, v) = project(half_extent, marker.position);
    MapObject {
        entity: marker.entity,
        category: marker.category,
        position: marker.position,
        u,
        v,
    }
}

fn encode<'a>(half_extent: f64, markers: impl Iterator<Item = &'a KnownMarker>) -> MapEncoding {
    let mut objects: Vec<MapObject> = markers.map(|m| map_object(half_extent, m)).collect();
    objects.sort_by_key(|o| (o.category, o.entity));
    MapEncoding { half_extent, objects }
}

/// Map view of the markers one agent knows.
pub fn agent_map(half_extent: f64, known: &[KnownMarker]) -> MapEncoding {
    encode(half_extent, known.iter())
}

/// The user-facing map: every live marker the bus has announced.
#[derive(Debug, Clone)]
pub struct GlobalMap {
    id: MapId,
    half_extent: f64,
    markers: BTreeMap<EntityId, KnownMarker>,
}

impl GlobalMap {
    /// An empty map covering a field of the given half extent.
    pub fn new(half_extent: f64) -> Self {
        Self {
            id: MapId::new(),
            half_extent,
            markers: BTreeMap::new(),
        }
    }

    /// Bus subscriber identity.
    pub const fn id(&self) -> MapId {
        self.id
    }

    /// Current encoding, ordered by category then entity.
    pub fn encoding(&self) -> MapEncoding {
        encode(self.half_extent, self.markers.values())
    }

    /// Number of markers shown.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether the map shows nothing.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Whether `entity` is shown.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.markers.contains_key(&entity)
    }
}

impl MarkerSubscriber for GlobalMap {
    fn on_marker(&mut self, event: &MarkerEvent) {
        match event.kind {
            MarkerEventKind::Spawned => {
                self.markers.insert(
                    event.entity,
                    KnownMarker {
                        entity: event.entity,
                        category: event.category,
                        position: event.position,
                    },
                );
            }
            MarkerEventKind::Removed => {
                self.markers.remove(&event.entity);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_types::{Entity, EntityCategory};

    use super::*;

    fn close(actual: (f64, f64), expected: (f64, f64)) -> bool {
        (actual.0 - expected.0).abs() < 1e-12 && (actual.1 - expected.1).abs() < 1e-12
    }

    #[test]
    fn projection_is_normalised_and_clamped() {
        assert!(close(project(10.0, Position::new(-10.0, -10.0)), (0.0, 0.0)));
        assert!(close(project(10.0, Position::ORIGIN), (0.5, 0.5)));
        assert!(close(project(10.0, Position::new(5.0, 10.0)), (0.75, 1.0)));
        assert!(close(project(10.0, Position::new(50.0, -50.0)), (1.0, 0.0)));
    }

    #[test]
    fn global_map_follows_the_bus() {
        let mut map = GlobalMap::new(10.0);
        let food = Entity::new(EntityCategory::Food, Position::new(2.0, 0.0));
        let block = Entity::new(EntityCategory::Block, Position::new(-2.0, 0.0));
        map.on_marker(&MarkerEvent::spawned(&food));
        map.on_marker(&MarkerEvent::spawned(&block));
        map.on_marker(&MarkerEvent::spawned(&food));
        assert_eq!(map.len(), 2);

        let encoding = map.encoding();
        let categories: Vec<_> = encoding.objects.iter().map(|o| o.category).collect();
        assert_eq!(categories, vec![EntityCategory::Food, EntityCategory::Block]);

        map.on_marker(&MarkerEvent::removed(&food));
        assert!(!map.contains(food.id));
        assert!(map.contains(block.id));
    }

    #[test]
    fn agent_map_encodes_known_markers() {
        let known = [KnownMarker {
            entity: EntityId::new(),
            category: EntityCategory::FoodSpawn,
            position: Position::new(0.0, -5.0),
        }];
        let encoding = agent_map(10.0, &known);
        let object = encoding.objects.first().unwrap();
        assert!(close((object.u, object.v), (0.5, 0.25)));
        assert_eq!(encoding.objects.len(), 1);
    }
}

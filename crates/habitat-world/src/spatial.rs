//! Spatial queries: proximity search, pathfinding and navigable sampling.
//!
//! The host engine's physics and navigation mesh are a black box to the
//! simulation. [`SpatialQuery`] is the seam: behaviors only ever ask "what
//! is near me", "can I get there" and "where is the closest walkable
//! point". [`OpenField`] answers those questions for an unobstructed
//! square world.

use core::cmp::Ordering;

use habitat_types::{Entity, EntityCategory, Position};

use crate::registry::EntityRegistry;

/// Proximity, path and navigability queries against the world.
pub trait SpatialQuery {
    /// Entities of `category` within `radius` of `center`, nearest first.
    ///
    /// Ties on distance are broken by entity identifier so the result is
    /// deterministic.
    fn find_nearby(
        &self,
        registry: &EntityRegistry,
        center: Position,
        radius: f64,
        category: EntityCategory,
    ) -> Vec<Entity> {
        let mut found: Vec<(f64, Entity)> = registry
            .by_category(category)
            .map(|e| (center.distance(e.position), *e))
            .filter(|(d, _)| *d <= radius)
            .collect();
        found.sort_by(|(da, a), (db, b)| {
            da.partial_cmp(db)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        found.into_iter().map(|(_, e)| e).collect()
    }

    /// The nearest entity of `category` within `radius`, if any.
    fn find_nearest(
        &self,
        registry: &EntityRegistry,
        center: Position,
        radius: f64,
        category: EntityCategory,
    ) -> Option<Entity> {
        self.find_nearby(registry, center, radius, category)
            .into_iter()
            .next()
    }

    /// Waypoints from `from` to `to` (excluding `from`), or `None` if the
    /// destination is unreachable.
    fn find_path(&self, from: Position, to: Position) -> Option<Vec<Position>>;

    /// The navigable point closest to `near`, provided it lies within
    /// `radius` of it.
    fn sample_navigable_point(&self, near: Position, radius: f64) -> Option<Position>;
}

/// An obstacle-free square world centred on the origin.
#[derive(Debug, Clone, Copy)]
pub struct OpenField {
    half_extent: f64,
}

impl OpenField {
    /// A field spanning `[-half_extent, half_extent]` on both axes.
    pub const fn new(half_extent: f64) -> Self {
        Self { half_extent }
    }

    /// Half of the side length.
    pub const fn half_extent(&self) -> f64 {
        self.half_extent
    }

    /// Whether `point` lies on the field.
    pub fn contains(&self, point: Position) -> bool {
        point.x.abs() <= self.half_extent && point.y.abs() <= self.half_extent
    }

    /// Project `point` onto the field.
    pub fn clamp(&self, point: Position) -> Position {
        Position::new(
            point.x.clamp(-self.half_extent, self.half_extent),
            point.y.clamp(-self.half_extent, self.half_extent),
        )
    }
}

impl SpatialQuery for OpenField {
    fn find_path(&self, from: Position, to: Position) -> Option<Vec<Position>> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }
        Some(vec![to])
    }

    fn sample_navigable_point(&self, near: Position, radius: f64) -> Option<Position> {
        let clamped = self.clamp(near);
        (clamped.distance(near) <= radius).then_some(clamped)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn registry_with(points: &[(EntityCategory, f64, f64)]) -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        for &(category, x, y) in points {
            registry
                .insert(Entity::new(category, Position::new(x, y)))
                .unwrap();
        }
        registry
    }

    #[test]
    fn find_nearby_filters_and_sorts() {
        let registry = registry_with(&[
            (EntityCategory::Food, 4.0, 0.0),
            (EntityCategory::Food, 1.0, 0.0),
            (EntityCategory::Food, 9.0, 0.0),
            (EntityCategory::Enemy, 0.5, 0.0),
        ]);
        let field = OpenField::new(50.0);
        let found = field.find_nearby(&registry, Position::ORIGIN, 5.0, EntityCategory::Food);
        let xs: Vec<f64> = found.iter().map(|e| e.position.x).collect();
        assert_eq!(xs.len(), 2);
        assert!(xs.first().unwrap() < xs.get(1).unwrap());
        let nearest = field
            .find_nearest(&registry, Position::ORIGIN, 5.0, EntityCategory::Enemy)
            .unwrap();
        assert_eq!(nearest.category, EntityCategory::Enemy);
    }

    #[test]
    fn path_outside_field_is_unreachable() {
        let field = OpenField::new(10.0);
        assert!(field.find_path(Position::ORIGIN, Position::new(5.0, 5.0)).is_some());
        assert!(field.find_path(Position::ORIGIN, Position::new(50.0, 0.0)).is_none());
    }

    #[test]
    fn sampling_clamps_within_radius() {
        let field = OpenField::new(10.0);
        let sampled = field
            .sample_navigable_point(Position::new(12.0, 0.0), 3.0)
            .unwrap();
        assert!(sampled.approx_eq(Position::new(10.0, 0.0), 1e-9));
        assert!(field.sample_navigable_point(Position::new(30.0, 0.0), 3.0).is_none());
    }
}

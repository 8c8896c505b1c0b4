//! The spawn authority: the only writer of world entities.
//!
//! Every entity that appears or disappears goes through here, and every
//! such transition yields exactly one [`MarkerEvent`]. The authority does
//! not publish those events itself; it returns them so the simulation
//! context can push them through the marker bus immediately.
//!
//! # Day cycle
//!
//! At sunrise a random subset of food spawn points becomes active and food
//! is scattered around each, and a random subset of enemy spawn points
//! receives a fresh wave of enemies. At nightfall all food is removed and
//! every enemy spawn point becomes active.

use std::collections::BTreeMap;

use habitat_types::{Entity, EntityCategory, EntityId, MarkerEvent, Position};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::WorldError;
use crate::registry::EntityRegistry;
use crate::spatial::SpatialQuery;

/// Spawn point layout and spawn volumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnSettings {
    /// Food spawn point locations.
    #[serde(default = "default_food_spawn_points")]
    pub food_spawn_points: Vec<Position>,
    /// Enemy spawn point locations.
    #[serde(default = "default_enemy_spawn_points")]
    pub enemy_spawn_points: Vec<Position>,
    /// Blocks lying in the world at start.
    #[serde(default = "default_blocks")]
    pub blocks: Vec<Position>,
    /// Food items spawned around each active food point.
    #[serde(default = "default_max_food")]
    pub max_food: u32,
    /// Enemies spawned around each active enemy point.
    #[serde(default = "default_max_enemies")]
    pub max_enemies: u32,
    /// Scatter radius around a food point.
    #[serde(default = "default_food_spawn_radius")]
    pub food_spawn_radius: f64,
    /// Scatter radius around an enemy point.
    #[serde(default = "default_enemy_spawn_radius")]
    pub enemy_spawn_radius: f64,
    /// Food points activated each morning.
    #[serde(default = "default_daily_active_food")]
    pub daily_active_food_spawn_count: usize,
    /// Enemy points activated each morning.
    #[serde(default = "default_daily_active_enemy")]
    pub daily_active_enemy_spawn_count: usize,
}

fn default_food_spawn_points() -> Vec<Position> {
    vec![
        Position::new(20.0, 20.0),
        Position::new(-25.0, 15.0),
        Position::new(30.0, -20.0),
        Position::new(-20.0, -30.0),
    ]
}

fn default_enemy_spawn_points() -> Vec<Position> {
    vec![
        Position::new(50.0, 50.0),
        Position::new(-50.0, 45.0),
        Position::new(45.0, -50.0),
        Position::new(-45.0, -50.0),
    ]
}

fn default_blocks() -> Vec<Position> {
    vec![
        Position::new(12.0, 4.0),
        Position::new(14.0, -3.0),
        Position::new(-11.0, 6.0),
    ]
}

const fn default_max_food() -> u32 {
    10
}

const fn default_max_enemies() -> u32 {
    5
}

const fn default_food_spawn_radius() -> f64 {
    5.0
}

const fn default_enemy_spawn_radius() -> f64 {
    10.0
}

const fn default_daily_active_food() -> usize {
    2
}

const fn default_daily_active_enemy() -> usize {
    2
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            food_spawn_points: default_food_spawn_points(),
            enemy_spawn_points: default_enemy_spawn_points(),
            blocks: default_blocks(),
            max_food: default_max_food(),
            max_enemies: default_max_enemies(),
            food_spawn_radius: default_food_spawn_radius(),
            enemy_spawn_radius: default_enemy_spawn_radius(),
            daily_active_food_spawn_count: default_daily_active_food(),
            daily_active_enemy_spawn_count: default_daily_active_enemy(),
        }
    }
}

/// Owns spawn points and the bookkeeping of what was spawned where.
#[derive(Debug, Clone)]
pub struct SpawnAuthority {
    settings: SpawnSettings,
    food_points: Vec<Entity>,
    enemy_points: Vec<Entity>,
    active_food_points: Vec<EntityId>,
    active_enemy_points: Vec<EntityId>,
    spawned_food: Vec<EntityId>,
    spawned_enemies: Vec<EntityId>,
    food_by_point: BTreeMap<EntityId, Vec<EntityId>>,
}

impl SpawnAuthority {
    /// Create an authority with no entities placed yet.
    pub const fn new(settings: SpawnSettings) -> Self {
        Self {
            settings,
            food_points: Vec::new(),
            enemy_points: Vec::new(),
            active_food_points: Vec::new(),
            active_enemy_points: Vec::new(),
            spawned_food: Vec::new(),
            spawned_enemies: Vec::new(),
            food_by_point: BTreeMap::new(),
        }
    }

    /// Place spawn points and the initial blocks.
    pub fn populate(&mut self, registry: &mut EntityRegistry) -> Result<Vec<MarkerEvent>, WorldError> {
        let mut events = Vec::new();
        for position in self.settings.food_spawn_points.clone() {
            let point = Entity::new(EntityCategory::FoodSpawn, position);
            registry.insert(point)?;
            self.food_points.push(point);
            events.push(MarkerEvent::spawned(&point));
        }
        for position in self.settings.enemy_spawn_points.clone() {
            let point = Entity::new(EntityCategory::EnemySpawn, position);
            registry.insert(point)?;
            self.enemy_points.push(point);
            events.push(MarkerEvent::spawned(&point));
        }
        for position in self.settings.blocks.clone() {
            events.push(self.spawn(registry, EntityCategory::Block, position)?);
        }
        info!(
            food_points = self.food_points.len(),
            enemy_points = self.enemy_points.len(),
            blocks = self.settings.blocks.len(),
            "World populated"
        );
        Ok(events)
    }

    /// Spawn a single entity.
    pub fn spawn(
        &mut self,
        registry: &mut EntityRegistry,
        category: EntityCategory,
        position: Position,
    ) -> Result<MarkerEvent, WorldError> {
        let entity = Entity::new(category, position);
        registry.insert(entity)?;
        match category {
            EntityCategory::Food => self.spawned_food.push(entity.id),
            EntityCategory::Enemy => self.spawned_enemies.push(entity.id),
            _ => {}
        }
        debug!(entity = %entity.id, ?category, %position, "Entity spawned");
        Ok(MarkerEvent::spawned(&entity))
    }

    /// Remove a live entity (consumed, killed or despawned).
    ///
    /// Returns `None` if the entity was already gone, so a double removal
    /// never produces a second event.
    pub fn remove(&mut self, registry: &mut EntityRegistry, id: EntityId) -> Option<MarkerEvent> {
        let entity = registry.remove(id)?;
        self.spawned_food.retain(|f| *f != id);
        self.spawned_enemies.retain(|e| *e != id);
        for foods in self.food_by_point.values_mut() {
            foods.retain(|f| *f != id);
        }
        debug!(entity = %id, category = ?entity.category, "Entity removed");
        Some(MarkerEvent::removed(&entity))
    }

    /// Sunrise: rotate active food points, respawn food and the day enemy wave.
    pub fn begin_day<R: Rng + ?Sized>(
        &mut self,
        registry: &mut EntityRegistry,
        spatial: &dyn SpatialQuery,
        rng: &mut R,
    ) -> Result<Vec<MarkerEvent>, WorldError> {
        let mut events = self.despawn_food(registry);
        self.active_food_points = choose_active(
            &self.food_points,
            self.settings.daily_active_food_spawn_count,
            EntityCategory::FoodSpawn,
            rng,
        )
        .unwrap_or_else(|e| {
            warn!(error = %e, "Food spawning skipped");
            Vec::new()
        });

        for point_id in self.active_food_points.clone() {
            let Some(center) = self.point_position(point_id) else {
                continue;
            };
            let mut foods = Vec::new();
            for _ in 0..self.settings.max_food {
                let at = scatter(center, self.settings.food_spawn_radius, spatial, rng);
                let event = self.spawn(registry, EntityCategory::Food, at)?;
                foods.push(event.entity);
                events.push(event);
            }
            self.food_by_point.insert(point_id, foods);
        }

        events.extend(self.despawn_enemies(registry));
        self.active_enemy_points = choose_active(
            &self.enemy_points,
            self.settings.daily_active_enemy_spawn_count,
            EntityCategory::EnemySpawn,
            rng,
        )
        .unwrap_or_else(|e| {
            warn!(error = %e, "Enemy spawning skipped");
            Vec::new()
        });
        events.extend(self.spawn_enemy_wave(registry, spatial, rng)?);

        info!(
            active_food_points = self.active_food_points.len(),
            active_enemy_points = self.active_enemy_points.len(),
            food = self.spawned_food.len(),
            enemies = self.spawned_enemies.len(),
            "Daytime spawn points activated"
        );
        Ok(events)
    }

    /// Nightfall: remove all food and activate every enemy spawn point.
    pub fn begin_night<R: Rng + ?Sized>(
        &mut self,
        registry: &mut EntityRegistry,
        spatial: &dyn SpatialQuery,
        rng: &mut R,
    ) -> Result<Vec<MarkerEvent>, WorldError> {
        let mut events = self.despawn_food(registry);
        self.active_food_points.clear();
        events.extend(self.despawn_enemies(registry));
        self.active_enemy_points = self.enemy_points.iter().map(|p| p.id).collect();
        events.extend(self.spawn_enemy_wave(registry, spatial, rng)?);
        info!(
            active_enemy_points = self.active_enemy_points.len(),
            enemies = self.spawned_enemies.len(),
            "Nighttime: all enemy spawn points active"
        );
        Ok(events)
    }

    /// All food spawn points.
    pub fn food_spawn_points(&self) -> &[Entity] {
        &self.food_points
    }

    /// All enemy spawn points.
    pub fn enemy_spawn_points(&self) -> &[Entity] {
        &self.enemy_points
    }

    /// Food spawn points active today.
    pub fn active_food_points(&self) -> &[EntityId] {
        &self.active_food_points
    }

    /// Whether `point` is an active food spawn point.
    pub fn is_active_food_point(&self, point: EntityId) -> bool {
        self.active_food_points.contains(&point)
    }

    /// Food still mapped to a spawn point.
    pub fn food_at(&self, point: EntityId) -> &[EntityId] {
        self.food_by_point
            .get(&point)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// `Spawned` events for every live food item mapped to `point`.
    ///
    /// Used when an agent discovers a spawn point late and needs to learn
    /// about the food that is already there.
    pub fn food_events_for_point(&self, registry: &EntityRegistry, point: EntityId) -> Vec<MarkerEvent> {
        self.food_at(point)
            .iter()
            .filter_map(|id| registry.get(*id))
            .map(MarkerEvent::spawned)
            .collect()
    }

    fn point_position(&self, id: EntityId) -> Option<Position> {
        self.food_points
            .iter()
            .chain(&self.enemy_points)
            .find(|p| p.id == id)
            .map(|p| p.position)
    }

    fn despawn_food(&mut self, registry: &mut EntityRegistry) -> Vec<MarkerEvent> {
        let ids = core::mem::take(&mut self.spawned_food);
        self.food_by_point.clear();
        ids.into_iter()
            .filter_map(|id| self.remove(registry, id))
            .collect()
    }

    fn despawn_enemies(&mut self, registry: &mut EntityRegistry) -> Vec<MarkerEvent> {
        let ids = core::mem::take(&mut self.spawned_enemies);
        ids.into_iter()
            .filter_map(|id| self.remove(registry, id))
            .collect()
    }

    fn spawn_enemy_wave<R: Rng + ?Sized>(
        &mut self,
        registry: &mut EntityRegistry,
        spatial: &dyn SpatialQuery,
        rng: &mut R,
    ) -> Result<Vec<MarkerEvent>, WorldError> {
        let mut events = Vec::new();
        for point_id in self.active_enemy_points.clone() {
            let Some(center) = self.point_position(point_id) else {
                continue;
            };
            for _ in 0..self.settings.max_enemies {
                let at = scatter(center, self.settings.enemy_spawn_radius, spatial, rng);
                events.push(self.spawn(registry, EntityCategory::Enemy, at)?);
            }
        }
        Ok(events)
    }
}

/// Pick `count` distinct points at random (fewer if there are not enough).
fn choose_active<R: Rng + ?Sized>(
    points: &[Entity],
    count: usize,
    category: EntityCategory,
    rng: &mut R,
) -> Result<Vec<EntityId>, WorldError> {
    if points.is_empty() {
        return if count == 0 {
            Ok(Vec::new())
        } else {
            Err(WorldError::NoSpawnPoints(category))
        };
    }
    let mut pool: Vec<EntityId> = points.iter().map(|p| p.id).collect();
    let mut chosen = Vec::with_capacity(count.min(pool.len()));
    while chosen.len() < count && !pool.is_empty() {
        let idx = rng.random_range(0..pool.len());
        chosen.push(pool.swap_remove(idx));
    }
    Ok(chosen)
}

/// A random navigable point within `radius` of `center`.
fn scatter<R: Rng + ?Sized>(
    center: Position,
    radius: f64,
    spatial: &dyn SpatialQuery,
    rng: &mut R,
) -> Position {
    if radius <= 0.0 {
        return center;
    }
    let angle = rng.random_range(0.0..core::f64::consts::TAU);
    let distance = rng.random_range(0.0..radius);
    let raw = center + Position::from_heading(angle).scale(distance);
    spatial.sample_navigable_point(raw, radius).unwrap_or(center)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use habitat_types::MarkerEventKind;

    use super::*;
    use crate::spatial::OpenField;

    fn small_settings() -> SpawnSettings {
        SpawnSettings {
            food_spawn_points: vec![Position::new(10.0, 0.0), Position::new(-10.0, 0.0), Position::new(0.0, 10.0)],
            enemy_spawn_points: vec![Position::new(30.0, 30.0), Position::new(-30.0, -30.0)],
            blocks: vec![Position::new(1.0, 1.0)],
            max_food: 3,
            max_enemies: 2,
            food_spawn_radius: 2.0,
            enemy_spawn_radius: 2.0,
            daily_active_food_spawn_count: 2,
            daily_active_enemy_spawn_count: 1,
        }
    }

    fn setup() -> (SpawnAuthority, EntityRegistry, OpenField, SmallRng) {
        let mut authority = SpawnAuthority::new(small_settings());
        let mut registry = EntityRegistry::new();
        authority.populate(&mut registry).unwrap();
        (authority, registry, OpenField::new(60.0), SmallRng::seed_from_u64(42))
    }

    #[test]
    fn populate_places_points_and_blocks() {
        let (authority, registry, _, _) = setup();
        assert_eq!(authority.food_spawn_points().len(), 3);
        assert_eq!(authority.enemy_spawn_points().len(), 2);
        assert_eq!(registry.count(EntityCategory::Block), 1);
    }

    #[test]
    fn day_spawns_food_at_active_points_only() {
        let (mut authority, mut registry, field, mut rng) = setup();
        let events = authority.begin_day(&mut registry, &field, &mut rng).unwrap();

        assert_eq!(authority.active_food_points().len(), 2);
        assert_eq!(registry.count(EntityCategory::Food), 6);
        assert_eq!(registry.count(EntityCategory::Enemy), 2);
        let spawned_food = events
            .iter()
            .filter(|e| e.category == EntityCategory::Food && e.kind == MarkerEventKind::Spawned)
            .count();
        assert_eq!(spawned_food, 6);

        for point in authority.active_food_points() {
            assert_eq!(authority.food_at(*point).len(), 3);
        }
    }

    #[test]
    fn night_removes_food_and_activates_all_enemy_points() {
        let (mut authority, mut registry, field, mut rng) = setup();
        authority.begin_day(&mut registry, &field, &mut rng).unwrap();
        let events = authority.begin_night(&mut registry, &field, &mut rng).unwrap();

        assert_eq!(registry.count(EntityCategory::Food), 0);
        assert!(authority.active_food_points().is_empty());
        assert_eq!(registry.count(EntityCategory::Enemy), 4);
        let removed_food = events
            .iter()
            .filter(|e| e.category == EntityCategory::Food && e.kind == MarkerEventKind::Removed)
            .count();
        assert_eq!(removed_food, 6);
    }

    #[test]
    fn remove_is_reported_once() {
        let (mut authority, mut registry, field, mut rng) = setup();
        authority.begin_day(&mut registry, &field, &mut rng).unwrap();
        let point = *authority.active_food_points().first().unwrap();
        let food = *authority.food_at(point).first().unwrap();

        let event = authority.remove(&mut registry, food).unwrap();
        assert_eq!(event.kind, MarkerEventKind::Removed);
        assert!(authority.remove(&mut registry, food).is_none());
        assert_eq!(authority.food_at(point).len(), 2);
        assert_eq!(authority.food_events_for_point(&registry, point).len(), 2);
    }

    #[test]
    fn spawned_food_stays_near_its_point() {
        let (mut authority, mut registry, field, mut rng) = setup();
        authority.begin_day(&mut registry, &field, &mut rng).unwrap();
        for point in authority.food_spawn_points() {
            for food in authority.food_at(point.id) {
                let pos = registry.get(*food).unwrap().position;
                assert!(pos.distance(point.position) <= 2.0 + 1e-9);
            }
        }
    }

    #[test]
    fn no_points_is_reported() {
        let mut rng = SmallRng::seed_from_u64(1);
        let result = choose_active(&[], 2, EntityCategory::FoodSpawn, &mut rng);
        assert!(matches!(result, Err(WorldError::NoSpawnPoints(EntityCategory::FoodSpawn))));
    }
}

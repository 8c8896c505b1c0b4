//! Snapshot payloads handed to a remote reasoning service.
//!
//! A snapshot is everything the service learns about an agent: its own
//! vitals, what it has discovered, and a normalised map encoding of the
//! markers it knows. Anything not in the snapshot is invisible to the
//! service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BehaviorKind, EntityCategory};
use crate::geometry::Position;
use crate::ids::{AgentId, EntityId};

// ---------------------------------------------------------------------------
// Agent state
// ---------------------------------------------------------------------------

/// The agent's own state as presented to the reasoning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentSnapshot {
    /// The agent's identifier.
    pub agent_id: AgentId,
    /// Currently active behavior variant.
    pub current_behavior: BehaviorKind,
    /// Current position.
    pub position: Position,
    /// Food eaten today.
    pub hunger: u32,
    /// Maximum food the agent can carry.
    pub max_food: u32,
    /// Food currently carried.
    pub current_food: u32,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Current exhaustion.
    pub exhaustion: u32,
    /// Fitness score at capture time.
    pub fitness: i64,
    /// Whether a hostile is currently within detection range.
    pub enemy_detected: bool,
}

// ---------------------------------------------------------------------------
// Map encoding
// ---------------------------------------------------------------------------

/// One marker on a map, with both world and normalised map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MapObject {
    /// The entity the marker represents.
    pub entity: EntityId,
    /// Its category.
    pub category: EntityCategory,
    /// World position.
    pub position: Position,
    /// Normalised map coordinate in `[0, 1]`.
    pub u: f64,
    /// Normalised map coordinate in `[0, 1]`.
    pub v: f64,
}

/// A full map view: the markers one consumer currently knows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MapEncoding {
    /// Half of the world's side length; `u`/`v` are relative to this.
    pub half_extent: f64,
    /// Markers, ordered by category then entity.
    pub objects: Vec<MapObject>,
}

// ---------------------------------------------------------------------------
// Reasoning snapshot
// ---------------------------------------------------------------------------

/// The complete payload sent to the reasoning service for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ReasoningSnapshot {
    /// Simulation tick the snapshot was taken on.
    pub tick: u64,
    /// Wall-clock capture time.
    pub captured_at: DateTime<Utc>,
    /// Whether it is currently day.
    pub is_day: bool,
    /// The agent's own state.
    pub agent: AgentSnapshot,
    /// Habitat location.
    pub habitat_position: Position,
    /// Food stored in the habitat.
    pub habitat_stored_food: u32,
    /// Whether a guard is registered at the habitat.
    pub habitat_guarded: bool,
    /// Food spawn points that are active today and that the agent knows.
    pub active_food_locations: Vec<Position>,
    /// Every food item the agent knows about.
    pub food_locations: Vec<Position>,
    /// The agent's map view.
    pub map: MapEncoding,
}

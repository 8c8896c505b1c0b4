//! Enumeration types for the Habitat simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Entity categories
// ---------------------------------------------------------------------------

/// The category tag carried by every world entity and marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EntityCategory {
    /// A colonist or guard agent's body.
    Agent,
    /// A hostile creature (also the pest a guard chases).
    Enemy,
    /// A food item that can be gathered and consumed.
    Food,
    /// A location where food appears during the day.
    FoodSpawn,
    /// A location where enemies appear.
    EnemySpawn,
    /// A construction block that can be carried to the habitat.
    Block,
}

impl EntityCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Agent,
        Self::Enemy,
        Self::Food,
        Self::FoodSpawn,
        Self::EnemySpawn,
        Self::Block,
    ];

    /// Whether entities of this category threaten agents.
    pub const fn is_hostile(self) -> bool {
        matches!(self, Self::Enemy)
    }

    /// Whether this category marks a spawn point rather than a spawned thing.
    pub const fn is_spawn_point(self) -> bool {
        matches!(self, Self::FoodSpawn | Self::EnemySpawn)
    }
}

// ---------------------------------------------------------------------------
// Marker events
// ---------------------------------------------------------------------------

/// Which lifecycle transition a marker event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum MarkerEventKind {
    /// The entity appeared in the simulation.
    Spawned,
    /// The entity left the simulation (consumed, despawned, or died).
    Removed,
}

// ---------------------------------------------------------------------------
// Behavior variants
// ---------------------------------------------------------------------------

/// Tag of one of the mutually exclusive agent behavior variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum BehaviorKind {
    /// Wander and collect food.
    Gather,
    /// Run away from nearby hostiles.
    Flee,
    /// Patrol the habitat and chase pests.
    Guard,
    /// Carry wall pieces from the habitat to build sites.
    BuildWall,
    /// Ferry blocks to the habitat.
    MoveBlock,
    /// Stand still and recover from exhaustion.
    Rest,
}

impl BehaviorKind {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Gather,
        Self::Flee,
        Self::Guard,
        Self::BuildWall,
        Self::MoveBlock,
        Self::Rest,
    ];

    /// Canonical snake-case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gather => "gather",
            Self::Flee => "flee",
            Self::Guard => "guard",
            Self::BuildWall => "build_wall",
            Self::MoveBlock => "move_block",
            Self::Rest => "rest",
        }
    }

    /// Parse a behavior tag as sent by a remote reasoning service.
    ///
    /// Matching ignores case, underscores, dashes and spaces, and accepts
    /// the `...Behavior` suffix. Unknown tags return `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        let normalized: String = tag
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        let stem = normalized
            .strip_suffix("behavioragent")
            .or_else(|| normalized.strip_suffix("behavior"))
            .unwrap_or(&normalized);
        match stem {
            "gather" | "foodgatherer" | "foodgathereragent" => Some(Self::Gather),
            "flee" => Some(Self::Flee),
            "guard" => Some(Self::Guard),
            "buildwall" => Some(Self::BuildWall),
            "moveblock" | "movewall" => Some(Self::MoveBlock),
            "rest" => Some(Self::Rest),
            _ => None,
        }
    }
}

impl core::fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Day cycle
// ---------------------------------------------------------------------------

/// Half of the day/night cycle the simulation is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum DayPhase {
    /// Food spawns and a subset of enemy spawn points are active.
    Day,
    /// Food is despawned and every enemy spawn point is active.
    Night,
}

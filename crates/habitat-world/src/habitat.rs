//! The shared habitat: food and block storage, wall slots, and the list of
//! agents currently waiting inside its trigger radius.
//!
//! Distribution policy (who gets fed, in which order) lives in the
//! simulation core; this module only keeps the books.

use std::collections::BTreeSet;

use habitat_types::{AgentId, Position};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::WorldError;

/// One place a wall can be raised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WallSlot {
    /// Where the wall stands.
    pub position: Position,
    /// Whether it has been built.
    pub built: bool,
}

/// Outcome of a successful wall build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallBuilt {
    /// Slot index.
    pub index: usize,
    /// Slot position.
    pub position: Position,
    /// Blocks taken from storage (may be fewer than asked for).
    pub blocks_used: u32,
}

/// The habitat's mutable state.
#[derive(Debug, Clone)]
pub struct Habitat {
    position: Position,
    trigger_radius: f64,
    stored_food: u32,
    stored_blocks: u32,
    walls: Vec<WallSlot>,
    next_wall: usize,
    waiting: Vec<AgentId>,
    guards: BTreeSet<AgentId>,
}

impl Habitat {
    /// A habitat at `position` with the given wall layout and starting stock.
    pub fn new(position: Position, trigger_radius: f64, wall_slots: &[Position], initial_food: u32) -> Self {
        Self {
            position,
            trigger_radius,
            stored_food: initial_food,
            stored_blocks: 0,
            walls: wall_slots
                .iter()
                .map(|p| WallSlot {
                    position: *p,
                    built: false,
                })
                .collect(),
            next_wall: 0,
            waiting: Vec::new(),
            guards: BTreeSet::new(),
        }
    }

    /// Habitat centre.
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Radius of the registration trigger.
    pub const fn trigger_radius(&self) -> f64 {
        self.trigger_radius
    }

    /// Whether `point` is inside the trigger.
    pub fn contains(&self, point: Position) -> bool {
        self.position.distance(point) <= self.trigger_radius
    }

    // -----------------------------------------------------------------------
    // Waiting list
    // -----------------------------------------------------------------------

    /// Register an agent that entered the trigger. Returns `false` if it
    /// was already waiting.
    pub fn register(&mut self, agent: AgentId, is_guard: bool) -> bool {
        if self.waiting.contains(&agent) {
            return false;
        }
        self.waiting.push(agent);
        if is_guard {
            self.guards.insert(agent);
        }
        debug!(agent_id = %agent, is_guard, waiting = self.waiting.len(), "Agent registered at habitat");
        true
    }

    /// Unregister an agent that left the trigger.
    pub fn unregister(&mut self, agent: AgentId) -> bool {
        let before = self.waiting.len();
        self.waiting.retain(|a| *a != agent);
        self.guards.remove(&agent);
        let removed = before != self.waiting.len();
        if removed {
            debug!(agent_id = %agent, waiting = self.waiting.len(), "Agent unregistered from habitat");
        }
        removed
    }

    /// Whether the agent is waiting.
    pub fn is_waiting(&self, agent: AgentId) -> bool {
        self.waiting.contains(&agent)
    }

    /// Agents currently waiting, in arrival order.
    pub fn waiting(&self) -> &[AgentId] {
        &self.waiting
    }

    /// Empty the waiting list after a distribution round.
    pub fn clear_waiting(&mut self) {
        self.waiting.clear();
        self.guards.clear();
    }

    /// Whether a guard is registered.
    pub fn is_guarded(&self) -> bool {
        !self.guards.is_empty()
    }

    // -----------------------------------------------------------------------
    // Stock
    // -----------------------------------------------------------------------

    /// Food in storage.
    pub const fn stored_food(&self) -> u32 {
        self.stored_food
    }

    /// Add deposited food.
    pub fn deposit_food(&mut self, amount: u32) -> Result<u32, WorldError> {
        self.stored_food = self
            .stored_food
            .checked_add(amount)
            .ok_or_else(|| WorldError::ArithmeticOverflow {
                context: "habitat food deposit".to_owned(),
            })?;
        info!(amount, stored_food = self.stored_food, "Food deposited at habitat");
        Ok(self.stored_food)
    }

    /// Take up to `amount` food out of storage; returns what was taken.
    pub fn take_food(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.stored_food);
        self.stored_food = self.stored_food.saturating_sub(taken);
        taken
    }

    /// Blocks in storage.
    pub const fn stored_blocks(&self) -> u32 {
        self.stored_blocks
    }

    /// Add one delivered block.
    pub fn deposit_block(&mut self) -> Result<u32, WorldError> {
        self.stored_blocks = self
            .stored_blocks
            .checked_add(1)
            .ok_or_else(|| WorldError::ArithmeticOverflow {
                context: "habitat block deposit".to_owned(),
            })?;
        debug!(stored_blocks = self.stored_blocks, "Block delivered to habitat");
        Ok(self.stored_blocks)
    }

    // -----------------------------------------------------------------------
    // Walls
    // -----------------------------------------------------------------------

    /// Where the next wall goes, if any slot is free.
    pub fn next_wall_slot(&self) -> Option<Position> {
        self.walls.get(self.next_wall).map(|w| w.position)
    }

    /// Raise the next wall, consuming up to `blocks_per_wall` stored blocks.
    ///
    /// Returns `None` (and logs) when every slot is already built.
    pub fn build_next_wall(&mut self, blocks_per_wall: u32) -> Option<WallBuilt> {
        let index = self.next_wall;
        let Some(slot) = self.walls.get_mut(index) else {
            warn!(slots = self.walls.len(), "All habitat walls already built");
            return None;
        };
        slot.built = true;
        let position = slot.position;
        let blocks_used = blocks_per_wall.min(self.stored_blocks);
        self.stored_blocks = self.stored_blocks.saturating_sub(blocks_used);
        self.next_wall = index.saturating_add(1);
        info!(wall = index.saturating_add(1), %position, blocks_used, "Habitat wall built");
        Some(WallBuilt {
            index,
            position,
            blocks_used,
        })
    }

    /// Number of walls standing.
    pub fn walls_built(&self) -> usize {
        self.walls.iter().filter(|w| w.built).count()
    }

    /// All wall slots.
    pub fn wall_slots(&self) -> &[WallSlot] {
        &self.walls
    }
}

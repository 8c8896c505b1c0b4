//! Food reservations: two gatherers never chase the same food item.

use std::collections::BTreeMap;

use habitat_types::{AgentId, EntityId};

/// Which agent has claimed which food item.
///
/// Owned by the simulation context and lent to each agent's update.
#[derive(Debug, Clone, Default)]
pub struct FoodReservations {
    by_food: BTreeMap<EntityId, AgentId>,
}

impl FoodReservations {
    /// No claims.
    pub const fn new() -> Self {
        Self {
            by_food: BTreeMap::new(),
        }
    }

    /// Claim `food` for `agent`. Fails if another agent holds it; re-claiming
    /// one's own reservation succeeds.
    pub fn reserve(&mut self, food: EntityId, agent: AgentId) -> bool {
        match self.by_food.get(&food) {
            Some(holder) => *holder == agent,
            None => {
                self.by_food.insert(food, agent);
                true
            }
        }
    }

    /// Drop the claim on `food` regardless of holder.
    pub fn release(&mut self, food: EntityId) -> Option<AgentId> {
        self.by_food.remove(&food)
    }

    /// Drop every claim held by `agent`.
    pub fn release_all(&mut self, agent: AgentId) -> usize {
        let before = self.by_food.len();
        self.by_food.retain(|_, holder| *holder != agent);
        before.saturating_sub(self.by_food.len())
    }

    /// Whether someone other than `agent` holds `food`.
    pub fn is_reserved_by_other(&self, food: EntityId, agent: AgentId) -> bool {
        self.by_food.get(&food).is_some_and(|holder| *holder != agent)
    }

    /// The holder of `food`, if claimed.
    pub fn holder(&self, food: EntityId) -> Option<AgentId> {
        self.by_food.get(&food).copied()
    }

    /// Number of live claims.
    pub fn len(&self) -> usize {
        self.by_food.len()
    }

    /// Whether there are no claims.
    pub fn is_empty(&self) -> bool {
        self.by_food.is_empty()
    }
}

//! Per-agent resource counters and the fitness score.
//!
//! Fitness is recomputed on every request and never cached: the habitat
//! ranks agents by it at distribution time and the end-of-run report reads
//! it once more.

use tracing::{debug, info};

use crate::config::VitalsConfig;
use crate::error::AgentError;

/// Weight of each food item stored in the habitat.
pub const STORED_FOOD_WEIGHT: i64 = 10;
/// Weight of each food item currently carried.
pub const CARRIED_FOOD_WEIGHT: i64 = 5;
/// Weight of each food item deposited today.
pub const DEPOSITED_FOOD_WEIGHT: i64 = 7;
/// Penalty per point of missing health.
pub const HEALTH_LOSS_WEIGHT: i64 = 10;

/// What a dispensed food portion was used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodUse {
    /// The agent was injured; health went up by this much.
    Healed(u32),
    /// The agent was healthy; hunger went up by this much.
    Ate(u32),
    /// The agent was healthy and full.
    Wasted,
}

/// Food, health and hunger counters for one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FitnessTracker {
    max_food: u32,
    current_food: u32,
    food_collected: u32,
    deposited_today: u32,
    deposited_total: u32,
    max_health: u32,
    health: u32,
    max_hunger: u32,
    hunger: u32,
    required_food: u32,
}

impl FitnessTracker {
    /// A healthy agent carrying nothing, with nothing eaten today.
    pub const fn new(config: &VitalsConfig) -> Self {
        Self {
            max_food: config.max_food,
            current_food: 0,
            food_collected: 0,
            deposited_today: 0,
            deposited_total: 0,
            max_health: config.max_health,
            health: config.max_health,
            max_hunger: config.max_hunger,
            hunger: 0,
            required_food: config.required_food,
        }
    }

    /// `10 x stored + 5 x carried + 7 x deposited - 10 x (max_health - health)`.
    pub fn fitness_score(&self, habitat_stored_food: u32) -> i64 {
        let health_loss = i64::from(self.max_health.saturating_sub(self.health));
        STORED_FOOD_WEIGHT
            .saturating_mul(i64::from(habitat_stored_food))
            .saturating_add(CARRIED_FOOD_WEIGHT.saturating_mul(i64::from(self.current_food)))
            .saturating_add(DEPOSITED_FOOD_WEIGHT.saturating_mul(i64::from(self.deposited_today)))
            .saturating_sub(HEALTH_LOSS_WEIGHT.saturating_mul(health_loss))
    }

    // -----------------------------------------------------------------------
    // Carried food
    // -----------------------------------------------------------------------

    /// Whether another food item fits.
    pub const fn can_carry_more(&self) -> bool {
        self.current_food < self.max_food
    }

    /// Pick up one food item. Returns `false` when already full.
    pub fn pick_up_food(&mut self) -> Result<bool, AgentError> {
        if !self.can_carry_more() {
            return Ok(false);
        }
        self.current_food = self.current_food.saturating_add(1);
        self.food_collected = self
            .food_collected
            .checked_add(1)
            .ok_or_else(|| AgentError::ArithmeticOverflow {
                context: "food collected".to_owned(),
            })?;
        Ok(true)
    }

    /// Hand over everything carried; returns the amount.
    pub fn deposit_all(&mut self) -> Result<u32, AgentError> {
        let amount = self.current_food;
        let overflow = || AgentError::ArithmeticOverflow {
            context: "food deposited".to_owned(),
        };
        self.deposited_today = self.deposited_today.checked_add(amount).ok_or_else(overflow)?;
        self.deposited_total = self.deposited_total.checked_add(amount).ok_or_else(overflow)?;
        self.current_food = 0;
        Ok(amount)
    }

    // -----------------------------------------------------------------------
    // Health and hunger
    // -----------------------------------------------------------------------

    /// Use a dispensed portion: heal if injured, otherwise eat.
    pub fn receive_food(&mut self, amount: u32) -> FoodUse {
        if self.health < self.max_health {
            let before = self.health;
            self.health = self.health.saturating_add(amount).min(self.max_health);
            FoodUse::Healed(self.health.saturating_sub(before))
        } else if self.hunger < self.max_hunger {
            let before = self.hunger;
            self.hunger = self.hunger.saturating_add(amount).min(self.max_hunger);
            FoodUse::Ate(self.hunger.saturating_sub(before))
        } else {
            FoodUse::Wasted
        }
    }

    /// Lose `amount` health, floored at zero. Returns the remaining health.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        self.health = self.health.saturating_sub(amount);
        self.health
    }

    /// Whether health has reached zero.
    pub const fn is_dead(&self) -> bool {
        self.health == 0
    }

    /// End-of-day settlement.
    ///
    /// Missing portions (`required - hunger`) each cost 10% of max health,
    /// rounded to the nearest point. The daily deposited tally and daily
    /// hunger then reset. Returns the damage applied.
    pub fn apply_daily_hunger_penalty(&mut self) -> u32 {
        let mut damage = 0;
        if self.hunger < self.required_food {
            let missing = self.required_food.saturating_sub(self.hunger);
            // missing * 10% * max_health, rounded half up
            damage = missing
                .saturating_mul(self.max_health)
                .saturating_add(5)
                / 10;
            self.take_damage(damage);
            info!(missing, damage, health = self.health, "Daily hunger penalty applied");
        } else {
            debug!(hunger = self.hunger, "Daily food requirement met");
        }
        self.deposited_today = 0;
        self.hunger = 0;
        damage
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Food currently carried.
    pub const fn current_food(&self) -> u32 {
        self.current_food
    }

    /// Carry capacity.
    pub const fn max_food(&self) -> u32 {
        self.max_food
    }

    /// Food picked up over the agent's lifetime.
    pub const fn food_collected(&self) -> u32 {
        self.food_collected
    }

    /// Food deposited since the last daily settlement.
    pub const fn deposited_today(&self) -> u32 {
        self.deposited_today
    }

    /// Food deposited over the agent's lifetime.
    pub const fn deposited_total(&self) -> u32 {
        self.deposited_total
    }

    /// Current health.
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Maximum health.
    pub const fn max_health(&self) -> u32 {
        self.max_health
    }

    /// Food eaten today.
    pub const fn hunger(&self) -> u32 {
        self.hunger
    }

    /// Food still needed today to avoid the penalty.
    pub const fn remaining_hunger(&self) -> u32 {
        self.required_food.saturating_sub(self.hunger)
    }

    /// Override the raw counters; used to set up specific states.
    pub fn set_state(&mut self, current_food: u32, deposited_today: u32, health: u32) {
        self.current_food = current_food.min(self.max_food);
        self.deposited_today = deposited_today;
        self.health = health.min(self.max_health);
    }
}

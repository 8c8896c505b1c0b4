//! Run counters and the end-of-run fitness report.

use habitat_types::{AgentId, BehaviorKind};
use serde::Serialize;
use tracing::info;

use crate::tick::SimulationState;

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimulationMetrics {
    /// Food items picked up by gatherers.
    pub food_collected: u64,
    /// Food items handed to the habitat.
    pub food_deposited: u64,
    /// Food handed out by distribution rounds.
    pub food_dispensed: u64,
    /// Blocks carried into the habitat.
    pub blocks_delivered: u64,
    /// Walls raised.
    pub walls_built: u64,
    /// Pests caught by guards.
    pub pests_killed: u64,
    /// Agents that died.
    pub deaths: u64,
    /// Sunrises seen.
    pub days: u64,
}

fn bump(counter: &mut u64, by: u64) {
    *counter = counter.saturating_add(by);
}

impl SimulationMetrics {
    /// Count one picked-up food item.
    pub fn record_food_collected(&mut self) {
        bump(&mut self.food_collected, 1);
    }

    /// Count a deposit of `amount` items.
    pub fn record_food_deposited(&mut self, amount: u32) {
        bump(&mut self.food_deposited, u64::from(amount));
    }

    /// Count food handed out.
    pub fn record_food_dispensed(&mut self, amount: u32) {
        bump(&mut self.food_dispensed, u64::from(amount));
    }

    /// Count a delivered block.
    pub fn record_block_delivered(&mut self) {
        bump(&mut self.blocks_delivered, 1);
    }

    /// Count a built wall.
    pub fn record_wall_built(&mut self) {
        bump(&mut self.walls_built, 1);
    }

    /// Count a caught pest.
    pub fn record_pest_killed(&mut self) {
        bump(&mut self.pests_killed, 1);
    }

    /// Count a death.
    pub fn record_death(&mut self) {
        bump(&mut self.deaths, 1);
    }

    /// Count a sunrise.
    pub fn record_day(&mut self) {
        bump(&mut self.days, 1);
    }
}

/// One agent's line in the end-of-run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentFitness {
    /// The agent.
    pub agent_id: AgentId,
    /// Behavior active at the end.
    pub behavior: BehaviorKind,
    /// Whether it survived.
    pub alive: bool,
    /// Fitness score at the end.
    pub fitness: i64,
    /// Health at the end.
    pub health: u32,
    /// Food deposited over the whole run.
    pub deposited_total: u32,
}

/// End-of-run summary: counters plus every agent's fitness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndSimReport {
    /// Run counters.
    pub metrics: SimulationMetrics,
    /// Food left in the habitat.
    pub habitat_stored_food: u32,
    /// Agents ranked by fitness descending, then ID ascending.
    pub agents: Vec<AgentFitness>,
}

impl EndSimReport {
    /// Collect the report from the final simulation state.
    pub fn collect(state: &SimulationState) -> Self {
        let stored = state.habitat.stored_food();
        let mut agents: Vec<AgentFitness> = state
            .agents
            .iter()
            .map(|a| AgentFitness {
                agent_id: a.id(),
                behavior: a.behavior(),
                alive: a.is_alive(),
                fitness: a.fitness().fitness_score(stored),
                health: a.fitness().health(),
                deposited_total: a.fitness().deposited_total(),
            })
            .collect();
        agents.sort_by(|a, b| b.fitness.cmp(&a.fitness).then(a.agent_id.cmp(&b.agent_id)));
        Self {
            metrics: state.metrics,
            habitat_stored_food: stored,
            agents,
        }
    }

    /// Write the report to the log.
    pub fn log(&self) {
        let m = &self.metrics;
        info!(
            days = m.days,
            food_collected = m.food_collected,
            food_deposited = m.food_deposited,
            food_dispensed = m.food_dispensed,
            blocks_delivered = m.blocks_delivered,
            walls_built = m.walls_built,
            pests_killed = m.pests_killed,
            deaths = m.deaths,
            habitat_stored_food = self.habitat_stored_food,
            "Simulation report"
        );
        for (rank, agent) in self.agents.iter().enumerate() {
            info!(
                rank = rank.saturating_add(1),
                agent_id = %agent.agent_id,
                behavior = %agent.behavior,
                alive = agent.alive,
                fitness = agent.fitness,
                health = agent.health,
                deposited_total = agent.deposited_total,
                "Agent fitness"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_saturate() {
        let mut metrics = SimulationMetrics {
            food_deposited: u64::MAX,
            ..SimulationMetrics::default()
        };
        metrics.record_food_deposited(3);
        metrics.record_death();
        assert_eq!(metrics.food_deposited, u64::MAX);
        assert_eq!(metrics.deaths, 1);
    }
}

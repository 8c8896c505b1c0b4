//! Agent spawner for seeding the simulation with its starting population.
//!
//! Gatherers, haulers and guards are scattered at random around the
//! habitat within `population.spawn_radius`, using the run's seeded RNG so
//! the same seed always produces the same layout.

use std::f64::consts::TAU;

use habitat_core::tick::{SimulationState, TickError};
use habitat_types::{AgentId, BehaviorKind, Position};
use rand::Rng;
use tracing::{debug, info};

/// IDs of the agents created at start, grouped by starting role.
#[derive(Debug, Default)]
pub struct SpawnResult {
    /// Agents starting in Gather.
    pub gatherers: Vec<AgentId>,
    /// Agents starting in `MoveBlock`.
    pub haulers: Vec<AgentId>,
    /// Agents starting in Guard.
    pub guards: Vec<AgentId>,
}

impl SpawnResult {
    /// Total number of spawned agents.
    pub fn len(&self) -> usize {
        self.gatherers
            .len()
            .saturating_add(self.haulers.len())
            .saturating_add(self.guards.len())
    }

    /// Whether nobody was spawned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawn the configured population around the habitat.
pub fn spawn_population(state: &mut SimulationState) -> Result<SpawnResult, TickError> {
    let population = state.config.population.clone();
    let centre = state.config.habitat.position;
    let mut result = SpawnResult::default();

    for (count, kind, ids) in [
        (population.gatherers, BehaviorKind::Gather, &mut result.gatherers),
        (population.haulers, BehaviorKind::MoveBlock, &mut result.haulers),
        (population.guards, BehaviorKind::Guard, &mut result.guards),
    ] {
        for _ in 0..count {
            let position = scatter(state, centre, population.spawn_radius);
            let id = state.spawn_agent(position, kind)?;
            debug!(agent_id = %id, behavior = %kind, x = position.x, y = position.y, "Agent spawned");
            ids.push(id);
        }
    }

    info!(
        gatherers = result.gatherers.len(),
        haulers = result.haulers.len(),
        guards = result.guards.len(),
        "Population spawned"
    );
    Ok(result)
}

/// A random point within `radius` of `centre`.
fn scatter(state: &mut SimulationState, centre: Position, radius: f64) -> Position {
    if radius <= 0.0 {
        return centre;
    }
    let angle = state.rng.random_range(0.0..TAU);
    let distance = state.rng.random_range(0.0..=radius);
    Position::new(
        centre.x + angle.cos() * distance,
        centre.y + angle.sin() * distance,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_core::config::SimulationConfig;

    use super::*;

    fn config(gatherers: u32, haulers: u32, guards: u32) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.population.gatherers = gatherers;
        config.population.haulers = haulers;
        config.population.guards = guards;
        config
    }

    #[test]
    fn spawns_each_role() {
        let mut state = SimulationState::new(config(3, 2, 1)).unwrap();
        let result = spawn_population(&mut state).unwrap();
        assert_eq!(result.gatherers.len(), 3);
        assert_eq!(result.haulers.len(), 2);
        assert_eq!(result.guards.len(), 1);
        assert_eq!(state.living_agents(), 6);
        for id in &result.guards {
            assert_eq!(state.agents.get(*id).unwrap().behavior(), BehaviorKind::Guard);
        }
    }

    #[test]
    fn agents_start_near_habitat() {
        let mut state = SimulationState::new(config(8, 0, 0)).unwrap();
        let radius = state.config.population.spawn_radius;
        let centre = state.config.habitat.position;
        spawn_population(&mut state).unwrap();
        for agent in state.agents.iter() {
            assert!(agent.position().distance(centre) <= radius + 1e-9);
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let positions = |seed: u64| {
            let mut config = config(4, 1, 1);
            config.world.seed = seed;
            let mut state = SimulationState::new(config).unwrap();
            spawn_population(&mut state).unwrap();
            state.agents.iter().map(|a| a.position()).collect::<Vec<_>>()
        };
        assert_eq!(positions(7), positions(7));
    }

    #[test]
    fn empty_population() {
        let mut state = SimulationState::new(config(0, 0, 0)).unwrap();
        let result = spawn_population(&mut state).unwrap();
        assert!(result.is_empty());
    }
}

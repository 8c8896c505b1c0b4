//! Remote reasoning seam and snapshot assembly.
//!
//! When an agent raises its update flag, the tick cycle builds a
//! [`ReasoningSnapshot`] for it and hands the batch to a
//! [`ReasoningSource`]. The source answers with zero or more
//! [`Directive`]s, which are applied before the next tick. What sits
//! behind the trait (a message bus, a scripted test double, nothing) is
//! the host's choice.

use chrono::Utc;
use habitat_agents::Agent;
use habitat_types::{Directive, EntityCategory, ReasoningSnapshot};
use habitat_world::{Habitat, SpawnAuthority};

use crate::map::agent_map;

/// Errors that can occur while asking for directives.
#[derive(Debug, thiserror::Error)]
pub enum ReasoningError {
    /// No answer arrived before the deadline.
    #[error("reasoning timed out after {timeout_ms}ms")]
    Timeout {
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },

    /// The transport to the reasoning service failed.
    #[error("reasoning transport error: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
    },

    /// A snapshot could not be encoded.
    #[error("snapshot encoding error: {source}")]
    Encode {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// A source of agent directives.
pub trait ReasoningSource {
    /// Ask for directives for the agents whose snapshots are given.
    ///
    /// An empty result is valid. Directives for agents not in `snapshots`
    /// are still applied if the agent exists.
    fn request_directives(
        &mut self,
        tick: u64,
        snapshots: &[ReasoningSnapshot],
    ) -> Result<Vec<Directive>, ReasoningError>;
}

/// A reasoning source that never answers. Agents run on their own
/// behavior logic alone.
#[derive(Debug, Clone, Default)]
pub struct StubReasoning;

impl StubReasoning {
    /// Create a new stub source.
    pub const fn new() -> Self {
        Self
    }
}

impl ReasoningSource for StubReasoning {
    fn request_directives(
        &mut self,
        _tick: u64,
        _snapshots: &[ReasoningSnapshot],
    ) -> Result<Vec<Directive>, ReasoningError> {
        Ok(Vec::new())
    }
}

/// Build the snapshot for one agent.
///
/// Only what the agent has discovered goes in: food spawn points are
/// listed when known and active today, food items when known.
pub fn build_snapshot(
    agent: &Agent,
    tick: u64,
    is_day: bool,
    habitat: &Habitat,
    spawns: &SpawnAuthority,
    half_extent: f64,
) -> ReasoningSnapshot {
    let knowledge = agent.knowledge();
    let active_food_locations = knowledge
        .known_of(EntityCategory::FoodSpawn)
        .filter(|m| spawns.is_active_food_point(m.entity))
        .map(|m| m.position)
        .collect();
    let food_locations = knowledge
        .known_of(EntityCategory::Food)
        .map(|m| m.position)
        .collect();

    ReasoningSnapshot {
        tick,
        captured_at: Utc::now(),
        is_day,
        agent: agent.snapshot(habitat.stored_food()),
        habitat_position: habitat.position(),
        habitat_stored_food: habitat.stored_food(),
        habitat_guarded: habitat.is_guarded(),
        active_food_locations,
        food_locations,
        map: agent_map(half_extent, knowledge.all_known()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_agents::AgentConfig;
    use habitat_events::MarkerSubscriber;
    use habitat_types::{AgentId, BehaviorKind, Entity, EntityId, MarkerEvent, Position};
    use habitat_world::{NavSettings, SpawnSettings};

    use super::*;

    #[test]
    fn stub_returns_nothing() {
        let mut source = StubReasoning::new();
        assert!(source.request_directives(7, &[]).unwrap().is_empty());
    }

    #[test]
    fn snapshot_contains_only_known_markers() {
        let mut agent = Agent::new(
            AgentId::FIRST,
            EntityId::new(),
            Position::ORIGIN,
            BehaviorKind::Gather,
            &AgentConfig::default(),
            NavSettings::default(),
        );
        let near = Entity::new(EntityCategory::Food, Position::new(1.0, 1.0));
        let far = Entity::new(EntityCategory::Food, Position::new(90.0, 90.0));
        agent.on_marker(&MarkerEvent::spawned(&near));
        agent.on_marker(&MarkerEvent::spawned(&far));

        let habitat = Habitat::new(Position::new(2.0, 0.0), 5.0, &[], 12);
        let spawns = SpawnAuthority::new(SpawnSettings::default());
        let snapshot = build_snapshot(&agent, 3, true, &habitat, &spawns, 100.0);

        assert_eq!(snapshot.tick, 3);
        assert!(snapshot.is_day);
        assert_eq!(snapshot.habitat_stored_food, 12);
        assert_eq!(snapshot.food_locations, vec![near.position]);
        assert!(snapshot.active_food_locations.is_empty());
        assert_eq!(snapshot.map.objects.len(), 1);
        assert_eq!(snapshot.agent.agent_id, AgentId::FIRST);
        assert_eq!(snapshot.agent.fitness, 120);
    }
}

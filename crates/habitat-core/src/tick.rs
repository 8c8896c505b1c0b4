//! Tick cycle: one fixed step of the Habitat simulation.
//!
//! Each tick runs these stages in order:
//!
//! 1. **Clock** -- advance simulated time. On a phase boundary the spawn
//!    authority rotates food and enemy spawn points; at nightfall every
//!    agent also settles its daily hunger.
//!
//! 2. **Agents** -- update each agent in ascending ID order. After each
//!    agent its effects are applied to the world and its marker events are
//!    published, so later agents see the result. An agent that fails is
//!    logged and skipped; the tick carries on with the next one.
//!
//! 3. **Distribution** -- the habitat hands out stored food when a round
//!    is due.
//!
//! 4. **Reasoning** -- agents that raised their update flag are sent to
//!    the [`ReasoningSource`] and the returned directives are applied.
//!
//! Given the same configuration, seed and reasoning answers, a run is
//! deterministic.

use habitat_agents::{Agent, AgentConfig, AgentEnv, AgentError, AgentManager, AgentUpdate, Effect, FoodReservations, SimTime, WorldView};
use habitat_events::{MarkerBus, MarkerSubscriber, SubscriberResolver};
use habitat_types::{
    AgentId, BehaviorKind, DayPhase, Directive, DirectiveCommand, EntityCategory, EntityId, MarkerEvent, Position,
    SubscriberId,
};
use habitat_world::{EntityRegistry, Habitat, OpenField, SpawnAuthority, WorldError};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, info, warn};

use crate::clock::{ClockError, PhaseChange, SimClock};
use crate::config::SimulationConfig;
use crate::distribution::{DispenseReport, FoodDistributor};
use crate::map::GlobalMap;
use crate::metrics::SimulationMetrics;
use crate::reasoning::{ReasoningSource, build_snapshot};

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A world operation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// An agent operation failed outside a per-agent update.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },

    /// The configuration cannot produce a valid world.
    #[error("invalid simulation configuration: {reason}")]
    Config {
        /// What is wrong.
        reason: String,
    },
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Simulated time at the end of the tick.
    pub now: SimTime,
    /// Day phase during the tick.
    pub phase: DayPhase,
    /// Day number.
    pub day: u64,
    /// Phase boundary crossed at the start of the tick.
    pub phase_change: Option<PhaseChange>,
    /// Living agents at the end of the tick.
    pub agents_alive: usize,
    /// Agents that died this tick.
    pub deaths: Vec<AgentId>,
    /// Agent updates that failed and were skipped.
    pub agent_errors: u32,
    /// Distribution round, if one ran.
    pub dispensed: Option<DispenseReport>,
    /// Snapshots sent to the reasoning source.
    pub snapshots_sent: usize,
    /// Directives applied successfully.
    pub directives_applied: u32,
}

/// Lends bus subscribers out of the simulation state by identity.
struct Subscribers<'a> {
    agents: &'a mut AgentManager,
    map: &'a mut GlobalMap,
}

impl SubscriberResolver for Subscribers<'_> {
    fn resolve(&mut self, id: SubscriberId) -> Option<&mut dyn MarkerSubscriber> {
        match id {
            SubscriberId::Agent(agent) => self
                .agents
                .get_mut(agent)
                .map(|a| a as &mut dyn MarkerSubscriber),
            SubscriberId::Map(map) if map == self.map.id() => Some(&mut *self.map),
            SubscriberId::Map(_) => None,
        }
    }
}

/// The mutable simulation state passed through the tick cycle.
#[derive(Debug)]
pub struct SimulationState {
    /// Configuration the run was built from.
    pub config: SimulationConfig,
    /// Agent tuning derived from `config`.
    pub agent_config: AgentConfig,
    /// Simulation clock.
    pub clock: SimClock,
    /// Every live entity.
    pub registry: EntityRegistry,
    /// Spatial provider.
    pub field: OpenField,
    /// The shared habitat.
    pub habitat: Habitat,
    /// Spawn points and spawned things.
    pub spawns: SpawnAuthority,
    /// All agents.
    pub agents: AgentManager,
    /// Marker event bus.
    pub bus: MarkerBus,
    /// User-facing map.
    pub map: GlobalMap,
    /// Food claims shared between gatherers.
    pub reservations: FoodReservations,
    /// Habitat food dispenser.
    pub distributor: FoodDistributor,
    /// Run counters.
    pub metrics: SimulationMetrics,
    /// Seeded randomness for the whole run.
    pub rng: SmallRng,
}

impl SimulationState {
    /// Build the world from configuration: spawn points, initial blocks and
    /// the habitat. No agents are created.
    pub fn new(config: SimulationConfig) -> Result<Self, TickError> {
        let half_extent = config.world.half_extent;
        if !half_extent.is_finite() || half_extent <= 0.0 {
            return Err(TickError::Config {
                reason: format!("world.half_extent must be positive, got {half_extent}"),
            });
        }

        let clock = SimClock::new(&config.time, config.world.tick_step_ms)?;
        let mut registry = EntityRegistry::new();
        let mut spawns = SpawnAuthority::new(config.spawning.clone());
        let populated = spawns.populate(&mut registry)?;
        let habitat = Habitat::new(
            config.habitat.position,
            config.habitat.trigger_radius,
            &config.habitat.wall_slots,
            config.habitat.initial_food,
        );

        let mut state = Self {
            agent_config: config.agent_config(),
            clock,
            registry,
            field: OpenField::new(half_extent),
            habitat,
            spawns,
            agents: AgentManager::new(),
            bus: MarkerBus::new(),
            map: GlobalMap::new(half_extent),
            reservations: FoodReservations::new(),
            distributor: FoodDistributor::new(&config.habitat),
            metrics: SimulationMetrics::default(),
            rng: SmallRng::seed_from_u64(config.world.seed),
            config,
        };
        state.bus.subscribe(SubscriberId::Map(state.map.id()));
        state.publish(populated);

        info!(
            world = %state.config.world.name,
            seed = state.config.world.seed,
            entities = state.registry.len(),
            "Simulation state initialized"
        );
        Ok(state)
    }

    /// Create an agent at `position` running `initial` from its first tick.
    ///
    /// The agent's body is announced on the bus before the agent itself
    /// subscribes.
    pub fn spawn_agent(&mut self, position: Position, initial: BehaviorKind) -> Result<AgentId, TickError> {
        let position = self.field.clamp(position);
        let event = self
            .spawns
            .spawn(&mut self.registry, EntityCategory::Agent, position)?;
        let id = match self.agents.spawn_agent(
            event.entity,
            position,
            initial,
            &self.agent_config,
            self.config.population.navigation,
        ) {
            Ok(id) => id,
            Err(e) => {
                self.discard_spawn(event.entity);
                return Err(e.into());
            }
        };
        self.publish([event]);
        self.bus.subscribe(SubscriberId::Agent(id));
        Ok(id)
    }

    /// Roll back a spawn that was never announced. Returns whether the
    /// entity was still registered.
    fn discard_spawn(&mut self, entity: EntityId) -> bool {
        if self.spawns.remove(&mut self.registry, entity).is_none() {
            warn!(entity = %entity, "Discarded spawn was already gone");
            return false;
        }
        true
    }

    /// Number of living agents.
    pub fn living_agents(&self) -> usize {
        self.agents.living_count()
    }

    /// Deliver events to every subscriber.
    pub fn publish(&mut self, events: impl IntoIterator<Item = MarkerEvent>) -> usize {
        let mut subscribers = Subscribers {
            agents: &mut self.agents,
            map: &mut self.map,
        };
        self.bus.publish_all(events, &mut subscribers)
    }

    /// The agent manager alongside an environment for updating agents.
    fn split(&mut self) -> (&mut AgentManager, AgentEnv<'_>) {
        let env = AgentEnv {
            world: WorldView {
                registry: &self.registry,
                spatial: &self.field,
                habitat: &self.habitat,
                spawns: &self.spawns,
            },
            rng: &mut self.rng,
            reservations: &mut self.reservations,
            config: &self.agent_config,
            now: self.clock.now(),
            dt: self.clock.step_secs(),
        };
        (&mut self.agents, env)
    }

    // -----------------------------------------------------------------------
    // Day/night
    // -----------------------------------------------------------------------

    fn on_phase_change(&mut self, change: PhaseChange, summary: &mut TickSummary) -> Result<(), TickError> {
        match change {
            PhaseChange::Sunrise { day } => {
                let events = self
                    .spawns
                    .begin_day(&mut self.registry, &self.field, &mut self.rng)?;
                self.publish(events);
                self.metrics.record_day();
                info!(day, stored_food = self.habitat.stored_food(), "Sunrise");
            }
            PhaseChange::Nightfall { day } => {
                let events = self
                    .spawns
                    .begin_night(&mut self.registry, &self.field, &mut self.rng)?;
                self.publish(events);
                info!(day, "Nightfall");
                self.settle_hunger(summary);
            }
        }
        Ok(())
    }

    fn settle_hunger(&mut self, summary: &mut TickSummary) {
        for id in self.agents.ids() {
            let mut effects = Vec::new();
            {
                let (agents, mut env) = self.split();
                let Some(agent) = agents.get_mut(id) else {
                    continue;
                };
                let damage = agent.apply_daily_hunger_penalty();
                if damage > 0 {
                    info!(agent_id = %id, damage, health = agent.fitness().health(), "Hunger penalty applied");
                }
                agent.settle_death(&mut env, &mut effects);
            }
            self.apply_effects(id, &effects, summary);
        }
    }

    // -----------------------------------------------------------------------
    // Agents
    // -----------------------------------------------------------------------

    fn update_agents(&mut self, summary: &mut TickSummary) {
        for id in self.agents.ids() {
            let mut out = AgentUpdate::default();
            let result = {
                let (agents, mut env) = self.split();
                let Some(agent) = agents.get_mut(id) else {
                    continue;
                };
                agent.update(&mut env, &mut out)
            };
            if let Err(e) = result {
                summary.agent_errors = summary.agent_errors.saturating_add(1);
                warn!(tick = summary.tick, agent_id = %id, error = %e, "Agent update failed");
            }
            self.apply_effects(id, &out.effects, summary);
            self.publish(out.republish);
            self.sync_agent_entity(id);
        }
    }

    fn sync_agent_entity(&mut self, id: AgentId) {
        let Some(agent) = self.agents.get(id).filter(|a| a.is_alive()) else {
            return;
        };
        if let Err(e) = self.registry.set_position(agent.entity(), agent.position()) {
            warn!(agent_id = %id, error = %e, "Agent body out of sync");
        }
    }

    fn apply_effects(&mut self, agent: AgentId, effects: &[Effect], summary: &mut TickSummary) {
        for effect in effects {
            if let Err(e) = self.apply_effect(agent, *effect, summary) {
                warn!(agent_id = %agent, ?effect, error = %e, "Effect could not be applied");
            }
        }
    }

    fn apply_effect(&mut self, agent: AgentId, effect: Effect, summary: &mut TickSummary) -> Result<(), TickError> {
        match effect {
            Effect::ConsumeFood { food } => {
                self.metrics.record_food_collected();
                if let Some(event) = self.spawns.remove(&mut self.registry, food) {
                    self.publish([event]);
                }
            }
            Effect::RemoveBlock { block } => {
                if let Some(event) = self.spawns.remove(&mut self.registry, block) {
                    self.publish([event]);
                }
            }
            Effect::DropBlock { position } => {
                let at = self.field.clamp(position);
                let event = self
                    .spawns
                    .spawn(&mut self.registry, EntityCategory::Block, at)?;
                self.publish([event]);
            }
            Effect::DeliverBlock => {
                let stored = self.habitat.deposit_block()?;
                self.metrics.record_block_delivered();
                debug!(agent_id = %agent, stored_blocks = stored, "Block stored");
            }
            Effect::BuildWall => {
                match self.habitat.build_next_wall(self.config.habitat.blocks_per_wall) {
                    Some(wall) => {
                        self.metrics.record_wall_built();
                        info!(agent_id = %agent, slot = wall.index, position = %wall.position, "Wall built");
                    }
                    None => debug!(agent_id = %agent, "No wall to build"),
                }
            }
            Effect::KillPest { pest } => {
                if let Some(event) = self.spawns.remove(&mut self.registry, pest) {
                    self.metrics.record_pest_killed();
                    self.publish([event]);
                }
            }
            Effect::DepositFood { amount } => {
                self.habitat.deposit_food(amount)?;
                self.metrics.record_food_deposited(amount);
            }
            Effect::EnterHabitat { is_guard } => {
                self.habitat.register(agent, is_guard);
            }
            Effect::LeaveHabitat => {
                self.habitat.unregister(agent);
            }
            Effect::Died => {
                self.bus.unsubscribe(SubscriberId::Agent(agent));
                self.habitat.unregister(agent);
                let body = self.agents.get(agent).map(Agent::entity);
                if let Some(event) = body.and_then(|entity| self.spawns.remove(&mut self.registry, entity)) {
                    self.publish([event]);
                }
                self.metrics.record_death();
                summary.deaths.push(agent);
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reasoning
    // -----------------------------------------------------------------------

    fn consult_reasoning(&mut self, reasoning: &mut dyn ReasoningSource, summary: &mut TickSummary) {
        let tick = summary.tick;
        let is_day = self.clock.is_day();
        let half_extent = self.field.half_extent();

        let mut snapshots = Vec::new();
        for agent in self.agents.iter_mut().filter(|a| a.is_alive()) {
            if let Some(reason) = agent.take_update_request() {
                debug!(tick, agent_id = %agent.id(), ?reason, "Reasoning update requested");
                snapshots.push(build_snapshot(agent, tick, is_day, &self.habitat, &self.spawns, half_extent));
            }
        }
        if snapshots.is_empty() {
            return;
        }
        summary.snapshots_sent = snapshots.len();

        let directives = match reasoning.request_directives(tick, &snapshots) {
            Ok(directives) => directives,
            Err(e) => {
                warn!(tick, snapshots = snapshots.len(), error = %e, "Reasoning request failed");
                return;
            }
        };
        for directive in &directives {
            if self.apply_directive(directive, summary) {
                summary.directives_applied = summary.directives_applied.saturating_add(1);
            }
        }
    }

    /// Apply one directive. Returns whether it took effect.
    pub fn apply_directive(&mut self, directive: &Directive, summary: &mut TickSummary) -> bool {
        let id = directive.agent_id;
        let mut effects = Vec::new();
        let result = {
            let (agents, mut env) = self.split();
            match agents.get_mut(id) {
                None => Err(AgentError::AgentNotFound(id)),
                Some(agent) if !agent.is_alive() => {
                    debug!(agent_id = %id, "Directive for dead agent ignored");
                    return false;
                }
                Some(agent) => match &directive.command {
                    DirectiveCommand::SetMoveTarget { target } => agent.set_move_target(&env, *target).map(|()| true),
                    DirectiveCommand::SwitchBehavior { behavior } => {
                        agent.switch_to_tag(behavior, &mut env, &mut effects)
                    }
                },
            }
        };
        self.apply_effects(id, &effects, summary);
        match result {
            Ok(changed) => {
                debug!(agent_id = %id, command = ?directive.command, changed, "Directive applied");
                true
            }
            Err(e) => {
                warn!(agent_id = %id, command = ?directive.command, error = %e, "Directive rejected");
                false
            }
        }
    }
}

/// Execute one complete tick of the simulation.
pub fn run_tick(state: &mut SimulationState, reasoning: &mut dyn ReasoningSource) -> Result<TickSummary, TickError> {
    let phase_change = state.clock.advance()?;
    let mut summary = TickSummary {
        tick: state.clock.tick(),
        now: state.clock.now(),
        phase: state.clock.phase(),
        day: state.clock.day(),
        phase_change,
        agents_alive: 0,
        deaths: Vec::new(),
        agent_errors: 0,
        dispensed: None,
        snapshots_sent: 0,
        directives_applied: 0,
    };

    if let Some(change) = phase_change {
        state.on_phase_change(change, &mut summary)?;
    }

    state.update_agents(&mut summary);

    if let Some(report) = state
        .distributor
        .poll(state.clock.now(), &mut state.habitat, &mut state.agents)
    {
        let dispensed = report.served.iter().map(|(_, n)| *n).fold(0_u32, u32::saturating_add);
        state.metrics.record_food_dispensed(dispensed);
        summary.dispensed = Some(report);
    }

    state.consult_reasoning(reasoning, &mut summary);

    summary.agents_alive = state.living_agents();
    debug!(
        tick = summary.tick,
        time = %summary.now,
        phase = ?summary.phase,
        agents_alive = summary.agents_alive,
        deaths = summary.deaths.len(),
        "Tick completed"
    );
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::reasoning::{ReasoningError, StubReasoning};

    fn quiet_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.spawning.food_spawn_points.clear();
        config.spawning.enemy_spawn_points.clear();
        config.spawning.blocks.clear();
        config
    }

    struct Scripted {
        directives: Vec<Directive>,
        calls: usize,
    }

    impl ReasoningSource for Scripted {
        fn request_directives(
            &mut self,
            _tick: u64,
            _snapshots: &[habitat_types::ReasoningSnapshot],
        ) -> Result<Vec<Directive>, ReasoningError> {
            self.calls = self.calls.saturating_add(1);
            Ok(std::mem::take(&mut self.directives))
        }
    }

    #[test]
    fn discarded_spawn_leaves_no_entity() {
        let mut state = SimulationState::new(quiet_config()).unwrap();
        let event = state
            .spawns
            .spawn(&mut state.registry, EntityCategory::Agent, Position::ORIGIN)
            .unwrap();
        assert_eq!(state.registry.count(EntityCategory::Agent), 1);

        assert!(state.discard_spawn(event.entity));
        assert_eq!(state.registry.count(EntityCategory::Agent), 0);
        assert!(!state.registry.contains(event.entity));

        // A second rollback finds nothing and reports it.
        assert!(!state.discard_spawn(event.entity));
    }

    #[test]
    fn new_state_announces_populated_world_to_the_map() {
        let state = SimulationState::new(SimulationConfig::default()).unwrap();
        assert!(!state.registry.is_empty());
        assert_eq!(state.map.len(), state.registry.len());
        assert!(state.bus.is_subscribed(SubscriberId::Map(state.map.id())));
    }

    #[test]
    fn rejects_non_positive_extent() {
        let mut config = quiet_config();
        config.world.half_extent = 0.0;
        assert!(matches!(SimulationState::new(config), Err(TickError::Config { .. })));
    }

    #[test]
    fn spawned_agent_has_a_body_on_the_map() {
        let mut state = SimulationState::new(quiet_config()).unwrap();
        let id = state.spawn_agent(Position::new(1.0, 1.0), BehaviorKind::Rest).unwrap();
        let entity = state.agents.get(id).unwrap().entity();
        assert!(state.registry.contains(entity));
        assert!(state.map.contains(entity));
        assert!(state.bus.is_subscribed(SubscriberId::Agent(id)));
        // Agents do not learn of their own body.
        assert!(state.agents.get(id).unwrap().knowledge().all_known().is_empty());
    }

    #[test]
    fn agent_body_follows_the_agent() {
        let mut state = SimulationState::new(quiet_config()).unwrap();
        let id = state.spawn_agent(Position::ORIGIN, BehaviorKind::Rest).unwrap();
        let target = Position::new(10.0, 0.0);
        let directive = Directive {
            agent_id: id,
            tick: 0,
            command: DirectiveCommand::SetMoveTarget { target },
        };
        let mut summary = run_tick(&mut state, &mut StubReasoning::new()).unwrap();
        assert!(state.apply_directive(&directive, &mut summary));
        for _ in 0..10 {
            run_tick(&mut state, &mut StubReasoning::new()).unwrap();
        }
        let agent = state.agents.get(id).unwrap();
        let body = state.registry.get(agent.entity()).unwrap();
        assert!(body.position.approx_eq(agent.position(), 1e-9));
        assert!(agent.position().x > 0.0);
    }

    #[test]
    fn directives_switch_behavior_and_reject_unknown_tags() {
        let mut state = SimulationState::new(quiet_config()).unwrap();
        let id = state.spawn_agent(Position::ORIGIN, BehaviorKind::Rest).unwrap();
        let mut summary = run_tick(&mut state, &mut StubReasoning::new()).unwrap();

        let good = Directive {
            agent_id: id,
            tick: 1,
            command: DirectiveCommand::SwitchBehavior {
                behavior: "GuardBehavior".to_owned(),
            },
        };
        let bad = Directive {
            agent_id: id,
            tick: 1,
            command: DirectiveCommand::SwitchBehavior {
                behavior: "DanceBehavior".to_owned(),
            },
        };
        let missing = Directive {
            agent_id: AgentId(99),
            ..good.clone()
        };
        assert!(state.apply_directive(&good, &mut summary));
        assert_eq!(state.agents.get(id).unwrap().behavior(), BehaviorKind::Guard);
        assert!(!state.apply_directive(&bad, &mut summary));
        assert_eq!(state.agents.get(id).unwrap().behavior(), BehaviorKind::Guard);
        assert!(!state.apply_directive(&missing, &mut summary));
    }

    #[test]
    fn reasoning_is_consulted_only_when_requested() {
        let mut state = SimulationState::new(quiet_config()).unwrap();
        let id = state.spawn_agent(Position::ORIGIN, BehaviorKind::Rest).unwrap();
        let mut source = Scripted {
            directives: vec![Directive {
                agent_id: id,
                tick: 1,
                command: DirectiveCommand::SwitchBehavior {
                    behavior: "gather".to_owned(),
                },
            }],
            calls: 0,
        };

        let summary = run_tick(&mut state, &mut source).unwrap();
        assert_eq!(source.calls, 0);
        assert_eq!(summary.snapshots_sent, 0);

        state.agents.get_mut(id).unwrap().request_reasoning_update();
        let summary = run_tick(&mut state, &mut source).unwrap();
        assert_eq!(source.calls, 1);
        assert_eq!(summary.snapshots_sent, 1);
        assert_eq!(summary.directives_applied, 1);
        assert_eq!(state.agents.get(id).unwrap().behavior(), BehaviorKind::Gather);
    }

    #[test]
    fn died_effect_removes_body_and_subscription() {
        let mut state = SimulationState::new(quiet_config()).unwrap();
        let id = state.spawn_agent(Position::ORIGIN, BehaviorKind::Rest).unwrap();
        let entity = state.agents.get(id).unwrap().entity();
        let mut summary = run_tick(&mut state, &mut StubReasoning::new()).unwrap();

        state.apply_effects(id, &[Effect::Died], &mut summary);
        assert!(!state.registry.contains(entity));
        assert!(!state.map.contains(entity));
        assert!(!state.bus.is_subscribed(SubscriberId::Agent(id)));
        assert_eq!(summary.deaths, vec![id]);
        assert_eq!(state.metrics.deaths, 1);
    }

    #[test]
    fn consumed_food_leaves_world_and_map() {
        let mut state = SimulationState::new(quiet_config()).unwrap();
        let id = state.spawn_agent(Position::ORIGIN, BehaviorKind::Rest).unwrap();
        let event = state
            .spawns
            .spawn(&mut state.registry, EntityCategory::Food, Position::new(2.0, 0.0))
            .unwrap();
        state.publish([event]);
        assert!(state.map.contains(event.entity));
        let known = |s: &SimulationState| {
            s.agents
                .get(id)
                .unwrap()
                .knowledge()
                .all_known()
                .iter()
                .any(|m| m.entity == event.entity)
        };
        assert!(known(&state));

        let mut summary = run_tick(&mut state, &mut StubReasoning::new()).unwrap();
        state.apply_effects(id, &[Effect::ConsumeFood { food: event.entity }], &mut summary);
        assert!(!state.registry.contains(event.entity));
        assert!(!state.map.contains(event.entity));
        assert!(!known(&state));
        assert_eq!(state.metrics.food_collected, 1);
    }

    #[test]
    fn wall_building_consumes_stored_blocks() {
        let mut state = SimulationState::new(quiet_config()).unwrap();
        let id = state.spawn_agent(Position::ORIGIN, BehaviorKind::Rest).unwrap();
        let mut summary = run_tick(&mut state, &mut StubReasoning::new()).unwrap();
        state.apply_effects(id, &[Effect::DeliverBlock, Effect::BuildWall, Effect::BuildWall], &mut summary);
        assert_eq!(state.habitat.walls_built(), 1);
        assert_eq!(state.habitat.stored_blocks(), 0);
        assert_eq!(state.metrics.blocks_delivered, 1);
        assert_eq!(state.metrics.walls_built, 1);
    }

    #[test]
    fn dropped_block_is_clamped_into_the_field() {
        let mut state = SimulationState::new(quiet_config()).unwrap();
        let id = state.spawn_agent(Position::ORIGIN, BehaviorKind::Rest).unwrap();
        let mut summary = run_tick(&mut state, &mut StubReasoning::new()).unwrap();
        state.apply_effects(id, &[Effect::DropBlock { position: Position::new(500.0, 0.0) }], &mut summary);
        let block = state.registry.by_category(EntityCategory::Block).next().copied().unwrap();
        assert!(state.field.contains(block.position));
        assert!(state.map.contains(block.id));
    }
}

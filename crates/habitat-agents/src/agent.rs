//! Agent records and the manager that owns them.
//!
//! An [`Agent`] bundles everything one colonist owns: position, behavior
//! state machine, navigation, continuation queue, fitness counters,
//! knowledge store, spawn point discovery and reasoning flags. No agent
//! reaches into another agent's state. [`Agent::update`] runs one tick
//! and reports the world mutations it wants as [`Effect`]s.

use std::collections::BTreeMap;

use habitat_events::MarkerSubscriber;
use habitat_types::{
    AgentId, AgentSnapshot, BehaviorKind, EntityCategory, EntityId, MarkerEvent, Position,
};
use habitat_world::{NavAgent, NavSettings};
use rand::rngs::SmallRng;
use tracing::{debug, info, warn};

use crate::behavior::{BehaviorContext, BehaviorOutcome, BehaviorStateMachine, Effect, WorldView};
use crate::config::AgentConfig;
use crate::discovery::SpawnPointDiscovery;
use crate::error::AgentError;
use crate::fitness::FitnessTracker;
use crate::knowledge::KnowledgeStore;
use crate::reasoning::{ReasoningTrigger, UpdateReason};
use crate::reservation::FoodReservations;
use crate::scheduler::{ContinuationKind, ContinuationOwner, Scheduler, SimTime, secs};

// ---------------------------------------------------------------------------
// Environment and output
// ---------------------------------------------------------------------------

/// Shared state lent to an agent for one update.
pub struct AgentEnv<'a> {
    /// Read-only world.
    pub world: WorldView<'a>,
    /// Simulation randomness.
    pub rng: &'a mut SmallRng,
    /// Food claims across all agents.
    pub reservations: &'a mut FoodReservations,
    /// Agent tuning.
    pub config: &'a AgentConfig,
    /// Current simulation time.
    pub now: SimTime,
    /// Seconds since the previous tick.
    pub dt: f64,
}

/// What one agent update produced.
#[derive(Debug, Clone, Default)]
pub struct AgentUpdate {
    /// World mutations to apply, in order.
    pub effects: Vec<Effect>,
    /// Marker events to re-announce on the bus.
    pub republish: Vec<MarkerEvent>,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// The parts of an agent a behavior may touch.
#[derive(Debug, Clone)]
struct AgentBody {
    id: AgentId,
    position: Position,
    heading: f64,
    nav: NavAgent,
    scheduler: Scheduler,
    fitness: FitnessTracker,
    knowledge: KnowledgeStore,
}

impl AgentBody {
    fn context<'b>(&'b mut self, env: &'b mut AgentEnv<'_>, effects: &'b mut Vec<Effect>) -> BehaviorContext<'b> {
        BehaviorContext {
            now: env.now,
            dt: env.dt,
            agent: self.id,
            position: &mut self.position,
            heading: &mut self.heading,
            nav: &mut self.nav,
            scheduler: &mut self.scheduler,
            fitness: &mut self.fitness,
            knowledge: &self.knowledge,
            world: env.world,
            rng: &mut *env.rng,
            reservations: &mut *env.reservations,
            settings: &env.config.behaviors,
            effects,
        }
    }
}

/// One simulated colonist.
#[derive(Debug, Clone)]
pub struct Agent {
    entity: EntityId,
    body: AgentBody,
    behavior: BehaviorStateMachine,
    discovery: SpawnPointDiscovery,
    reasoning: ReasoningTrigger,
    exhaustion: u32,
    alive: bool,
    started: bool,
    resume_after_flee: Option<BehaviorKind>,
    last_hit: Option<SimTime>,
    inside_habitat: bool,
}

impl Agent {
    /// A new agent at `position` running `initial` once started.
    pub fn new(
        id: AgentId,
        entity: EntityId,
        position: Position,
        initial: BehaviorKind,
        config: &AgentConfig,
        nav: NavSettings,
    ) -> Self {
        Self {
            entity,
            body: AgentBody {
                id,
                position,
                heading: 0.0,
                nav: NavAgent::new(nav),
                scheduler: Scheduler::new(),
                fitness: FitnessTracker::new(&config.vitals),
                knowledge: KnowledgeStore::new(config.discovery.marker_detection_range),
            },
            behavior: BehaviorStateMachine::new(initial, &config.behaviors),
            discovery: SpawnPointDiscovery::new(config.discovery.spawn_point_detection_range),
            reasoning: ReasoningTrigger::new(config.reasoning.clone()),
            exhaustion: 0,
            alive: true,
            started: false,
            resume_after_flee: None,
            last_hit: None,
            inside_habitat: false,
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run one tick for this agent, appending its effects to `out`.
    ///
    /// Effects recorded before an error are kept in `out` so the caller can
    /// still apply them.
    pub fn update(&mut self, env: &mut AgentEnv<'_>, out: &mut AgentUpdate) -> Result<(), AgentError> {
        if !self.alive {
            return Ok(());
        }
        if !self.started {
            self.start(env, &mut out.effects)?;
        }

        let republish = self.discovery.poll(
            self.body.id,
            self.body.position,
            env.world.spawns,
            env.world.registry,
            &mut self.body.knowledge,
        );
        out.republish.extend(republish);

        self.auto_flee(env, &mut out.effects)?;

        let enemy_near = self.enemy_within(env, self.reasoning.detection_radius());
        self.reasoning
            .observe_enemies(self.body.id, enemy_near, &mut self.body.scheduler, env.now);

        while let Some(due) = self.body.scheduler.pop_due(env.now) {
            match due.owner {
                ContinuationOwner::Manager => self.on_manager_continuation(due.kind, env, &mut out.effects)?,
                ContinuationOwner::Behavior(owner) => {
                    let mut ctx = self.body.context(env, &mut out.effects);
                    let outcome = self.behavior.on_continuation(owner, due.kind, &mut ctx)?;
                    self.apply_outcome(outcome, env, &mut out.effects)?;
                }
            }
        }

        let mut ctx = self.body.context(env, &mut out.effects);
        let outcome = self.behavior.tick(&mut ctx)?;
        self.apply_outcome(outcome, env, &mut out.effects)?;

        if let Some(direction) = self.body.nav.advance(&mut self.body.position, env.dt) {
            self.body.heading = direction.heading();
        }

        self.contact_damage(env, &mut out.effects);
        if self.alive {
            self.habitat_trigger(env, &mut out.effects);
        }
        Ok(())
    }

    fn start(&mut self, env: &mut AgentEnv<'_>, effects: &mut Vec<Effect>) -> Result<(), AgentError> {
        self.started = true;
        self.schedule_exhaustion(env);
        self.reasoning.start(&mut self.body.scheduler, env.now);
        let mut ctx = self.body.context(env, effects);
        self.behavior.enable(&mut ctx)?;
        info!(agent_id = %self.body.id, behavior = %self.behavior.kind(), "Agent started");
        Ok(())
    }

    fn schedule_exhaustion(&mut self, env: &AgentEnv<'_>) {
        self.body.scheduler.cancel_kind(ContinuationKind::ExhaustionTick);
        self.body.scheduler.schedule(
            env.now,
            secs(env.config.behaviors.exhaustion.interval_secs),
            ContinuationOwner::Manager,
            ContinuationKind::ExhaustionTick,
        );
    }

    fn apply_outcome(
        &mut self,
        outcome: BehaviorOutcome,
        env: &mut AgentEnv<'_>,
        effects: &mut Vec<Effect>,
    ) -> Result<(), AgentError> {
        match outcome.switch_to {
            Some(kind) => self.switch(kind, env, effects).map(|_| ()),
            None => Ok(()),
        }
    }

    fn switch(&mut self, kind: BehaviorKind, env: &mut AgentEnv<'_>, effects: &mut Vec<Effect>) -> Result<bool, AgentError> {
        let mut ctx = self.body.context(env, effects);
        let switched = self.behavior.switch_to(kind, &mut ctx)?;
        if switched {
            self.schedule_exhaustion(env);
        }
        Ok(switched)
    }

    /// Switch behavior on request (directive or operator). Cancels any
    /// pending return from an automatic flee.
    pub fn switch_to(
        &mut self,
        kind: BehaviorKind,
        env: &mut AgentEnv<'_>,
        effects: &mut Vec<Effect>,
    ) -> Result<bool, AgentError> {
        self.resume_after_flee = None;
        self.switch(kind, env, effects)
    }

    /// Switch by tag. Unknown tags fail with [`AgentError::InvalidTransition`]
    /// and leave the agent untouched.
    pub fn switch_to_tag(
        &mut self,
        tag: &str,
        env: &mut AgentEnv<'_>,
        effects: &mut Vec<Effect>,
    ) -> Result<bool, AgentError> {
        let kind = BehaviorKind::parse(tag).ok_or_else(|| AgentError::InvalidTransition {
            agent: self.body.id,
            tag: tag.to_owned(),
        })?;
        self.switch_to(kind, env, effects)
    }

    /// Send the agent towards `target`.
    pub fn set_move_target(&mut self, env: &AgentEnv<'_>, target: Position) -> Result<(), AgentError> {
        self.body
            .nav
            .set_destination(env.world.spatial, self.body.position, target)?;
        debug!(agent_id = %self.body.id, %target, "Move target set");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Policies
    // -----------------------------------------------------------------------

    fn enemy_within(&self, env: &AgentEnv<'_>, radius: f64) -> bool {
        env.world
            .spatial
            .find_nearest(env.world.registry, self.body.position, radius, EntityCategory::Enemy)
            .is_some()
    }

    fn auto_flee(&mut self, env: &mut AgentEnv<'_>, effects: &mut Vec<Effect>) -> Result<(), AgentError> {
        let policy = env.config.behaviors.auto_flee.clone();
        let current = self.behavior.kind();
        if !policy.enabled || current == BehaviorKind::Guard {
            return Ok(());
        }
        if current == BehaviorKind::Flee {
            if let Some(resume) = self.resume_after_flee {
                if !self.enemy_within(env, policy.cancel_radius) {
                    self.resume_after_flee = None;
                    debug!(agent_id = %self.body.id, behavior = %resume, "Threat gone, resuming");
                    self.switch(resume, env, effects)?;
                }
            }
        } else if self.enemy_within(env, policy.trigger_radius) {
            self.resume_after_flee = Some(current);
            info!(agent_id = %self.body.id, interrupted = %current, "Hostile nearby, fleeing");
            self.switch(BehaviorKind::Flee, env, effects)?;
        }
        Ok(())
    }

    fn on_manager_continuation(
        &mut self,
        kind: ContinuationKind,
        env: &mut AgentEnv<'_>,
        effects: &mut Vec<Effect>,
    ) -> Result<(), AgentError> {
        match kind {
            ContinuationKind::ExhaustionTick => {
                let rate = self.behavior.exhaustion_rate(&env.config.behaviors.exhaustion);
                let change = rate.unsigned_abs();
                self.exhaustion = if rate >= 0 {
                    self.exhaustion.saturating_add(change)
                } else {
                    self.exhaustion.saturating_sub(change)
                };
                self.schedule_exhaustion(env);
            }
            ContinuationKind::HabitatDeposit => {
                if self.inside_habitat && self.body.fitness.current_food() > 0 {
                    let amount = self.body.fitness.deposit_all()?;
                    effects.push(Effect::DepositFood { amount });
                    info!(
                        agent_id = %self.body.id,
                        amount,
                        deposited_today = self.body.fitness.deposited_today(),
                        "Food deposited"
                    );
                }
            }
            ContinuationKind::EnemyDepartureConfirmed | ContinuationKind::ReasoningTimeout => {
                self.reasoning
                    .on_continuation(kind, &mut self.body.scheduler, env.now);
            }
            other => {
                warn!(agent_id = %self.body.id, kind = ?other, "Unexpected manager continuation");
            }
        }
        Ok(())
    }

    fn contact_damage(&mut self, env: &mut AgentEnv<'_>, effects: &mut Vec<Effect>) {
        let vitals = &env.config.vitals;
        if !self.enemy_within(env, vitals.contact_range) {
            return;
        }
        let cooldown = secs(vitals.hit_cooldown_secs);
        if self.last_hit.is_some_and(|t| env.now.since(t) < cooldown) {
            return;
        }
        self.last_hit = Some(env.now);
        let health = self.body.fitness.take_damage(vitals.contact_damage);
        warn!(agent_id = %self.body.id, damage = vitals.contact_damage, health, "Hit by hostile");
        if self.body.fitness.is_dead() {
            self.die(env, effects);
        }
    }

    fn habitat_trigger(&mut self, env: &AgentEnv<'_>, effects: &mut Vec<Effect>) {
        let inside = env.world.habitat.contains(self.body.position);
        if inside && !self.inside_habitat {
            effects.push(Effect::EnterHabitat {
                is_guard: self.behavior.kind() == BehaviorKind::Guard,
            });
            debug!(agent_id = %self.body.id, "Entered habitat");
        } else if !inside && self.inside_habitat {
            self.body.scheduler.cancel_kind(ContinuationKind::HabitatDeposit);
            effects.push(Effect::LeaveHabitat);
            debug!(agent_id = %self.body.id, "Left habitat");
        }
        self.inside_habitat = inside;

        if inside
            && self.body.fitness.current_food() > 0
            && !self.body.scheduler.is_pending(ContinuationKind::HabitatDeposit)
        {
            self.body.scheduler.schedule(
                env.now,
                secs(env.config.deposit_delay_secs),
                ContinuationOwner::Manager,
                ContinuationKind::HabitatDeposit,
            );
        }
    }

    fn die(&mut self, env: &mut AgentEnv<'_>, effects: &mut Vec<Effect>) {
        let mut ctx = self.body.context(env, effects);
        // Drops anything carried.
        if let Err(e) = self.behavior.switch_to(BehaviorKind::Rest, &mut ctx) {
            warn!(agent_id = %self.body.id, error = %e, "Behavior shutdown failed");
        }
        self.body.scheduler = Scheduler::new();
        self.body.nav.stop();
        self.body.knowledge.clear();
        env.reservations.release_all(self.body.id);
        self.alive = false;
        self.resume_after_flee = None;
        if self.inside_habitat {
            self.inside_habitat = false;
            effects.push(Effect::LeaveHabitat);
        }
        effects.push(Effect::Died);
        info!(agent_id = %self.body.id, "Agent died");
    }

    // -----------------------------------------------------------------------
    // Daily settlement
    // -----------------------------------------------------------------------

    /// Use a dispensed food portion.
    pub fn receive_food(&mut self, amount: u32) -> crate::fitness::FoodUse {
        self.body.fitness.receive_food(amount)
    }

    /// End-of-day hunger settlement. Marks the agent dead if health runs out
    /// and returns the damage applied.
    pub fn apply_daily_hunger_penalty(&mut self) -> u32 {
        if !self.alive {
            return 0;
        }
        let damage = self.body.fitness.apply_daily_hunger_penalty();
        if self.body.fitness.is_dead() {
            info!(agent_id = %self.body.id, "Agent starved");
        }
        damage
    }

    /// Finish a death caused outside the tick (starvation): shut the
    /// behavior down and report the same effects as a contact death.
    pub fn settle_death(&mut self, env: &mut AgentEnv<'_>, effects: &mut Vec<Effect>) {
        if self.alive && self.body.fitness.is_dead() {
            self.die(env, effects);
        }
    }

    // -----------------------------------------------------------------------
    // Reasoning
    // -----------------------------------------------------------------------

    /// Raise the update flag by hand.
    pub fn request_reasoning_update(&mut self) {
        self.reasoning.request_update();
    }

    /// Whether the update flag is raised.
    pub const fn is_update_requested(&self) -> bool {
        self.reasoning.is_update_requested()
    }

    /// Clear and return the pending update request.
    pub fn take_update_request(&mut self) -> Option<UpdateReason> {
        self.reasoning.take_update_request()
    }

    /// Summary of this agent for a reasoning snapshot.
    pub fn snapshot(&self, habitat_stored_food: u32) -> AgentSnapshot {
        let fitness = &self.body.fitness;
        AgentSnapshot {
            agent_id: self.body.id,
            current_behavior: self.behavior.kind(),
            position: self.body.position,
            hunger: fitness.hunger(),
            max_food: fitness.max_food(),
            current_food: fitness.current_food(),
            health: fitness.health(),
            max_health: fitness.max_health(),
            exhaustion: self.exhaustion,
            fitness: fitness.fitness_score(habitat_stored_food),
            enemy_detected: self.reasoning.enemy_in_range(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Stable agent identifier.
    pub const fn id(&self) -> AgentId {
        self.body.id
    }

    /// The agent's world entity.
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Current position.
    pub const fn position(&self) -> Position {
        self.body.position
    }

    /// Move the agent (test and scenario setup).
    pub fn place_at(&mut self, position: Position) {
        self.body.nav.stop();
        self.body.position = position;
    }

    /// Facing in radians.
    pub const fn heading(&self) -> f64 {
        self.body.heading
    }

    /// Active behavior tag.
    pub fn behavior(&self) -> BehaviorKind {
        self.behavior.kind()
    }

    /// The behavior state machine.
    pub const fn behavior_machine(&self) -> &BehaviorStateMachine {
        &self.behavior
    }

    /// Fitness counters.
    pub const fn fitness(&self) -> &FitnessTracker {
        &self.body.fitness
    }

    /// Mutable fitness counters.
    pub fn fitness_mut(&mut self) -> &mut FitnessTracker {
        &mut self.body.fitness
    }

    /// Discovered markers.
    pub const fn knowledge(&self) -> &KnowledgeStore {
        &self.body.knowledge
    }

    /// Pending continuations.
    pub const fn scheduler(&self) -> &Scheduler {
        &self.body.scheduler
    }

    /// Path following state.
    pub const fn nav(&self) -> &NavAgent {
        &self.body.nav
    }

    /// Current exhaustion value.
    pub const fn exhaustion(&self) -> u32 {
        self.exhaustion
    }

    /// Whether the agent is alive.
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Whether the agent is inside the habitat trigger radius.
    pub const fn is_inside_habitat(&self) -> bool {
        self.inside_habitat
    }
}

impl MarkerSubscriber for Agent {
    fn on_marker(&mut self, event: &MarkerEvent) {
        if self.alive {
            self.body.knowledge.observe(event, self.body.position);
        }
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Owns every agent and hands out IDs.
#[derive(Debug, Clone)]
pub struct AgentManager {
    next_id: Option<AgentId>,
    agents: BTreeMap<AgentId, Agent>,
}

impl AgentManager {
    /// No agents; the first ID handed out is [`AgentId::FIRST`].
    pub const fn new() -> Self {
        Self {
            next_id: Some(AgentId::FIRST),
            agents: BTreeMap::new(),
        }
    }

    /// Register a new agent for `entity` and return its ID.
    pub fn spawn_agent(
        &mut self,
        entity: EntityId,
        position: Position,
        initial: BehaviorKind,
        config: &AgentConfig,
        nav: NavSettings,
    ) -> Result<AgentId, AgentError> {
        let id = self.next_id.ok_or(AgentError::IdExhausted)?;
        self.next_id = id.next();
        self.agents
            .insert(id, Agent::new(id, entity, position, initial, config, nav));
        info!(agent_id = %id, entity = %entity, behavior = %initial, "Agent registered");
        Ok(id)
    }

    /// Look up an agent.
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Look up an agent mutably.
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    /// Look up an agent or fail with [`AgentError::AgentNotFound`].
    pub fn require_mut(&mut self, id: AgentId) -> Result<&mut Agent, AgentError> {
        self.agents.get_mut(&id).ok_or(AgentError::AgentNotFound(id))
    }

    /// Switch an agent's behavior by tag.
    pub fn switch_to_tag(
        &mut self,
        id: AgentId,
        tag: &str,
        env: &mut AgentEnv<'_>,
        effects: &mut Vec<Effect>,
    ) -> Result<bool, AgentError> {
        self.require_mut(id)?.switch_to_tag(tag, env, effects)
    }

    /// Agents in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Agents in ascending ID order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.values_mut()
    }

    /// Every ID in ascending order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    /// Number of agents, dead or alive.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether there are no agents.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Number of living agents.
    pub fn living_count(&self) -> usize {
        self.agents.values().filter(|a| a.is_alive()).count()
    }
}

impl Default for AgentManager {
    fn default() -> Self {
        Self::new()
    }
}

//! The per-agent behavior state machine.
//!
//! Exactly one variant is active at a time. Each variant is itself a small
//! state machine driven by [`AgentBehavior::tick`] and by the scheduled
//! continuations it owns. Variants never mutate the world directly: they
//! read it through a [`WorldView`] and push [`Effect`]s that the simulation
//! applies after the agent's update.
//!
//! # Variants
//!
//! - [`gather`] -- wander, chase food, carry it home
//! - [`flee`] -- run from the nearest hostile
//! - [`guard`] -- patrol the habitat and chase pests
//! - [`build_wall`] -- fetch a wall slot from the habitat and build it
//! - [`move_block`] -- haul blocks to the habitat, then build
//! - [`rest`] -- stand still and recover

pub mod build_wall;
pub mod flee;
pub mod gather;
pub mod guard;
pub mod move_block;
pub mod rest;

use habitat_types::{AgentId, BehaviorKind, EntityId, Position};
use habitat_world::{EntityRegistry, Habitat, NavAgent, SpatialQuery, SpawnAuthority};
use rand::rngs::SmallRng;
use tracing::info;

use crate::config::{BehaviorConfig, ExhaustionConfig};
use crate::error::AgentError;
use crate::fitness::FitnessTracker;
use crate::knowledge::KnowledgeStore;
use crate::reservation::FoodReservations;
use crate::scheduler::{ContinuationKind, ContinuationOwner, Scheduler, SimTime};

pub use build_wall::{BuildWall, BuildWallPhase};
pub use flee::Flee;
pub use gather::{Gather, GatherPhase};
pub use guard::{Guard, GuardPhase};
pub use move_block::{MoveBlock, MoveBlockPhase};
pub use rest::Rest;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Read-only access to the shared world.
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    /// Live entities.
    pub registry: &'a EntityRegistry,
    /// Proximity, path and navigability queries.
    pub spatial: &'a dyn SpatialQuery,
    /// The shared habitat.
    pub habitat: &'a Habitat,
    /// Spawn points and food mapping.
    pub spawns: &'a SpawnAuthority,
}

/// A world mutation requested by a behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// A food item was picked up and must leave the world.
    ConsumeFood {
        /// The food entity.
        food: EntityId,
    },
    /// A block was picked up and must leave the world.
    RemoveBlock {
        /// The block entity.
        block: EntityId,
    },
    /// A carried block was put down.
    DropBlock {
        /// Where the new block goes.
        position: Position,
    },
    /// A carried block reached the habitat.
    DeliverBlock,
    /// A wall should be built at the habitat's next free slot.
    BuildWall,
    /// A guard caught a pest.
    KillPest {
        /// The pest entity.
        pest: EntityId,
    },
    /// Carried food was handed to the habitat.
    DepositFood {
        /// Number of items deposited.
        amount: u32,
    },
    /// The agent crossed into the habitat trigger radius.
    EnterHabitat {
        /// Whether the agent is guarding.
        is_guard: bool,
    },
    /// The agent left the habitat trigger radius.
    LeaveHabitat,
    /// The agent's health reached zero.
    Died,
}

/// Everything a behavior may read or touch during one call.
pub struct BehaviorContext<'a> {
    /// Current simulation time.
    pub now: SimTime,
    /// Seconds since the previous tick.
    pub dt: f64,
    /// The acting agent.
    pub agent: AgentId,
    /// Agent position.
    pub position: &'a mut Position,
    /// Agent facing, in radians.
    pub heading: &'a mut f64,
    /// Path following.
    pub nav: &'a mut NavAgent,
    /// The agent's continuation queue.
    pub scheduler: &'a mut Scheduler,
    /// Carried food and vitals.
    pub fitness: &'a mut FitnessTracker,
    /// Discovered markers.
    pub knowledge: &'a KnowledgeStore,
    /// Shared world.
    pub world: WorldView<'a>,
    /// Simulation randomness.
    pub rng: &'a mut SmallRng,
    /// Food claims across all agents.
    pub reservations: &'a mut FoodReservations,
    /// Behavior tuning.
    pub settings: &'a BehaviorConfig,
    /// Pending world mutations.
    pub effects: &'a mut Vec<Effect>,
}

impl BehaviorContext<'_> {
    /// Schedule a continuation owned by `kind` after `delay_secs`.
    pub fn schedule(&mut self, owner: BehaviorKind, delay_secs: f64, kind: ContinuationKind) {
        self.scheduler.schedule(
            self.now,
            crate::scheduler::secs(delay_secs),
            ContinuationOwner::Behavior(owner),
            kind,
        );
    }

    /// Path to `target`. Unreachable targets are logged and leave the
    /// previous destination in place.
    pub fn travel_to(&mut self, target: Position) -> bool {
        if self.nav.destination().is_some_and(|d| d.approx_eq(target, 1e-6)) && !self.nav.is_stopped() {
            return true;
        }
        match self.nav.set_destination(self.world.spatial, *self.position, target) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(agent_id = %self.agent, error = %e, "Destination rejected");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Variant contract
// ---------------------------------------------------------------------------

/// What a behavior wants after a tick or continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BehaviorOutcome {
    /// Switch to this variant before the next tick.
    pub switch_to: Option<BehaviorKind>,
}

impl BehaviorOutcome {
    /// Keep the current variant.
    pub const fn stay() -> Self {
        Self { switch_to: None }
    }

    /// Ask for a switch.
    pub const fn switch(kind: BehaviorKind) -> Self {
        Self {
            switch_to: Some(kind),
        }
    }
}

/// Lifecycle hooks shared by every variant.
pub trait AgentBehavior {
    /// The variant's tag.
    fn kind(&self) -> BehaviorKind;

    /// Reset internal state and start the variant's work.
    fn on_enable(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError>;

    /// Leave the agent in a safe resting state. Pending continuations are
    /// already cancelled when this runs.
    fn on_disable(&mut self, ctx: &mut BehaviorContext<'_>) {
        ctx.nav.stop();
    }

    /// Per-tick update.
    fn tick(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<BehaviorOutcome, AgentError>;

    /// A continuation owned by this variant came due.
    fn on_continuation(
        &mut self,
        _kind: ContinuationKind,
        _ctx: &mut BehaviorContext<'_>,
    ) -> Result<BehaviorOutcome, AgentError> {
        Ok(BehaviorOutcome::stay())
    }

    /// Exhaustion change per exhaustion interval while active.
    fn exhaustion_rate(&self, config: &ExhaustionConfig) -> i32 {
        config.active_rate
    }
}

/// The tagged union of variants.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Food gathering.
    Gather(Gather),
    /// Running from hostiles.
    Flee(Flee),
    /// Habitat guarding.
    Guard(Guard),
    /// Wall building.
    BuildWall(BuildWall),
    /// Block hauling.
    MoveBlock(MoveBlock),
    /// Resting.
    Rest(Rest),
}

impl Behavior {
    /// A fresh, not yet enabled variant.
    pub fn new(kind: BehaviorKind, settings: &BehaviorConfig) -> Self {
        match kind {
            BehaviorKind::Gather => Self::Gather(Gather::new()),
            BehaviorKind::Flee => Self::Flee(Flee::new()),
            BehaviorKind::Guard => Self::Guard(Guard::new()),
            BehaviorKind::BuildWall => Self::BuildWall(BuildWall::new(settings.build_wall.total_walls)),
            BehaviorKind::MoveBlock => Self::MoveBlock(MoveBlock::new()),
            BehaviorKind::Rest => Self::Rest(Rest::new()),
        }
    }

    fn as_dyn(&self) -> &dyn AgentBehavior {
        match self {
            Self::Gather(b) => b,
            Self::Flee(b) => b,
            Self::Guard(b) => b,
            Self::BuildWall(b) => b,
            Self::MoveBlock(b) => b,
            Self::Rest(b) => b,
        }
    }

    fn as_dyn_mut(&mut self) -> &mut dyn AgentBehavior {
        match self {
            Self::Gather(b) => b,
            Self::Flee(b) => b,
            Self::Guard(b) => b,
            Self::BuildWall(b) => b,
            Self::MoveBlock(b) => b,
            Self::Rest(b) => b,
        }
    }

    /// The variant's tag.
    pub fn kind(&self) -> BehaviorKind {
        self.as_dyn().kind()
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Owns the active variant and performs switches.
#[derive(Debug, Clone)]
pub struct BehaviorStateMachine {
    active: Behavior,
    enabled: bool,
}

impl BehaviorStateMachine {
    /// A machine holding `initial`, not yet enabled.
    pub fn new(initial: BehaviorKind, settings: &BehaviorConfig) -> Self {
        Self {
            active: Behavior::new(initial, settings),
            enabled: false,
        }
    }

    /// The active variant's tag.
    pub fn kind(&self) -> BehaviorKind {
        self.active.kind()
    }

    /// The active variant.
    pub const fn active(&self) -> &Behavior {
        &self.active
    }

    /// Whether [`Self::enable`] has run.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable the initial variant. Idempotent.
    pub fn enable(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError> {
        if self.enabled {
            return Ok(());
        }
        self.enabled = true;
        self.active.as_dyn_mut().on_enable(ctx)
    }

    /// Switch to `kind`. Returns `false` when it is already active.
    ///
    /// The old variant's continuations are cancelled before its disable
    /// hook runs, and both happen before the new variant is enabled.
    pub fn switch_to(&mut self, kind: BehaviorKind, ctx: &mut BehaviorContext<'_>) -> Result<bool, AgentError> {
        let old = self.kind();
        if old == kind {
            return Ok(false);
        }
        let cancelled = ctx.scheduler.cancel_owned_by(ContinuationOwner::Behavior(old));
        if self.enabled {
            self.active.as_dyn_mut().on_disable(ctx);
        }
        self.active = Behavior::new(kind, ctx.settings);
        self.enabled = true;
        info!(agent_id = %ctx.agent, from = %old, to = %kind, cancelled, "Behavior switched");
        self.active.as_dyn_mut().on_enable(ctx)?;
        Ok(true)
    }

    /// Switch by tag; unknown tags are rejected without a state change.
    pub fn switch_to_tag(&mut self, tag: &str, ctx: &mut BehaviorContext<'_>) -> Result<bool, AgentError> {
        let kind = BehaviorKind::parse(tag).ok_or_else(|| AgentError::InvalidTransition {
            agent: ctx.agent,
            tag: tag.to_owned(),
        })?;
        self.switch_to(kind, ctx)
    }

    /// Run the active variant's tick.
    pub fn tick(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<BehaviorOutcome, AgentError> {
        self.active.as_dyn_mut().tick(ctx)
    }

    /// Hand a due continuation to the active variant if it owns it.
    pub fn on_continuation(
        &mut self,
        owner: BehaviorKind,
        kind: ContinuationKind,
        ctx: &mut BehaviorContext<'_>,
    ) -> Result<BehaviorOutcome, AgentError> {
        if owner != self.kind() {
            tracing::debug!(agent_id = %ctx.agent, %owner, ?kind, "Dropped continuation for inactive behavior");
            return Ok(BehaviorOutcome::stay());
        }
        self.active.as_dyn_mut().on_continuation(kind, ctx)
    }

    /// Exhaustion change per interval for the active variant.
    pub fn exhaustion_rate(&self, config: &ExhaustionConfig) -> i32 {
        self.active.as_dyn().exhaustion_rate(config)
    }
}

// ---------------------------------------------------------------------------
// Test rig
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_rig {
    use habitat_types::{Entity, EntityCategory};
    use habitat_world::{NavSettings, OpenField, SpawnSettings};
    use rand::SeedableRng;

    use super::*;
    use crate::config::VitalsConfig;

    /// A single agent in a small open world.
    pub(crate) struct Rig {
        pub now: SimTime,
        pub position: Position,
        pub heading: f64,
        pub nav: NavAgent,
        pub scheduler: Scheduler,
        pub fitness: FitnessTracker,
        pub knowledge: KnowledgeStore,
        pub registry: EntityRegistry,
        pub field: OpenField,
        pub habitat: Habitat,
        pub spawns: SpawnAuthority,
        pub rng: SmallRng,
        pub reservations: FoodReservations,
        pub settings: BehaviorConfig,
        pub effects: Vec<Effect>,
    }

    impl Rig {
        pub(crate) fn new() -> Self {
            Self {
                now: SimTime::ZERO,
                position: Position::ORIGIN,
                heading: 0.0,
                nav: NavAgent::new(NavSettings::default()),
                scheduler: Scheduler::new(),
                fitness: FitnessTracker::new(&VitalsConfig::default()),
                knowledge: KnowledgeStore::new(30.0),
                registry: EntityRegistry::new(),
                field: OpenField::new(100.0),
                habitat: Habitat::new(
                    Position::new(10.0, 0.0),
                    3.0,
                    &[Position::new(12.0, 2.0), Position::new(12.0, -2.0)],
                    0,
                ),
                spawns: SpawnAuthority::new(SpawnSettings::default()),
                rng: SmallRng::seed_from_u64(42),
                reservations: FoodReservations::new(),
                settings: BehaviorConfig::default(),
                effects: Vec::new(),
            }
        }

        pub(crate) fn ctx(&mut self, dt: f64) -> BehaviorContext<'_> {
            BehaviorContext {
                now: self.now,
                dt,
                agent: AgentId(1),
                position: &mut self.position,
                heading: &mut self.heading,
                nav: &mut self.nav,
                scheduler: &mut self.scheduler,
                fitness: &mut self.fitness,
                knowledge: &self.knowledge,
                world: WorldView {
                    registry: &self.registry,
                    spatial: &self.field,
                    habitat: &self.habitat,
                    spawns: &self.spawns,
                },
                rng: &mut self.rng,
                reservations: &mut self.reservations,
                settings: &self.settings,
                effects: &mut self.effects,
            }
        }

        pub(crate) fn spawn(&mut self, category: EntityCategory, position: Position) -> EntityId {
            let entity = Entity::new(category, position);
            self.registry.insert(entity).unwrap();
            entity.id
        }

        /// Advance `steps` ticks of `dt` seconds: due continuations, tick,
        /// movement. Switch requests are applied immediately.
        pub(crate) fn run(&mut self, machine: &mut BehaviorStateMachine, dt: f64, steps: usize) {
            for _ in 0..steps {
                self.now = self.now.saturating_add(crate::scheduler::secs(dt));
                while let Some(c) = self.scheduler.pop_due(self.now) {
                    if let ContinuationOwner::Behavior(owner) = c.owner {
                        let outcome = machine.on_continuation(owner, c.kind, &mut self.ctx(dt)).unwrap();
                        self.apply(machine, outcome, dt);
                    }
                }
                let outcome = machine.tick(&mut self.ctx(dt)).unwrap();
                self.apply(machine, outcome, dt);
                self.nav.advance(&mut self.position, dt);
            }
        }

        fn apply(&mut self, machine: &mut BehaviorStateMachine, outcome: BehaviorOutcome, dt: f64) {
            if let Some(kind) = outcome.switch_to {
                machine.switch_to(kind, &mut self.ctx(dt)).unwrap();
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_types::EntityCategory;

    use super::test_rig::Rig;
    use super::*;

    #[test]
    fn switching_to_active_kind_is_a_no_op() {
        let mut rig = Rig::new();
        let mut machine = BehaviorStateMachine::new(BehaviorKind::Rest, &rig.settings);
        machine.enable(&mut rig.ctx(0.1)).unwrap();
        assert!(!machine.switch_to(BehaviorKind::Rest, &mut rig.ctx(0.1)).unwrap());
        assert_eq!(machine.kind(), BehaviorKind::Rest);
    }

    #[test]
    fn unknown_tag_leaves_state_untouched() {
        let mut rig = Rig::new();
        let mut machine = BehaviorStateMachine::new(BehaviorKind::Gather, &rig.settings);
        machine.enable(&mut rig.ctx(0.1)).unwrap();
        let pending = rig.scheduler.len();

        let err = machine.switch_to_tag("dance", &mut rig.ctx(0.1)).unwrap_err();
        assert!(matches!(err, AgentError::InvalidTransition { .. }));
        assert_eq!(machine.kind(), BehaviorKind::Gather);
        assert_eq!(rig.scheduler.len(), pending);
    }

    #[test]
    fn tag_aliases_switch() {
        let mut rig = Rig::new();
        let mut machine = BehaviorStateMachine::new(BehaviorKind::Gather, &rig.settings);
        machine.enable(&mut rig.ctx(0.1)).unwrap();
        assert!(machine.switch_to_tag("RestBehavior", &mut rig.ctx(0.1)).unwrap());
        assert_eq!(machine.kind(), BehaviorKind::Rest);
    }

    #[test]
    fn switch_cancels_old_continuations_before_enable() {
        let mut rig = Rig::new();
        rig.spawn(EntityCategory::Block, Position::new(2.0, 0.0));
        let mut machine = BehaviorStateMachine::new(BehaviorKind::MoveBlock, &rig.settings);
        machine.enable(&mut rig.ctx(0.1)).unwrap();

        // Walk to the block and start the pickup wait.
        rig.run(&mut machine, 0.1, 5);
        let owner = ContinuationOwner::Behavior(BehaviorKind::MoveBlock);
        assert_eq!(rig.scheduler.pending_for(owner), 1);

        machine.switch_to(BehaviorKind::Gather, &mut rig.ctx(0.1)).unwrap();
        assert_eq!(rig.scheduler.pending_for(owner), 0);
        assert_eq!(
            rig.scheduler.pending_for(ContinuationOwner::Behavior(BehaviorKind::Gather)),
            1
        );

        // The cancelled pickup never fires.
        rig.run(&mut machine, 0.1, 30);
        assert!(!rig.effects.iter().any(|e| matches!(e, Effect::RemoveBlock { .. })));
    }

    #[test]
    fn exhaustion_rate_follows_active_variant() {
        let rig = Rig::new();
        let config = ExhaustionConfig::default();
        let mut machine = BehaviorStateMachine::new(BehaviorKind::Gather, &rig.settings);
        assert_eq!(machine.exhaustion_rate(&config), 1);
        machine.active = Behavior::new(BehaviorKind::Rest, &rig.settings);
        assert_eq!(machine.exhaustion_rate(&config), -10);
    }
}

//! Gather: wander until food is in range, chase it, carry it home.

use core::cmp::Ordering;
use core::f64::consts::TAU;

use habitat_types::{BehaviorKind, EntityCategory, EntityId, Position};
use rand::Rng;
use tracing::{debug, warn};

use super::{AgentBehavior, BehaviorContext, BehaviorOutcome, Effect};
use crate::error::AgentError;
use crate::scheduler::ContinuationKind;

/// Where the gatherer is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatherPhase {
    /// Roaming between random points.
    Wandering,
    /// Heading for a reserved food item.
    Chasing {
        /// The reserved food.
        food: EntityId,
    },
    /// Full; walking back to the habitat to deposit.
    Returning,
}

/// Gather variant state.
#[derive(Debug, Clone)]
pub struct Gather {
    phase: GatherPhase,
    last_check: Position,
}

impl Gather {
    /// Fresh state; the phase is reset on enable.
    pub const fn new() -> Self {
        Self {
            phase: GatherPhase::Wandering,
            last_check: Position::ORIGIN,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> GatherPhase {
        self.phase
    }

    fn pick_wander_target(ctx: &mut BehaviorContext<'_>) -> bool {
        let radius = ctx.settings.gather.wander_radius;
        for _ in 0..ctx.settings.gather.max_sample_attempts {
            let angle = ctx.rng.random_range(0.0..TAU);
            let distance = ctx.rng.random_range(0.0..=radius);
            let candidate = *ctx.position + Position::from_heading(angle).scale(distance);
            let Some(point) = ctx.world.spatial.sample_navigable_point(candidate, radius) else {
                continue;
            };
            if ctx.travel_to(point) {
                return true;
            }
        }
        debug!(agent_id = %ctx.agent, "No wander target found");
        false
    }

    /// The nearest live food not claimed by someone else: in sensor range,
    /// or remembered in the knowledge store.
    fn find_food(ctx: &BehaviorContext<'_>) -> Option<(EntityId, Position)> {
        let here = *ctx.position;
        let sensed = ctx
            .world
            .spatial
            .find_nearby(
                ctx.world.registry,
                here,
                ctx.settings.gather.food_detection_radius,
                EntityCategory::Food,
            )
            .into_iter()
            .map(|e| (e.id, e.position));
        let remembered = ctx
            .knowledge
            .known_of(EntityCategory::Food)
            .filter_map(|m| ctx.world.registry.get(m.entity))
            .map(|e| (e.id, e.position));

        sensed
            .chain(remembered)
            .filter(|(id, _)| !ctx.reservations.is_reserved_by_other(*id, ctx.agent))
            .min_by(|(ia, pa), (ib, pb)| {
                here.distance(*pa)
                    .partial_cmp(&here.distance(*pb))
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| ia.cmp(ib))
            })
    }

    fn start_wandering(&mut self, ctx: &mut BehaviorContext<'_>) {
        self.phase = GatherPhase::Wandering;
        Self::pick_wander_target(ctx);
    }

    fn start_returning(&mut self, ctx: &mut BehaviorContext<'_>) {
        debug!(agent_id = %ctx.agent, carried = ctx.fitness.current_food(), "Full, returning home");
        self.phase = GatherPhase::Returning;
        ctx.travel_to(ctx.world.habitat.position());
    }
}

impl Default for Gather {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBehavior for Gather {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Gather
    }

    fn on_enable(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError> {
        self.last_check = *ctx.position;
        if ctx.fitness.can_carry_more() {
            self.start_wandering(ctx);
        } else {
            self.start_returning(ctx);
        }
        let interval = ctx.settings.gather.retarget_interval_secs;
        ctx.schedule(BehaviorKind::Gather, interval, ContinuationKind::GatherRetarget);
        Ok(())
    }

    fn on_disable(&mut self, ctx: &mut BehaviorContext<'_>) {
        ctx.reservations.release_all(ctx.agent);
        ctx.nav.stop();
    }

    fn tick(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<BehaviorOutcome, AgentError> {
        match self.phase {
            GatherPhase::Returning => {
                if ctx.fitness.current_food() == 0 {
                    self.start_wandering(ctx);
                } else {
                    ctx.travel_to(ctx.world.habitat.position());
                }
            }
            GatherPhase::Chasing { food } => {
                let Some(target) = ctx.world.registry.get(food).copied() else {
                    warn!(
                        agent_id = %ctx.agent,
                        error = %AgentError::StaleReference { agent: ctx.agent, entity: food },
                        "Food target vanished"
                    );
                    ctx.reservations.release(food);
                    self.start_wandering(ctx);
                    return Ok(BehaviorOutcome::stay());
                };
                if ctx.position.distance(target.position) <= ctx.settings.gather.pickup_range {
                    ctx.reservations.release(food);
                    if ctx.fitness.pick_up_food()? {
                        ctx.effects.push(Effect::ConsumeFood { food });
                        debug!(
                            agent_id = %ctx.agent,
                            food = %food,
                            carried = ctx.fitness.current_food(),
                            "Picked up food"
                        );
                    }
                    if ctx.fitness.can_carry_more() {
                        self.start_wandering(ctx);
                    } else {
                        self.start_returning(ctx);
                    }
                } else {
                    ctx.travel_to(target.position);
                }
            }
            GatherPhase::Wandering => {
                if !ctx.fitness.can_carry_more() {
                    self.start_returning(ctx);
                } else if let Some((food, position)) = Self::find_food(ctx) {
                    if ctx.reservations.reserve(food, ctx.agent) {
                        self.phase = GatherPhase::Chasing { food };
                        ctx.travel_to(position);
                    }
                }
            }
        }
        Ok(BehaviorOutcome::stay())
    }

    fn on_continuation(
        &mut self,
        kind: ContinuationKind,
        ctx: &mut BehaviorContext<'_>,
    ) -> Result<BehaviorOutcome, AgentError> {
        if kind != ContinuationKind::GatherRetarget {
            return Ok(BehaviorOutcome::stay());
        }
        let here = *ctx.position;
        if self.phase == GatherPhase::Wandering
            && here.distance(self.last_check) < ctx.settings.gather.stuck_radius
        {
            Self::pick_wander_target(ctx);
        }
        self.last_check = here;
        let interval = ctx.settings.gather.retarget_interval_secs;
        ctx.schedule(BehaviorKind::Gather, interval, ContinuationKind::GatherRetarget);
        Ok(BehaviorOutcome::stay())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::BehaviorStateMachine;
    use super::super::test_rig::Rig;
    use super::*;

    fn gather(rig: &mut Rig) -> BehaviorStateMachine {
        let mut machine = BehaviorStateMachine::new(BehaviorKind::Gather, &rig.settings);
        machine.enable(&mut rig.ctx(0.1)).unwrap();
        machine
    }

    fn phase(machine: &BehaviorStateMachine) -> Option<GatherPhase> {
        match machine.active() {
            super::super::Behavior::Gather(g) => Some(g.phase()),
            _ => None,
        }
    }

    #[test]
    fn chases_and_consumes_food_in_range() {
        let mut rig = Rig::new();
        let food = rig.spawn(EntityCategory::Food, Position::new(0.0, 4.0));
        let mut machine = gather(&mut rig);

        rig.run(&mut machine, 0.1, 1);
        assert_eq!(phase(&machine), Some(GatherPhase::Chasing { food }));
        assert_eq!(rig.reservations.holder(food), Some(habitat_types::AgentId(1)));

        rig.run(&mut machine, 0.1, 20);
        assert!(rig.effects.contains(&Effect::ConsumeFood { food }));
        assert_eq!(rig.fitness.current_food(), 1);
        assert!(rig.reservations.is_empty());
    }

    #[test]
    fn food_reserved_by_another_agent_is_ignored() {
        let mut rig = Rig::new();
        let food = rig.spawn(EntityCategory::Food, Position::new(0.0, 4.0));
        rig.reservations.reserve(food, habitat_types::AgentId(2));
        let mut machine = gather(&mut rig);
        rig.run(&mut machine, 0.1, 1);
        assert_eq!(phase(&machine), Some(GatherPhase::Wandering));
    }

    #[test]
    fn vanished_food_falls_back_to_wandering() {
        let mut rig = Rig::new();
        let food = rig.spawn(EntityCategory::Food, Position::new(0.0, 8.0));
        let mut machine = gather(&mut rig);
        rig.run(&mut machine, 0.1, 1);
        assert_eq!(phase(&machine), Some(GatherPhase::Chasing { food }));

        rig.registry.remove(food);
        rig.run(&mut machine, 0.1, 1);
        assert_eq!(phase(&machine), Some(GatherPhase::Wandering));
        assert!(rig.reservations.is_empty());
    }

    #[test]
    fn full_gatherer_returns_home() {
        let mut rig = Rig::new();
        rig.fitness.set_state(3, 0, 100);
        let mut machine = gather(&mut rig);
        assert_eq!(phase(&machine), Some(GatherPhase::Returning));
        assert_eq!(rig.nav.destination(), Some(rig.habitat.position()));

        rig.fitness.deposit_all().unwrap();
        rig.run(&mut machine, 0.1, 1);
        assert_eq!(phase(&machine), Some(GatherPhase::Wandering));
    }

    #[test]
    fn remembered_food_outside_sensor_range_is_chased() {
        let mut rig = Rig::new();
        let food = rig.spawn(EntityCategory::Food, Position::new(25.0, 0.0));
        rig.knowledge.record(habitat_types::KnownMarker {
            entity: food,
            category: EntityCategory::Food,
            position: Position::new(25.0, 0.0),
        });
        let mut machine = gather(&mut rig);
        rig.run(&mut machine, 0.1, 1);
        assert_eq!(phase(&machine), Some(GatherPhase::Chasing { food }));
    }

    #[test]
    fn retarget_timer_keeps_rearming() {
        let mut rig = Rig::new();
        let mut machine = gather(&mut rig);
        rig.run(&mut machine, 0.5, 20);
        assert!(rig.scheduler.is_pending(ContinuationKind::GatherRetarget));
        assert_eq!(
            rig.scheduler
                .pending_for(crate::scheduler::ContinuationOwner::Behavior(BehaviorKind::Gather)),
            1
        );
    }
}

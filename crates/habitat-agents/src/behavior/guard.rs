//! Guard: hold the habitat, patrol around it, chase pests that come close.

use core::f64::consts::TAU;

use habitat_types::{BehaviorKind, EntityCategory, EntityId, Position};
use rand::Rng;
use tracing::{debug, info, warn};

use super::{AgentBehavior, BehaviorContext, BehaviorOutcome, Effect};
use crate::error::AgentError;
use crate::scheduler::SimTime;

/// Guard sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardPhase {
    /// Walking back to the habitat.
    GoTowardsHabitat,
    /// Wandering near the habitat.
    PatrolHabitat,
    /// Pursuing a pest.
    ChasePest {
        /// The pest being chased.
        pest: EntityId,
        /// When the chase started.
        since: SimTime,
    },
}

/// Guard variant state.
#[derive(Debug, Clone)]
pub struct Guard {
    phase: GuardPhase,
    patrol_timer: f64,
    kills: u32,
}

impl Guard {
    /// Fresh state.
    pub const fn new() -> Self {
        Self {
            phase: GuardPhase::GoTowardsHabitat,
            patrol_timer: 0.0,
            kills: 0,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> GuardPhase {
        self.phase
    }

    /// Pests caught since enable.
    pub const fn kills(&self) -> u32 {
        self.kills
    }

    fn go_home(&mut self, ctx: &mut BehaviorContext<'_>) {
        self.phase = GuardPhase::GoTowardsHabitat;
        ctx.travel_to(ctx.world.habitat.position());
    }

    fn next_patrol_point(ctx: &mut BehaviorContext<'_>) {
        let radius = ctx.settings.guard.patrol_radius;
        let angle = ctx.rng.random_range(0.0..TAU);
        let distance = ctx.rng.random_range(0.0..=radius);
        let candidate = ctx.world.habitat.position() + Position::from_heading(angle).scale(distance);
        if let Some(point) = ctx.world.spatial.sample_navigable_point(candidate, radius) {
            ctx.travel_to(point);
        }
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBehavior for Guard {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Guard
    }

    fn on_enable(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError> {
        *self = Self::new();
        self.go_home(ctx);
        Ok(())
    }

    fn tick(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<BehaviorOutcome, AgentError> {
        let config = ctx.settings.guard.clone();
        let here = *ctx.position;
        let home = ctx.world.habitat.position();

        match self.phase {
            GuardPhase::GoTowardsHabitat => {
                if here.distance(home) <= config.habitat_stopping_distance {
                    ctx.nav.stop();
                    self.phase = GuardPhase::PatrolHabitat;
                    self.patrol_timer = 0.0;
                    debug!(agent_id = %ctx.agent, "Guard reached habitat, patrolling");
                } else {
                    ctx.travel_to(home);
                }
            }
            GuardPhase::PatrolHabitat => {
                let pest = ctx.world.spatial.find_nearest(
                    ctx.world.registry,
                    here,
                    config.detection_radius,
                    EntityCategory::Enemy,
                );
                if let Some(pest) = pest {
                    info!(agent_id = %ctx.agent, pest = %pest.id, "Guard chasing pest");
                    self.phase = GuardPhase::ChasePest {
                        pest: pest.id,
                        since: ctx.now,
                    };
                    ctx.travel_to(pest.position);
                } else {
                    self.patrol_timer += ctx.dt;
                    if self.patrol_timer >= config.patrol_interval_secs {
                        self.patrol_timer = 0.0;
                        Self::next_patrol_point(ctx);
                    }
                }
            }
            GuardPhase::ChasePest { pest, since } => {
                let Some(target) = ctx.world.registry.get(pest).copied() else {
                    warn!(
                        agent_id = %ctx.agent,
                        error = %AgentError::StaleReference { agent: ctx.agent, entity: pest },
                        "Pest vanished mid-chase"
                    );
                    self.go_home(ctx);
                    return Ok(BehaviorOutcome::stay());
                };
                let timed_out = ctx.now.since(since).as_secs_f64() >= config.chase_duration_secs;
                let too_far = here.distance(home) > config.max_chase_distance;
                if timed_out || too_far {
                    debug!(agent_id = %ctx.agent, timed_out, too_far, "Guard abandoning chase");
                    self.go_home(ctx);
                } else if here.distance(target.position) <= config.kill_range {
                    ctx.effects.push(Effect::KillPest { pest });
                    self.kills = self.kills.saturating_add(1);
                    info!(agent_id = %ctx.agent, pest = %pest, "Guard caught pest");
                    ctx.nav.stop();
                    self.phase = GuardPhase::PatrolHabitat;
                    self.patrol_timer = 0.0;
                } else {
                    ctx.travel_to(target.position);
                }
            }
        }
        Ok(BehaviorOutcome::stay())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::test_rig::Rig;
    use super::super::{Behavior, BehaviorStateMachine};
    use super::*;

    fn phase(machine: &BehaviorStateMachine) -> Option<GuardPhase> {
        match machine.active() {
            Behavior::Guard(g) => Some(g.phase()),
            _ => None,
        }
    }

    fn guard_at_home(rig: &mut Rig) -> BehaviorStateMachine {
        rig.position = rig.habitat.position();
        let mut machine = BehaviorStateMachine::new(BehaviorKind::Guard, &rig.settings);
        machine.enable(&mut rig.ctx(0.1)).unwrap();
        rig.run(&mut machine, 0.1, 1);
        machine
    }

    #[test]
    fn walks_home_then_patrols() {
        let mut rig = Rig::new();
        let mut machine = BehaviorStateMachine::new(BehaviorKind::Guard, &rig.settings);
        machine.enable(&mut rig.ctx(0.1)).unwrap();
        assert_eq!(phase(&machine), Some(GuardPhase::GoTowardsHabitat));

        rig.run(&mut machine, 0.1, 40);
        assert_eq!(phase(&machine), Some(GuardPhase::PatrolHabitat));
    }

    #[test]
    fn chases_and_kills_pest() {
        let mut rig = Rig::new();
        let mut machine = guard_at_home(&mut rig);
        let pest = rig.spawn(EntityCategory::Enemy, Position::new(14.0, 0.0));

        rig.run(&mut machine, 0.1, 1);
        assert!(matches!(phase(&machine), Some(GuardPhase::ChasePest { pest: p, .. }) if p == pest));

        rig.run(&mut machine, 0.1, 15);
        assert!(rig.effects.contains(&Effect::KillPest { pest }));
    }

    #[test]
    fn chase_times_out() {
        let mut rig = Rig::new();
        rig.settings.guard.chase_duration_secs = 0.5;
        rig.settings.guard.kill_range = 0.0;
        let mut machine = guard_at_home(&mut rig);
        // Out of reach in the time available.
        rig.spawn(EntityCategory::Enemy, Position::new(19.0, 0.0));

        rig.run(&mut machine, 0.1, 1);
        assert!(matches!(phase(&machine), Some(GuardPhase::ChasePest { .. })));
        rig.run(&mut machine, 0.1, 5);
        assert_eq!(phase(&machine), Some(GuardPhase::GoTowardsHabitat));
    }

    #[test]
    fn vanished_pest_sends_guard_home() {
        let mut rig = Rig::new();
        let mut machine = guard_at_home(&mut rig);
        let pest = rig.spawn(EntityCategory::Enemy, Position::new(16.0, 0.0));
        rig.run(&mut machine, 0.1, 1);
        rig.registry.remove(pest);
        rig.run(&mut machine, 0.1, 1);
        assert_eq!(phase(&machine), Some(GuardPhase::GoTowardsHabitat));
    }
}

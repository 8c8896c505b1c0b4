//! `BuildWall`: fetch a wall slot at the habitat, walk there, build.
//!
//! Cycle: Idle, `MoveToHabitat`, `WaitAtHabitat` (1 s), `MoveToBuildPosition`,
//! `WaitAtBuildPosition` (3 s), `CreateWall`, back to Idle. After
//! `total_walls` cycles the variant completes and stays inert until it is
//! switched away from.

use habitat_types::{BehaviorKind, Position};
use tracing::{debug, info, warn};

use super::{AgentBehavior, BehaviorContext, BehaviorOutcome, Effect};
use crate::error::AgentError;
use crate::scheduler::ContinuationKind;

/// `BuildWall` sub-state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuildWallPhase {
    /// Deciding whether another wall is needed.
    Idle,
    /// Walking to the habitat to collect the build order.
    MoveToHabitat,
    /// Pausing at the habitat.
    WaitAtHabitat,
    /// Walking to the wall slot.
    MoveToBuildPosition {
        /// The wall slot being built.
        site: Position,
    },
    /// Pausing at the wall slot.
    WaitAtBuildPosition {
        /// The wall slot being built.
        site: Position,
    },
    /// Raising the wall.
    CreateWall {
        /// The wall slot being built.
        site: Position,
    },
    /// `total_walls` reached. The behavior stays active but emits nothing
    /// until the agent is switched to another behavior.
    Complete,
}

/// `BuildWall` variant state.
#[derive(Debug, Clone)]
pub struct BuildWall {
    phase: BuildWallPhase,
    walls_built: u32,
    total_walls: u32,
    completed: bool,
    reported_missing_slots: bool,
}

impl BuildWall {
    /// Fresh state building `total_walls` walls.
    pub const fn new(total_walls: u32) -> Self {
        Self {
            phase: BuildWallPhase::Idle,
            walls_built: 0,
            total_walls,
            completed: false,
            reported_missing_slots: false,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> BuildWallPhase {
        self.phase
    }

    /// Walls built since enable.
    pub const fn walls_built(&self) -> u32 {
        self.walls_built
    }

    /// Whether every wall is done.
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Park in [`BuildWallPhase::Complete`]. The variant is not disabled;
    /// later updates are no-ops.
    fn complete(&mut self, ctx: &mut BehaviorContext<'_>) {
        self.phase = BuildWallPhase::Complete;
        self.completed = true;
        ctx.nav.stop();
        info!(agent_id = %ctx.agent, walls_built = self.walls_built, "Wall building complete");
    }

    fn arrived(ctx: &BehaviorContext<'_>, target: Position) -> bool {
        let here = *ctx.position;
        ctx.nav.has_arrived(here) || here.distance(target) <= ctx.settings.build_wall.stop_distance
    }
}

impl AgentBehavior for BuildWall {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::BuildWall
    }

    fn on_enable(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError> {
        *self = Self::new(ctx.settings.build_wall.total_walls);
        Ok(())
    }

    fn tick(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<BehaviorOutcome, AgentError> {
        let home = ctx.world.habitat.position();
        match self.phase {
            BuildWallPhase::Idle => {
                if self.walls_built >= self.total_walls {
                    self.complete(ctx);
                } else if ctx.world.habitat.wall_slots().is_empty() {
                    if !self.reported_missing_slots {
                        self.reported_missing_slots = true;
                        return Err(AgentError::MissingDependency {
                            agent: ctx.agent,
                            dependency: "habitat wall slots".to_owned(),
                        });
                    }
                } else if ctx.world.habitat.next_wall_slot().is_none() {
                    debug!(agent_id = %ctx.agent, "Every wall slot is already built");
                    self.complete(ctx);
                } else {
                    self.phase = BuildWallPhase::MoveToHabitat;
                    ctx.travel_to(home);
                }
            }
            BuildWallPhase::MoveToHabitat => {
                if Self::arrived(ctx, home) {
                    ctx.nav.stop();
                    self.phase = BuildWallPhase::WaitAtHabitat;
                    let wait = ctx.settings.build_wall.wait_at_habitat_secs;
                    ctx.schedule(BehaviorKind::BuildWall, wait, ContinuationKind::HabitatWaitElapsed);
                } else {
                    ctx.travel_to(home);
                }
            }
            BuildWallPhase::MoveToBuildPosition { site } => {
                if Self::arrived(ctx, site) {
                    ctx.nav.stop();
                    self.phase = BuildWallPhase::WaitAtBuildPosition { site };
                    let wait = ctx.settings.build_wall.wait_at_build_secs;
                    ctx.schedule(BehaviorKind::BuildWall, wait, ContinuationKind::BuildSiteWaitElapsed);
                }
            }
            BuildWallPhase::CreateWall { site } => {
                ctx.effects.push(Effect::BuildWall);
                self.walls_built = self.walls_built.saturating_add(1);
                info!(
                    agent_id = %ctx.agent,
                    site = %site,
                    walls_built = self.walls_built,
                    total_walls = self.total_walls,
                    "Wall created"
                );
                self.phase = BuildWallPhase::Idle;
            }
            BuildWallPhase::WaitAtHabitat
            | BuildWallPhase::WaitAtBuildPosition { .. }
            | BuildWallPhase::Complete => {}
        }
        Ok(BehaviorOutcome::stay())
    }

    fn on_continuation(
        &mut self,
        kind: ContinuationKind,
        ctx: &mut BehaviorContext<'_>,
    ) -> Result<BehaviorOutcome, AgentError> {
        match (kind, self.phase) {
            (ContinuationKind::HabitatWaitElapsed, BuildWallPhase::WaitAtHabitat) => {
                let Some(site) = ctx.world.habitat.next_wall_slot() else {
                    self.complete(ctx);
                    return Ok(BehaviorOutcome::stay());
                };
                let radius = ctx.settings.build_wall.nav_sample_radius;
                let reachable = ctx
                    .world
                    .spatial
                    .sample_navigable_point(site, radius)
                    .is_some_and(|point| ctx.travel_to(point));
                if reachable {
                    self.phase = BuildWallPhase::MoveToBuildPosition { site };
                } else {
                    warn!(agent_id = %ctx.agent, site = %site, "Wall slot is not reachable");
                    self.phase = BuildWallPhase::Idle;
                }
            }
            (ContinuationKind::BuildSiteWaitElapsed, BuildWallPhase::WaitAtBuildPosition { site }) => {
                self.phase = BuildWallPhase::CreateWall { site };
            }
            _ => {}
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
    use habitat_world::Habitat;

    fn state(machine: &BehaviorStateMachine) -> Option<(BuildWallPhase, u32, bool)> {
        match machine.active() {
            Behavior::BuildWall(b) => Some((b.phase(), b.walls_built(), b.is_completed())),
            _ => None,
        }
    }

    fn walls_requested(rig: &Rig) -> usize {
        rig.effects.iter().filter(|e| **e == Effect::BuildWall).count()
    }

    #[test]
    fn builds_total_walls_then_completes() {
        let mut rig = Rig::new();
        rig.settings.build_wall.total_walls = 2;
        let mut machine = BehaviorStateMachine::new(BehaviorKind::BuildWall, &rig.settings);
        machine.enable(&mut rig.ctx(0.1)).unwrap();

        let mut visited = Vec::new();
        for _ in 0..300 {
            rig.run(&mut machine, 0.1, 1);
            let (phase, _, _) = state(&machine).unwrap();
            if visited.last() != Some(&phase) {
                visited.push(phase);
            }
        }

        assert_eq!(walls_requested(&rig), 2);
        let (phase, built, completed) = state(&machine).unwrap();
        assert_eq!(phase, BuildWallPhase::Complete);
        assert_eq!(built, 2);
        assert!(completed);

        let count = |wanted: fn(&BuildWallPhase) -> bool| visited.iter().filter(|p| wanted(p)).count();
        assert_eq!(count(|p| *p == BuildWallPhase::WaitAtHabitat), 2);
        assert_eq!(count(|p| matches!(p, BuildWallPhase::WaitAtBuildPosition { .. })), 2);
        assert_eq!(count(|p| matches!(p, BuildWallPhase::MoveToBuildPosition { .. })), 2);

        // One more tick changes nothing.
        let effects = rig.effects.len();
        rig.run(&mut machine, 0.1, 1);
        assert_eq!(state(&machine).unwrap(), (BuildWallPhase::Complete, 2, true));
        assert_eq!(rig.effects.len(), effects);
        assert!(rig.scheduler.is_empty());
    }

    #[test]
    fn re_enable_resets_progress() {
        let mut rig = Rig::new();
        rig.settings.build_wall.total_walls = 1;
        let mut machine = BehaviorStateMachine::new(BehaviorKind::BuildWall, &rig.settings);
        machine.enable(&mut rig.ctx(0.1)).unwrap();
        rig.run(&mut machine, 0.1, 200);
        assert_eq!(state(&machine).unwrap().1, 1);

        machine.switch_to(BehaviorKind::Rest, &mut rig.ctx(0.1)).unwrap();
        machine.switch_to(BehaviorKind::BuildWall, &mut rig.ctx(0.1)).unwrap();
        assert_eq!(state(&machine).unwrap(), (BuildWallPhase::Idle, 0, false));
    }

    #[test]
    fn habitat_without_slots_reports_missing_dependency_once() {
        let mut rig = Rig::new();
        rig.habitat = Habitat::new(Position::new(10.0, 0.0), 3.0, &[], 0);
        let mut machine = BehaviorStateMachine::new(BehaviorKind::BuildWall, &rig.settings);
        machine.enable(&mut rig.ctx(0.1)).unwrap();

        let err = machine.tick(&mut rig.ctx(0.1)).unwrap_err();
        assert!(matches!(err, AgentError::MissingDependency { .. }));
        assert!(machine.tick(&mut rig.ctx(0.1)).is_ok());
        assert_eq!(state(&machine).unwrap().0, BuildWallPhase::Idle);
    }

    #[test]
    fn all_slots_built_completes_immediately() {
        let mut rig = Rig::new();
        rig.habitat.build_next_wall(0);
        rig.habitat.build_next_wall(0);
        let mut machine = BehaviorStateMachine::new(BehaviorKind::BuildWall, &rig.settings);
        machine.enable(&mut rig.ctx(0.1)).unwrap();
        rig.run(&mut machine, 0.1, 1);
        assert_eq!(state(&machine).unwrap(), (BuildWallPhase::Complete, 0, true));
    }
}

//! `MoveBlock`: haul nearby blocks to the habitat one at a time.
//!
//! Targets are the blocks within the search radius when the variant is
//! enabled, nearest first. Once the list runs out the agent moves on to
//! building walls with what it delivered.

use std::collections::VecDeque;

use habitat_types::{BehaviorKind, EntityCategory, EntityId, Position};
use tracing::{debug, info, warn};

use super::{AgentBehavior, BehaviorContext, BehaviorOutcome, Effect};
use crate::error::AgentError;
use crate::scheduler::ContinuationKind;

/// Distance in front of the agent where a dropped block lands.
const DROP_DISTANCE: f64 = 1.0;

/// `MoveBlock` sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveBlockPhase {
    /// Picking the next target.
    Idle,
    /// Walking to a block.
    MoveToBlock {
        /// Target block.
        block: EntityId,
    },
    /// Pausing before the pickup.
    WaitBeforePickup {
        /// Target block.
        block: EntityId,
    },
    /// Lifting the block.
    PickUpBlock {
        /// Target block.
        block: EntityId,
    },
    /// Pausing after the pickup.
    WaitAfterPickup,
    /// Carrying the block home.
    MoveToHabitat,
    /// Handing the block over.
    DropBlockAtHabitat,
    /// No targets left.
    Complete,
}

/// `MoveBlock` variant state.
#[derive(Debug, Clone)]
pub struct MoveBlock {
    phase: MoveBlockPhase,
    targets: VecDeque<EntityId>,
    carrying: bool,
    delivered: u32,
}

impl MoveBlock {
    /// Fresh state with no targets.
    pub const fn new() -> Self {
        Self {
            phase: MoveBlockPhase::Idle,
            targets: VecDeque::new(),
            carrying: false,
            delivered: 0,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> MoveBlockPhase {
        self.phase
    }

    /// Whether a block is being carried.
    pub const fn is_carrying(&self) -> bool {
        self.carrying
    }

    /// Blocks delivered since enable.
    pub const fn delivered(&self) -> u32 {
        self.delivered
    }

    /// Blocks still to fetch.
    pub fn remaining_targets(&self) -> usize {
        self.targets.len()
    }

    fn lost_target(&mut self, ctx: &BehaviorContext<'_>, block: EntityId) {
        warn!(
            agent_id = %ctx.agent,
            error = %AgentError::StaleReference { agent: ctx.agent, entity: block },
            "Target block vanished"
        );
        self.phase = MoveBlockPhase::Idle;
    }
}

impl Default for MoveBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBehavior for MoveBlock {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::MoveBlock
    }

    fn on_enable(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError> {
        *self = Self::new();
        self.targets = ctx
            .world
            .spatial
            .find_nearby(
                ctx.world.registry,
                *ctx.position,
                ctx.settings.move_block.search_radius,
                EntityCategory::Block,
            )
            .into_iter()
            .map(|e| e.id)
            .collect();
        debug!(agent_id = %ctx.agent, targets = self.targets.len(), "Block targets selected");
        Ok(())
    }

    fn on_disable(&mut self, ctx: &mut BehaviorContext<'_>) {
        ctx.nav.stop();
        if self.carrying {
            let position = *ctx.position + Position::from_heading(*ctx.heading).scale(DROP_DISTANCE);
            ctx.effects.push(Effect::DropBlock { position });
            self.carrying = false;
            debug!(agent_id = %ctx.agent, %position, "Dropped carried block");
        }
    }

    fn tick(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<BehaviorOutcome, AgentError> {
        let config = ctx.settings.move_block.clone();
        let here = *ctx.position;
        match self.phase {
            MoveBlockPhase::Idle => {
                let Some(block) = self.targets.pop_front() else {
                    self.phase = MoveBlockPhase::Complete;
                    info!(agent_id = %ctx.agent, delivered = self.delivered, "Block hauling complete");
                    return Ok(BehaviorOutcome::switch(BehaviorKind::BuildWall));
                };
                match ctx.world.registry.get(block) {
                    Some(target) => {
                        self.phase = MoveBlockPhase::MoveToBlock { block };
                        ctx.travel_to(target.position);
                    }
                    None => self.lost_target(ctx, block),
                }
            }
            MoveBlockPhase::MoveToBlock { block } => match ctx.world.registry.get(block) {
                None => self.lost_target(ctx, block),
                Some(target) if here.distance(target.position) <= config.pickup_range => {
                    ctx.nav.stop();
                    self.phase = MoveBlockPhase::WaitBeforePickup { block };
                    ctx.schedule(
                        BehaviorKind::MoveBlock,
                        config.pickup_delay_secs,
                        ContinuationKind::PickupWaitElapsed,
                    );
                }
                Some(target) => {
                    let position = target.position;
                    ctx.travel_to(position);
                }
            },
            MoveBlockPhase::WaitBeforePickup { block } => {
                if !ctx.world.registry.contains(block) {
                    self.lost_target(ctx, block);
                }
            }
            MoveBlockPhase::PickUpBlock { block } => {
                if ctx.world.registry.contains(block) {
                    ctx.effects.push(Effect::RemoveBlock { block });
                    self.carrying = true;
                    self.phase = MoveBlockPhase::WaitAfterPickup;
                    ctx.schedule(
                        BehaviorKind::MoveBlock,
                        config.after_pickup_delay_secs,
                        ContinuationKind::AfterPickupWaitElapsed,
                    );
                    debug!(agent_id = %ctx.agent, block = %block, "Picked up block");
                } else {
                    self.lost_target(ctx, block);
                }
            }
            MoveBlockPhase::MoveToHabitat => {
                let home = ctx.world.habitat.position();
                if ctx.world.habitat.contains(here) || ctx.nav.has_arrived(here) {
                    ctx.nav.stop();
                    self.phase = MoveBlockPhase::DropBlockAtHabitat;
                } else {
                    ctx.travel_to(home);
                }
            }
            MoveBlockPhase::DropBlockAtHabitat => {
                ctx.effects.push(Effect::DeliverBlock);
                self.carrying = false;
                self.delivered = self.delivered.saturating_add(1);
                info!(agent_id = %ctx.agent, delivered = self.delivered, "Block delivered");
                self.phase = MoveBlockPhase::Idle;
            }
            MoveBlockPhase::WaitAfterPickup | MoveBlockPhase::Complete => {}
        }
        Ok(BehaviorOutcome::stay())
    }

    fn on_continuation(
        &mut self,
        kind: ContinuationKind,
        ctx: &mut BehaviorContext<'_>,
    ) -> Result<BehaviorOutcome, AgentError> {
        match (kind, self.phase) {
            (ContinuationKind::PickupWaitElapsed, MoveBlockPhase::WaitBeforePickup { block }) => {
                self.phase = MoveBlockPhase::PickUpBlock { block };
            }
            (ContinuationKind::AfterPickupWaitElapsed, MoveBlockPhase::WaitAfterPickup) => {
                self.phase = MoveBlockPhase::MoveToHabitat;
                ctx.travel_to(ctx.world.habitat.position());
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

    fn move_block(machine: &BehaviorStateMachine) -> Option<&MoveBlock> {
        match machine.active() {
            Behavior::MoveBlock(m) => Some(m),
            _ => None,
        }
    }

    #[test]
    fn targets_are_nearest_first() {
        let mut rig = Rig::new();
        let far = rig.spawn(EntityCategory::Block, Position::new(0.0, 9.0));
        let near = rig.spawn(EntityCategory::Block, Position::new(0.0, 3.0));
        rig.spawn(EntityCategory::Block, Position::new(0.0, 90.0));
        let mut machine = BehaviorStateMachine::new(BehaviorKind::MoveBlock, &rig.settings);
        machine.enable(&mut rig.ctx(0.1)).unwrap();
        assert_eq!(move_block(&machine).unwrap().remaining_targets(), 2);

        rig.run(&mut machine, 0.1, 1);
        assert_eq!(
            move_block(&machine).unwrap().phase(),
            MoveBlockPhase::MoveToBlock { block: near }
        );
        assert_ne!(near, far);
    }

    #[test]
    fn hauls_every_block_then_chains_into_build_wall() {
        let mut rig = Rig::new();
        let a = rig.spawn(EntityCategory::Block, Position::new(2.0, 0.0));
        let b = rig.spawn(EntityCategory::Block, Position::new(4.0, 3.0));
        let mut machine = BehaviorStateMachine::new(BehaviorKind::MoveBlock, &rig.settings);
        machine.enable(&mut rig.ctx(0.1)).unwrap();

        for _ in 0..300 {
            rig.run(&mut machine, 0.1, 1);
            // Mirror the simulation: picked-up blocks leave the world.
            let removed: Vec<EntityId> = rig
                .effects
                .iter()
                .filter_map(|e| match e {
                    Effect::RemoveBlock { block } => Some(*block),
                    _ => None,
                })
                .collect();
            for block in removed {
                rig.registry.remove(block);
            }
            if machine.kind() == BehaviorKind::BuildWall {
                break;
            }
        }

        assert_eq!(machine.kind(), BehaviorKind::BuildWall);
        let delivered = rig.effects.iter().filter(|e| **e == Effect::DeliverBlock).count();
        assert_eq!(delivered, 2);
        assert!(rig.effects.contains(&Effect::RemoveBlock { block: a }));
        assert!(rig.effects.contains(&Effect::RemoveBlock { block: b }));
    }

    #[test]
    fn vanished_target_falls_back_to_idle() {
        let mut rig = Rig::new();
        let block = rig.spawn(EntityCategory::Block, Position::new(0.0, 8.0));
        let mut machine = BehaviorStateMachine::new(BehaviorKind::MoveBlock, &rig.settings);
        machine.enable(&mut rig.ctx(0.1)).unwrap();
        rig.run(&mut machine, 0.1, 1);
        rig.registry.remove(block);
        rig.run(&mut machine, 0.1, 1);
        assert_eq!(move_block(&machine).unwrap().phase(), MoveBlockPhase::Idle);
        assert!(!rig.effects.iter().any(|e| matches!(e, Effect::RemoveBlock { .. })));
    }

    #[test]
    fn disabling_while_carrying_drops_the_block() {
        let mut rig = Rig::new();
        rig.spawn(EntityCategory::Block, Position::new(1.0, 0.0));
        let mut machine = BehaviorStateMachine::new(BehaviorKind::MoveBlock, &rig.settings);
        machine.enable(&mut rig.ctx(0.1)).unwrap();
        // Pickup wait plus one tick to lift.
        rig.run(&mut machine, 0.1, 13);
        assert!(move_block(&machine).unwrap().is_carrying());

        rig.heading = 0.0;
        machine.switch_to(BehaviorKind::Rest, &mut rig.ctx(0.1)).unwrap();
        let dropped = rig.effects.iter().find_map(|e| match e {
            Effect::DropBlock { position } => Some(*position),
            _ => None,
        });
        let expected = rig.position + Position::new(DROP_DISTANCE, 0.0);
        assert!(dropped.unwrap().approx_eq(expected, 1e-9));
    }
}

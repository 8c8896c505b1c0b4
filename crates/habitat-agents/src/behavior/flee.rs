//! Flee: run directly away from the nearest hostile.
//!
//! The escape direction is smoothed by linear interpolation each tick, so
//! the agent curves away rather than snapping. With no hostile left in
//! range the agent stops and turns to face where the last threat was.

use habitat_types::{BehaviorKind, EntityCategory, Position};

use super::{AgentBehavior, BehaviorContext, BehaviorOutcome};
use crate::error::AgentError;

/// Flee variant state.
#[derive(Debug, Clone, Default)]
pub struct Flee {
    direction: Position,
    last_threat: Option<Position>,
}

impl Flee {
    /// Fresh state.
    pub const fn new() -> Self {
        Self {
            direction: Position::ORIGIN,
            last_threat: None,
        }
    }

    /// Current smoothed escape direction (zero when not fleeing).
    pub const fn direction(&self) -> Position {
        self.direction
    }

    /// Where the last hostile was seen.
    pub const fn last_threat(&self) -> Option<Position> {
        self.last_threat
    }
}

impl AgentBehavior for Flee {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Flee
    }

    fn on_enable(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError> {
        *self = Self::new();
        // Movement is driven directly, not through the pathfinder.
        ctx.nav.stop();
        Ok(())
    }

    fn tick(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<BehaviorOutcome, AgentError> {
        let config = ctx.settings.flee.clone();
        let here = *ctx.position;
        let threat = ctx.world.spatial.find_nearest(
            ctx.world.registry,
            here,
            config.flee_radius,
            EntityCategory::Enemy,
        );

        let Some(threat) = threat else {
            self.direction = Position::ORIGIN;
            if let Some(last) = self.last_threat {
                *ctx.heading = (last - here).heading();
            }
            return Ok(BehaviorOutcome::stay());
        };

        self.last_threat = Some(threat.position);
        let away = (here - threat.position).normalized();
        self.direction = if self.direction.length() <= f64::EPSILON {
            away
        } else {
            self.direction.lerp(away, config.smooth_factor).normalized()
        };

        let step = self.direction.scale(config.flee_speed * ctx.dt);
        if let Some(next) = ctx
            .world
            .spatial
            .sample_navigable_point(here + step, step.length() + 1.0)
        {
            *ctx.position = next;
        }
        if self.direction.length() > f64::EPSILON {
            *ctx.heading = self.direction.heading();
        }
        Ok(BehaviorOutcome::stay())
    }
}

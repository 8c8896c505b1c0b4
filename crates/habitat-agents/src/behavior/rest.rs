//! Rest: stand still, turn slowly in place, recover exhaustion.

use habitat_types::BehaviorKind;

use super::{AgentBehavior, BehaviorContext, BehaviorOutcome};
use crate::config::ExhaustionConfig;
use crate::error::AgentError;

/// Rest variant state.
#[derive(Debug, Clone, Default)]
pub struct Rest {
    rested_secs: f64,
}

impl Rest {
    /// Fresh state.
    pub const fn new() -> Self {
        Self { rested_secs: 0.0 }
    }

    /// Seconds spent resting since enable.
    pub const fn rested_secs(&self) -> f64 {
        self.rested_secs
    }
}

impl AgentBehavior for Rest {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Rest
    }

    fn on_enable(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError> {
        *self = Self::new();
        ctx.nav.stop();
        Ok(())
    }

    fn tick(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<BehaviorOutcome, AgentError> {
        self.rested_secs += ctx.dt;
        *ctx.heading = (*ctx.heading + ctx.settings.rest.spin_rate * ctx.dt).rem_euclid(core::f64::consts::TAU);
        Ok(BehaviorOutcome::stay())
    }

    fn exhaustion_rate(&self, config: &ExhaustionConfig) -> i32 {
        config.rest_rate
    }
}

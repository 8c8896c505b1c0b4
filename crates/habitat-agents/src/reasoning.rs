//! Remote reasoning update flags.
//!
//! An external reasoning service decides when it wants a fresh snapshot of
//! an agent. The agent raises its "update requested" flag when an enemy is
//! newly detected, when the last enemy has stayed gone for a buffer delay,
//! on a periodic timeout, or on a manual request. The tick cycle drains the
//! flag with [`ReasoningTrigger::take_update_request`].

use habitat_types::AgentId;
use tracing::debug;

use crate::config::ReasoningTriggerConfig;
use crate::scheduler::{ContinuationKind, ContinuationOwner, Scheduler, SimTime, secs};

/// Why an update was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReason {
    /// An enemy came into detection range.
    EnemyDetected,
    /// The last enemy left range and stayed away.
    EnemyDeparted,
    /// The periodic interval elapsed.
    Periodic,
    /// Someone asked explicitly.
    Manual,
}

/// Per-agent update-request state.
#[derive(Debug, Clone)]
pub struct ReasoningTrigger {
    config: ReasoningTriggerConfig,
    requested: Option<UpdateReason>,
    enemy_in_range: bool,
}

impl ReasoningTrigger {
    /// Idle trigger; call [`Self::start`] to arm the periodic timer.
    pub const fn new(config: ReasoningTriggerConfig) -> Self {
        Self {
            config,
            requested: None,
            enemy_in_range: false,
        }
    }

    /// Arm the periodic timeout.
    pub fn start(&self, scheduler: &mut Scheduler, now: SimTime) {
        scheduler.schedule(
            now,
            secs(self.config.periodic_interval_secs),
            ContinuationOwner::Manager,
            ContinuationKind::ReasoningTimeout,
        );
    }

    /// Detection radius used by [`Self::observe_enemies`].
    pub const fn detection_radius(&self) -> f64 {
        self.config.enemy_detection_radius
    }

    /// Feed this tick's "is any enemy in range" result.
    pub fn observe_enemies(&mut self, agent: AgentId, in_range: bool, scheduler: &mut Scheduler, now: SimTime) {
        match (self.enemy_in_range, in_range) {
            (false, true) => {
                scheduler.cancel_kind(ContinuationKind::EnemyDepartureConfirmed);
                debug!(agent_id = %agent, "Enemy detected");
                self.request(UpdateReason::EnemyDetected);
            }
            (true, false) => {
                scheduler.schedule(
                    now,
                    secs(self.config.buffer_delay_secs),
                    ContinuationOwner::Manager,
                    ContinuationKind::EnemyDepartureConfirmed,
                );
            }
            _ => {}
        }
        self.enemy_in_range = in_range;
    }

    /// Handle a due reasoning continuation.
    pub fn on_continuation(&mut self, kind: ContinuationKind, scheduler: &mut Scheduler, now: SimTime) {
        match kind {
            ContinuationKind::EnemyDepartureConfirmed if !self.enemy_in_range => {
                self.request(UpdateReason::EnemyDeparted);
            }
            ContinuationKind::ReasoningTimeout => {
                self.request(UpdateReason::Periodic);
                self.start(scheduler, now);
            }
            _ => {}
        }
    }

    /// Raise the flag by hand.
    pub fn request_update(&mut self) {
        self.request(UpdateReason::Manual);
    }

    fn request(&mut self, reason: UpdateReason) {
        if self.requested.is_none() {
            self.requested = Some(reason);
        }
    }

    /// Whether an update is pending.
    pub const fn is_update_requested(&self) -> bool {
        self.requested.is_some()
    }

    /// Whether an enemy was in range on the last check.
    pub const fn enemy_in_range(&self) -> bool {
        self.enemy_in_range
    }

    /// Clear and return the pending request.
    pub fn take_update_request(&mut self) -> Option<UpdateReason> {
        self.requested.take()
    }
}

//! Run control shared between the tick loop and its host.
//!
//! The host (signal handler, test harness) can stop the run without
//! holding the simulation state. The stop flag is an atomic so the tick
//! loop reads it without locking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::SimulationBoundsConfig;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Reached `max_ticks`.
    MaxTicksReached,
    /// Reached `max_real_time_seconds`.
    MaxRealTimeReached,
    /// The host asked for a stop.
    Stopped,
    /// Every agent is dead.
    Extinction,
}

/// Shared control state for one simulation run.
#[derive(Debug)]
pub struct RunControl {
    stop_requested: AtomicBool,
    /// Wall-clock pause between ticks; 0 runs as fast as possible.
    tick_interval_ms: u64,
    started_at: DateTime<Utc>,
    /// 0 = unlimited.
    max_ticks: u64,
    /// 0 = unlimited.
    max_real_time_seconds: u64,
    end_reason: Mutex<Option<EndReason>>,
}

impl RunControl {
    /// Create control state from the run bounds.
    pub fn new(bounds: &SimulationBoundsConfig, tick_interval_ms: u64) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            tick_interval_ms,
            started_at: Utc::now(),
            max_ticks: bounds.max_ticks,
            max_real_time_seconds: bounds.max_real_time_seconds,
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Ask the loop to stop before its next tick.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Whether a stop was requested.
    pub fn should_stop(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record why the run ended.
    pub async fn set_end_reason(&self, reason: EndReason) {
        *self.end_reason.lock().await = Some(reason);
    }

    /// Why the run ended, if it has.
    pub async fn end_reason(&self) -> Option<EndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Pacing
    // -----------------------------------------------------------------------

    /// Pause between ticks in milliseconds.
    pub const fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    /// Sleep duration after a tick, or `None` when running unpaced.
    pub const fn pacing(&self) -> Option<Duration> {
        match self.tick_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Whether `tick` has reached `max_ticks`.
    pub const fn tick_limit_reached(&self, tick: u64) -> bool {
        self.max_ticks > 0 && tick >= self.max_ticks
    }

    /// Whether the wall-clock budget is used up.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Whole seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Configured tick limit.
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Configured wall-clock limit.
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }
}

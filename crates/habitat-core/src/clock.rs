//! Simulation clock with the day/night cycle.
//!
//! The clock advances by a fixed step per tick. Simulated time, the day
//! phase and the day counter are all derived from that step; nothing reads
//! the wall clock. Day and night alternate with configurable lengths, and
//! the day counter increments at every sunrise.

use std::time::Duration;

use habitat_agents::SimTime;
use habitat_types::DayPhase;
use tracing::info;

use crate::config::TimeConfig;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Invalid time configuration (e.g. zero-length night).
    #[error("invalid time configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// A day/night boundary crossed during [`SimClock::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseChange {
    /// Night ended; `day` is the new day number (first sunrise is day 1).
    Sunrise {
        /// The day that just began.
        day: u64,
    },
    /// Day ended.
    Nightfall {
        /// The day that just ended.
        day: u64,
    },
}

/// Fixed-step simulation clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimClock {
    tick: u64,
    now: SimTime,
    step: Duration,
    day_length: Duration,
    night_length: Duration,
    phase: DayPhase,
    phase_elapsed: Duration,
    day: u64,
}

impl SimClock {
    /// Create a clock at tick 0, `start_offset_secs` into the first night.
    ///
    /// Both phase lengths must be positive and at least one tick long, and
    /// the start offset must fall inside the first night.
    pub fn new(config: &TimeConfig, tick_step_ms: u64) -> Result<Self, ClockError> {
        if tick_step_ms == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "tick_step_ms must be at least 1".to_owned(),
            });
        }
        let step = Duration::from_millis(tick_step_ms);
        let day_length = phase_length("day_length_secs", config.day_length_secs, step)?;
        let night_length = phase_length("night_length_secs", config.night_length_secs, step)?;
        let offset = Duration::try_from_secs_f64(config.start_offset_secs).map_err(|e| {
            ClockError::InvalidConfig {
                reason: format!("start_offset_secs: {e}"),
            }
        })?;
        if offset >= night_length {
            return Err(ClockError::InvalidConfig {
                reason: "start_offset_secs must be shorter than the night".to_owned(),
            });
        }

        Ok(Self {
            tick: 0,
            now: SimTime::ZERO,
            step,
            day_length,
            night_length,
            phase: DayPhase::Night,
            phase_elapsed: offset,
            day: 0,
        })
    }

    /// Advance one tick. Returns the phase boundary crossed, if any.
    pub fn advance(&mut self) -> Result<Option<PhaseChange>, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        self.now = self.now.saturating_add(self.step);
        self.phase_elapsed = self.phase_elapsed.saturating_add(self.step);

        let length = self.phase_length();
        if self.phase_elapsed < length {
            return Ok(None);
        }
        self.phase_elapsed = self.phase_elapsed.saturating_sub(length);

        let change = match self.phase {
            DayPhase::Night => {
                self.phase = DayPhase::Day;
                self.day = self.day.checked_add(1).ok_or(ClockError::TickOverflow)?;
                PhaseChange::Sunrise { day: self.day }
            }
            DayPhase::Day => {
                self.phase = DayPhase::Night;
                PhaseChange::Nightfall { day: self.day }
            }
        };
        info!(tick = self.tick, time = %self.now, day = self.day, phase = ?self.phase, "Day phase changed");
        Ok(Some(change))
    }

    /// Current tick number (0 before the first tick).
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated time since start.
    pub const fn now(&self) -> SimTime {
        self.now
    }

    /// Seconds simulated per tick.
    pub fn step_secs(&self) -> f64 {
        self.step.as_secs_f64()
    }

    /// Current phase.
    pub const fn phase(&self) -> DayPhase {
        self.phase
    }

    /// Whether it is currently day.
    pub fn is_day(&self) -> bool {
        self.phase == DayPhase::Day
    }

    /// Day number (0 until the first sunrise).
    pub const fn day(&self) -> u64 {
        self.day
    }

    /// Time left until the next phase change.
    pub fn until_phase_change(&self) -> Duration {
        self.phase_length().saturating_sub(self.phase_elapsed)
    }

    const fn phase_length(&self) -> Duration {
        match self.phase {
            DayPhase::Day => self.day_length,
            DayPhase::Night => self.night_length,
        }
    }
}

fn phase_length(name: &str, secs: f64, step: Duration) -> Result<Duration, ClockError> {
    let length = Duration::try_from_secs_f64(secs).map_err(|e| ClockError::InvalidConfig {
        reason: format!("{name}: {e}"),
    })?;
    if length < step {
        return Err(ClockError::InvalidConfig {
            reason: format!("{name} must be at least one tick long"),
        });
    }
    Ok(length)
}

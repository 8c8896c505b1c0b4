//! Simulation loop runner with run controls.
//!
//! [`run_simulation`] drives [`run_tick`] until a bound is hit, the host
//! asks for a stop, or every agent has died. Between ticks it sleeps for
//! the configured pacing. The end-of-run report is collected from the
//! final state.
//!
//! [`run_tick`]: crate::tick::run_tick

use tracing::{info, warn};

use crate::control::{EndReason, RunControl};
use crate::metrics::EndSimReport;
use crate::reasoning::ReasoningSource;
use crate::tick::{self, SimulationState, TickError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: EndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
    /// Counters and per-agent fitness at the end.
    pub report: EndSimReport,
}

/// Run the simulation loop until a termination condition is met.
///
/// Stop requests and the wall-clock limit are checked before each tick;
/// extinction and the tick limit after it.
pub async fn run_simulation(
    state: &mut SimulationState,
    reasoning: &mut dyn ReasoningSource,
    control: &RunControl,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        max_ticks = control.max_ticks(),
        max_real_time_seconds = control.max_real_time_seconds(),
        tick_interval_ms = control.tick_interval_ms(),
        agents = state.agents.len(),
        "Simulation starting"
    );

    let end_reason = loop {
        if control.should_stop() {
            info!("Stop requested");
            break EndReason::Stopped;
        }

        if control.time_limit_reached() {
            info!(
                max_seconds = control.max_real_time_seconds(),
                elapsed = control.elapsed_seconds(),
                "Real-time limit reached"
            );
            break EndReason::MaxRealTimeReached;
        }

        let summary = tick::run_tick(state, reasoning)?;
        total_ticks = total_ticks.saturating_add(1);
        let tick = summary.tick;
        let alive = summary.agents_alive;
        last_summary = Some(summary);

        if alive == 0 {
            info!(tick, "All agents dead -- extinction");
            break EndReason::Extinction;
        }

        if control.tick_limit_reached(tick) {
            info!(tick, max_ticks = control.max_ticks(), "Tick limit reached");
            break EndReason::MaxTicksReached;
        }

        if let Some(pause) = control.pacing() {
            tokio::time::sleep(pause).await;
        }
    };

    control.set_end_reason(end_reason).await;
    Ok(SimulationResult {
        end_reason,
        final_summary: last_summary,
        total_ticks,
        report: EndSimReport::collect(state),
    })
}

/// Log how the run ended and the final report.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        final_agents_alive = result.final_summary.as_ref().map(|s| s.agents_alive),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            day = summary.day,
            phase = ?summary.phase,
            agents_alive = summary.agents_alive,
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
    result.report.log();
}

//! Engine binary for the Habitat simulation.
//!
//! Wires the simulation state, the starting population, the reasoning
//! source and the run controls together, then runs the loop until a
//! termination condition is met.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `habitat-config.yaml` (or `HABITAT_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the world: spawn points, blocks, habitat
//! 4. Spawn the starting population
//! 5. Connect the reasoning source (NATS when enabled, stub otherwise)
//! 6. Create run controls and hook Ctrl-C to a stop request
//! 7. Run the simulation loop
//! 8. Log the result

mod error;
mod nats_reasoning;
mod spawner;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use habitat_core::config::{LogFormat, LoggingConfig, SimulationConfig};
use habitat_core::control::RunControl;
use habitat_core::reasoning::{ReasoningSource, StubReasoning};
use habitat_core::runner;
use habitat_core::tick::SimulationState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::nats_reasoning::NatsReasoningSource;

/// Environment variable naming the config file.
const ENV_CONFIG_PATH: &str = "HABITAT_CONFIG";

/// Config file used when `HABITAT_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "habitat-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so note the source later.
    let (config, config_source) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!(source = %config_source, "habitat-engine starting");
    info!(
        world_name = %config.world.name,
        seed = config.world.seed,
        tick_step_ms = config.world.tick_step_ms,
        tick_interval_ms = config.world.tick_interval_ms,
        "Configuration loaded"
    );

    // 3. Build the world.
    let tick_interval_ms = config.world.tick_interval_ms;
    let reasoning_config = config.reasoning.clone();
    let bounds = config.simulation.clone();
    let mut state = SimulationState::new(config).map_err(EngineError::from)?;

    // 4. Spawn the starting population.
    let population = spawner::spawn_population(&mut state).map_err(EngineError::from)?;
    info!(agents_spawned = population.len(), "Starting population ready");

    // 5. Reasoning source.
    let mut reasoning: Box<dyn ReasoningSource> = if reasoning_config.enabled {
        let timeout = Duration::from_millis(reasoning_config.timeout_ms);
        info!(
            nats_url = %reasoning_config.nats_url,
            timeout_ms = reasoning_config.timeout_ms,
            "Connecting to NATS"
        );
        match NatsReasoningSource::connect(&reasoning_config.nats_url, timeout).await {
            Ok(source) => {
                info!("NATS reasoning source connected");
                Box::new(source)
            }
            Err(e) => {
                warn!(error = %e, "NATS unavailable, agents run on local behavior only");
                Box::new(StubReasoning::new())
            }
        }
    } else {
        info!("Remote reasoning disabled");
        Box::new(StubReasoning::new())
    };

    // 6. Run controls.
    let control = Arc::new(RunControl::new(&bounds, tick_interval_ms));
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, stopping after the current tick");
                control.stop();
            }
        });
    }

    // 7. Run the simulation.
    let result = runner::run_simulation(&mut state, reasoning.as_mut(), &control)
        .await
        .map_err(EngineError::from)?;

    // 8. Log results.
    runner::log_simulation_end(&result);
    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "habitat-engine shutdown complete"
    );

    Ok(())
}

/// Load the simulation configuration.
///
/// Reads the file named by `HABITAT_CONFIG`, else `habitat-config.yaml` in
/// the working directory. A missing file means defaults (still subject to
/// environment overrides). Returns the config and where it came from.
fn load_config() -> Result<(SimulationConfig, String), EngineError> {
    let path = std::env::var(ENV_CONFIG_PATH).map_or_else(|_err| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        let config = SimulationConfig::from_file(&path)?;
        Ok((config, path.display().to_string()))
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides();
        Ok((config, String::from("defaults")))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_err) => EnvFilter::try_new(&logging.level).map_err(|e| EngineError::Logging {
            message: format!("invalid log level {:?}: {e}", logging.level),
        })?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = match logging.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| EngineError::Logging {
        message: format!("failed to install subscriber: {e}"),
    })
}

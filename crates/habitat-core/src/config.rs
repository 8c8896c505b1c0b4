//! Configuration loading and typed config structures for the Habitat simulation.
//!
//! The canonical configuration lives in `habitat-config.yaml` in the working
//! directory. Every section and field has a default, so a partial file (or
//! none at all) yields a runnable simulation. Agent-level sections reuse the
//! structs from `habitat-agents`, and the spawn layout reuses
//! [`SpawnSettings`] from `habitat-world`.

use std::path::Path;

use habitat_agents::{AgentConfig, BehaviorConfig, DiscoveryConfig, ReasoningTriggerConfig, VitalsConfig};
use habitat_types::Position;
use habitat_world::{NavSettings, SpawnSettings};
use serde::Deserialize;
use tracing::warn;

/// Environment variable overriding `reasoning.nats_url`.
pub const ENV_NATS_URL: &str = "HABITAT_NATS_URL";
/// Environment variable overriding `world.seed`.
pub const ENV_SEED: &str = "HABITAT_SEED";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `habitat-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (seed, tick step, pacing, extent).
    #[serde(default)]
    pub world: WorldConfig,

    /// Day and night lengths.
    #[serde(default)]
    pub time: TimeConfig,

    /// Initial population by role.
    #[serde(default)]
    pub population: PopulationConfig,

    /// Spawn point layout and volumes.
    #[serde(default)]
    pub spawning: SpawnSettings,

    /// Habitat placement, stock and distribution.
    #[serde(default)]
    pub habitat: HabitatConfig,

    /// Agent health, hunger and carrying capacity.
    #[serde(default)]
    pub vitals: VitalsConfig,

    /// Per-variant behavior tuning.
    #[serde(default)]
    pub behaviors: BehaviorConfig,

    /// Discovery ranges.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Remote reasoning bridge.
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Simulation boundary parameters.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `HABITAT_NATS_URL` overrides `reasoning.nats_url`
    /// - `HABITAT_SEED` overrides `world.seed`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override selected values with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(ENV_NATS_URL) {
            self.reasoning.nats_url = val;
        }
        if let Ok(val) = std::env::var(ENV_SEED) {
            match val.parse() {
                Ok(seed) => self.world.seed = seed,
                Err(e) => warn!(value = %val, error = %e, "Ignoring unparsable {ENV_SEED}"),
            }
        }
    }

    /// The per-agent configuration bundle.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            vitals: self.vitals.clone(),
            behaviors: self.behaviors.clone(),
            discovery: self.discovery.clone(),
            reasoning: self.reasoning.triggers.clone(),
            deposit_delay_secs: self.habitat.deposit_delay_secs,
        }
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Simulated milliseconds per tick.
    #[serde(default = "default_tick_step_ms")]
    pub tick_step_ms: u64,

    /// Real-time milliseconds to sleep between ticks (0 = run flat out).
    #[serde(default)]
    pub tick_interval_ms: u64,

    /// The world is the square `[-half_extent, half_extent]` on both axes.
    #[serde(default = "default_half_extent")]
    pub half_extent: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            tick_step_ms: default_tick_step_ms(),
            tick_interval_ms: 0,
            half_extent: default_half_extent(),
        }
    }
}

/// Day/night cycle configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeConfig {
    /// Length of daytime in simulated seconds.
    #[serde(default = "default_day_length")]
    pub day_length_secs: f64,

    /// Length of night in simulated seconds.
    #[serde(default = "default_night_length")]
    pub night_length_secs: f64,

    /// How far into the first night the simulation starts.
    #[serde(default = "default_start_offset")]
    pub start_offset_secs: f64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            day_length_secs: default_day_length(),
            night_length_secs: default_night_length(),
            start_offset_secs: default_start_offset(),
        }
    }
}

/// Initial population, by starting behavior.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PopulationConfig {
    /// Agents starting in Gather.
    #[serde(default = "default_gatherers")]
    pub gatherers: u32,

    /// Agents starting in `MoveBlock` (chaining into `BuildWall`).
    #[serde(default = "default_haulers")]
    pub haulers: u32,

    /// Agents starting in Guard.
    #[serde(default = "default_guards")]
    pub guards: u32,

    /// Agents are scattered this far around the habitat at start.
    #[serde(default = "default_spawn_radius")]
    pub spawn_radius: f64,

    /// Movement tuning shared by every agent.
    #[serde(default)]
    pub navigation: NavSettings,
}

impl PopulationConfig {
    /// Total number of agents spawned at start.
    pub const fn total(&self) -> u32 {
        self.gatherers
            .saturating_add(self.haulers)
            .saturating_add(self.guards)
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            gatherers: default_gatherers(),
            haulers: default_haulers(),
            guards: default_guards(),
            spawn_radius: default_spawn_radius(),
            navigation: NavSettings::default(),
        }
    }
}

/// Habitat placement, stock and food distribution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HabitatConfig {
    /// Habitat centre.
    #[serde(default)]
    pub position: Position,

    /// Agents within this radius count as at the habitat.
    #[serde(default = "default_trigger_radius")]
    pub trigger_radius: f64,

    /// Seconds between distribution checks.
    #[serde(default = "default_dispense_interval")]
    pub dispense_interval_secs: f64,

    /// Food handed to each waiting agent per distribution.
    #[serde(default = "default_food_portion_value")]
    pub food_portion_value: u32,

    /// Waiting agents required before food is handed out.
    #[serde(default = "default_expected_agent_count")]
    pub expected_agent_count: usize,

    /// Food in stock at start.
    #[serde(default)]
    pub initial_food: u32,

    /// Wall slot positions, built in order.
    #[serde(default = "default_wall_slots")]
    pub wall_slots: Vec<Position>,

    /// Stored blocks consumed per wall.
    #[serde(default = "default_blocks_per_wall")]
    pub blocks_per_wall: u32,

    /// Delay between entering the habitat and depositing carried food.
    #[serde(default = "default_deposit_delay")]
    pub deposit_delay_secs: f64,
}

impl Default for HabitatConfig {
    fn default() -> Self {
        Self {
            position: Position::ORIGIN,
            trigger_radius: default_trigger_radius(),
            dispense_interval_secs: default_dispense_interval(),
            food_portion_value: default_food_portion_value(),
            expected_agent_count: default_expected_agent_count(),
            initial_food: 0,
            wall_slots: default_wall_slots(),
            blocks_per_wall: default_blocks_per_wall(),
            deposit_delay_secs: default_deposit_delay(),
        }
    }
}

/// Remote reasoning bridge configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReasoningConfig {
    /// Whether agent snapshots are sent out at all.
    #[serde(default)]
    pub enabled: bool,

    /// NATS messaging URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// How long to wait for directives after publishing snapshots.
    #[serde(default = "default_reasoning_timeout_ms")]
    pub timeout_ms: u64,

    /// When agents ask for fresh guidance.
    #[serde(default)]
    pub triggers: ReasoningTriggerConfig,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            nats_url: default_nats_url(),
            timeout_ms: default_reasoning_timeout_ms(),
            triggers: ReasoningTriggerConfig::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

/// Simulation boundary configuration.
///
/// A value of 0 for either limit means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum number of ticks before the simulation ends.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Maximum wall-clock seconds before the simulation ends.
    #[serde(default)]
    pub max_real_time_seconds: u64,
}

impl Default for SimulationBoundsConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            max_real_time_seconds: 0,
        }
    }
}

fn default_world_name() -> String {
    String::from("Habitat")
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_step_ms() -> u64 {
    100
}

const fn default_half_extent() -> f64 {
    100.0
}

const fn default_day_length() -> f64 {
    100.0
}

const fn default_night_length() -> f64 {
    140.0
}

const fn default_start_offset() -> f64 {
    110.0
}

const fn default_gatherers() -> u32 {
    4
}

const fn default_haulers() -> u32 {
    1
}

const fn default_guards() -> u32 {
    1
}

const fn default_spawn_radius() -> f64 {
    4.0
}

const fn default_trigger_radius() -> f64 {
    5.0
}

const fn default_dispense_interval() -> f64 {
    5.0
}

const fn default_food_portion_value() -> u32 {
    1
}

const fn default_expected_agent_count() -> usize {
    2
}

fn default_wall_slots() -> Vec<Position> {
    vec![
        Position::new(8.0, 0.0),
        Position::new(0.0, 8.0),
        Position::new(-8.0, 0.0),
        Position::new(0.0, -8.0),
    ]
}

const fn default_blocks_per_wall() -> u32 {
    1
}

const fn default_deposit_delay() -> f64 {
    1.0
}

fn default_nats_url() -> String {
    String::from("nats://localhost:4222")
}

const fn default_reasoning_timeout_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_max_ticks() -> u64 {
    12_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.world.tick_step_ms, 100);
        assert_eq!(config.population.total(), 6);
        assert_eq!(config.habitat.food_portion_value, 1);
        assert_eq!(config.habitat.expected_agent_count, 2);
        assert_eq!(config.habitat.wall_slots.len(), 4);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(!config.reasoning.enabled);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
world:
  name: "Test Habitat"
  seed: 123
  tick_step_ms: 50
  tick_interval_ms: 10
  half_extent: 60.0

time:
  day_length_secs: 30.0
  night_length_secs: 20.0
  start_offset_secs: 0.0

population:
  gatherers: 2
  haulers: 0
  guards: 1
  spawn_radius: 2.0
  navigation:
    speed: 5.0

spawning:
  food_spawn_points:
    - { x: 10.0, y: 10.0 }
  enemy_spawn_points: []
  blocks: []
  max_food: 3
  daily_active_food_spawn_count: 1

habitat:
  position: { x: 1.0, y: -1.0 }
  dispense_interval_secs: 2.0
  food_portion_value: 10
  expected_agent_count: 1
  initial_food: 15
  wall_slots: []

vitals:
  max_health: 80

behaviors:
  build_wall:
    total_walls: 3

discovery:
  marker_detection_range: 12.0

reasoning:
  enabled: true
  timeout_ms: 500
  triggers:
    periodic_interval_secs: 4.0

logging:
  level: "debug"
  format: json

simulation:
  max_ticks: 300
"#;

        let config = SimulationConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.world.name, "Test Habitat");
        assert_eq!(config.world.tick_step_ms, 50);
        assert_eq!(config.population.total(), 3);
        assert!((config.population.navigation.speed - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.spawning.food_spawn_points.len(), 1);
        assert!(config.spawning.enemy_spawn_points.is_empty());
        assert_eq!(config.habitat.initial_food, 15);
        assert_eq!(config.habitat.food_portion_value, 10);
        assert!(config.habitat.wall_slots.is_empty());
        assert_eq!(config.vitals.max_health, 80);
        assert_eq!(config.vitals.contact_damage, 25);
        assert_eq!(config.behaviors.build_wall.total_walls, 3);
        assert!(config.reasoning.enabled);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.simulation.max_ticks, 300);

        let agent = config.agent_config();
        assert!((agent.discovery.marker_detection_range - 12.0).abs() < f64::EPSILON);
        assert!((agent.reasoning.periodic_interval_secs - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "habitat:\n  initial_food: 7\n";
        let config = SimulationConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.habitat.initial_food, 7);
        assert_eq!(config.population.gatherers, 4);
        assert!((config.time.day_length_secs - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = SimulationConfig::parse("");
        assert!(config.is_ok());
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("habitat-config.yaml");
        if path.exists() {
            let config = SimulationConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}

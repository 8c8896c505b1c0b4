//! Tunables for agent vitals, behaviors, discovery and reasoning triggers.
//!
//! Every struct deserializes from the matching section of
//! `habitat-config.yaml`, and every field has a default so partial files
//! work. [`AgentConfig`] bundles the sections the per-agent update needs.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Vitals
// ---------------------------------------------------------------------------

/// Health, hunger and carrying capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalsConfig {
    /// Maximum (and starting) health.
    #[serde(default = "default_max_health")]
    pub max_health: u32,
    /// Hunger cap: food eaten in one day beyond this is wasted.
    #[serde(default = "default_max_hunger")]
    pub max_hunger: u32,
    /// Food items an agent can carry at once.
    #[serde(default = "default_max_food")]
    pub max_food: u32,
    /// Food that must be eaten each day to avoid the hunger penalty.
    #[serde(default = "default_required_food")]
    pub required_food: u32,
    /// Damage dealt by a hostile on contact.
    #[serde(default = "default_contact_damage")]
    pub contact_damage: u32,
    /// Distance at which a hostile counts as touching the agent.
    #[serde(default = "default_contact_range")]
    pub contact_range: f64,
    /// Minimum time between two contact hits.
    #[serde(default = "default_hit_cooldown")]
    pub hit_cooldown_secs: f64,
}

const fn default_max_health() -> u32 {
    100
}
const fn default_max_hunger() -> u32 {
    10
}
const fn default_max_food() -> u32 {
    3
}
const fn default_required_food() -> u32 {
    5
}
const fn default_contact_damage() -> u32 {
    25
}
const fn default_contact_range() -> f64 {
    1.0
}
const fn default_hit_cooldown() -> f64 {
    1.0
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            max_health: default_max_health(),
            max_hunger: default_max_hunger(),
            max_food: default_max_food(),
            required_food: default_required_food(),
            contact_damage: default_contact_damage(),
            contact_range: default_contact_range(),
            hit_cooldown_secs: default_hit_cooldown(),
        }
    }
}

// ---------------------------------------------------------------------------
// Behaviors
// ---------------------------------------------------------------------------

/// Gather variant tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatherConfig {
    /// Radius for random wander targets.
    #[serde(default = "default_wander_radius")]
    pub wander_radius: f64,
    /// Attempts at sampling a reachable wander target.
    #[serde(default = "default_max_sample_attempts")]
    pub max_sample_attempts: u32,
    /// Interval of the stuck check.
    #[serde(default = "default_retarget_interval")]
    pub retarget_interval_secs: f64,
    /// Movement below this radius over one interval counts as stuck.
    #[serde(default = "default_stuck_radius")]
    pub stuck_radius: f64,
    /// Food within this radius overrides the wander target.
    #[serde(default = "default_food_detection_radius")]
    pub food_detection_radius: f64,
    /// Contact distance for picking food up.
    #[serde(default = "default_pickup_range")]
    pub pickup_range: f64,
}

const fn default_wander_radius() -> f64 {
    15.0
}
const fn default_max_sample_attempts() -> u32 {
    10
}
const fn default_retarget_interval() -> f64 {
    3.0
}
const fn default_stuck_radius() -> f64 {
    1.5
}
const fn default_food_detection_radius() -> f64 {
    10.0
}
const fn default_pickup_range() -> f64 {
    1.0
}

impl Default for GatherConfig {
    fn default() -> Self {
        Self {
            wander_radius: default_wander_radius(),
            max_sample_attempts: default_max_sample_attempts(),
            retarget_interval_secs: default_retarget_interval(),
            stuck_radius: default_stuck_radius(),
            food_detection_radius: default_food_detection_radius(),
            pickup_range: default_pickup_range(),
        }
    }
}

/// Flee variant tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleeConfig {
    /// Hostiles within this radius are fled from.
    #[serde(default = "default_flee_radius")]
    pub flee_radius: f64,
    /// Flee speed in world units per second.
    #[serde(default = "default_flee_speed")]
    pub flee_speed: f64,
    /// Direction smoothing per tick (0 keeps the old direction, 1 snaps).
    #[serde(default = "default_smooth_factor")]
    pub smooth_factor: f64,
}

const fn default_flee_radius() -> f64 {
    10.0
}
const fn default_flee_speed() -> f64 {
    5.0
}
const fn default_smooth_factor() -> f64 {
    0.1
}

impl Default for FleeConfig {
    fn default() -> Self {
        Self {
            flee_radius: default_flee_radius(),
            flee_speed: default_flee_speed(),
            smooth_factor: default_smooth_factor(),
        }
    }
}

/// Guard variant tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Distance from the habitat at which patrolling starts.
    #[serde(default = "default_guard_stopping_distance")]
    pub habitat_stopping_distance: f64,
    /// Radius of random patrol points around the habitat.
    #[serde(default = "default_patrol_radius")]
    pub patrol_radius: f64,
    /// Maximum time spent walking to one patrol point.
    #[serde(default = "default_patrol_interval")]
    pub patrol_interval_secs: f64,
    /// Pests within this radius of a patrolling guard are chased.
    #[serde(default = "default_guard_detection_radius")]
    pub detection_radius: f64,
    /// Give up a chase after this long.
    #[serde(default = "default_chase_duration")]
    pub chase_duration_secs: f64,
    /// Give up a chase this far from the habitat.
    #[serde(default = "default_max_chase_distance")]
    pub max_chase_distance: f64,
    /// A pest this close to the guard is removed.
    #[serde(default = "default_kill_range")]
    pub kill_range: f64,
}

const fn default_guard_stopping_distance() -> f64 {
    2.0
}
const fn default_patrol_radius() -> f64 {
    5.0
}
const fn default_patrol_interval() -> f64 {
    3.0
}
const fn default_guard_detection_radius() -> f64 {
    10.0
}
const fn default_chase_duration() -> f64 {
    5.0
}
const fn default_max_chase_distance() -> f64 {
    15.0
}
const fn default_kill_range() -> f64 {
    1.0
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            habitat_stopping_distance: default_guard_stopping_distance(),
            patrol_radius: default_patrol_radius(),
            patrol_interval_secs: default_patrol_interval(),
            detection_radius: default_guard_detection_radius(),
            chase_duration_secs: default_chase_duration(),
            max_chase_distance: default_max_chase_distance(),
            kill_range: default_kill_range(),
        }
    }
}

/// `BuildWall` variant tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildWallConfig {
    /// Walls one activation builds before it completes.
    #[serde(default = "default_total_walls")]
    pub total_walls: u32,
    /// Pause at the habitat before heading to the site.
    #[serde(default = "default_wait_at_habitat")]
    pub wait_at_habitat_secs: f64,
    /// Pause at the site before the wall goes up.
    #[serde(default = "default_wait_at_build")]
    pub wait_at_build_secs: f64,
    /// Arrival distance for the build site.
    #[serde(default = "default_build_stop_distance")]
    pub stop_distance: f64,
    /// Search radius when snapping a site onto navigable ground.
    #[serde(default = "default_nav_sample_radius")]
    pub nav_sample_radius: f64,
}

const fn default_total_walls() -> u32 {
    2
}
const fn default_wait_at_habitat() -> f64 {
    1.0
}
const fn default_wait_at_build() -> f64 {
    3.0
}
const fn default_build_stop_distance() -> f64 {
    1.0
}
const fn default_nav_sample_radius() -> f64 {
    20.0
}

impl Default for BuildWallConfig {
    fn default() -> Self {
        Self {
            total_walls: default_total_walls(),
            wait_at_habitat_secs: default_wait_at_habitat(),
            wait_at_build_secs: default_wait_at_build(),
            stop_distance: default_build_stop_distance(),
            nav_sample_radius: default_nav_sample_radius(),
        }
    }
}

/// `MoveBlock` variant tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveBlockConfig {
    /// Blocks within this radius at enable time become targets.
    #[serde(default = "default_block_search_radius")]
    pub search_radius: f64,
    /// Distance at which a block can be picked up.
    #[serde(default = "default_block_pickup_range")]
    pub pickup_range: f64,
    /// Pause before picking a block up.
    #[serde(default = "default_pickup_delay")]
    pub pickup_delay_secs: f64,
    /// Pause after picking a block up.
    #[serde(default = "default_after_pickup_delay")]
    pub after_pickup_delay_secs: f64,
}

const fn default_block_search_radius() -> f64 {
    40.0
}
const fn default_block_pickup_range() -> f64 {
    1.5
}
const fn default_pickup_delay() -> f64 {
    1.0
}
const fn default_after_pickup_delay() -> f64 {
    1.0
}

impl Default for MoveBlockConfig {
    fn default() -> Self {
        Self {
            search_radius: default_block_search_radius(),
            pickup_range: default_block_pickup_range(),
            pickup_delay_secs: default_pickup_delay(),
            after_pickup_delay_secs: default_after_pickup_delay(),
        }
    }
}

/// Rest variant tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestConfig {
    /// Idle spin while resting, radians per second.
    #[serde(default = "default_spin_rate")]
    pub spin_rate: f64,
}

const fn default_spin_rate() -> f64 {
    1.75
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            spin_rate: default_spin_rate(),
        }
    }
}

/// Automatic switch to Flee when hostiles come close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoFleeConfig {
    /// Whether the policy runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// A hostile within this radius triggers fleeing.
    #[serde(default = "default_trigger_radius")]
    pub trigger_radius: f64,
    /// Fleeing ends once no hostile is within this radius.
    #[serde(default = "default_cancel_radius")]
    pub cancel_radius: f64,
}

const fn default_true() -> bool {
    true
}
const fn default_trigger_radius() -> f64 {
    10.0
}
const fn default_cancel_radius() -> f64 {
    12.0
}

impl Default for AutoFleeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_radius: default_trigger_radius(),
            cancel_radius: default_cancel_radius(),
        }
    }
}

/// Exhaustion bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExhaustionConfig {
    /// Time between exhaustion updates.
    #[serde(default = "default_exhaustion_interval")]
    pub interval_secs: f64,
    /// Change per update while an active variant runs.
    #[serde(default = "default_active_rate")]
    pub active_rate: i32,
    /// Change per update while resting.
    #[serde(default = "default_rest_rate")]
    pub rest_rate: i32,
}

const fn default_exhaustion_interval() -> f64 {
    5.0
}
const fn default_active_rate() -> i32 {
    1
}
const fn default_rest_rate() -> i32 {
    -10
}

impl Default for ExhaustionConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_exhaustion_interval(),
            active_rate: default_active_rate(),
            rest_rate: default_rest_rate(),
        }
    }
}

/// Every behavior tunable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Gather.
    #[serde(default)]
    pub gather: GatherConfig,
    /// Flee.
    #[serde(default)]
    pub flee: FleeConfig,
    /// Guard.
    #[serde(default)]
    pub guard: GuardConfig,
    /// `BuildWall`.
    #[serde(default)]
    pub build_wall: BuildWallConfig,
    /// `MoveBlock`.
    #[serde(default)]
    pub move_block: MoveBlockConfig,
    /// Rest.
    #[serde(default)]
    pub rest: RestConfig,
    /// Auto-flee policy.
    #[serde(default)]
    pub auto_flee: AutoFleeConfig,
    /// Exhaustion timer.
    #[serde(default)]
    pub exhaustion: ExhaustionConfig,
}

// ---------------------------------------------------------------------------
// Discovery and reasoning triggers
// ---------------------------------------------------------------------------

/// Sensor ranges for the two discovery mechanisms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Range for one-shot discovery of spawn announcements.
    #[serde(default = "default_marker_detection_range")]
    pub marker_detection_range: f64,
    /// Range for continuous spawn point polling.
    #[serde(default = "default_spawn_point_detection_range")]
    pub spawn_point_detection_range: f64,
}

const fn default_marker_detection_range() -> f64 {
    30.0
}
const fn default_spawn_point_detection_range() -> f64 {
    5.0
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            marker_detection_range: default_marker_detection_range(),
            spawn_point_detection_range: default_spawn_point_detection_range(),
        }
    }
}

/// When an agent asks the reasoning service for fresh guidance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningTriggerConfig {
    /// Hostiles within this radius count as detected.
    #[serde(default = "default_enemy_detection_radius")]
    pub enemy_detection_radius: f64,
    /// How long a hostile must stay gone before the departure counts.
    #[serde(default = "default_buffer_delay")]
    pub buffer_delay_secs: f64,
    /// Unconditional request interval.
    #[serde(default = "default_periodic_interval")]
    pub periodic_interval_secs: f64,
}

const fn default_enemy_detection_radius() -> f64 {
    10.0
}
const fn default_buffer_delay() -> f64 {
    2.0
}
const fn default_periodic_interval() -> f64 {
    10.0
}

impl Default for ReasoningTriggerConfig {
    fn default() -> Self {
        Self {
            enemy_detection_radius: default_enemy_detection_radius(),
            buffer_delay_secs: default_buffer_delay(),
            periodic_interval_secs: default_periodic_interval(),
        }
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// Everything the per-agent update consults.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Vitals.
    pub vitals: VitalsConfig,
    /// Behavior tuning.
    pub behaviors: BehaviorConfig,
    /// Discovery ranges.
    pub discovery: DiscoveryConfig,
    /// Reasoning triggers.
    pub reasoning: ReasoningTriggerConfig,
    /// Delay between entering the habitat and depositing food.
    pub deposit_delay_secs: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            vitals: VitalsConfig::default(),
            behaviors: BehaviorConfig::default(),
            discovery: DiscoveryConfig::default(),
            reasoning: ReasoningTriggerConfig::default(),
            deposit_delay_secs: 1.0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "gather:\n  wander_radius: 8.0\nbuild_wall:\n  total_walls: 4\n";
        let config: BehaviorConfig = serde_yml::from_str(yaml).unwrap();
        assert!((config.gather.wander_radius - 8.0).abs() < f64::EPSILON);
        assert!((config.gather.stuck_radius - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.build_wall.total_walls, 4);
        assert_eq!(config.exhaustion.rest_rate, -10);
        assert!(config.auto_flee.enabled);
    }

    #[test]
    fn vitals_defaults() {
        let vitals = VitalsConfig::default();
        assert_eq!(vitals.max_health, 100);
        assert_eq!(vitals.contact_damage, 25);
        assert_eq!(vitals.required_food, 5);
    }
}

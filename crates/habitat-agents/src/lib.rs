//! Agent behavior, knowledge and fitness for the Habitat simulation.
//!
//! This crate contains the per-agent logic layer: everything one colonist
//! owns and decides, without touching the world directly. It sits between
//! `habitat-world` (entities, spatial queries, spawning) and `habitat-core`
//! (the tick cycle that applies the effects agents report).
//!
//! # Modules
//!
//! - [`agent`] -- Agent records and ID assignment ([`Agent`], [`AgentManager`])
//! - [`behavior`] -- Behavior state machine and its six variants ([`BehaviorStateMachine`])
//! - [`config`] -- Vitals, behavior, discovery and reasoning tunables ([`AgentConfig`])
//! - [`discovery`] -- Continuous spawn point discovery ([`SpawnPointDiscovery`])
//! - [`error`] -- Error types for all agent operations ([`AgentError`])
//! - [`fitness`] -- Fitness score, carried food, health and hunger ([`FitnessTracker`])
//! - [`knowledge`] -- Per-agent known markers ([`KnowledgeStore`])
//! - [`reasoning`] -- Remote reasoning update flags ([`ReasoningTrigger`])
//! - [`reservation`] -- Food claims shared between gatherers ([`FoodReservations`])
//! - [`scheduler`] -- Cancellable timed continuations ([`Scheduler`])

pub mod agent;
pub mod behavior;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fitness;
pub mod knowledge;
pub mod reasoning;
pub mod reservation;
pub mod scheduler;

pub use agent::{Agent, AgentEnv, AgentManager, AgentUpdate};
pub use behavior::{
    AgentBehavior, Behavior, BehaviorContext, BehaviorOutcome, BehaviorStateMachine, Effect, WorldView,
};
pub use config::{
    AgentConfig, AutoFleeConfig, BehaviorConfig, BuildWallConfig, DiscoveryConfig, ExhaustionConfig, FleeConfig,
    GatherConfig, GuardConfig, MoveBlockConfig, ReasoningTriggerConfig, RestConfig, VitalsConfig,
};
pub use discovery::SpawnPointDiscovery;
pub use error::AgentError;
pub use fitness::{FitnessTracker, FoodUse};
pub use knowledge::KnowledgeStore;
pub use reasoning::{ReasoningTrigger, UpdateReason};
pub use reservation::FoodReservations;
pub use scheduler::{Continuation, ContinuationHandle, ContinuationKind, ContinuationOwner, Scheduler, SimTime};

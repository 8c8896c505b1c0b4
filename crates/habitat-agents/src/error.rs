//! Error types for the habitat-agents crate.
//!
//! Per-agent failures never cross the agent boundary: the tick cycle logs
//! them against the agent and moves on to the next one.

use habitat_types::{AgentId, EntityId};

/// Errors that can occur during agent operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Agent with the given ID was not found in the manager.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// A behavior switch named a tag that is not a known variant.
    #[error("invalid behavior transition for agent {agent}: unknown tag {tag:?}")]
    InvalidTransition {
        /// The agent asked to switch.
        agent: AgentId,
        /// The tag it was asked to switch to.
        tag: String,
    },

    /// A companion component or world feature a behavior needs is absent.
    #[error("agent {agent} is missing a dependency: {dependency}")]
    MissingDependency {
        /// The affected agent.
        agent: AgentId,
        /// What was missing.
        dependency: String,
    },

    /// An entity the agent acted on no longer exists.
    #[error("stale reference: entity {entity} no longer exists (agent {agent})")]
    StaleReference {
        /// The acting agent.
        agent: AgentId,
        /// The vanished entity.
        entity: EntityId,
    },

    /// A world query or mutation failed.
    #[error("world error: {0}")]
    World(#[from] habitat_world::WorldError),

    /// Agent IDs ran out.
    #[error("agent id space exhausted")]
    IdExhausted,

    /// An arithmetic overflow occurred in a counter.
    #[error("arithmetic overflow in agent computation: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },
}

//! Error types for the `habitat-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use habitat_types::{EntityCategory, EntityId, Position};

/// Errors that can occur during world operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// An entity was not found in the registry.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// A duplicate entity was inserted where uniqueness is required.
    #[error("duplicate entity id: {0}")]
    DuplicateEntity(EntityId),

    /// Spawning was requested for a category with no spawn points.
    #[error("no spawn points registered for {0:?}")]
    NoSpawnPoints(EntityCategory),

    /// The pathfinder found no route to the destination.
    #[error("no path from {from} to {to}")]
    Unreachable {
        /// Origin.
        from: Position,
        /// Requested destination.
        to: Position,
    },

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow in world calculation: {context}")]
    ArithmeticOverflow {
        /// What was being computed.
        context: String,
    },
}

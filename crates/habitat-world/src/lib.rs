//! The physical world of the Habitat simulation.
//!
//! This crate models everything agents act upon but do not own: the live
//! entities, the black-box spatial services the host engine would provide,
//! the spawn authority that creates and destroys entities, and the shared
//! habitat.
//!
//! # Modules
//!
//! - [`error`] -- Error types for world operations.
//! - [`registry`] -- [`EntityRegistry`], every live entity keyed by id.
//! - [`spatial`] -- The [`SpatialQuery`] seam and the [`OpenField`] provider.
//! - [`navigation`] -- [`NavAgent`], per-agent path following.
//! - [`spawn`] -- [`SpawnAuthority`], spawn points and the day/night cycle
//!   of food and enemies.
//! - [`habitat`] -- [`Habitat`] stock, walls and waiting list.

pub mod error;
pub mod habitat;
pub mod navigation;
pub mod registry;
pub mod spatial;
pub mod spawn;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use habitat::{Habitat, WallBuilt, WallSlot};
pub use navigation::{NavAgent, NavSettings};
pub use registry::EntityRegistry;
pub use spatial::{OpenField, SpatialQuery};
pub use spawn::{SpawnAuthority, SpawnSettings};

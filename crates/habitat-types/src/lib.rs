//! Shared type definitions for the Habitat simulation.
//!
//! This crate is the single source of truth for the data model used across
//! the Habitat workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the map projection layer.
//!
//! # Modules
//!
//! - [`ids`] -- Entity, map and agent identifiers
//! - [`enums`] -- Entity categories, marker event kinds, behavior tags, day phase
//! - [`geometry`] -- Planar world positions
//! - [`structs`] -- Entities, marker events, known markers, bus subscribers
//! - [`snapshot`] -- Payloads sent to a remote reasoning service
//! - [`directive`] -- Commands returned by a remote reasoning service

pub mod directive;
pub mod enums;
pub mod geometry;
pub mod ids;
pub mod snapshot;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use directive::{Directive, DirectiveCommand};
pub use enums::{BehaviorKind, DayPhase, EntityCategory, MarkerEventKind};
pub use geometry::Position;
pub use ids::{AgentId, EntityId, MapId};
pub use snapshot::{AgentSnapshot, MapEncoding, MapObject, ReasoningSnapshot};
pub use structs::{Entity, KnownMarker, MarkerEvent, SubscriberId};

//! Marker event bus for the Habitat simulation.
//!
//! Spawned world objects announce themselves on the bus; agent knowledge
//! stores and map projections listen. Delivery is synchronous and in
//! publish order: when [`MarkerBus::publish`] returns, every current
//! subscriber has observed the event.
//!
//! The bus owns only subscriber *identities*. The subscribers themselves
//! live in the simulation context, which lends them out through a
//! [`SubscriberResolver`] at dispatch time. This keeps the bus free of
//! shared ownership and lets the owning context decide what a missing
//! subscriber means.
//!
//! # Modules
//!
//! - [`bus`] -- Subscriber registry and dispatch

pub mod bus;

pub use bus::{MarkerBus, MarkerSubscriber, SubscriberResolver};

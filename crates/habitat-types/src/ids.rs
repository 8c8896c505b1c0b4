//! Type-safe identifiers.
//!
//! World entities (food, enemies, spawn points, blocks, the agents' own
//! bodies) carry a UUID v7 [`EntityId`]. Agents additionally carry a small
//! numeric [`AgentId`] assigned at spawn time: it is monotonically
//! increasing for the lifetime of one simulation context and doubles as the
//! deterministic tie-breaker when the habitat ranks agents for food.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for any live world entity.
    EntityId
}

define_id! {
    /// Unique identifier for a map projection consumer (global or per-user map).
    MapId
}

/// Numeric agent identifier, assigned in spawn order starting at 1.
///
/// Ordering on `AgentId` is spawn order, which the habitat relies on to
/// break fitness ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentId(pub u64);

impl AgentId {
    /// The first identifier handed out by a fresh context.
    pub const FIRST: Self = Self(1);

    /// The identifier that follows this one, or `None` on overflow.
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Return the inner numeric value.
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for AgentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ids_are_unique() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn agent_ids_advance_monotonically() {
        let first = AgentId::FIRST;
        let second = first.next();
        assert_eq!(second, Some(AgentId(2)));
        assert!(first < AgentId(2));
        assert_eq!(AgentId(u64::MAX).next(), None);
    }

    #[test]
    fn id_display_matches_inner() {
        let id = EntityId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
        assert_eq!(AgentId(7).to_string(), "7");
    }
}

//! Per-agent navigation: the consumer side of the pathfinder.
//!
//! A [`NavAgent`] holds a destination and the waypoints the pathfinder
//! returned for it, and moves its owner along them at a fixed speed each
//! tick. It never decides *where* to go; behaviors do.

use std::collections::VecDeque;

use habitat_types::Position;
use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::spatial::SpatialQuery;

/// Movement tuning for a [`NavAgent`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavSettings {
    /// Travel speed in world units per second.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Distance at which the destination counts as reached.
    #[serde(default = "default_stopping_distance")]
    pub stopping_distance: f64,
}

const fn default_speed() -> f64 {
    3.5
}

const fn default_stopping_distance() -> f64 {
    0.5
}

impl Default for NavSettings {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            stopping_distance: default_stopping_distance(),
        }
    }
}

/// Path-following state for one agent.
#[derive(Debug, Clone)]
pub struct NavAgent {
    settings: NavSettings,
    destination: Option<Position>,
    path: VecDeque<Position>,
    stopped: bool,
}

impl NavAgent {
    /// An idle agent with no destination.
    pub const fn new(settings: NavSettings) -> Self {
        Self {
            settings,
            destination: None,
            path: VecDeque::new(),
            stopped: true,
        }
    }

    /// Current movement settings.
    pub const fn settings(&self) -> NavSettings {
        self.settings
    }

    /// Change travel speed.
    pub const fn set_speed(&mut self, speed: f64) {
        self.settings.speed = speed;
    }

    /// Ask the pathfinder for a route from `from` to `to` and follow it.
    ///
    /// On failure the previous destination is kept.
    pub fn set_destination(
        &mut self,
        spatial: &dyn SpatialQuery,
        from: Position,
        to: Position,
    ) -> Result<(), WorldError> {
        let path = spatial
            .find_path(from, to)
            .ok_or(WorldError::Unreachable { from, to })?;
        self.destination = Some(to);
        self.path = path.into();
        self.stopped = false;
        Ok(())
    }

    /// Halt in place and forget the destination.
    pub fn stop(&mut self) {
        self.destination = None;
        self.path.clear();
        self.stopped = true;
    }

    /// Whether the agent is halted.
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// The current destination, if any.
    pub const fn destination(&self) -> Option<Position> {
        self.destination
    }

    /// Remaining path length from `from`; zero when there is no path.
    pub fn remaining_distance(&self, from: Position) -> f64 {
        let mut total = 0.0;
        let mut cursor = from;
        for waypoint in &self.path {
            total += cursor.distance(*waypoint);
            cursor = *waypoint;
        }
        total
    }

    /// Whether the destination is reached (or there is none).
    pub fn has_arrived(&self, from: Position) -> bool {
        self.destination.is_none() || self.remaining_distance(from) <= self.settings.stopping_distance
    }

    /// Move `position` along the path for `dt` seconds.
    ///
    /// Returns the direction of travel when the agent moved.
    pub fn advance(&mut self, position: &mut Position, dt: f64) -> Option<Position> {
        if self.stopped {
            return None;
        }
        let start = *position;
        let mut budget = self.settings.speed * dt;
        while budget > 0.0 {
            let Some(&waypoint) = self.path.front() else {
                break;
            };
            let gap = position.distance(waypoint);
            if gap <= budget {
                *position = waypoint;
                budget -= gap;
                self.path.pop_front();
            } else {
                *position = *position + (waypoint - *position).normalized().scale(budget);
                budget = 0.0;
            }
        }
        if self.path.is_empty() {
            self.stopped = true;
        }
        let moved = *position - start;
        (moved.length() > f64::EPSILON).then(|| moved.normalized())
    }
}

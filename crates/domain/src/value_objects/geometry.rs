//! Grid positions and watcher-relative zones.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tile on the tactical grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile distance where diagonals cost one step (Chebyshev).
    pub fn distance_to(&self, other: &GridPosition) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }

    pub fn is_adjacent(&self, other: &GridPosition) -> bool {
        self.distance_to(other) == 1
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Zone shape relative to a watching actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// Fixed radius in tiles.
    Radius(u32),
    /// Whatever reach the watcher's wielded weapon currently has.
    /// Resolved at match time; no weapon means no zone.
    WeaponReach,
}

/// A zone resolved to a concrete centre and radius for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedZone {
    pub centre: GridPosition,
    pub radius: u32,
}

impl ResolvedZone {
    /// The watcher's own tile never counts as inside.
    pub fn contains(&self, position: &GridPosition) -> bool {
        let distance = self.centre.distance_to(position);
        distance > 0 && distance <= self.radius
    }
}

//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

pub use glam::Vec2;

/// Unique identifier for entities
///
/// Ids are handed out from a monotonically increasing counter, so comparing
/// two ids compares their creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Creation sequence number of this entity
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Simulation frame counter
pub type Frame = u64;

/// Collision layer bitmask
///
/// An entity belongs to the layers set in its mask; a query or move matches
/// an entity when the two masks share at least one bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const DEFAULT: LayerMask = LayerMask(1);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// Mask with only the given layer bit set
    pub fn layer(index: u32) -> Self {
        Self(1u32.checked_shl(index).unwrap_or(0))
    }

    pub fn intersects(&self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: LayerMask) -> Self {
        Self(self.0 | other.0)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::DEFAULT
    }
}

impl std::ops::BitOr for LayerMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

//! Axis-aligned bounding boxes
//!
//! Boxes are half-open on neither side: two boxes that only share an edge do
//! not intersect and have zero penetration on that axis.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in world space (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    /// Rectangle from its top-left corner and size
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + width, y + height),
        }
    }

    /// Bounds of an object placed at `position`, whose `origin` is the offset
    /// from the top-left corner to the position point
    pub fn from_position(position: Vec2, size: Vec2, origin: Vec2) -> Self {
        let min = position - origin;
        Self { min, max: min + size }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.min.x
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.min.y
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.max.x
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.max.y
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Same box moved by `offset`
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x < self.max.x && point.y >= self.min.y && point.y < self.max.y
    }

    #[inline]
    fn overlaps_x(&self, other: &Bounds) -> bool {
        self.min.x < other.max.x && other.min.x < self.max.x
    }

    #[inline]
    fn overlaps_y(&self, other: &Bounds) -> bool {
        self.min.y < other.max.y && other.min.y < self.max.y
    }

    /// True if the interiors of the two boxes overlap
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.overlaps_x(other) && self.overlaps_y(other)
    }

    /// Per-axis penetration of `self` into `other`
    ///
    /// Each component is the signed distance `self` must move along that axis
    /// to stop overlapping `other`, pushing away from `other`'s center. A
    /// component is zero exactly when the boxes do not overlap on that axis.
    pub fn penetration_depth(&self, other: &Bounds) -> Vec2 {
        let x = if !self.overlaps_x(other) {
            0.0
        } else if self.min.x + self.max.x > other.min.x + other.max.x {
            other.max.x - self.min.x
        } else {
            other.min.x - self.max.x
        };

        let y = if !self.overlaps_y(other) {
            0.0
        } else if self.min.y + self.max.y > other.min.y + other.max.y {
            other.max.y - self.min.y
        } else {
            other.min.y - self.max.y
        };

        Vec2::new(x, y)
    }

    /// Area of the intersection rectangle, zero when disjoint
    pub fn overlap_area(&self, other: &Bounds) -> f32 {
        if !self.intersects(other) {
            return 0.0;
        }
        let w = self.max.x.min(other.max.x) - self.min.x.max(other.min.x);
        let h = self.max.y.min(other.max.y) - self.min.y.max(other.min.y);
        w * h
    }
}

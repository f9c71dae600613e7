//! Kinematic move-and-collide against `Solid` entities
//!
//! The mover is displaced first, then pushed out of each overlapping blocker
//! along the axis with the smaller penetration. Blockers are handled largest
//! overlap first so that a body resting across two floor tiles is lifted by
//! the tile it mostly sits on instead of snagging on the seam of the other.

use std::cmp::Reverse;

use glam::Vec2;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, LayerMask};
use crate::ecs::entity::EntityMap;
use crate::spatial::bounds::Bounds;
use crate::spatial::grid::SpatialGrid;
use crate::spatial::query::QueryFilter;

/// Axis a collision was resolved on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

/// Where the blocker sits relative to the mover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Contact {
    /// Blocker below; the mover was pushed up
    Ground,
    /// Blocker above; the mover was pushed down
    Ceiling,
    /// Blocker to the left; the mover was pushed right
    WallLeft,
    /// Blocker to the right; the mover was pushed left
    WallRight,
}

/// One resolved overlap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    /// Mover position after this overlap was corrected
    pub position: Vec2,
    /// The blocker
    pub other: EntityId,
    /// Penetration of the mover into the blocker before correction
    pub depth: Vec2,
    pub axis: Axis,
}

impl Collision {
    pub fn contact(&self) -> Contact {
        match self.axis {
            Axis::Y if self.depth.y < 0.0 => Contact::Ground,
            Axis::Y => Contact::Ceiling,
            Axis::X if self.depth.x < 0.0 => Contact::WallRight,
            Axis::X => Contact::WallLeft,
        }
    }

    pub fn is_ground(&self) -> bool {
        self.contact() == Contact::Ground
    }

    pub fn is_ceiling(&self) -> bool {
        self.contact() == Contact::Ceiling
    }

    pub fn is_wall(&self) -> bool {
        self.axis == Axis::X
    }

    /// The correction applied to the mover for this overlap
    pub fn correction(&self) -> Vec2 {
        match self.axis {
            Axis::X => Vec2::new(self.depth.x, 0.0),
            Axis::Y => Vec2::new(0.0, self.depth.y),
        }
    }
}

/// Pick the cheaper axis; ties resolve horizontally
#[inline]
pub fn resolution_axis(depth: Vec2) -> Axis {
    if depth.y.abs() < depth.x.abs() {
        Axis::Y
    } else {
        Axis::X
    }
}

/// First `Solid` entity on `mask` that `id` would overlap if it were shifted
/// by `offset`. Nothing moves; used for ground and wall probes.
pub fn overlapping_solid(
    entities: &EntityMap,
    grid: &SpatialGrid,
    id: EntityId,
    offset: Vec2,
    mask: LayerMask,
) -> Option<EntityId> {
    let bounds = entities.get(&id)?.bounds().translated(offset);
    let filter = QueryFilter::new().excluding(id).solid_only().on_layers(mask);
    grid.query(&bounds, entities, &filter).into_iter().next()
}

/// Move `id` by `displacement` and push it out of overlapping `Solid`
/// entities on `mask`
pub fn move_and_collide(
    entities: &mut EntityMap,
    grid: &SpatialGrid,
    id: EntityId,
    displacement: Vec2,
    mask: LayerMask,
) -> Vec<Collision> {
    move_and_collide_with(entities, grid, id, displacement, mask, |_| {})
}

/// Like [`move_and_collide`], calling `on_collision` for each resolved
/// overlap as it happens
pub fn move_and_collide_with(
    entities: &mut EntityMap,
    grid: &SpatialGrid,
    id: EntityId,
    displacement: Vec2,
    mask: LayerMask,
    mut on_collision: impl FnMut(&Collision),
) -> Vec<Collision> {
    let Some(mover) = entities.get_mut(&id) else {
        return Vec::new();
    };
    debug_assert!(mover.is_live(), "entity {} moved before its first commit", id);

    let size = mover.size();
    let origin = mover.origin();
    let mut position = mover.position() + displacement;
    mover.set_position(position);
    let mut bounds = mover.bounds();

    let filter = QueryFilter::new().excluding(id).solid_only().on_layers(mask);
    let mut blockers: Vec<(EntityId, Bounds, f32)> = grid
        .query(&bounds, entities, &filter)
        .into_iter()
        .filter_map(|other| entities.get(&other).map(|e| (other, e.bounds())))
        .map(|(other, other_bounds)| (other, other_bounds, bounds.overlap_area(&other_bounds)))
        .collect();
    blockers.sort_by_key(|&(other, _, area)| (Reverse(OrderedFloat(area)), other));

    let mut collisions = Vec::with_capacity(blockers.len());
    for (other, other_bounds, _) in blockers {
        // Earlier corrections may already have cleared this blocker
        let depth = bounds.penetration_depth(&other_bounds);
        if depth.x == 0.0 || depth.y == 0.0 {
            continue;
        }

        let axis = resolution_axis(depth);
        match axis {
            Axis::X => position.x += depth.x,
            Axis::Y => position.y += depth.y,
        }
        bounds = Bounds::from_position(position, size, origin);

        let collision = Collision {
            position,
            other,
            depth,
            axis,
        };
        on_collision(&collision);
        collisions.push(collision);
    }

    if !collisions.is_empty() {
        if let Some(mover) = entities.get_mut(&id) {
            mover.set_position(position);
        }
        tracing::trace!("{} resolved {} collisions", id, collisions.len());
    }

    collisions
}

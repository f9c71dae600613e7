//! What a running behavior can see and do

use glam::Vec2;

use crate::collision::resolver::{self, Collision};
use crate::core::types::{EntityId, Frame, LayerMask};
use crate::ecs::behavior::Behavior;
use crate::ecs::definition::EntityDefinition;
use crate::ecs::entity::Entity;
use crate::ecs::registry::EntityRegistry;
use crate::input::{FrameInput, InputSnapshot};
use crate::spatial::bounds::Bounds;
use crate::spatial::grid::SpatialGrid;
use crate::spatial::query::QueryFilter;

/// Access handed to a behavior hook
///
/// Structural changes (spawn, destroy) are only queued here and applied at
/// the next commit. The owner moves through the collision resolver or a
/// teleport; other entities' placement is read-only.
pub struct BehaviorContext<'a> {
    owner: EntityId,
    registry: &'a mut EntityRegistry,
    grid: &'a SpatialGrid,
    frame: &'a FrameInput,
}

impl<'a> BehaviorContext<'a> {
    pub(crate) fn new(
        owner: EntityId,
        registry: &'a mut EntityRegistry,
        grid: &'a SpatialGrid,
        frame: &'a FrameInput,
    ) -> Self {
        Self {
            owner,
            registry,
            grid,
            frame,
        }
    }

    pub fn owner_id(&self) -> EntityId {
        self.owner
    }

    /// The entity this behavior belongs to
    pub fn owner(&self) -> Option<&Entity> {
        self.registry.get(self.owner)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.registry.get(id)
    }

    /// Seconds simulated by this frame
    pub fn delta(&self) -> f32 {
        self.frame.delta
    }

    pub fn frame(&self) -> Frame {
        self.frame.frame
    }

    pub fn input(&self) -> &InputSnapshot {
        &self.frame.input
    }

    /// Area covered by the layout
    pub fn world_bounds(&self) -> Bounds {
        self.grid.world_bounds()
    }

    /// Behavior of another entity. The owner's own behaviors are reached
    /// through `Siblings` instead and are not visible here.
    pub fn behavior<T: Behavior>(&self, id: EntityId) -> Option<&T> {
        self.registry.get(id)?.behavior::<T>()
    }

    pub fn behavior_mut<T: Behavior>(&mut self, id: EntityId) -> Option<&mut T> {
        self.registry.get_mut(id)?.behavior_mut::<T>()
    }

    /// First live entity carrying a `T`. The owner's own behaviors are out
    /// on loan during its hooks, so the owner is never returned.
    pub fn find_behavior<T: Behavior>(&self) -> Option<(EntityId, &T)> {
        self.registry.find_behavior::<T>()
    }

    /// `Solid` entity on `mask` the owner would overlap if shifted by
    /// `offset`, without moving it
    pub fn test_overlap_solid_offset(&self, offset: Vec2, mask: LayerMask) -> Option<EntityId> {
        resolver::overlapping_solid(self.registry.entities(), self.grid, self.owner, offset, mask)
    }

    /// Entities in `bounds` accepted by `filter`, in creation order
    pub fn query_bounds(&self, bounds: &Bounds, filter: &QueryFilter<'_>) -> Vec<EntityId> {
        self.grid.query(bounds, self.registry.entities(), filter)
    }

    /// Move the owner by `displacement`, pushing it out of `Solid` entities
    /// on `mask`
    pub fn move_and_collide(&mut self, displacement: Vec2, mask: LayerMask) -> Vec<Collision> {
        resolver::move_and_collide(self.registry.entities_mut(), self.grid, self.owner, displacement, mask)
    }

    pub fn move_and_collide_with(
        &mut self,
        displacement: Vec2,
        mask: LayerMask,
        on_collision: impl FnMut(&Collision),
    ) -> Vec<Collision> {
        resolver::move_and_collide_with(
            self.registry.entities_mut(),
            self.grid,
            self.owner,
            displacement,
            mask,
            on_collision,
        )
    }

    /// Place the owner without collision checks
    pub fn set_owner_position(&mut self, position: Vec2) {
        if let Some(owner) = self.registry.get_mut(self.owner) {
            owner.set_position(position);
        }
    }

    /// Queue a new entity; it goes live at the next commit
    pub fn spawn(&mut self, definition: &EntityDefinition, position: Vec2) -> EntityId {
        self.registry.spawn(definition, position)
    }

    /// Queue an entity for removal at the next commit
    pub fn destroy(&mut self, id: EntityId) -> bool {
        self.registry.destroy(id)
    }

    pub fn destroy_owner(&mut self) -> bool {
        self.registry.destroy(self.owner)
    }
}

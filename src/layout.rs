//! Layout - one simulated space (level, arena, menu screen)
//!
//! Owns the spatial grid and the entity registry and runs the frame in a
//! fixed order: commit, tick, post-tick, grid sync. Anything that queries
//! the grid during a frame sees the positions from the end of the previous
//! frame's sync.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::collision::resolver::{self, Collision};
use crate::core::config::LayoutConfig;
use crate::core::error::{LayoutError, Result};
use crate::core::types::{EntityId, Frame, LayerMask};
use crate::ecs::behavior::Behavior;
use crate::ecs::definition::EntityDefinition;
use crate::ecs::entity::{Entity, EntitySnapshot};
use crate::ecs::registry::EntityRegistry;
use crate::input::{FrameInput, InputSnapshot};
use crate::spatial::bounds::Bounds;
use crate::spatial::grid::SpatialGrid;
use crate::spatial::query::QueryFilter;

/// Counters for one completed frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    pub frame: Frame,
    /// Delta actually simulated, after clamping
    pub delta: f32,
    pub spawned: usize,
    pub destroyed: usize,
    pub live: usize,
    /// Entities whose grid cells changed during the sync
    pub regridded: usize,
}

pub struct Layout {
    config: LayoutConfig,
    grid: SpatialGrid,
    registry: EntityRegistry,
    frame: Frame,
}

impl Layout {
    pub fn new(config: LayoutConfig) -> Result<Self> {
        let grid = SpatialGrid::from_config(&config)?;
        tracing::info!(
            "Layout {}x{} with {}x{} cells of {}",
            config.width,
            config.height,
            grid.width(),
            grid.height(),
            config.cell_size
        );

        Ok(Self {
            config,
            grid,
            registry: EntityRegistry::new(),
            frame: 0,
        })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Number of frames stepped so far
    pub fn frame(&self) -> Frame {
        self.frame
    }

    /// Queue an entity; it goes live at the start of the next step
    pub fn spawn(&mut self, definition: &EntityDefinition, position: Vec2) -> EntityId {
        self.registry.spawn(definition, position)
    }

    pub fn destroy(&mut self, id: EntityId) -> bool {
        self.registry.destroy(id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.registry.get(id)
    }

    /// Mutable access, e.g. to adjust a freshly spawned entity before it goes
    /// live
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.registry.get_mut(id)
    }

    pub fn behavior<T: Behavior>(&self, id: EntityId) -> Option<&T> {
        self.registry.get(id)?.behavior::<T>()
    }

    pub fn behavior_mut<T: Behavior>(&mut self, id: EntityId) -> Option<&mut T> {
        self.registry.get_mut(id)?.behavior_mut::<T>()
    }

    pub fn live_entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.registry.live_entities()
    }

    /// First live entity, in tick order, carrying a behavior of type `T`
    pub fn find_behavior<T: Behavior>(&self) -> Option<(EntityId, &T)> {
        self.registry.find_behavior::<T>()
    }

    /// `Solid` entity on `mask` that `id` would overlap if shifted by
    /// `offset`. The entity is not moved.
    pub fn test_overlap_solid_offset(&self, id: EntityId, offset: Vec2, mask: LayerMask) -> Option<EntityId> {
        resolver::overlapping_solid(self.registry.entities(), &self.grid, id, offset, mask)
    }

    pub fn query_bounds(&self, bounds: &Bounds, filter: &QueryFilter<'_>) -> Vec<EntityId> {
        self.grid.query(bounds, self.registry.entities(), filter)
    }

    /// Move a live entity from outside the behavior phases
    ///
    /// Pending entities are not in the grid yet and count as not found.
    pub fn move_and_collide(
        &mut self,
        id: EntityId,
        displacement: Vec2,
        mask: LayerMask,
    ) -> Result<Vec<Collision>> {
        if !self.registry.is_live(id) {
            return Err(LayoutError::EntityNotFound(id));
        }
        Ok(resolver::move_and_collide(
            self.registry.entities_mut(),
            &self.grid,
            id,
            displacement,
            mask,
        ))
    }

    /// Simulate one frame
    ///
    /// Fails only when a newly spawned entity's definition is malformed.
    pub fn step(&mut self, delta: f32, input: InputSnapshot) -> Result<FrameStats> {
        let delta = self.clamp_delta(delta);
        let frame = FrameInput {
            frame: self.frame,
            delta,
            input,
        };

        let summary = self.registry.commit(&mut self.grid, &frame)?;
        self.registry.tick(&self.grid, &frame);
        self.registry.post_tick(&self.grid, &frame);
        let regridded = self.registry.commit_frame_positions(&mut self.grid);

        self.frame += 1;

        Ok(FrameStats {
            frame: frame.frame,
            delta,
            spawned: summary.spawned,
            destroyed: summary.destroyed,
            live: self.registry.live_count(),
            regridded,
        })
    }

    fn clamp_delta(&self, delta: f32) -> f32 {
        if !delta.is_finite() || delta < 0.0 {
            tracing::warn!("Ignoring invalid frame delta {}", delta);
            return 0.0;
        }
        if delta > self.config.max_frame_delta {
            tracing::warn!(
                "Frame {} delta {:.3}s exceeds budget, clamping to {:.3}s",
                self.frame,
                delta,
                self.config.max_frame_delta
            );
            return self.config.max_frame_delta;
        }
        delta
    }

    /// Placement of every live entity, in tick order
    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        self.registry.live_entities().map(|e| e.snapshot()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Layout {
        Layout::new(LayoutConfig::with_world(16.0, 64.0, 64.0)).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(Layout::new(LayoutConfig::with_world(-1.0, 64.0, 64.0)).is_err());
    }

    #[test]
    fn test_step_commits_and_counts() {
        let mut layout = layout();
        let def = EntityDefinition::new(Vec2::new(4.0, 4.0)).solid();
        let id = layout.spawn(&def, Vec2::new(30.0, 30.0));

        let stats = layout.step(1.0 / 60.0, InputSnapshot::idle()).unwrap();
        assert_eq!(stats.spawned, 1);
        assert_eq!(stats.live, 1);
        assert_eq!(layout.frame(), 1);

        let hits = layout.query_bounds(&Bounds::new(32.0, 32.0, 1.0, 1.0), &QueryFilter::new());
        assert_eq!(hits, vec![id]);
    }

    #[test]
    fn test_step_clamps_delta() {
        let mut layout = layout();
        let stats = layout.step(2.0, InputSnapshot::idle()).unwrap();
        assert_eq!(stats.delta, layout.config().max_frame_delta);
        let stats = layout.step(f32::NAN, InputSnapshot::idle()).unwrap();
        assert_eq!(stats.delta, 0.0);
    }

    #[test]
    fn test_move_unknown_entity() {
        let mut layout = layout();
        let result = layout.move_and_collide(EntityId(42), Vec2::X, LayerMask::ALL);
        assert!(matches!(result, Err(LayoutError::EntityNotFound(EntityId(42)))));
    }

    #[test]
    fn test_move_pending_entity_is_rejected() {
        let mut layout = layout();
        let id = layout.spawn(&EntityDefinition::new(Vec2::new(4.0, 4.0)).overlap(), Vec2::ZERO);

        let result = layout.move_and_collide(id, Vec2::X, LayerMask::ALL);
        assert!(matches!(result, Err(LayoutError::EntityNotFound(missing)) if missing == id));
        assert_eq!(layout.entity(id).unwrap().position(), Vec2::ZERO);

        layout.step(0.0, InputSnapshot::idle()).unwrap();
        assert!(layout.move_and_collide(id, Vec2::X, LayerMask::ALL).is_ok());
    }

    #[test]
    fn test_overlap_solid_offset_does_not_move() {
        let mut layout = layout();
        let wall = layout.spawn(&EntityDefinition::new(Vec2::new(8.0, 32.0)).solid(), Vec2::new(24.0, 0.0));
        layout.spawn(&EntityDefinition::new(Vec2::new(8.0, 32.0)), Vec2::new(40.0, 0.0));
        let id = layout.spawn(&EntityDefinition::new(Vec2::new(8.0, 8.0)).overlap(), Vec2::new(14.0, 4.0));
        layout.step(0.0, InputSnapshot::idle()).unwrap();

        assert_eq!(layout.test_overlap_solid_offset(id, Vec2::new(4.0, 0.0), LayerMask::ALL), Some(wall));
        assert_eq!(layout.test_overlap_solid_offset(id, Vec2::new(2.0, 0.0), LayerMask::ALL), None);
        assert_eq!(layout.test_overlap_solid_offset(id, Vec2::new(4.0, 0.0), LayerMask::layer(5)), None);
        // Pass entities never block
        assert_eq!(layout.test_overlap_solid_offset(id, Vec2::new(28.0, 0.0), LayerMask::ALL), None);
        assert_eq!(layout.entity(id).unwrap().position(), Vec2::new(14.0, 4.0));
    }
}

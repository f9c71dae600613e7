//! Entity registry - owns every entity and drives behavior phases
//!
//! Spawns and destroys are queued and only applied by `commit`, so behaviors
//! can spawn, destroy others, or destroy their own entity while the live set
//! is being iterated.

use ahash::AHashSet;
use glam::Vec2;

use crate::core::error::Result;
use crate::core::types::EntityId;
use crate::ecs::behavior::{Behavior, Siblings};
use crate::ecs::context::BehaviorContext;
use crate::ecs::definition::EntityDefinition;
use crate::ecs::entity::{Entity, EntityMap, Lifecycle};
use crate::input::FrameInput;
use crate::spatial::grid::SpatialGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Tick,
    PostTick,
    Destroyed,
}

/// What a commit changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub spawned: usize,
    pub destroyed: usize,
}

/// Owner of all entities, pending and live
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: EntityMap,
    live: Vec<EntityId>,
    pending_spawn: Vec<EntityId>,
    pending_destroy: Vec<EntityId>,
    next_id: u64,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending entity. The returned id can be used right away to
    /// adjust the entity before it goes live.
    pub fn spawn(&mut self, definition: &EntityDefinition, position: Vec2) -> EntityId {
        self.next_id += 1;
        let id = EntityId(self.next_id);
        self.entities
            .insert(id, Entity::from_definition(id, definition, position));
        self.pending_spawn.push(id);
        id
    }

    /// Flag an entity for removal at the next commit. Returns false if it
    /// is unknown or already flagged.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        if !entity.mark_destroyed() {
            return false;
        }
        self.pending_destroy.push(id);
        true
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn entities(&self) -> &EntityMap {
        &self.entities
    }

    pub(crate) fn entities_mut(&mut self) -> &mut EntityMap {
        &mut self.entities
    }

    /// Live entities in tick order
    pub fn live_ids(&self) -> &[EntityId] {
        &self.live
    }

    pub fn live_entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.live.iter().filter_map(|id| self.entities.get(id))
    }

    /// First live entity, in tick order, carrying a behavior of type `T`
    pub fn find_behavior<T: Behavior>(&self) -> Option<(EntityId, &T)> {
        self.live_entities()
            .find_map(|e| e.behavior::<T>().map(|behavior| (e.id(), behavior)))
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, id: EntityId) -> bool {
        self.entities.get(&id).map(|e| e.is_live()).unwrap_or(false)
    }

    pub fn pending_spawn_count(&self) -> usize {
        self.pending_spawn.len()
    }

    pub fn pending_destroy_count(&self) -> usize {
        self.pending_destroy.len()
    }

    /// Apply queued spawns, then queued destroys
    ///
    /// Each spawned entity has its sibling slots resolved, its bounds
    /// computed and is inserted into the grid before its behaviors hear
    /// `on_owner_created`; it joins the live set afterwards. Each destroyed
    /// entity hears `on_owner_destroyed` before it leaves the grid and the
    /// live set. Spawns queued by these hooks wait for the next commit.
    pub fn commit(&mut self, grid: &mut SpatialGrid, frame: &FrameInput) -> Result<CommitSummary> {
        let mut summary = CommitSummary::default();

        let spawns = std::mem::take(&mut self.pending_spawn);
        for (i, &id) in spawns.iter().enumerate() {
            if let Err(err) = self.resolve_behaviors(id) {
                // The malformed entity never goes live; the rest stay queued
                self.entities.remove(&id);
                self.pending_spawn.splice(0..0, spawns[i + 1..].iter().copied());
                tracing::warn!("Dropping {} at commit: {}", id, err);
                return Err(err);
            }

            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            entity.update_bounds();
            entity.snapshot_previous();
            grid.add(entity);
            entity.mark_live();

            self.dispatch(id, grid, frame, Phase::Created);
            self.live.push(id);
            summary.spawned += 1;
        }

        let destroys = std::mem::take(&mut self.pending_destroy);
        let mut removed = AHashSet::new();
        for id in destroys {
            match self.entities.get(&id).map(|e| e.lifecycle()) {
                None => continue,
                // Spawned by a creation hook in this same commit
                Some(Lifecycle::Pending) => {
                    self.pending_destroy.push(id);
                    continue;
                }
                Some(Lifecycle::Live) => {}
            }

            self.dispatch(id, grid, frame, Phase::Destroyed);
            if let Some(mut entity) = self.entities.remove(&id) {
                grid.remove(&mut entity);
            }
            removed.insert(id);
        }

        if !removed.is_empty() {
            self.live.retain(|id| !removed.contains(id));
            summary.destroyed = removed.len();
        }

        if summary.spawned > 0 || summary.destroyed > 0 {
            tracing::debug!(
                "Commit frame {}: +{} -{} ({} live)",
                frame.frame,
                summary.spawned,
                summary.destroyed,
                self.live.len()
            );
        }

        Ok(summary)
    }

    /// Run every live behavior's `tick` once, in live-set order
    pub fn tick(&mut self, grid: &SpatialGrid, frame: &FrameInput) {
        // The live set only changes in `commit`, so its length is stable here
        for i in 0..self.live.len() {
            let id = self.live[i];
            self.dispatch(id, grid, frame, Phase::Tick);
        }
    }

    /// Run every live behavior's `post_tick` once, in live-set order
    pub fn post_tick(&mut self, grid: &SpatialGrid, frame: &FrameInput) {
        for i in 0..self.live.len() {
            let id = self.live[i];
            self.dispatch(id, grid, frame, Phase::PostTick);
        }
    }

    /// Sync grid membership with this frame's final positions and record
    /// them as the previous positions for the next frame.
    ///
    /// Returns the number of entities whose cell membership changed.
    pub fn commit_frame_positions(&mut self, grid: &mut SpatialGrid) -> usize {
        let mut moved = 0;
        for id in &self.live {
            if let Some(entity) = self.entities.get_mut(id) {
                if grid.update(entity) {
                    moved += 1;
                }
                entity.snapshot_previous();
            }
        }
        moved
    }

    fn resolve_behaviors(&mut self, id: EntityId) -> Result<()> {
        let Some(entity) = self.entities.get_mut(&id) else {
            return Ok(());
        };

        let mut result = Ok(());
        for index in 0..entity.behaviors.len() {
            let Some((current, siblings)) = Siblings::split(&mut entity.behaviors, index) else {
                break;
            };
            result = current.resolve(id, &siblings);
            if result.is_err() {
                break;
            }
        }
        result
    }

    /// Run one hook on each of an entity's behaviors
    ///
    /// The behaviors are moved out of the entity for the duration so the
    /// context can lend out the rest of the registry.
    fn dispatch(&mut self, id: EntityId, grid: &SpatialGrid, frame: &FrameInput, phase: Phase) {
        let mut behaviors = match self.entities.get_mut(&id) {
            Some(entity) => std::mem::take(&mut entity.behaviors),
            None => return,
        };

        for index in 0..behaviors.len() {
            let Some((current, mut siblings)) = Siblings::split(&mut behaviors, index) else {
                break;
            };
            let mut ctx = BehaviorContext::new(id, self, grid, frame);
            match phase {
                Phase::Created => current.on_owner_created(&mut ctx, &mut siblings),
                Phase::Tick => current.tick(&mut ctx, &mut siblings),
                Phase::PostTick => current.post_tick(&mut ctx, &mut siblings),
                Phase::Destroyed => current.on_owner_destroyed(&mut ctx, &mut siblings),
            }
        }

        if let Some(entity) = self.entities.get_mut(&id) {
            entity.behaviors = behaviors;
        }
    }
}

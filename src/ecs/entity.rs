//! Entities: identity, placement and attached behaviors

use ahash::AHashMap;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, LayerMask};
use crate::ecs::behavior::Behavior;
use crate::ecs::definition::EntityDefinition;
use crate::spatial::bounds::Bounds;
use crate::spatial::grid::{CellSet, SpatialType};

/// Storage for every entity the registry knows about, pending or live
pub type EntityMap = AHashMap<EntityId, Entity>;

/// Where an entity is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Spawned, waiting for the next commit
    Pending,
    /// Committed: in the grid and ticked every frame
    Live,
}

/// A simulated object
///
/// Bounds are derived from position, size and origin and are recomputed by
/// every setter that touches one of them, so they always describe the
/// current position.
pub struct Entity {
    id: EntityId,
    name: String,
    position: Vec2,
    previous_position: Vec2,
    size: Vec2,
    origin: Vec2,
    bounds: Bounds,
    previous_bounds: Bounds,
    spatial_type: SpatialType,
    previous_spatial_type: SpatialType,
    layers: LayerMask,
    tags: Vec<String>,
    lifecycle: Lifecycle,
    destroyed: bool,
    cells: CellSet,
    pub(crate) behaviors: Vec<Box<dyn Behavior>>,
}

impl Entity {
    /// Build a pending entity from a definition, instantiating its behaviors
    pub fn from_definition(id: EntityId, definition: &EntityDefinition, position: Vec2) -> Self {
        let bounds = Bounds::from_position(position, definition.size, definition.origin);
        Self {
            id,
            name: definition.name.clone(),
            position,
            previous_position: position,
            size: definition.size,
            origin: definition.origin,
            bounds,
            previous_bounds: bounds,
            spatial_type: definition.spatial_type,
            previous_spatial_type: definition.spatial_type,
            layers: definition.layers,
            tags: definition.tags.clone(),
            lifecycle: Lifecycle::Pending,
            destroyed: false,
            cells: CellSet::new(),
            behaviors: definition.instantiate_behaviors(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Name of the definition this entity was spawned from
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn previous_position(&self) -> Vec2 {
        self.previous_position
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn previous_bounds(&self) -> Bounds {
        self.previous_bounds
    }

    pub fn spatial_type(&self) -> SpatialType {
        self.spatial_type
    }

    pub fn previous_spatial_type(&self) -> SpatialType {
        self.previous_spatial_type
    }

    pub fn layers(&self) -> LayerMask {
        self.layers
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_live(&self) -> bool {
        self.lifecycle == Lifecycle::Live
    }

    /// Flagged for removal at the next commit
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Grid cells this entity is currently stored in
    pub fn cells(&self) -> &CellSet {
        &self.cells
    }

    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }

    /// Move the entity, recomputing bounds. The grid catches up at the end
    /// of the frame.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.update_bounds();
    }

    /// Change how the entity participates in queries. Takes effect in the
    /// grid at the end of the frame.
    pub fn set_spatial_type(&mut self, spatial_type: SpatialType) {
        self.spatial_type = spatial_type;
    }

    pub fn set_layers(&mut self, layers: LayerMask) {
        self.layers = layers;
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.has_tag(&tag) {
            self.tags.push(tag);
        }
    }

    pub fn update_bounds(&mut self) {
        self.bounds = Bounds::from_position(self.position, self.size, self.origin);
    }

    /// First behavior of type `T`
    pub fn behavior<T: Behavior>(&self) -> Option<&T> {
        self.behaviors.iter().find_map(|b| (**b).as_any().downcast_ref::<T>())
    }

    pub fn behavior_mut<T: Behavior>(&mut self) -> Option<&mut T> {
        self.behaviors
            .iter_mut()
            .find_map(|b| (**b).as_any_mut().downcast_mut::<T>())
    }

    pub(crate) fn set_cells(&mut self, cells: CellSet) {
        self.cells = cells;
    }

    pub(crate) fn mark_live(&mut self) {
        self.lifecycle = Lifecycle::Live;
    }

    /// Returns false if the entity was already flagged
    pub(crate) fn mark_destroyed(&mut self) -> bool {
        !std::mem::replace(&mut self.destroyed, true)
    }

    /// Record this frame's placement as the previous frame's
    pub(crate) fn snapshot_previous(&mut self) {
        self.previous_position = self.position;
        self.previous_bounds = self.bounds;
        self.previous_spatial_type = self.spatial_type;
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            name: self.name.clone(),
            position: self.position,
            bounds: self.bounds,
            spatial_type: self.spatial_type,
            destroyed: self.destroyed,
        }
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("position", &self.position)
            .field("bounds", &self.bounds)
            .field("spatial_type", &self.spatial_type)
            .field("lifecycle", &self.lifecycle)
            .field("destroyed", &self.destroyed)
            .field("behaviors", &self.behaviors.len())
            .finish_non_exhaustive()
    }
}

/// Serializable view of an entity's placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub name: String,
    pub position: Vec2,
    pub bounds: Bounds,
    pub spatial_type: SpatialType,
    pub destroyed: bool,
}

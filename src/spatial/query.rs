//! Filters applied to broad-phase query results

use crate::core::types::{EntityId, LayerMask};
use crate::ecs::entity::Entity;

/// Which grid occupants a region query may return
#[derive(Debug, Clone, Copy)]
pub struct QueryFilter<'a> {
    /// Entity to leave out, usually the one asking
    pub exclude: Option<EntityId>,
    /// Only return `Solid` entities
    pub solid_only: bool,
    /// Only return entities on one of these layers
    pub layers: LayerMask,
    /// Skip entities carrying any of these tags
    pub ignore_tags: &'a [&'a str],
}

impl Default for QueryFilter<'_> {
    fn default() -> Self {
        Self {
            exclude: None,
            solid_only: false,
            layers: LayerMask::ALL,
            ignore_tags: &[],
        }
    }
}

impl<'a> QueryFilter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn excluding(mut self, id: EntityId) -> Self {
        self.exclude = Some(id);
        self
    }

    pub fn solid_only(mut self) -> Self {
        self.solid_only = true;
        self
    }

    pub fn on_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }

    pub fn ignoring_tags(mut self, tags: &'a [&'a str]) -> Self {
        self.ignore_tags = tags;
        self
    }

    /// True if `entity` passes every criterion (bounds are checked elsewhere)
    pub fn accepts(&self, entity: &Entity) -> bool {
        let spatial_type = entity.spatial_type();
        if !spatial_type.is_queryable() {
            return false;
        }
        if self.solid_only && !spatial_type.is_solid() {
            return false;
        }
        if self.exclude == Some(entity.id()) {
            return false;
        }
        if !entity.layers().intersects(self.layers) {
            return false;
        }
        !self.ignore_tags.iter().any(|tag| entity.has_tag(tag))
    }
}

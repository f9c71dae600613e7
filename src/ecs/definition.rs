//! Declarative entity definitions and a catalog loaded from TOML
//!
//! A definition carries everything needed to build an entity: size, origin,
//! spatial classification, layers, tags and the factories for its behaviors.
//! Definitions are cheap to clone; factories are shared.

use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::error::{LayoutError, Result};
use crate::core::types::LayerMask;
use crate::ecs::behavior::Behavior;
use crate::spatial::grid::SpatialType;

/// Builds a fresh behavior instance for a newly spawned entity
pub type BehaviorFactory = Arc<dyn Fn() -> Box<dyn Behavior> + Send + Sync>;

/// Recipe for spawning entities
#[derive(Clone)]
pub struct EntityDefinition {
    pub name: String,
    pub size: Vec2,
    /// Offset from the bounds' top-left corner to the entity's position
    pub origin: Vec2,
    pub spatial_type: SpatialType,
    pub layers: LayerMask,
    pub tags: Vec<String>,
    factories: Vec<BehaviorFactory>,
}

impl EntityDefinition {
    pub fn new(size: Vec2) -> Self {
        Self {
            name: String::new(),
            size,
            origin: Vec2::ZERO,
            spatial_type: SpatialType::Pass,
            layers: LayerMask::DEFAULT,
            tags: Vec::new(),
            factories: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_spatial_type(mut self, spatial_type: SpatialType) -> Self {
        self.spatial_type = spatial_type;
        self
    }

    pub fn solid(self) -> Self {
        self.with_spatial_type(SpatialType::Solid)
    }

    pub fn overlap(self) -> Self {
        self.with_spatial_type(SpatialType::Overlap)
    }

    pub fn on_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Attach a behavior; behaviors run in the order they are attached
    pub fn with_behavior<B, F>(mut self, factory: F) -> Self
    where
        B: Behavior,
        F: Fn() -> B + Send + Sync + 'static,
    {
        self.factories
            .push(Arc::new(move || Box::new(factory()) as Box<dyn Behavior>));
        self
    }

    pub fn with_factory(mut self, factory: BehaviorFactory) -> Self {
        self.factories.push(factory);
        self
    }

    pub fn behavior_count(&self) -> usize {
        self.factories.len()
    }

    pub fn instantiate_behaviors(&self) -> Vec<Box<dyn Behavior>> {
        self.factories.iter().map(|factory| factory()).collect()
    }
}

impl std::fmt::Debug for EntityDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDefinition")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("origin", &self.origin)
            .field("spatial_type", &self.spatial_type)
            .field("layers", &self.layers)
            .field("tags", &self.tags)
            .field("behaviors", &self.factories.len())
            .finish()
    }
}

/// One `[[entity]]` table of a definitions file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTemplate {
    pub name: String,
    pub size: Vec2,
    #[serde(default)]
    pub origin: Vec2,
    #[serde(default)]
    pub spatial_type: SpatialType,
    #[serde(default)]
    pub layers: LayerMask,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Names of registered behavior factories, in tick order
    #[serde(default)]
    pub behaviors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    #[serde(default, rename = "entity")]
    entities: Vec<EntityTemplate>,
}

/// Named definitions plus the behavior factories templates can refer to
#[derive(Default)]
pub struct DefinitionCatalog {
    factories: AHashMap<String, BehaviorFactory>,
    definitions: AHashMap<String, EntityDefinition>,
}

impl DefinitionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a behavior available to templates under `name`
    pub fn register_behavior<B, F>(&mut self, name: impl Into<String>, factory: F)
    where
        B: Behavior,
        F: Fn() -> B + Send + Sync + 'static,
    {
        self.factories
            .insert(name.into(), Arc::new(move || Box::new(factory()) as Box<dyn Behavior>));
    }

    pub fn has_behavior(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Add a definition built in code, replacing one with the same name
    pub fn insert(&mut self, definition: EntityDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&EntityDefinition> {
        self.definitions.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&EntityDefinition> {
        self.get(name)
            .ok_or_else(|| LayoutError::UnknownDefinition(name.to_string()))
    }

    /// Names of every definition, in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Build a definition from a template, resolving behavior names
    pub fn build(&self, template: &EntityTemplate) -> Result<EntityDefinition> {
        let mut definition = EntityDefinition::new(template.size)
            .named(template.name.clone())
            .with_origin(template.origin)
            .with_spatial_type(template.spatial_type)
            .on_layers(template.layers);
        definition.tags = template.tags.clone();

        for behavior in &template.behaviors {
            let factory = self
                .factories
                .get(behavior)
                .ok_or_else(|| LayoutError::UnknownBehavior(behavior.clone()))?;
            definition = definition.with_factory(factory.clone());
        }

        Ok(definition)
    }

    /// Load every `[[entity]]` table from TOML text. Returns how many
    /// definitions were added.
    pub fn load_toml_str(&mut self, text: &str) -> Result<usize> {
        let file: TemplateFile = toml::from_str(text)?;
        let built = file
            .entities
            .iter()
            .map(|template| self.build(template))
            .collect::<Result<Vec<_>>>()?;

        let count = built.len();
        for definition in built {
            self.insert(definition);
        }
        tracing::debug!("Loaded {} entity definitions", count);
        Ok(count)
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let text = std::fs::read_to_string(path)?;
        self.load_toml_str(&text)
    }
}

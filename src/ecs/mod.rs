//! Entities, behaviors and the registry that owns them

pub mod behavior;
pub mod context;
pub mod definition;
pub mod entity;
pub mod registry;

pub use behavior::{Behavior, BehaviorSlot, Siblings};
pub use context::BehaviorContext;
pub use definition::{BehaviorFactory, DefinitionCatalog, EntityDefinition, EntityTemplate};
pub use entity::{Entity, EntityMap, EntitySnapshot, Lifecycle};
pub use registry::{CommitSummary, EntityRegistry};

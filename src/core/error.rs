use thiserror::Error;

use crate::core::types::EntityId;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("Entity {entity} requires a {behavior} behavior but its definition has none")]
    MissingBehavior {
        entity: EntityId,
        behavior: &'static str,
    },

    #[error("Unknown behavior in definition: {0}")]
    UnknownBehavior(String),

    #[error("Unknown entity definition: {0}")]
    UnknownDefinition(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LayoutError>;

//! Built-in behaviors

pub mod damageable;
pub mod platformer;
pub mod respawn;
pub mod timer;

pub use damageable::{DamageListener, DamageableBehavior};
pub use platformer::{MoveState, PlatformerBehavior, PlatformerParams};
pub use respawn::FallRespawnBehavior;
pub use timer::TimerBehavior;

use crate::ecs::definition::DefinitionCatalog;

/// Make the built-in behaviors available to TOML templates
pub fn register_builtins(catalog: &mut DefinitionCatalog) {
    catalog.register_behavior("timer", TimerBehavior::new);
    catalog.register_behavior("damageable", DamageableBehavior::default);
    catalog.register_behavior("platformer", PlatformerBehavior::default);
    catalog.register_behavior("fall_respawn", FallRespawnBehavior::new);
}

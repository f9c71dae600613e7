//! Layout Core - entity registry, spatial grid and kinematic collision for 2D
//! layouts

pub mod behaviors;
pub mod collision;
pub mod core;
pub mod ecs;
pub mod input;
pub mod layout;
pub mod spatial;

pub use crate::collision::{Axis, Collision, Contact};
pub use crate::core::{EntityId, LayerMask, LayoutConfig, LayoutError, Result, Vec2};
pub use crate::ecs::{Behavior, BehaviorContext, EntityDefinition, Siblings};
pub use crate::input::{Button, ButtonSet, FrameInput, InputSnapshot};
pub use crate::layout::{FrameStats, Layout};
pub use crate::spatial::{Bounds, QueryFilter, SpatialGrid, SpatialType};

//! Collision resolution for movement

pub mod resolver;

pub use resolver::{move_and_collide, move_and_collide_with, resolution_axis, Axis, Collision, Contact};

//! Geometry and the broad-phase spatial index

pub mod bounds;
pub mod grid;
pub mod query;

pub use bounds::Bounds;
pub use grid::{CellSet, SpatialGrid, SpatialType};
pub use query::QueryFilter;

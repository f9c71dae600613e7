//! Uniform grid for broad-phase spatial queries
//!
//! The world is split into square cells. Every queryable entity is stored in
//! each in-range cell its bounding box covers. A box no larger than a cell
//! touches at most four cells (one per corner); wider or taller boxes also
//! occupy the cells between their corners.

use ahash::AHashSet;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::config::LayoutConfig;
use crate::core::error::Result;
use crate::core::types::EntityId;
use crate::ecs::entity::{Entity, EntityMap};
use crate::spatial::bounds::Bounds;
use crate::spatial::query::QueryFilter;

/// How an entity participates in spatial queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpatialType {
    /// Never stored in the grid, never returned from queries
    #[default]
    Pass,
    /// Returned from overlap queries, never blocks movement
    Overlap,
    /// Returned from overlap queries and blocks movement
    Solid,
}

impl SpatialType {
    pub fn is_queryable(&self) -> bool {
        !matches!(self, SpatialType::Pass)
    }

    pub fn is_solid(&self) -> bool {
        matches!(self, SpatialType::Solid)
    }
}

/// Distinct cell indexes occupied by one box, kept sorted
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellSet {
    cells: Vec<usize>,
}

impl CellSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.cells.binary_search(&index).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Fixed-size grid of entity sets covering the layout
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    world_size: Vec2,
    width: usize,
    height: usize,
    cells: Vec<AHashSet<EntityId>>,
}

impl SpatialGrid {
    /// Grid covering a `world_width` x `world_height` area
    ///
    /// Fails with `InvalidConfig` for a non-positive or non-finite size.
    pub fn new(cell_size: f32, world_width: f32, world_height: f32) -> Result<Self> {
        Self::from_config(&LayoutConfig::with_world(cell_size, world_width, world_height))
    }

    pub fn from_config(config: &LayoutConfig) -> Result<Self> {
        config.validate()?;
        let width = config.grid_width().max(1);
        let height = config.grid_height().max(1);

        Ok(Self {
            cell_size: config.cell_size,
            world_size: Vec2::new(config.width, config.height),
            width,
            height,
            cells: vec![AHashSet::new(); width * height],
        })
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Area the grid was sized for
    pub fn world_bounds(&self) -> Bounds {
        Bounds::new(0.0, 0.0, self.world_size.x, self.world_size.y)
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell index of a world point, `None` outside the grid
    #[inline]
    pub fn cell_index(&self, point: Vec2) -> Option<usize> {
        let col = (point.x / self.cell_size).floor();
        let row = (point.y / self.cell_size).floor();

        if col < 0.0 || row < 0.0 || col >= self.width as f32 || row >= self.height as f32 {
            return None;
        }

        Some(row as usize * self.width + col as usize)
    }

    /// Distinct in-range cells an entity with `bounds` is stored in
    pub fn occupied_cells(&self, bounds: &Bounds) -> CellSet {
        // Row-major order is already sorted and distinct
        CellSet {
            cells: self.covered_cells(bounds).collect(),
        }
    }

    /// Every in-range cell a rectangle of any size covers, row by row
    ///
    /// Out-of-range columns and rows are clamped away per axis, so a box
    /// hanging off the left edge never wraps into the previous row.
    pub fn covered_cells(&self, bounds: &Bounds) -> impl Iterator<Item = usize> {
        let span = |lo: f32, hi: f32, cells: usize| -> Option<(usize, usize)> {
            let first = (lo / self.cell_size).floor().max(0.0);
            let last = (hi / self.cell_size).floor().min(cells as f32 - 1.0);
            (first <= last).then(|| (first as usize, last as usize))
        };
        let cols = span(bounds.left(), bounds.right(), self.width);
        let rows = span(bounds.top(), bounds.bottom(), self.height);

        let width = self.width;
        cols.zip(rows).into_iter().flat_map(move |((c0, c1), (r0, r1))| {
            (r0..=r1).flat_map(move |row| (c0..=c1).map(move |col| row * width + col))
        })
    }

    /// World-space rectangle covered by a cell
    pub fn cell_bounds(&self, index: usize) -> Bounds {
        let row = index / self.width;
        let col = index % self.width;
        Bounds::new(
            col as f32 * self.cell_size,
            row as f32 * self.cell_size,
            self.cell_size,
            self.cell_size,
        )
    }

    /// Entities stored in a cell
    pub fn cell_occupants(&self, index: usize) -> impl Iterator<Item = EntityId> + '_ {
        self.cells.get(index).into_iter().flatten().copied()
    }

    /// Total number of (cell, entity) memberships
    pub fn membership_count(&self) -> usize {
        self.cells.iter().map(|c| c.len()).sum()
    }

    /// Insert the entity into every cell its current bounds touch
    pub fn add(&mut self, entity: &mut Entity) {
        if !entity.spatial_type().is_queryable() {
            return;
        }

        if !entity.cells().is_empty() {
            self.remove(entity);
        }

        let id = entity.id();
        let cells = self.occupied_cells(&entity.bounds());
        for index in cells.iter() {
            self.cells[index].insert(id);
        }
        tracing::trace!("grid add {} -> {:?}", id, cells);
        entity.set_cells(cells);
    }

    /// Remove the entity from every cell it was recorded in
    pub fn remove(&mut self, entity: &mut Entity) {
        let id = entity.id();
        for index in entity.cells().iter() {
            self.cells[index].remove(&id);
        }
        entity.set_cells(CellSet::new());
    }

    /// Bring the entity's cell membership in line with its current bounds
    ///
    /// Stationary entities exit early. Otherwise only the cells that were
    /// left or entered are touched. Returns true if membership changed.
    pub fn update(&mut self, entity: &mut Entity) -> bool {
        if entity.position() == entity.previous_position()
            && entity.spatial_type() == entity.previous_spatial_type()
        {
            return false;
        }

        let next = if entity.spatial_type().is_queryable() {
            self.occupied_cells(&entity.bounds())
        } else {
            CellSet::new()
        };
        let current = entity.cells();
        if next == *current {
            return false;
        }

        let id = entity.id();
        for index in current.iter().filter(|&i| !next.contains(i)) {
            self.cells[index].remove(&id);
        }
        for index in next.iter().filter(|&i| !current.contains(i)) {
            self.cells[index].insert(id);
        }
        tracing::trace!("grid move {} {:?} -> {:?}", id, current, next);
        entity.set_cells(next);
        true
    }

    /// Distinct entities accepted by `filter` whose bounds intersect `bounds`
    ///
    /// Results are sorted by id, i.e. by creation order.
    pub fn query(&self, bounds: &Bounds, entities: &EntityMap, filter: &QueryFilter<'_>) -> Vec<EntityId> {
        let mut candidates: AHashSet<EntityId> = AHashSet::new();
        for index in self.covered_cells(bounds) {
            candidates.extend(self.cells[index].iter().copied());
        }

        let mut results: Vec<EntityId> = candidates
            .into_iter()
            .filter(|id| {
                entities
                    .get(id)
                    .map(|other| filter.accepts(other) && other.bounds().intersects(bounds))
                    .unwrap_or(false)
            })
            .collect();
        results.sort_unstable();
        results
    }

    /// Drop every membership
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::LayoutError;
    use crate::ecs::definition::EntityDefinition;

    fn grid_64() -> SpatialGrid {
        SpatialGrid::new(16.0, 64.0, 64.0).unwrap()
    }

    fn solid(id: u64, x: f32, y: f32, w: f32, h: f32) -> Entity {
        let def = EntityDefinition::new(Vec2::new(w, h)).solid();
        Entity::from_definition(EntityId(id), &def, Vec2::new(x, y))
    }

    fn index(col: usize, row: usize) -> usize {
        row * 4 + col
    }

    #[test]
    fn test_grid_dimensions() {
        let grid = SpatialGrid::new(16.0, 70.0, 64.0).unwrap();
        assert_eq!(grid.width(), 5);
        assert_eq!(grid.height(), 4);
        assert_eq!(grid.len(), 20);
    }

    #[test]
    fn test_new_rejects_degenerate_cell_size() {
        assert!(matches!(
            SpatialGrid::new(0.0, 64.0, 64.0),
            Err(LayoutError::InvalidConfig(_))
        ));
        assert!(SpatialGrid::new(f32::NAN, 64.0, 64.0).is_err());
        assert!(SpatialGrid::new(16.0, f32::INFINITY, 64.0).is_err());
    }

    #[test]
    fn test_cell_index_out_of_range() {
        let grid = grid_64();
        assert_eq!(grid.cell_index(Vec2::new(0.0, 0.0)), Some(0));
        assert_eq!(grid.cell_index(Vec2::new(63.9, 63.9)), Some(15));
        assert_eq!(grid.cell_index(Vec2::new(64.0, 10.0)), None);
        assert_eq!(grid.cell_index(Vec2::new(-1.0, 20.0)), None);
        assert_eq!(grid.cell_index(Vec2::new(10.0, -0.5)), None);
    }

    #[test]
    fn test_occupied_cells_straddling_box() {
        let grid = grid_64();
        let cells = grid.occupied_cells(&Bounds::new(30.0, 30.0, 4.0, 4.0));
        let got: Vec<usize> = cells.iter().collect();
        assert_eq!(got, vec![index(1, 1), index(2, 1), index(1, 2), index(2, 2)]);
    }

    #[test]
    fn test_occupied_cells_collapses_duplicates() {
        let grid = grid_64();
        let cells = grid.occupied_cells(&Bounds::new(2.0, 2.0, 4.0, 4.0));
        assert_eq!(cells.len(), 1);
        assert!(cells.contains(0));
    }

    #[test]
    fn test_occupied_cells_discards_outside_corners() {
        let grid = grid_64();
        // Left half hangs off the world; no wrap into the previous row
        let cells = grid.occupied_cells(&Bounds::new(-8.0, 20.0, 16.0, 4.0));
        let got: Vec<usize> = cells.iter().collect();
        assert_eq!(got, vec![index(0, 1)]);
    }

    #[test]
    fn test_wide_box_occupies_cells_between_corners() {
        let grid = grid_64();
        // Spans columns 0 through 3 on a single row
        let cells = grid.occupied_cells(&Bounds::new(4.0, 20.0, 56.0, 4.0));
        let got: Vec<usize> = cells.iter().collect();
        assert_eq!(got, vec![index(0, 1), index(1, 1), index(2, 1), index(3, 1)]);

        let cells = grid.occupied_cells(&Bounds::new(4.0, 4.0, 40.0, 40.0));
        assert_eq!(cells.len(), 9);
        assert!(cells.contains(index(1, 1)));
    }

    #[test]
    fn test_query_finds_wide_solid_under_its_middle() {
        let mut grid = grid_64();
        let mut entities = EntityMap::default();
        let mut platform = solid(1, 4.0, 40.0, 56.0, 8.0);
        grid.add(&mut platform);
        entities.insert(platform.id(), platform);

        // Only touches column 1, which neither corner of the platform lands in
        let hits = grid.query(&Bounds::new(20.0, 36.0, 6.0, 6.0), &entities, &QueryFilter::new());
        assert_eq!(hits, vec![EntityId(1)]);
    }

    #[test]
    fn test_pass_entity_never_added() {
        let mut grid = grid_64();
        let def = EntityDefinition::new(Vec2::new(8.0, 8.0));
        let mut ghost = Entity::from_definition(EntityId(1), &def, Vec2::new(10.0, 10.0));
        grid.add(&mut ghost);
        assert_eq!(grid.membership_count(), 0);
        assert!(ghost.cells().is_empty());
    }

    #[test]
    fn test_add_and_remove_multi_cell() {
        let mut grid = grid_64();
        let mut a = solid(1, 30.0, 30.0, 4.0, 4.0);
        grid.add(&mut a);
        assert_eq!(grid.membership_count(), 4);
        assert_eq!(a.cells().len(), 4);

        grid.remove(&mut a);
        assert_eq!(grid.membership_count(), 0);
        assert!(a.cells().is_empty());

        // Removing again is harmless
        grid.remove(&mut a);
        assert_eq!(grid.membership_count(), 0);
    }

    #[test]
    fn test_update_stationary_is_noop() {
        let mut grid = grid_64();
        let mut a = solid(1, 5.0, 5.0, 4.0, 4.0);
        grid.add(&mut a);
        assert!(!grid.update(&mut a));
    }

    #[test]
    fn test_update_within_cell_keeps_membership() {
        let mut grid = grid_64();
        let mut a = solid(1, 2.0, 2.0, 4.0, 4.0);
        grid.add(&mut a);
        a.set_position(Vec2::new(6.0, 6.0));
        assert!(!grid.update(&mut a));
        assert_eq!(grid.cell_occupants(0).collect::<Vec<_>>(), vec![EntityId(1)]);
    }

    #[test]
    fn test_update_moves_only_delta() {
        let mut grid = grid_64();
        let mut a = solid(1, 10.0, 2.0, 4.0, 4.0);
        grid.add(&mut a);
        assert_eq!(a.cells().len(), 1);

        // Now straddles columns 0 and 1
        a.set_position(Vec2::new(14.0, 2.0));
        assert!(grid.update(&mut a));
        assert_eq!(a.cells().len(), 2);
        assert_eq!(grid.cell_occupants(index(1, 0)).count(), 1);

        // Second update with no movement in between changes nothing
        assert!(!grid.update(&mut a));
        assert_eq!(grid.membership_count(), 2);
    }

    #[test]
    fn test_update_to_pass_removes() {
        let mut grid = grid_64();
        let mut a = solid(1, 10.0, 10.0, 4.0, 4.0);
        grid.add(&mut a);
        a.set_spatial_type(SpatialType::Pass);
        assert!(grid.update(&mut a));
        assert_eq!(grid.membership_count(), 0);
    }

    #[test]
    fn test_query_dedupes_and_rechecks_bounds() {
        let mut grid = grid_64();
        let mut entities = EntityMap::default();
        let mut a = solid(1, 30.0, 30.0, 4.0, 4.0);
        let mut b = solid(2, 20.0, 20.0, 2.0, 2.0);
        grid.add(&mut a);
        grid.add(&mut b);
        entities.insert(a.id(), a);
        entities.insert(b.id(), b);

        let filter = QueryFilter::new();
        let hits = grid.query(&Bounds::new(32.0, 32.0, 1.0, 1.0), &entities, &filter);
        assert_eq!(hits, vec![EntityId(1)]);

        // Covers all four of A's cells, still reported once
        let hits = grid.query(&Bounds::new(17.0, 17.0, 30.0, 30.0), &entities, &filter);
        assert_eq!(hits, vec![EntityId(1), EntityId(2)]);
    }

    #[test]
    fn test_query_larger_than_a_cell_visits_interior_cells() {
        let mut grid = grid_64();
        let mut entities = EntityMap::default();
        let mut a = solid(1, 20.0, 20.0, 4.0, 4.0);
        grid.add(&mut a);
        entities.insert(a.id(), a);

        // No corner of the query lands in A's cell
        let hits = grid.query(&Bounds::new(2.0, 2.0, 60.0, 60.0), &entities, &QueryFilter::new());
        assert_eq!(hits, vec![EntityId(1)]);
        assert_eq!(grid.covered_cells(&Bounds::new(-10.0, -10.0, 100.0, 100.0)).count(), 16);
        assert_eq!(grid.covered_cells(&Bounds::new(70.0, 0.0, 4.0, 4.0)).count(), 0);
    }

    #[test]
    fn test_cell_bounds() {
        let grid = grid_64();
        assert_eq!(grid.cell_bounds(index(2, 1)), Bounds::new(32.0, 16.0, 16.0, 16.0));
    }
}

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Padding, in world units, added around every rectangle query so entities
/// sitting exactly on a cell edge are never missed.
pub const QUERY_PADDING: f64 = 1.0;

/// Axis-aligned rectangle in world coordinates (inclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    /// Builds a rectangle from two corners in any order.
    #[must_use]
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }

    /// Square of half-size `radius` centred on `(x, y)`.
    #[must_use]
    pub fn around(x: f64, y: f64, radius: f64) -> Self {
        Self::new(x - radius, y - radius, x + radius, y + radius)
    }

    #[must_use]
    pub fn expanded(&self, by: f64) -> Self {
        Self {
            min_x: self.min_x - by,
            min_y: self.min_y - by,
            max_x: self.max_x + by,
            max_y: self.max_y + by,
        }
    }

    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

pub type CellKey = (i32, i32);

/// Uniform grid mapping world positions to buckets of entity ids.
///
/// Every entity lives in exactly one cell, keyed by
/// `(floor(x / cell_size), floor(y / cell_size))`. The grid never stores
/// positions: callers pass the old position on `remove`/`move_entity`, and the
/// agent record stays the source of truth for where an entity is.
///
/// # Examples
/// ```
/// use fauna_core::spatial_grid::{Rect, SpatialGrid};
///
/// let mut grid = SpatialGrid::new(10.0);
/// grid.insert(7u32, 15.0, 15.0);
/// assert_eq!(grid.query_rect(Rect::around(15.0, 15.0, 2.0)), vec![7]);
///
/// grid.move_entity(7, 15.0, 15.0, 85.0, 85.0);
/// assert!(grid.query_rect(Rect::around(15.0, 15.0, 2.0)).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct SpatialGrid<K> {
    cell_size: f64,
    cells: HashMap<CellKey, Vec<K>>,
    len: usize,
}

impl<K> SpatialGrid<K>
where
    K: Copy + Eq + Hash + Debug,
{
    /// # Panics
    /// If `cell_size` is not a positive finite number.
    #[must_use]
    pub fn new(cell_size: f64) -> Self {
        assert!(
            cell_size.is_finite() && cell_size > 0.0,
            "spatial grid cell size must be positive, got {cell_size}"
        );
        Self {
            cell_size,
            cells: HashMap::new(),
            len: 0,
        }
    }

    #[must_use]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of indexed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of non-empty cells.
    #[must_use]
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Cell coordinate for a world position. Casts saturate, so non-finite
    /// input lands in a deterministic (if meaningless) cell.
    #[inline]
    #[must_use]
    pub fn cell_key(&self, x: f64, y: f64) -> CellKey {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    pub fn insert(&mut self, id: K, x: f64, y: f64) {
        let key = self.cell_key(x, y);
        let bucket = self.cells.entry(key).or_default();
        if !bucket.contains(&id) {
            bucket.push(id);
            self.len += 1;
        }
    }

    /// Removes `id` from the cell covering `(x, y)`. Removing a non-member is a
    /// no-op; the return value says whether anything was removed.
    pub fn remove(&mut self, id: K, x: f64, y: f64) -> bool {
        let key = self.cell_key(x, y);
        self.remove_from_cell(key, id)
    }

    /// Moves `id` from the cell of the old position to the cell of the new one.
    /// Staying inside one cell costs nothing.
    ///
    /// # Panics
    /// If the entity changes cell but was never indexed at the old position:
    /// the caller has lost track of the grid and later queries would be wrong.
    pub fn move_entity(&mut self, id: K, old_x: f64, old_y: f64, new_x: f64, new_y: f64) {
        let old_key = self.cell_key(old_x, old_y);
        let new_key = self.cell_key(new_x, new_y);
        if old_key == new_key {
            return;
        }
        if !self.remove_from_cell(old_key, id) {
            panic!("spatial grid: {id:?} moved from cell {old_key:?} but was never indexed there");
        }
        self.cells.entry(new_key).or_default().push(id);
        self.len += 1;
    }

    #[must_use]
    pub fn contains(&self, id: K, x: f64, y: f64) -> bool {
        self.cells
            .get(&self.cell_key(x, y))
            .is_some_and(|bucket| bucket.contains(&id))
    }

    /// Ids of every entity in a cell overlapping `rect` (padded by
    /// [`QUERY_PADDING`]). Results are advisory: callers re-check distance.
    #[must_use]
    pub fn query_rect(&self, rect: Rect) -> Vec<K> {
        let mut result = Vec::new();
        self.query_rect_into(rect, &mut result);
        result
    }

    pub fn query_rect_into(&self, rect: Rect, result: &mut Vec<K>) {
        result.clear();
        let padded = rect.expanded(QUERY_PADDING);
        let (min_cx, min_cy) = self.cell_key(padded.min_x, padded.min_y);
        let (max_cx, max_cy) = self.cell_key(padded.max_x, padded.max_y);

        let span = (i64::from(max_cx) - i64::from(min_cx) + 1)
            * (i64::from(max_cy) - i64::from(min_cy) + 1);

        // Huge rectangles: walk the occupied cells instead of the key range.
        if span > self.cells.len() as i64 {
            for (&(cx, cy), bucket) in &self.cells {
                if cx >= min_cx && cx <= max_cx && cy >= min_cy && cy <= max_cy {
                    result.extend_from_slice(bucket);
                }
            }
            return;
        }

        for cy in min_cy..=max_cy {
            for cx in min_cx..=max_cx {
                if let Some(bucket) = self.cells.get(&(cx, cy)) {
                    result.extend_from_slice(bucket);
                }
            }
        }
    }

    pub fn query_radius_into(&self, x: f64, y: f64, radius: f64, result: &mut Vec<K>) {
        self.query_rect_into(Rect::around(x, y, radius), result);
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.len = 0;
    }

    fn remove_from_cell(&mut self, key: CellKey, id: K) -> bool {
        let Some(bucket) = self.cells.get_mut(&key) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|&member| member == id) else {
            return false;
        };
        bucket.swap_remove(pos);
        if bucket.is_empty() {
            self.cells.remove(&key);
        }
        self.len -= 1;
        true
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_spatial_grid_query_finds_nearby() {
        let mut grid = SpatialGrid::new(5.0);
        grid.insert(1u32, 1.0, 1.0);
        grid.insert(2u32, 2.0, 2.0);
        grid.insert(3u32, 40.0, 40.0);

        let mut found = grid.query_rect(Rect::around(1.5, 1.5, 2.0));
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn test_insert_then_remove_round_trip() {
        let mut grid = SpatialGrid::new(10.0);
        grid.insert(9u32, 33.0, 47.0);
        assert_eq!(grid.len(), 1);
        assert!(grid.query_rect(Rect::around(33.0, 47.0, 1.0)).contains(&9));

        assert!(grid.remove(9, 33.0, 47.0));
        assert!(grid.query_rect(Rect::around(33.0, 47.0, 1.0)).is_empty());
        assert!(grid.is_empty());
        assert_eq!(grid.occupied_cells(), 0);
    }

    #[test]
    fn test_remove_non_member_is_noop() {
        let mut grid = SpatialGrid::new(10.0);
        grid.insert(1u32, 5.0, 5.0);
        assert!(!grid.remove(2, 5.0, 5.0));
        assert!(!grid.remove(1, 55.0, 55.0));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_move_within_cell_is_noop() {
        let mut grid = SpatialGrid::new(10.0);
        grid.insert(1u32, 1.0, 1.0);
        grid.move_entity(1, 1.0, 1.0, 9.0, 9.0);
        assert!(grid.contains(1, 9.0, 9.0));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_move_across_cells() {
        let mut grid = SpatialGrid::new(10.0);
        grid.insert(1u32, 1.0, 1.0);
        grid.move_entity(1, 1.0, 1.0, 95.0, 42.0);
        assert!(grid.contains(1, 95.0, 42.0));
        assert!(!grid.contains(1, 1.0, 1.0));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    #[should_panic(expected = "never indexed")]
    fn test_move_unknown_entity_panics() {
        let mut grid: SpatialGrid<u32> = SpatialGrid::new(10.0);
        grid.move_entity(1, 1.0, 1.0, 50.0, 50.0);
    }

    #[test]
    fn test_negative_coordinates_use_floor() {
        let grid: SpatialGrid<u32> = SpatialGrid::new(10.0);
        assert_eq!(grid.cell_key(-0.5, -10.0), (-1, -1));
        assert_eq!(grid.cell_key(0.0, 9.99), (0, 0));
    }

    #[test]
    fn test_padding_catches_boundary_entities() {
        let mut grid = SpatialGrid::new(10.0);
        grid.insert(1u32, 10.0, 5.0);
        // Rectangle ends exactly at the cell boundary the entity sits on.
        assert!(grid.query_rect(Rect::new(0.0, 0.0, 9.5, 9.0)).contains(&1));
    }

    #[test]
    fn test_huge_query_walks_occupied_cells() {
        let mut grid = SpatialGrid::new(1.0);
        grid.insert(1u32, -5000.0, 3.0);
        grid.insert(2u32, 8000.0, -2.0);
        let mut found = grid.query_rect(Rect::new(-1e7, -1e7, 1e7, 1e7));
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn test_duplicate_insert_counted_once() {
        let mut grid = SpatialGrid::new(10.0);
        grid.insert(1u32, 1.0, 1.0);
        grid.insert(1u32, 2.0, 2.0);
        assert_eq!(grid.len(), 1);
    }
}

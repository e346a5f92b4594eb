//! Dense placement grid.
//!
//! One [`BrickId`] per cell in a flat boxed slice. Cells are addressed by
//! `(pos - min)` flattened as `z * size_x * size_y + y * size_x + x`, so a
//! row of x-adjacent cells is contiguous in memory.

use bricklayer_shared::Vec3i;

use crate::brick::{Brick, BrickId, EMPTY_CELL};

/// Dense cell -> brick id map over an inclusive box of cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    min: Vec3i,
    max: Vec3i,
    dims: Vec3i,
    /// `dims.x * dims.y`, cached for indexing.
    layer: usize,
    cells: Box<[BrickId]>,
}

impl Grid {
    /// Creates an empty grid covering `min..=max`.
    ///
    /// An inverted axis yields a zero-length dimension (no cells).
    #[must_use]
    pub fn new(min: Vec3i, max: Vec3i) -> Self {
        let dims = Vec3i::new(
            (max.x - min.x + 1).max(0),
            (max.y - min.y + 1).max(0),
            (max.z - min.z + 1).max(0),
        );
        let count = dims.volume() as usize;
        Self {
            min,
            max,
            dims,
            layer: dims.x as usize * dims.y as usize,
            cells: vec![EMPTY_CELL; count].into_boxed_slice(),
        }
    }

    /// Lowest addressable cell.
    #[inline]
    #[must_use]
    pub const fn min(&self) -> Vec3i {
        self.min
    }

    /// Highest addressable cell (inclusive).
    #[inline]
    #[must_use]
    pub const fn max(&self) -> Vec3i {
        self.max
    }

    /// Cell counts per axis.
    #[inline]
    #[must_use]
    pub const fn dims(&self) -> Vec3i {
        self.dims
    }

    /// Total cell count.
    #[inline]
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Flat index of `pos`, or `None` outside `min..=max`.
    #[inline]
    #[must_use]
    pub fn index(&self, pos: Vec3i) -> Option<usize> {
        let rel = pos - self.min;
        if (0..3).any(|axis| rel[axis] < 0 || rel[axis] >= self.dims[axis]) {
            return None;
        }
        Some(rel.z as usize * self.layer + rel.y as usize * self.dims.x as usize + rel.x as usize)
    }

    /// Id stored at `pos`. Out-of-range cells read as empty.
    #[inline]
    #[must_use]
    pub fn get(&self, pos: Vec3i) -> BrickId {
        self.index(pos).map_or(EMPTY_CELL, |i| self.cells[i])
    }

    /// Writes `id` into every in-range cell of a footprint.
    ///
    /// Callers validate first; out-of-range cells are skipped, never written.
    pub fn fill(&mut self, position: Vec3i, size: Vec3i, id: BrickId) {
        let (position, size) = self.clip(position, size);
        for cell in Brick::footprint(position, size) {
            if let Some(i) = self.index(cell) {
                self.cells[i] = id;
            }
        }
    }

    /// First footprint cell holding something other than empty or `exclude`.
    #[must_use]
    pub fn first_conflict(
        &self,
        position: Vec3i,
        size: Vec3i,
        exclude: Option<BrickId>,
    ) -> Option<(Vec3i, BrickId)> {
        let (position, size) = self.clip(position, size);
        Brick::footprint(position, size).find_map(|cell| {
            let occupant = self.get(cell);
            let free = occupant == EMPTY_CELL || Some(occupant) == exclude;
            (!free).then_some((cell, occupant))
        })
    }

    /// Part of a footprint that lies inside the grid. Sizes may be zero.
    fn clip(&self, position: Vec3i, size: Vec3i) -> (Vec3i, Vec3i) {
        let mut lo = position;
        let mut extent = Vec3i::ZERO;
        for axis in 0..3 {
            let start = i64::from(position[axis]).max(i64::from(self.min[axis]));
            let end = (i64::from(position[axis]) + i64::from(size[axis]))
                .min(i64::from(self.max[axis]) + 1);
            lo[axis] = start as i32;
            extent[axis] = (end - start).max(0) as i32;
        }
        (lo, extent)
    }

    /// Number of non-empty cells.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|&&id| id != EMPTY_CELL).count()
    }

    /// Empties every cell.
    pub fn clear(&mut self) {
        self.cells.fill(EMPTY_CELL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_layout() {
        let grid = Grid::new(Vec3i::new(-1, -1, 0), Vec3i::new(2, 1, 1));
        assert_eq!(grid.dims(), Vec3i::new(4, 3, 2));
        assert_eq!(grid.cell_count(), 24);
        assert_eq!(grid.index(Vec3i::new(-1, -1, 0)), Some(0));
        assert_eq!(grid.index(Vec3i::new(0, -1, 0)), Some(1));
        assert_eq!(grid.index(Vec3i::new(-1, 0, 0)), Some(4));
        assert_eq!(grid.index(Vec3i::new(-1, -1, 1)), Some(12));
        assert_eq!(grid.index(Vec3i::new(2, 1, 1)), Some(23));
        assert_eq!(grid.index(Vec3i::new(3, 0, 0)), None);
        assert_eq!(grid.index(Vec3i::new(0, 0, -1)), None);
    }

    #[test]
    fn test_fill_and_conflict() {
        let mut grid = Grid::new(Vec3i::ZERO, Vec3i::splat(3));
        grid.fill(Vec3i::ZERO, Vec3i::new(2, 2, 1), 5);
        assert_eq!(grid.occupied(), 4);
        assert_eq!(grid.get(Vec3i::new(1, 1, 0)), 5);

        let hit = grid.first_conflict(Vec3i::new(1, 1, 0), Vec3i::ONE, None);
        assert_eq!(hit, Some((Vec3i::new(1, 1, 0), 5)));
        assert_eq!(grid.first_conflict(Vec3i::new(1, 1, 0), Vec3i::ONE, Some(5)), None);

        grid.clear();
        assert_eq!(grid.occupied(), 0);
    }

    #[test]
    fn test_out_of_range_is_never_written() {
        let mut grid = Grid::new(Vec3i::ZERO, Vec3i::ONE);
        grid.fill(Vec3i::new(1, 1, 1), Vec3i::splat(2), 9);
        assert_eq!(grid.occupied(), 1);
        assert_eq!(grid.get(Vec3i::splat(2)), EMPTY_CELL);
    }
}

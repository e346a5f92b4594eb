//! Point-in-time copy of World contents, taken when going offline.

use std::collections::BTreeMap;

use crate::brick::{Brick, BrickId};
use crate::world::Grid;

/// Deep copy of the grid, the registry and the id counter.
///
/// Bricks are plain values, so cloning the map is a deep clone.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub(crate) grid: Grid,
    pub(crate) bricks: BTreeMap<BrickId, Brick>,
    pub(crate) next_brick_id: BrickId,
}

impl Snapshot {
    /// Number of bricks captured.
    #[must_use]
    pub fn brick_count(&self) -> usize {
        self.bricks.len()
    }
}

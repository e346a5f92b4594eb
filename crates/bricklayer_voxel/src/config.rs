//! Voxelizer settings.

use bricklayer_core::{Orientation, Palette};
use serde::{Deserialize, Serialize};

/// How meshes are turned into bricks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxelizerConfig {
    /// Tolerance for parallel rays, barycentric bounds and merging hits
    /// that land on a shared edge.
    pub epsilon: f64,
    /// Seed for the palette draw. Same seed, same colors.
    pub seed: u64,
    /// Orientation of every emitted brick.
    pub orientation: Orientation,
    /// Colors drawn from, uniformly.
    pub palette: Vec<Palette>,
}

impl Default for VoxelizerConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-5,
            seed: 0,
            orientation: Orientation::East,
            palette: Palette::ALL.to_vec(),
        }
    }
}

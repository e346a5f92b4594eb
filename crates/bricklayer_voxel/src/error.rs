//! # Voxelizer Error Types

use bricklayer_networking::ReplicationError;
use thiserror::Error;

/// Errors raised while voxelizing or importing a mesh.
#[derive(Error, Debug)]
pub enum VoxelError {
    /// The mesh has no triangles.
    #[error("mesh has no triangles")]
    EmptyMesh,

    /// The mesh is flat along at least one axis.
    #[error("mesh bounds are degenerate along axis {axis}: extent {extent}")]
    DegenerateBounds {
        /// 0 = x, 1 = y, 2 = z.
        axis: usize,
        /// Extent along that axis.
        extent: f64,
    },

    /// The requested resolution cannot produce a grid.
    #[error("invalid resolution: {0} units along the longest axis")]
    InvalidResolution(u32),

    /// A triangle references a vertex that does not exist.
    #[error("triangle {triangle} references vertex {index}, mesh has {vertex_count}")]
    IndexOutOfRange {
        /// Offending triangle.
        triangle: usize,
        /// Offending vertex index.
        index: u32,
        /// Number of vertices.
        vertex_count: usize,
    },

    /// A flat vertex buffer is not a whole number of 3-vectors or triangles.
    #[error("flat buffer of length {0} is not a multiple of 3")]
    RaggedBuffer(usize),

    /// Submitting the import failed.
    #[error("replication failed: {0}")]
    Replication(#[from] ReplicationError),
}

/// Result type for voxelizer operations.
pub type VoxelResult<T> = Result<T, VoxelError>;

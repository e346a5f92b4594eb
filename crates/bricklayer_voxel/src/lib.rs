//! # BRICKLAYER Voxel
//!
//! Bulk population of a World from an imported triangle mesh.
//!
//! ## Core Components
//!
//! - [`TriangleMesh`]: vertices + index triples, as handed over by a mesh reader
//! - [`Voxelizer`]: ray-parity solid voxelization and brick emission
//! - [`VoxelizerConfig`]: epsilon, palette seed, orientation
//!
//! ## Example
//!
//! ```rust,ignore
//! use bricklayer_voxel::{TriangleMesh, Voxelizer};
//!
//! let mesh = TriangleMesh::cuboid(Vec3d::ZERO, Vec3d::splat(10.0));
//! let voxelizer = Voxelizer::default();
//! let voxels = voxelizer.voxelize(&mesh, 10)?;
//! assert!(voxels.is_watertight());
//!
//! // One transaction for the whole import
//! let report = voxelizer.populate(&voxels, &manager, Vec3i::new(-10, -10, 0))?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod mesh;
pub mod voxelizer;

pub use config::VoxelizerConfig;
pub use error::{VoxelError, VoxelResult};
pub use mesh::TriangleMesh;
pub use voxelizer::{ImportReport, Voxelization, Voxelizer, MAX_RESOLUTION};

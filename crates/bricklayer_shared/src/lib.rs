//! # BRICKLAYER Shared
//!
//! Geometry types used by both the replicated world and the voxelizer.
//!
//! ## CRITICAL RULE
//!
//! This crate must stay free of threads, I/O and world state. If it needs
//! to know what a brick is, it belongs in `bricklayer_core`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod geometry;
pub mod math;

pub use constants::{
    DEFAULT_GRID_MAX, DEFAULT_GRID_MIN, DEFAULT_SERVER_URL, DEFAULT_WORLD_ID, STANDARD_BRICK_SIZE,
};
pub use geometry::{tri_box_overlap, BBox3d, Ray3d};
pub use math::{Vec3d, Vec3f, Vec3i};

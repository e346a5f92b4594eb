//! # World & Network Defaults
//!
//! Defaults for a fresh client. Every value here can be overridden through
//! the client configuration file.

use crate::math::Vec3i;

// =============================================================================
// GRID CONFIGURATION
// =============================================================================

/// Minimum grid cell (inclusive) of the default world.
pub const DEFAULT_GRID_MIN: Vec3i = Vec3i::new(-31, -31, 0);

/// Maximum grid cell of the default world.
pub const DEFAULT_GRID_MAX: Vec3i = Vec3i::new(32, 32, 63);

/// Footprint of a standard brick (and of every voxelized brick).
pub const STANDARD_BRICK_SIZE: Vec3i = Vec3i::new(2, 2, 1);

// =============================================================================
// NETWORK CONFIGURATION
// =============================================================================

/// Endpoint of the authority.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/lego";

/// World (namespace) id used when none is configured.
pub const DEFAULT_WORLD_ID: u64 = 0;

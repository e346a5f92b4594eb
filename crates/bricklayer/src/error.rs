//! # Universe Error Types

use bricklayer_core::ParseError;
use bricklayer_networking::ReplicationError;
use bricklayer_voxel::VoxelError;
use thiserror::Error;

/// Errors surfaced by [`Universe`](crate::Universe) calls.
#[derive(Error, Debug)]
pub enum BricklayerError {
    /// An op line did not parse.
    #[error("invalid op: {0}")]
    Parse(#[from] ParseError),

    /// Refused locally, a transaction misuse, or the manager is gone.
    #[error(transparent)]
    Replication(#[from] ReplicationError),

    /// Mesh import failed.
    #[error(transparent)]
    Voxel(#[from] VoxelError),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BricklayerError {
    /// True if the local World refused the op. Nothing changed.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Replication(ReplicationError::Rejected(_)))
    }
}

/// Result type for universe operations.
pub type BricklayerResult<T> = Result<T, BricklayerError>;

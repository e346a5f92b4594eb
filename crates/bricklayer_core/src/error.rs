//! # Core Error Types
//!
//! Everything that can go wrong before an operation touches the World:
//! it either fails to parse, or the World refuses it.

use bricklayer_shared::Vec3i;
use thiserror::Error;

use crate::brick::BrickId;

/// Reasons an op line fails to deserialize.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line had no tokens at all.
    #[error("empty op line")]
    Empty,

    /// The leading keyword names no known operation.
    #[error("unknown op keyword: {0}")]
    UnknownKeyword(String),

    /// The line ended before every field was read.
    #[error("{keyword}: missing field `{field}`")]
    MissingField {
        /// Operation keyword.
        keyword: &'static str,
        /// Field that was expected next.
        field: &'static str,
    },

    /// A field did not parse as the expected type.
    #[error("{keyword}: bad value `{value}` for field `{field}`")]
    BadField {
        /// Operation keyword.
        keyword: &'static str,
        /// Field being parsed.
        field: &'static str,
        /// Offending token.
        value: String,
    },

    /// Extra tokens followed the last field.
    #[error("{keyword}: unexpected trailing token `{token}`")]
    TrailingToken {
        /// Operation keyword.
        keyword: &'static str,
        /// First surplus token.
        token: String,
    },
}

/// Reasons the World refuses an operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The op references a brick id that is not in the registry.
    #[error("unknown brick id {0}")]
    UnknownBrick(BrickId),

    /// The footprint leaves the grid on some axis.
    #[error("placement {position} size {size} leaves the grid on axis {axis}")]
    OutOfBounds {
        /// Effective position.
        position: Vec3i,
        /// Effective size.
        size: Vec3i,
        /// First failing axis (0 = x, 1 = y, 2 = z).
        axis: usize,
    },

    /// A cell of the footprint is held by another brick.
    #[error("cell {cell} is occupied by brick {occupant}")]
    Collision {
        /// First colliding cell.
        cell: Vec3i,
        /// Brick holding it.
        occupant: BrickId,
    },

    /// Some extent component is zero or negative.
    #[error("invalid brick size {0}")]
    InvalidSize(Vec3i),
}

/// Errors raised by the core crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Op text did not deserialize.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// World validation failed.
    #[error("rejected: {0}")]
    Rejected(#[from] RejectReason),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

//! # BRICKLAYER Core
//!
//! The replicated state every client holds: a grid of bricks and the
//! operations that change it.
//!
//! ## Design Principles
//!
//! 1. **One owner** - the [`World`] owns every [`Brick`]; everything else holds a [`BrickId`]
//! 2. **Closed op set** - [`Operation`] is a plain enum, matched exhaustively
//! 3. **Validate, then apply** - validation is pure, application is unconditional
//! 4. **Deterministic replay** - same transactions in the same order give the same ids
//!
//! ## Example
//!
//! ```rust
//! use bricklayer_core::{Operation, Orientation, Palette, World};
//! use bricklayer_shared::Vec3i;
//!
//! let mut world = World::new(0, Vec3i::new(-31, -31, 0), Vec3i::new(32, 32, 63));
//! let op = Operation::CreateBrick {
//!     position: Vec3i::ZERO,
//!     size: Vec3i::new(2, 2, 1),
//!     orientation: Orientation::East,
//!     color: Palette::Red.rgb(),
//! };
//! world.validate(&op).unwrap();
//! let id = world.apply(&op).unwrap();
//! assert_eq!(world.brick_at(Vec3i::new(1, 1, 0)).map(|b| b.id()), Some(id));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod brick;
pub mod error;
pub mod oplog;
pub mod world;

pub use brick::{Brick, BrickId, Orientation, Palette, EMPTY_CELL};
pub use error::{CoreError, CoreResult, ParseError, RejectReason};
pub use oplog::{Operation, Transaction, XaId};
pub use world::{Grid, Snapshot, World, WorldId};

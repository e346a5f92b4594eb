//! # BRICKLAYER
//!
//! A shared brick world that many clients edit at once through one
//! authority.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            UNIVERSE                              │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  ┌──────────────┐   ops    ┌────────────────────┐   text   ┌───┐ │
//! │  │  Voxelizer   │─────────>│ TransactionManager │<────────>│ S │ │
//! │  │  mesh import │          │  validate, batch,  │  Submit  │ E │ │
//! │  └──────────────┘          │  queue, replay     │  Since   │ R │ │
//! │                            └─────────┬──────────┘          │ V │ │
//! │                                      │ server-approved xa  │ E │ │
//! │                                      v                     │ R │ │
//! │                            ┌────────────────────┐          └───┘ │
//! │                            │       World        │                │
//! │                            │  grid + registry   │──> WorldEvent  │
//! │                            └────────────────────┘                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `universe`: the [`Universe`] facade
//! - `config`: one TOML file for every unit
//! - `error`: [`BricklayerError`]

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod universe;

// Re-export the units
pub use bricklayer_core as core;
pub use bricklayer_networking as networking;
pub use bricklayer_shared as shared;
pub use bricklayer_voxel as voxel;

// Re-export commonly used types
pub use config::UniverseConfig;
pub use error::{BricklayerError, BricklayerResult};
pub use universe::Universe;

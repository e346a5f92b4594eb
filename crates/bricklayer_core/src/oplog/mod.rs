//! # Operation Log
//!
//! Typed brick mutations ([`Operation`]) and the batches they travel in
//! ([`Transaction`]). Both have a line-oriented text form; parsing returns a
//! `Result`, so an operation that failed to parse can never be applied.

mod operation;
mod transaction;

pub use operation::Operation;
pub use transaction::{Transaction, XaId};

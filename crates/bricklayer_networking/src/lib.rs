//! # BRICKLAYER Networking
//!
//! Optimistic replication of a brick World through a single authority.
//!
//! ## Architecture
//!
//! - **Protocol**: newline-delimited text framing for submissions, catch-up
//!   requests and recorded-transaction replies
//! - **Transport**: [`ServerLink`] trait; [`HttpLink`] posts to the authority
//! - **Client**: [`TransactionManager`] validates locally, batches, queues, and
//!   replays the server's log on a background dispatcher thread
//! - **Server**: [`LocalServer`], an in-process authority for tests and demos
//!
//! ## Authority Model
//!
//! ```text
//! CLIENT                                   SERVER
//!   |--- Submit <world> <xa> <client> <req> -->|
//!   |                                          | <- validate, record, assign id
//!   |<-- 1 + every xa since <xa> + # ----------|
//!   |                                          |
//!   replay in receipt order, skip stale ids
//! ```
//!
//! A client never applies its own op while online; it applies the server's
//! echo of it, in the order the server recorded it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bricklayer_networking::{ClientConfig, LocalServer, TransactionManager};
//!
//! let server = Arc::new(LocalServer::default());
//! let manager = TransactionManager::new(&ClientConfig::default(), server)?;
//! let ticket = manager.execute_op(op)?.ticket().cloned();
//! manager.flush();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod protocol;
pub mod server;
pub mod transport;

pub use client::{Execution, Outcome, Ticket, TransactionManager};
pub use config::ClientConfig;
pub use error::{ProtocolError, ReplicationError, ReplicationResult, TransportError};
pub use events::{EventChannel, WorldEvent};
pub use protocol::{ClientId, RecordedTransaction, ReqId, Request, Response, XaHeader};
pub use server::{LocalServer, ServerConfig, ServerStats};
pub use transport::{HttpLink, LinkStats, ServerLink};

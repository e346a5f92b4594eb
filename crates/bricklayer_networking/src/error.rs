//! # Replication Error Types

use bricklayer_core::{ParseError, RejectReason};
use thiserror::Error;

/// Failures talking to the server.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The HTTP request could not be built, sent or read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned status {0}")]
    Status(u16),

    /// The link is not usable (closed or unreachable by construction).
    #[error("link unavailable: {0}")]
    Unavailable(String),
}

/// Wire protocol decoding failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The message had no content at all.
    #[error("empty message")]
    Empty,

    /// The first line names no known request.
    #[error("unknown request kind `{0}`")]
    UnknownRequest(String),

    /// A header line did not have the expected integer fields.
    #[error("malformed header `{0}`")]
    BadHeader(String),

    /// An op line inside a transaction block failed to parse.
    #[error("bad op line: {0}")]
    BadOp(#[from] ParseError),

    /// A transaction block was not closed by `*`.
    #[error("unterminated transaction block")]
    Unterminated,

    /// A reply ended before its `#` line.
    #[error("reply ended without `#`")]
    MissingTerminator,
}

/// Errors surfaced by the transaction manager.
#[derive(Error, Debug)]
pub enum ReplicationError {
    /// The local World refused the op; nothing was sent.
    #[error("rejected locally: {0}")]
    Rejected(#[from] RejectReason),

    /// Op text did not parse.
    #[error("invalid op: {0}")]
    Parse(#[from] ParseError),

    /// The server could not be reached.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server's reply could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// `close_transaction` without a matching `open_transaction`.
    #[error("no transaction is open")]
    NoOpenTransaction,

    /// `open_transaction` while one is already open.
    #[error("a transaction is already open")]
    TransactionAlreadyOpen,

    /// Submission of a transaction with no ops.
    #[error("transaction has no operations")]
    EmptyTransaction,

    /// The dispatcher has been shut down.
    #[error("transaction manager is shut down")]
    ShutDown,

    /// Configuration could not be loaded or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for replication operations.
pub type ReplicationResult<T> = Result<T, ReplicationError>;

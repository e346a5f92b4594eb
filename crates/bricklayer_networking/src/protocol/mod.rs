//! # Wire Protocol
//!
//! Newline-delimited text, posted as the body of one HTTP request.
//!
//! ```text
//! Submit                          TransactionsSince
//! <world> <xa> <client> <req>     <world> <since>
//! <op line>
//! ...
//! *
//! ```
//!
//! Responses carry an optional success flag, then any number of recorded
//! transaction blocks framed like a submission, then `#`:
//!
//! ```text
//! 1
//! <world> <xa> <client> <req>
//! <op line>
//! *
//! #
//! ```

mod request;
mod response;

pub use request::Request;
pub use response::Response;

use std::fmt;

use bricklayer_core::{Transaction, WorldId, XaId};

use crate::error::ProtocolError;

/// Random per-process token identifying a client.
pub type ClientId = u64;

/// Per-client monotonically increasing request counter.
pub type ReqId = u64;

/// Closes a transaction block.
pub const XA_TERMINATOR: char = '*';

/// Closes a response.
pub const RESPONSE_TERMINATOR: char = '#';

/// First line of a submission.
pub const SUBMIT: &str = "Submit";

/// First line of a catch-up request.
pub const TRANSACTIONS_SINCE: &str = "TransactionsSince";

/// `<world> <xa> <client> <req>` line that opens every transaction block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct XaHeader {
    /// Namespace the transaction belongs to.
    pub world_id: WorldId,
    /// Transaction id (proposed on submit, assigned when recorded).
    pub xa_id: XaId,
    /// At-most-once token: who sent it.
    pub client_id: ClientId,
    /// At-most-once token: which of their requests it was.
    pub req_id: ReqId,
}

impl XaHeader {
    /// Parses a header line.
    ///
    /// # Errors
    ///
    /// Anything other than exactly four unsigned integers.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let bad = || ProtocolError::BadHeader(line.trim().to_string());
        let fields = line
            .split_whitespace()
            .map(str::parse::<u64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| bad())?;
        match fields[..] {
            [world_id, xa_id, client_id, req_id] => Ok(Self { world_id, xa_id, client_id, req_id }),
            _ => Err(bad()),
        }
    }
}

impl fmt::Display for XaHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.world_id, self.xa_id, self.client_id, self.req_id)
    }
}

/// A transaction as the server recorded it.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedTransaction {
    /// Framing header.
    pub header: XaHeader,
    /// The ops, tagged with `header.xa_id`.
    pub transaction: Transaction,
}

impl RecordedTransaction {
    /// Builds a record, tagging the transaction with the header's id.
    #[must_use]
    pub fn new(header: XaHeader, transaction: Transaction) -> Self {
        Self { transaction: transaction.with_id(header.xa_id), header }
    }

    /// Server-assigned id.
    #[must_use]
    pub const fn xa_id(&self) -> XaId {
        self.header.xa_id
    }

    /// Appends the framed block to `out`.
    pub fn encode_into(&self, out: &mut String) {
        encode_block(out, &self.header, &self.transaction);
    }
}

fn encode_block(out: &mut String, header: &XaHeader, transaction: &Transaction) {
    out.push_str(&header.to_string());
    out.push('\n');
    out.push_str(&transaction.serialize());
    out.push(XA_TERMINATOR);
    out.push('\n');
}

/// True for the line that closes a transaction block.
fn is_terminator(line: &str) -> bool {
    line.trim_start().starts_with(XA_TERMINATOR)
}

/// Reads op lines up to the block terminator.
///
/// Blank lines are skipped. Every line up to `*` is consumed even after a
/// parse failure, so the caller can resume at the next block.
fn read_block<'a, I>(lines: &mut I) -> Result<Transaction, ProtocolError>
where
    I: Iterator<Item = &'a str>,
{
    let mut transaction = Transaction::new();
    let mut first_error = None;
    for line in lines.by_ref() {
        if is_terminator(line) {
            return first_error.map_or(Ok(transaction), Err);
        }
        if line.trim().is_empty() {
            continue;
        }
        match bricklayer_core::Operation::deserialize(line) {
            Ok(op) => transaction.push(op),
            Err(e) => {
                first_error.get_or_insert(ProtocolError::BadOp(e));
            }
        }
    }
    Err(ProtocolError::Unterminated)
}

//! Client -> server messages.

use bricklayer_core::{Transaction, WorldId, XaId};

use super::{encode_block, read_block, XaHeader, SUBMIT, TRANSACTIONS_SINCE};
use crate::error::ProtocolError;

/// A message posted to the server.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    /// Propose a transaction.
    Submit {
        /// Framing; `xa_id` is the next id the client expects.
        header: XaHeader,
        /// Ops to apply atomically.
        transaction: Transaction,
    },
    /// Ask for every recorded transaction with id >= `since`.
    TransactionsSince {
        /// Namespace.
        world_id: WorldId,
        /// First id wanted.
        since: XaId,
    },
}

impl Request {
    /// Encodes to wire text.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Submit { header, transaction } => {
                let mut out = format!("{SUBMIT}\n");
                encode_block(&mut out, header, transaction);
                out
            }
            Self::TransactionsSince { world_id, since } => {
                format!("{TRANSACTIONS_SINCE}\n{world_id} {since}\n")
            }
        }
    }

    /// Decodes wire text.
    ///
    /// # Errors
    ///
    /// Unknown request kind, malformed header or op lines, or a submission
    /// missing its terminator.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let kind = lines.next().ok_or(ProtocolError::Empty)?.trim();
        let header_line = lines.next().ok_or_else(|| ProtocolError::BadHeader(String::new()))?;

        match kind {
            SUBMIT => {
                let header = XaHeader::parse(header_line)?;
                let transaction = read_block(&mut lines)?;
                Ok(Self::Submit { header, transaction })
            }
            TRANSACTIONS_SINCE => {
                let bad = || ProtocolError::BadHeader(header_line.trim().to_string());
                let mut fields = header_line.split_whitespace().map(str::parse::<u64>);
                match (fields.next(), fields.next(), fields.next()) {
                    (Some(Ok(world_id)), Some(Ok(since)), None) => {
                        Ok(Self::TransactionsSince { world_id, since })
                    }
                    _ => Err(bad()),
                }
            }
            other => Err(ProtocolError::UnknownRequest(other.to_string())),
        }
    }
}

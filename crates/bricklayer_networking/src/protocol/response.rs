//! Server -> client messages.

use super::{is_terminator, read_block, RecordedTransaction, XaHeader, RESPONSE_TERMINATOR};
use crate::error::ProtocolError;

/// A decoded server reply.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Response {
    /// Submission outcome. Catch-up replies may omit it.
    pub success: Option<bool>,
    /// Recorded transactions in receipt order.
    pub transactions: Vec<RecordedTransaction>,
    /// Blocks dropped because they failed to parse.
    pub skipped: usize,
}

impl Response {
    /// Encodes to wire text.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::new();
        if let Some(success) = self.success {
            out.push_str(if success { "1\n" } else { "0\n" });
        }
        for recorded in &self.transactions {
            recorded.encode_into(&mut out);
        }
        out.push(RESPONSE_TERMINATOR);
        out.push('\n');
        out
    }

    /// Decodes wire text.
    ///
    /// A malformed block is logged and skipped; decoding resumes after its
    /// `*`. Blocks without ops are dropped silently.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Empty`] for a blank reply and
    /// [`ProtocolError::MissingTerminator`] for one cut short before `#`.
    /// A truncated reply yields nothing, not even its complete blocks.
    /// Malformed blocks are recoverable and reported through `skipped`.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        if text.trim().is_empty() {
            return Err(ProtocolError::Empty);
        }

        let mut response = Self::default();
        let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();

        if let Some(first) = lines.peek() {
            response.success = match first.trim() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            };
            if response.success.is_some() {
                lines.next();
            }
        }

        let mut terminated = false;
        while let Some(line) = lines.next() {
            if line.trim_start().starts_with(RESPONSE_TERMINATOR) {
                terminated = true;
                break;
            }

            let header = match XaHeader::parse(line) {
                Ok(header) => header,
                Err(e) => {
                    tracing::warn!("Skipping transaction block: {}", e);
                    response.skipped += 1;
                    // Resynchronize on the next block terminator.
                    for rest in lines.by_ref() {
                        if is_terminator(rest) {
                            break;
                        }
                    }
                    continue;
                }
            };

            match read_block(&mut lines) {
                Ok(transaction) if transaction.is_empty() => {
                    tracing::debug!("Dropping empty transaction {}", header.xa_id);
                }
                Ok(transaction) => {
                    response.transactions.push(RecordedTransaction::new(header, transaction));
                }
                Err(e) => {
                    tracing::warn!("Skipping transaction {}: {}", header.xa_id, e);
                    response.skipped += 1;
                }
            }
        }

        if !terminated {
            return Err(ProtocolError::MissingTerminator);
        }
        Ok(response)
    }

    /// True if the server explicitly refused the submission.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.success == Some(false)
    }
}

//! Transactions: ordered batches of operations.
//!
//! A transaction serializes as its op lines back to back. Ids, sentinels and
//! any other framing belong to the wire protocol, not to this type.

use crate::error::ParseError;
use crate::oplog::Operation;

/// Server-assigned transaction id.
pub type XaId = u64;

/// An ordered batch of operations submitted and replayed as one unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transaction {
    id: Option<XaId>,
    ops: Vec<Operation>,
}

impl Transaction {
    /// Creates an empty, untagged transaction (accumulate phase).
    #[must_use]
    pub const fn new() -> Self {
        Self { id: None, ops: Vec::new() }
    }

    /// Creates a transaction from ops.
    #[must_use]
    pub fn from_ops(ops: Vec<Operation>) -> Self {
        Self { id: None, ops }
    }

    /// Wraps a single operation.
    #[must_use]
    pub fn single(op: Operation) -> Self {
        Self { id: None, ops: vec![op] }
    }

    /// Tags the transaction with a server id.
    #[must_use]
    pub fn with_id(mut self, id: XaId) -> Self {
        self.id = Some(id);
        self
    }

    /// Server id, if this came off the wire.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> Option<XaId> {
        self.id
    }

    /// Appends an op.
    pub fn push(&mut self, op: Operation) {
        self.ops.push(op);
    }

    /// Moves every op of `other` onto the end of this transaction.
    pub fn append(&mut self, other: &mut Self) {
        self.ops.append(&mut other.ops);
    }

    /// The ops in order.
    #[inline]
    #[must_use]
    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    /// Number of ops.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True if there is nothing to submit.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Drains the ops, leaving this transaction empty and untagged.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Op lines concatenated, each newline-terminated.
    #[must_use]
    pub fn serialize(&self) -> String {
        self.ops.iter().map(Operation::serialize).collect()
    }

    /// Parses op lines, ignoring blank ones.
    ///
    /// # Errors
    ///
    /// Fails on the first line that is not a valid op.
    pub fn deserialize(text: &str) -> Result<Self, ParseError> {
        let ops = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(Operation::deserialize)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_ops(ops))
    }
}

impl FromIterator<Operation> for Transaction {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self::from_ops(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Transaction {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brick::{Orientation, Palette};
    use bricklayer_shared::Vec3i;

    #[test]
    fn test_transaction_has_no_framing() {
        let xa: Transaction = [
            Operation::CreateBrick {
                position: Vec3i::ZERO,
                size: Vec3i::new(2, 2, 1),
                orientation: Orientation::North,
                color: Palette::Blue.rgb(),
            },
            Operation::DeleteBrick { brick_id: 1 },
        ]
        .into_iter()
        .collect();

        let text = xa.clone().with_id(5).serialize();
        assert_eq!(text, "CreateBrick 0 0 0 2 2 1 0 0 0 1\nDeleteBrick 1\n");

        let back = Transaction::deserialize(&text).unwrap();
        assert_eq!(back, xa);
        assert_eq!(back.id(), None);
    }

    #[test]
    fn test_deserialize_reports_bad_line() {
        let err = Transaction::deserialize("DeleteBrick 1\nExplode\n").unwrap_err();
        assert_eq!(err, ParseError::UnknownKeyword("Explode".into()));
    }

    #[test]
    fn test_take_resets() {
        let mut xa = Transaction::single(Operation::DeleteBrick { brick_id: 2 }).with_id(3);
        let taken = xa.take();
        assert_eq!(taken.len(), 1);
        assert!(xa.is_empty());
        assert_eq!(xa.id(), None);
    }
}

//! Errors reported by structural verification.
//!
//! Tree operations themselves cannot fail; absence is reported with
//! `Option` or `bool`. These errors only come out of
//! [`RadixTree::verify_integrity`](crate::RadixTree::verify_integrity).

use thiserror::Error;

use crate::art::NodeKind;

/// A broken structural invariant, located by depth in key bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    /// A node holds more or fewer children than its shape allows.
    #[error("{kind} at depth {depth} holds {count} children")]
    ChildCount {
        /// Shape of the offending node.
        kind: NodeKind,
        /// Depth of the node.
        depth: usize,
        /// Number of children found.
        count: usize,
    },

    /// The stored child count disagrees with the occupied slots.
    #[error("{kind} at depth {depth} records {stored} children but has {actual}")]
    CountMismatch {
        /// Shape of the offending node.
        kind: NodeKind,
        /// Depth of the node.
        depth: usize,
        /// Count stored in the header.
        stored: usize,
        /// Children actually reachable.
        actual: usize,
    },

    /// An internal node with fewer than two entries was not collapsed.
    #[error("{kind} at depth {depth} has only {entries} entries")]
    Underfull {
        /// Shape of the offending node.
        kind: NodeKind,
        /// Depth of the node.
        depth: usize,
        /// Children plus terminal.
        entries: usize,
    },

    /// Child key bytes are not strictly ascending.
    #[error("{kind} at depth {depth} has unsorted or duplicate key bytes")]
    UnsortedKeys {
        /// Shape of the offending node.
        kind: NodeKind,
        /// Depth of the node.
        depth: usize,
    },

    /// A Node48 index entry points at an empty slot.
    #[error("Node48 at depth {depth} maps byte {byte:#04x} to an empty slot")]
    DanglingIndex {
        /// Depth of the node.
        depth: usize,
        /// Key byte with the bad index entry.
        byte: u8,
    },

    /// The inline prefix window disagrees with the keys below it.
    #[error("prefix window at depth {depth} does not match the keys below it")]
    PrefixMismatch {
        /// Depth of the node.
        depth: usize,
    },

    /// A child's keys do not carry the byte it is stored under.
    #[error("child under byte {byte:#04x} at depth {depth} holds keys that do not belong there")]
    MisroutedChild {
        /// Depth of the byte the child is keyed by.
        depth: usize,
        /// Key byte the child is stored under.
        byte: u8,
    },

    /// A terminal leaf's key does not end at its node's prefix.
    #[error("terminal at depth {depth} has a key of length {key_len}")]
    MisplacedTerminal {
        /// Depth where the terminal's key should end.
        depth: usize,
        /// Actual length of the terminal's key.
        key_len: usize,
    },

    /// The element count disagrees with the number of reachable leaves.
    #[error("tree reports {reported} entries but {reachable} are reachable")]
    SizeMismatch {
        /// Value returned by `len()`.
        reported: usize,
        /// Leaves found by walking the tree.
        reachable: usize,
    },
}

/// Result type for structural verification.
pub type Result<T> = std::result::Result<T, IntegrityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = IntegrityError::ChildCount {
            kind: NodeKind::Node48,
            depth: 3,
            count: 7,
        };
        assert_eq!(err.to_string(), "Node48 at depth 3 holds 7 children");

        let err = IntegrityError::DanglingIndex { depth: 0, byte: b'a' };
        assert_eq!(err.to_string(), "Node48 at depth 0 maps byte 0x61 to an empty slot");

        let err = IntegrityError::SizeMismatch {
            reported: 2,
            reachable: 1,
        };
        assert_eq!(err.to_string(), "tree reports 2 entries but 1 are reachable");
    }
}

//! Compressed-prefix comparisons.
//!
//! Nodes store only the first [`MAX_PREFIX_LEN`] bytes of their prefix.
//! Lookups compare that window and leave the rest to the final leaf key
//! comparison; inserts need the exact divergence point and read the
//! missing bytes from the subtree's minimum leaf.

use super::node::{Node, MAX_PREFIX_LEN};

/// Number of leading bytes of the node's inline window that match `key`
/// from `depth`. Never looks past the window or the end of the key.
pub(crate) fn check_prefix<V>(node: &Node<V>, key: &[u8], depth: usize) -> usize {
    let Some(header) = node.header() else {
        return 0;
    };
    let rest = key.get(depth..).unwrap_or_default();
    header
        .window()
        .iter()
        .zip(rest)
        .take_while(|(a, b)| a == b)
        .count()
}

/// Exact length of the match between the node's full prefix and `key` from
/// `depth`, capped at the prefix length.
pub(crate) fn prefix_mismatch<V>(node: &Node<V>, key: &[u8], depth: usize) -> usize {
    let Some(header) = node.header() else {
        return 0;
    };
    let prefix_len = header.prefix_len as usize;
    let matched = check_prefix(node, key, depth);
    if matched < header.window_len() || prefix_len <= MAX_PREFIX_LEN {
        return matched;
    }

    // The window matched in full; the rest of the prefix lives in the leaves.
    let Some(leaf) = node.minimum() else {
        return matched;
    };
    let end = (depth + prefix_len).min(leaf.key.len()).min(key.len());
    let start = depth + matched;
    if start >= end {
        return matched;
    }
    let extra = leaf.key[start..end]
        .iter()
        .zip(&key[start..end])
        .take_while(|(a, b)| a == b)
        .count();
    matched + extra
}

/// Length of the common run of `a` and `b` starting at `depth`.
pub(crate) fn longest_common_prefix(a: &[u8], b: &[u8], depth: usize) -> usize {
    let a = a.get(depth..).unwrap_or_default();
    let b = b.get(depth..).unwrap_or_default();
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::super::node::{Leaf, Node4};
    use super::*;

    fn node_with_prefix(prefix: &[u8], leaves: &[&[u8]]) -> Node<()> {
        let mut node = Node4::new();
        node.header.set_prefix(prefix, prefix.len());
        for key in leaves {
            node.attach_leaf(Leaf::new(key, ()), prefix.len());
        }
        Node::Node4(node)
    }

    #[test]
    fn test_check_prefix_window_only() {
        let node = node_with_prefix(b"abcdefghijkl", &[b"abcdefghijklX", b"abcdefghijklY"]);
        assert_eq!(check_prefix(&node, b"abcdefghZZZZ", 0), 8);
        assert_eq!(check_prefix(&node, b"abcZ", 0), 3);
        assert_eq!(check_prefix(&node, b"abc", 0), 3);
        assert_eq!(check_prefix(&node, b"", 0), 0);
        assert_eq!(check_prefix(&node, b"ab", 5), 0);
    }

    #[test]
    fn test_check_prefix_at_depth() {
        let node = node_with_prefix(b"cd", &[b"abcdX", b"abcdY"]);
        assert_eq!(check_prefix(&node, b"abcdX", 2), 2);
        assert_eq!(check_prefix(&node, b"abcX", 2), 1);
    }

    #[test]
    fn test_prefix_mismatch_beyond_window() {
        let node = node_with_prefix(b"abcdefghijkl", &[b"abcdefghijklX", b"abcdefghijklY"]);
        assert_eq!(prefix_mismatch(&node, b"abcdefghijkZ", 0), 11);
        assert_eq!(prefix_mismatch(&node, b"abcdefghijklQ", 0), 12);
        assert_eq!(prefix_mismatch(&node, b"abcdefghij", 0), 10);
        assert_eq!(prefix_mismatch(&node, b"abcdeZ", 0), 5);
    }

    #[test]
    fn test_prefix_mismatch_short_prefix() {
        let node = node_with_prefix(b"abc", &[b"abcX", b"abcY"]);
        assert_eq!(prefix_mismatch(&node, b"abcQ", 0), 3);
        assert_eq!(prefix_mismatch(&node, b"abQ", 0), 2);
    }

    #[test]
    fn test_longest_common_prefix() {
        assert_eq!(longest_common_prefix(b"romane", b"romanus", 0), 4);
        assert_eq!(longest_common_prefix(b"romane", b"romanus", 2), 3);
        assert_eq!(longest_common_prefix(b"roXane", b"roXYnus", 2), 1);
        assert_eq!(longest_common_prefix(b"abcd", b"abXd", 0), 2);
        assert_eq!(longest_common_prefix(b"test", b"test", 0), 4);
        assert_eq!(longest_common_prefix(b"te", b"test", 0), 2);
        assert_eq!(longest_common_prefix(b"", b"test", 0), 0);
        assert_eq!(longest_common_prefix(b"ab", b"ab", 5), 0);
    }
}

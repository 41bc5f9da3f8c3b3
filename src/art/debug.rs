//! Debug utilities for ART troubleshooting.

use std::fmt::{self, Write};

use super::node::{Node, NodeKind};
use super::RadixTree;
use crate::error::{IntegrityError, Result};

impl<V> RadixTree<V> {
    /// Check every structural invariant of the tree.
    ///
    /// Walks the whole tree, so it is meant for tests and debugging rather
    /// than hot paths.
    pub fn verify_integrity(&self) -> Result<()> {
        let mut reachable = 0;
        if let Some(root) = &self.root {
            verify_node(root, 0, &mut reachable)?;
        }
        if reachable != self.size {
            return Err(IntegrityError::SizeMismatch {
                reported: self.size,
                reachable,
            });
        }
        Ok(())
    }
}

impl<V: fmt::Debug> RadixTree<V> {
    /// Render the tree structure, one node per line.
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "size: {}", self.size);
        match &self.root {
            Some(root) => {
                let _ = dump_node(root, 0, &mut out);
            }
            None => out.push_str("(empty)\n"),
        }
        out
    }
}

fn verify_node<V>(node: &Node<V>, depth: usize, reachable: &mut usize) -> Result<()> {
    let Some(header) = node.header() else {
        *reachable += 1;
        return Ok(());
    };
    let kind = node.kind();
    let count = usize::from(header.count);

    let (min, max) = kind.child_bounds();
    if count < min || count > max {
        return Err(IntegrityError::ChildCount { kind, depth, count });
    }
    if header.entries() < 2 {
        return Err(IntegrityError::Underfull {
            kind,
            depth,
            entries: header.entries(),
        });
    }
    check_slots(node, depth)?;

    let bytes: Vec<u8> = node.children().map(|(b, _)| b).collect();
    if bytes.len() != count {
        return Err(IntegrityError::CountMismatch {
            kind,
            depth,
            stored: count,
            actual: bytes.len(),
        });
    }
    if bytes.windows(2).any(|w| w[0] >= w[1]) {
        return Err(IntegrityError::UnsortedKeys { kind, depth });
    }

    // Every key below must carry the reference key's bytes up to `end`.
    let Some(reference) = node.minimum() else {
        return Err(IntegrityError::Underfull {
            kind,
            depth,
            entries: 0,
        });
    };
    let end = depth + header.prefix_len as usize;
    let window = depth..depth + header.window_len();
    if reference.key.len() < end || reference.key[window] != *header.window() {
        return Err(IntegrityError::PrefixMismatch { depth });
    }
    let shared = &reference.key[..end];

    if let Some(terminal) = &header.terminal {
        if terminal.key.len() != end {
            return Err(IntegrityError::MisplacedTerminal {
                depth: end,
                key_len: terminal.key.len(),
            });
        }
        *reachable += 1;
    }

    for (byte, child) in node.children() {
        let routed = child.minimum().is_some_and(|leaf| {
            leaf.key.get(..end) == Some(shared) && leaf.key.get(end) == Some(&byte)
        });
        if !routed {
            return Err(IntegrityError::MisroutedChild { depth: end, byte });
        }
        verify_node(child, end + 1, reachable)?;
    }
    Ok(())
}

/// Shape-specific slot checks the generic walk cannot see.
fn check_slots<V>(node: &Node<V>, depth: usize) -> Result<()> {
    match node {
        Node::Node4(n) => {
            let count = usize::from(n.header.count);
            if n.children[..count].iter().any(Option::is_none)
                || n.children[count..].iter().any(Option::is_some)
            {
                return Err(IntegrityError::CountMismatch {
                    kind: NodeKind::Node4,
                    depth,
                    stored: count,
                    actual: n.children.iter().flatten().count(),
                });
            }
        }
        Node::Node16(n) => {
            let count = usize::from(n.header.count);
            if n.children[..count].iter().any(Option::is_none)
                || n.children[count..].iter().any(Option::is_some)
            {
                return Err(IntegrityError::CountMismatch {
                    kind: NodeKind::Node16,
                    depth,
                    stored: count,
                    actual: n.children.iter().flatten().count(),
                });
            }
        }
        Node::Node48(n) => {
            for (byte, &idx) in n.index.iter().enumerate() {
                if idx != 0 && n.children.get(usize::from(idx) - 1).map_or(true, Option::is_none) {
                    return Err(IntegrityError::DanglingIndex {
                        depth,
                        byte: byte as u8,
                    });
                }
            }
            let occupied = n.children.iter().flatten().count();
            if occupied != usize::from(n.header.count) {
                return Err(IntegrityError::CountMismatch {
                    kind: NodeKind::Node48,
                    depth,
                    stored: usize::from(n.header.count),
                    actual: occupied,
                });
            }
        }
        Node::Node256(_) | Node::Leaf(_) => {}
    }
    Ok(())
}

fn dump_node<V: fmt::Debug>(node: &Node<V>, indent: usize, out: &mut String) -> fmt::Result {
    let pad = "  ".repeat(indent);
    let Some(header) = node.header() else {
        if let Node::Leaf(leaf) = node {
            let key = String::from_utf8_lossy(&leaf.key);
            writeln!(out, "{pad}Leaf {:?} -> {:?}", key, leaf.value)?;
        }
        return Ok(());
    };

    writeln!(
        out,
        "{pad}{} prefix={:?} prefix_len={} children={}",
        node.kind(),
        String::from_utf8_lossy(header.window()),
        header.prefix_len,
        header.count,
    )?;
    if let Some(leaf) = &header.terminal {
        writeln!(out, "{pad}  [end] {:?} -> {:?}", String::from_utf8_lossy(&leaf.key), leaf.value)?;
    }
    for (byte, child) in node.children() {
        writeln!(out, "{pad}  [{:#04x}] ->", byte)?;
        dump_node(child, indent + 2, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::art::node::{Leaf, Node4};

    #[test]
    fn test_verify_detects_size_mismatch() {
        let mut tree = RadixTree::new();
        tree.insert("a", 1);
        tree.insert("b", 2);
        tree.size = 3;
        assert_eq!(
            tree.verify_integrity(),
            Err(IntegrityError::SizeMismatch {
                reported: 3,
                reachable: 2
            })
        );
    }

    #[test]
    fn test_verify_detects_bad_window() {
        let mut tree = RadixTree::new();
        tree.insert("abcX", 1);
        tree.insert("abcY", 2);
        if let Some(header) = tree.root.as_mut().and_then(Node::header_mut) {
            header.prefix[1] = b'z';
        }
        assert_eq!(tree.verify_integrity(), Err(IntegrityError::PrefixMismatch { depth: 0 }));
    }

    #[test]
    fn test_verify_detects_misrouted_child() {
        let mut node = Node4::new();
        node.attach_leaf(Leaf::new(b"a", 1), 0);
        node.attach_leaf(Leaf::new(b"b", 2), 0);
        node.keys[1] = b'c';
        let mut tree = RadixTree::new();
        tree.root = Some(Node::Node4(node));
        tree.size = 2;
        assert_eq!(
            tree.verify_integrity(),
            Err(IntegrityError::MisroutedChild { depth: 0, byte: b'c' })
        );
    }

    #[test]
    fn test_verify_detects_underfull_node() {
        let mut node = Node4::new();
        node.attach_leaf(Leaf::new(b"a", 1), 0);
        let mut tree = RadixTree::new();
        tree.root = Some(Node::Node4(node));
        tree.size = 1;
        assert!(matches!(
            tree.verify_integrity(),
            Err(IntegrityError::Underfull { entries: 1, .. })
        ));
    }

    #[test]
    fn test_debug_dump() {
        let mut tree = RadixTree::new();
        assert_eq!(tree.debug_dump(), "size: 0\n(empty)\n");

        tree.insert("romane", 1);
        tree.insert("romanus", 2);
        tree.insert("roman", 3);
        let dump = tree.debug_dump();
        assert!(dump.starts_with("size: 3\nNode4 prefix=\"roman\" prefix_len=5 children=2\n"));
        assert!(dump.contains("[end] \"roman\" -> 3"));
        assert!(dump.contains("Leaf \"romanus\" -> 2"));
    }
}

//! Adaptive Radix Tree (ART) implementation.
//!
//! Based on "The Adaptive Radix Tree: ARTful Indexing for Main-Memory Databases"
//! by Leis et al., 2013.
//!
//! Key features:
//! - Adaptive node sizes (4, 16, 48, 256 children) with shrink hysteresis
//! - Path compression with an 8-byte inline prefix window
//! - Terminal slots, so a key may be a strict prefix of another key
//! - In-order iteration by unsigned byte comparison

mod debug;
mod iter;
mod node;
mod prefix;
mod simd;

use std::cmp::Ordering;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use crate::config::Config;

pub use iter::Iter;
pub use node::{NodeKind, MAX_PREFIX_LEN};

use node::{Leaf, Node, Node4};
use prefix::{check_prefix, longest_common_prefix, prefix_mismatch};

/// Callback that receives values as they leave the tree through `remove`.
pub type DestroyFn<V> = Arc<dyn Fn(V) + Send + Sync>;

/// Node counts for a tree, gathered by a full walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtStats {
    /// Leaves hanging from child slots
    pub leaves: usize,
    /// Leaves stored in terminal slots
    pub terminals: usize,
    /// Number of Node4 instances
    pub node4: usize,
    /// Number of Node16 instances
    pub node16: usize,
    /// Number of Node48 instances
    pub node48: usize,
    /// Number of Node256 instances
    pub node256: usize,
    /// Longest root-to-leaf path, counted in nodes
    pub max_depth: usize,
}

impl ArtStats {
    /// Total internal nodes of every shape.
    pub fn inner_nodes(&self) -> usize {
        self.node4 + self.node16 + self.node48 + self.node256
    }
}

/// An ordered map from byte strings to values, stored as an adaptive radix tree.
///
/// Keys are compared as unsigned bytes, so iteration yields them in
/// lexicographic order with shorter keys before their extensions.
#[derive(Clone)]
pub struct RadixTree<V> {
    root: Option<Node<V>>,
    size: usize,
    destroy: Option<DestroyFn<V>>,
    config: Config,
}

impl<V> RadixTree<V> {
    /// Create a new empty tree. Removed values are simply dropped.
    pub fn new() -> Self {
        Self {
            root: None,
            size: 0,
            destroy: None,
            config: Config::default(),
        }
    }

    /// Create a new empty tree that hands each removed value to `destroy`.
    pub fn with_destroy<F>(destroy: F) -> Self
    where
        F: Fn(V) + Send + Sync + 'static,
    {
        Self::with_destroy_and_config(destroy, Config::default())
    }

    /// Create a new empty tree with a destroy callback and explicit configuration.
    pub fn with_destroy_and_config<F>(destroy: F, config: Config) -> Self
    where
        F: Fn(V) + Send + Sync + 'static,
    {
        Self {
            root: None,
            size: 0,
            destroy: Some(Arc::new(destroy)),
            config,
        }
    }

    /// The configuration this tree was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Check if the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Insert a key-value pair.
    ///
    /// Returns the previous value if the key was already present. A replaced
    /// value goes back to the caller and never reaches the destroy callback.
    pub fn insert(&mut self, key: impl AsRef<[u8]>, value: V) -> Option<V> {
        let old = Self::insert_recursive(&mut self.root, key.as_ref(), 0, value);
        if old.is_none() {
            self.size += 1;
        }
        old
    }

    fn insert_recursive(
        slot: &mut Option<Node<V>>,
        key: &[u8],
        depth: usize,
        value: V,
    ) -> Option<V> {
        let Some(node) = slot.take() else {
            *slot = Some(Node::leaf(key, value));
            return None;
        };
        let (node, old) = Self::insert_into(node, key, depth, value);
        *slot = Some(node);
        old
    }

    fn insert_into(node: Node<V>, key: &[u8], mut depth: usize, value: V) -> (Node<V>, Option<V>) {
        let mut node = match node {
            Node::Leaf(leaf) => return Self::split_leaf(leaf, key, depth, value),
            inner => inner,
        };

        let prefix_len = node.prefix_len();
        if prefix_len > 0 {
            let matched = prefix_mismatch(&node, key, depth);
            if matched < prefix_len {
                return (Self::split_prefix(node, key, depth, matched, value), None);
            }
            depth += prefix_len;
        }

        if depth == key.len() {
            let old = match node.header_mut() {
                Some(header) => header.store_terminal(key, value),
                None => None,
            };
            return (node, old);
        }

        let byte = key[depth];
        if let Some(child) = node.find_child_mut(byte) {
            let old = Self::insert_recursive(child, key, depth + 1, value);
            return (node, old);
        }
        (node.add_child(byte, Node::leaf(key, value)), None)
    }

    /// Replace a leaf with a Node4 holding it and the new key, or update it
    /// in place when the keys are equal.
    fn split_leaf(
        mut leaf: Box<Leaf<V>>,
        key: &[u8],
        depth: usize,
        value: V,
    ) -> (Node<V>, Option<V>) {
        if leaf.matches(key) {
            let old = std::mem::replace(&mut leaf.value, value);
            return (Node::Leaf(leaf), Some(old));
        }

        let common = longest_common_prefix(&leaf.key, key, depth);
        let split = depth + common;
        let mut parent = Node4::new();
        parent.header.set_prefix(&key[depth..split], common);
        parent.attach_leaf(leaf, split);
        parent.attach_leaf(Leaf::new(key, value), split);
        (Node::Node4(parent), None)
    }

    /// Split `node`'s prefix where `key` diverges from it after `matched`
    /// bytes, putting a Node4 above it.
    fn split_prefix(
        mut node: Node<V>,
        key: &[u8],
        depth: usize,
        matched: usize,
        value: V,
    ) -> Node<V> {
        let prefix_len = node.prefix_len();
        let rest_len = prefix_len - matched - 1;
        let mut window = [0; MAX_PREFIX_LEN];
        let take = rest_len.min(MAX_PREFIX_LEN);

        let byte = match (node.header(), node.minimum()) {
            // Bytes past the inline window are only recoverable from a leaf.
            (Some(_), Some(leaf)) if prefix_len > MAX_PREFIX_LEN => {
                let at = depth + matched;
                window[..take].copy_from_slice(&leaf.key[at + 1..at + 1 + take]);
                leaf.key[at]
            }
            (Some(header), Some(_)) => {
                window[..take].copy_from_slice(&header.prefix[matched + 1..matched + 1 + take]);
                header.prefix[matched]
            }
            _ => unreachable!("prefix split on a node with no leaves below it"),
        };

        let Some(header) = node.header_mut() else {
            unreachable!("prefix split on a leaf");
        };
        header.prefix_len = rest_len as u32;
        header.prefix = window;
        trace_log!(depth, matched, prefix_len, "splitting compressed prefix");

        let mut parent = Node4::new();
        parent.header.set_prefix(&key[depth..depth + matched], matched);
        parent.attach_leaf(Leaf::new(key, value), depth + matched);
        Node::Node4(parent).add_child(byte, node)
    }

    /// Get a reference to the value stored under `key`.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&V> {
        self.find_leaf(key.as_ref()).map(|leaf| &leaf.value)
    }

    /// Check if the tree contains `key`.
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.find_leaf(key.as_ref()).is_some()
    }

    fn find_leaf(&self, key: &[u8]) -> Option<&Leaf<V>> {
        let mut node = self.root.as_ref()?;
        let mut depth = 0;

        loop {
            if let Node::Leaf(leaf) = node {
                return leaf.matches(key).then_some(&**leaf);
            }

            // Optimistic: only the inline window is compared here, the full
            // key comparison at the leaf catches anything past it.
            let prefix_len = node.prefix_len();
            if prefix_len > 0 {
                if check_prefix(node, key, depth) != prefix_len.min(MAX_PREFIX_LEN) {
                    return None;
                }
                depth += prefix_len;
            }

            match depth.cmp(&key.len()) {
                Ordering::Less => {
                    node = node.find_child(key[depth])?;
                    depth += 1;
                }
                Ordering::Equal => return node.terminal().filter(|leaf| leaf.matches(key)),
                Ordering::Greater => return None,
            }
        }
    }

    /// Get a mutable reference to the value stored under `key`.
    pub fn get_mut(&mut self, key: impl AsRef<[u8]>) -> Option<&mut V> {
        let key = key.as_ref();
        let mut node = self.root.as_mut()?;
        let mut depth = 0;

        loop {
            let prefix_len = node.prefix_len();
            if prefix_len > 0 {
                if check_prefix(node, key, depth) != prefix_len.min(MAX_PREFIX_LEN) {
                    return None;
                }
                depth += prefix_len;
            }

            node = match node {
                Node::Leaf(leaf) => return leaf.matches(key).then_some(&mut leaf.value),
                inner if depth < key.len() => inner.find_child_mut(key[depth])?.as_mut()?,
                inner if depth == key.len() => {
                    return inner
                        .terminal_mut()
                        .filter(|leaf| leaf.matches(key))
                        .map(|leaf| &mut leaf.value);
                }
                _ => return None,
            };
            depth += 1;
        }
    }

    /// Remove `key`, handing its value to the destroy callback if one is
    /// installed. Returns whether the key was present.
    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> bool {
        match self.detach(key.as_ref()) {
            Some(value) => {
                if let Some(destroy) = &self.destroy {
                    destroy(value);
                }
                true
            }
            None => false,
        }
    }

    /// Remove `key` and return its value without running the destroy callback.
    pub fn steal(&mut self, key: impl AsRef<[u8]>) -> Option<V> {
        self.detach(key.as_ref())
    }

    fn detach(&mut self, key: &[u8]) -> Option<V> {
        let leaf = Self::remove_recursive(&mut self.root, key, 0)?;
        self.size -= 1;
        Some(leaf.value)
    }

    fn remove_recursive(
        slot: &mut Option<Node<V>>,
        key: &[u8],
        depth: usize,
    ) -> Option<Box<Leaf<V>>> {
        let node = slot.take()?;
        let (node, removed) = Self::remove_from(node, key, depth);
        *slot = node;
        removed
    }

    /// Remove `key` from the subtree rooted at `node`. Returns the node that
    /// should take its place (`None` once nothing is left) and the detached
    /// leaf, if the key was found.
    fn remove_from(
        node: Node<V>,
        key: &[u8],
        mut depth: usize,
    ) -> (Option<Node<V>>, Option<Box<Leaf<V>>>) {
        let mut node = match node {
            Node::Leaf(leaf) if leaf.matches(key) => return (None, Some(leaf)),
            Node::Leaf(leaf) => return (Some(Node::Leaf(leaf)), None),
            inner => inner,
        };

        let prefix_len = node.prefix_len();
        if prefix_len > 0 {
            if check_prefix(&node, key, depth) != prefix_len.min(MAX_PREFIX_LEN) {
                return (Some(node), None);
            }
            depth += prefix_len;
        }

        match depth.cmp(&key.len()) {
            Ordering::Greater => (Some(node), None),
            Ordering::Equal => match node.take_terminal(key) {
                Some(leaf) => (node.shrink(), Some(leaf)),
                None => (Some(node), None),
            },
            Ordering::Less => {
                let byte = key[depth];
                let Some(child) = node.find_child_mut(byte) else {
                    return (Some(node), None);
                };
                let removed = Self::remove_recursive(child, key, depth + 1);
                let emptied = child.is_none();
                match removed {
                    Some(leaf) if emptied => {
                        node.detach_child(byte);
                        (node.shrink(), Some(leaf))
                    }
                    removed => (Some(node), removed),
                }
            }
        }
    }

    /// Remove every entry.
    ///
    /// Values are dropped, or handed to the destroy callback when the tree
    /// was configured with [`Config::destroy_on_clear`].
    pub fn clear(&mut self) {
        let Some(root) = self.root.take() else {
            return;
        };
        debug_log!(entries = self.size, "clearing tree");
        self.size = 0;
        match (&self.destroy, self.config.destroy_on_clear) {
            (Some(destroy), true) => root.drain_values(&mut |value| destroy(value)),
            _ => drop(root),
        }
    }

    /// Visit every entry in ascending key order until `visit` breaks.
    ///
    /// Returns `Break` if the walk was cut short.
    pub fn iterate<'a, F>(&'a self, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(&'a [u8], &'a V) -> ControlFlow<()>,
    {
        match &self.root {
            Some(root) => Self::iterate_recursive(root, &mut visit),
            None => ControlFlow::Continue(()),
        }
    }

    fn iterate_recursive<'a, F>(node: &'a Node<V>, visit: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&'a [u8], &'a V) -> ControlFlow<()>,
    {
        if let Node::Leaf(leaf) = node {
            return visit(&leaf.key[..], &leaf.value);
        }
        if let Some(leaf) = node.terminal() {
            visit(&leaf.key[..], &leaf.value)?;
        }
        for (_, child) in node.children() {
            Self::iterate_recursive(child, visit)?;
        }
        ControlFlow::Continue(())
    }

    /// All keys in ascending order.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.iter().map(|(key, _)| key.to_vec()).collect()
    }

    /// All values, ordered by their keys.
    pub fn values(&self) -> Vec<&V> {
        self.iter().map(|(_, value)| value).collect()
    }

    /// Iterate over entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(self.root.as_ref(), self.size)
    }

    /// Count nodes by shape.
    pub fn stats(&self) -> ArtStats {
        let mut stats = ArtStats::default();
        if let Some(root) = &self.root {
            Self::compute_stats(root, 1, &mut stats);
        }
        stats
    }

    fn compute_stats(node: &Node<V>, level: usize, stats: &mut ArtStats) {
        stats.max_depth = stats.max_depth.max(level);
        match node.kind() {
            NodeKind::Leaf => {
                stats.leaves += 1;
                return;
            }
            NodeKind::Node4 => stats.node4 += 1,
            NodeKind::Node16 => stats.node16 += 1,
            NodeKind::Node48 => stats.node48 += 1,
            NodeKind::Node256 => stats.node256 += 1,
        }
        if node.terminal().is_some() {
            stats.terminals += 1;
        }
        for (_, child) in node.children() {
            Self::compute_stats(child, level + 1, stats);
        }
    }
}

impl<V> Drop for RadixTree<V> {
    fn drop(&mut self) {
        if self.config.destroy_on_clear {
            self.clear();
        }
    }
}

impl<V> Default for RadixTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for RadixTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(k, v)| (String::from_utf8_lossy(k), v)))
            .finish()
    }
}

impl<K: AsRef<[u8]>, V> FromIterator<(K, V)> for RadixTree<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<K: AsRef<[u8]>, V> Extend<(K, V)> for RadixTree<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, V> IntoIterator for &'a RadixTree<V> {
    type Item = (&'a [u8], &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

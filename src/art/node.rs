//! ART node types with adaptive sizing.
//!
//! Internal nodes come in four shapes that differ only in how they store
//! their children:
//!
//! - Node4: up to 4 children, sorted key bytes scanned linearly
//! - Node16: 5-16 children, sorted key bytes compared 16 at a time
//! - Node48: 17-48 children, 256-byte index into 48 child slots
//! - Node256: 49-256 children, indexed directly by byte
//!
//! A node is promoted when an insert overflows its shape and demoted at a
//! low-water mark well below the promotion point, so a node that sits on a
//! boundary does not keep reallocating.

use std::fmt;

use super::simd;

/// Number of prefix bytes stored inline in every internal node.
pub const MAX_PREFIX_LEN: usize = 8;

/// Node256 falls back to a Node48 once it is down to this many children.
pub(crate) const NODE256_SHRINK_AT: usize = 37;
/// Node48 falls back to a Node16 once it is down to this many children.
pub(crate) const NODE48_SHRINK_AT: usize = 12;
/// Node16 falls back to a Node4 once it is down to this many children.
pub(crate) const NODE16_SHRINK_AT: usize = 3;

/// The shape of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A leaf holding a full key and its value.
    Leaf,
    /// An internal node with up to 4 children.
    Node4,
    /// An internal node with up to 16 children.
    Node16,
    /// An internal node with up to 48 children.
    Node48,
    /// An internal node with up to 256 children.
    Node256,
}

impl NodeKind {
    /// Child counts a settled node of this shape may hold.
    pub(crate) fn child_bounds(self) -> (usize, usize) {
        match self {
            NodeKind::Leaf => (0, 0),
            NodeKind::Node4 => (0, 4),
            NodeKind::Node16 => (NODE16_SHRINK_AT + 1, 16),
            NodeKind::Node48 => (NODE48_SHRINK_AT + 1, 48),
            NodeKind::Node256 => (NODE256_SHRINK_AT + 1, 256),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Leaf => "Leaf",
            NodeKind::Node4 => "Node4",
            NodeKind::Node16 => "Node16",
            NodeKind::Node48 => "Node48",
            NodeKind::Node256 => "Node256",
        };
        f.write_str(name)
    }
}

/// A terminal entry: the full key plus its value.
#[derive(Clone)]
pub(crate) struct Leaf<V> {
    pub(crate) key: Box<[u8]>,
    pub(crate) value: V,
}

impl<V> Leaf<V> {
    pub(crate) fn new(key: &[u8], value: V) -> Box<Self> {
        Box::new(Self {
            key: key.into(),
            value,
        })
    }

    #[inline]
    pub(crate) fn matches(&self, key: &[u8]) -> bool {
        *self.key == *key
    }
}

/// State shared by every internal node shape.
#[derive(Clone)]
pub(crate) struct Header<V> {
    /// Number of byte-keyed children.
    pub(crate) count: u16,
    /// Full length of the compressed prefix, which may exceed the window.
    pub(crate) prefix_len: u32,
    /// First `min(MAX_PREFIX_LEN, prefix_len)` bytes of the prefix.
    pub(crate) prefix: [u8; MAX_PREFIX_LEN],
    /// Leaf whose key ends right after this node's prefix.
    pub(crate) terminal: Option<Box<Leaf<V>>>,
}

impl<V> Header<V> {
    fn new() -> Self {
        Self {
            count: 0,
            prefix_len: 0,
            prefix: [0; MAX_PREFIX_LEN],
            terminal: None,
        }
    }

    #[inline]
    pub(crate) fn window_len(&self) -> usize {
        (self.prefix_len as usize).min(MAX_PREFIX_LEN)
    }

    /// The materialized part of the prefix.
    #[inline]
    pub(crate) fn window(&self) -> &[u8] {
        &self.prefix[..self.window_len()]
    }

    /// Set the prefix length to `len`, taking the window from the front of `bytes`.
    pub(crate) fn set_prefix(&mut self, bytes: &[u8], len: usize) {
        self.prefix_len = len as u32;
        let n = len.min(MAX_PREFIX_LEN);
        self.prefix[..n].copy_from_slice(&bytes[..n]);
    }

    /// Store `value` under the terminal slot, returning the value it replaces.
    pub(crate) fn store_terminal(&mut self, key: &[u8], value: V) -> Option<V> {
        match &mut self.terminal {
            Some(leaf) => Some(std::mem::replace(&mut leaf.value, value)),
            None => {
                self.terminal = Some(Leaf::new(key, value));
                None
            }
        }
    }

    /// Children plus the terminal leaf, if any.
    #[inline]
    pub(crate) fn entries(&self) -> usize {
        usize::from(self.count) + usize::from(self.terminal.is_some())
    }
}

/// Up to 4 children behind sorted key bytes.
#[derive(Clone)]
pub(crate) struct Node4<V> {
    pub(crate) header: Header<V>,
    pub(crate) keys: [u8; 4],
    pub(crate) children: [Option<Node<V>>; 4],
}

/// Up to 16 children behind sorted key bytes.
#[derive(Clone)]
pub(crate) struct Node16<V> {
    pub(crate) header: Header<V>,
    pub(crate) keys: [u8; 16],
    pub(crate) children: [Option<Node<V>>; 16],
}

/// Up to 48 children; `index[byte]` is the slot number plus one, or 0.
#[derive(Clone)]
pub(crate) struct Node48<V> {
    pub(crate) header: Header<V>,
    pub(crate) index: [u8; 256],
    pub(crate) children: [Option<Node<V>>; 48],
}

/// One slot per byte value.
#[derive(Clone)]
pub(crate) struct Node256<V> {
    pub(crate) header: Header<V>,
    pub(crate) children: [Option<Node<V>>; 256],
}

/// A node in the adaptive radix tree.
#[derive(Clone)]
pub(crate) enum Node<V> {
    Leaf(Box<Leaf<V>>),
    Node4(Box<Node4<V>>),
    Node16(Box<Node16<V>>),
    Node48(Box<Node48<V>>),
    Node256(Box<Node256<V>>),
}

fn empty_slots<V, const N: usize>() -> [Option<Node<V>>; N] {
    std::array::from_fn(|_| None)
}

/// Insert into a sorted key array, shifting larger keys one slot right.
fn insert_sorted<V>(
    keys: &mut [u8],
    children: &mut [Option<Node<V>>],
    count: usize,
    byte: u8,
    child: Node<V>,
) {
    let idx = keys[..count].partition_point(|&k| k < byte);
    keys.copy_within(idx..count, idx + 1);
    // children[count] is empty; rotating moves that hole to `idx`.
    children[idx..=count].rotate_right(1);
    keys[idx] = byte;
    children[idx] = Some(child);
}

/// Remove entry `idx` from a sorted key array, closing the gap.
fn remove_sorted<V>(
    keys: &mut [u8],
    children: &mut [Option<Node<V>>],
    count: usize,
    idx: usize,
) -> Option<Node<V>> {
    keys.copy_within(idx + 1..count, idx);
    children[idx..count].rotate_left(1);
    children[count - 1].take()
}

impl<V> Node4<V> {
    pub(crate) fn new() -> Box<Self> {
        Box::new(Self {
            header: Header::new(),
            keys: [0; 4],
            children: empty_slots(),
        })
    }

    fn position(&self, byte: u8) -> Option<usize> {
        let count = usize::from(self.header.count);
        self.keys[..count].iter().position(|&k| k == byte)
    }

    fn insert(&mut self, byte: u8, child: Node<V>) {
        let count = usize::from(self.header.count);
        debug_assert!(count < 4, "Node4 is full, should grow first");
        insert_sorted(&mut self.keys, &mut self.children, count, byte, child);
        self.header.count += 1;
    }

    /// Hang `leaf` off this node by its byte at `depth`, or as the terminal
    /// when its key ends there.
    pub(crate) fn attach_leaf(&mut self, leaf: Box<Leaf<V>>, depth: usize) {
        match leaf.key.get(depth).copied() {
            Some(byte) => self.insert(byte, Node::Leaf(leaf)),
            None => self.header.terminal = Some(leaf),
        }
    }

    /// Replace a node that no longer needs to branch: a lone child absorbs
    /// the prefix, a lone terminal stands in for the whole node.
    fn collapse(mut self: Box<Self>) -> Option<Node<V>> {
        match (self.header.count, self.header.terminal.is_some()) {
            (0, _) => self.header.terminal.take().map(Node::Leaf),
            (1, false) => {
                let byte = self.keys[0];
                let child = self.children[0].take()?;
                trace_log!(
                    byte,
                    prefix_len = self.header.prefix_len,
                    "collapsing Node4 into its child"
                );
                Some(child.absorb_prefix(&self.header, byte))
            }
            _ => Some(Node::Node4(self)),
        }
    }
}

impl<V> Node16<V> {
    fn position(&self, byte: u8) -> Option<usize> {
        simd::find_byte(&self.keys, usize::from(self.header.count), byte)
    }

    fn insert(&mut self, byte: u8, child: Node<V>) {
        let count = usize::from(self.header.count);
        debug_assert!(count < 16, "Node16 is full, should grow first");
        insert_sorted(&mut self.keys, &mut self.children, count, byte, child);
        self.header.count += 1;
    }
}

impl<V> Node48<V> {
    fn insert(&mut self, byte: u8, child: Node<V>) {
        debug_assert!(
            usize::from(self.header.count) < 48,
            "Node48 is full, should grow first"
        );
        // A full node has no free slot; indexing past the end panics.
        let slot = self
            .children
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.children.len());
        self.children[slot] = Some(child);
        self.index[usize::from(byte)] = slot as u8 + 1;
        self.header.count += 1;
    }
}

impl<V> From<Node4<V>> for Node16<V> {
    fn from(node: Node4<V>) -> Self {
        let mut keys = [0; 16];
        keys[..4].copy_from_slice(&node.keys);
        let mut children = empty_slots();
        for (slot, child) in children.iter_mut().zip(node.children) {
            *slot = child;
        }
        Self {
            header: node.header,
            keys,
            children,
        }
    }
}

impl<V> From<Node16<V>> for Node48<V> {
    fn from(node: Node16<V>) -> Self {
        let count = usize::from(node.header.count);
        let mut index = [0; 256];
        let mut children = empty_slots();
        for (slot, (&byte, child)) in node.keys.iter().zip(node.children).take(count).enumerate() {
            index[usize::from(byte)] = slot as u8 + 1;
            children[slot] = child;
        }
        Self {
            header: node.header,
            index,
            children,
        }
    }
}

impl<V> From<Node48<V>> for Node256<V> {
    fn from(node: Node48<V>) -> Self {
        let Node48 {
            header,
            index,
            children: mut slots,
        } = node;
        let mut children = empty_slots();
        for (byte, &idx) in index.iter().enumerate() {
            if idx != 0 {
                children[byte] = slots[usize::from(idx) - 1].take();
            }
        }
        Self { header, children }
    }
}

impl<V> From<Node256<V>> for Node48<V> {
    fn from(node: Node256<V>) -> Self {
        let mut index = [0; 256];
        let mut children = empty_slots();
        let mut slot = 0;
        for (byte, child) in node.children.into_iter().enumerate() {
            if let Some(child) = child {
                index[byte] = slot as u8 + 1;
                children[slot] = Some(child);
                slot += 1;
            }
        }
        Self {
            header: node.header,
            index,
            children,
        }
    }
}

impl<V> From<Node48<V>> for Node16<V> {
    fn from(node: Node48<V>) -> Self {
        let Node48 {
            header,
            index,
            children: mut slots,
        } = node;
        let mut keys = [0; 16];
        let mut children = empty_slots();
        let mut n = 0;
        for (byte, &idx) in index.iter().enumerate() {
            if idx != 0 {
                keys[n] = byte as u8;
                children[n] = slots[usize::from(idx) - 1].take();
                n += 1;
            }
        }
        Self {
            header,
            keys,
            children,
        }
    }
}

impl<V> From<Node16<V>> for Node4<V> {
    fn from(node: Node16<V>) -> Self {
        let mut keys = [0; 4];
        keys.copy_from_slice(&node.keys[..4]);
        let mut children = empty_slots();
        for (slot, child) in children.iter_mut().zip(node.children) {
            *slot = child;
        }
        Self {
            header: node.header,
            keys,
            children,
        }
    }
}

impl<V> Node<V> {
    /// Create a new leaf node.
    pub(crate) fn leaf(key: &[u8], value: V) -> Self {
        Node::Leaf(Leaf::new(key, value))
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf(_) => NodeKind::Leaf,
            Node::Node4(_) => NodeKind::Node4,
            Node::Node16(_) => NodeKind::Node16,
            Node::Node48(_) => NodeKind::Node48,
            Node::Node256(_) => NodeKind::Node256,
        }
    }

    pub(crate) fn header(&self) -> Option<&Header<V>> {
        match self {
            Node::Leaf(_) => None,
            Node::Node4(n) => Some(&n.header),
            Node::Node16(n) => Some(&n.header),
            Node::Node48(n) => Some(&n.header),
            Node::Node256(n) => Some(&n.header),
        }
    }

    pub(crate) fn header_mut(&mut self) -> Option<&mut Header<V>> {
        match self {
            Node::Leaf(_) => None,
            Node::Node4(n) => Some(&mut n.header),
            Node::Node16(n) => Some(&mut n.header),
            Node::Node48(n) => Some(&mut n.header),
            Node::Node256(n) => Some(&mut n.header),
        }
    }

    /// Compressed prefix length; 0 for leaves.
    #[inline]
    pub(crate) fn prefix_len(&self) -> usize {
        self.header().map_or(0, |h| h.prefix_len as usize)
    }

    pub(crate) fn terminal(&self) -> Option<&Leaf<V>> {
        self.header().and_then(|h| h.terminal.as_deref())
    }

    pub(crate) fn terminal_mut(&mut self) -> Option<&mut Leaf<V>> {
        self.header_mut().and_then(|h| h.terminal.as_deref_mut())
    }

    /// Detach the terminal leaf if it holds exactly `key`.
    pub(crate) fn take_terminal(&mut self, key: &[u8]) -> Option<Box<Leaf<V>>> {
        let header = self.header_mut()?;
        match &header.terminal {
            Some(leaf) if leaf.matches(key) => header.terminal.take(),
            _ => None,
        }
    }

    /// Find the child stored under `byte`.
    pub(crate) fn find_child(&self, byte: u8) -> Option<&Node<V>> {
        match self {
            Node::Leaf(_) => None,
            Node::Node4(n) => n.children[n.position(byte)?].as_ref(),
            Node::Node16(n) => n.children[n.position(byte)?].as_ref(),
            Node::Node48(n) => {
                let idx = n.index[usize::from(byte)];
                if idx == 0 {
                    None
                } else {
                    n.children[usize::from(idx) - 1].as_ref()
                }
            }
            Node::Node256(n) => n.children[usize::from(byte)].as_ref(),
        }
    }

    /// Find the slot holding the child under `byte`, so the caller can take
    /// the child out and put its replacement back.
    pub(crate) fn find_child_mut(&mut self, byte: u8) -> Option<&mut Option<Node<V>>> {
        match self {
            Node::Leaf(_) => None,
            Node::Node4(n) => {
                let idx = n.position(byte)?;
                Some(&mut n.children[idx])
            }
            Node::Node16(n) => {
                let idx = n.position(byte)?;
                Some(&mut n.children[idx])
            }
            Node::Node48(n) => {
                let idx = n.index[usize::from(byte)];
                if idx == 0 {
                    None
                } else {
                    Some(&mut n.children[usize::from(idx) - 1])
                }
            }
            Node::Node256(n) => {
                let slot = &mut n.children[usize::from(byte)];
                slot.is_some().then_some(slot)
            }
        }
    }

    /// Add a child under a byte that is not yet present, growing the node
    /// into the next shape first if it is full.
    pub(crate) fn add_child(self, byte: u8, child: Node<V>) -> Node<V> {
        match self {
            Node::Leaf(_) => unreachable!("leaves have no children"),
            Node::Node4(mut n) if n.header.count < 4 => {
                n.insert(byte, child);
                Node::Node4(n)
            }
            Node::Node4(n) => {
                trace_log!(byte, "growing Node4 to Node16");
                let mut grown = Box::new(Node16::from(*n));
                grown.insert(byte, child);
                Node::Node16(grown)
            }
            Node::Node16(mut n) if n.header.count < 16 => {
                n.insert(byte, child);
                Node::Node16(n)
            }
            Node::Node16(n) => {
                trace_log!(byte, "growing Node16 to Node48");
                let mut grown = Box::new(Node48::from(*n));
                grown.insert(byte, child);
                Node::Node48(grown)
            }
            Node::Node48(mut n) if n.header.count < 48 => {
                n.insert(byte, child);
                Node::Node48(n)
            }
            Node::Node48(n) => {
                trace_log!(byte, "growing Node48 to Node256");
                let mut grown = Box::new(Node256::from(*n));
                grown.children[usize::from(byte)] = Some(child);
                grown.header.count += 1;
                Node::Node256(grown)
            }
            Node::Node256(mut n) => {
                n.children[usize::from(byte)] = Some(child);
                n.header.count += 1;
                Node::Node256(n)
            }
        }
    }

    /// Remove the entry for `byte` and return whatever its slot still holds.
    ///
    /// `byte` must be a child key of this node; its slot may already have
    /// been emptied by the caller.
    pub(crate) fn detach_child(&mut self, byte: u8) -> Option<Node<V>> {
        match self {
            Node::Leaf(_) => None,
            Node::Node4(n) => {
                let idx = n.position(byte)?;
                let count = usize::from(n.header.count);
                n.header.count -= 1;
                remove_sorted(&mut n.keys, &mut n.children, count, idx)
            }
            Node::Node16(n) => {
                let idx = n.position(byte)?;
                let count = usize::from(n.header.count);
                n.header.count -= 1;
                remove_sorted(&mut n.keys, &mut n.children, count, idx)
            }
            Node::Node48(n) => {
                let idx = std::mem::take(&mut n.index[usize::from(byte)]);
                if idx == 0 {
                    return None;
                }
                n.header.count -= 1;
                n.children[usize::from(idx) - 1].take()
            }
            Node::Node256(n) => {
                debug_assert!(n.header.count > 0);
                n.header.count -= 1;
                n.children[usize::from(byte)].take()
            }
        }
    }

    /// Demote a node that has dropped to its low-water mark, and collapse a
    /// Node4 that no longer branches. `None` means nothing is left.
    pub(crate) fn shrink(self) -> Option<Node<V>> {
        match self {
            Node::Node256(n) if usize::from(n.header.count) <= NODE256_SHRINK_AT => {
                trace_log!(children = n.header.count, "shrinking Node256 to Node48");
                Some(Node::Node48(Box::new(Node48::from(*n))))
            }
            Node::Node48(n) if usize::from(n.header.count) <= NODE48_SHRINK_AT => {
                trace_log!(children = n.header.count, "shrinking Node48 to Node16");
                Some(Node::Node16(Box::new(Node16::from(*n))))
            }
            Node::Node16(n) if usize::from(n.header.count) <= NODE16_SHRINK_AT => {
                trace_log!(children = n.header.count, "shrinking Node16 to Node4");
                Some(Node::Node4(Box::new(Node4::from(*n))))
            }
            Node::Node4(n) => n.collapse(),
            other => Some(other),
        }
    }

    /// Prepend the parent's prefix and the byte that led here to this node's
    /// prefix. Leaves carry full keys, so they are returned unchanged.
    fn absorb_prefix(mut self, parent: &Header<V>, byte: u8) -> Node<V> {
        if let Some(header) = self.header_mut() {
            let mut merged = [0; MAX_PREFIX_LEN];
            let bytes = parent
                .window()
                .iter()
                .chain(std::iter::once(&byte))
                .chain(header.window());
            for (slot, &b) in merged.iter_mut().zip(bytes) {
                *slot = b;
            }
            header.prefix = merged;
            header.prefix_len += parent.prefix_len + 1;
        }
        self
    }

    /// First child at or after position `pos`, in ascending byte order.
    ///
    /// Positions are array indexes for Node4/Node16 and byte values for
    /// Node48/Node256.
    fn child_from(&self, pos: usize) -> Option<(usize, u8, &Node<V>)> {
        match self {
            Node::Leaf(_) => None,
            Node::Node4(n) => {
                if pos >= usize::from(n.header.count) {
                    return None;
                }
                Some((pos, n.keys[pos], n.children[pos].as_ref()?))
            }
            Node::Node16(n) => {
                if pos >= usize::from(n.header.count) {
                    return None;
                }
                Some((pos, n.keys[pos], n.children[pos].as_ref()?))
            }
            Node::Node48(n) => (pos..256).find_map(|byte| match n.index[byte] {
                0 => None,
                idx => n.children[usize::from(idx) - 1]
                    .as_ref()
                    .map(|child| (byte, byte as u8, child)),
            }),
            Node::Node256(n) => (pos..256).find_map(|byte| {
                n.children[byte]
                    .as_ref()
                    .map(|child| (byte, byte as u8, child))
            }),
        }
    }

    /// Children with their key bytes, in ascending byte order.
    pub(crate) fn children(&self) -> Children<'_, V> {
        Children { node: self, pos: 0 }
    }

    /// The leaf with the smallest key in this subtree.
    pub(crate) fn minimum(&self) -> Option<&Leaf<V>> {
        let mut node = self;
        loop {
            if let Node::Leaf(leaf) = node {
                return Some(leaf);
            }
            if let Some(leaf) = node.terminal() {
                return Some(leaf);
            }
            node = node.children().next()?.1;
        }
    }

    /// Consume the subtree, handing every value to `sink`.
    pub(crate) fn drain_values(self, sink: &mut dyn FnMut(V)) {
        fn drain_header<V>(header: Header<V>, sink: &mut dyn FnMut(V)) {
            if let Some(leaf) = header.terminal {
                sink(leaf.value);
            }
        }

        match self {
            Node::Leaf(leaf) => sink(leaf.value),
            Node::Node4(n) => {
                let Node4 {
                    header, children, ..
                } = *n;
                drain_header(header, sink);
                children.into_iter().flatten().for_each(|c| c.drain_values(sink));
            }
            Node::Node16(n) => {
                let Node16 {
                    header, children, ..
                } = *n;
                drain_header(header, sink);
                children.into_iter().flatten().for_each(|c| c.drain_values(sink));
            }
            Node::Node48(n) => {
                let Node48 {
                    header, children, ..
                } = *n;
                drain_header(header, sink);
                children.into_iter().flatten().for_each(|c| c.drain_values(sink));
            }
            Node::Node256(n) => {
                let Node256 { header, children } = *n;
                drain_header(header, sink);
                children.into_iter().flatten().for_each(|c| c.drain_values(sink));
            }
        }
    }
}

/// Iterator over the children of one node, ascending by key byte.
pub(crate) struct Children<'a, V> {
    node: &'a Node<V>,
    pos: usize,
}

impl<'a, V> Iterator for Children<'a, V> {
    type Item = (u8, &'a Node<V>);

    fn next(&mut self) -> Option<Self::Item> {
        let (pos, byte, child) = self.node.child_from(self.pos)?;
        self.pos = pos + 1;
        Some((byte, child))
    }
}

impl<V> fmt::Debug for Node<V>
where
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Leaf(leaf) => f
                .debug_struct("Leaf")
                .field("key", &String::from_utf8_lossy(&leaf.key))
                .field("value", &leaf.value)
                .finish(),
            _ => {
                let mut s = f.debug_struct(&self.kind().to_string());
                if let Some(h) = self.header() {
                    s.field("prefix", &String::from_utf8_lossy(h.window()))
                        .field("prefix_len", &h.prefix_len)
                        .field("num_children", &h.count)
                        .field("terminal", &h.terminal.is_some());
                }
                s.field(
                    "keys",
                    &self.children().map(|(b, _)| b as char).collect::<Vec<_>>(),
                )
                .finish()
            }
        }
    }
}

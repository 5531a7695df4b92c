//! # avl-tally
//!
//! A counting ordered index over string keys, backed by an AVL tree.
//!
//! Every distinct key is stored once together with the number of times it has
//! been inserted. Point operations are `O(log n)`, which turns "count the
//! distinct lines of a file" from a quadratic scan into an `O(n log n)` pass.
//!
//! ## Example
//!
//! ```rust
//! use avl_tally::TallyTree;
//!
//! let mut tree = TallyTree::new();
//! for line in ["b", "a", "c", "a", "b", "a"] {
//!     tree.insert(line);
//! }
//!
//! assert_eq!(tree.len(), 3);
//! assert_eq!(tree.get("a"), Some(3));
//! assert_eq!(tree.most_frequent(), Some(("a", 3)));
//!
//! assert_eq!(tree.remove("c").unwrap(), 0);
//! assert!(!tree.contains_key("c"));
//! ```

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::ops::{Index, IndexMut};

mod error;
pub mod ingest;
mod render;

pub use error::{Error, Result};
pub use render::Sideways;

// =============================================================================
// Configuration
// =============================================================================

/// Height of an absent subtree. A leaf has height `0`.
const EMPTY_HEIGHT: i8 = -1;

// =============================================================================
// Pointer type
// =============================================================================

/// Index of a node in the [`NodeArena`]. `NULL` marks an absent child, or the
/// parent of the root.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Ptr(u32);

impl Ptr {
    const NULL: Ptr = Ptr(u32::MAX);

    #[inline]
    fn is_null(self) -> bool {
        self == Self::NULL
    }

    #[inline]
    fn index(self) -> usize {
        debug_assert!(!self.is_null(), "dereferenced a NULL node pointer");
        self.0 as usize
    }
}

impl Default for Ptr {
    fn default() -> Self {
        Ptr::NULL
    }
}

// =============================================================================
// Node Arena
// =============================================================================

#[derive(Clone, Debug)]
struct Node {
    key: Box<str>,
    /// Occurrences of `key`; `0` only while the slot sits on the free list.
    count: u64,
    height: i8,
    /// Non-owning back-reference, used for the upward rebalance walk.
    parent: Ptr,
    left: Ptr,
    right: Ptr,
}

/// Slot storage for tree nodes, with a free list of released slots.
#[derive(Clone, Default)]
struct NodeArena {
    slots: Vec<Node>,
    free: Vec<Ptr>,
}

impl NodeArena {
    fn alloc(&mut self, key: &str, parent: Ptr) -> Ptr {
        let node = Node {
            key: key.into(),
            count: 1,
            height: 0,
            parent,
            left: Ptr::NULL,
            right: Ptr::NULL,
        };

        if let Some(ptr) = self.free.pop() {
            self.slots[ptr.index()] = node;
            return ptr;
        }

        debug_assert!(self.slots.len() < Ptr::NULL.0 as usize);
        let ptr = Ptr(self.slots.len() as u32);
        self.slots.push(node);
        ptr
    }

    fn release(&mut self, ptr: Ptr) {
        let node = &mut self[ptr];
        node.key = Box::default();
        node.count = 0;
        node.height = 0;
        node.parent = Ptr::NULL;
        node.left = Ptr::NULL;
        node.right = Ptr::NULL;
        self.free.push(ptr);
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

impl Index<Ptr> for NodeArena {
    type Output = Node;

    #[inline]
    fn index(&self, ptr: Ptr) -> &Node {
        &self.slots[ptr.index()]
    }
}

impl IndexMut<Ptr> for NodeArena {
    #[inline]
    fn index_mut(&mut self, ptr: Ptr) -> &mut Node {
        &mut self.slots[ptr.index()]
    }
}

// =============================================================================
// TallyTree
// =============================================================================

/// An ordered multiset of strings: each distinct key is stored once, with the
/// number of times it was inserted.
///
/// The tree is height-balanced (AVL), so [`insert`](Self::insert),
/// [`remove`](Self::remove) and [`get`](Self::get) are `O(log n)` in the number
/// of distinct keys.
#[derive(Clone, Default)]
pub struct TallyTree {
    nodes: NodeArena,
    root: Ptr,
    len: usize,
}

impl TallyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree, or `None` when it is empty. A single key has height `0`.
    pub fn height(&self) -> Option<usize> {
        if self.root.is_null() {
            None
        } else {
            Some(self.nodes[self.root].height as usize)
        }
    }

    /// Drops every key and releases the node storage.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = Ptr::NULL;
        self.len = 0;
    }

    /// Returns the occurrence count of `key`, or `None` if it is absent.
    pub fn get(&self, key: &str) -> Option<u64> {
        let ptr = self.find(key);
        (!ptr.is_null()).then(|| self.nodes[ptr].count)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        !self.find(key).is_null()
    }

    /// Records one occurrence of `key` and returns its count afterwards.
    ///
    /// A repeated key only bumps its counter. A new key is linked in as a leaf
    /// and the path back to the root is rebalanced.
    pub fn insert(&mut self, key: &str) -> u64 {
        if self.root.is_null() {
            self.root = self.nodes.alloc(key, Ptr::NULL);
            self.len = 1;
            return 1;
        }

        let mut current = self.root;
        loop {
            let node = &self.nodes[current];
            let next = match key.cmp(&node.key) {
                Ordering::Equal => {
                    let node = &mut self.nodes[current];
                    node.count += 1;
                    return node.count;
                }
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };

            if next.is_null() {
                break;
            }
            current = next;
        }

        let leaf = self.nodes.alloc(key, current);
        let parent = &mut self.nodes[current];
        if key < &*parent.key {
            parent.left = leaf;
        } else {
            parent.right = leaf;
        }
        self.len += 1;

        self.rebalance_from(current);
        1
    }

    /// Removes one occurrence of `key` and returns the remaining count.
    ///
    /// When the count drops to `0` the key leaves the tree and `Ok(0)` is
    /// returned. A key that is not present yields [`Error::KeyNotFound`] and
    /// leaves the tree untouched.
    pub fn remove(&mut self, key: &str) -> Result<u64> {
        let ptr = self.find(key);
        if ptr.is_null() {
            return Err(Error::KeyNotFound(key.to_owned()));
        }

        let node = &mut self.nodes[ptr];
        node.count -= 1;
        if node.count > 0 {
            return Ok(node.count);
        }

        self.unlink(ptr);
        self.nodes.release(ptr);
        self.len -= 1;
        Ok(0)
    }

    /// Returns a key with the highest count, or `None` when the tree is empty.
    ///
    /// This is a full `O(n)` walk. Among equally frequent keys the smallest
    /// one wins, but callers should treat the choice as arbitrary.
    pub fn most_frequent(&self) -> Option<(&str, u64)> {
        let mut best: Option<(&str, u64)> = None;
        for (key, count) in self.iter() {
            match best {
                Some((_, top)) if top >= count => {}
                _ => best = Some((key, count)),
            }
        }
        best
    }

    /// Iterates over `(key, count)` pairs in ascending key order.
    pub fn iter(&self) -> Iter<'_> {
        let mut iter = Iter {
            tree: self,
            stack: Vec::new(),
        };
        iter.push_left_spine(self.root);
        iter
    }

    // =========================================================================
    // Search
    // =========================================================================

    fn find(&self, key: &str) -> Ptr {
        let mut current = self.root;
        while !current.is_null() {
            let node = &self.nodes[current];
            current = match key.cmp(&node.key) {
                Ordering::Equal => return current,
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        Ptr::NULL
    }

    // =========================================================================
    // Heights and balance
    // =========================================================================

    #[inline]
    fn height_of(&self, ptr: Ptr) -> i8 {
        if ptr.is_null() {
            EMPTY_HEIGHT
        } else {
            self.nodes[ptr].height
        }
    }

    #[inline]
    fn update_height(&mut self, ptr: Ptr) {
        let node = &self.nodes[ptr];
        let height = 1 + self.height_of(node.left).max(self.height_of(node.right));
        self.nodes[ptr].height = height;
    }

    /// `height(right) - height(left)`.
    #[inline]
    fn balance(&self, ptr: Ptr) -> i8 {
        let node = &self.nodes[ptr];
        self.height_of(node.right) - self.height_of(node.left)
    }

    // =========================================================================
    // Rotations
    // =========================================================================

    /// Points whatever held `old` (its parent's child slot, or the root) at
    /// `new`, and fixes `new`'s parent link.
    fn replace_child(&mut self, parent: Ptr, old: Ptr, new: Ptr) {
        if parent.is_null() {
            self.root = new;
        } else {
            let p = &mut self.nodes[parent];
            if p.left == old {
                p.left = new;
            } else {
                debug_assert_eq!(p.right, old, "parent does not own the replaced node");
                p.right = new;
            }
        }

        if !new.is_null() {
            self.nodes[new].parent = parent;
        }
    }

    /// Rotates on the edge from `x` to its right child and returns that child,
    /// which now roots the subtree. Heights are left stale.
    fn rotate_left(&mut self, x: Ptr) -> Ptr {
        let pivot = self.nodes[x].right;
        debug_assert!(!pivot.is_null(), "rotate_left requires a right child");

        self.replace_child(self.nodes[x].parent, x, pivot);

        let inner = self.nodes[pivot].left;
        self.nodes[x].right = inner;
        if !inner.is_null() {
            self.nodes[inner].parent = x;
        }

        self.nodes[pivot].left = x;
        self.nodes[x].parent = pivot;
        pivot
    }

    /// Mirror image of [`rotate_left`](Self::rotate_left).
    fn rotate_right(&mut self, x: Ptr) -> Ptr {
        let pivot = self.nodes[x].left;
        debug_assert!(!pivot.is_null(), "rotate_right requires a left child");

        self.replace_child(self.nodes[x].parent, x, pivot);

        let inner = self.nodes[pivot].right;
        self.nodes[x].left = inner;
        if !inner.is_null() {
            self.nodes[inner].parent = x;
        }

        self.nodes[pivot].right = x;
        self.nodes[x].parent = pivot;
        pivot
    }

    // =========================================================================
    // Rebalancing
    // =========================================================================

    /// Walks from `start` up to the root, recomputing every height on the way
    /// and rotating wherever the AVL property is violated.
    ///
    /// Precondition: every subtree hanging below the walked path is already
    /// balanced.
    fn rebalance_from(&mut self, start: Ptr) {
        let mut current = start;
        while !current.is_null() {
            self.update_height(current);
            let balance = self.balance(current);

            if balance > 1 {
                let right = self.nodes[current].right;
                if self.balance(right) < 0 {
                    let risen = self.rotate_right(right);
                    self.update_height(right);
                    self.update_height(risen);
                }
                let risen = self.rotate_left(current);
                self.update_height(current);
                self.update_height(risen);
                current = risen;
            } else if balance < -1 {
                let left = self.nodes[current].left;
                if self.balance(left) > 0 {
                    let risen = self.rotate_left(left);
                    self.update_height(left);
                    self.update_height(risen);
                }
                let risen = self.rotate_right(current);
                self.update_height(current);
                self.update_height(risen);
                current = risen;
            }

            current = self.nodes[current].parent;
        }
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Detaches `ptr` from the tree and rebalances. The slot itself is not
    /// released.
    ///
    /// A node with two children is rotated downwards, towards its heavier side,
    /// until it has at most one child; the remaining child then takes its place.
    fn unlink(&mut self, ptr: Ptr) {
        let mut rotations = 0u32;
        loop {
            let node = &self.nodes[ptr];
            if node.left.is_null() || node.right.is_null() {
                break;
            }

            let risen = if self.balance(ptr) < 0 {
                self.rotate_right(ptr)
            } else {
                self.rotate_left(ptr)
            };
            self.update_height(ptr);
            self.update_height(risen);
            rotations += 1;
        }

        let node = &self.nodes[ptr];
        let parent = node.parent;
        let child = if node.left.is_null() {
            node.right
        } else {
            node.left
        };
        self.replace_child(parent, ptr, child);

        tracing::trace!(
            key = &*self.nodes[ptr].key,
            rotations,
            "unlinked node"
        );

        self.rebalance_from(parent);
    }
}

impl<S: AsRef<str>> Extend<S> for TallyTree {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key.as_ref());
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for TallyTree {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tree = TallyTree::new();
        tree.extend(iter);
        tree
    }
}

impl std::fmt::Debug for TallyTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a TallyTree {
    type Item = (&'a str, u64);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// In-order iterator over a [`TallyTree`], created by [`TallyTree::iter`].
pub struct Iter<'a> {
    tree: &'a TallyTree,
    stack: Vec<Ptr>,
}

impl Iter<'_> {
    fn push_left_spine(&mut self, mut ptr: Ptr) {
        while !ptr.is_null() {
            self.stack.push(ptr);
            ptr = self.tree.nodes[ptr].left;
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let ptr = self.stack.pop()?;
        let tree = self.tree;
        let node = &tree.nodes[ptr];
        self.push_left_spine(node.right);
        Some((&*node.key, node.count))
    }
}


#[cfg(test)]
mod proptests;

//! Sideways text rendering of a [`TallyTree`], for debugging.
//!
//! The root is printed at the left margin, right subtrees above their parent
//! and left subtrees below, each level indented by eight spaces:
//!
//! ```text
//!         c(0) x1
//! b(1) x2
//!         a(0) x3
//! ```

use std::fmt;

use crate::{Ptr, TallyTree};

const INDENT: &str = "        ";

/// [`Display`](fmt::Display) adapter returned by [`TallyTree::sideways`].
pub struct Sideways<'a> {
    tree: &'a TallyTree,
}

impl TallyTree {
    /// Renders the tree rotated by 90 degrees, one node per line as
    /// `key(height) xcount`.
    pub fn sideways(&self) -> Sideways<'_> {
        Sideways { tree: self }
    }
}

impl Sideways<'_> {
    fn write_subtree(&self, f: &mut fmt::Formatter<'_>, ptr: Ptr, level: usize) -> fmt::Result {
        if ptr.is_null() {
            return Ok(());
        }

        let node = &self.tree.nodes[ptr];
        self.write_subtree(f, node.right, level + 1)?;
        for _ in 0..level {
            f.write_str(INDENT)?;
        }
        writeln!(f, "{}({}) x{}", node.key, node.height, node.count)?;
        self.write_subtree(f, node.left, level + 1)
    }
}

impl fmt::Display for Sideways<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_subtree(f, self.tree.root, 0)
    }
}

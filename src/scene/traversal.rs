//! Subtree traversal and snapshots.
//!
//! Traversals borrow the graph immutably, so the tree cannot change while a
//! visit is in progress. Code that needs to mutate the graph while walking
//! it (the per-frame update pass, for example) iterates a
//! [`snapshot`](SceneGraph::snapshot) instead and re-checks each handle.

use crate::scene::node::SceneNode;
use crate::scene::{NodeHandle, SceneGraph};

/// Visiting order for [`SceneGraph::traverse_subtree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalOrder {
    /// Parents before children.
    #[default]
    PreOrder,
    /// Children before parents.
    PostOrder,
}

impl SceneGraph {
    /// Depth-first walk over `root` and its descendants.
    ///
    /// `visit` returns `false` to stop the whole traversal: remaining
    /// siblings and everything above them are skipped. Returns `false` if the
    /// traversal was stopped that way. Stale handles are treated as empty
    /// subtrees.
    pub fn traverse_subtree<F>(&self, root: NodeHandle, order: TraversalOrder, mut visit: F) -> bool
    where
        F: FnMut(NodeHandle, &SceneNode) -> bool,
    {
        self.traverse_recursive(root, order, &mut visit)
    }

    fn traverse_recursive<F>(&self, handle: NodeHandle, order: TraversalOrder, visit: &mut F) -> bool
    where
        F: FnMut(NodeHandle, &SceneNode) -> bool,
    {
        let Some(node) = self.nodes.get(handle) else {
            return true;
        };

        if order == TraversalOrder::PreOrder && !visit(handle, node) {
            return false;
        }

        for &child in &node.children {
            if !self.traverse_recursive(child, order, visit) {
                return false;
            }
        }

        if order == TraversalOrder::PostOrder && !visit(handle, node) {
            return false;
        }

        true
    }

    /// Appends `root` and all its descendants to `out`, parents first.
    pub fn flatten_subtree(&self, root: NodeHandle, out: &mut Vec<NodeHandle>) {
        self.traverse_subtree(root, TraversalOrder::PreOrder, |handle, _| {
            out.push(handle);
            true
        });
    }

    /// Point-in-time list of every live node, in unspecified order.
    ///
    /// The list is independent of the graph: nodes created or destroyed
    /// afterwards do not affect it. Check each handle with
    /// [`contains`](Self::contains) before use and skip the ones that no
    /// longer resolve.
    #[must_use]
    pub fn snapshot(&self) -> Vec<NodeHandle> {
        self.nodes.keys().collect()
    }
}

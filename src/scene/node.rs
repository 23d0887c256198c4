use std::borrow::Cow;

use crate::scene::transform_cache::{CacheState, TransformCache, TransformStats};
use crate::scene::{ComponentHandle, NodeHandle};

/// A single placement in the world plus an ordered bundle of components.
///
/// # Ownership
///
/// Nodes live inside a [`SceneGraph`](crate::scene::SceneGraph), which is
/// the only owner. Everything else, including the hierarchy links stored
/// here, refers to nodes through [`NodeHandle`]s. A handle to a destroyed
/// node never resolves again, even if its slot gets reused.
///
/// # Hierarchy
///
/// - `parent`: `None` for root nodes
/// - `children`: ordered child handles
///
/// Links are only changed through the graph (`attach_child` /
/// `detach_from_parent`) so both sides stay in sync and the world placement
/// of the moved node is preserved.
///
/// # Transform
///
/// Local-to-parent and local-to-world matrices are both cached; see
/// [`transform_cache`](crate::scene::transform_cache).
#[derive(Debug)]
pub struct SceneNode {
    pub(crate) name: Cow<'static, str>,

    // === Core Hierarchy ===
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    // === Core Spatial Data ===
    pub(crate) transform: TransformCache,

    // === Behaviour ===
    pub(crate) components: Vec<ComponentHandle>,
}

impl SceneNode {
    pub(crate) fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            transform: TransformCache::new(),
            components: Vec::new(),
        }
    }

    /// Diagnostic name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Components in update order.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &[ComponentHandle] {
        &self.components
    }

    /// Which cached matrix, if any, is pending recomputation.
    #[inline]
    #[must_use]
    pub fn cache_state(&self) -> CacheState {
        self.transform.state()
    }

    /// Recompute counters of this node's transform cache.
    #[inline]
    #[must_use]
    pub fn transform_stats(&self) -> TransformStats {
        self.transform.stats()
    }
}

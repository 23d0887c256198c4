//! Scene graph module
//!
//! Manages the node hierarchy and its behaviour:
//! - SceneGraph: the arena that owns every node
//! - SceneNode: hierarchy links, cached transforms, component list
//! - TransformCache: lazy local/world matrices with a tri-state dirty flag
//! - Component: per-node behaviour with update/render callbacks
//! - Traversal: pre/post-order visiting and snapshots
//! - NodeMut: chainable node editing

pub mod component;
pub mod graph;
pub mod node;
pub mod transform_cache;
pub mod traversal;
pub mod wrapper;

pub use component::{Component, ComponentContext, RenderContext};
pub use graph::SceneGraph;
pub use node::SceneNode;
pub use transform_cache::{CacheState, TransformStats};
pub use traversal::TraversalOrder;
pub use wrapper::NodeMut;

use slotmap::new_key_type;

new_key_type! {
    /// Non-owning, versioned reference to a [`SceneNode`].
    pub struct NodeHandle;
    /// Non-owning, versioned reference to a component instance.
    pub struct ComponentHandle;
}

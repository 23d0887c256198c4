//! Error Types
//!
//! Every scene graph operation that can be misused returns [`Result<T>`],
//! an alias for `std::result::Result<T, SceneError>`. The checks run before
//! any mutation, so a returned error leaves the graph untouched.
//!
//! ```rust,ignore
//! use gsgamelib::errors::{Result, SceneError};
//!
//! fn reparent(graph: &mut SceneGraph, child: NodeHandle, parent: NodeHandle) -> Result<()> {
//!     graph.attach_child(child, parent)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::scene::{ComponentHandle, NodeHandle};

/// Consistency violations raised by the scene graph.
///
/// These represent caller mistakes rather than runtime conditions; nothing
/// here is retried or recovered from internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    // ========================================================================
    // Handle Resolution
    // ========================================================================
    /// The node handle does not resolve (never created, or already destroyed).
    #[error("Scene node not found: {0:?}")]
    NodeNotFound(NodeHandle),

    /// The component handle is stale, or not attached to the given node.
    #[error("Component {component:?} not found (expected owner: {node:?})")]
    ComponentNotFound {
        node: Option<NodeHandle>,
        component: ComponentHandle,
    },

    /// A typed lookup that requires a result found nothing.
    #[error("No component of type `{type_name}` on node {node:?}")]
    ComponentTypeNotFound {
        node: NodeHandle,
        type_name: &'static str,
    },

    // ========================================================================
    // Hierarchy
    // ========================================================================
    /// Attaching would make a node its own ancestor.
    #[error("Attaching {child:?} under {parent:?} would create a cycle")]
    CycleDetected {
        child: NodeHandle,
        parent: NodeHandle,
    },

    /// Detach was requested on a root node.
    #[error("Scene node {0:?} has no parent")]
    NoParent(NodeHandle),

    /// Child index past the end of the child list.
    #[error("Child index {index} out of range for node {node:?} with {len} children")]
    ChildIndexOutOfRange {
        node: NodeHandle,
        index: usize,
        len: usize,
    },

    // ========================================================================
    // Diagnostics
    // ========================================================================
    /// The validator found the graph in an inconsistent state.
    #[error("Scene graph validation failed: {0}")]
    Validation(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SceneError>;

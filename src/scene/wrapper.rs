//! Chainable node editing.
//!
//! [`NodeMut`] borrows a [`SceneGraph`] mutably and provides a fluent API
//! for setting up nodes without threading `?` through every call.
//!
//! Transform setters silently no-op when the handle is stale. Hierarchy and
//! component operations that fail are logged as warnings and skipped.
//!
//! # Example
//!
//! ```rust
//! use glam::Vec3;
//! use gsgamelib::SceneGraph;
//!
//! let mut graph = SceneGraph::new();
//! let ship = graph.create_node("ship");
//! let turret = graph.create_node("turret");
//!
//! graph.node(turret)
//!     .set_translation(Vec3::new(0.0, 1.0, 0.0))
//!     .rotate_y(0.5)
//!     .attach_to(ship);
//!
//! assert_eq!(graph.parent(turret), Some(ship));
//! ```
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::must_use_candidate)]
use glam::{Affine3A, Quat, Vec3, Vec3A};

use crate::math::{AffineExt, EulerAngles};
use crate::scene::{Component, NodeHandle, SceneGraph};

/// Temporary mutable borrow of a scene node for chainable operations.
pub struct NodeMut<'a> {
    graph: &'a mut SceneGraph,
    handle: NodeHandle,
}

impl SceneGraph {
    /// Chainable editor for `node`.
    #[inline]
    pub fn node(&mut self, node: NodeHandle) -> NodeMut<'_> {
        NodeMut::new(self, node)
    }
}

impl<'a> NodeMut<'a> {
    #[inline]
    pub fn new(graph: &'a mut SceneGraph, handle: NodeHandle) -> Self {
        Self { graph, handle }
    }

    /// Returns the underlying handle.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    fn edit_local(self, f: impl FnOnce(&mut Affine3A)) -> Self {
        if let Ok(local) = self.graph.modify_local_to_parent(self.handle) {
            f(local);
        }
        self
    }

    // -- Transform setters (chainable) --

    /// Sets the translation relative to the parent.
    #[inline]
    pub fn set_translation(self, translation: Vec3) -> Self {
        self.edit_local(|m| m.translation = Vec3A::from(translation))
    }

    /// Moves the node by `offset` in parent space.
    #[inline]
    pub fn translate(self, offset: Vec3) -> Self {
        self.edit_local(|m| m.translation += Vec3A::from(offset))
    }

    /// Replaces the rotation relative to the parent, keeping translation.
    #[inline]
    pub fn set_euler_angles(self, angles: EulerAngles) -> Self {
        self.edit_local(|m| m.set_euler_angles(angles))
    }

    /// Rotates around the local Y axis by `angle` radians (cumulative).
    #[inline]
    pub fn rotate_y(self, angle: f32) -> Self {
        self.edit_local(|m| *m = Affine3A::from_quat(Quat::from_rotation_y(angle)).then(m))
    }

    /// Replaces the whole local-to-parent matrix.
    #[inline]
    pub fn set_local(self, local: Affine3A) -> Self {
        self.edit_local(|m| *m = local)
    }

    /// Sets the world-space translation; the parent stays where it is.
    pub fn set_world_translation(self, translation: Vec3) -> Self {
        if let Ok(world) = self.graph.modify_local_to_world(self.handle) {
            world.translation = Vec3A::from(translation);
        }
        self
    }

    // -- Hierarchy --

    /// Sets the display name.
    pub fn set_name(self, name: &str) -> Self {
        if let Err(err) = self.graph.set_name(self.handle, name.to_owned()) {
            log::warn!("set_name skipped: {err}");
        }
        self
    }

    /// Moves this node under `parent`, keeping its world placement.
    pub fn attach_to(self, parent: NodeHandle) -> Self {
        if let Err(err) = self.graph.attach_child(self.handle, parent) {
            log::warn!("attach_to skipped: {err}");
        }
        self
    }

    /// Moves `child` under this node, keeping its world placement.
    pub fn attach_child(self, child: NodeHandle) -> Self {
        if let Err(err) = self.graph.attach_child(child, self.handle) {
            log::warn!("attach_child skipped: {err}");
        }
        self
    }

    /// Makes this node a root, keeping its world placement.
    pub fn detach_from_parent(self) -> Self {
        if let Err(err) = self.graph.detach_from_parent(self.handle) {
            log::warn!("detach_from_parent skipped: {err}");
        }
        self
    }

    // -- Components --

    /// Adds `component`, running its attach hook.
    pub fn with_component<T: Component>(self, component: T) -> Self {
        if let Err(err) = self.graph.add_component(self.handle, component) {
            log::warn!("with_component skipped: {err}");
        }
        self
    }
}

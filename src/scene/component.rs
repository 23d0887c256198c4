//! Node components.
//!
//! A component is a piece of behaviour bound to one node for its whole
//! lifetime. Components are stored in the graph's component table and
//! listed, in order, by their owning node. They die with their node.
//!
//! # Dispatch
//!
//! During [`update`](Component::update) and the attach/remove hooks the
//! component is temporarily taken out of the table, so the callback gets a
//! [`ComponentContext`] with full mutable access to the graph. It can move
//! its node, query siblings, re-parent other nodes, or destroy nodes
//! (including its own). While its own callback runs, a component does not
//! show up in type lookups.
//!
//! [`render`](Component::render) only reads, so it runs in place with a
//! shared [`RenderContext`].
//!
//! # Type lookup
//!
//! Lookups match the concrete component type through [`Any`]:
//!
//! ```rust
//! use gsgamelib::scene::{Component, SceneGraph};
//!
//! struct Thruster { power: f32 }
//! impl Component for Thruster {}
//!
//! let mut graph = SceneGraph::new();
//! let ship = graph.create_node("ship");
//! graph.add_component(ship, Thruster { power: 2.0 }).unwrap();
//!
//! let handle = graph.try_get_component::<Thruster>(ship).unwrap();
//! assert_eq!(graph.component::<Thruster>(handle).unwrap().power, 2.0);
//! ```

use std::any::{Any, type_name};

use glam::Affine3A;

use crate::errors::{Result, SceneError};
use crate::scene::{ComponentHandle, NodeHandle, SceneGraph, TraversalOrder};

/// Behaviour attached to a scene node.
///
/// Every callback has a no-op default.
///
/// Typed lookups such as [`SceneGraph::try_get_component`] match the exact
/// concrete type only. A component is never found through a trait it
/// implements or through another type it wraps; look it up by its own type.
pub trait Component: Any {
    /// Called once per frame for enabled components, in list order.
    fn update(&mut self, _ctx: &mut ComponentContext<'_>, _delta_time: f32) {}

    /// Called once per frame for enabled components, after all updates.
    fn render(&self, _ctx: &RenderContext<'_>) {}

    /// Called right after the component joins its node.
    fn on_attached(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Called right before an explicit removal. Not called when the owning
    /// node is destroyed.
    fn on_removing(&mut self, _ctx: &mut ComponentContext<'_>) {}
}

pub(crate) struct ComponentEntry {
    pub(crate) owner: NodeHandle,
    pub(crate) enabled: bool,
    /// Removal requested while the component's own callback was running.
    pub(crate) removal_pending: bool,
    /// `None` while a callback of this component is running.
    behavior: Option<Box<dyn Component>>,
}

/// Mutable view handed to component callbacks.
pub struct ComponentContext<'a> {
    graph: &'a mut SceneGraph,
    node: NodeHandle,
    component: ComponentHandle,
}

impl ComponentContext<'_> {
    /// The node that owns the running component.
    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeHandle {
        self.node
    }

    /// The running component's own handle.
    #[inline]
    #[must_use]
    pub fn component(&self) -> ComponentHandle {
        self.component
    }

    #[inline]
    #[must_use]
    pub fn graph(&self) -> &SceneGraph {
        self.graph
    }

    #[inline]
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        self.graph
    }

    /// `false` once the owning node has been destroyed from inside the callback.
    #[must_use]
    pub fn node_alive(&self) -> bool {
        self.graph.contains(self.node)
    }

    pub fn local_to_world(&self) -> Result<Affine3A> {
        self.graph.local_to_world(self.node)
    }

    pub fn local_to_parent(&self) -> Result<Affine3A> {
        self.graph.local_to_parent(self.node)
    }

    pub fn modify_local_to_parent(&mut self) -> Result<&mut Affine3A> {
        self.graph.modify_local_to_parent(self.node)
    }

    pub fn modify_local_to_world(&mut self) -> Result<&mut Affine3A> {
        self.graph.modify_local_to_world(self.node)
    }

    #[must_use]
    pub fn try_get_sibling_component<T: Component>(&self) -> Option<ComponentHandle> {
        self.graph.try_get_component::<T>(self.node)
    }

    pub fn get_sibling_component<T: Component>(&self) -> Result<ComponentHandle> {
        self.graph.get_component::<T>(self.node)
    }

    #[must_use]
    pub fn sibling<T: Component>(&self) -> Option<&T> {
        let handle = self.try_get_sibling_component::<T>()?;
        self.graph.component::<T>(handle)
    }

    pub fn sibling_mut<T: Component>(&mut self) -> Option<&mut T> {
        let handle = self.try_get_sibling_component::<T>()?;
        self.graph.component_mut::<T>(handle)
    }
}

/// Read-only view handed to [`Component::render`].
pub struct RenderContext<'a> {
    graph: &'a SceneGraph,
    node: NodeHandle,
}

impl RenderContext<'_> {
    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeHandle {
        self.node
    }

    #[inline]
    #[must_use]
    pub fn graph(&self) -> &SceneGraph {
        self.graph
    }

    /// World matrix of the node being rendered.
    #[must_use]
    pub fn world_matrix(&self) -> Affine3A {
        self.graph.resolve_world(self.node)
    }

    #[must_use]
    pub fn sibling<T: Component>(&self) -> Option<&T> {
        let handle = self.graph.try_get_component::<T>(self.node)?;
        self.graph.component::<T>(handle)
    }
}

impl SceneGraph {
    // ========================================================================
    // Adding & Removing
    // ========================================================================

    /// Appends `component` to `node` and runs its
    /// [`on_attached`](Component::on_attached) hook.
    pub fn add_component<T: Component>(&mut self, node: NodeHandle, component: T) -> Result<ComponentHandle> {
        self.require(node)?;

        let handle = self.components.insert(ComponentEntry {
            owner: node,
            enabled: true,
            removal_pending: false,
            behavior: Some(Box::new(component)),
        });
        self.nodes[node].components.push(handle);

        log::debug!("Added component `{}` to node {node:?}", type_name::<T>());
        self.dispatch(handle, |behavior, ctx| behavior.on_attached(ctx));
        Ok(handle)
    }

    /// Runs the [`on_removing`](Component::on_removing) hook, then unlists and
    /// drops the component.
    ///
    /// The component is still listed by its node while the hook runs. If the
    /// component's own callback is currently running, the hook and the drop
    /// happen as soon as that callback returns.
    pub fn remove_component(&mut self, node: NodeHandle, component: ComponentHandle) -> Result<()> {
        let not_found = SceneError::ComponentNotFound {
            node: Some(node),
            component,
        };

        if !self.require(node)?.components.contains(&component) {
            return Err(not_found);
        }
        let Some(entry) = self.components.get_mut(component).filter(|entry| entry.owner == node) else {
            return Err(not_found);
        };

        match entry.behavior.take() {
            Some(behavior) => self.finish_removal(node, component, behavior),
            None => entry.removal_pending = true,
        }
        Ok(())
    }

    /// Runs the removal hook of a component taken out of its slot, then
    /// unlists it and erases its table entry.
    fn finish_removal(&mut self, node: NodeHandle, component: ComponentHandle, mut behavior: Box<dyn Component>) {
        let mut ctx = ComponentContext {
            graph: self,
            node,
            component,
        };
        behavior.on_removing(&mut ctx);

        if let Some(n) = self.nodes.get_mut(node) {
            n.components.retain(|&c| c != component);
        }
        self.components.remove(component);
        log::debug!("Removed component {component:?} from node {node:?}");
    }

    // ========================================================================
    // Typed Lookup
    // ========================================================================

    /// First component of type `T` on `node`.
    #[must_use]
    pub fn try_get_component<T: Component>(&self, node: NodeHandle) -> Option<ComponentHandle> {
        let n = self.nodes.get(node)?;
        n.components.iter().copied().find(|&c| self.is_component_of::<T>(c))
    }

    pub fn get_component<T: Component>(&self, node: NodeHandle) -> Result<ComponentHandle> {
        self.require(node)?;
        self.try_get_component::<T>(node)
            .ok_or(SceneError::ComponentTypeNotFound {
                node,
                type_name: type_name::<T>(),
            })
    }

    /// All components of type `T` on `node`, in list order.
    #[must_use]
    pub fn try_get_components<T: Component>(&self, node: NodeHandle) -> Vec<ComponentHandle> {
        let mut result = Vec::new();
        self.collect_components::<T>(node, &mut result);
        result
    }

    /// Like [`try_get_components`](Self::try_get_components), but an empty
    /// result is an error.
    pub fn get_components<T: Component>(&self, node: NodeHandle) -> Result<Vec<ComponentHandle>> {
        self.require(node)?;
        non_empty::<T>(node, self.try_get_components::<T>(node))
    }

    /// First component of type `T` in `node`'s subtree, searched pre-order.
    #[must_use]
    pub fn try_get_component_in_children<T: Component>(&self, node: NodeHandle) -> Option<ComponentHandle> {
        let mut found = None;
        self.traverse_subtree(node, TraversalOrder::PreOrder, |handle, _| {
            found = self.try_get_component::<T>(handle);
            found.is_none()
        });
        found
    }

    pub fn get_component_in_children<T: Component>(&self, node: NodeHandle) -> Result<ComponentHandle> {
        self.require(node)?;
        self.try_get_component_in_children::<T>(node)
            .ok_or(SceneError::ComponentTypeNotFound {
                node,
                type_name: type_name::<T>(),
            })
    }

    /// All components of type `T` in `node`'s subtree, pre-order.
    #[must_use]
    pub fn try_get_components_in_children<T: Component>(&self, node: NodeHandle) -> Vec<ComponentHandle> {
        let mut result = Vec::new();
        self.traverse_subtree(node, TraversalOrder::PreOrder, |handle, _| {
            self.collect_components::<T>(handle, &mut result);
            true
        });
        result
    }

    pub fn get_components_in_children<T: Component>(&self, node: NodeHandle) -> Result<Vec<ComponentHandle>> {
        self.require(node)?;
        non_empty::<T>(node, self.try_get_components_in_children::<T>(node))
    }

    fn collect_components<T: Component>(&self, node: NodeHandle, out: &mut Vec<ComponentHandle>) {
        if let Some(n) = self.nodes.get(node) {
            out.extend(n.components.iter().copied().filter(|&c| self.is_component_of::<T>(c)));
        }
    }

    fn is_component_of<T: Component>(&self, component: ComponentHandle) -> bool {
        self.components
            .get(component)
            .and_then(|entry| entry.behavior.as_deref())
            .is_some_and(|behavior| (behavior as &dyn Any).is::<T>())
    }

    // ========================================================================
    // Component Access
    // ========================================================================

    #[must_use]
    pub fn component<T: Component>(&self, component: ComponentHandle) -> Option<&T> {
        let behavior = self.components.get(component)?.behavior.as_deref()?;
        (behavior as &dyn Any).downcast_ref::<T>()
    }

    pub fn component_mut<T: Component>(&mut self, component: ComponentHandle) -> Option<&mut T> {
        let behavior = self.components.get_mut(component)?.behavior.as_deref_mut()?;
        (behavior as &mut dyn Any).downcast_mut::<T>()
    }

    /// Node that owns `component`.
    #[must_use]
    pub fn component_owner(&self, component: ComponentHandle) -> Option<NodeHandle> {
        self.components.get(component).map(|entry| entry.owner)
    }

    /// Disabled components receive no update or render callbacks.
    pub fn set_component_enabled(&mut self, component: ComponentHandle, enabled: bool) -> Result<()> {
        let entry = self
            .components
            .get_mut(component)
            .ok_or(SceneError::ComponentNotFound {
                node: None,
                component,
            })?;
        entry.enabled = enabled;
        Ok(())
    }

    #[must_use]
    pub fn is_component_enabled(&self, component: ComponentHandle) -> bool {
        self.components.get(component).is_some_and(|entry| entry.enabled)
    }

    // ========================================================================
    // Per-frame Callbacks
    // ========================================================================

    /// Runs [`Component::update`] on every enabled component of `node`.
    ///
    /// Components added during the pass wait for the next frame; components
    /// removed or destroyed during the pass are skipped.
    pub fn update_node(&mut self, node: NodeHandle, delta_time: f32) -> Result<()> {
        let components = self.require(node)?.components.clone();

        for component in components {
            let runnable = self
                .components
                .get(component)
                .is_some_and(|entry| entry.enabled && !entry.removal_pending);
            if runnable {
                self.dispatch(component, |behavior, ctx| behavior.update(ctx, delta_time));
            }
        }
        Ok(())
    }

    /// Runs [`Component::render`] on every enabled component of `node`.
    pub fn render_node(&self, node: NodeHandle) -> Result<()> {
        let ctx = RenderContext { graph: self, node };

        for &component in &self.require(node)?.components {
            if let Some(entry) = self.components.get(component)
                && entry.enabled
                && let Some(behavior) = entry.behavior.as_deref()
            {
                behavior.render(&ctx);
            }
        }
        Ok(())
    }

    /// Takes the component out of the table, runs `f` with full graph
    /// access, then puts it back unless it was removed in the meantime.
    fn dispatch<F>(&mut self, component: ComponentHandle, f: F)
    where
        F: FnOnce(&mut dyn Component, &mut ComponentContext<'_>),
    {
        let Some(entry) = self.components.get_mut(component) else {
            return;
        };
        // Re-entrant call for a component that is already running.
        let Some(mut behavior) = entry.behavior.take() else {
            return;
        };
        let node = entry.owner;

        let mut ctx = ComponentContext {
            graph: self,
            node,
            component,
        };
        f(&mut *behavior, &mut ctx);

        match self.components.get_mut(component) {
            Some(entry) if !entry.removal_pending => entry.behavior = Some(behavior),
            Some(_) => self.finish_removal(node, component, behavior),
            // The owning node was destroyed during the callback.
            None => {}
        }
    }
}

fn non_empty<T>(node: NodeHandle, found: Vec<ComponentHandle>) -> Result<Vec<ComponentHandle>> {
    if found.is_empty() {
        Err(SceneError::ComponentTypeNotFound {
            node,
            type_name: type_name::<T>(),
        })
    } else {
        Ok(found)
    }
}

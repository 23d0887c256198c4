use std::borrow::Cow;

use glam::{Affine3A, Vec3};
use slotmap::{SecondaryMap, SlotMap};

use crate::errors::{Result, SceneError};
use crate::math::AffineExt;
use crate::scene::component::ComponentEntry;
use crate::scene::node::SceneNode;
use crate::scene::transform_cache::{CacheState, TransformStats};
use crate::scene::{ComponentHandle, NodeHandle};
use crate::settings::SceneGraphSettings;

/// Arena that owns every scene node.
///
/// The graph keeps two collections: all live nodes (the slot map, sole
/// owner) and the ordered list of root nodes (nodes without a parent). Node
/// creation and destruction only happen here, so a node's lifetime is never
/// tied to who happens to hold its handle.
///
/// # Transforms
///
/// Each node caches a local-to-parent (L2P) and a local-to-world (L2W)
/// matrix. Reads are lazy and resolve whichever side is stale; writes go
/// through [`modify_local_to_parent`](Self::modify_local_to_parent) or
/// [`modify_local_to_world`](Self::modify_local_to_world), which invalidate
/// exactly what depends on the edited matrix.
///
/// Composition follows the apply-order convention of
/// [`AffineExt::then`]: `world = local.then(parent_world)`.
pub struct SceneGraph {
    pub(crate) nodes: SlotMap<NodeHandle, SceneNode>,
    pub(crate) root_nodes: Vec<NodeHandle>,
    pub(crate) components: SlotMap<ComponentHandle, ComponentEntry>,

    settings: SceneGraphSettings,
    /// Handles erased since the last [`validate`](Self::validate) call.
    destroyed: Vec<NodeHandle>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(SceneGraphSettings::default())
    }

    #[must_use]
    pub fn with_settings(settings: SceneGraphSettings) -> Self {
        Self {
            nodes: SlotMap::with_capacity_and_key(settings.initial_capacity),
            root_nodes: Vec::new(),
            components: SlotMap::with_key(),
            settings,
            destroyed: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &SceneGraphSettings {
        &self.settings
    }

    // ========================================================================
    // Creation & Destruction
    // ========================================================================

    /// Creates a root node with identity transforms and no components.
    pub fn create_node(&mut self, name: impl Into<Cow<'static, str>>) -> NodeHandle {
        let handle = self.nodes.insert(SceneNode::new(name));
        self.root_nodes.push(handle);
        log::debug!("Created scene node {:?} '{}'", handle, self.nodes[handle].name);
        handle
    }

    /// Destroys `node` and its whole subtree, dropping their components.
    pub fn destroy_node(&mut self, node: NodeHandle) -> Result<()> {
        let parent = self.require(node)?.parent;

        match parent {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(parent)
                    && let Some(pos) = p.children.iter().position(|&c| c == node)
                {
                    p.children.remove(pos);
                }
            }
            None => self.remove_root(node),
        }

        let erased = self.erase_subtree(node);
        log::debug!("Destroyed scene node {node:?} ({erased} nodes erased)");
        Ok(())
    }

    /// Drops every node and component at once.
    pub fn destroy_all(&mut self) {
        log::debug!("Destroying all {} scene nodes", self.nodes.len());
        self.root_nodes.clear();
        self.nodes.clear();
        self.components.clear();
        self.destroyed.clear();
    }

    fn erase_subtree(&mut self, node: NodeHandle) -> usize {
        let Some(removed) = self.nodes.remove(node) else {
            return 0;
        };

        for component in &removed.components {
            self.components.remove(*component);
        }
        if self.settings.track_destroyed {
            self.destroyed.push(node);
        }

        1 + removed
            .children
            .iter()
            .map(|&child| self.erase_subtree(child))
            .sum::<usize>()
    }

    fn remove_root(&mut self, node: NodeHandle) {
        if let Some(pos) = self.root_nodes.iter().position(|&r| r == node) {
            self.root_nodes.remove(pos);
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn contains(&self, node: NodeHandle) -> bool {
        self.nodes.contains_key(node)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, node: NodeHandle) -> Option<&SceneNode> {
        self.nodes.get(node)
    }

    pub(crate) fn require(&self, node: NodeHandle) -> Result<&SceneNode> {
        self.nodes.get(node).ok_or(SceneError::NodeNotFound(node))
    }

    /// Number of live nodes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root nodes in creation/detach order.
    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[NodeHandle] {
        &self.root_nodes
    }

    #[must_use]
    pub fn name(&self, node: NodeHandle) -> Option<&str> {
        self.nodes.get(node).map(SceneNode::name)
    }

    pub fn set_name(&mut self, node: NodeHandle, name: impl Into<Cow<'static, str>>) -> Result<()> {
        let n = self.nodes.get_mut(node).ok_or(SceneError::NodeNotFound(node))?;
        n.name = name.into();
        Ok(())
    }

    /// First node named `name`, searching each root's subtree in pre-order.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeHandle> {
        let mut found = None;
        for &root in &self.root_nodes {
            self.traverse_subtree(root, crate::scene::TraversalOrder::PreOrder, |handle, node| {
                if node.name == name {
                    found = Some(handle);
                    return false;
                }
                true
            });
            if found.is_some() {
                break;
            }
        }
        found
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Parent of `node`; `None` for roots and stale handles.
    #[inline]
    #[must_use]
    pub fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeHandle) -> Result<&[NodeHandle]> {
        Ok(&self.require(node)?.children)
    }

    pub fn num_children(&self, node: NodeHandle) -> Result<usize> {
        Ok(self.require(node)?.children.len())
    }

    /// Child at `index`, checked against both the child count and liveness.
    pub fn child(&self, node: NodeHandle, index: usize) -> Result<NodeHandle> {
        let children = &self.require(node)?.children;
        let &child = children.get(index).ok_or(SceneError::ChildIndexOutOfRange {
            node,
            index,
            len: children.len(),
        })?;
        self.require(child)?;
        Ok(child)
    }

    /// `true` if `ancestor` sits somewhere above `node` (a node is not its own ancestor).
    #[must_use]
    pub fn is_ancestor_of(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = self.parent(node);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.parent(handle);
        }
        false
    }

    /// Number of ancestors; 0 for roots.
    pub fn depth(&self, node: NodeHandle) -> Result<usize> {
        let mut depth = 0;
        let mut current = self.require(node)?.parent;
        while let Some(handle) = current {
            depth += 1;
            current = self.parent(handle);
        }
        Ok(depth)
    }

    /// Moves `child` under `parent`, keeping its world placement.
    ///
    /// The child is detached from its current parent first (or leaves the
    /// root list). Re-attaching to the same parent moves it to the end of
    /// the child list.
    pub fn attach_child(&mut self, child: NodeHandle, parent: NodeHandle) -> Result<()> {
        let old_parent = self.require(child)?.parent;
        self.require(parent)?;

        if child == parent || self.is_ancestor_of(child, parent) {
            return Err(SceneError::CycleDetected { child, parent });
        }

        // The child derives its new local matrix from this on the next read.
        self.resolve_world(parent);

        match old_parent {
            Some(old) => self.unlink_from_parent(child, old),
            None => self.remove_root(child),
        }

        // Reinterpret the old placement as a world placement.
        let previous_local = self.resolve_local(child);
        self.resolve_world(child);

        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        *self.world_slot(child) = previous_local;

        log::debug!("Attached scene node {child:?} under {parent:?}");
        Ok(())
    }

    /// Makes `node` a root, keeping its world placement.
    pub fn detach_from_parent(&mut self, node: NodeHandle) -> Result<()> {
        let parent = self.require(node)?.parent.ok_or(SceneError::NoParent(node))?;

        self.unlink_from_parent(node, parent);
        self.root_nodes.push(node);

        log::debug!("Detached scene node {node:?} from {parent:?}");
        Ok(())
    }

    fn unlink_from_parent(&mut self, node: NodeHandle, parent: NodeHandle) {
        // A root's local matrix is its world matrix.
        let world = self.resolve_world(node);
        *self.local_slot(node) = world;

        if let Some(p) = self.nodes.get_mut(parent)
            && let Some(pos) = p.children.iter().position(|&c| c == node)
        {
            p.children.remove(pos);
        }
        self.nodes[node].parent = None;
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    /// World transform of `node`, recomputed through its ancestors if stale.
    pub fn local_to_world(&self, node: NodeHandle) -> Result<Affine3A> {
        self.require(node)?;
        Ok(self.resolve_world(node))
    }

    /// Transform of `node` relative to its parent (its world transform for roots).
    pub fn local_to_parent(&self, node: NodeHandle) -> Result<Affine3A> {
        self.require(node)?;
        Ok(self.resolve_local(node))
    }

    /// Writable local-to-parent matrix.
    ///
    /// The world matrices of `node` and of its whole subtree become stale.
    pub fn modify_local_to_parent(&mut self, node: NodeHandle) -> Result<&mut Affine3A> {
        self.require(node)?;
        Ok(self.local_slot(node))
    }

    /// Writable local-to-world matrix.
    ///
    /// The parent does not move: the local matrix of `node` becomes stale
    /// instead, along with the world matrices of its descendants.
    pub fn modify_local_to_world(&mut self, node: NodeHandle) -> Result<&mut Affine3A> {
        self.require(node)?;
        Ok(self.world_slot(node))
    }

    pub fn set_local_to_parent(&mut self, node: NodeHandle, local: Affine3A) -> Result<()> {
        *self.modify_local_to_parent(node)? = local;
        Ok(())
    }

    pub fn set_local_to_world(&mut self, node: NodeHandle, world: Affine3A) -> Result<()> {
        *self.modify_local_to_world(node)? = world;
        Ok(())
    }

    pub fn world_position(&self, node: NodeHandle) -> Result<Vec3> {
        Ok(self.local_to_world(node)?.translation.into())
    }

    pub fn cache_state(&self, node: NodeHandle) -> Result<CacheState> {
        Ok(self.require(node)?.transform.state())
    }

    pub fn transform_stats(&self, node: NodeHandle) -> Result<TransformStats> {
        Ok(self.require(node)?.transform.stats())
    }

    /// Invalidates the world side of `node`'s subtree and hands out its L2P.
    /// `node` must be live.
    fn local_slot(&mut self, node: NodeHandle) -> &mut Affine3A {
        self.invalidate_world(node);
        self.nodes[node].transform.local_mut()
    }

    /// Invalidates the local side of `node` and the world side of its
    /// descendants, and hands out its L2W. `node` must be live.
    fn world_slot(&mut self, node: NodeHandle) -> &mut Affine3A {
        self.resolve_world(node);
        for &child in &self.nodes[node].children {
            self.invalidate_world(child);
        }
        self.nodes[node].transform.mark_parent_dirty();
        self.nodes[node].transform.world_mut()
    }

    pub(crate) fn resolve_world(&self, node: NodeHandle) -> Affine3A {
        let Some(n) = self.nodes.get(node) else {
            return Affine3A::IDENTITY;
        };

        if n.transform.state() == CacheState::WorldDirty {
            let local = n.transform.local();
            let world = match n.parent {
                Some(parent) => local.then(&self.resolve_world(parent)),
                None => local,
            };
            log::trace!("Recomputed local-to-world of {node:?}");
            n.transform.store_world(world);
        }

        n.transform.world()
    }

    pub(crate) fn resolve_local(&self, node: NodeHandle) -> Affine3A {
        let Some(n) = self.nodes.get(node) else {
            return Affine3A::IDENTITY;
        };

        if n.transform.state() == CacheState::ParentDirty {
            let world = n.transform.world();
            let local = match n.parent {
                // Cl = Cw * Pw^-1
                Some(parent) => world.then(&self.resolve_world(parent).inverse()),
                None => world,
            };
            log::trace!("Recomputed local-to-parent of {node:?}");
            n.transform.store_local(local);
        }

        n.transform.local()
    }

    /// Marks the world matrix of `node` and all its descendants stale.
    ///
    /// Pending local matrices in the subtree are derived first, while every
    /// world matrix they depend on is still valid. Subtrees whose root is
    /// already world-dirty are skipped: all of their nodes are world-dirty too.
    fn invalidate_world(&self, node: NodeHandle) {
        self.resolve_pending_locals(node);
        self.mark_world_dirty(node);
    }

    fn resolve_pending_locals(&self, node: NodeHandle) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        match n.transform.state() {
            CacheState::WorldDirty => return,
            CacheState::ParentDirty => {
                self.resolve_local(node);
            }
            CacheState::Clean => {}
        }
        for &child in &n.children {
            self.resolve_pending_locals(child);
        }
    }

    fn mark_world_dirty(&self, node: NodeHandle) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        if n.transform.state() == CacheState::WorldDirty {
            return;
        }
        n.transform.mark_world_dirty();
        for &child in &n.children {
            self.mark_world_dirty(child);
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Handles destroyed since the last [`validate`](Self::validate) call.
    /// Always empty unless [`SceneGraphSettings::track_destroyed`] is set.
    #[inline]
    #[must_use]
    pub fn destroyed_since_validation(&self) -> &[NodeHandle] {
        &self.destroyed
    }

    /// Checks the graph's structural invariants.
    ///
    /// - the root list holds exactly the parentless nodes, once each
    /// - parent and child links are live and agree with each other
    /// - no node is its own ancestor
    /// - component lists and the component table agree
    /// - nodes destroyed since the last call no longer resolve
    ///
    /// Clears the list of destroyed handles afterwards. Meant to run once per
    /// frame after updates, in development builds.
    pub fn validate(&mut self) -> Result<()> {
        let result = self.check_consistency();
        self.destroyed.clear();

        if let Err(err) = &result {
            log::error!("{err}");
        }
        result
    }

    fn check_consistency(&self) -> Result<()> {
        let fail = |msg: String| -> Result<()> { Err(SceneError::Validation(msg)) };

        let mut in_roots: SecondaryMap<NodeHandle, ()> = SecondaryMap::new();
        for &root in &self.root_nodes {
            let Some(node) = self.nodes.get(root) else {
                return fail(format!("root list holds stale handle {root:?}"));
            };
            if node.parent.is_some() {
                return fail(format!("root {root:?} has a parent"));
            }
            if in_roots.insert(root, ()).is_some() {
                return fail(format!("root {root:?} listed twice"));
            }
        }

        for (handle, node) in &self.nodes {
            match node.parent {
                None if !in_roots.contains_key(handle) => {
                    return fail(format!("parentless node {handle:?} missing from root list"));
                }
                None => {}
                Some(parent) => {
                    let Some(p) = self.nodes.get(parent) else {
                        return fail(format!("node {handle:?} has stale parent {parent:?}"));
                    };
                    let count = p.children.iter().filter(|&&c| c == handle).count();
                    if count != 1 {
                        return fail(format!(
                            "parent {parent:?} lists child {handle:?} {count} times"
                        ));
                    }
                }
            }

            for &child in &node.children {
                match self.nodes.get(child) {
                    None => return fail(format!("node {handle:?} has stale child {child:?}")),
                    Some(c) if c.parent != Some(handle) => {
                        return fail(format!("child {child:?} does not point back to {handle:?}"));
                    }
                    Some(_) => {}
                }
            }

            for &component in &node.components {
                match self.components.get(component) {
                    Some(entry) if entry.owner == handle => {}
                    _ => {
                        return fail(format!(
                            "node {handle:?} lists foreign or stale component {component:?}"
                        ));
                    }
                }
            }

            let mut steps = 0;
            let mut current = node.parent;
            while let Some(ancestor) = current {
                steps += 1;
                if steps > self.nodes.len() {
                    return fail(format!("node {handle:?} is part of a cycle"));
                }
                current = self.parent(ancestor);
            }
        }

        for (component, entry) in &self.components {
            let listed = self
                .nodes
                .get(entry.owner)
                .is_some_and(|n| n.components.contains(&component));
            if !listed && !entry.removal_pending {
                return fail(format!("component {component:?} is not listed by its owner"));
            }
        }

        for &destroyed in &self.destroyed {
            if self.nodes.contains_key(destroyed) {
                return fail(format!("destroyed node {destroyed:?} still resolves"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::EulerAngles;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn world_dirty_subtree_is_fully_dirty_after_parent_edit() {
        let mut graph = SceneGraph::new();
        let a = graph.create_node("a");
        let b = graph.create_node("b");
        let c = graph.create_node("c");
        graph.attach_child(b, a).unwrap();
        graph.attach_child(c, b).unwrap();

        graph.local_to_world(c).unwrap();
        graph.modify_local_to_parent(a).unwrap();

        for node in [a, b, c] {
            assert_eq!(graph.cache_state(node).unwrap(), CacheState::WorldDirty);
        }
    }

    #[test]
    fn pending_local_is_resolved_against_old_parent_world() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_node("parent");
        let child = graph.create_node("child");
        graph.attach_child(child, parent).unwrap();

        graph
            .set_local_to_world(child, Affine3A::from_translation(Vec3::new(3.0, 0.0, 0.0)))
            .unwrap();
        assert_eq!(graph.cache_state(child).unwrap(), CacheState::ParentDirty);

        // Moving the parent carries the child along with it.
        graph
            .set_local_to_parent(parent, Affine3A::from_translation(Vec3::new(0.0, 0.0, 7.0)))
            .unwrap();
        assert_eq!(graph.cache_state(parent).unwrap(), CacheState::WorldDirty);

        let world = graph.world_position(child).unwrap();
        assert!(world.abs_diff_eq(Vec3::new(3.0, 0.0, 7.0), EPSILON));
    }

    #[test]
    fn attach_under_dirty_parent_follows_later_parent_moves() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_node("parent");
        let child = graph.create_node("child");

        graph
            .set_local_to_parent(parent, Affine3A::from_translation(Vec3::X))
            .unwrap();
        graph.attach_child(child, parent).unwrap();
        graph
            .set_local_to_parent(parent, Affine3A::from_translation(Vec3::new(5.0, 0.0, 0.0)))
            .unwrap();

        let world = graph.world_position(child).unwrap();
        assert!(world.abs_diff_eq(Vec3::new(4.0, 0.0, 0.0), EPSILON));
    }

    #[test]
    fn reparent_under_rotated_parent_keeps_orientation() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_node("parent");
        let node = graph.create_node("node");

        let angles = EulerAngles::new(0.8, 0.1, -0.3);
        graph
            .set_local_to_parent(
                parent,
                Affine3A::from_euler_translation(angles, Vec3::new(1.0, 2.0, 3.0)),
            )
            .unwrap();
        let placed = Affine3A::from_euler_translation(EulerAngles::new(-0.2, 0.0, 0.4), Vec3::ONE);
        graph.set_local_to_parent(node, placed).unwrap();

        graph.attach_child(node, parent).unwrap();

        assert!(graph.local_to_world(node).unwrap().abs_diff_eq(placed, EPSILON));
        let composed = graph
            .local_to_parent(node)
            .unwrap()
            .then(&graph.local_to_world(parent).unwrap());
        assert!(composed.abs_diff_eq(placed, EPSILON));
    }

    #[test]
    fn validate_reports_corrupted_root_list() {
        let mut graph = SceneGraph::new();
        let a = graph.create_node("a");
        graph.root_nodes.push(a);

        assert!(matches!(graph.validate(), Err(SceneError::Validation(_))));
    }
}

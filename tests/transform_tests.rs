//! Transform caching tests
//!
//! Tests for:
//! - Tri-state dirty flag transitions
//! - World = local composed with parent world, through whole chains
//! - Lazy, idempotent reads (observed through TransformStats)
//! - Cascading invalidation after edits at any depth
//! - World placement preserved across attach / detach
//! - Euler angle helpers on Affine3A

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use glam::{Affine3A, Quat, Vec3};
use gsgamelib::{AffineExt, CacheState, EulerAngles, SceneGraph};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-4;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

fn affine_approx(a: Affine3A, b: Affine3A) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn translation(x: f32, y: f32, z: f32) -> Affine3A {
    Affine3A::from_translation(Vec3::new(x, y, z))
}

// ============================================================================
// Dirty State
// ============================================================================

#[test]
fn new_node_is_clean_identity() {
    let mut graph = SceneGraph::new();
    let node = graph.create_node("node");

    assert_eq!(graph.cache_state(node).unwrap(), CacheState::Clean);
    assert_eq!(graph.local_to_parent(node).unwrap(), Affine3A::IDENTITY);
    assert_eq!(graph.local_to_world(node).unwrap(), Affine3A::IDENTITY);
}

#[test]
fn state_follows_the_last_edited_side() {
    let mut graph = SceneGraph::new();
    let node = graph.create_node("node");

    graph.modify_local_to_parent(node).unwrap();
    assert_eq!(graph.cache_state(node).unwrap(), CacheState::WorldDirty);

    graph.modify_local_to_world(node).unwrap();
    assert_eq!(graph.cache_state(node).unwrap(), CacheState::ParentDirty);

    graph.local_to_parent(node).unwrap();
    assert_eq!(graph.cache_state(node).unwrap(), CacheState::Clean);
}

#[test]
fn local_edit_over_pending_world_edit_keeps_the_world_edit() {
    let mut graph = SceneGraph::new();
    let parent = graph.create_node("parent");
    let child = graph.create_node("child");
    graph.set_local_to_parent(parent, translation(1.0, 0.0, 0.0)).unwrap();
    graph.attach_child(child, parent).unwrap();

    graph.set_local_to_world(child, translation(5.0, 0.0, 0.0)).unwrap();
    // Resolves the pending L2P before handing out the slot.
    let local = graph.modify_local_to_parent(child).unwrap();
    assert!(vec3_approx(local.translation.into(), Vec3::new(4.0, 0.0, 0.0)));
    local.translation.y = 2.0;

    let world = graph.world_position(child).unwrap();
    assert!(vec3_approx(world, Vec3::new(5.0, 2.0, 0.0)));
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn translation_propagates_from_parent() {
    let mut graph = SceneGraph::new();
    let parent = graph.create_node("parent");
    let child = graph.create_node("child");
    graph.attach_child(child, parent).unwrap();

    graph.set_local_to_parent(child, translation(0.0, 5.0, 0.0)).unwrap();
    assert!(vec3_approx(graph.world_position(child).unwrap(), Vec3::new(0.0, 5.0, 0.0)));

    graph.set_local_to_parent(parent, translation(10.0, 0.0, 0.0)).unwrap();
    assert!(vec3_approx(graph.world_position(child).unwrap(), Vec3::new(10.0, 5.0, 0.0)));
}

#[test]
fn world_is_local_then_parent_world_along_chain() {
    let mut graph = SceneGraph::new();
    let a = graph.create_node("a");
    let b = graph.create_node("b");
    let c = graph.create_node("c");
    graph.attach_child(b, a).unwrap();
    graph.attach_child(c, b).unwrap();

    let la = Affine3A::from_euler_translation(EulerAngles::new(0.4, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
    let lb = Affine3A::from_scale_rotation_translation(
        Vec3::splat(2.0),
        Quat::from_rotation_x(FRAC_PI_4),
        Vec3::new(0.0, 3.0, 0.0),
    );
    let lc = translation(0.0, 0.0, -1.0);
    graph.set_local_to_parent(a, la).unwrap();
    graph.set_local_to_parent(b, lb).unwrap();
    graph.set_local_to_parent(c, lc).unwrap();

    let expected = lc.then(&lb).then(&la);
    assert!(affine_approx(graph.local_to_world(c).unwrap(), expected));

    for node in [b, c] {
        let parent = graph.parent(node).unwrap();
        let composed = graph
            .local_to_parent(node)
            .unwrap()
            .then(&graph.local_to_world(parent).unwrap());
        assert!(affine_approx(graph.local_to_world(node).unwrap(), composed));
    }
}

#[test]
fn world_edit_leaves_parent_in_place() {
    let mut graph = SceneGraph::new();
    let parent = graph.create_node("parent");
    let child = graph.create_node("child");
    graph.set_local_to_parent(parent, translation(10.0, 0.0, 0.0)).unwrap();
    graph.attach_child(child, parent).unwrap();

    graph.set_local_to_world(child, translation(0.0, 5.0, 0.0)).unwrap();

    assert!(vec3_approx(graph.world_position(parent).unwrap(), Vec3::new(10.0, 0.0, 0.0)));
    let local = graph.local_to_parent(child).unwrap();
    assert!(vec3_approx(local.translation.into(), Vec3::new(-10.0, 5.0, 0.0)));
}

// ============================================================================
// Lazy Evaluation
// ============================================================================

#[test]
fn repeated_reads_do_not_recompute() {
    let mut graph = SceneGraph::new();
    let parent = graph.create_node("parent");
    let child = graph.create_node("child");
    graph.attach_child(child, parent).unwrap();
    graph.set_local_to_parent(child, translation(1.0, 2.0, 3.0)).unwrap();

    let before = graph.transform_stats(child).unwrap();
    let first = graph.local_to_world(child).unwrap();
    let after_first = graph.transform_stats(child).unwrap();
    let second = graph.local_to_world(child).unwrap();
    let after_second = graph.transform_stats(child).unwrap();

    assert_eq!(first, second);
    assert_eq!(after_first.world_recomputes, before.world_recomputes + 1);
    assert_eq!(after_second, after_first);
}

#[test]
fn edits_do_not_recompute_until_read() {
    let mut graph = SceneGraph::new();
    let node = graph.create_node("node");

    let before = graph.transform_stats(node).unwrap();
    for i in 0..10 {
        graph.set_local_to_parent(node, translation(i as f32, 0.0, 0.0)).unwrap();
    }
    assert_eq!(graph.transform_stats(node).unwrap(), before);

    assert!(vec3_approx(graph.world_position(node).unwrap(), Vec3::new(9.0, 0.0, 0.0)));
    assert_eq!(
        graph.transform_stats(node).unwrap().world_recomputes,
        before.world_recomputes + 1
    );
}

// ============================================================================
// Cascading Invalidation
// ============================================================================

#[test]
fn edit_invalidates_whole_subtree_only() {
    let mut graph = SceneGraph::new();
    let root = graph.create_node("root");
    let mid = graph.create_node("mid");
    let leaf = graph.create_node("leaf");
    let other = graph.create_node("other");
    graph.attach_child(mid, root).unwrap();
    graph.attach_child(leaf, mid).unwrap();
    graph.attach_child(other, root).unwrap();

    for node in [root, mid, leaf, other] {
        graph.local_to_world(node).unwrap();
    }

    graph.set_local_to_parent(mid, translation(0.0, 1.0, 0.0)).unwrap();

    assert_eq!(graph.cache_state(root).unwrap(), CacheState::Clean);
    assert_eq!(graph.cache_state(other).unwrap(), CacheState::Clean);
    assert_eq!(graph.cache_state(mid).unwrap(), CacheState::WorldDirty);
    assert_eq!(graph.cache_state(leaf).unwrap(), CacheState::WorldDirty);
}

#[test]
fn world_edit_invalidates_children_not_self() {
    let mut graph = SceneGraph::new();
    let parent = graph.create_node("parent");
    let child = graph.create_node("child");
    graph.attach_child(child, parent).unwrap();
    graph.set_local_to_parent(child, translation(0.0, 0.0, 2.0)).unwrap();
    graph.local_to_world(child).unwrap();

    graph.set_local_to_world(parent, translation(3.0, 0.0, 0.0)).unwrap();

    assert_eq!(graph.cache_state(parent).unwrap(), CacheState::ParentDirty);
    assert_eq!(graph.cache_state(child).unwrap(), CacheState::WorldDirty);
    assert!(vec3_approx(graph.world_position(child).unwrap(), Vec3::new(3.0, 0.0, 2.0)));
}

#[test]
fn deep_chain_follows_root_edits() {
    let mut graph = SceneGraph::new();
    let mut nodes = vec![graph.create_node("n0")];
    for i in 1..8 {
        let node = graph.create_node(format!("n{i}"));
        graph.attach_child(node, nodes[i - 1]).unwrap();
        graph.set_local_to_parent(node, translation(1.0, 0.0, 0.0)).unwrap();
        nodes.push(node);
    }
    let tip = nodes[7];
    assert!(vec3_approx(graph.world_position(tip).unwrap(), Vec3::new(7.0, 0.0, 0.0)));

    graph
        .set_local_to_parent(nodes[0], Affine3A::from_rotation_z(FRAC_PI_2))
        .unwrap();
    assert!(vec3_approx(graph.world_position(tip).unwrap(), Vec3::new(0.0, 7.0, 0.0)));

    graph.set_local_to_parent(nodes[3], translation(0.0, 0.0, 0.0)).unwrap();
    assert!(vec3_approx(graph.world_position(tip).unwrap(), Vec3::new(0.0, 6.0, 0.0)));
}

// ============================================================================
// Re-parenting
// ============================================================================

#[test]
fn attach_preserves_world_placement() {
    let mut graph = SceneGraph::new();
    let parent = graph.create_node("parent");
    let node = graph.create_node("node");
    graph
        .set_local_to_parent(
            parent,
            Affine3A::from_euler_translation(EulerAngles::new(FRAC_PI_2, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0)),
        )
        .unwrap();
    graph.set_local_to_parent(node, translation(1.0, 2.0, 3.0)).unwrap();

    graph.attach_child(node, parent).unwrap();

    assert!(vec3_approx(graph.world_position(node).unwrap(), Vec3::new(1.0, 2.0, 3.0)));
    let expected_local = translation(1.0, 2.0, 3.0).then(&graph.local_to_world(parent).unwrap().inverse());
    assert!(affine_approx(graph.local_to_parent(node).unwrap(), expected_local));
}

#[test]
fn detach_preserves_world_placement_and_lists_root() {
    let mut graph = SceneGraph::new();
    let parent = graph.create_node("parent");
    let node = graph.create_node("node");
    graph.attach_child(node, parent).unwrap();
    graph.set_local_to_parent(parent, translation(60.0, 0.0, 0.0)).unwrap();
    graph.set_local_to_parent(node, translation(40.0, 0.0, 0.0)).unwrap();

    graph.detach_from_parent(node).unwrap();

    assert_eq!(graph.parent(node), None);
    assert!(graph.roots().contains(&node));
    assert!(vec3_approx(graph.world_position(node).unwrap(), Vec3::new(100.0, 0.0, 0.0)));
    let local = graph.local_to_parent(node).unwrap();
    assert!(vec3_approx(local.translation.into(), Vec3::new(100.0, 0.0, 0.0)));

    // The old parent no longer drags it along.
    graph.set_local_to_parent(parent, Affine3A::IDENTITY).unwrap();
    assert!(vec3_approx(graph.world_position(node).unwrap(), Vec3::new(100.0, 0.0, 0.0)));
}

#[test]
fn reparent_between_scaled_parents() {
    let mut graph = SceneGraph::new();
    let first = graph.create_node("first");
    let second = graph.create_node("second");
    let node = graph.create_node("node");

    graph
        .set_local_to_parent(
            first,
            Affine3A::from_scale_rotation_translation(Vec3::new(1.0, 3.0, 0.5), Quat::IDENTITY, Vec3::X),
        )
        .unwrap();
    graph
        .set_local_to_parent(
            second,
            Affine3A::from_scale_rotation_translation(Vec3::splat(4.0), Quat::from_rotation_y(0.6), Vec3::Z),
        )
        .unwrap();
    graph.attach_child(node, first).unwrap();
    graph.set_local_to_parent(node, translation(1.0, 1.0, 1.0)).unwrap();
    let world = graph.local_to_world(node).unwrap();

    graph.attach_child(node, second).unwrap();

    assert!(affine_approx(graph.local_to_world(node).unwrap(), world));
    assert!(graph.children(first).unwrap().is_empty());
    assert_eq!(graph.children(second).unwrap(), &[node]);
}

// ============================================================================
// Euler Angles
// ============================================================================

#[test]
fn euler_angles_round_trip_through_scene() {
    let mut graph = SceneGraph::new();
    let node = graph.create_node("node");
    let angles = EulerAngles::new(0.7, -0.3, 1.2);

    graph.modify_local_to_parent(node).unwrap().set_euler_angles(angles);
    let read = graph.local_to_world(node).unwrap().euler_angles();

    assert!(approx_eq(read.yaw, angles.yaw));
    assert!(approx_eq(read.pitch, angles.pitch));
    assert!(approx_eq(read.roll, angles.roll));
}

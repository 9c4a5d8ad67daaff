//! Node deletion tests
//!
//! Tests for:
//! - Subtree expansion and removal counts
//! - Dense renumbering of survivors
//! - Sibling chains bridged over removed nodes
//! - Components, names and transforms following the renumbering

use arbor::{Scene, delete_scene_nodes, scene_from_parents};
use glam::{Mat4, Vec3};

/// 0 root ─┬─ 1 a ─┬─ 2 a0
///         │       └─ 3 a1 ── 4 a1x
///         ├─ 5 b
///         └─ 6 c ── 7 c0
fn tree() -> Scene {
    scene_from_parents(&[
        (None, "root"),
        (Some(0), "a"),
        (Some(1), "a0"),
        (Some(1), "a1"),
        (Some(3), "a1x"),
        (Some(0), "b"),
        (Some(0), "c"),
        (Some(6), "c0"),
    ])
}

fn names(scene: &Scene) -> Vec<&str> {
    (0..scene.len()).map(|n| scene.node_name(n)).collect()
}

#[test]
fn deleting_a_leaf_removes_one_node() {
    let mut scene = tree();
    assert_eq!(scene.delete_nodes(&[5]), 1);
    assert_eq!(scene.len(), 7);
    assert_eq!(names(&scene), vec!["root", "a", "a0", "a1", "a1x", "c", "c0"]);
    scene.validate().unwrap();
}

#[test]
fn deleting_a_subtree_removes_descendants() {
    let mut scene = tree();
    // a + a0 + a1 + a1x
    assert_eq!(scene.delete_nodes(&[1]), 4);
    assert_eq!(names(&scene), vec!["root", "b", "c", "c0"]);
    assert_eq!(scene.children(0).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(scene.hierarchy(0).first_child(), Some(1));
    scene.validate().unwrap();
}

#[test]
fn overlapping_requests_count_once() {
    let mut scene = tree();
    assert_eq!(delete_scene_nodes(&mut scene, &[3, 4, 3]), 2);
    assert_eq!(scene.len(), 6);
}

#[test]
fn deleting_root_empties_scene() {
    let mut scene = tree();
    assert_eq!(scene.delete_nodes(&[0]), 8);
    assert!(scene.is_empty());
    assert!(!scene.has_pending_changes());
}

#[test]
fn sibling_chain_bridges_removed_nodes() {
    let mut scene = tree();
    scene.delete_nodes(&[5]);
    // a -> c, skipping the removed b.
    assert_eq!(scene.hierarchy(1).next_sibling(), Some(5));
    assert_eq!(scene.node_name(5), "c");
    assert_eq!(scene.children(0).collect::<Vec<_>>(), vec![1, 5]);
}

#[test]
fn levels_are_preserved() {
    let mut scene = tree();
    scene.delete_nodes(&[2, 5]);
    for node in 0..scene.len() {
        assert_eq!(scene.hierarchy(node).level(), scene.node_level(node));
    }
    let a1x = scene.find_node_by_name("a1x").unwrap();
    assert_eq!(scene.hierarchy(a1x).level(), 3);
}

#[test]
fn components_follow_renumbering() {
    let mut scene = tree();
    scene.set_mesh(2, 10);
    scene.set_mesh(7, 11);
    scene.set_material(7, 3);
    scene.delete_nodes(&[1]);

    let c0 = scene.find_node_by_name("c0").unwrap();
    assert_eq!(c0, 3);
    assert_eq!(scene.mesh(c0), Some(11));
    assert_eq!(scene.material(c0), Some(3));
    assert_eq!(scene.meshes().len(), 1);
    scene.validate().unwrap();
}

#[test]
fn transforms_follow_renumbering() {
    let mut scene = tree();
    scene.set_local_transform(6, Mat4::from_translation(Vec3::Z));
    scene.set_local_transform(7, Mat4::from_translation(Vec3::X));
    scene.recalculate_global_transforms();

    scene.delete_nodes(&[1, 5]);
    let c0 = scene.find_node_by_name("c0").unwrap();
    assert_eq!(scene.local_transform(c0).w_axis.truncate(), Vec3::X);
    assert_eq!(scene.global_transform(c0).w_axis.truncate(), Vec3::new(1.0, 0.0, 1.0));
}

#[test]
fn pending_changes_survive_deletion() {
    let mut scene = tree();
    scene.recalculate_global_transforms();
    scene.set_local_transform(6, Mat4::from_translation(Vec3::Y));
    scene.delete_nodes(&[1]);

    // c and c0 were queued; they are now nodes 2 and 3.
    assert_eq!(scene.dirty_levels().pending(), 2);
    assert_eq!(scene.recalculate_global_transforms(), 2);
    assert_eq!(scene.global_transform(3).w_axis.truncate(), Vec3::Y);
}

#[test]
fn append_after_delete() {
    let mut scene = tree();
    scene.delete_nodes(&[6]);
    let d = scene.add_node(Some(0), 1);
    scene.set_node_name(d, "d");
    assert_eq!(scene.children(0).collect::<Vec<_>>(), vec![1, 5, d]);
    assert_eq!(scene.find_node_by_name("d"), Some(d));
    scene.validate().unwrap();
}

#[test]
#[should_panic(expected = "out of bounds")]
fn deleting_unknown_node_panics() {
    let mut scene = tree();
    scene.delete_nodes(&[42]);
}

//! Draw-batch assembler tests
//!
//! Tests for:
//! - Shape list construction and the missing-material policies
//! - Indirect commands and visibility masks
//! - Transform packing in shape order
//! - Subset batches (opaque / transparent split, invalidation on rebuild)
//! - Buffer versioning

use arbor::{
    ArborError, DrawBatch, DrawBatchSettings, MaterialFlags, MaterialRecord, MeshRecord, MissingMaterialPolicy,
    MultiRenderer, Scene, scene_from_parents,
};
use glam::{Mat4, Vec3};

// ============================================================================
// Helper
// ============================================================================

/// root ─┬─ a (mesh 0, material 0)
///       ├─ b (mesh 1, material 1)
///       └─ c (mesh 0, material 1)
fn three_shapes() -> Scene {
    let mut scene = scene_from_parents(&[(None, "root"), (Some(0), "a"), (Some(0), "b"), (Some(0), "c")]);
    for (node, mesh, material) in [(1, 0, 0), (2, 1, 1), (3, 0, 1)] {
        scene.set_mesh(node, mesh);
        scene.set_material(node, material);
        scene.set_local_transform(node, Mat4::from_translation(Vec3::X * node as f32));
    }
    scene.set_local_transform(0, Mat4::from_translation(Vec3::Y));
    scene.recalculate_global_transforms();
    scene
}

fn mesh_table() -> Vec<MeshRecord> {
    vec![
        MeshRecord::new(0, 0, 24, &[36, 12]),
        MeshRecord::new(36, 24, 8, &[18]),
    ]
}

fn materials() -> Vec<MaterialRecord> {
    vec![
        MaterialRecord::new(MaterialFlags::CAST_SHADOW),
        MaterialRecord::new(MaterialFlags::TRANSPARENT),
    ]
}

fn renderer(scene: &Scene) -> MultiRenderer {
    MultiRenderer::new(scene, mesh_table(), DrawBatchSettings::default()).unwrap()
}

// ============================================================================
// Shapes
// ============================================================================

#[test]
fn one_shape_per_mesh_node_in_node_order() {
    let scene = three_shapes();
    let r = renderer(&scene);
    let shapes = r.shapes();
    assert_eq!(shapes.len(), 3);
    assert_eq!(shapes.iter().map(|s| s.transform_index).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(shapes[1].mesh_index, 1);
    assert_eq!(shapes[1].material_index, 1);
    assert_eq!(shapes[1].index_offset, 36);
    assert_eq!(shapes[1].vertex_offset, 24);
    assert!(shapes.iter().all(|s| s.lod == 0));
}

#[test]
fn missing_material_policies() {
    let mut scene = three_shapes();
    let extra = scene.add_node(Some(0), 1);
    scene.set_mesh(extra, 1);

    let skip = renderer(&scene);
    assert_eq!(skip.shape_count(), 3);

    let settings = DrawBatchSettings {
        missing_material: MissingMaterialPolicy::Fallback(0),
        ..Default::default()
    };
    let fallback = MultiRenderer::new(&scene, mesh_table(), settings).unwrap();
    assert_eq!(fallback.shape_count(), 4);
    assert_eq!(fallback.shapes()[3].material_index, 0);

    let settings = DrawBatchSettings {
        missing_material: MissingMaterialPolicy::Error,
        ..Default::default()
    };
    let err = MultiRenderer::new(&scene, mesh_table(), settings).err().unwrap();
    assert!(matches!(err, ArborError::MissingMaterial { node } if node == extra));
}

#[test]
fn unknown_mesh_is_an_error() {
    let mut scene = three_shapes();
    scene.set_mesh(2, 9);
    let err = MultiRenderer::new(&scene, mesh_table(), DrawBatchSettings::default()).err().unwrap();
    assert!(matches!(err, ArborError::MeshOutOfBounds { node: 2, mesh: 9, count: 2 }));
}

#[test]
fn rebuild_after_structural_change() {
    let mut scene = three_shapes();
    let mut r = renderer(&scene);
    scene.delete_nodes(&[2]);
    scene.recalculate_global_transforms();
    r.rebuild_shapes(&scene).unwrap();
    assert_eq!(r.shape_count(), 2);
    assert_eq!(r.indirect_buffer().len(), 2);
    assert_eq!(r.transform_buffer().len(), 2);
}

// ============================================================================
// Indirect commands
// ============================================================================

#[test]
fn visibility_mask_drives_instance_counts() {
    let scene = three_shapes();
    let r = renderer(&scene);
    r.refresh_indirect(Some(&[true, false, true])).unwrap();

    let commands = r.indirect_buffer().read();
    assert_eq!(commands.iter().map(|c| c.instance_count).collect::<Vec<_>>(), vec![1, 0, 1]);
    assert_eq!(commands.iter().map(|c| c.first_instance).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(commands.iter().map(|c| c.vertex_count).collect::<Vec<_>>(), vec![36, 18, 36]);
    assert!(commands.iter().all(|c| c.first_vertex == 0));
}

#[test]
fn no_mask_means_all_visible() {
    let scene = three_shapes();
    let r = renderer(&scene);
    r.refresh_indirect(Some(&[false, false, false])).unwrap();
    r.refresh_indirect(None).unwrap();
    assert!(r.indirect_buffer().read().iter().all(|c| c.instance_count == 1));
}

#[test]
fn wrong_mask_length_is_rejected() {
    let scene = three_shapes();
    let r = renderer(&scene);
    let err = r.refresh_indirect(Some(&[true])).unwrap_err();
    assert!(matches!(err, ArborError::VisibilityMaskLength { expected: 3, got: 1 }));
}

#[test]
fn node_mask_converts_to_shape_mask() {
    let scene = three_shapes();
    let r = renderer(&scene);
    let node_visible = [true, true, false, true];
    assert_eq!(r.shape_visibility(&node_visible), vec![true, false, true]);
    // Short node masks leave the remaining shapes visible.
    assert_eq!(r.shape_visibility(&[true, false]), vec![false, true, true]);
}

// ============================================================================
// Transforms
// ============================================================================

#[test]
fn transforms_are_packed_in_shape_order() {
    let mut scene = three_shapes();
    let r = renderer(&scene);
    {
        let transforms = r.transform_buffer().read();
        assert_eq!(transforms.len(), 3);
        assert_eq!(transforms[2].w_axis.truncate(), Vec3::new(3.0, 1.0, 0.0));
    }

    scene.set_local_transform(0, Mat4::IDENTITY);
    scene.recalculate_global_transforms();
    let version = r.transform_buffer().version();
    r.update(&scene, None).unwrap();

    assert!(r.transform_buffer().version() > version);
    assert_eq!(r.transform_buffer().read()[2].w_axis.truncate(), Vec3::new(3.0, 0.0, 0.0));
}

// ============================================================================
// Subsets
// ============================================================================

#[test]
fn split_by_transparency() {
    let scene = three_shapes();
    let r = renderer(&scene);
    let (opaque, transparent) = r.split_by_transparency(&materials()).unwrap();
    assert_eq!(opaque, vec![0]);
    assert_eq!(transparent, vec![1, 2]);

    let err = r.split_by_transparency(&materials()[..1]).unwrap_err();
    assert!(matches!(err, ArborError::MaterialOutOfBounds { shape: 1, material: 1, count: 1 }));
}

#[test]
fn subset_keeps_original_shape_indices() {
    let scene = three_shapes();
    let r = renderer(&scene);
    let (_, transparent) = r.split_by_transparency(&materials()).unwrap();
    let batch = DrawBatch::new(&r, transparent, "Transparent").unwrap();

    assert_eq!(batch.len(), 2);
    batch.refresh_indirect(&r, Some(&[false, true])).unwrap();
    let commands = batch.indirect_buffer().read();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].first_instance, 1);
    assert_eq!(commands[0].instance_count, 0);
    assert_eq!(commands[1].first_instance, 2);
    assert_eq!(commands[1].instance_count, 1);
    assert_eq!(commands[1].vertex_count, 36);
}

#[test]
fn subset_from_nodes() {
    let scene = three_shapes();
    let r = renderer(&scene);
    // The root has no mesh and is ignored.
    let batch = DrawBatch::for_nodes(&r, &[0, 3, 1], "Picked").unwrap();
    assert_eq!(batch.shape_indices(), &[0, 2]);

    let err = batch.refresh_indirect(&r, Some(&[true, true, true])).unwrap_err();
    assert!(matches!(err, ArborError::VisibilityMaskLength { expected: 2, got: 3 }));
}

#[test]
fn batch_past_rebuilt_shape_list_is_rejected() {
    let mut scene = three_shapes();
    let mut r = renderer(&scene);
    let (_, transparent) = r.split_by_transparency(&materials()).unwrap();
    let batch = DrawBatch::new(&r, transparent, "Transparent").unwrap();

    scene.delete_nodes(&[3]);
    r.rebuild_shapes(&scene).unwrap();
    assert_eq!(r.shape_count(), 2);

    let err = batch.refresh_indirect(&r, None).unwrap_err();
    assert!(matches!(err, ArborError::ShapeOutOfBounds { index: 2, count: 2 }));
}

#[test]
fn batch_is_stale_after_rebuild_until_reassigned() {
    let mut scene = three_shapes();
    let mut r = renderer(&scene);
    let (opaque, _) = r.split_by_transparency(&materials()).unwrap();
    let mut batch = DrawBatch::new(&r, opaque, "Opaque").unwrap();

    // Shape 0 still exists after the rebuild but now belongs to another node.
    scene.delete_nodes(&[1]);
    r.rebuild_shapes(&scene).unwrap();
    let err = batch.refresh_indirect(&r, None).unwrap_err();
    assert!(matches!(err, ArborError::StaleDrawBatch { built: 1, current: 2 }));

    let (_, transparent) = r.split_by_transparency(&materials()).unwrap();
    batch.reassign(&r, transparent).unwrap();
    batch.refresh_indirect(&r, Some(&[true, false])).unwrap();
    let commands = batch.indirect_buffer().read();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[1].first_instance, 1);
    assert_eq!(commands[1].instance_count, 0);
}

#[test]
fn empty_scene_has_no_draws() {
    let scene = Scene::new();
    let r = MultiRenderer::new(&scene, Vec::new(), DrawBatchSettings::default()).unwrap();
    assert_eq!(r.draw_count(), 0);
    assert!(r.indirect_buffer().is_empty());
    assert!(DrawBatch::new(&r, Vec::new(), "Empty").unwrap().is_empty());
}

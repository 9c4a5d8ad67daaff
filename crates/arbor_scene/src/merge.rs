//! Merging several scene graphs under one synthetic root.

use glam::Mat4;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use arbor_core::errors::{ArborError, Result};
use arbor_core::index_to_link;

use crate::scene::Scene;

/// Name given to the synthetic root created by [`merge_scenes`].
pub const MERGED_ROOT_NAME: &str = "NewRoot";

/// How [`merge_scenes`] combines its inputs.
///
/// ```rust,ignore
/// let options = MergeOptions::default()
///     .with_mesh_counts(vec![12, 4])
///     .with_root_transforms(vec![Mat4::IDENTITY, Mat4::from_translation(Vec3::X)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Optional per-scene transforms premultiplied onto each former root.
    /// Empty means "leave roots as they are".
    pub root_transforms: Vec<Mat4>,
    /// Number of meshes owned by each input scene. Required when
    /// `merge_meshes` is set.
    pub mesh_counts: Vec<u32>,
    /// Shift mesh indices into one shared mesh namespace.
    pub merge_meshes: bool,
    /// Shift material indices into one shared material namespace and
    /// concatenate material name tables.
    pub merge_materials: bool,
}

impl MergeOptions {
    /// Shared mesh and material namespaces, the usual setting when the inputs
    /// come with their own distinct asset sets.
    #[must_use]
    pub fn shared_namespaces(mesh_counts: Vec<u32>) -> Self {
        Self {
            mesh_counts,
            merge_meshes: true,
            merge_materials: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_root_transforms(mut self, transforms: Vec<Mat4>) -> Self {
        self.root_transforms = transforms;
        self
    }

    #[must_use]
    pub fn with_mesh_counts(mut self, counts: Vec<u32>) -> Self {
        self.mesh_counts = counts;
        self.merge_meshes = true;
        self
    }

    #[must_use]
    pub fn with_merged_materials(mut self, merge: bool) -> Self {
        self.merge_materials = merge;
        self
    }

    fn check(&self, scene_count: usize) -> Result<()> {
        if !self.root_transforms.is_empty() && self.root_transforms.len() != scene_count {
            return Err(ArborError::MergeInputMismatch {
                what: "root_transforms",
                expected: scene_count,
                got: self.root_transforms.len(),
            });
        }
        if self.merge_meshes && self.mesh_counts.len() != scene_count {
            return Err(ArborError::MergeInputMismatch {
                what: "mesh_counts",
                expected: scene_count,
                got: self.mesh_counts.len(),
            });
        }
        Ok(())
    }
}

/// Copies `src` into `dst`, shifting keys by `key_offset` and values by
/// `value_offset`.
fn merge_map(dst: &mut FxHashMap<u32, u32>, src: &FxHashMap<u32, u32>, key_offset: u32, value_offset: u32) {
    dst.extend(src.iter().map(|(&k, &v)| (k + key_offset, v + value_offset)));
}

/// Combines `scenes` into a new scene under a synthetic root.
///
/// Node 0 of the result is the root named [`MERGED_ROOT_NAME`]. Input scenes
/// follow in order; each one's former roots become children of node 0, chained
/// in input order, and every copied node moves one level deeper. The merged
/// scene is queued for a full transform recompute.
pub fn merge_scenes(scenes: &[&Scene], options: &MergeOptions) -> Result<Scene> {
    options.check(scenes.len())?;

    let mut scene = Scene::new();
    let root = scene.add_node(None, 0);
    scene.set_node_name(root, MERGED_ROOT_NAME);

    if scenes.is_empty() {
        return Ok(scene);
    }

    if !options.merge_materials {
        scene.material_names.clone_from(&scenes[0].material_names);
    }

    let total: usize = scenes.iter().map(|s| s.len()).sum();
    scene.local_transform.reserve(total);
    scene.global_transform.reserve(total);
    scene.hierarchy.reserve(total);

    let mut offset = 1usize;
    let mut mesh_offset = 0u32;
    let mut material_offset = 0u32;
    let mut name_offset = scene.names.len() as u32;
    // (index in merged scene, input scene)
    let mut former_roots: SmallVec<[(usize, usize); 8]> = SmallVec::new();

    for (i, s) in scenes.iter().enumerate() {
        scene.local_transform.extend_from_slice(&s.local_transform);
        scene.global_transform.extend_from_slice(&s.global_transform);
        scene.hierarchy.extend(s.hierarchy.iter().map(|h| h.shifted(offset)));

        scene.names.extend(s.names.iter().cloned());
        if options.merge_materials {
            scene.material_names.extend(s.material_names.iter().cloned());
        }

        let key_offset = offset as u32;
        merge_map(
            &mut scene.meshes,
            &s.meshes,
            key_offset,
            if options.merge_meshes { mesh_offset } else { 0 },
        );
        merge_map(
            &mut scene.material_for_node,
            &s.material_for_node,
            key_offset,
            if options.merge_materials { material_offset } else { 0 },
        );
        merge_map(&mut scene.name_for_node, &s.name_for_node, key_offset, name_offset);

        former_roots.extend(s.roots().map(|r| (r + offset, i)));

        offset += s.len();
        material_offset += s.material_names.len() as u32;
        name_offset += s.names.len() as u32;
        if options.merge_meshes {
            mesh_offset += options.mesh_counts[i];
        }
    }

    // Hang the former roots under the new root, chained in input order.
    for (k, &(node, input)) in former_roots.iter().enumerate() {
        let next = former_roots.get(k + 1).map(|&(n, _)| n);
        let h = &mut scene.hierarchy[node];
        h.parent = index_to_link(Some(root));
        h.next_sibling = index_to_link(next);
        if let Some(transform) = options.root_transforms.get(input) {
            scene.local_transform[node] = *transform * scene.local_transform[node];
        }
    }
    if let (Some(&(first, _)), Some(&(last, _))) = (former_roots.first(), former_roots.last()) {
        scene.hierarchy[root].first_child = index_to_link(Some(first));
        scene.hierarchy[first].last_sibling = index_to_link(Some(last));
    }

    for h in &mut scene.hierarchy[1..] {
        h.level += 1;
    }

    scene.mark_as_changed(root);

    log::debug!(
        "Merged {} scenes into {} nodes ({} meshes, {} materials)",
        scenes.len(),
        scene.len(),
        scene.meshes.len(),
        scene.material_for_node.len()
    );

    Ok(scene)
}

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Arbor: a flat-array scene graph with batched indirect drawing.
//!
//! This crate re-exports the workspace crates under one name:
//!
//! - [`arbor_core`]: error type and link-index helpers
//! - [`scene`]: hierarchy, transforms, merge/delete, scene files
//! - [`render`]: shape list, transform/indirect buffers, draw batches
//!
//! ```rust,ignore
//! use arbor::prelude::*;
//!
//! let mut scene = Scene::new();
//! let root = scene.add_node(None, 0);
//! let child = scene.add_node(Some(root), 1);
//! scene.set_local_transform(child, Mat4::from_translation(Vec3::X));
//! scene.recalculate_global_transforms();
//! ```

pub use arbor_core;
pub use arbor_render as render;
pub use arbor_scene as scene;

pub use arbor_core::{ArborError, NO_NODE, Result};
pub use arbor_render::{
    CpuBuffer, DrawBatch, DrawBatchSettings, DrawIndirectCommand, DrawableShape, MaterialFlags, MaterialRecord,
    MeshRecord, MissingMaterialPolicy, MultiRenderer,
};
pub use arbor_scene::{
    Hierarchy, MERGED_ROOT_NAME, MergeOptions, Scene, delete_scene_nodes, dump_scene_to_dot, load_scene, merge_scenes,
    read_scene, save_scene, write_scene,
};

pub use glam;

pub mod prelude {
    pub use crate::{
        ArborError, DrawBatch, DrawBatchSettings, MaterialRecord, MergeOptions, MeshRecord, MissingMaterialPolicy,
        MultiRenderer, Result, Scene, merge_scenes,
    };
    pub use glam::{Mat4, Quat, Vec3};
}

/// Builds a scene from `(parent, name)` pairs given in creation order.
///
/// Levels are derived from the parents. Handy for tools and tests that need
/// a small named hierarchy.
///
/// # Panics
/// Panics if a parent index does not refer to an earlier entry.
#[must_use]
pub fn scene_from_parents(nodes: &[(Option<usize>, &str)]) -> Scene {
    let mut scene = Scene::new();
    for &(parent, name) in nodes {
        let level = parent.map_or(0, |p| scene.hierarchy(p).level() + 1);
        let node = scene.add_node(parent, level);
        if !name.is_empty() {
            scene.set_node_name(node, name);
        }
    }
    log::trace!("Built scene with {} nodes", scene.len());
    scene
}

//! Multi-object indirect draw batching.
//!
//! Turns a scene graph into GPU-consumable draw data:
//!
//! ```text
//! Scene (meshes / materials / world transforms)
//!   └─ MultiRenderer
//!        ├─ shapes:    DrawableShape per mesh-bearing node   (rebuilt on structural change)
//!        ├─ transforms: world matrix per shape, shape order  (refreshed per frame)
//!        └─ indirect:  DrawIndirectCommand per shape         (refreshed per frame)
//! ```
//!
//! A [`DrawBatch`] draws a subset of the shapes (e.g. only transparent ones)
//! with its own indirect buffer while sharing the shape and transform buffers.

use glam::Mat4;
use rustc_hash::FxHashMap;

use arbor_core::errors::{ArborError, Result};
use arbor_scene::Scene;

use crate::buffer::CpuBuffer;
use crate::mesh::{MaterialRecord, MeshRecord};
use crate::settings::{DrawBatchSettings, MissingMaterialPolicy};
use crate::shape::{DrawIndirectCommand, DrawableShape};

const INDIRECT_USAGE: wgpu::BufferUsages = wgpu::BufferUsages::INDIRECT
    .union(wgpu::BufferUsages::STORAGE)
    .union(wgpu::BufferUsages::COPY_DST);

const STORAGE_USAGE: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE.union(wgpu::BufferUsages::COPY_DST);

/// Builds the shape list in ascending node order.
fn build_shapes(scene: &Scene, meshes: &[MeshRecord], settings: &DrawBatchSettings) -> Result<Vec<DrawableShape>> {
    let mut nodes: Vec<(u32, u32)> = scene.meshes().iter().map(|(&n, &m)| (n, m)).collect();
    nodes.sort_unstable();

    let mut shapes = Vec::with_capacity(nodes.len());
    let mut skipped = 0usize;

    for (node, mesh_index) in nodes {
        let material_index = match (scene.material(node as usize), settings.missing_material) {
            (Some(material), _) => material,
            (None, MissingMaterialPolicy::Fallback(material)) => material,
            (None, MissingMaterialPolicy::Skip) => {
                skipped += 1;
                continue;
            }
            (None, MissingMaterialPolicy::Error) => {
                return Err(ArborError::MissingMaterial { node: node as usize });
            }
        };

        let mesh = meshes.get(mesh_index as usize).ok_or(ArborError::MeshOutOfBounds {
            node: node as usize,
            mesh: mesh_index,
            count: meshes.len(),
        })?;

        shapes.push(DrawableShape {
            mesh_index,
            material_index,
            lod: 0,
            index_offset: mesh.index_offset,
            vertex_offset: mesh.vertex_offset,
            transform_index: node,
        });
    }

    if skipped > 0 {
        log::warn!("{}: skipped {skipped} mesh nodes without a material", settings.label);
    }

    Ok(shapes)
}

/// Indirect arguments for one shape.
fn draw_command(
    shape: &DrawableShape,
    meshes: &[MeshRecord],
    first_instance: u32,
    visible: bool,
) -> Result<DrawIndirectCommand> {
    let mesh = &meshes[shape.mesh_index as usize];
    let vertex_count = mesh.lod_index_count(shape.lod).ok_or(ArborError::LodOutOfBounds {
        mesh: shape.mesh_index,
        lod: shape.lod,
        count: mesh.lod_count,
    })?;
    Ok(DrawIndirectCommand {
        vertex_count,
        instance_count: u32::from(visible),
        first_vertex: 0,
        first_instance,
    })
}

/// Rejects shape indices past the end of the current shape list.
fn check_indices(indices: &[u32], count: usize) -> Result<()> {
    match indices.iter().find(|&&i| i as usize >= count) {
        Some(&bad) => Err(ArborError::ShapeOutOfBounds {
            index: bad as usize,
            count,
        }),
        None => Ok(()),
    }
}

fn check_mask(visibility: Option<&[bool]>, expected: usize) -> Result<()> {
    match visibility {
        Some(mask) if mask.len() != expected => Err(ArborError::VisibilityMaskLength {
            expected,
            got: mask.len(),
        }),
        _ => Ok(()),
    }
}

/// Draws every mesh-bearing node of a scene with one indirect call.
///
/// The renderer does not hold on to the scene: pass it in whenever shapes or
/// transforms need refreshing. The mesh table is owned because every indirect
/// refresh reads it.
pub struct MultiRenderer {
    settings: DrawBatchSettings,
    meshes: Vec<MeshRecord>,
    shapes: Vec<DrawableShape>,
    /// Bumped by every shape-list rebuild; batches remember the value they were built against.
    shape_generation: u64,
    transforms: CpuBuffer<Mat4>,
    indirect: CpuBuffer<DrawIndirectCommand>,
}

impl MultiRenderer {
    /// Builds the shape list and fills both buffers for the current state of
    /// `scene`, with every shape visible.
    pub fn new(scene: &Scene, meshes: Vec<MeshRecord>, settings: DrawBatchSettings) -> Result<Self> {
        let transforms_label = format!("{}.Transforms", settings.label);
        let indirect_label = format!("{}.Indirect", settings.label);
        let transforms = CpuBuffer::new(Vec::new(), STORAGE_USAGE, Some(transforms_label.as_str()));
        let indirect = CpuBuffer::new(Vec::new(), INDIRECT_USAGE, Some(indirect_label.as_str()));

        let mut renderer = Self {
            settings,
            meshes,
            shapes: Vec::new(),
            shape_generation: 0,
            transforms,
            indirect,
        };
        renderer.rebuild_shapes(scene)?;
        Ok(renderer)
    }

    /// Rebuilds the shape list after mesh/material assignments changed, then
    /// refreshes both buffers with every shape visible.
    ///
    /// Shape indices are reassigned, so every [`DrawBatch`] built earlier is
    /// invalidated and must be re-targeted with [`DrawBatch::reassign`].
    pub fn rebuild_shapes(&mut self, scene: &Scene) -> Result<()> {
        self.shapes = build_shapes(scene, &self.meshes, &self.settings)?;
        self.shape_generation += 1;
        log::debug!("{}: {} shapes", self.settings.label, self.shapes.len());
        self.update(scene, None)
    }

    /// Replaces the mesh table and rebuilds the shapes against it.
    pub fn set_meshes(&mut self, scene: &Scene, meshes: Vec<MeshRecord>) -> Result<()> {
        self.meshes = meshes;
        self.rebuild_shapes(scene)
    }

    /// Per-frame refresh of transforms and indirect commands.
    pub fn update(&self, scene: &Scene, visibility: Option<&[bool]>) -> Result<()> {
        self.refresh_transforms(scene);
        self.refresh_indirect(visibility)
    }

    /// Packs the world transform of each shape's node, in shape order.
    ///
    /// # Panics
    /// Panics if the scene lost nodes since the shapes were built; call
    /// [`MultiRenderer::rebuild_shapes`] after structural edits.
    pub fn refresh_transforms(&self, scene: &Scene) {
        let world = scene.global_transforms();
        let mut transforms = self.transforms.write();
        transforms.clear();
        transforms.extend(self.shapes.iter().map(|s| world[s.transform_index as usize]));
    }

    /// Recomputes the indirect commands.
    ///
    /// `visibility`, when given, has one entry per shape; hidden shapes get an
    /// instance count of 0. `first_instance` is the shape's own index.
    pub fn refresh_indirect(&self, visibility: Option<&[bool]>) -> Result<()> {
        check_mask(visibility, self.shapes.len())?;

        let commands = self
            .shapes
            .iter()
            .enumerate()
            .map(|(i, shape)| {
                let visible = visibility.is_none_or(|mask| mask[i]);
                draw_command(shape, &self.meshes, i as u32, visible)
            })
            .collect::<Result<Vec<_>>>()?;

        *self.indirect.write() = commands;
        Ok(())
    }

    /// Converts per-node visibility into the per-shape mask expected by
    /// [`MultiRenderer::refresh_indirect`]. Nodes past the end of
    /// `node_visible` count as visible.
    #[must_use]
    pub fn shape_visibility(&self, node_visible: &[bool]) -> Vec<bool> {
        self.shapes
            .iter()
            .map(|s| node_visible.get(s.transform_index as usize).copied().unwrap_or(true))
            .collect()
    }

    /// Shape indices owned by the given nodes, in shape order.
    #[must_use]
    pub fn shapes_for_nodes(&self, nodes: &[usize]) -> Vec<u32> {
        let wanted: FxHashMap<u32, ()> = nodes.iter().map(|&n| (n as u32, ())).collect();
        self.shapes
            .iter()
            .enumerate()
            .filter(|(_, s)| wanted.contains_key(&s.transform_index))
            .map(|(i, _)| i as u32)
            .collect()
    }

    /// Splits the shapes into opaque and transparent index lists using the
    /// material table.
    pub fn split_by_transparency(&self, materials: &[MaterialRecord]) -> Result<(Vec<u32>, Vec<u32>)> {
        let mut opaque = Vec::new();
        let mut transparent = Vec::new();
        for (i, shape) in self.shapes.iter().enumerate() {
            let material = materials
                .get(shape.material_index as usize)
                .ok_or(ArborError::MaterialOutOfBounds {
                    shape: i,
                    material: shape.material_index,
                    count: materials.len(),
                })?;
            if material.is_transparent() {
                transparent.push(i as u32);
            } else {
                opaque.push(i as u32);
            }
        }
        Ok((opaque, transparent))
    }

    #[must_use]
    pub fn shapes(&self) -> &[DrawableShape] {
        &self.shapes
    }

    #[must_use]
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn meshes(&self) -> &[MeshRecord] {
        &self.meshes
    }

    #[must_use]
    pub fn settings(&self) -> &DrawBatchSettings {
        &self.settings
    }

    #[must_use]
    pub fn transform_buffer(&self) -> &CpuBuffer<Mat4> {
        &self.transforms
    }

    #[must_use]
    pub fn indirect_buffer(&self) -> &CpuBuffer<DrawIndirectCommand> {
        &self.indirect
    }

    /// Counts shape-list rebuilds.
    #[must_use]
    pub fn shape_generation(&self) -> u64 {
        self.shape_generation
    }

    /// Number of draws to issue with the indirect buffer.
    #[must_use]
    pub fn draw_count(&self) -> u32 {
        self.shapes.len() as u32
    }
}

/// A subset of a [`MultiRenderer`]'s shapes with its own indirect buffer.
///
/// The buffer is sized and indexed by the subset, while `first_instance`
/// keeps the original shape index so material and transform lookups in the
/// shader stay valid.
///
/// A batch is tied to the shape list it was built from. After
/// [`MultiRenderer::rebuild_shapes`] its indices may name other shapes, so
/// refreshing it fails with `ArborError::StaleDrawBatch` until it is
/// re-targeted with [`DrawBatch::reassign`].
pub struct DrawBatch {
    shape_indices: Vec<u32>,
    shape_generation: u64,
    indirect: CpuBuffer<DrawIndirectCommand>,
}

impl DrawBatch {
    /// Creates a batch over `shape_indices` and fills it with every shape
    /// visible.
    pub fn new(renderer: &MultiRenderer, shape_indices: Vec<u32>, label: &str) -> Result<Self> {
        check_indices(&shape_indices, renderer.shape_count())?;

        let batch = Self {
            shape_indices,
            shape_generation: renderer.shape_generation(),
            indirect: CpuBuffer::new(Vec::new(), INDIRECT_USAGE, Some(label)),
        };
        batch.refresh_indirect(renderer, None)?;
        Ok(batch)
    }

    /// Creates a batch over the shapes owned by `nodes`.
    pub fn for_nodes(renderer: &MultiRenderer, nodes: &[usize], label: &str) -> Result<Self> {
        Self::new(renderer, renderer.shapes_for_nodes(nodes), label)
    }

    /// Points the batch at a new subset of the renderer's current shape list
    /// and refills it with every shape visible.
    pub fn reassign(&mut self, renderer: &MultiRenderer, shape_indices: Vec<u32>) -> Result<()> {
        check_indices(&shape_indices, renderer.shape_count())?;
        self.shape_indices = shape_indices;
        self.shape_generation = renderer.shape_generation();
        self.refresh_indirect(renderer, None)
    }

    /// Recomputes the subset's indirect commands. `visibility` is indexed by
    /// position within the subset.
    pub fn refresh_indirect(&self, renderer: &MultiRenderer, visibility: Option<&[bool]>) -> Result<()> {
        check_indices(&self.shape_indices, renderer.shape_count())?;
        if self.shape_generation != renderer.shape_generation() {
            return Err(ArborError::StaleDrawBatch {
                built: self.shape_generation,
                current: renderer.shape_generation(),
            });
        }
        check_mask(visibility, self.shape_indices.len())?;

        let shapes = renderer.shapes();
        let commands = self
            .shape_indices
            .iter()
            .enumerate()
            .map(|(i, &shape)| {
                let visible = visibility.is_none_or(|mask| mask[i]);
                draw_command(&shapes[shape as usize], renderer.meshes(), shape, visible)
            })
            .collect::<Result<Vec<_>>>()?;

        *self.indirect.write() = commands;
        Ok(())
    }

    #[must_use]
    pub fn shape_indices(&self) -> &[u32] {
        &self.shape_indices
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shape_indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape_indices.is_empty()
    }

    #[must_use]
    pub fn indirect_buffer(&self) -> &CpuBuffer<DrawIndirectCommand> {
        &self.indirect
    }
}

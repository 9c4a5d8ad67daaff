use bytemuck::{Pod, Zeroable};

/// One drawable object, as read by the vertex stage.
///
/// `transform_index` is the owning scene node; its world transform is packed
/// into the transform buffer at this shape's position every frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawableShape {
    pub mesh_index: u32,
    pub material_index: u32,
    pub lod: u32,
    pub index_offset: u32,
    pub vertex_offset: u32,
    pub transform_index: u32,
}

/// Non-indexed indirect draw arguments.
///
/// Same layout as `wgpu::util::DrawIndirectArgs`. `first_instance` carries the
/// shape index so the shader can recover which shape produced a draw.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndirectCommand {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

//! Mesh and material tables consumed by the draw-batch assembler.
//!
//! Geometry import and material authoring happen elsewhere; this module only
//! describes what the assembler needs to know about them.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

/// Maximum number of LODs per mesh.
pub const MAX_LODS: usize = 8;

/// Index/vertex ranges of one mesh inside the shared geometry buffers.
///
/// `lod_offsets` holds `lod_count + 1` prefix offsets into the index buffer
/// (relative to `index_offset`), so LOD `i` spans
/// `lod_offsets[i]..lod_offsets[i + 1]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct MeshRecord {
    pub index_offset: u32,
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub lod_count: u32,
    pub lod_offsets: [u32; MAX_LODS + 1],
}

impl MeshRecord {
    /// Builds a record from per-LOD index counts, finest LOD first.
    ///
    /// Prefix offsets saturate at `u32::MAX`, so LODs past that point report
    /// the remaining count, possibly 0.
    ///
    /// # Panics
    /// Panics if more than [`MAX_LODS`] LODs are given.
    #[must_use]
    pub fn new(index_offset: u32, vertex_offset: u32, vertex_count: u32, lod_index_counts: &[u32]) -> Self {
        assert!(
            lod_index_counts.len() <= MAX_LODS,
            "MeshRecord: {} LODs exceed the maximum of {MAX_LODS}",
            lod_index_counts.len()
        );
        let mut lod_offsets = [0u32; MAX_LODS + 1];
        for (i, count) in lod_index_counts.iter().enumerate() {
            lod_offsets[i + 1] = lod_offsets[i].saturating_add(*count);
        }
        Self {
            index_offset,
            vertex_offset,
            vertex_count,
            lod_count: lod_index_counts.len() as u32,
            lod_offsets,
        }
    }

    /// Number of indices in `lod`, or `None` if the mesh has no such LOD.
    #[inline]
    #[must_use]
    pub fn lod_index_count(&self, lod: u32) -> Option<u32> {
        if lod >= self.lod_count {
            return None;
        }
        let lod = lod as usize;
        Some(self.lod_offsets[lod + 1].saturating_sub(self.lod_offsets[lod]))
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MaterialFlags: u32 {
        const CAST_SHADOW    = 1 << 0;
        const RECEIVE_SHADOW = 1 << 1;
        const TRANSPARENT    = 1 << 2;
    }
}

/// The part of a material description the assembler cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialRecord {
    pub flags: MaterialFlags,
}

impl MaterialRecord {
    #[must_use]
    pub fn new(flags: MaterialFlags) -> Self {
        Self { flags }
    }

    #[inline]
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.flags.contains(MaterialFlags::TRANSPARENT)
    }
}

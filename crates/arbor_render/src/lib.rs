//! Draw-batch assembly for scenes built with `arbor_scene`.
//!
//! CPU side only. Every buffer here is a [`CpuBuffer`] mirror; the caller
//! owns the `wgpu` device and uploads the mirrors when their version changed.

pub mod buffer;
pub mod mesh;
pub mod multi_renderer;
pub mod settings;
pub mod shape;

pub use buffer::{BufferWriteGuard, CpuBuffer};
pub use mesh::{MAX_LODS, MaterialFlags, MaterialRecord, MeshRecord};
pub use multi_renderer::{DrawBatch, MultiRenderer};
pub use settings::{DrawBatchSettings, MissingMaterialPolicy};
pub use shape::{DrawIndirectCommand, DrawableShape};

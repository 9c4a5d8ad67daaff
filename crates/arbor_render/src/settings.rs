//! Draw-batch configuration.
//!
//! ```rust,ignore
//! use arbor_render::{DrawBatchSettings, MissingMaterialPolicy};
//!
//! // Default: nodes with a mesh but no material are skipped with a warning.
//! let settings = DrawBatchSettings::default();
//!
//! // Draw them with material 0 instead.
//! let settings = DrawBatchSettings {
//!     missing_material: MissingMaterialPolicy::Fallback(0),
//!     ..Default::default()
//! };
//! ```

/// What to do with a node that owns a mesh but no material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingMaterialPolicy {
    /// Leave the node out of the shape list and log a warning.
    #[default]
    Skip,
    /// Draw the node with the given material index.
    Fallback(u32),
    /// Fail shape-list construction with `ArborError::MissingMaterial`.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawBatchSettings {
    pub missing_material: MissingMaterialPolicy,
    /// Prefix for buffer labels and log messages.
    pub label: &'static str,
}

impl Default for DrawBatchSettings {
    fn default() -> Self {
        Self {
            missing_material: MissingMaterialPolicy::Skip,
            label: "MultiRenderer",
        }
    }
}

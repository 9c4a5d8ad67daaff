//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`ArborError`] covers the recoverable failure modes:
//! - Scene file I/O and truncated or corrupt scene data
//! - Mismatched inputs when merging scene graphs
//! - Draw-batch assembly against mesh/material tables that do not match the scene
//!
//! Structural precondition violations at mutating call sites (an out-of-range
//! parent passed to `add_node`, a node index past the end of the scene) are
//! not represented here. Those are programming errors and panic immediately.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, ArborError>`.
//!
//! ```rust,ignore
//! use arbor_core::errors::{ArborError, Result};
//!
//! fn load() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the Arbor engine.
#[derive(Error, Debug)]
pub enum ArborError {
    // ========================================================================
    // I/O & Scene File Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The scene file ended inside a mandatory section.
    #[error("Scene data truncated while reading {section}")]
    TruncatedScene {
        /// Name of the section being read when the data ran out
        section: &'static str,
    },

    /// The hierarchy arrays violate a structural invariant.
    #[error("Invalid hierarchy at node {node}: {reason}")]
    InvalidHierarchy {
        /// The first offending node
        node: usize,
        /// Human readable description of the violation
        reason: String,
    },

    // ========================================================================
    // Scene Graph Mutation Errors
    // ========================================================================
    /// Per-scene merge inputs do not line up with the number of scenes.
    #[error("Merge input mismatch: {what} has {got} entries, expected {expected}")]
    MergeInputMismatch {
        /// Which input was wrong
        what: &'static str,
        /// Number of scenes being merged
        expected: usize,
        /// Number of entries supplied
        got: usize,
    },

    // ========================================================================
    // Draw-Batch Errors
    // ========================================================================
    /// A node references a mesh that the mesh table does not contain.
    #[error("Mesh index {mesh} on node {node} is out of bounds (mesh count: {count})")]
    MeshOutOfBounds {
        /// Owning node
        node: usize,
        /// Referenced mesh
        mesh: u32,
        /// Size of the mesh table
        count: usize,
    },

    /// A shape selects an LOD its mesh does not have.
    #[error("LOD {lod} is out of bounds for mesh {mesh} (LOD count: {count})")]
    LodOutOfBounds {
        /// Mesh index
        mesh: u32,
        /// Requested LOD
        lod: u32,
        /// Number of LODs in the mesh
        count: u32,
    },

    /// A node owns a mesh but no material.
    #[error("Node {node} has a mesh but no material")]
    MissingMaterial {
        /// Offending node
        node: usize,
    },

    /// A shape references a material that the material table does not contain.
    #[error("Material index {material} on shape {shape} is out of bounds (material count: {count})")]
    MaterialOutOfBounds {
        /// Shape position in the shape list
        shape: usize,
        /// Referenced material
        material: u32,
        /// Size of the material table
        count: usize,
    },

    /// Shape subset references a shape that does not exist.
    #[error("Shape index {index} is out of bounds (shape count: {count})")]
    ShapeOutOfBounds {
        /// The invalid shape index
        index: usize,
        /// Number of shapes
        count: usize,
    },

    /// A draw batch outlived the shape list it indexes.
    #[error("Draw batch built for shape list {built}, renderer is at {current}")]
    StaleDrawBatch {
        /// Shape-list generation the batch was built against
        built: u64,
        /// Current shape-list generation of the renderer
        current: u64,
    },

    /// The visibility mask does not cover every draw command.
    #[error("Visibility mask has {got} entries, expected {expected}")]
    VisibilityMaskLength {
        /// Number of draw commands
        expected: usize,
        /// Length of the supplied mask
        got: usize,
    },
}

/// Alias for `Result<T, ArborError>`.
pub type Result<T> = std::result::Result<T, ArborError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        fn open() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(ArborError::IoError(_))));
    }

    #[test]
    fn messages_carry_context() {
        let err = ArborError::TruncatedScene { section: "hierarchy" };
        assert_eq!(err.to_string(), "Scene data truncated while reading hierarchy");

        let err = ArborError::VisibilityMaskLength { expected: 3, got: 2 };
        assert!(err.to_string().contains("expected 3"));
    }
}

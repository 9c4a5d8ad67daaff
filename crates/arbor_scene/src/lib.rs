//! 场景图系统
//!
//! Flat-array scene graph:
//! - [`Hierarchy`]: pointer-free parent / first-child / next-sibling links
//! - [`Scene`]: hierarchy, local/world transforms and sparse components
//! - [`transform_system`]: per-level dirty tracking and propagation
//! - [`merge`] / [`delete`]: bulk structural edits that keep all arrays in sync
//! - [`io`]: the binary scene file format
//! - [`dot`]: Graphviz export

pub mod delete;
pub mod dot;
pub mod hierarchy;
pub mod io;
pub mod merge;
pub mod scene;
pub mod transform_system;

pub use delete::delete_scene_nodes;
pub use dot::dump_scene_to_dot;
pub use hierarchy::{Children, Hierarchy};
pub use io::{load_scene, read_scene, save_scene, write_scene};
pub use merge::{MERGED_ROOT_NAME, MergeOptions, merge_scenes};
pub use scene::Scene;
pub use transform_system::DirtyLevels;

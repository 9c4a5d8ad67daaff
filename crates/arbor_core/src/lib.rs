//! Core types shared by every Arbor crate.

pub mod errors;
pub mod index;

pub use errors::{ArborError, Result};
pub use index::{NO_NODE, index_to_link, link_to_index};

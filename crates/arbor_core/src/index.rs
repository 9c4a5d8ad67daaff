//! Flat index helpers.
//!
//! Every relation in the scene graph is an `i32` index into a shared array,
//! with [`NO_NODE`] standing for "none". These helpers convert between that
//! storage form and the `Option<usize>` form used by the public API.

/// Sentinel stored in hierarchy links that do not point anywhere.
pub const NO_NODE: i32 = -1;

/// Converts a stored link into an optional array index.
#[inline]
#[must_use]
pub fn link_to_index(link: i32) -> Option<usize> {
    usize::try_from(link).ok()
}

/// Converts an optional array index into its stored link form.
///
/// # Panics
/// Panics if the index does not fit into an `i32` link.
#[inline]
#[must_use]
pub fn index_to_link(index: Option<usize>) -> i32 {
    match index {
        Some(i) => i32::try_from(i).expect("node index exceeds i32 link range"),
        None => NO_NODE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_round_trips() {
        assert_eq!(link_to_index(NO_NODE), None);
        assert_eq!(link_to_index(-7), None);
        assert_eq!(link_to_index(3), Some(3));
        assert_eq!(index_to_link(None), NO_NODE);
        assert_eq!(index_to_link(Some(12)), 12);
    }
}

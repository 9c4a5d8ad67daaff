use arbor_core::{NO_NODE, index_to_link, link_to_index};
use bytemuck::{Pod, Zeroable};

/// One entry of the flat hierarchy array.
///
/// A node is identified solely by its position in the array. All relations are
/// `i32` indices into the same array, with [`NO_NODE`] meaning "none". The
/// record is plain old data so the array can be written to disk verbatim.
///
/// `last_sibling` is an append cache kept on the first child of a parent. It is
/// only ever trusted after checking it still points at the tail of the list.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Hierarchy {
    pub parent: i32,
    pub first_child: i32,
    pub next_sibling: i32,
    pub last_sibling: i32,
    pub level: i32,
}

impl Hierarchy {
    /// Creates an unlinked entry with the given parent and depth.
    #[must_use]
    pub fn new(parent: Option<usize>, level: usize) -> Self {
        Self {
            parent: index_to_link(parent),
            first_child: NO_NODE,
            next_sibling: NO_NODE,
            last_sibling: NO_NODE,
            level: i32::try_from(level).expect("node level exceeds i32 range"),
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<usize> {
        link_to_index(self.parent)
    }

    #[inline]
    #[must_use]
    pub fn first_child(&self) -> Option<usize> {
        link_to_index(self.first_child)
    }

    #[inline]
    #[must_use]
    pub fn next_sibling(&self) -> Option<usize> {
        link_to_index(self.next_sibling)
    }

    #[inline]
    #[must_use]
    pub fn last_sibling(&self) -> Option<usize> {
        link_to_index(self.last_sibling)
    }

    /// Depth from the root, 0 for roots.
    #[inline]
    #[must_use]
    pub fn level(&self) -> usize {
        usize::try_from(self.level).unwrap_or(0)
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent == NO_NODE
    }

    /// Offsets every valid link by `amount`, leaving "none" links untouched.
    #[must_use]
    pub(crate) fn shifted(mut self, amount: usize) -> Self {
        let amount = i32::try_from(amount).expect("node offset exceeds i32 range");
        for link in [
            &mut self.parent,
            &mut self.first_child,
            &mut self.next_sibling,
            &mut self.last_sibling,
        ] {
            if *link > NO_NODE {
                *link += amount;
            }
        }
        self
    }
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new(None, 0)
    }
}

/// Iterator over the direct children of a node, following the
/// `first_child` / `next_sibling` chain.
#[derive(Debug, Clone)]
pub struct Children<'a> {
    hierarchy: &'a [Hierarchy],
    next: Option<usize>,
}

impl<'a> Children<'a> {
    pub(crate) fn new(hierarchy: &'a [Hierarchy], node: usize) -> Self {
        Self {
            hierarchy,
            next: hierarchy[node].first_child(),
        }
    }
}

impl Iterator for Children<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = self.hierarchy.get(current).and_then(Hierarchy::next_sibling);
        Some(current)
    }
}

//! 变换系统 (Transform System)
//!
//! Incremental world-transform propagation over the flat hierarchy.
//!
//! Edited nodes are queued, together with their whole subtree, into one bucket
//! per tree depth. Propagation then walks the buckets in increasing depth so a
//! parent's world matrix is always final before any of its children read it:
//!
//! ```text
//! level 0:  world = local
//! level L:  world = world[parent] * local      (L = 1, 2, ...)
//! ```
//!
//! The cost is proportional to the number of queued nodes, not to the size of
//! the scene. The bucket list grows on demand, so there is no maximum depth.

use smallvec::SmallVec;

use crate::scene::Scene;

/// Per-level worklists of nodes whose world transform is stale.
///
/// A node is queued at most once between two propagations.
#[derive(Debug, Clone, Default)]
pub struct DirtyLevels {
    levels: SmallVec<[Vec<u32>; 16]>,
    queued: Vec<bool>,
}

impl DirtyLevels {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `node` at `level`. Returns `false` if it was already queued.
    pub fn push(&mut self, node: usize, level: usize) -> bool {
        if node >= self.queued.len() {
            self.queued.resize(node + 1, false);
        }
        if std::mem::replace(&mut self.queued[node], true) {
            return false;
        }
        if level >= self.levels.len() {
            self.levels.resize_with(level + 1, Vec::new);
        }
        self.levels[level].push(node as u32);
        true
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(Vec::is_empty)
    }

    /// Total number of queued nodes.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// Number of depth buckets allocated so far.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Queued nodes at `level`.
    #[must_use]
    pub fn level(&self, level: usize) -> &[u32] {
        self.levels.get(level).map_or(&[], Vec::as_slice)
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.levels {
            bucket.clear();
        }
        self.queued.fill(false);
    }

    /// Rewrites queued node indices through an old → new mapping, dropping
    /// nodes that no longer exist.
    pub(crate) fn remap(&mut self, new_index: &[Option<usize>], new_len: usize) {
        for bucket in &mut self.levels {
            bucket.retain_mut(|node| match new_index.get(*node as usize).copied().flatten() {
                Some(n) => {
                    *node = n as u32;
                    true
                }
                None => false,
            });
        }
        self.queued = vec![false; new_len];
        for bucket in &self.levels {
            for &node in bucket {
                self.queued[node as usize] = true;
            }
        }
    }
}

impl Scene {
    /// Queues `node` and every descendant for world-transform recomputation.
    ///
    /// Must be called after editing a local transform. Marking node 0 of a
    /// single-rooted scene forces a full recompute.
    ///
    /// # Panics
    /// Panics if `node` is out of bounds.
    pub fn mark_as_changed(&mut self, node: usize) {
        assert!(
            node < self.len(),
            "mark_as_changed: node {node} out of bounds (node count {})",
            self.len()
        );

        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            self.dirty.push(current, self.hierarchy[current].level());
            stack.extend(self.children(current));
        }
    }

    /// Queues every root, and through them the whole scene.
    pub fn mark_all_changed(&mut self) {
        let roots: Vec<usize> = self.roots().collect();
        for root in roots {
            self.mark_as_changed(root);
        }
    }

    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    #[must_use]
    pub fn dirty_levels(&self) -> &DirtyLevels {
        &self.dirty
    }

    /// Recomputes world transforms of every queued node, level by level.
    ///
    /// Returns the number of recomputed nodes. With nothing queued this is a
    /// no-op returning 0.
    pub fn recalculate_global_transforms(&mut self) -> usize {
        let mut updated = 0;

        for level in 0..self.dirty.levels.len() {
            let mut bucket = std::mem::take(&mut self.dirty.levels[level]);

            for &node in &bucket {
                let node = node as usize;
                let local = self.local_transform[node];
                self.global_transform[node] = match self.hierarchy[node].parent() {
                    Some(parent) if level > 0 => self.global_transform[parent] * local,
                    _ => local,
                };
                self.dirty.queued[node] = false;
            }

            updated += bucket.len();
            bucket.clear();
            self.dirty.levels[level] = bucket;
        }

        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    #[test]
    fn push_deduplicates() {
        let mut dirty = DirtyLevels::new();
        assert!(dirty.push(3, 1));
        assert!(!dirty.push(3, 1));
        assert_eq!(dirty.pending(), 1);
        assert_eq!(dirty.level(1), &[3]);
    }

    #[test]
    fn buckets_grow_past_sixteen_levels() {
        let mut scene = Scene::new();
        let mut parent = scene.add_node(None, 0);
        for level in 1..40 {
            parent = scene.add_node(Some(parent), level);
            scene.set_local_transform(parent, Mat4::from_translation(Vec3::X));
        }
        scene.mark_as_changed(0);
        assert_eq!(scene.recalculate_global_transforms(), 40);
        let world = scene.global_transform(parent).w_axis.truncate();
        assert!((world.x - 39.0).abs() < 1e-4);
        assert!(scene.dirty_levels().depth() >= 40);
    }

    #[test]
    fn recalculate_without_changes_is_noop() {
        let mut scene = Scene::new();
        scene.add_node(None, 0);
        assert_eq!(scene.recalculate_global_transforms(), 0);
        assert!(!scene.has_pending_changes());
    }

    #[test]
    fn remap_drops_removed_nodes() {
        let mut dirty = DirtyLevels::new();
        dirty.push(0, 0);
        dirty.push(2, 1);
        dirty.push(3, 1);
        dirty.remap(&[Some(0), None, None, Some(1)], 2);
        assert_eq!(dirty.level(0), &[0]);
        assert_eq!(dirty.level(1), &[1]);
        assert!(!dirty.push(1, 1));
    }
}

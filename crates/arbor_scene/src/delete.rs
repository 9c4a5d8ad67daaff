//! Batch node deletion with full index compaction.
//!
//! Deleting renumbers every surviving node, so all co-indexed storage
//! (hierarchy, both transform arrays, component maps, pending dirty entries)
//! is rewritten through one old → new mapping.

use rustc_hash::FxHashMap;

use arbor_core::{NO_NODE, index_to_link};

use crate::hierarchy::Hierarchy;
use crate::scene::Scene;

/// Removes the entries of `items` whose flag in `doomed` is set, keeping the
/// relative order of the rest.
fn erase_selected<T>(items: &mut Vec<T>, doomed: &[bool]) {
    let mut i = 0;
    items.retain(|_| {
        let keep = !doomed[i];
        i += 1;
        keep
    });
}

fn remap_keys(map: &mut FxHashMap<u32, u32>, new_index: &[Option<usize>]) {
    *map = map
        .drain()
        .filter_map(|(k, v)| {
            let k = new_index.get(k as usize).copied().flatten()?;
            Some((k as u32, v))
        })
        .collect();
}

impl Scene {
    /// Deletes `nodes` together with all their descendants.
    ///
    /// Survivors keep their relative order and are renumbered densely. Sibling
    /// lists stay connected across removed siblings. Name tables are left as
    /// they are, so names of deleted nodes remain as unused entries.
    ///
    /// Returns the number of removed nodes.
    ///
    /// # Panics
    /// Panics if any index is out of bounds.
    pub fn delete_nodes(&mut self, nodes: &[usize]) -> usize {
        let count = self.len();

        // 1. Expand to whole subtrees.
        let mut doomed = vec![false; count];
        let mut stack: Vec<usize> = Vec::with_capacity(nodes.len());
        for &node in nodes {
            assert!(node < count, "delete_nodes: node {node} out of bounds (node count {count})");
            stack.push(node);
        }
        while let Some(node) = stack.pop() {
            if std::mem::replace(&mut doomed[node], true) {
                continue;
            }
            stack.extend(self.children(node));
        }

        // 2. old -> new mapping.
        let mut new_index = vec![None; count];
        let mut survivors = 0;
        for (old, slot) in new_index.iter_mut().enumerate() {
            if !doomed[old] {
                *slot = Some(survivors);
                survivors += 1;
            }
        }
        let removed = count - survivors;
        if removed == 0 {
            return 0;
        }

        // 3. Rewrite links. A link to a removed node follows that node's
        //    sibling chain to the first survivor.
        let old = &self.hierarchy;
        let first_surviving = |link: i32| -> i32 {
            let mut current = arbor_core::link_to_index(link);
            while let Some(node) = current {
                if let Some(n) = new_index[node] {
                    return index_to_link(Some(n));
                }
                current = old[node].next_sibling();
            }
            NO_NODE
        };

        // 4. Drop removed entries.
        let hierarchy: Vec<Hierarchy> = old
            .iter()
            .zip(&doomed)
            .filter(|&(_, &d)| !d)
            .map(|(h, _)| Hierarchy {
                parent: h.parent().map_or(NO_NODE, |p| index_to_link(new_index[p])),
                first_child: first_surviving(h.first_child),
                next_sibling: first_surviving(h.next_sibling),
                last_sibling: first_surviving(h.last_sibling),
                level: h.level,
            })
            .collect();
        self.hierarchy = hierarchy;

        erase_selected(&mut self.local_transform, &doomed);
        erase_selected(&mut self.global_transform, &doomed);

        // 5. Components.
        remap_keys(&mut self.meshes, &new_index);
        remap_keys(&mut self.material_for_node, &new_index);
        remap_keys(&mut self.name_for_node, &new_index);

        self.dirty.remap(&new_index, survivors);

        log::debug!("Deleted {removed} nodes, {survivors} remain");
        removed
    }
}

/// Free-function form of [`Scene::delete_nodes`].
pub fn delete_scene_nodes(scene: &mut Scene, nodes_to_delete: &[usize]) -> usize {
    scene.delete_nodes(nodes_to_delete)
}

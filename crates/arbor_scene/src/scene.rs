use glam::Mat4;
use rustc_hash::FxHashMap;

use arbor_core::errors::{ArborError, Result};
use arbor_core::index_to_link;

use crate::hierarchy::{Children, Hierarchy};
use crate::transform_system::DirtyLevels;

/// Flat-array scene graph.
///
/// Scene 是纯数据层：层级、变换和稀疏组件都按节点索引存放在平行数组里，
/// 节点之间不持有任何指针。
///
/// - `hierarchy[n]`, `local_transform[n]` and `global_transform[n]` always have
///   the same length; an entry is created by [`Scene::add_node`] and only ever
///   removed by bulk deletion, which compacts every array at once.
/// - Mesh, material and name components live in sparse maps keyed by node
///   index, so nodes without components cost nothing.
/// - World transforms are restored lazily: edit a local transform, call
///   [`Scene::mark_as_changed`], then [`Scene::recalculate_global_transforms`].
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub(crate) local_transform: Vec<Mat4>,
    pub(crate) global_transform: Vec<Mat4>,
    pub(crate) hierarchy: Vec<Hierarchy>,

    // ==== 组件 (node index -> value) ====
    pub(crate) meshes: FxHashMap<u32, u32>,
    pub(crate) material_for_node: FxHashMap<u32, u32>,
    pub(crate) name_for_node: FxHashMap<u32, u32>,

    pub(crate) names: Vec<String>,
    pub(crate) material_names: Vec<String>,

    pub(crate) dirty: DirtyLevels,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.hierarchy.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hierarchy.is_empty()
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Appends a node and links it as the last child of `parent`.
    ///
    /// The new node gets identity local and world transforms. Roots must be
    /// created with level 0 and children with `parent.level + 1`.
    ///
    /// # Panics
    /// Panics if `parent` is out of bounds or `level` is inconsistent with it.
    pub fn add_node(&mut self, parent: Option<usize>, level: usize) -> usize {
        let node = self.hierarchy.len();
        match parent {
            Some(p) => {
                assert!(p < node, "add_node: parent {p} out of bounds (node count {node})");
                let parent_level = self.hierarchy[p].level();
                assert_eq!(
                    level,
                    parent_level + 1,
                    "add_node: child of node {p} must be at level {}",
                    parent_level + 1
                );
            }
            None => assert_eq!(level, 0, "add_node: root nodes must be at level 0"),
        }

        self.local_transform.push(Mat4::IDENTITY);
        self.global_transform.push(Mat4::IDENTITY);
        self.hierarchy.push(Hierarchy::new(parent, level));

        if let Some(p) = parent {
            let link = index_to_link(Some(node));
            match self.hierarchy[p].first_child() {
                None => {
                    self.hierarchy[p].first_child = link;
                    self.hierarchy[node].last_sibling = link;
                }
                Some(first) => {
                    let tail = self
                        .cached_tail(first, p)
                        .unwrap_or_else(|| self.children(p).last().unwrap_or(first));
                    self.hierarchy[tail].next_sibling = link;
                    self.hierarchy[first].last_sibling = link;
                    self.hierarchy[node].last_sibling = link;
                }
            }
        }

        node
    }

    /// Returns the cached tail of a child list if the cache is still accurate.
    fn cached_tail(&self, first: usize, parent: usize) -> Option<usize> {
        let cached = self.hierarchy[first].last_sibling()?;
        let h = self.hierarchy.get(cached)?;
        (h.parent() == Some(parent) && h.next_sibling().is_none()).then_some(cached)
    }

    /// # Panics
    /// Panics if `node` is out of bounds.
    #[inline]
    #[must_use]
    pub fn hierarchy(&self, node: usize) -> &Hierarchy {
        &self.hierarchy[node]
    }

    #[inline]
    #[must_use]
    pub fn hierarchy_entries(&self) -> &[Hierarchy] {
        &self.hierarchy
    }

    #[inline]
    #[must_use]
    pub fn parent(&self, node: usize) -> Option<usize> {
        self.hierarchy[node].parent()
    }

    /// Direct children of `node` in link order.
    #[must_use]
    pub fn children(&self, node: usize) -> Children<'_> {
        Children::new(&self.hierarchy, node)
    }

    /// All nodes without a parent, in index order.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.hierarchy
            .iter()
            .enumerate()
            .filter(|(_, h)| h.is_root())
            .map(|(i, _)| i)
    }

    /// Depth of `node`, measured by walking parent links up to a root.
    ///
    /// # Panics
    /// Panics if the parent chain is cyclic.
    #[must_use]
    pub fn node_level(&self, node: usize) -> usize {
        let mut level = 0;
        let mut current = self.hierarchy[node].parent();
        while let Some(p) = current {
            level += 1;
            assert!(level <= self.len(), "node_level: cyclic parent chain at node {node}");
            current = self.hierarchy[p].parent();
        }
        level
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn local_transform(&self, node: usize) -> &Mat4 {
        &self.local_transform[node]
    }

    /// Raw access to a local transform. Call [`Scene::mark_as_changed`]
    /// afterwards, or use [`Scene::set_local_transform`].
    #[inline]
    pub fn local_transform_mut(&mut self, node: usize) -> &mut Mat4 {
        &mut self.local_transform[node]
    }

    /// Replaces a local transform and schedules its subtree for propagation.
    pub fn set_local_transform(&mut self, node: usize, transform: Mat4) {
        self.local_transform[node] = transform;
        self.mark_as_changed(node);
    }

    #[inline]
    #[must_use]
    pub fn global_transform(&self, node: usize) -> &Mat4 {
        &self.global_transform[node]
    }

    #[inline]
    #[must_use]
    pub fn local_transforms(&self) -> &[Mat4] {
        &self.local_transform
    }

    #[inline]
    #[must_use]
    pub fn global_transforms(&self) -> &[Mat4] {
        &self.global_transform
    }

    // ========================================================================
    // 组件 API
    // ========================================================================

    /// Assigns a mesh to `node`.
    pub fn set_mesh(&mut self, node: usize, mesh: u32) {
        assert!(node < self.len(), "set_mesh: node {node} out of bounds");
        self.meshes.insert(node as u32, mesh);
    }

    #[must_use]
    pub fn mesh(&self, node: usize) -> Option<u32> {
        self.meshes.get(&(node as u32)).copied()
    }

    /// Assigns a material to `node`.
    pub fn set_material(&mut self, node: usize, material: u32) {
        assert!(node < self.len(), "set_material: node {node} out of bounds");
        self.material_for_node.insert(node as u32, material);
    }

    #[must_use]
    pub fn material(&self, node: usize) -> Option<u32> {
        self.material_for_node.get(&(node as u32)).copied()
    }

    /// Node → mesh map, read-only.
    #[inline]
    #[must_use]
    pub fn meshes(&self) -> &FxHashMap<u32, u32> {
        &self.meshes
    }

    /// Node → material map, read-only.
    #[inline]
    #[must_use]
    pub fn materials(&self) -> &FxHashMap<u32, u32> {
        &self.material_for_node
    }

    /// Node → name-table index map, read-only.
    #[inline]
    #[must_use]
    pub fn name_map(&self) -> &FxHashMap<u32, u32> {
        &self.name_for_node
    }

    // ========================================================================
    // Names
    // ========================================================================

    /// Appends `name` to the name table and assigns it to `node`.
    pub fn set_node_name(&mut self, node: usize, name: &str) {
        assert!(node < self.len(), "set_node_name: node {node} out of bounds");
        let index = self.names.len() as u32;
        self.names.push(name.to_owned());
        self.name_for_node.insert(node as u32, index);
    }

    /// Display name of `node`, or `""` when it has none.
    #[must_use]
    pub fn node_name(&self, node: usize) -> &str {
        self.name_for_node
            .get(&(node as u32))
            .and_then(|&i| self.names.get(i as usize))
            .map_or("", String::as_str)
    }

    /// First node (in index order) whose name equals `name`.
    ///
    /// A plain linear scan, no lookup index is maintained.
    #[must_use]
    pub fn find_node_by_name(&self, name: &str) -> Option<usize> {
        (0..self.len()).find(|&node| {
            self.name_for_node
                .get(&(node as u32))
                .and_then(|&i| self.names.get(i as usize))
                .is_some_and(|n| n == name)
        })
    }

    #[inline]
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[inline]
    #[must_use]
    pub fn material_names(&self) -> &[String] {
        &self.material_names
    }

    /// Appends a material name and returns its index.
    pub fn add_material_name(&mut self, name: &str) -> u32 {
        self.material_names.push(name.to_owned());
        (self.material_names.len() - 1) as u32
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Checks every structural invariant of the hierarchy arrays.
    ///
    /// Used on data coming from outside (scene files). Scenes built through
    /// [`Scene::add_node`] always pass.
    pub fn validate(&self) -> Result<()> {
        let count = self.len();
        let invalid = |node: usize, reason: String| ArborError::InvalidHierarchy { node, reason };

        if self.local_transform.len() != count || self.global_transform.len() != count {
            return Err(invalid(0, "transform arrays do not match node count".into()));
        }

        for (node, h) in self.hierarchy.iter().enumerate() {
            for (what, link) in [
                ("parent", h.parent),
                ("first_child", h.first_child),
                ("next_sibling", h.next_sibling),
                ("last_sibling", h.last_sibling),
            ] {
                if link < -1 || link >= count as i32 {
                    return Err(invalid(node, format!("{what} link {link} out of range")));
                }
            }
            if h.level < 0 {
                return Err(invalid(node, format!("negative level {}", h.level)));
            }

            match h.parent() {
                None if h.level != 0 => {
                    return Err(invalid(node, format!("root at level {}", h.level)));
                }
                Some(p) if self.hierarchy[p].level + 1 != h.level => {
                    return Err(invalid(
                        node,
                        format!("level {} under parent {p} at level {}", h.level, self.hierarchy[p].level),
                    ));
                }
                _ => {}
            }
        }

        // Every non-root node must appear exactly once in its parent's child list.
        let mut seen = vec![false; count];
        for parent in 0..count {
            let mut steps = 0;
            for child in self.children(parent) {
                steps += 1;
                if steps > count {
                    return Err(invalid(parent, "cyclic sibling chain".into()));
                }
                if self.hierarchy[child].parent() != Some(parent) {
                    return Err(invalid(child, format!("listed under {parent} but parent differs")));
                }
                if std::mem::replace(&mut seen[child], true) {
                    return Err(invalid(child, "listed twice among siblings".into()));
                }
            }
        }
        if let Some(orphan) = (0..count).find(|&n| !self.hierarchy[n].is_root() && !seen[n]) {
            return Err(invalid(orphan, "unreachable from its parent".into()));
        }

        for (what, map) in [
            ("mesh", &self.meshes),
            ("material", &self.material_for_node),
            ("name", &self.name_for_node),
        ] {
            if let Some(&key) = map.keys().find(|&&k| k as usize >= count) {
                return Err(invalid(key as usize, format!("{what} component on missing node")));
            }
        }
        if let Some((&node, _)) = self
            .name_for_node
            .iter()
            .find(|&(_, &i)| i as usize >= self.names.len())
        {
            return Err(invalid(node as usize, "name index past the name table".into()));
        }

        Ok(())
    }
}

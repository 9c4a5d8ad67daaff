//! Graphviz export of the hierarchy, for debugging scene conversions.

use std::io::Write;

use arbor_core::errors::Result;

use crate::scene::Scene;

/// Writes the hierarchy of `scene` as a Graphviz `digraph`.
///
/// Each node is labelled with its name (or its index when unnamed) and edges
/// point from parent to child. Nodes listed in `highlighted` are drawn filled.
pub fn dump_scene_to_dot(scene: &Scene, out: &mut impl Write, highlighted: &[usize]) -> Result<()> {
    writeln!(out, "digraph G\n{{")?;
    for node in 0..scene.len() {
        let name = scene.node_name(node);
        let label = if name.is_empty() {
            format!("node {node}")
        } else {
            name.replace('"', "\\\"")
        };
        let style = if highlighted.contains(&node) {
            ", style=filled, fillcolor=\"#e0a030\""
        } else {
            ""
        };
        writeln!(out, "  n{node} [label=\"{label}\"{style}]")?;
    }
    for node in 0..scene.len() {
        if let Some(parent) = scene.parent(node) {
            writeln!(out, "  n{parent} -> n{node}")?;
        }
    }
    writeln!(out, "}}")?;
    Ok(())
}

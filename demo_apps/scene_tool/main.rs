//! Scene file utility.
//!
//! ```text
//! scene_tool info   <scene>
//! scene_tool merge  <out> <scene>...
//! scene_tool delete <scene> <out> <node or name>...
//! scene_tool dot    <scene> <out.dot> [node or name]...
//! scene_tool sample <out>
//! ```
//!
//! Set `RUST_LOG=debug` for merge/delete statistics.

use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, bail};
use arbor::{MergeOptions, Scene, dump_scene_to_dot, load_scene, merge_scenes, save_scene, scene_from_parents};
use glam::{Mat4, Vec3};

const USAGE: &str = "usage: scene_tool <info|merge|delete|dot|sample> ...";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!(USAGE);
    };

    match (command.as_str(), rest) {
        ("info", [path]) => info(path),
        ("merge", [out, inputs @ ..]) if !inputs.is_empty() => merge(out, inputs),
        ("delete", [input, out, nodes @ ..]) => delete(input, out, nodes),
        ("dot", [input, out, nodes @ ..]) => dot(input, out, nodes),
        ("sample", [out]) => sample(out),
        _ => bail!(USAGE),
    }
}

fn load(path: &str) -> anyhow::Result<Scene> {
    load_scene(path).with_context(|| format!("failed to load {path}"))
}

/// Resolves each argument as a node index, falling back to a name lookup.
fn resolve_nodes(scene: &Scene, args: &[String]) -> anyhow::Result<Vec<usize>> {
    args.iter()
        .map(|arg| {
            let node = match arg.parse::<usize>() {
                Ok(index) => Some(index).filter(|&i| i < scene.len()),
                Err(_) => scene.find_node_by_name(arg),
            };
            node.with_context(|| format!("no node '{arg}'"))
        })
        .collect()
}

fn info(path: &str) -> anyhow::Result<()> {
    let scene = load(path)?;

    let mut per_level: Vec<usize> = Vec::new();
    for h in scene.hierarchy_entries() {
        let level = h.level();
        if level >= per_level.len() {
            per_level.resize(level + 1, 0);
        }
        per_level[level] += 1;
    }

    println!("{path}");
    println!("  nodes:      {}", scene.len());
    println!("  roots:      {}", scene.roots().count());
    println!("  meshes:     {}", scene.meshes().len());
    println!("  materials:  {} ({} names)", scene.materials().len(), scene.material_names().len());
    println!("  names:      {}", scene.names().len());
    for (level, count) in per_level.iter().enumerate() {
        println!("  level {level:>3}: {count}");
    }
    Ok(())
}

fn merge(out: &str, inputs: &[String]) -> anyhow::Result<()> {
    let scenes = inputs.iter().map(|p| load(p)).collect::<anyhow::Result<Vec<_>>>()?;
    let refs: Vec<&Scene> = scenes.iter().collect();

    let mut merged = merge_scenes(&refs, &MergeOptions::default().with_merged_materials(true))?;
    merged.recalculate_global_transforms();
    save_scene(out, &merged)?;

    println!("merged {} scenes into {out} ({} nodes)", scenes.len(), merged.len());
    Ok(())
}

fn delete(input: &str, out: &str, args: &[String]) -> anyhow::Result<()> {
    let mut scene = load(input)?;
    let nodes = resolve_nodes(&scene, args)?;
    let removed = scene.delete_nodes(&nodes);
    save_scene(out, &scene)?;

    println!("removed {removed} nodes, {} remain", scene.len());
    Ok(())
}

fn dot(input: &str, out: &str, args: &[String]) -> anyhow::Result<()> {
    let scene = load(input)?;
    let highlighted = resolve_nodes(&scene, args)?;
    let mut writer = BufWriter::new(File::create(out).with_context(|| format!("failed to create {out}"))?);
    dump_scene_to_dot(&scene, &mut writer, &highlighted)?;
    log::info!("Wrote {out}");
    Ok(())
}

/// Writes a small articulated scene, useful for trying out the other commands.
fn sample(out: &str) -> anyhow::Result<()> {
    let mut scene = scene_from_parents(&[
        (None, "Body"),
        (Some(0), "Head"),
        (Some(0), "LeftArm"),
        (Some(2), "LeftHand"),
        (Some(0), "RightArm"),
        (Some(4), "RightHand"),
    ]);
    let offsets = [
        Vec3::ZERO,
        Vec3::new(0.0, 1.5, 0.0),
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
    ];
    let skin = scene.add_material_name("skin");
    for (node, offset) in offsets.into_iter().enumerate() {
        scene.set_local_transform(node, Mat4::from_translation(offset));
        scene.set_mesh(node, u32::from(node > 0));
        scene.set_material(node, skin);
    }
    scene.recalculate_global_transforms();
    save_scene(out, &scene)?;

    println!("wrote {out} ({} nodes)", scene.len());
    Ok(())
}

//! Binary scene files.
//!
//! The in-memory arrays are written verbatim, in native byte order:
//!
//! ```text
//! u32            node count N
//! Mat4[N]        local transforms
//! Mat4[N]        world transforms
//! Hierarchy[N]   5 x i32: parent, first_child, next_sibling, last_sibling, level
//! MapBlock       meshes
//! MapBlock       material for node
//! -- optional --
//! MapBlock       name for node
//! StringList     names
//! StringList     material names
//!
//! MapBlock:   u32 count, count x (u32 key, u32 value)
//! StringList: u32 count, per string u32 length + length+1 bytes (NUL terminated)
//! ```
//!
//! A file that ends exactly where the optional section begins is complete
//! (older files have no names). Ending anywhere else is a truncation error.
//!
//! Counts and lengths come from the file, so nothing is allocated for an
//! array before the bytes backing it have actually been read.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use bytemuck::Pod;
use rustc_hash::FxHashMap;

use arbor_core::errors::{ArborError, Result};

use crate::hierarchy::Hierarchy;
use crate::scene::Scene;

// ============================================================================
// Reading
// ============================================================================

fn read_section(reader: &mut impl Read, buf: &mut [u8], section: &'static str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => ArborError::TruncatedScene { section },
        _ => ArborError::IoError(e),
    })
}

/// Reads `count` plain-old-data values.
///
/// At most `count * size_of::<T>()` bytes are pulled from `reader`, growing the
/// buffer only as far as the input goes, so a corrupt count ends in
/// `TruncatedScene` instead of a huge allocation.
fn read_pod_vec<T: Pod>(reader: &mut impl Read, count: usize, section: &'static str) -> Result<Vec<T>> {
    let byte_len = (count as u64).saturating_mul(std::mem::size_of::<T>() as u64);
    let mut bytes = Vec::new();
    reader.by_ref().take(byte_len).read_to_end(&mut bytes)?;
    if (bytes.len() as u64) < byte_len {
        return Err(ArborError::TruncatedScene { section });
    }

    let mut values = vec![T::zeroed(); count];
    bytemuck::cast_slice_mut::<T, u8>(&mut values).copy_from_slice(&bytes);
    Ok(values)
}

fn read_u32(reader: &mut impl Read, section: &'static str) -> Result<u32> {
    let mut bytes = [0u8; 4];
    read_section(reader, &mut bytes, section)?;
    Ok(u32::from_ne_bytes(bytes))
}

/// Like [`read_u32`], but a clean end of input before the first byte is
/// reported as `None`.
fn read_u32_or_eof(reader: &mut impl Read, section: &'static str) -> Result<Option<u32>> {
    let mut bytes = [0u8; 4];
    let first = loop {
        match reader.read(&mut bytes) {
            Ok(n) => break n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    };
    if first == 0 {
        return Ok(None);
    }
    read_section(reader, &mut bytes[first..], section)?;
    Ok(Some(u32::from_ne_bytes(bytes)))
}

fn read_map_entries(reader: &mut impl Read, count: u32, section: &'static str) -> Result<FxHashMap<u32, u32>> {
    let pairs: Vec<[u32; 2]> = read_pod_vec(reader, count as usize, section)?;
    Ok(pairs.into_iter().map(|[k, v]| (k, v)).collect())
}

fn read_map(reader: &mut impl Read, section: &'static str) -> Result<FxHashMap<u32, u32>> {
    let count = read_u32(reader, section)?;
    read_map_entries(reader, count, section)
}

fn read_string_list(reader: &mut impl Read, section: &'static str) -> Result<Vec<String>> {
    let count = read_u32(reader, section)?;
    let mut strings = Vec::new();
    for _ in 0..count {
        let len = read_u32(reader, section)? as usize;
        let mut bytes: Vec<u8> = read_pod_vec(reader, len + 1, section)?;
        bytes.truncate(len);
        strings.push(String::from_utf8_lossy(&bytes).into_owned());
    }
    Ok(strings)
}

/// Reads a scene from any byte source.
///
/// The result is validated before it is returned, so a successful read always
/// yields a structurally sound scene.
pub fn read_scene(reader: &mut impl Read) -> Result<Scene> {
    let count = read_u32(reader, "node count")? as usize;

    let mut scene = Scene::new();
    scene.local_transform = read_pod_vec(reader, count, "local transforms")?;
    scene.global_transform = read_pod_vec(reader, count, "world transforms")?;
    scene.hierarchy = read_pod_vec::<Hierarchy>(reader, count, "hierarchy")?;

    scene.meshes = read_map(reader, "meshes")?;
    scene.material_for_node = read_map(reader, "materials")?;

    if let Some(name_count) = read_u32_or_eof(reader, "node names")? {
        scene.name_for_node = read_map_entries(reader, name_count, "node names")?;
        scene.names = read_string_list(reader, "name table")?;
        scene.material_names = read_string_list(reader, "material name table")?;
    }

    scene.validate()?;
    Ok(scene)
}

/// Loads a scene file.
pub fn load_scene(path: impl AsRef<Path>) -> Result<Scene> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let scene = read_scene(&mut reader)?;
    log::info!("Loaded scene {} ({} nodes, {} meshes)", path.display(), scene.len(), scene.meshes.len());
    Ok(scene)
}

// ============================================================================
// Writing
// ============================================================================

fn write_u32(writer: &mut impl Write, value: u32) -> Result<()> {
    writer.write_all(&value.to_ne_bytes())?;
    Ok(())
}

/// Map entries are written sorted by key so that saving is deterministic.
fn write_map(writer: &mut impl Write, map: &FxHashMap<u32, u32>) -> Result<()> {
    let mut pairs: Vec<[u32; 2]> = map.iter().map(|(&k, &v)| [k, v]).collect();
    pairs.sort_unstable();
    write_u32(writer, pairs.len() as u32)?;
    writer.write_all(bytemuck::cast_slice(&pairs))?;
    Ok(())
}

fn write_string_list(writer: &mut impl Write, strings: &[String]) -> Result<()> {
    write_u32(writer, strings.len() as u32)?;
    for s in strings {
        write_u32(writer, s.len() as u32)?;
        writer.write_all(s.as_bytes())?;
        writer.write_all(&[0])?;
    }
    Ok(())
}

/// Writes `scene` to any byte sink, including the optional name section.
pub fn write_scene(writer: &mut impl Write, scene: &Scene) -> Result<()> {
    write_u32(writer, scene.len() as u32)?;
    writer.write_all(bytemuck::cast_slice(&scene.local_transform))?;
    writer.write_all(bytemuck::cast_slice(&scene.global_transform))?;
    writer.write_all(bytemuck::cast_slice(&scene.hierarchy))?;

    write_map(writer, &scene.meshes)?;
    write_map(writer, &scene.material_for_node)?;

    write_map(writer, &scene.name_for_node)?;
    write_string_list(writer, &scene.names)?;
    write_string_list(writer, &scene.material_names)?;
    Ok(())
}

/// Saves a scene file.
pub fn save_scene(path: impl AsRef<Path>, scene: &Scene) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_scene(&mut writer, scene)?;
    writer.flush()?;
    log::info!("Saved scene {} ({} nodes)", path.display(), scene.len());
    Ok(())
}

//! Wavefront OBJ loading
//!
//! Supports `v`, `vt`, `vn`, `f` and `usemtl`. Only triangles are kept; faces
//! with any other vertex count are skipped. `usemtl NAME` binds the texture
//! `NAME.png` next to the OBJ file to the faces that follow.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glam::{Vec2, Vec3};
use log::{debug, info};

use super::model::{Face, Model};
use crate::error::AssetError;
use crate::rasterizer::Texture;

/// Load an OBJ file and the textures its `usemtl` lines name
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Model, AssetError> {
    let path = path.as_ref();
    let src = fs::read_to_string(path).map_err(|e| AssetError::io(path, e))?;
    let dir = path.parent().unwrap_or(Path::new(""));
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("model");

    let model = parse_obj(name, &src, |material| Texture::from_file(dir.join(format!("{material}.png"))))?;
    info!(
        "Loaded {} ({} faces, {} textures)",
        path.display(),
        model.face_count(),
        model.textures().len()
    );
    Ok(model)
}

/// Parse OBJ source. `load_material` is called once per distinct material name.
pub fn parse_obj<F>(name: &str, src: &str, mut load_material: F) -> Result<Model, AssetError>
where
    F: FnMut(&str) -> Result<Texture, AssetError>,
{
    let mut positions: Vec<Vec3> = Vec::new();
    let mut uvs: Vec<Vec2> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut faces: Vec<Face> = Vec::new();
    let mut textures: Vec<Texture> = Vec::new();
    let mut materials: HashMap<String, usize> = HashMap::new();
    let mut material: Option<usize> = None;
    let mut skipped = 0usize;

    for (line_no, line) in src.lines().enumerate() {
        let line_no = line_no + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        match tag {
            "v" => {
                let [x, y, z] = parse_floats(parts, line_no)?;
                positions.push(Vec3::new(x, y, z));
            }
            "vn" => {
                let [x, y, z] = parse_floats(parts, line_no)?;
                normals.push(Vec3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats(parts, line_no)?;
                uvs.push(Vec2::new(u, v));
            }
            "f" => {
                let refs = parts
                    .map(|token| parse_vertex_ref(token, line_no))
                    .collect::<Result<Vec<_>, _>>()?;
                let Ok(refs) = <[VertexRef; 3]>::try_from(refs) else {
                    skipped += 1;
                    continue;
                };

                let mut face = Face::uniform([0; 3], material);
                for (slot, r) in refs.iter().enumerate() {
                    face.positions[slot] = resolve(r.position, positions.len(), "vertex", line_no)?;
                }

                // Missing uvs read (0, 0); missing normals get the flat face normal
                let mut flat_normal = None;
                for (slot, r) in refs.iter().enumerate() {
                    face.uvs[slot] = match r.uv {
                        Some(i) => resolve(i, uvs.len(), "uv", line_no)?,
                        None => {
                            uvs.push(Vec2::ZERO);
                            uvs.len() - 1
                        }
                    };
                    face.normals[slot] = match r.normal {
                        Some(i) => resolve(i, normals.len(), "normal", line_no)?,
                        None => *flat_normal.get_or_insert_with(|| {
                            let [a, b, c] = face.positions.map(|i| positions[i]);
                            normals.push((b - a).cross(c - a));
                            normals.len() - 1
                        }),
                    };
                }
                faces.push(face);
            }
            "usemtl" => {
                let name = parts
                    .next()
                    .ok_or_else(|| AssetError::parse(line_no, "usemtl without a name"))?;
                let index = match materials.get(name) {
                    Some(&index) => index,
                    None => {
                        textures.push(load_material(name)?);
                        materials.insert(name.to_string(), textures.len() - 1);
                        textures.len() - 1
                    }
                };
                material = Some(index);
            }
            _ => {}
        }
    }

    if skipped > 0 {
        debug!("{}: skipped {} non-triangle faces", name, skipped);
    }

    Model::new(name, positions, uvs, normals, faces, textures)
}

/// One `v/vt/vn` reference of a face, still 1-based (negative = relative)
#[derive(Debug, Clone, Copy)]
struct VertexRef {
    position: i64,
    uv: Option<i64>,
    normal: Option<i64>,
}

fn parse_vertex_ref(token: &str, line: usize) -> Result<VertexRef, AssetError> {
    let mut segments = token.split('/');
    let mut next_index = || -> Result<Option<i64>, AssetError> {
        match segments.next() {
            None | Some("") => Ok(None),
            Some(s) => s
                .parse::<i64>()
                .map(Some)
                .map_err(|_| AssetError::parse(line, format!("invalid index {s:?}"))),
        }
    };

    let position = next_index()?.ok_or_else(|| AssetError::parse(line, format!("missing vertex index in {token:?}")))?;
    let uv = next_index()?;
    let normal = next_index()?;
    Ok(VertexRef { position, uv, normal })
}

/// Convert a 1-based or negative OBJ index into a 0-based one
fn resolve(index: i64, len: usize, kind: &str, line: usize) -> Result<usize, AssetError> {
    let resolved = if index > 0 {
        Some(index as usize - 1).filter(|&i| i < len)
    } else if index < 0 {
        let back = index.unsigned_abs() as usize;
        (back <= len).then(|| len - back)
    } else {
        None
    };
    resolved.ok_or_else(|| AssetError::parse(line, format!("{kind} index {index} out of range ({len} defined)")))
}

fn parse_floats<'a, const N: usize>(
    mut parts: impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<[f32; N], AssetError> {
    let mut out = [0.0; N];
    for value in out.iter_mut() {
        let part = parts
            .next()
            .ok_or_else(|| AssetError::parse(line, format!("expected {N} numbers")))?;
        *value = part
            .parse()
            .map_err(|_| AssetError::parse(line, format!("invalid number {part:?}")))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::Color;

    fn no_materials(name: &str) -> Result<Texture, AssetError> {
        panic!("unexpected material {name}")
    }

    #[test]
    fn test_parses_full_triangle() {
        let src = "\
# corner
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 2
f 1/1/1 2/2/1 3/3/1
";
        let model = parse_obj("tri", src, no_materials).unwrap();
        assert_eq!(model.face_count(), 1);
        assert_eq!(model.uv(0, 1), Vec2::new(1.0, 0.0));
        assert_eq!(model.normal(0, 2), Vec3::Z);
        assert!(model.texture_for(0).is_none());
    }

    #[test]
    fn test_skips_quads() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\nf 1 2 3\n";
        let model = parse_obj("quad", src, no_materials).unwrap();
        assert_eq!(model.face_count(), 1);
    }

    #[test]
    fn test_missing_attributes_are_synthesized() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let model = parse_obj("bare", src, no_materials).unwrap();
        assert_eq!(model.uv(0, 0), Vec2::ZERO);
        // Counter-clockwise in XY faces +Z
        assert!((model.normal(0, 0) - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_negative_indices() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let model = parse_obj("rel", src, no_materials).unwrap();
        assert_eq!(model.vertex(0, 2).truncate(), Vec3::Y);
    }

    #[test]
    fn test_out_of_range_index_reports_line() {
        let src = "v 0 0 0\nv 1 0 0\nf 1 2 7\n";
        match parse_obj("bad", src, no_materials) {
            Err(AssetError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_materials_loaded_once() {
        let src = "\
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
usemtl red
f 1 2 3
usemtl green
f 1 2 3
usemtl red
f 1 2 3
";
        let mut requested = Vec::new();
        let model = parse_obj("mats", src, |name| {
            requested.push(name.to_string());
            let color = if name == "red" { Color::RED } else { Color::GREEN };
            Ok(Texture::solid(1, 1, color))
        })
        .unwrap();

        assert_eq!(requested, ["red", "green"]);
        assert_eq!(model.faces()[0].material, None);
        assert_eq!(model.sample_texture(1, Vec2::splat(0.5)), Color::RED);
        assert_eq!(model.sample_texture(2, Vec2::splat(0.5)), Color::GREEN);
        assert_eq!(model.sample_texture(3, Vec2::splat(0.5)), Color::RED);
    }
}

//! Triangle meshes consumed by the pipeline
//!
//! A model's geometry is fixed once built; only its transform and shader
//! assignment change between frames.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::error::AssetError;
use crate::rasterizer::{Color, ShaderKind, Texture};

/// A triangle: indices into the model's position, uv and normal arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub positions: [usize; 3],
    pub uvs: [usize; 3],
    pub normals: [usize; 3],
    /// Index into the model's texture list
    pub material: Option<usize>,
}

impl Face {
    /// Face whose position, uv and normal indices are all the same
    pub fn uniform(indices: [usize; 3], material: Option<usize>) -> Self {
        Self {
            positions: indices,
            uvs: indices,
            normals: indices,
            material,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    normals: Vec<Vec3>,
    faces: Vec<Face>,
    textures: Vec<Texture>,
    transform: Mat4,
    shader: ShaderKind,
}

impl Model {
    /// Build a model, checking every face index. Normals are normalized.
    pub fn new(
        name: &str,
        positions: Vec<Vec3>,
        uvs: Vec<Vec2>,
        normals: Vec<Vec3>,
        faces: Vec<Face>,
        textures: Vec<Texture>,
    ) -> Result<Self, AssetError> {
        for (i, face) in faces.iter().enumerate() {
            check_indices("position", i, &face.positions, positions.len())?;
            check_indices("uv", i, &face.uvs, uvs.len())?;
            check_indices("normal", i, &face.normals, normals.len())?;
            if let Some(material) = face.material {
                check_indices("material", i, &[material], textures.len())?;
            }
        }

        Ok(Self {
            name: name.to_string(),
            positions,
            uvs,
            normals: normals.into_iter().map(Vec3::normalize_or_zero).collect(),
            faces,
            textures,
            transform: Mat4::IDENTITY,
            shader: ShaderKind::default(),
        })
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_shader(mut self, shader: ShaderKind) -> Self {
        self.shader = shader;
        self
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    /// Model-space position of a face corner, w = 1
    pub fn vertex(&self, face: usize, slot: usize) -> Vec4 {
        self.positions[self.faces[face].positions[slot]].extend(1.0)
    }

    pub fn uv(&self, face: usize, slot: usize) -> Vec2 {
        self.uvs[self.faces[face].uvs[slot]]
    }

    pub fn normal(&self, face: usize, slot: usize) -> Vec3 {
        self.normals[self.faces[face].normals[slot]]
    }

    pub fn texture_for(&self, face: usize) -> Option<&Texture> {
        self.faces[face].material.and_then(|m| self.textures.get(m))
    }

    /// Sample the face's texture; untextured faces are white
    pub fn sample_texture(&self, face: usize, uv: Vec2) -> Color {
        match self.texture_for(face) {
            Some(tex) => tex.sample(uv.x, uv.y),
            None => Color::WHITE,
        }
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// Replace (not accumulate) the model-to-world transform
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    pub fn shader(&self) -> ShaderKind {
        self.shader
    }

    pub fn set_shader(&mut self, shader: ShaderKind) {
        self.shader = shader;
    }

    /// A single textured triangle with a flat normal
    pub fn triangle(positions: [Vec3; 3], uvs: [Vec2; 3], texture: Option<Texture>) -> Self {
        let normal = (positions[1] - positions[0])
            .cross(positions[2] - positions[0])
            .normalize_or_zero();
        let material = texture.as_ref().map(|_| 0);
        Self {
            name: "triangle".to_string(),
            positions: positions.to_vec(),
            uvs: uvs.to_vec(),
            normals: vec![normal],
            faces: vec![Face {
                positions: [0, 1, 2],
                uvs: [0, 1, 2],
                normals: [0, 0, 0],
                material,
            }],
            textures: texture.into_iter().collect(),
            transform: Mat4::IDENTITY,
            shader: ShaderKind::default(),
        }
    }

    /// Square in the XZ plane centered on the origin, facing +Y (two triangles)
    pub fn quad(size: f32, texture: Option<Texture>) -> Self {
        let h = size / 2.0;
        let material = texture.as_ref().map(|_| 0);
        Self {
            name: "quad".to_string(),
            positions: vec![
                Vec3::new(-h, 0.0, h),
                Vec3::new(h, 0.0, h),
                Vec3::new(h, 0.0, -h),
                Vec3::new(-h, 0.0, -h),
            ],
            uvs: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            normals: vec![Vec3::Y; 4],
            faces: vec![
                Face::uniform([0, 1, 2], material),
                Face::uniform([0, 2, 3], material),
            ],
            textures: texture.into_iter().collect(),
            transform: Mat4::IDENTITY,
            shader: ShaderKind::default(),
        }
    }

    /// Axis-aligned cube centered on the origin, one texture on all sides
    pub fn cube(size: f32, texture: Option<Texture>) -> Self {
        let h = size / 2.0;
        let material = texture.as_ref().map(|_| 0);

        // Four corners per side, counter-clockwise seen from outside
        let sides: [(Vec3, [Vec3; 4]); 6] = [
            (Vec3::Z, [Vec3::new(-h, -h, h), Vec3::new(h, -h, h), Vec3::new(h, h, h), Vec3::new(-h, h, h)]),
            (Vec3::NEG_Z, [Vec3::new(h, -h, -h), Vec3::new(-h, -h, -h), Vec3::new(-h, h, -h), Vec3::new(h, h, -h)]),
            (Vec3::Y, [Vec3::new(-h, h, h), Vec3::new(h, h, h), Vec3::new(h, h, -h), Vec3::new(-h, h, -h)]),
            (Vec3::NEG_Y, [Vec3::new(-h, -h, -h), Vec3::new(h, -h, -h), Vec3::new(h, -h, h), Vec3::new(-h, -h, h)]),
            (Vec3::X, [Vec3::new(h, -h, h), Vec3::new(h, -h, -h), Vec3::new(h, h, -h), Vec3::new(h, h, h)]),
            (Vec3::NEG_X, [Vec3::new(-h, -h, -h), Vec3::new(-h, -h, h), Vec3::new(-h, h, h), Vec3::new(-h, h, -h)]),
        ];
        let corner_uvs = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut faces = Vec::with_capacity(12);

        for (normal, corners) in sides {
            let base = positions.len();
            positions.extend_from_slice(&corners);
            normals.extend_from_slice(&[normal; 4]);
            uvs.extend_from_slice(&corner_uvs);

            // Two triangles per side
            faces.push(Face::uniform([base, base + 1, base + 2], material));
            faces.push(Face::uniform([base, base + 2, base + 3], material));
        }

        Self {
            name: "cube".to_string(),
            positions,
            uvs,
            normals,
            faces,
            textures: texture.into_iter().collect(),
            transform: Mat4::IDENTITY,
            shader: ShaderKind::default(),
        }
    }
}

fn check_indices(kind: &'static str, face: usize, indices: &[usize], len: usize) -> Result<(), AssetError> {
    match indices.iter().find(|&&i| i >= len) {
        Some(&index) => Err(AssetError::InvalidIndex { kind, face, index, len }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_index() {
        let result = Model::new(
            "bad",
            vec![Vec3::ZERO; 3],
            vec![Vec2::ZERO; 3],
            vec![Vec3::Y; 2],
            vec![Face::uniform([0, 1, 2], None)],
            Vec::new(),
        );
        match result {
            Err(AssetError::InvalidIndex { kind, index, .. }) => {
                assert_eq!(kind, "normal");
                assert_eq!(index, 2);
            }
            other => panic!("expected InvalidIndex, got {other:?}"),
        }
    }

    #[test]
    fn test_new_rejects_missing_texture() {
        let result = Model::new(
            "bad",
            vec![Vec3::ZERO; 3],
            vec![Vec2::ZERO; 3],
            vec![Vec3::Y; 3],
            vec![Face::uniform([0, 1, 2], Some(0))],
            Vec::new(),
        );
        assert!(matches!(result, Err(AssetError::InvalidIndex { kind: "material", .. })));
    }

    #[test]
    fn test_normals_are_unit_length() {
        let model = Model::new(
            "tri",
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![Vec2::ZERO; 3],
            vec![Vec3::new(0.0, 0.0, 5.0); 3],
            vec![Face::uniform([0, 1, 2], None)],
            Vec::new(),
        )
        .unwrap();
        assert!((model.normal(0, 1).length() - 1.0).abs() < 1e-6);
        assert_eq!(model.vertex(0, 1), Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_untextured_samples_white() {
        let model = Model::quad(1.0, None);
        assert_eq!(model.sample_texture(0, Vec2::new(0.5, 0.5)), Color::WHITE);
    }

    #[test]
    fn test_cube_shape() {
        let cube = Model::cube(2.0, Some(Texture::solid(1, 1, Color::GREEN)));
        assert_eq!(cube.face_count(), 12);
        for face in 0..cube.face_count() {
            for slot in 0..3 {
                let v = cube.vertex(face, slot);
                assert_eq!(v.truncate().abs(), Vec3::ONE);
            }
            assert_eq!(cube.sample_texture(face, Vec2::new(0.5, 0.5)), Color::GREEN);
        }
    }
}

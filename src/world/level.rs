//! Scene file loading and saving
//!
//! Uses RON (Rusty Object Notation) for human-readable scene files.
//! Relative asset paths are resolved against the scene file's directory.

use std::fs;
use std::path::{Path, PathBuf};

use glam::{EulerRot, Mat4, Quat, Vec3};
use log::info;
use serde::{Deserialize, Serialize};

use super::{load_obj, Model, Scene};
use crate::error::AssetError;
use crate::rasterizer::{Camera, Color, RenderConfig, ShaderKind, Texture};

/// On-disk description of a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneFile {
    pub camera: CameraDesc,
    #[serde(default)]
    pub lights: Vec<Vec3>,
    #[serde(default = "default_background")]
    pub background: Color,
    #[serde(default)]
    pub models: Vec<ModelDesc>,
    #[serde(default)]
    pub render: RenderConfig,
}

fn default_background() -> Color {
    Color::new(30, 30, 35)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDesc {
    pub eye: Vec3,
    #[serde(default)]
    pub target: Vec3,
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
}

fn default_fov() -> f32 {
    Camera::DEFAULT_FOV
}

fn default_near() -> f32 {
    Camera::DEFAULT_NEAR
}

fn default_far() -> f32 {
    Camera::DEFAULT_FAR
}

impl CameraDesc {
    pub fn build(&self, width: usize, height: usize) -> Camera {
        Camera::new(self.eye, self.target, width, height).with_lens(self.fov, self.near, self.far)
    }
}

/// Where a model's triangles come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeshSource {
    /// OBJ file; its `usemtl` textures are loaded alongside
    Obj(PathBuf),
    Cube { size: f32 },
    /// Flat square in the XZ plane facing +Y
    Quad { size: f32 },
    Triangle { positions: [Vec3; 3] },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TextureSource {
    File(PathBuf),
    Solid(Color),
    /// Square board of 4x4-texel cells
    Checker { size: usize, a: Color, b: Color },
}

impl TextureSource {
    fn load(&self, base_dir: &Path) -> Result<Texture, AssetError> {
        match self {
            TextureSource::File(path) => Texture::from_file(base_dir.join(path)),
            TextureSource::Solid(color) => Ok(Texture::solid(1, 1, *color)),
            TextureSource::Checker { size, a, b } => Ok(Texture::checkerboard(*size, *size, *a, *b)),
        }
    }
}

/// Model-to-world placement: scale, then rotate, then translate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    pub translation: Vec3,
    /// Euler angles in degrees, applied Y then X then Z
    pub rotation: Vec3,
    pub scale: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl Placement {
    pub fn matrix(&self) -> Mat4 {
        let r = self.rotation;
        let rotation = Quat::from_euler(EulerRot::YXZ, r.y.to_radians(), r.x.to_radians(), r.z.to_radians());
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), rotation, self.translation)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDesc {
    #[serde(default)]
    pub name: Option<String>,
    pub mesh: MeshSource,
    /// Texture for builtin meshes (OBJ models use their own materials)
    #[serde(default)]
    pub texture: Option<TextureSource>,
    #[serde(default)]
    pub placement: Placement,
    #[serde(default)]
    pub shader: ShaderKind,
}

impl ModelDesc {
    pub fn build(&self, base_dir: &Path) -> Result<Model, AssetError> {
        let texture = match (&self.mesh, &self.texture) {
            (MeshSource::Obj(_), _) | (_, None) => None,
            (_, Some(source)) => Some(source.load(base_dir)?),
        };

        let mut model = match &self.mesh {
            MeshSource::Obj(path) => load_obj(base_dir.join(path))?,
            MeshSource::Cube { size } => Model::cube(*size, texture),
            MeshSource::Quad { size } => Model::quad(*size, texture),
            MeshSource::Triangle { positions } => {
                let uvs = [glam::Vec2::new(0.0, 0.0), glam::Vec2::new(1.0, 0.0), glam::Vec2::new(0.0, 1.0)];
                Model::triangle(*positions, uvs, texture)
            }
        };

        if let Some(name) = &self.name {
            model.name = name.clone();
        }
        model.set_transform(self.placement.matrix());
        model.set_shader(self.shader);
        Ok(model)
    }
}

impl SceneFile {
    /// Instantiate the scene for a canvas of the given size
    pub fn build(&self, base_dir: &Path, width: usize, height: usize) -> Result<Scene, AssetError> {
        let mut scene = Scene::new(self.camera.build(width, height));
        scene.background = self.background;
        for light in &self.lights {
            scene.add_light(*light);
        }
        for desc in &self.models {
            scene.add_model(desc.build(base_dir)?);
        }
        Ok(scene)
    }

    /// Checkerboard cube standing on a floor, lit from above
    pub fn demo() -> Self {
        let checker = TextureSource::Checker {
            size: 32,
            a: Color::new(230, 230, 230),
            b: Color::new(200, 60, 40),
        };
        Self {
            camera: CameraDesc {
                eye: Vec3::new(2.0, 1.6, 2.6),
                target: Vec3::new(0.0, 0.3, 0.0),
                fov: 45.0,
                near: 0.2,
                far: 10.0,
            },
            lights: vec![Vec3::new(1.0, 3.0, 1.5)],
            background: default_background(),
            models: vec![
                ModelDesc {
                    name: Some("floor".to_string()),
                    mesh: MeshSource::Quad { size: 2.5 },
                    texture: Some(TextureSource::Solid(Color::new(180, 180, 170))),
                    placement: Placement::default(),
                    shader: ShaderKind::TextureWithShadow,
                },
                ModelDesc {
                    name: Some("cube".to_string()),
                    mesh: MeshSource::Cube { size: 0.8 },
                    texture: Some(checker),
                    placement: Placement {
                        translation: Vec3::new(0.0, 0.5, 0.0),
                        rotation: Vec3::new(0.0, 30.0, 0.0),
                        scale: 1.0,
                    },
                    shader: ShaderKind::TextureWithShadow,
                },
            ],
            render: RenderConfig::default(),
        }
    }
}

/// Load a scene description from a RON file
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<SceneFile, AssetError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| AssetError::io(path, e))?;
    let scene = load_scene_from_str(&contents)?;
    info!("Loaded scene {} ({} models)", path.display(), scene.models.len());
    Ok(scene)
}

/// Save a scene description to a RON file
pub fn save_scene<P: AsRef<Path>>(scene: &SceneFile, path: P) -> Result<(), AssetError> {
    let config = ron::ser::PrettyConfig::new()
        .depth_limit(4)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(scene, config)?;
    fs::write(path.as_ref(), contents).map_err(|e| AssetError::io(path.as_ref(), e))?;
    Ok(())
}

/// Load a scene description from a RON string (for embedded scenes or testing)
pub fn load_scene_from_str(s: &str) -> Result<SceneFile, AssetError> {
    Ok(ron::from_str(s)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_scene_uses_defaults() {
        let src = r#"(
            camera: (eye: (0.0, 0.0, 3.0)),
            models: [(mesh: Cube(size: 1.0))],
        )"#;
        let file = load_scene_from_str(src).unwrap();
        assert_eq!(file.camera.fov, Camera::DEFAULT_FOV);
        assert_eq!(file.render, RenderConfig::default());
        assert!(file.lights.is_empty());

        let scene = file.build(Path::new("."), 32, 24).unwrap();
        assert_eq!(scene.models().len(), 1);
        assert_eq!(scene.models()[0].shader(), ShaderKind::PlainTexture);
        assert_eq!(scene.camera().width, 32);
    }

    #[test]
    fn test_bad_syntax_is_scene_error() {
        let result = load_scene_from_str("(camera: ");
        assert!(matches!(result, Err(AssetError::SceneParse(_))));
    }

    #[test]
    fn test_placement_order() {
        let placement = Placement {
            translation: Vec3::new(0.0, 1.0, 0.0),
            rotation: Vec3::new(0.0, 90.0, 0.0),
            scale: 2.0,
        };
        let p = placement.matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(0.0, 1.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn test_demo_builds() {
        let scene = SceneFile::demo().build(Path::new("."), 64, 48).unwrap();
        assert!(scene.wants_shadows());
        assert_eq!(scene.models()[1].name, "cube");
    }
}

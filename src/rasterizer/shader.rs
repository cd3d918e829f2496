//! Programmable shading stages
//!
//! A `Shader` is bound to one model for one pass. Binding captures the
//! frame-constant uniforms (matrices, light, eye, shadow transform). The
//! vertex stage returns every varying in a `VertexOutput`, and the fragment
//! stage receives the three outputs of its triangle explicitly, so no state
//! is carried between calls.

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::camera::Camera;
use super::math::{interpolate, inverse_or_zero, ScreenPoint};
use super::render::DepthBuffer;
use super::types::{Color, RenderConfig};
use crate::world::Model;

/// Ambient term of the lit shaders (also the shadowed intensity)
pub const AMBIENT: f32 = 0.3;
/// Weight of the diffuse term in the Blinn-Phong sum
pub const DIFFUSE_WEIGHT: f32 = 0.5;

/// The shading models a model can be assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShaderKind {
    /// Grayscale depth visualization
    Depth,
    /// Unlit texture
    #[default]
    PlainTexture,
    /// Per-vertex diffuse intensity, grayscale
    Gouraud,
    /// Per-pixel Blinn-Phong over the texture
    Phong,
    /// Blinn-Phong with a shadow map lookup
    TextureWithShadow,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 5] = [
        ShaderKind::Depth,
        ShaderKind::PlainTexture,
        ShaderKind::Gouraud,
        ShaderKind::Phong,
        ShaderKind::TextureWithShadow,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ShaderKind::Depth => "depth",
            ShaderKind::PlainTexture => "texture",
            ShaderKind::Gouraud => "gouraud",
            ShaderKind::Phong => "phong",
            ShaderKind::TextureWithShadow => "shadow",
        }
    }

    pub fn from_name(name: &str) -> Option<ShaderKind> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.label().eq_ignore_ascii_case(name))
    }

    pub fn from_index(i: usize) -> Option<ShaderKind> {
        Self::ALL.get(i).copied()
    }

    /// Cycle through all kinds
    pub fn next(self) -> ShaderKind {
        let i = Self::ALL.iter().position(|&k| k == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    /// Whether this kind samples the shadow buffer
    pub fn needs_shadow_pass(&self) -> bool {
        matches!(self, ShaderKind::TextureWithShadow)
    }
}

/// Everything the vertex stage produces for one triangle corner
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VertexOutput {
    /// Viewport-space homogeneous position (before the divide)
    pub position: Vec4,
    /// World-space position
    pub world: Vec3,
    /// World-space unit normal
    pub normal: Vec3,
    pub uv: Vec2,
    /// Gouraud diffuse intensity
    pub intensity: f32,
}

/// Matrices captured once per model per pass
#[derive(Debug, Clone, Copy, PartialEq)]
struct Transforms {
    model: Mat4,
    viewport: Mat4,
    mvp_viewport: Mat4,
}

impl Transforms {
    fn new(model: Mat4, camera: &Camera) -> Self {
        let viewport = camera.viewport_matrix();
        Self {
            model,
            viewport,
            mvp_viewport: viewport * camera.projection_matrix() * camera.view_matrix() * model,
        }
    }

    /// Model space straight to viewport space
    #[inline]
    fn to_viewport(&self, coords: Vec4) -> Vec4 {
        self.mvp_viewport * coords
    }

    #[inline]
    fn to_world(&self, coords: Vec4) -> Vec3 {
        (self.model * coords).truncate()
    }

    #[inline]
    fn normal_to_world(&self, normal: Vec3) -> Vec3 {
        (self.model * normal.extend(0.0)).truncate().normalize_or_zero()
    }
}

/// Output of the shadow pass, available to the main pass
#[derive(Debug, Clone, Copy)]
pub struct ShadowMap<'a> {
    /// Camera the shadow buffer was rendered from
    pub camera: &'a Camera,
    pub depth: &'a DepthBuffer,
}

/// Per-pass inputs for binding shaders
#[derive(Debug, Clone, Copy)]
pub struct PassContext<'a> {
    /// Camera this pass renders from
    pub camera: &'a Camera,
    /// First scene light, used as a direction toward the origin
    pub light: Option<Vec3>,
    pub shadow: Option<ShadowMap<'a>>,
    pub config: &'a RenderConfig,
}

impl<'a> PassContext<'a> {
    fn light_dir(&self) -> Vec3 {
        self.light.map(Vec3::normalize_or_zero).unwrap_or(Vec3::ZERO)
    }
}

#[derive(Debug, Clone, Copy)]
struct Lighting {
    light_dir: Vec3,
    eye: Vec3,
    specular_exponent: f32,
}

impl Lighting {
    fn from_context(ctx: &PassContext<'_>) -> Self {
        Self {
            light_dir: ctx.light_dir(),
            eye: ctx.camera.position,
            specular_exponent: ctx.config.specular_exponent,
        }
    }

    /// Blinn-Phong intensity, clamped to 1 as a whole
    fn factor(&self, world: Vec3, normal: Vec3) -> f32 {
        let eye_dir = world - (-self.eye).normalize_or_zero();
        let half = (eye_dir + self.light_dir).normalize_or_zero();

        let diffuse = normal.dot(self.light_dir).max(0.0);
        let specular = normal.dot(half).max(0.0).powf(self.specular_exponent);

        (AMBIENT + diffuse * DIFFUSE_WEIGHT + specular).min(1.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct ShadowLookup<'a> {
    /// Main-pass viewport space to shadow-pass viewport space
    screen_to_shadow: Mat4,
    bias: f32,
    depth: &'a DepthBuffer,
}

impl ShadowLookup<'_> {
    /// Whether a homogeneous main-pass screen position is occluded from the light
    fn occluded(&self, screen: Vec4) -> bool {
        let Some(p) = ScreenPoint::from_homogeneous(self.screen_to_shadow * screen) else {
            return false;
        };
        match self.depth.sample(p.x, p.y) {
            Some(stored) => stored > p.z + self.bias,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage<'a> {
    ShadowDepth,
    Depth,
    PlainTexture,
    Gouraud { light_dir: Vec3 },
    Phong(Lighting),
    TextureWithShadow {
        lighting: Lighting,
        shadow: Option<ShadowLookup<'a>>,
    },
}

/// A shading program bound to one model for one pass
#[derive(Debug, Clone, Copy)]
pub struct Shader<'a> {
    model: &'a Model,
    transforms: Transforms,
    stage: Stage<'a>,
}

impl<'a> Shader<'a> {
    /// Capture this pass's uniforms for `model` (once per model per frame).
    pub fn bind(kind: ShaderKind, model: &'a Model, ctx: &PassContext<'a>) -> Self {
        let transforms = Transforms::new(model.transform(), ctx.camera);
        let stage = match kind {
            ShaderKind::Depth => Stage::Depth,
            ShaderKind::PlainTexture => Stage::PlainTexture,
            ShaderKind::Gouraud => Stage::Gouraud {
                light_dir: ctx.light_dir(),
            },
            ShaderKind::Phong => Stage::Phong(Lighting::from_context(ctx)),
            ShaderKind::TextureWithShadow => {
                let shadow = ctx.shadow.map(|map| {
                    let shadow_mvp_viewport = transforms.viewport
                        * map.camera.projection_matrix()
                        * map.camera.view_matrix()
                        * transforms.model;
                    ShadowLookup {
                        screen_to_shadow: shadow_mvp_viewport * inverse_or_zero(&transforms.mvp_viewport),
                        bias: ctx.config.shadow_bias,
                        depth: map.depth,
                    }
                });
                Stage::TextureWithShadow {
                    lighting: Lighting::from_context(ctx),
                    shadow,
                }
            }
        };
        Self { model, transforms, stage }
    }

    /// Minimal program for the shadow pre-pass: positions only
    pub fn depth_only(model: &'a Model, light_camera: &Camera) -> Self {
        Self {
            model,
            transforms: Transforms::new(model.transform(), light_camera),
            stage: Stage::ShadowDepth,
        }
    }

    /// Transform one model-space corner of `face` to viewport space and
    /// compute the varyings this program needs.
    pub fn vertex(&self, face: usize, slot: usize, coords: Vec4) -> VertexOutput {
        let position = self.transforms.to_viewport(coords);
        let mut out = VertexOutput {
            position,
            ..VertexOutput::default()
        };

        match self.stage {
            Stage::ShadowDepth | Stage::Depth => {}
            Stage::PlainTexture => {
                out.uv = self.model.uv(face, slot);
            }
            Stage::Gouraud { light_dir } => {
                let normal = self.transforms.normal_to_world(self.model.normal(face, slot));
                out.intensity = normal.dot(light_dir).max(0.0);
            }
            Stage::Phong(_) | Stage::TextureWithShadow { .. } => {
                out.world = self.transforms.to_world(coords);
                out.normal = self.transforms.normal_to_world(self.model.normal(face, slot));
                out.uv = self.model.uv(face, slot);
            }
        }
        out
    }

    /// Shade one covered pixel. `bary` are perspective-correct weights.
    /// Returns `None` to discard the pixel.
    pub fn fragment(&self, face: usize, varyings: &[VertexOutput; 3], bary: Vec3) -> Option<Color> {
        let color = match self.stage {
            Stage::ShadowDepth => Color::BLUE,
            Stage::Depth => {
                let depth = -interpolate(bary, varyings.map(|v| v.position.z));
                Color::gray(1.0 - depth)
            }
            Stage::PlainTexture => {
                let uv = interpolate(bary, varyings.map(|v| v.uv));
                self.model.sample_texture(face, uv)
            }
            Stage::Gouraud { .. } => Color::gray(interpolate(bary, varyings.map(|v| v.intensity))),
            Stage::Phong(lighting) => {
                let base = self.sample(face, varyings, bary);
                let (world, normal) = surface(varyings, bary);
                base.shade(lighting.factor(world, normal)).opaque()
            }
            Stage::TextureWithShadow { lighting, shadow } => {
                let base = self.sample(face, varyings, bary);
                let screen = interpolate(bary, varyings.map(|v| v.position));
                if shadow.is_some_and(|s| s.occluded(screen)) {
                    base.shade(AMBIENT).opaque()
                } else {
                    let (world, normal) = surface(varyings, bary);
                    base.shade(lighting.factor(world, normal)).opaque()
                }
            }
        };
        Some(color)
    }

    fn sample(&self, face: usize, varyings: &[VertexOutput; 3], bary: Vec3) -> Color {
        let uv = interpolate(bary, varyings.map(|v| v.uv));
        self.model.sample_texture(face, uv)
    }
}

/// Interpolated world position and renormalized normal
fn surface(varyings: &[VertexOutput; 3], bary: Vec3) -> (Vec3, Vec3) {
    let world = interpolate(bary, varyings.map(|v| v.world));
    let normal = interpolate(bary, varyings.map(|v| v.normal)).normalize_or_zero();
    (world, normal)
}

//! What gets rendered: models, lights and the viewing camera

use glam::Vec3;

use super::Model;
use crate::rasterizer::{Camera, Color};

/// Models and lights in draw order plus the camera they are viewed through.
///
/// Lights are positions; each one lights the scene along the direction from
/// it towards the origin. Only the first light casts shadows.
#[derive(Debug, Clone)]
pub struct Scene {
    models: Vec<Model>,
    lights: Vec<Vec3>,
    camera: Camera,
    /// Clear color for the presentation surface
    pub background: Color,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            models: Vec::new(),
            lights: Vec::new(),
            camera,
            background: Color::new(30, 30, 35),
        }
    }

    pub fn add_model(&mut self, model: Model) -> usize {
        self.models.push(model);
        self.models.len() - 1
    }

    pub fn add_light(&mut self, position: Vec3) {
        self.lights.push(position);
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn models_mut(&mut self) -> &mut [Model] {
        &mut self.models
    }

    pub fn model_by_name(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn lights(&self) -> &[Vec3] {
        &self.lights
    }

    /// Positions can be moved in place; adding or removing goes through `add_light`
    pub fn lights_mut(&mut self) -> &mut [Vec3] {
        &mut self.lights
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// True if any model's shader reads the shadow buffer
    pub fn wants_shadows(&self) -> bool {
        !self.lights.is_empty() && self.models.iter().any(|m| m.shader().needs_shadow_pass())
    }
}

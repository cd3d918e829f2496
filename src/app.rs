//! Viewer state shared by the window and headless front ends
//!
//! Owns the scene and renderer; input is reduced to orbit, zoom, light and
//! specular nudges and a few toggles so the same state drives interactive
//! and turntable rendering.

use std::f32::consts::TAU;

use glam::Vec3;
use tiny_renderer::rasterizer::{FrameStats, Present, RenderConfig, Renderer, ShaderKind};
use tiny_renderer::world::Scene;

/// Radians per pixel of mouse drag
const ORBIT_SPEED: f32 = 0.005;
/// Elevation limit, just short of the poles
const MAX_ELEVATION: f32 = 1.4;
/// Radians per second while auto-rotating
const TURNTABLE_SPEED: f32 = 0.6;
/// Specular exponent range reachable from the viewer
const SPECULAR_RANGE: (f32, f32) = (1.0, 10_000.0);

/// Camera position on a sphere around a target point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orbit {
    pub target: Vec3,
    pub distance: f32,
    /// Horizontal angle (radians)
    pub azimuth: f32,
    /// Vertical angle (radians)
    pub elevation: f32,
}

impl Orbit {
    /// Recover orbit parameters from a camera position
    pub fn around(eye: Vec3, target: Vec3) -> Self {
        let offset = eye - target;
        let distance = offset.length().max(f32::EPSILON);
        Self {
            target,
            distance,
            azimuth: offset.z.atan2(offset.x),
            elevation: (offset.y / distance).clamp(-1.0, 1.0).asin(),
        }
    }

    pub fn rotate(&mut self, d_azimuth: f32, d_elevation: f32) {
        self.azimuth = (self.azimuth + d_azimuth).rem_euclid(TAU);
        self.elevation = (self.elevation + d_elevation).clamp(-MAX_ELEVATION, MAX_ELEVATION);
    }

    /// Scale distance; positive steps move closer
    pub fn zoom(&mut self, steps: f32, min: f32, max: f32) {
        let zoom_factor = 0.9f32.powf(steps);
        self.distance = (self.distance * zoom_factor).clamp(min, max);
    }
}

pub struct Viewer {
    pub scene: Scene,
    pub renderer: Renderer,
    pub orbit: Orbit,
    pub auto_rotate: bool,
    /// Shader forced onto every model, if any
    pub shader_override: Option<ShaderKind>,
    /// Orbit the scene was opened with
    home: Orbit,
    min_distance: f32,
    max_distance: f32,
}

impl Viewer {
    pub fn new(scene: Scene, config: RenderConfig) -> Self {
        let camera = scene.camera();
        let orbit = Orbit::around(camera.position, camera.target());
        let renderer = Renderer::new(camera.width, camera.height, scene.wants_shadows()).with_config(config);
        Self {
            min_distance: camera.near * 2.0,
            max_distance: camera.far,
            scene,
            renderer,
            orbit,
            home: orbit,
            auto_rotate: false,
            shader_override: None,
        }
    }

    /// Assign one shader to every model. Enables the shadow pass when it needs one.
    pub fn set_shader(&mut self, kind: ShaderKind) {
        for model in self.scene.models_mut() {
            model.set_shader(kind);
        }
        self.shader_override = Some(kind);
        self.renderer.set_shadows(self.scene.wants_shadows());
    }

    pub fn toggle_wireframe(&mut self) {
        let config = self.renderer.config_mut();
        config.wireframe = !config.wireframe;
    }

    pub fn drag(&mut self, dx: f32, dy: f32) {
        self.orbit.rotate(dx * ORBIT_SPEED, dy * ORBIT_SPEED);
    }

    pub fn zoom(&mut self, steps: f32) {
        self.orbit.zoom(steps, self.min_distance, self.max_distance);
    }

    /// Back to the orbit the viewer started with
    pub fn reset_camera(&mut self) {
        self.orbit = self.home;
    }

    /// Move the shadow-casting light. A scene without lights gets one at `delta`.
    pub fn move_light(&mut self, delta: Vec3) {
        match self.scene.lights_mut().first_mut() {
            Some(light) => *light += delta,
            None => {
                self.scene.add_light(delta);
                self.renderer.set_shadows(self.scene.wants_shadows());
            }
        }
    }

    pub fn light(&self) -> Option<Vec3> {
        self.scene.lights().first().copied()
    }

    /// Multiply the specular exponent by `factor`, kept within `SPECULAR_RANGE`
    pub fn scale_specular(&mut self, factor: f32) {
        let config = self.renderer.config_mut();
        config.specular_exponent = (config.specular_exponent * factor).clamp(SPECULAR_RANGE.0, SPECULAR_RANGE.1);
    }

    /// Advance auto-rotation by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        if self.auto_rotate {
            self.orbit.rotate(dt * TURNTABLE_SPEED, 0.0);
        }
    }

    /// Render the scene from the current orbit
    pub fn render<P: Present + ?Sized>(&mut self, target: &mut P) -> FrameStats {
        let Orbit {
            target: center,
            distance,
            azimuth,
            elevation,
        } = self.orbit;
        self.scene.camera_mut().orbit(center, distance, azimuth, elevation);
        self.renderer.render(&self.scene, target)
    }

    pub fn status_line(&self, fps: i32) -> String {
        let shader = self
            .shader_override
            .map(|k| k.label())
            .unwrap_or("scene");
        let light = match self.light() {
            Some(l) => format!("({:.1}, {:.1}, {:.1})", l.x, l.y, l.z),
            None => "none".to_string(),
        };
        format!(
            "fps: {}  shader: {}  shadows: {}  wireframe: {}  rotate: {}  light: {}  specular: {}",
            fps,
            shader,
            on_off(self.renderer.shadows_enabled()),
            on_off(self.renderer.config().wireframe),
            on_off(self.auto_rotate),
            light,
            self.renderer.config().specular_exponent,
        )
    }
}

/// Largest rect with the frame's aspect ratio that fits the screen, centered.
/// Returns `(x, y, width, height)`.
pub fn letterbox(screen_w: f32, screen_h: f32, frame_w: usize, frame_h: usize) -> (f32, f32, f32, f32) {
    if frame_w == 0 || frame_h == 0 {
        return (0.0, 0.0, 0.0, 0.0);
    }
    let scale = (screen_w / frame_w as f32).min(screen_h / frame_h as f32).max(0.0);
    let (w, h) = (frame_w as f32 * scale, frame_h as f32 * scale);
    ((screen_w - w) * 0.5, (screen_h - h) * 0.5, w, h)
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tiny_renderer::rasterizer::Snapshot;
    use tiny_renderer::world::SceneFile;

    fn demo_viewer() -> Viewer {
        let file = SceneFile::demo();
        let scene = file.build(Path::new("."), 48, 32).unwrap();
        Viewer::new(scene, file.render)
    }

    #[test]
    fn test_orbit_round_trip() {
        let eye = Vec3::new(2.0, 1.6, 2.6);
        let target = Vec3::new(0.0, 0.3, 0.0);
        let orbit = Orbit::around(eye, target);

        let mut camera = tiny_renderer::Camera::new(Vec3::ZERO, Vec3::ONE, 8, 8);
        camera.orbit(orbit.target, orbit.distance, orbit.azimuth, orbit.elevation);
        assert!((camera.position - eye).length() < 1e-4);
    }

    #[test]
    fn test_elevation_is_clamped() {
        let mut orbit = Orbit::around(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO);
        orbit.rotate(0.0, 10.0);
        assert_eq!(orbit.elevation, MAX_ELEVATION);
        orbit.zoom(100.0, 0.5, 10.0);
        assert_eq!(orbit.distance, 0.5);
    }

    #[test]
    fn test_shader_switch_controls_shadow_pass() {
        let mut viewer = demo_viewer();
        assert!(viewer.renderer.shadows_enabled());

        viewer.set_shader(ShaderKind::Gouraud);
        assert!(!viewer.renderer.shadows_enabled());
        let mut snap = Snapshot::default();
        let stats = viewer.render(&mut snap);
        assert!(stats.shadow.is_none());
        assert!(stats.main.pixels_written > 0);

        viewer.set_shader(ShaderKind::TextureWithShadow);
        let stats = viewer.render(&mut snap);
        assert!(stats.shadow.is_some());
        assert_eq!(snap.frames, 2);
    }

    #[test]
    fn test_turntable_only_when_enabled() {
        let mut viewer = demo_viewer();
        let start = viewer.orbit.azimuth;
        viewer.tick(1.0);
        assert_eq!(viewer.orbit.azimuth, start);
        viewer.auto_rotate = true;
        viewer.tick(1.0);
        assert_ne!(viewer.orbit.azimuth, start);
    }

    #[test]
    fn test_status_line() {
        let mut viewer = demo_viewer();
        viewer.toggle_wireframe();
        viewer.set_shader(ShaderKind::Phong);
        assert_eq!(
            viewer.status_line(59),
            "fps: 59  shader: phong  shadows: off  wireframe: on  rotate: off  light: (1.0, 3.0, 1.5)  specular: 1000"
        );
    }

    #[test]
    fn test_reset_camera_restores_start() {
        let mut viewer = demo_viewer();
        let start = viewer.orbit;
        viewer.drag(120.0, -40.0);
        viewer.zoom(3.0);
        assert_ne!(viewer.orbit, start);
        viewer.reset_camera();
        assert_eq!(viewer.orbit, start);
    }

    #[test]
    fn test_move_light() {
        let mut viewer = demo_viewer();
        viewer.move_light(Vec3::new(-1.0, 0.5, 0.0));
        assert_eq!(viewer.light(), Some(Vec3::new(0.0, 3.5, 1.5)));

        // The shadow camera follows the moved light
        let mut snap = Snapshot::default();
        assert!(viewer.render(&mut snap).shadow.is_some());
        assert_eq!(viewer.renderer.light_camera().position, Vec3::new(0.0, 3.5, 1.5));
    }

    #[test]
    fn test_move_light_adds_missing_light() {
        let mut file = SceneFile::demo();
        file.lights.clear();
        let scene = file.build(Path::new("."), 48, 32).unwrap();
        let mut viewer = Viewer::new(scene, file.render);
        assert!(!viewer.renderer.shadows_enabled());

        viewer.move_light(Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(viewer.scene.lights(), &[Vec3::new(0.0, 2.0, 0.0)]);
        assert!(viewer.renderer.shadows_enabled());
    }

    #[test]
    fn test_specular_is_clamped() {
        let mut viewer = demo_viewer();
        viewer.scale_specular(0.5);
        assert_eq!(viewer.renderer.config().specular_exponent, 500.0);
        viewer.scale_specular(1000.0);
        assert_eq!(viewer.renderer.config().specular_exponent, SPECULAR_RANGE.1);
        viewer.scale_specular(0.0);
        assert_eq!(viewer.renderer.config().specular_exponent, SPECULAR_RANGE.0);
    }

    #[test]
    fn test_letterbox_keeps_aspect() {
        // Wide window: bars left and right
        assert_eq!(letterbox(1000.0, 480.0, 640, 480), (180.0, 0.0, 640.0, 480.0));
        // Tall window: bars top and bottom
        assert_eq!(letterbox(320.0, 480.0, 640, 480), (0.0, 120.0, 320.0, 240.0));
        assert_eq!(letterbox(1280.0, 960.0, 640, 480), (0.0, 0.0, 1280.0, 960.0));
        assert_eq!(letterbox(100.0, 100.0, 0, 10), (0.0, 0.0, 0.0, 0.0));
    }
}

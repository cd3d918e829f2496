//! Look-at camera producing view, projection and viewport matrices

use glam::{Mat4, Vec3};

use super::math::mat4_from_rows;

/// World up used to derive the camera's up vector
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Below this the gaze is treated as parallel to `WORLD_UP`
const PARALLEL_EPSILON: f32 = 1e-6;

/// Camera state
///
/// `gaze` and `up` are unit length and orthogonal after every `look_at`
/// (unless eye == target, which leaves `gaze` zero).
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub gaze: Vec3,
    pub up: Vec3,
    /// Distance from position to the look-at target
    pub distance: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
    /// Canvas size in pixels
    pub width: usize,
    pub height: usize,
}

impl Camera {
    pub const DEFAULT_FOV: f32 = 45.0;
    pub const DEFAULT_NEAR: f32 = 0.2;
    pub const DEFAULT_FAR: f32 = 5.0;

    pub fn new(eye: Vec3, target: Vec3, width: usize, height: usize) -> Self {
        let mut cam = Self {
            position: eye,
            gaze: Vec3::NEG_Z,
            up: WORLD_UP,
            distance: 0.0,
            fov: Self::DEFAULT_FOV,
            aspect_ratio: width as f32 / height.max(1) as f32,
            near: Self::DEFAULT_NEAR,
            far: Self::DEFAULT_FAR,
            width,
            height,
        };
        cam.look_at(eye, target);
        cam
    }

    /// Replace field of view (degrees) and clip planes
    pub fn with_lens(mut self, fov: f32, near: f32, far: f32) -> Self {
        self.fov = fov;
        self.near = near;
        self.far = far;
        self
    }

    pub fn look_at(&mut self, eye: Vec3, target: Vec3) {
        let to_target = target - eye;
        self.position = eye;
        self.gaze = to_target.normalize_or_zero();
        self.distance = to_target.length();

        let mut up = WORLD_UP - self.gaze * self.gaze.dot(WORLD_UP);
        if up.length_squared() < PARALLEL_EPSILON {
            // Looking straight up or down: orthogonalize against -Z instead
            up = Vec3::NEG_Z - self.gaze * self.gaze.dot(Vec3::NEG_Z);
        }
        self.up = up.normalize_or_zero();
    }

    /// Place the camera on a sphere around `target`.
    /// `azimuth` is measured in the XZ plane, `elevation` from it (radians).
    pub fn orbit(&mut self, target: Vec3, distance: f32, azimuth: f32, elevation: f32) {
        let (sin_el, cos_el) = elevation.sin_cos();
        let (sin_az, cos_az) = azimuth.sin_cos();
        let eye = target + Vec3::new(cos_el * cos_az, sin_el, cos_el * sin_az) * distance;
        self.look_at(eye, target);
    }

    pub fn target(&self) -> Vec3 {
        self.position + self.gaze * self.distance
    }

    pub fn right(&self) -> Vec3 {
        self.gaze.cross(self.up).normalize_or_zero()
    }

    /// World space to camera space; the camera looks down -Z
    pub fn view_matrix(&self) -> Mat4 {
        let z_axis = -self.gaze;
        let y_axis = self.up;
        let x_axis = self.right();

        let rotate = mat4_from_rows([
            [x_axis.x, x_axis.y, x_axis.z, 0.0],
            [y_axis.x, y_axis.y, y_axis.z, 0.0],
            [z_axis.x, z_axis.y, z_axis.z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        rotate * Mat4::from_translation(-self.position)
    }

    /// Camera space to clip space. w becomes -z; near maps to NDC z = +1
    /// and far to -1, so a larger depth value is closer.
    pub fn projection_matrix(&self) -> Mat4 {
        let cot = 1.0 / (self.fov.to_radians() / 2.0).tan();
        let range_inv = 1.0 / (self.far - self.near);
        let near_add_far = self.near + self.far;
        let near_mul_far = self.near * self.far;

        mat4_from_rows([
            [cot / self.aspect_ratio, 0.0, 0.0, 0.0],
            [0.0, cot, 0.0, 0.0],
            [0.0, 0.0, near_add_far * range_inv, 2.0 * near_mul_far * range_inv],
            [0.0, 0.0, -1.0, 0.0],
        ])
    }

    /// NDC to pixels, flipping Y so the image origin is top-left
    pub fn viewport_matrix(&self) -> Mat4 {
        let hw = self.width as f32 / 2.0;
        let hh = self.height as f32 / 2.0;
        mat4_from_rows([
            [hw, 0.0, 0.0, hw],
            [0.0, -hh, 0.0, hh],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn eyes() -> Vec<(Vec3, Vec3)> {
        vec![
            (Vec3::new(1.0, 1.0, 1.0), Vec3::ZERO),
            (Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO),
            (Vec3::new(-3.0, 0.5, 0.2), Vec3::new(1.0, 2.0, -1.0)),
            (Vec3::new(0.0, 4.0, 0.0), Vec3::ZERO),
            (Vec3::new(0.0, -2.0, 0.0), Vec3::ZERO),
        ]
    }

    #[test]
    fn test_look_at_basis_is_orthonormal() {
        for (eye, target) in eyes() {
            let cam = Camera::new(eye, target, 64, 64);
            assert!((cam.gaze.length() - 1.0).abs() < 1e-6, "gaze for {eye}");
            assert!((cam.up.length() - 1.0).abs() < 1e-6, "up for {eye}");
            assert!(cam.gaze.dot(cam.up).abs() < 1e-6, "orthogonal for {eye}");
            assert!((cam.distance - (target - eye).length()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_view_times_inverse_is_identity() {
        for (eye, target) in eyes() {
            let view = Camera::new(eye, target, 64, 64).view_matrix();
            assert!((view * view.inverse()).abs_diff_eq(Mat4::IDENTITY, 1e-5));
        }
    }

    #[test]
    fn test_view_looks_down_negative_z() {
        let cam = Camera::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.0, 1.0), 64, 64);
        let target = cam.view_matrix().transform_point3(cam.target());
        assert!(target.x.abs() < 1e-5 && target.y.abs() < 1e-5);
        assert!((target.z + cam.distance).abs() < 1e-5);
    }

    #[test]
    fn test_projection_depth_convention() {
        let cam = Camera::new(Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO, 64, 64).with_lens(90.0, 0.1, 10.0);
        let proj = cam.projection_matrix();
        let near = proj * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -10.0, 1.0);
        assert!((near.z / near.w - 1.0).abs() < 1e-5);
        assert!((far.z / far.w + 1.0).abs() < 1e-5);
        assert!((near.w - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_viewport_flips_y() {
        let cam = Camera::new(Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO, 100, 50);
        let vp = cam.viewport_matrix();
        let top_left = vp.transform_point3(Vec3::new(-1.0, 1.0, 0.0));
        let bottom_right = vp.transform_point3(Vec3::new(1.0, -1.0, 0.0));
        assert_eq!((top_left.x, top_left.y), (0.0, 0.0));
        assert_eq!((bottom_right.x, bottom_right.y), (100.0, 50.0));
    }

    #[test]
    fn test_orbit_keeps_target_and_distance() {
        let mut cam = Camera::new(Vec3::new(1.0, 1.0, 1.0), Vec3::ZERO, 64, 64);
        cam.orbit(Vec3::new(0.5, 0.0, 0.0), 3.0, 1.2, 0.4);
        assert!((cam.distance - 3.0).abs() < 1e-5);
        assert!((cam.target() - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-5);
    }
}

//! Pipeline math on top of glam
//!
//! Matrices are written row-major (as they appear on paper) and converted to
//! glam's column-major storage in one place.

use std::ops::{Add, Mul};

use glam::{Mat4, Vec3, Vec4};
use log::warn;

/// Denominators below this are treated as zero-area triangles.
pub const DEGENERATE_EPSILON: f32 = 1e-8;

/// Build a matrix from row-major rows.
pub fn mat4_from_rows(rows: [[f32; 4]; 4]) -> Mat4 {
    Mat4::from_cols_array_2d(&rows).transpose()
}

/// Inverse of `m`, or the zero matrix when `m` is singular.
///
/// Rendering never aborts on bad matrices; pixels derived from the zero
/// matrix are wrong but the frame still completes.
pub fn inverse_or_zero(m: &Mat4) -> Mat4 {
    let det = m.determinant();
    if det == 0.0 || !det.is_finite() {
        warn!("matrix is not invertible (det = {det}), using zero matrix");
        return Mat4::ZERO;
    }
    m.inverse()
}

/// A vertex after the homogeneous divide.
///
/// `inv_w` is kept alongside the divided position so attributes can be
/// interpolated perspective-correctly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub inv_w: f32,
}

impl ScreenPoint {
    /// Divide a homogeneous position by its w. Returns `None` for w == 0.
    pub fn from_homogeneous(v: Vec4) -> Option<Self> {
        if v.w == 0.0 || !v.w.is_finite() {
            return None;
        }
        let inv_w = 1.0 / v.w;
        Some(Self {
            x: v.x * inv_w,
            y: v.y * inv_w,
            z: v.z * inv_w,
            inv_w,
        })
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// Edge-function setup for one screen-space triangle.
///
/// The denominator is computed once; `weights` is then cheap per pixel.
#[derive(Debug, Clone, Copy)]
pub struct EdgeFunction {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    denom: f32,
    denom_inv: f32,
}

impl EdgeFunction {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let denom = (v1.y - v2.y) * (v0.x - v2.x) + (v2.x - v1.x) * (v0.y - v2.y);
        let guarded = if denom.abs() < DEGENERATE_EPSILON {
            DEGENERATE_EPSILON
        } else {
            denom
        };
        Self {
            x0: v0.x,
            y0: v0.y,
            x1: v1.x,
            y1: v1.y,
            x2: v2.x,
            y2: v2.y,
            denom,
            denom_inv: 1.0 / guarded,
        }
    }

    /// True if the triangle has (numerically) zero area.
    pub fn is_degenerate(&self) -> bool {
        self.denom.abs() < DEGENERATE_EPSILON
    }

    /// First weight only, for the cheap early reject.
    #[inline]
    pub fn w0(&self, px: f32, py: f32) -> f32 {
        ((self.y1 - self.y2) * (px - self.x2) + (self.x2 - self.x1) * (py - self.y2)) * self.denom_inv
    }

    /// Remaining weights given w0.
    #[inline]
    pub fn w1_w2(&self, w0: f32, px: f32, py: f32) -> (f32, f32) {
        let w1 =
            ((self.y2 - self.y0) * (px - self.x2) + (self.x0 - self.x2) * (py - self.y2)) * self.denom_inv;
        (w1, 1.0 - w0 - w1)
    }

    /// All three raw (screen-space) weights at `(px, py)`.
    pub fn weights(&self, px: f32, py: f32) -> Vec3 {
        let w0 = self.w0(px, py);
        let (w1, w2) = self.w1_w2(w0, px, py);
        Vec3::new(w0, w1, w2)
    }
}

/// Calculate barycentric coordinates for point p in triangle (v1, v2, v3)
/// Returns (-1, -1, -1) for a degenerate triangle
pub fn barycentric(p: Vec3, v1: Vec3, v2: Vec3, v3: Vec3) -> Vec3 {
    let edges = EdgeFunction::new(v1, v2, v3);
    if edges.is_degenerate() {
        return Vec3::splat(-1.0);
    }
    edges.weights(p.x, p.y)
}

/// Scale raw weights by each vertex's 1/w and renormalize to sum to 1.
pub fn perspective_correct(raw: Vec3, inv_w: Vec3) -> Vec3 {
    let scaled = raw * inv_w;
    let sum = scaled.x + scaled.y + scaled.z;
    if sum == 0.0 || !sum.is_finite() {
        return raw;
    }
    scaled / sum
}

/// Weighted sum of three per-vertex values.
#[inline]
pub fn interpolate<T>(bary: Vec3, values: [T; 3]) -> T
where
    T: Copy + Mul<f32, Output = T> + Add<Output = T>,
{
    values[0] * bary.x + values[1] * bary.y + values[2] * bary.z
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_barycentric_inside_sums_to_one() {
        let v1 = Vec3::new(0.0, 0.0, 0.0);
        let v2 = Vec3::new(10.0, 0.0, 0.0);
        let v3 = Vec3::new(5.0, 10.0, 0.0);
        let bc = barycentric(Vec3::new(5.0, 3.0, 0.0), v1, v2, v3);
        assert!(bc.x > 0.0 && bc.x < 1.0);
        assert!(bc.y > 0.0 && bc.y < 1.0);
        assert!(bc.z > 0.0 && bc.z < 1.0);
        assert!((bc.x + bc.y + bc.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_barycentric_at_vertex() {
        let v1 = Vec3::new(2.0, 1.0, 0.0);
        let v2 = Vec3::new(12.0, 3.0, 0.0);
        let v3 = Vec3::new(4.0, 9.0, 0.0);
        for (i, v) in [v1, v2, v3].into_iter().enumerate() {
            let bc = barycentric(v, v1, v2, v3).to_array();
            for (j, w) in bc.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((w - expected).abs() < 1e-5, "vertex {i} weight {j} = {w}");
            }
        }
    }

    #[test]
    fn test_barycentric_degenerate() {
        let a = Vec3::new(1.0, 1.0, 0.0);
        let bc = barycentric(Vec3::ZERO, a, a, Vec3::new(2.0, 2.0, 0.0));
        assert_eq!(bc, Vec3::splat(-1.0));
    }

    #[test]
    fn test_perspective_correct_uniform_w_is_identity() {
        let raw = Vec3::new(0.2, 0.3, 0.5);
        let bc = perspective_correct(raw, Vec3::splat(0.25));
        assert!((bc - raw).length() < 1e-6);
    }

    #[test]
    fn test_perspective_correct_favors_near_vertex() {
        let raw = Vec3::new(0.5, 0.5, 0.0);
        let bc = perspective_correct(raw, Vec3::new(1.0, 0.5, 1.0));
        assert!(bc.x > bc.y);
        assert!((bc.x + bc.y + bc.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_interpolate_vec2() {
        let uv = interpolate(
            Vec3::new(0.5, 0.25, 0.25),
            [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
        );
        assert!((uv - Vec2::new(0.25, 0.25)).length() < 1e-6);
    }

    #[test]
    fn test_inverse_or_zero() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let id = m * inverse_or_zero(&m);
        assert!(id.abs_diff_eq(Mat4::IDENTITY, 1e-6));
        let singular = mat4_from_rows([[1.0, 2.0, 3.0, 4.0]; 4]);
        assert_eq!(inverse_or_zero(&singular), Mat4::ZERO);
    }

    #[test]
    fn test_rows_are_row_major() {
        let m = mat4_from_rows([
            [1.0, 0.0, 0.0, 5.0],
            [0.0, 1.0, 0.0, 6.0],
            [0.0, 0.0, 1.0, 7.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        assert_eq!(m.transform_point3(Vec3::ZERO), Vec3::new(5.0, 6.0, 7.0));
    }

    #[test]
    fn test_homogeneous_divide() {
        let p = ScreenPoint::from_homogeneous(Vec4::new(2.0, 4.0, 1.0, 2.0)).unwrap();
        assert_eq!(p.to_vec3(), Vec3::new(1.0, 2.0, 0.5));
        assert_eq!(p.inv_w, 0.5);
        assert!(ScreenPoint::from_homogeneous(Vec4::new(1.0, 1.0, 1.0, 0.0)).is_none());
    }
}

//! Core rendering functions
//!
//! Frame: optional shadow pass into a depth-only buffer, main pass into the
//! color and depth buffers, present, then reset every buffer.
//! Triangle rasterization is bounding-box scan conversion with edge-function
//! barycentrics and perspective-correct attribute weights.

use std::ops::AddAssign;

use glam::Vec3;
use log::{debug, trace};

use super::camera::Camera;
use super::math::{perspective_correct, EdgeFunction, ScreenPoint};
use super::shader::{PassContext, Shader, ShadowMap, VertexOutput};
use super::types::{Color, RenderConfig};
use crate::world::{Model, Scene};

/// Color target: RGBA8, 4 bytes per pixel, row-major
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub pixels: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let mut fb = Self {
            pixels: vec![0; width * height * 4],
            width,
            height,
        };
        fb.clear(Color::NEUTRAL_GRAY);
        fb
    }

    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        self.view().pixel(x, y)
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            width: self.width,
            height: self.height,
            pixels: &self.pixels,
        }
    }
}

/// One `f32` per pixel; larger values are closer. Cleared to -inf.
#[derive(Debug, Clone)]
pub struct DepthBuffer {
    values: Vec<f32>,
    width: usize,
    height: usize,
}

impl DepthBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            values: vec![f32::NEG_INFINITY; width * height],
            width,
            height,
        }
    }

    pub fn clear(&mut self) {
        self.fill(f32::NEG_INFINITY);
    }

    pub fn fill(&mut self, value: f32) {
        self.values.fill(value);
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x < self.width && y < self.height {
            Some(self.values[y * self.width + x])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: usize, y: usize, z: f32) {
        if x < self.width && y < self.height {
            self.values[y * self.width + x] = z;
        }
    }

    /// Value of the texel containing the point `(x, y)`, if on the buffer
    pub fn sample(&self, x: f32, y: f32) -> Option<f32> {
        if !(x >= 0.0 && y >= 0.0) {
            return None;
        }
        self.get(x.floor() as usize, y.floor() as usize)
    }
}

/// A finished frame handed to the presenter
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub width: usize,
    pub height: usize,
    /// RGBA8, row-major, origin top-left
    pub pixels: &'a [u8],
}

impl FrameView<'_> {
    pub fn pixel(&self, x: usize, y: usize) -> Color {
        if x >= self.width || y >= self.height {
            return Color::BLACK;
        }
        let i = (y * self.width + x) * 4;
        Color::from_bytes([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]])
    }
}

/// Receives each completed frame before the buffers are reset
pub trait Present {
    fn present(&mut self, frame: FrameView<'_>);
}

impl<F: FnMut(FrameView<'_>)> Present for F {
    fn present(&mut self, frame: FrameView<'_>) {
        self(frame)
    }
}

/// Presenter that keeps a copy of the last frame
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
    /// Frames presented so far
    pub frames: usize,
}

impl Snapshot {
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            width: self.width,
            height: self.height,
            pixels: &self.pixels,
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Color {
        self.view().pixel(x, y)
    }

    /// Number of pixels matching `pred`
    pub fn count(&self, pred: impl Fn(Color) -> bool) -> usize {
        self.pixels
            .chunks_exact(4)
            .filter(|px| pred(Color::from_bytes([px[0], px[1], px[2], px[3]])))
            .count()
    }
}

impl Present for Snapshot {
    fn present(&mut self, frame: FrameView<'_>) {
        self.width = frame.width;
        self.height = frame.height;
        self.pixels.clear();
        self.pixels.extend_from_slice(frame.pixels);
        self.frames += 1;
    }
}

/// Counters for one pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    /// Triangles submitted to the vertex stage
    pub triangles: usize,
    /// Triangles dropped by the z-range reject
    pub rejected: usize,
    /// Zero-area triangles (nothing filled)
    pub degenerate: usize,
    /// Fragment stage invocations
    pub fragments: usize,
    /// Pixels whose depth (and color, if any) were written
    pub pixels_written: usize,
}

impl AddAssign for PassStats {
    fn add_assign(&mut self, rhs: Self) {
        self.triangles += rhs.triangles;
        self.rejected += rhs.rejected;
        self.degenerate += rhs.degenerate;
        self.fragments += rhs.fragments;
        self.pixels_written += rhs.pixels_written;
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// `None` when no shadow pass ran
    pub shadow: Option<PassStats>,
    pub main: PassStats,
}

/// Software renderer owning the frame, depth and shadow buffers
pub struct Renderer {
    frame: FrameBuffer,
    depth: DepthBuffer,
    shadow_depth: DepthBuffer,
    light_camera: Camera,
    shadows: bool,
    config: RenderConfig,
}

impl Renderer {
    pub fn new(width: usize, height: usize, shadows: bool) -> Self {
        Self {
            frame: FrameBuffer::new(width, height),
            depth: DepthBuffer::new(width, height),
            shadow_depth: DepthBuffer::new(width, height),
            light_camera: Camera::new(Vec3::ONE, Vec3::ZERO, width, height),
            shadows,
            config: RenderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn width(&self) -> usize {
        self.frame.width
    }

    pub fn height(&self) -> usize {
        self.frame.height
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Settings take effect from the next `render` call
    pub fn config_mut(&mut self) -> &mut RenderConfig {
        &mut self.config
    }

    pub fn shadows_enabled(&self) -> bool {
        self.shadows
    }

    pub fn set_shadows(&mut self, shadows: bool) {
        self.shadows = shadows;
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn depth(&self) -> &DepthBuffer {
        &self.depth
    }

    pub fn shadow_depth(&self) -> &DepthBuffer {
        &self.shadow_depth
    }

    /// Camera used by the most recent shadow pass
    pub fn light_camera(&self) -> &Camera {
        &self.light_camera
    }

    /// Render one frame of `scene`, hand it to `target`, then reset the buffers.
    pub fn render<P: Present + ?Sized>(&mut self, scene: &Scene, target: &mut P) -> FrameStats {
        let light = scene.lights().first().copied();

        let shadow = match light {
            Some(light_pos) if self.shadows => {
                self.light_camera.look_at(light_pos, Vec3::ZERO);
                Some(self.shadow_pass(scene))
            }
            _ => None,
        };

        let main = self.main_pass(scene, light, shadow.is_some());
        let stats = FrameStats { shadow, main };

        target.present(self.frame.view());
        self.clear();

        trace!("frame: {:?}", stats);
        stats
    }

    fn shadow_pass(&mut self, scene: &Scene) -> PassStats {
        debug!("shadow pass: {} models from {:?}", scene.models().len(), self.light_camera.position);

        let mut stats = PassStats::default();
        let mut band = Band::depth_only(self.frame.width, &mut self.shadow_depth.values);
        for model in scene.models() {
            let shader = Shader::depth_only(model, &self.light_camera);
            draw_model(&mut band, model, &shader, &self.config, &mut stats);
        }
        stats
    }

    fn main_pass(&mut self, scene: &Scene, light: Option<Vec3>, with_shadow: bool) -> PassStats {
        let ctx = PassContext {
            camera: scene.camera(),
            light,
            shadow: with_shadow.then_some(ShadowMap {
                camera: &self.light_camera,
                depth: &self.shadow_depth,
            }),
            config: &self.config,
        };

        let mut stats = PassStats::default();
        let mut band = Band::color(self.frame.width, &mut self.frame.pixels, &mut self.depth.values);
        for model in scene.models() {
            let shader = Shader::bind(model.shader(), model, &ctx);
            draw_model(&mut band, model, &shader, &self.config, &mut stats);
        }
        stats
    }

    fn clear(&mut self) {
        self.depth.clear();
        self.frame.clear(Color::NEUTRAL_GRAY);
        if self.shadows {
            self.shadow_depth.clear();
        }
    }
}

/// A horizontal strip of the render target: rows `y_start..y_start + rows`
struct Band<'a> {
    width: usize,
    y_start: usize,
    rows: usize,
    /// `None` for depth-only passes
    color: Option<&'a mut [u8]>,
    depth: &'a mut [f32],
}

impl<'a> Band<'a> {
    fn color(width: usize, color: &'a mut [u8], depth: &'a mut [f32]) -> Self {
        let rows = if width == 0 { 0 } else { depth.len() / width };
        Self {
            width,
            y_start: 0,
            rows,
            color: Some(color),
            depth,
        }
    }

    fn depth_only(width: usize, depth: &'a mut [f32]) -> Self {
        let rows = if width == 0 { 0 } else { depth.len() / width };
        Self {
            width,
            y_start: 0,
            rows,
            color: None,
            depth,
        }
    }

    /// Canvas height this band belongs to (only meaningful for the full target)
    fn canvas_height(&self) -> usize {
        self.y_start + self.rows
    }

    /// Split into at most `count` disjoint bands of whole rows
    fn split(&mut self, count: usize) -> Vec<Band<'_>> {
        let rows_per_band = self.rows.div_ceil(count.clamp(1, self.rows.max(1)));
        let depth_chunks = self.depth.chunks_mut(rows_per_band * self.width);

        let color_chunks: Vec<Option<&mut [u8]>> = match self.color.as_deref_mut() {
            Some(color) => color.chunks_mut(rows_per_band * self.width * 4).map(Some).collect(),
            None => std::iter::repeat_with(|| None).take(self.rows.div_ceil(rows_per_band)).collect(),
        };

        depth_chunks
            .zip(color_chunks)
            .enumerate()
            .map(|(i, (depth, color))| Band {
                width: self.width,
                y_start: self.y_start + i * rows_per_band,
                rows: depth.len() / self.width,
                color,
                depth,
            })
            .collect()
    }

    #[inline]
    fn contains_row(&self, y: usize) -> bool {
        y >= self.y_start && y < self.y_start + self.rows
    }

    /// Wireframe pixel: full opacity, +inf depth so the fill never covers it
    fn plot_line_pixel(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x as usize >= self.width || !self.contains_row(y as usize) {
            return;
        }
        let idx = (y as usize - self.y_start) * self.width + x as usize;
        self.depth[idx] = f32::INFINITY;
        if let Some(pixels) = self.color.as_deref_mut() {
            pixels[idx * 4..idx * 4 + 4].copy_from_slice(&color.to_bytes());
        }
    }

    /// Line with steep-axis swap, clipped to the canvas.
    /// Endpoints stay in `f64` until clipped, so far off-canvas lines cannot overflow.
    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), canvas_height: usize, color: Color) {
        let (mut x0, mut y0) = (f64::from(from.0).round(), f64::from(from.1).round());
        let (mut x1, mut y1) = (f64::from(to.0).round(), f64::from(to.1).round());

        let steep = (y1 - y0).abs() > (x1 - x0).abs();
        if steep {
            std::mem::swap(&mut x0, &mut y0);
            std::mem::swap(&mut x1, &mut y1);
        }
        if x0 > x1 {
            std::mem::swap(&mut x0, &mut x1);
            std::mem::swap(&mut y0, &mut y1);
        }

        let major_limit = if steep { canvas_height } else { self.width } as f64;
        if x1 < 0.0 || x0 > major_limit - 1.0 {
            return;
        }

        let slope = if x1 == x0 { 0.0 } else { (y1 - y0) / (x1 - x0) };
        let start = x0.max(0.0) as i64;
        let end = x1.min(major_limit - 1.0) as i64;

        for x in start..=end {
            // Saturating cast; off-canvas minors are dropped by the plot
            let y = (y0 + slope * (x as f64 - x0)).round() as i64;
            if steep {
                self.plot_line_pixel(y, x, color);
            } else {
                self.plot_line_pixel(x, y, color);
            }
        }
    }
}

/// A triangle after the vertex stage, ready to scan-convert
struct ScreenTriangle {
    face: usize,
    varyings: [VertexOutput; 3],
    points: [ScreenPoint; 3],
    edges: EdgeFunction,
    /// Inclusive pixel bounds clamped to the canvas; `None` if off-canvas
    bounds: Option<(usize, usize, usize, usize)>,
}

impl ScreenTriangle {
    /// Divide, reject on NDC z outside [-1, 1], and precompute the edge setup.
    fn new(face: usize, varyings: [VertexOutput; 3], width: usize, height: usize) -> Option<Self> {
        let mut points = [ScreenPoint { x: 0.0, y: 0.0, z: 0.0, inv_w: 0.0 }; 3];
        for (point, v) in points.iter_mut().zip(&varyings) {
            let p = ScreenPoint::from_homogeneous(v.position)?;
            if !(p.x.is_finite() && p.y.is_finite()) || !(-1.0..=1.0).contains(&p.z) {
                return None;
            }
            *point = p;
        }

        let edges = EdgeFunction::new(points[0].to_vec3(), points[1].to_vec3(), points[2].to_vec3());

        let xs = [points[0].x, points[1].x, points[2].x];
        let ys = [points[0].y, points[1].y, points[2].y];
        let min_x = xs.iter().copied().fold(f32::INFINITY, f32::min).floor().max(0.0);
        let max_x = xs.iter().copied().fold(f32::NEG_INFINITY, f32::max).ceil().min(width as f32 - 1.0);
        let min_y = ys.iter().copied().fold(f32::INFINITY, f32::min).floor().max(0.0);
        let max_y = ys.iter().copied().fold(f32::NEG_INFINITY, f32::max).ceil().min(height as f32 - 1.0);

        let bounds = (min_x <= max_x && min_y <= max_y)
            .then(|| (min_x as usize, max_x as usize, min_y as usize, max_y as usize));

        Some(Self {
            face,
            varyings,
            points,
            edges,
            bounds,
        })
    }
}

/// Run the vertex stage for one face and set up its screen triangle
fn shade_face(
    model: &Model,
    shader: &Shader<'_>,
    face: usize,
    width: usize,
    height: usize,
    stats: &mut PassStats,
) -> Option<ScreenTriangle> {
    stats.triangles += 1;
    let varyings = [0, 1, 2].map(|slot| shader.vertex(face, slot, model.vertex(face, slot)));

    let Some(tri) = ScreenTriangle::new(face, varyings, width, height) else {
        stats.rejected += 1;
        return None;
    };
    if tri.edges.is_degenerate() {
        stats.degenerate += 1;
    }
    Some(tri)
}

/// Draw every face of `model`, serially or split into row bands
fn draw_model(band: &mut Band<'_>, model: &Model, shader: &Shader<'_>, config: &RenderConfig, stats: &mut PassStats) {
    let (width, height) = (band.width, band.canvas_height());
    if width == 0 || height == 0 {
        return;
    }

    if config.workers <= 1 {
        for face in 0..model.face_count() {
            if let Some(tri) = shade_face(model, shader, face, width, height, stats) {
                rasterize_triangle(band, &tri, shader, config, height, stats);
            }
        }
        return;
    }

    let triangles: Vec<ScreenTriangle> = (0..model.face_count())
        .filter_map(|face| shade_face(model, shader, face, width, height, stats))
        .collect();
    let triangles = &triangles;

    let mut bands = band.split(config.workers);
    let band_stats: Vec<PassStats> = std::thread::scope(|scope| {
        let handles: Vec<_> = bands
            .iter_mut()
            .map(|band| {
                scope.spawn(move || {
                    let mut local = PassStats::default();
                    for tri in triangles {
                        rasterize_triangle(band, tri, shader, config, height, &mut local);
                    }
                    local
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(local) => local,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    for local in band_stats {
        stats.fragments += local.fragments;
        stats.pixels_written += local.pixels_written;
    }
}

/// Scan-convert one triangle into the rows covered by `band`
fn rasterize_triangle(
    band: &mut Band<'_>,
    tri: &ScreenTriangle,
    shader: &Shader<'_>,
    config: &RenderConfig,
    canvas_height: usize,
    stats: &mut PassStats,
) {
    let [p0, p1, p2] = tri.points;

    if config.wireframe && band.color.is_some() {
        let c = config.wireframe_color;
        band.draw_line((p0.x, p0.y), (p1.x, p1.y), canvas_height, c);
        band.draw_line((p1.x, p1.y), (p2.x, p2.y), canvas_height, c);
        band.draw_line((p2.x, p2.y), (p0.x, p0.y), canvas_height, c);
    }

    if tri.edges.is_degenerate() {
        return;
    }
    let Some((min_x, max_x, min_y, max_y)) = tri.bounds else {
        return;
    };

    if band.rows == 0 {
        return;
    }
    let y_lo = min_y.max(band.y_start);
    let y_hi = max_y.min(band.y_start + band.rows - 1);
    if y_lo > y_hi {
        return;
    }

    let inv_w = Vec3::new(p0.inv_w, p1.inv_w, p2.inv_w);

    for y in y_lo..=y_hi {
        let row = (y - band.y_start) * band.width;
        let py = y as f32 + 0.5;

        for x in min_x..=max_x {
            let px = x as f32 + 0.5;

            let w0 = tri.edges.w0(px, py);
            if w0 < 0.0 {
                continue;
            }
            let (w1, w2) = tri.edges.w1_w2(w0, px, py);
            if w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            // Depth is interpolated linearly in screen space
            let z = w0 * p0.z + w1 * p1.z + w2 * p2.z;
            let bary = perspective_correct(Vec3::new(w0, w1, w2), inv_w);

            let idx = row + x;
            if band.depth[idx] >= z {
                continue;
            }

            match band.color.as_deref_mut() {
                None => {
                    // Depth-only pass: depth is written before the fragment stage
                    band.depth[idx] = z;
                    stats.pixels_written += 1;
                    stats.fragments += 1;
                    let _ = shader.fragment(tri.face, &tri.varyings, bary);
                }
                Some(pixels) => {
                    stats.fragments += 1;
                    if let Some(color) = shader.fragment(tri.face, &tri.varyings, bary) {
                        band.depth[idx] = z;
                        pixels[idx * 4..idx * 4 + 4].copy_from_slice(&color.to_bytes());
                        stats.pixels_written += 1;
                    }
                }
            }
        }
    }
}

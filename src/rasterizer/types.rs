//! Core types for the rasterizer

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::AssetError;

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };
    /// Frame buffer fill after every frame
    pub const NEUTRAL_GRAY: Color = Color { r: 130, g: 130, b: 130, a: 255 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque gray from an intensity in 0.0-1.0 (clamped)
    pub fn gray(intensity: f32) -> Self {
        Self::WHITE.shade(intensity)
    }

    /// Apply shading (multiply by intensity 0.0-1.0)
    pub fn shade(self, intensity: f32) -> Self {
        let i = intensity.clamp(0.0, 1.0);
        Self {
            r: (self.r as f32 * i) as u8,
            g: (self.g as f32 * i) as u8,
            b: (self.b as f32 * i) as u8,
            a: self.a,
        }
    }

    pub fn opaque(self) -> Self {
        Self { a: 255, ..self }
    }

    /// Convert to [u8; 4] for framebuffer
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self::with_alpha(bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

/// Decoded texture: packed RGBA8, row-major, origin top-left
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
    pub name: String,
}

impl Texture {
    /// Wrap an RGBA buffer. Fails if the buffer does not hold `width * height` pixels.
    pub fn from_rgba(width: usize, height: usize, data: Vec<u8>, name: &str) -> Result<Self, AssetError> {
        if width == 0 || height == 0 || data.len() != width * height * 4 {
            return Err(AssetError::TextureSize {
                name: name.to_string(),
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
            name: name.to_string(),
        })
    }

    /// Single-color texture of the given size
    pub fn solid(width: usize, height: usize, color: Color) -> Self {
        let data = color.to_bytes().repeat(width * height);
        Self {
            width,
            height,
            data,
            name: "solid".to_string(),
        }
    }

    /// Create a checkerboard test texture
    pub fn checkerboard(width: usize, height: usize, color1: Color, color2: Color) -> Self {
        let mut data = Vec::with_capacity(width * height * 4);
        for y in 0..height {
            for x in 0..width {
                let checker = ((x / 4) + (y / 4)) % 2 == 0;
                let c = if checker { color1 } else { color2 };
                data.extend_from_slice(&c.to_bytes());
            }
        }
        Self { width, height, data, name: "checkerboard".to_string() }
    }

    /// Load texture from an image file (PNG, JPEG, BMP)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        info!("Loaded texture: {} ({}x{})", name, width, height);
        Self::from_rgba(width as usize, height as usize, rgba.into_raw(), &name)
    }

    /// Nearest-texel lookup. Coordinates outside [0, 1] give opaque black.
    pub fn sample(&self, u: f32, v: f32) -> Color {
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) || self.data.is_empty() {
            return Color::BLACK;
        }
        let tx = ((u * self.width as f32).floor() as usize).min(self.width - 1);
        let ty = (((1.0 - v) * self.height as f32).floor() as usize).min(self.height - 1);
        self.get_pixel(tx, ty)
    }

    /// Get pixel at x,y coordinates
    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        if x < self.width && y < self.height {
            let i = (y * self.width + x) * 4;
            Color::from_bytes([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
        } else {
            Color::BLACK
        }
    }
}

/// Renderer settings, fixed for the duration of a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Added to the fragment's shadow-space depth before comparing with the shadow buffer
    pub shadow_bias: f32,
    /// Exponent applied to the Blinn-Phong specular term
    pub specular_exponent: f32,
    /// Draw triangle edges on top of the fill
    pub wireframe: bool,
    pub wireframe_color: Color,
    /// Row bands rasterized in parallel during the main pass (1 = serial)
    pub workers: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            shadow_bias: 0.0015,
            specular_exponent: 1000.0,
            wireframe: false,
            wireframe_color: Color::RED,
            workers: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_texture() -> Texture {
        // 2x2: red green / blue white
        let mut data = Vec::new();
        for c in [Color::RED, Color::GREEN, Color::BLUE, Color::WHITE] {
            data.extend_from_slice(&c.to_bytes());
        }
        Texture::from_rgba(2, 2, data, "quad").unwrap()
    }

    #[test]
    fn test_sample_origin_is_top_left() {
        let tex = quad_texture();
        // v = 1 is the top row
        assert_eq!(tex.sample(0.1, 0.9), Color::RED);
        assert_eq!(tex.sample(0.9, 0.9), Color::GREEN);
        assert_eq!(tex.sample(0.1, 0.1), Color::BLUE);
        assert_eq!(tex.sample(0.9, 0.1), Color::WHITE);
    }

    #[test]
    fn test_sample_edges_stay_in_bounds() {
        let tex = quad_texture();
        assert_eq!(tex.sample(1.0, 0.0), Color::WHITE);
        assert_eq!(tex.sample(0.0, 1.0), Color::RED);
    }

    #[test]
    fn test_sample_out_of_range_is_black() {
        let tex = Texture::solid(4, 4, Color::GREEN);
        assert_eq!(tex.sample(-0.01, 0.5), Color::BLACK);
        assert_eq!(tex.sample(0.5, 1.01), Color::BLACK);
        assert_eq!(tex.sample(f32::NAN, 0.5), Color::BLACK);
    }

    #[test]
    fn test_sample_is_idempotent() {
        let tex = Texture::checkerboard(16, 16, Color::WHITE, Color::BLUE);
        for &(u, v) in &[(0.13, 0.77), (0.5, 0.5), (0.99, 0.01)] {
            assert_eq!(tex.sample(u, v), tex.sample(u, v));
        }
    }

    #[test]
    fn test_from_rgba_rejects_short_buffer() {
        assert!(Texture::from_rgba(2, 2, vec![0; 15], "bad").is_err());
    }

    #[test]
    fn test_shade_truncates_and_keeps_alpha() {
        let c = Color::with_alpha(200, 100, 51, 7).shade(0.5);
        assert_eq!(c, Color::with_alpha(100, 50, 25, 7));
        assert_eq!(Color::gray(2.0), Color::WHITE);
        assert_eq!(Color::gray(-1.0), Color::BLACK);
    }
}

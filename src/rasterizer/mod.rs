//! Software rasterizer
//!
//! Features:
//! - Look-at camera with perspective projection
//! - Five shader variants behind one closed `ShaderKind` enum
//! - Perspective-correct attribute interpolation
//! - Z-buffer where larger depth is closer
//! - Shadow mapping from the first scene light
//! - Optional row-band parallelism with identical output

mod camera;
mod math;
mod render;
mod shader;
mod types;

pub use camera::*;
pub use math::*;
pub use render::*;
pub use shader::*;
pub use types::*;

/// Default canvas size
pub const WIDTH: usize = 640;
pub const HEIGHT: usize = 480;

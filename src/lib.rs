//! Tiny Renderer: a software rasterizer with programmable shading
//!
//! The pipeline runs entirely on the CPU:
//! - Look-at camera, perspective projection, viewport mapping
//! - Edge-function triangle rasterization with a depth buffer
//! - Depth, texture, Gouraud, Phong and shadow-mapped shaders
//! - Two-pass shadow mapping from the first light
//!
//! ```no_run
//! use tiny_renderer::rasterizer::{Renderer, Snapshot};
//! use tiny_renderer::world::SceneFile;
//!
//! let scene = SceneFile::demo().build(std::path::Path::new("."), 320, 240)?;
//! let mut renderer = Renderer::new(320, 240, scene.wants_shadows());
//! let mut frame = Snapshot::default();
//! renderer.render(&scene, &mut frame);
//! # Ok::<(), tiny_renderer::error::AssetError>(())
//! ```

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod rasterizer;
pub mod world;

pub use error::AssetError;
pub use rasterizer::{Camera, Color, RenderConfig, Renderer, ShaderKind, Texture};
pub use world::{Model, Scene, SceneFile};

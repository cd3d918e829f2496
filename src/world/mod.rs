//! World module - models, scenes and the files they come from
//!
//! - Triangle meshes with textures and a shader assignment
//! - Scenes: ordered models, lights and a camera
//! - OBJ meshes and RON scene descriptions

mod level;
mod model;
mod obj;
mod scene;

pub use level::*;
pub use model::*;
pub use obj::*;
pub use scene::*;

//! Load-time failures
//!
//! Everything that can go wrong before a frame is rendered surfaces here.
//! The pipeline itself never returns errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("texture {name} is {width}x{height} but holds {len} bytes")]
    TextureSize {
        name: String,
        width: usize,
        height: usize,
        len: usize,
    },

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("{kind} index {index} out of range ({len} available) in face {face}")]
    InvalidIndex {
        kind: &'static str,
        face: usize,
        index: usize,
        len: usize,
    },

    #[error("scene file error: {0}")]
    SceneParse(#[from] ron::error::SpannedError),

    #[error("scene serialize error: {0}")]
    SceneSerialize(#[from] ron::Error),
}

impl AssetError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AssetError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        AssetError::Parse {
            line,
            message: message.into(),
        }
    }
}

//! Error types for terrain generation and streaming

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Height field is {width}x{height}, mesh settings expect {expected}x{expected}")]
    ShapeMismatch {
        expected: usize,
        width: usize,
        height: usize,
    },

    #[error("Unsupported level of detail {0} (supported: 0..={max})", max = crate::mesh::MAX_LOD)]
    InvalidLevelOfDetail(u32),

    #[error("Streaming error: {0}")]
    Streaming(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

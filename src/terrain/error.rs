//! Error type shared by every terrain operation.

use thiserror::Error;

/// Errors surfaced by grid access, parameter validation and settings loading.
///
/// A failed operation never leaves a grid half-written: the working buffer is
/// only committed once every cell has been computed.
#[derive(Error, Debug)]
pub enum TerrainError {
    #[error(
        "Dimension mismatch: grid is {expected_width}x{expected_height}, matrix is {width}x{height}"
    )]
    DimensionMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Index {index} out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),
}

impl TerrainError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type TerrainResult<T> = Result<T, TerrainError>;

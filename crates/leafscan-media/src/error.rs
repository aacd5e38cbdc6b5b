//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during image processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Frame has no pixels ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("Crop rectangle outside image bounds: {message}")]
    CropOutOfBounds { message: String },

    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Font error: {0}")]
    Font(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create a crop bounds error.
    pub fn crop_out_of_bounds(message: impl Into<String>) -> Self {
        Self::CropOutOfBounds {
            message: message.into(),
        }
    }
}

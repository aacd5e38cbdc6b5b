//! Video frame container.

use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use leafscan_models::Size;

use crate::error::{MediaError, MediaResult};

/// A single RGBA frame.
///
/// Pixel data is shared, so clones handed to the render and inference loops
/// do not copy the buffer.
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<RgbaImage>,
}

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// A zero-sized frame, as reported by a stream whose video is not loaded yet.
    pub fn empty() -> Self {
        Self::new(RgbaImage::new(0, 0))
    }

    /// Build a frame from packed RGB24 pixels.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> MediaResult<Self> {
        let rgb = image::RgbImage::from_raw(width, height, pixels)
            .ok_or(MediaError::EmptyFrame { width, height })?;
        Ok(Self::new(DynamicImage::ImageRgb8(rgb).to_rgba8()))
    }

    /// Decode an encoded image (JPEG, PNG, ...).
    pub fn decode(bytes: &[u8]) -> MediaResult<Self> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self::new(image.to_rgba8()))
    }

    pub fn open(path: &Path) -> MediaResult<Self> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        Ok(Self::new(image::open(path)?.to_rgba8()))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> Size {
        Size::from_pixels(self.width(), self.height())
    }

    /// True while either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.image.as_ref().clone())
    }
}

impl From<RgbaImage> for Frame {
    fn from(image: RgbaImage) -> Self {
        Self::new(image)
    }
}

//! Crop extraction for still-image submissions.

use image::DynamicImage;
use leafscan_models::{CropRect, PixelRect, Size};
use tracing::debug;

use crate::encode::{encode_jpeg, EncodedImage};
use crate::error::{MediaError, MediaResult};

/// JPEG quality used for cropped uploads.
pub const CROP_JPEG_QUALITY: u8 = 95;

/// Extract `region` (natural image coordinates) from `image`.
///
/// Fractional coordinates are rounded to the nearest pixel; the region must
/// lie inside the image.
pub fn crop_natural(image: &DynamicImage, region: PixelRect) -> MediaResult<DynamicImage> {
    let natural = Size::from_pixels(image.width(), image.height());
    if !region.is_within(natural) {
        return Err(MediaError::crop_out_of_bounds(format!(
            "{:?} does not fit {}",
            region, natural
        )));
    }

    let x = region.x.round() as u32;
    let y = region.y.round() as u32;
    let width = (region.width.round() as u32).min(image.width() - x);
    let height = (region.height.round() as u32).min(image.height() - y);

    if width == 0 || height == 0 {
        return Err(MediaError::EmptyFrame { width, height });
    }

    debug!(x, y, width, height, "Cropping image");
    Ok(image.crop_imm(x, y, width, height))
}

/// Crop `image` with a rectangle drawn over its displayed size and encode
/// the result for upload.
pub fn crop_for_upload(
    image: &DynamicImage,
    crop: &CropRect,
    display: Size,
) -> MediaResult<EncodedImage> {
    let natural = Size::from_pixels(image.width(), image.height());
    let region = crop.to_natural(display, natural);
    let cropped = crop_natural(image, region)?;
    encode_jpeg(&cropped, CROP_JPEG_QUALITY)
}

//! JPEG and data-URL encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

pub const JPEG_MIME: &str = "image/jpeg";

/// An encoded image ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// `data:<mime>;base64,<payload>` form, as sent to the live endpoint.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    /// Parse a base64 data URL. A bare base64 payload without prefix is accepted.
    pub fn from_data_url(url: &str) -> MediaResult<Self> {
        let payload = match url.split_once(',') {
            Some((header, payload)) => {
                if !header.starts_with("data:") || !header.ends_with(";base64") {
                    return Err(MediaError::InvalidDataUrl(header.to_string()));
                }
                payload
            }
            None => url,
        };

        let bytes = STANDARD.decode(payload)?;
        let frame = Frame::decode(&bytes)?;
        Ok(Self {
            bytes,
            mime: JPEG_MIME,
            width: frame.width(),
            height: frame.height(),
        })
    }
}

/// Encode an image as JPEG. `quality` is 1-100.
///
/// Alpha is discarded; JPEG carries RGB only.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> MediaResult<EncodedImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(MediaError::EmptyFrame {
            width: image.width(),
            height: image.height(),
        });
    }

    let rgb = image.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(&rgb)?;

    Ok(EncodedImage {
        bytes,
        mime: JPEG_MIME,
        width: rgb.width(),
        height: rgb.height(),
    })
}

impl Frame {
    /// Encode the frame for submission to the inference service.
    pub fn encode_jpeg(&self, quality: u8) -> MediaResult<EncodedImage> {
        if self.is_empty() {
            return Err(MediaError::EmptyFrame {
                width: self.width(),
                height: self.height(),
            });
        }
        encode_jpeg(&self.to_dynamic(), quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid(width: u32, height: u32) -> Frame {
        Frame::new(RgbaImage::from_pixel(width, height, Rgba([30, 160, 40, 255])))
    }

    #[test]
    fn test_jpeg_header() {
        let encoded = solid(32, 24).encode_jpeg(70).unwrap();
        assert_eq!(&encoded.bytes[..2], &[0xFF, 0xD8]);
        assert_eq!((encoded.width, encoded.height), (32, 24));
    }

    #[test]
    fn test_data_url_prefix_and_parse() {
        let encoded = solid(16, 16).encode_jpeg(70).unwrap();
        let url = encoded.to_data_url();
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let parsed = EncodedImage::from_data_url(&url).unwrap();
        assert_eq!(parsed.bytes, encoded.bytes);
        assert_eq!((parsed.width, parsed.height), (16, 16));
    }

    #[test]
    fn test_invalid_data_url() {
        assert!(matches!(
            EncodedImage::from_data_url("http://example.com,abc"),
            Err(MediaError::InvalidDataUrl(_))
        ));
    }

    #[test]
    fn test_empty_frame_rejected() {
        assert!(matches!(
            Frame::empty().encode_jpeg(70),
            Err(MediaError::EmptyFrame { .. })
        ));
    }
}

//! Inference request/response types.

use std::time::Duration;

use leafscan_media::EncodedImage;
use leafscan_models::DetectionResult;
use serde::{Deserialize, Serialize};

/// File name used for uncropped uploads.
pub const UPLOAD_FILE_NAME: &str = "image.jpg";
/// File name used for cropped uploads.
pub const CROPPED_FILE_NAME: &str = "cropped.jpg";

/// A still image to submit as the multipart `image` field.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: String,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            mime: mime.into(),
        }
    }

    pub fn original(image: EncodedImage) -> Self {
        Self::new(image.bytes, UPLOAD_FILE_NAME, image.mime)
    }

    pub fn cropped(image: EncodedImage) -> Self {
        Self::new(image.bytes, CROPPED_FILE_NAME, image.mime)
    }
}

/// A live camera frame, carried as a data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveFrame {
    pub data_url: String,
}

impl From<&EncodedImage> for LiveFrame {
    fn from(image: &EncodedImage) -> Self {
        Self {
            data_url: image.to_data_url(),
        }
    }
}

/// Result of a still-image submission.
#[derive(Debug, Clone)]
pub struct StillPrediction {
    pub result: DetectionResult,
    /// Client-side round trip time
    pub elapsed: Duration,
}

/// Error body returned by the service on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
}


//! Still-image upload flow.
//!
//! One image, an optional crop rectangle drawn over its displayed size, one
//! submission, and an annotated copy with the returned boxes scaled from
//! natural to display coordinates.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ab_glyph::FontArc;
use image::DynamicImage;
use leafscan_client::{ImageUpload, InferenceService};
use leafscan_media::{
    crop_for_upload, crop_natural, draw_detections, encode_jpeg, Canvas, Frame, MediaError,
    OverlayStyle, RasterCanvas,
};
use leafscan_models::{CropRect, DetectionResult, Scale, Size, TreatmentGuidance};
use metrics::counter;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{LiveError, LiveResult};
use crate::telemetry;

/// Bounding box the preview is fitted into.
pub const MAX_DISPLAY: Size = Size::new(500.0, 500.0);

/// JPEG quality of uncropped uploads.
const UPLOAD_JPEG_QUALITY: u8 = 95;

/// Outcome of one still-image submission.
pub struct StillOutcome {
    pub result: DetectionResult,
    /// Client-side round trip
    pub elapsed: Duration,
    pub guidance: Option<&'static TreatmentGuidance>,
    /// Natural size of the submitted image (after cropping)
    pub natural: Size,
    /// Size the annotated preview is drawn at
    pub display: Size,
    pub cropped: bool,
    /// Submitted image with the detection overlay
    pub annotated: RasterCanvas,
}

impl StillOutcome {
    pub fn summary(&self) -> StillSummary<'_> {
        StillSummary {
            predictions: &self.result,
            elapsed_ms: self.elapsed.as_millis() as u64,
            cropped: self.cropped,
            treatment: self.guidance,
        }
    }
}

/// Serializable view of a `StillOutcome`.
#[derive(Debug, Serialize)]
pub struct StillSummary<'a> {
    pub predictions: &'a DetectionResult,
    pub elapsed_ms: u64,
    pub cropped: bool,
    pub treatment: Option<&'static TreatmentGuidance>,
}

/// Submits still images to the inference service.
pub struct StillImageDetector {
    inference: Arc<dyn InferenceService>,
    font: Option<FontArc>,
    max_display: Size,
}

impl StillImageDetector {
    pub fn new(inference: Arc<dyn InferenceService>) -> Self {
        Self {
            inference,
            font: None,
            max_display: MAX_DISPLAY,
        }
    }

    /// Render label text with `font` on annotated previews.
    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_max_display(mut self, max_display: Size) -> Self {
        self.max_display = max_display;
        self
    }

    /// Size the preview of an image of `natural` size is shown at.
    pub fn display_size(&self, natural: Size) -> Size {
        natural.fit_within(self.max_display)
    }

    /// Load an image file and run `detect` on it.
    pub async fn detect_file(&self, path: &Path, crop: Option<&CropRect>) -> LiveResult<StillOutcome> {
        let owned: PathBuf = path.to_path_buf();
        let frame = tokio::task::spawn_blocking(move || Frame::open(&owned))
            .await
            .map_err(|e| LiveError::Io(std::io::Error::other(e)))??;

        debug!(path = %path.display(), width = frame.width(), height = frame.height(), "Loaded image");
        self.detect(&frame.to_dynamic(), crop).await
    }

    /// Submit `image`, cropped to `crop` when given.
    ///
    /// `crop` is in display coordinates of the uncropped image.
    pub async fn detect(&self, image: &DynamicImage, crop: Option<&CropRect>) -> LiveResult<StillOutcome> {
        let natural = Size::from_pixels(image.width(), image.height());
        if natural.is_empty() {
            return Err(MediaError::EmptyFrame {
                width: image.width(),
                height: image.height(),
            }
            .into());
        }

        let (submitted, upload) = match crop {
            Some(crop) => {
                let display = self.display_size(natural);
                let region = crop.to_natural(display, natural);
                let encoded = crop_for_upload(image, crop, display)?;
                (crop_natural(image, region)?, ImageUpload::cropped(encoded))
            }
            None => (image.clone(), ImageUpload::original(encode_jpeg(image, UPLOAD_JPEG_QUALITY)?)),
        };

        counter!(telemetry::INFERENCE_REQUESTS).increment(1);
        let prediction = self.inference.predict_image(upload).await.map_err(|e| {
            counter!(telemetry::INFERENCE_FAILURES).increment(1);
            e
        })?;

        let natural = Size::from_pixels(submitted.width(), submitted.height());
        let display = self.display_size(natural);
        let annotated = self.annotate(&submitted, natural, display, &prediction.result);
        let guidance = prediction.result.guidance();

        info!(
            detections = prediction.result.len(),
            elapsed_ms = prediction.elapsed.as_millis() as u64,
            cropped = crop.is_some(),
            treatment = guidance.map(|g| g.title).unwrap_or("none"),
            "Still image analyzed"
        );

        Ok(StillOutcome {
            result: prediction.result,
            elapsed: prediction.elapsed,
            guidance,
            natural,
            display,
            cropped: crop.is_some(),
            annotated,
        })
    }

    fn annotate(
        &self,
        image: &DynamicImage,
        natural: Size,
        display: Size,
        result: &DetectionResult,
    ) -> RasterCanvas {
        let mut canvas = RasterCanvas::new(
            display.width.round().max(1.0) as u32,
            display.height.round().max(1.0) as u32,
        );
        if let Some(font) = &self.font {
            canvas = canvas.with_font(font.clone());
        }

        canvas.draw_frame(&Frame::new(image.to_rgba8()));
        draw_detections(
            &mut canvas,
            result,
            Scale::between(natural, display),
            &OverlayStyle::STILL,
        );
        canvas
    }
}

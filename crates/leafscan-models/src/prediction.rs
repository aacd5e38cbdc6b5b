//! Prediction and detection result models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::disease::{Disease, TreatmentGuidance};
use crate::geometry::{PixelRect, Scale};

/// Bounding box in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Map the box into another coordinate space (e.g. natural -> display).
    pub fn scaled(&self, scale: Scale) -> PixelRect {
        PixelRect {
            x: self.x1 * scale.x,
            y: self.y1 * scale.y,
            width: self.width() * scale.x,
            height: self.height() * scale.y,
        }
    }
}

/// A single detected region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Prediction {
    /// Class label produced by the model
    #[serde(rename = "class")]
    pub class_name: String,
    /// Confidence score (0.0 to 1.0)
    pub confidence: f64,
    /// Region in source-frame pixels
    pub bbox: BoundingBox,
}

impl Prediction {
    pub fn new(class_name: impl Into<String>, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
            bbox,
        }
    }

    /// Confidence as a percentage with one decimal, e.g. `92.0%`.
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }

    /// Overlay label, e.g. `black sigatoka 92.0%`.
    pub fn label(&self) -> String {
        format!("{} {}", self.class_name, self.confidence_percent())
    }

    /// Disease named by this prediction, if any.
    pub fn disease(&self) -> Option<Disease> {
        Disease::from_label(&self.class_name)
    }
}

/// One inference response: an ordered list of predictions.
///
/// Immutable once received and superseded wholesale by the next result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DetectionResult {
    predictions: Vec<Prediction>,
}

impl DetectionResult {
    pub fn new(predictions: Vec<Prediction>) -> Self {
        Self { predictions }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn predictions(&self) -> &[Prediction] {
        &self.predictions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Prediction> {
        self.predictions.iter()
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    /// Whether any prediction names a known disease.
    pub fn has_disease(&self) -> bool {
        self.predictions.iter().any(|p| p.disease().is_some())
    }

    /// Treatment guidance for the detected diseases.
    ///
    /// Black Sigatoka takes precedence over Fusarium Wilt when both appear.
    pub fn guidance(&self) -> Option<&'static TreatmentGuidance> {
        Disease::ALL
            .iter()
            .find(|disease| self.predictions.iter().any(|p| p.disease() == Some(**disease)))
            .map(|disease| disease.guidance())
    }
}

impl From<Vec<Prediction>> for DetectionResult {
    fn from(predictions: Vec<Prediction>) -> Self {
        Self::new(predictions)
    }
}

impl<'a> IntoIterator for &'a DetectionResult {
    type Item = &'a Prediction;
    type IntoIter = std::slice::Iter<'a, Prediction>;

    fn into_iter(self) -> Self::IntoIter {
        self.predictions.iter()
    }
}

/// Response body of the still-image prediction endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: DetectionResult,
}

/// Request body of the live-frame endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LiveFrameRequest {
    /// `data:image/jpeg;base64,...` encoded frame
    pub frame: String,
}

/// Response body of the live-frame endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LiveDetection {
    #[serde(default)]
    pub predictions: DetectionResult,
    /// Server-side inference time in milliseconds
    #[serde(default)]
    pub processing_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sigatoka() -> Prediction {
        Prediction::new("black sigatoka", 0.92, BoundingBox::new(10.0, 10.0, 50.0, 60.0))
    }

    #[test]
    fn test_label_format() {
        assert_eq!(sigatoka().label(), "black sigatoka 92.0%");

        let p = Prediction::new("healthy", 0.5, BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(p.label(), "healthy 50.0%");
    }

    #[test]
    fn test_prediction_wire_format() {
        let json = r#"{"class":"fusarium wilt","confidence":0.81,"bbox":{"x1":1.0,"y1":2.0,"x2":3.0,"y2":4.0}}"#;
        let p: Prediction = serde_json::from_str(json).unwrap();
        assert_eq!(p.class_name, "fusarium wilt");
        assert_eq!(p.bbox, BoundingBox::new(1.0, 2.0, 3.0, 4.0));

        let back = serde_json::to_value(&p).unwrap();
        assert_eq!(back["class"], "fusarium wilt");
    }

    #[test]
    fn test_live_detection_missing_predictions() {
        let live: LiveDetection = serde_json::from_str(r#"{"processing_time": 12.5}"#).unwrap();
        assert!(live.predictions.is_empty());
        assert_eq!(live.processing_time, 12.5);
    }

    #[test]
    fn test_scaled_box() {
        let rect = sigatoka().bbox.scaled(Scale::new(0.5, 2.0));
        assert_eq!(rect, PixelRect::new(5.0, 20.0, 20.0, 100.0));
    }

    #[test]
    fn test_guidance_precedence() {
        let wilt = Prediction::new("Fusarium Wilt", 0.7, BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        let result = DetectionResult::new(vec![wilt.clone(), sigatoka()]);
        assert_eq!(result.guidance().unwrap().title, "Black Sigatoka Solution");

        let result = DetectionResult::new(vec![wilt]);
        assert_eq!(result.guidance().unwrap().title, "Fusarium Wilt Solution");

        let healthy = Prediction::new("healthy", 0.9, BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        let result = DetectionResult::new(vec![healthy]);
        assert!(!result.has_disease());
        assert!(result.guidance().is_none());
    }
}

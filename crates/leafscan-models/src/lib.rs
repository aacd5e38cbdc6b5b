//! Shared data models for the LeafScan client.
//!
//! This crate provides Serde-serializable types for:
//! - Predictions and detection results returned by the inference service
//! - Wire payloads of the still-image and live-frame endpoints
//! - Display geometry and crop rectangles
//! - Disease classification and treatment guidance

pub mod disease;
pub mod geometry;
pub mod prediction;

// Re-export common types
pub use disease::{Disease, DiseaseParseError, TreatmentGuidance};
pub use geometry::{CropRect, PixelRect, ResizeHandle, ResizeHandleParseError, Scale, Size};
pub use prediction::{
    BoundingBox, DetectionResult, LiveDetection, LiveFrameRequest, PredictResponse, Prediction,
};

//! Image handling for the LeafScan client.
//!
//! This crate provides:
//! - `Frame`, a cheaply clonable RGBA video frame
//! - JPEG and data-URL encoding for inference uploads
//! - Crop extraction with display-to-natural scaling
//! - The `Canvas` drawing surface and detection overlay rendering

pub mod canvas;
pub mod crop;
pub mod encode;
pub mod error;
pub mod frame;
pub mod overlay;

pub use canvas::{Canvas, DrawOp, RasterCanvas, RecordingCanvas};
pub use crop::{crop_natural, crop_for_upload};
pub use encode::{encode_jpeg, EncodedImage, JPEG_MIME};
pub use error::{MediaError, MediaResult};
pub use frame::Frame;
pub use overlay::{draw_detections, OverlayStyle};

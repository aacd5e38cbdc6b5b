//! Banana-leaf disease detection client.
//!
//! This crate provides:
//! - `LiveDetector`, the live camera loop: fixed-cadence inference requests
//!   and a render loop that redraws the latest detections every refresh
//! - Camera sources (synthetic, still-image file, V4L2 behind the `v4l` feature)
//! - The still-image upload flow with optional crop and treatment guidance
//! - Configuration and error types shared by the `leafscan` binary

pub mod config;
pub mod error;
pub mod live;
pub mod telemetry;
pub mod upload;

pub use config::LiveConfig;
pub use error::{CameraError, LiveError, LiveResult};
pub use live::{
    Camera, CameraConstraints, CameraSession, FacingMode, LiveDetector, LiveStatus, MediaStream,
    RateCounter,
};
pub use upload::{StillImageDetector, StillOutcome, StillSummary, MAX_DISPLAY};

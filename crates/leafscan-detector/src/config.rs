//! Live detector configuration.

use std::time::Duration;

use crate::error::{LiveError, LiveResult};
use crate::live::{CameraConstraints, FacingMode};

/// Live detector configuration.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Period of the inference sub-loop (~3 requests per second)
    pub inference_interval: Duration,
    /// Period of the render sub-loop (one display refresh)
    pub render_interval: Duration,
    /// JPEG quality of submitted frames (1-100)
    pub jpeg_quality: u8,
    /// Camera source: `stub://`, `file://<image>` or a V4L2 device path
    pub camera: String,
    /// Requested capture format
    pub constraints: CameraConstraints,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            inference_interval: Duration::from_millis(333),
            render_interval: Duration::from_millis(16), // ~60 Hz
            jpeg_quality: 70,
            camera: "/dev/video0".to_string(),
            constraints: CameraConstraints::default(),
        }
    }
}

impl LiveConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            inference_interval: Duration::from_millis(
                std::env::var("LEAFSCAN_INFERENCE_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(333),
            ),
            render_interval: Duration::from_millis(
                std::env::var("LEAFSCAN_RENDER_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(16),
            ),
            jpeg_quality: std::env::var("LEAFSCAN_JPEG_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jpeg_quality),
            camera: std::env::var("LEAFSCAN_CAMERA").unwrap_or(defaults.camera),
            constraints: CameraConstraints {
                ideal_width: std::env::var("LEAFSCAN_CAMERA_WIDTH")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.constraints.ideal_width),
                ideal_height: std::env::var("LEAFSCAN_CAMERA_HEIGHT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.constraints.ideal_height),
                facing: std::env::var("LEAFSCAN_CAMERA_FACING")
                    .ok()
                    .and_then(|s| s.parse::<FacingMode>().ok())
                    .unwrap_or(defaults.constraints.facing),
            },
        }
    }

    pub fn validate(&self) -> LiveResult<()> {
        if self.inference_interval.is_zero() {
            return Err(LiveError::InvalidConfig("inference interval must be > 0".into()));
        }
        if self.render_interval.is_zero() {
            return Err(LiveError::InvalidConfig("render interval must be > 0".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(LiveError::InvalidConfig(format!(
                "jpeg quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

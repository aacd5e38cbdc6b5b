//! Camera sources.
//!
//! A `Camera` grants a `MediaStream`; the stream hands out the most recent
//! frame on demand and owns the capture tracks until `stop_tracks`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use leafscan_media::Frame;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::CameraError;

/// Preferred camera orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FacingMode {
    /// Rear camera
    #[default]
    Environment,
    /// Front camera
    User,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FacingMode {
    type Err = FacingModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "environment" | "rear" | "back" => Ok(FacingMode::Environment),
            "user" | "front" => Ok(FacingMode::User),
            _ => Err(FacingModeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown facing mode: {0}")]
pub struct FacingModeParseError(String);

/// Requested capture format. Sources treat these as preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: FacingMode,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 640,
            ideal_height: 480,
            facing: FacingMode::Environment,
        }
    }
}

/// A granted media stream.
pub trait MediaStream: Send + Sync {
    /// Latest frame. A zero-sized frame means the video is not loaded yet;
    /// `None` means the stream has been stopped.
    fn current_frame(&self) -> Option<Frame>;

    /// Stop every capture track. Idempotent.
    fn stop_tracks(&self);

    /// Number of tracks still capturing.
    fn active_tracks(&self) -> usize;

    fn label(&self) -> String {
        "camera".to_string()
    }
}

/// A source of media streams.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Request access. Denial or device failure yields `CameraError`.
    async fn open(&self, constraints: &CameraConstraints) -> Result<Arc<dyn MediaStream>, CameraError>;
}

/// Resolve a camera source string.
///
/// - `stub://...` synthetic frames
/// - `file://<path>` a still image replayed as a camera
/// - anything else is a V4L2 device path (requires the `v4l` feature)
pub fn open_camera(source: &str) -> Result<Arc<dyn Camera>, CameraError> {
    if source.starts_with("stub://") {
        return Ok(Arc::new(SyntheticCamera::new()));
    }
    if let Some(path) = source.strip_prefix("file://") {
        return Ok(Arc::new(ImageFileCamera::new(path)));
    }

    #[cfg(feature = "v4l")]
    {
        Ok(Arc::new(super::v4l::V4lCamera::new(source)))
    }
    #[cfg(not(feature = "v4l"))]
    {
        Err(CameraError::Unsupported(format!(
            "{source} (build with the `v4l` feature for device capture)"
        )))
    }
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub://)
// ----------------------------------------------------------------------------

/// Camera producing a generated test pattern.
#[derive(Debug, Clone, Default)]
pub struct SyntheticCamera {
    /// Frames reported as zero-sized before the video "loads"
    pub warmup_frames: u64,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_warmup(warmup_frames: u64) -> Self {
        Self { warmup_frames }
    }
}

#[async_trait]
impl Camera for SyntheticCamera {
    async fn open(&self, constraints: &CameraConstraints) -> Result<Arc<dyn MediaStream>, CameraError> {
        info!(
            width = constraints.ideal_width,
            height = constraints.ideal_height,
            "Opened synthetic camera"
        );
        Ok(Arc::new(StillStream::new(
            leaf_pattern(constraints.ideal_width, constraints.ideal_height),
            self.warmup_frames,
            "synthetic",
        )))
    }
}

/// Green vertical gradient standing in for a leaf.
fn leaf_pattern(width: u32, height: u32) -> Frame {
    Frame::new(RgbaImage::from_fn(width, height, |x, y| {
        let shade = (y * 255 / height.max(1)) as u8;
        Rgba([shade / 4, 96 + shade / 2, ((x * 64) / width.max(1)) as u8, 255])
    }))
}

// ----------------------------------------------------------------------------
// Still-image camera (file://)
// ----------------------------------------------------------------------------

/// Camera replaying a single image file forever.
#[derive(Debug, Clone)]
pub struct ImageFileCamera {
    path: PathBuf,
}

impl ImageFileCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Camera for ImageFileCamera {
    async fn open(&self, _constraints: &CameraConstraints) -> Result<Arc<dyn MediaStream>, CameraError> {
        let path = self.path.clone();
        let frame = tokio::task::spawn_blocking(move || Frame::open(&path))
            .await
            .map_err(|e| CameraError::device(e.to_string()))?
            .map_err(|e| match e {
                leafscan_media::MediaError::FileNotFound(p) => {
                    CameraError::NotFound(p.display().to_string())
                }
                other => CameraError::device(other.to_string()),
            })?;

        info!(
            path = %self.path.display(),
            width = frame.width(),
            height = frame.height(),
            "Opened image file camera"
        );
        Ok(Arc::new(StillStream::new(frame, 0, "file")))
    }
}

/// Stream serving one fixed frame.
struct StillStream {
    frame: Frame,
    warmup_frames: u64,
    served: AtomicU64,
    stopped: AtomicBool,
    label: &'static str,
}

impl StillStream {
    fn new(frame: Frame, warmup_frames: u64, label: &'static str) -> Self {
        Self {
            frame,
            warmup_frames,
            served: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            label,
        }
    }
}

impl MediaStream for StillStream {
    fn current_frame(&self) -> Option<Frame> {
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }
        let served = self.served.fetch_add(1, Ordering::SeqCst);
        if served < self.warmup_frames {
            return Some(Frame::empty());
        }
        Some(self.frame.clone())
    }

    fn stop_tracks(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!(label = self.label, "Stopped stream track");
        }
    }

    fn active_tracks(&self) -> usize {
        usize::from(!self.stopped.load(Ordering::SeqCst))
    }

    fn label(&self) -> String {
        self.label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_synthetic_warmup_then_frames() {
        let camera = SyntheticCamera::with_warmup(2);
        let stream = camera.open(&CameraConstraints::default()).await.unwrap();

        assert!(stream.current_frame().unwrap().is_empty());
        assert!(stream.current_frame().unwrap().is_empty());
        let frame = stream.current_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (640, 480));
    }

    #[tokio::test]
    async fn test_stop_tracks_is_idempotent() {
        let stream = SyntheticCamera::new()
            .open(&CameraConstraints::default())
            .await
            .unwrap();
        assert_eq!(stream.active_tracks(), 1);

        stream.stop_tracks();
        stream.stop_tracks();
        assert_eq!(stream.active_tracks(), 0);
        assert!(stream.current_frame().is_none());
    }

    #[tokio::test]
    async fn test_missing_image_file() {
        let camera = ImageFileCamera::new("/nonexistent/leaf.jpg");
        let err = camera.open(&CameraConstraints::default()).await.err().unwrap();
        assert!(matches!(err, CameraError::NotFound(_)));
    }

    #[test]
    fn test_open_camera_sources() {
        assert!(open_camera("stub://test").is_ok());
        assert!(open_camera("file:///tmp/leaf.jpg").is_ok());
    }

    #[test]
    fn test_facing_mode_parse() {
        assert_eq!("rear".parse::<FacingMode>().unwrap(), FacingMode::Environment);
        assert_eq!("USER".parse::<FacingMode>().unwrap(), FacingMode::User);
        assert!("sideways".parse::<FacingMode>().is_err());
    }
}

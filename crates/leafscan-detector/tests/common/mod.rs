//! Fakes shared by the detector integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leafscan_client::{
    ClientResult, ImageUpload, InferenceService, LiveFrame, StillPrediction,
};
use leafscan_detector::live::SyntheticCamera;
use leafscan_detector::{Camera, CameraConstraints, CameraError, LiveConfig, MediaStream};
use leafscan_models::{BoundingBox, DetectionResult, LiveDetection, Prediction};
use parking_lot::Mutex;

pub fn sigatoka() -> DetectionResult {
    DetectionResult::new(vec![Prediction::new(
        "black sigatoka",
        0.92,
        BoundingBox::new(10.0, 10.0, 50.0, 60.0),
    )])
}

pub fn sigatoka_detection() -> LiveDetection {
    LiveDetection {
        predictions: sigatoka(),
        processing_time: 41.7,
        status: Some("success".to_string()),
    }
}

/// Live config with small synthetic frames so encoding stays cheap.
pub fn test_config() -> LiveConfig {
    let mut config = LiveConfig {
        camera: "stub://test".to_string(),
        ..Default::default()
    };
    config.constraints.ideal_width = 64;
    config.constraints.ideal_height = 48;
    config
}

/// Inference fake that answers every live frame after a fixed delay and
/// records how many requests overlapped.
pub struct ScriptedInference {
    delay: Duration,
    response: LiveDetection,
    calls: AtomicUsize,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedInference {
    pub fn new(delay: Duration, response: LiveDetection) -> Self {
        Self {
            delay,
            response,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceService for ScriptedInference {
    async fn predict_image(&self, _upload: ImageUpload) -> ClientResult<StillPrediction> {
        Ok(StillPrediction {
            result: self.response.predictions.clone(),
            elapsed: self.delay,
        })
    }

    async fn live_detect(&self, frame: LiveFrame) -> ClientResult<LiveDetection> {
        assert!(frame.data_url.starts_with("data:image/jpeg;base64,"));
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

/// Synthetic camera that keeps every stream it grants, so tests can check
/// the tracks were stopped.
#[derive(Default)]
pub struct TrackingCamera {
    inner: SyntheticCamera,
    streams: Mutex<Vec<Arc<dyn MediaStream>>>,
}

impl TrackingCamera {
    pub fn with_warmup(warmup_frames: u64) -> Self {
        Self {
            inner: SyntheticCamera::with_warmup(warmup_frames),
            streams: Mutex::new(Vec::new()),
        }
    }

    pub fn granted(&self) -> usize {
        self.streams.lock().len()
    }

    pub fn live_tracks(&self) -> usize {
        self.streams.lock().iter().map(|s| s.active_tracks()).sum()
    }
}

#[async_trait]
impl Camera for TrackingCamera {
    async fn open(&self, constraints: &CameraConstraints) -> Result<Arc<dyn MediaStream>, CameraError> {
        let stream = self.inner.open(constraints).await?;
        self.streams.lock().push(Arc::clone(&stream));
        Ok(stream)
    }
}

/// Camera whose permission prompt is always refused.
pub struct DeniedCamera;

#[async_trait]
impl Camera for DeniedCamera {
    async fn open(&self, _constraints: &CameraConstraints) -> Result<Arc<dyn MediaStream>, CameraError> {
        Err(CameraError::PermissionDenied)
    }
}

/// Camera that grants access only after `delay`.
pub struct SlowCamera {
    pub delay: Duration,
    pub inner: TrackingCamera,
}

#[async_trait]
impl Camera for SlowCamera {
    async fn open(&self, constraints: &CameraConstraints) -> Result<Arc<dyn MediaStream>, CameraError> {
        tokio::time::sleep(self.delay).await;
        self.inner.open(constraints).await
    }
}

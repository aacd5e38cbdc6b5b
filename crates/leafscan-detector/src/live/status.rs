use std::time::Duration;

use chrono::{DateTime, Utc};
use leafscan_models::DetectionResult;
use uuid::Uuid;

/// User-visible snapshot of the live detector.
#[derive(Debug, Clone, Default)]
pub struct LiveStatus {
    pub active: bool,
    pub session_id: Option<Uuid>,
    /// Latest applied detections (the overlay contents)
    pub detections: DetectionResult,
    /// Server-reported inference time of the latest result, in milliseconds
    pub processing_time_ms: f64,
    /// Client-side round trip of the latest result
    pub latency: Option<Duration>,
    /// Render ticks per second
    pub render_rate: u32,
    pub frames_rendered: u64,
    pub results_applied: u64,
    pub last_result_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl LiveStatus {
    pub fn detection_count(&self) -> usize {
        self.detections.len()
    }
}

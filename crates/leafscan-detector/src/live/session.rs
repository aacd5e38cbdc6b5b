use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::camera::MediaStream;

/// One active camera capture, from `start()` to `stop()`.
///
/// The liveness flag is shared with the session's loops; every state
/// mutation they make is gated on it.
pub struct CameraSession {
    id: Uuid,
    stream: Arc<dyn MediaStream>,
    live: Arc<AtomicBool>,
    started_at: DateTime<Utc>,
}

impl CameraSession {
    pub fn new(stream: Arc<dyn MediaStream>) -> Self {
        Self {
            id: Uuid::new_v4(),
            stream,
            live: Arc::new(AtomicBool::new(true)),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn stream(&self) -> &Arc<dyn MediaStream> {
        &self.stream
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Handle to the liveness flag for the session's loops.
    pub(crate) fn liveness(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.live)
    }

    /// Mark dead and stop every track. Safe to call more than once.
    pub fn close(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            info!(session_id = %self.id, stream = %self.stream.label(), "Closing camera session");
        }
        self.stream.stop_tracks();
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .field("stream", &self.stream.label())
            .field("started_at", &self.started_at)
            .finish()
    }
}

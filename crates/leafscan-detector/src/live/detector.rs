//! The live detection loop.
//!
//! Two periodic tasks run per session:
//! - the inference loop captures a frame every `inference_interval`, submits
//!   it and stores the returned detections as the overlay
//! - the render loop redraws the current frame plus the overlay every
//!   `render_interval`, whether or not a new result arrived
//!
//! Both tasks check the session liveness flag before each state mutation, so
//! once `stop()` returns nothing from the old session can touch the canvas or
//! the overlay again.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use leafscan_client::{ClientResult, InferenceService, LiveFrame};
use leafscan_media::{draw_detections, Canvas, OverlayStyle};
use leafscan_models::{LiveDetection, Scale};
use metrics::{counter, histogram};
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::camera::{Camera, MediaStream};
use super::rate::RateCounter;
use super::session::CameraSession;
use super::status::LiveStatus;
use crate::config::LiveConfig;
use crate::error::{LiveError, LiveResult};
use crate::telemetry;

/// Mutable loop state shared by the controller and the session tasks.
#[derive(Debug, Default)]
struct LoopState {
    /// `status.detections` is the overlay drawn on every render tick
    status: LiveStatus,
    rate: RateCounter,
}

impl LoopState {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

struct ActiveSession {
    session: CameraSession,
    shutdown: watch::Sender<bool>,
    _tasks: Vec<JoinHandle<()>>,
}

/// Live camera detector.
///
/// Owns at most one `CameraSession` and the overlay canvas.
pub struct LiveDetector<C: Canvas + 'static> {
    camera: Arc<dyn Camera>,
    inference: Arc<dyn InferenceService>,
    config: LiveConfig,
    style: OverlayStyle,
    canvas: Arc<Mutex<C>>,
    state: Arc<Mutex<LoopState>>,
    active: Mutex<Option<ActiveSession>>,
    /// Bumped by every `stop()`; a `start()` that raced a stop gives up
    epoch: AtomicU64,
    start_lock: tokio::sync::Mutex<()>,
}

impl<C: Canvas + 'static> LiveDetector<C> {
    pub fn new(
        camera: Arc<dyn Camera>,
        inference: Arc<dyn InferenceService>,
        canvas: C,
        config: LiveConfig,
    ) -> LiveResult<Self> {
        config.validate()?;
        Ok(Self {
            camera,
            inference,
            config,
            style: OverlayStyle::LIVE,
            canvas: Arc::new(Mutex::new(canvas)),
            state: Arc::new(Mutex::new(LoopState::default())),
            active: Mutex::new(None),
            epoch: AtomicU64::new(0),
            start_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    /// Open the camera and begin both loops.
    ///
    /// A no-op while a session is already active. On camera failure the
    /// error is recorded in the status and no session is created.
    pub async fn start(&self) -> LiveResult<()> {
        let _starting = self.start_lock.lock().await;
        if self.is_active() {
            debug!("Live detection already running");
            return Ok(());
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let stream = match self.camera.open(&self.config.constraints).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Error accessing camera");
                self.state.lock().status.last_error = Some(e.user_message());
                return Err(LiveError::Camera(e));
            }
        };

        let mut active = self.active.lock();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            stream.stop_tracks();
            return Err(LiveError::StartCancelled);
        }

        let session = CameraSession::new(stream);
        {
            let mut state = self.state.lock();
            state.reset();
            state.status.active = true;
            state.status.session_id = Some(session.id());
        }

        let ctx = Arc::new(LoopContext {
            session_id: session.id(),
            stream: Arc::clone(session.stream()),
            live: session.liveness(),
            in_flight: AtomicBool::new(false),
            inference: Arc::clone(&self.inference),
            canvas: Arc::clone(&self.canvas),
            state: Arc::clone(&self.state),
            style: self.style,
            jpeg_quality: self.config.jpeg_quality,
        });

        let (shutdown, shutdown_rx) = watch::channel(false);
        let tasks = vec![
            tokio::spawn(inference_loop(
                Arc::clone(&ctx),
                self.config.inference_interval,
                shutdown_rx.clone(),
            )),
            tokio::spawn(render_loop(ctx, self.config.render_interval, shutdown_rx)),
        ];

        counter!(telemetry::SESSIONS_STARTED).increment(1);
        info!(
            session_id = %session.id(),
            inference_interval_ms = self.config.inference_interval.as_millis() as u64,
            render_interval_ms = self.config.render_interval.as_millis() as u64,
            "Started live detection"
        );

        *active = Some(ActiveSession {
            session,
            shutdown,
            _tasks: tasks,
        });
        Ok(())
    }

    /// Tear down the session. Idempotent; safe with no active session.
    ///
    /// Any inference response still in flight is discarded when it lands.
    pub fn stop(&self) {
        let taken = {
            let mut active = self.active.lock();
            self.epoch.fetch_add(1, Ordering::SeqCst);
            active.take()
        };

        if let Some(active) = &taken {
            active.session.close();
            let _ = active.shutdown.send(true);
        }

        self.canvas.lock().clear();
        self.state.lock().reset();

        if let Some(active) = taken {
            info!(session_id = %active.session.id(), "Stopped live detection");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.active.lock().as_ref().map(|a| a.session.id())
    }

    /// Snapshot of the user-visible state.
    pub fn status(&self) -> LiveStatus {
        let active = self.is_active();
        let mut status = self.state.lock().status.clone();
        status.active = active;
        status
    }

    /// Tracks still capturing on the active session's stream.
    pub fn active_tracks(&self) -> usize {
        self.active
            .lock()
            .as_ref()
            .map(|a| a.session.stream().active_tracks())
            .unwrap_or(0)
    }

    /// Lock the overlay canvas, e.g. to save or present it.
    pub fn canvas(&self) -> MutexGuard<'_, C> {
        self.canvas.lock()
    }
}

impl<C: Canvas + 'static> Drop for LiveDetector<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything a session's tasks need, shared between them.
struct LoopContext<C: Canvas + 'static> {
    session_id: Uuid,
    stream: Arc<dyn MediaStream>,
    live: Arc<AtomicBool>,
    in_flight: AtomicBool,
    inference: Arc<dyn InferenceService>,
    canvas: Arc<Mutex<C>>,
    state: Arc<Mutex<LoopState>>,
    style: OverlayStyle,
    jpeg_quality: u8,
}

impl<C: Canvas + 'static> LoopContext<C> {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    async fn inference_tick(&self) {
        let Some(frame) = self.stream.current_frame() else {
            return;
        };
        if frame.is_empty() {
            counter!(telemetry::INFERENCE_TICKS_SKIPPED).increment(1);
            return;
        }

        let encoded = match frame.encode_jpeg(self.jpeg_quality) {
            Ok(encoded) => encoded,
            Err(e) => {
                self.record_error(format!("Frame encoding failed: {e}"));
                return;
            }
        };

        if self.in_flight.swap(true, Ordering::SeqCst) {
            counter!(telemetry::INFERENCE_TICKS_SKIPPED).increment(1);
            return;
        }
        counter!(telemetry::INFERENCE_REQUESTS).increment(1);
        let started = Instant::now();
        let result = self.inference.live_detect(LiveFrame::from(&encoded)).await;
        self.in_flight.store(false, Ordering::SeqCst);

        self.apply(result, started.elapsed());
    }

    fn apply(&self, result: ClientResult<LiveDetection>, latency: Duration) {
        let mut guard = self.state.lock();
        if !self.is_live() {
            counter!(telemetry::STALE_RESPONSES).increment(1);
            debug!(session_id = %self.session_id, "Discarding response for stopped session");
            return;
        }
        let state = &mut *guard;

        match result {
            Ok(live) => {
                histogram!(telemetry::INFERENCE_LATENCY).record(latency.as_secs_f64());
                debug!(
                    session_id = %self.session_id,
                    detections = live.predictions.len(),
                    processing_time_ms = live.processing_time,
                    latency_ms = latency.as_millis() as u64,
                    "Applied detection result"
                );
                state.status.detections = live.predictions;
                state.status.processing_time_ms = live.processing_time;
                state.status.latency = Some(latency);
                state.status.results_applied += 1;
                state.status.last_result_at = Some(Utc::now());
                state.status.last_error = None;
            }
            Err(e) => {
                counter!(telemetry::INFERENCE_FAILURES).increment(1);
                warn!(session_id = %self.session_id, error = %e, "Error sending frame to backend");
                state.status.last_error = Some(format!("Connection error: {e}"));
            }
        }
    }

    fn record_error(&self, message: String) {
        let mut state = self.state.lock();
        if self.is_live() {
            warn!(session_id = %self.session_id, "{}", message);
            state.status.last_error = Some(message);
        }
    }

    fn render_tick(&self) {
        let Some(frame) = self.stream.current_frame() else {
            return;
        };
        if frame.is_empty() {
            return;
        }

        {
            let mut canvas = self.canvas.lock();
            if !self.is_live() {
                return;
            }
            if canvas.size() != (frame.width(), frame.height()) {
                canvas.resize(frame.width(), frame.height());
            }
            canvas.draw_frame(&frame);
            let overlay = self.state.lock().status.detections.clone();
            draw_detections(&mut *canvas, &overlay, Scale::IDENTITY, &self.style);
        }

        let mut guard = self.state.lock();
        if !self.is_live() {
            return;
        }
        let state = &mut *guard;
        state.rate.tick(Instant::now());
        state.status.render_rate = state.rate.rate();
        state.status.frames_rendered += 1;
        counter!(telemetry::FRAMES_RENDERED).increment(1);
    }
}

async fn inference_loop<C: Canvas + 'static>(
    ctx: Arc<LoopContext<C>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        if !ctx.is_live() {
            break;
        }
        // Awaited inline: the next tick cannot fire a second request while
        // this one is outstanding, and ticks missed meanwhile are skipped.
        ctx.inference_tick().await;
    }

    debug!(session_id = %ctx.session_id, "Inference loop exited");
}

async fn render_loop<C: Canvas + 'static>(
    ctx: Arc<LoopContext<C>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        if !ctx.is_live() {
            break;
        }
        ctx.render_tick();
    }

    debug!(session_id = %ctx.session_id, "Render loop exited");
}

//! V4L2 camera source.
//!
//! A capture thread owns the device and its mmap stream and keeps the most
//! recent frame; the render and inference loops sample it without blocking.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use async_trait::async_trait;
use leafscan_media::Frame;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use super::camera::{Camera, CameraConstraints, MediaStream};
use crate::error::CameraError;

const BUFFER_COUNT: u32 = 4;

/// Camera backed by a local V4L2 device node.
#[derive(Debug, Clone)]
pub struct V4lCamera {
    device: PathBuf,
}

impl V4lCamera {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

#[async_trait]
impl Camera for V4lCamera {
    async fn open(&self, constraints: &CameraConstraints) -> Result<Arc<dyn MediaStream>, CameraError> {
        let path = self.device.clone();
        let constraints = *constraints;
        let stream = tokio::task::spawn_blocking(move || V4lStream::spawn(path, constraints))
            .await
            .map_err(|e| CameraError::device(e.to_string()))??;
        Ok(Arc::new(stream))
    }
}

struct V4lStream {
    label: String,
    latest: Arc<Mutex<Option<Frame>>>,
    stopped: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl V4lStream {
    fn spawn(path: PathBuf, constraints: CameraConstraints) -> Result<Self, CameraError> {
        let mut device = Device::with_path(&path)?;
        let mut format = device.format()?;
        format.width = constraints.ideal_width;
        format.height = constraints.ideal_height;
        format.fourcc = FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(e) => {
                warn!(device = %path.display(), error = %e, "Failed to set capture format");
                device.format()?
            }
        };
        if format.fourcc != FourCC::new(b"RGB3") {
            return Err(CameraError::Unsupported(format!(
                "{} does not deliver RGB3 frames",
                path.display()
            )));
        }

        let (width, height) = (format.width, format.height);
        let label = path.display().to_string();
        info!(device = %label, width, height, "Opened V4L2 camera");

        let latest = Arc::new(Mutex::new(Some(Frame::empty())));
        let stopped = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let worker = {
            let latest = Arc::clone(&latest);
            let stopped = Arc::clone(&stopped);
            let label = label.clone();
            std::thread::Builder::new()
                .name("leafscan-v4l".to_string())
                .spawn(move || {
                    let mut stream = match MmapStream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT) {
                        Ok(stream) => {
                            let _ = ready_tx.send(Ok(()));
                            stream
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(CameraError::from(e)));
                            return;
                        }
                    };

                    while !stopped.load(Ordering::SeqCst) {
                        match stream.next() {
                            Ok((buf, _meta)) => match Frame::from_rgb(width, height, buf.to_vec()) {
                                Ok(frame) => *latest.lock() = Some(frame),
                                Err(e) => debug!(device = %label, error = %e, "Dropped malformed frame"),
                            },
                            Err(e) => {
                                warn!(device = %label, error = %e, "Capture failed");
                                break;
                            }
                        }
                    }
                    *latest.lock() = None;
                    debug!(device = %label, "Capture thread exited");
                })?
        };

        ready_rx
            .recv()
            .map_err(|_| CameraError::device("capture thread exited before streaming"))??;

        Ok(Self {
            label,
            latest,
            stopped,
            worker: Mutex::new(Some(worker)),
        })
    }
}

impl MediaStream for V4lStream {
    fn current_frame(&self) -> Option<Frame> {
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }
        self.latest.lock().clone()
    }

    fn stop_tracks(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        // Detached: the thread exits after its current dequeue returns.
        self.worker.lock().take();
        debug!(device = %self.label, "Stopped V4L2 track");
    }

    fn active_tracks(&self) -> usize {
        usize::from(!self.stopped.load(Ordering::SeqCst))
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

impl Drop for V4lStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

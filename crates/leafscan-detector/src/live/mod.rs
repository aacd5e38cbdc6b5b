//! Live camera detection.

mod camera;
mod detector;
mod rate;
mod session;
mod status;
#[cfg(feature = "v4l")]
mod v4l;

pub use camera::{
    open_camera, Camera, CameraConstraints, FacingMode, FacingModeParseError, ImageFileCamera,
    MediaStream, SyntheticCamera,
};
pub use detector::LiveDetector;
pub use rate::RateCounter;
pub use session::CameraSession;
pub use status::LiveStatus;
#[cfg(feature = "v4l")]
pub use self::v4l::V4lCamera;

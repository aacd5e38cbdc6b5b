//! Detector error types.

use thiserror::Error;

pub type LiveResult<T> = Result<T, LiveError>;

/// Camera acquisition failures. Fatal to starting a session.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Camera not found: {0}")]
    NotFound(String),

    #[error("Camera device error: {0}")]
    Device(String),

    #[error("Camera backend not supported: {0}")]
    Unsupported(String),
}

impl CameraError {
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Message shown to the user when a session cannot start.
    pub fn user_message(&self) -> String {
        format!("Cannot access camera. Please check permissions. ({})", self)
    }
}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => CameraError::PermissionDenied,
            std::io::ErrorKind::NotFound => CameraError::NotFound(err.to_string()),
            _ => CameraError::Device(err.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Inference error: {0}")]
    Inference(#[from] leafscan_client::ClientError),

    #[error("Media error: {0}")]
    Media(#[from] leafscan_media::MediaError),

    #[error("Session start cancelled by stop()")]
    StartCancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LiveError {
    /// Whether the loop can keep running after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, LiveError::Inference(_) | LiveError::Media(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_mapping() {
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(matches!(CameraError::from(denied), CameraError::PermissionDenied));

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "/dev/video9");
        assert!(matches!(CameraError::from(missing), CameraError::NotFound(_)));
    }

    #[test]
    fn test_transient() {
        assert!(!LiveError::Camera(CameraError::PermissionDenied).is_transient());
        assert!(LiveError::Media(leafscan_media::MediaError::EmptyFrame { width: 0, height: 0 })
            .is_transient());
    }
}

use thiserror::Error;

use super::device::OutputKind;

/// Errors that can occur while driving a camera session.
///
/// Setup failures are terminal for that attempt; lock failures abort a single
/// device mutation and are otherwise recoverable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera permission restricted")]
    PermissionRestricted,

    #[error("no capture device found")]
    NoDeviceFound,

    #[error("unable to attach video input: {0}")]
    InputAttachFailed(String),

    #[error("unable to attach {0} output")]
    OutputAttachFailed(OutputKind),

    #[error("unable to lock device for configuration: {0}")]
    ConfigurationLockFailed(String),

    #[error("no active video connection")]
    NoActiveConnection,

    #[error("capture graph not configured")]
    NotConfigured,

    #[error("no alternative camera available")]
    NoAlternativeCamera,

    #[error("a still capture is already in progress")]
    CaptureInProgress,

    #[error("still capture failed: {0}")]
    CaptureFailed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("session queue unavailable")]
    QueueUnavailable,
}

impl CaptureError {
    /// Permission outcomes that end the session's usefulness until the user
    /// changes OS settings.
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::PermissionRestricted)
    }
}

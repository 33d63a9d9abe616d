use crate::models::code::DetectedCode;
use crate::models::error::CaptureError;
use crate::models::state::SessionState;

/// Consumer of camera session notifications.
///
/// All methods are called on the session queue thread, never while the
/// session's internal lock is held, so implementations may call back into the
/// session. Marshal to the UI thread if needed.
///
/// Any `Fn(&DetectedCode)` closure is a delegate that ignores state changes.
pub trait CameraDelegate: Send + Sync {
    /// Called once per detected code, in detection order.
    fn on_code_detected(&self, code: &DetectedCode);

    /// Called when the session state changes.
    fn on_state_changed(&self, _state: &SessionState) {}

    /// Called once when the camera turns out to be unusable (permission
    /// restricted or denied).
    fn on_camera_unavailable(&self, _error: &CaptureError) {}
}

impl<F> CameraDelegate for F
where
    F: Fn(&DetectedCode) + Send + Sync,
{
    fn on_code_detected(&self, code: &DetectedCode) {
        self(code)
    }
}

use std::sync::Arc;

use crate::models::authorization::AuthorizationState;
use crate::models::orientation::InterfaceOrientation;
use crate::traits::capture_device::CaptureDevice;
use crate::traits::capture_session::CaptureSession;
use crate::traits::preview_sink::PreviewSink;

/// Single-shot completion of the OS permission prompt: `true` when granted.
pub type AccessCompletion = Box<dyn FnOnce(bool) + Send + 'static>;

/// Receives platform broadcasts. Fires on an unspecified thread.
pub type PlatformEventHandler = Arc<dyn Fn(PlatformEvent) + Send + Sync + 'static>;

/// Signals the platform broadcasts outside of any command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// The scene in front of a monitoring device changed significantly.
    SubjectAreaChanged { device_id: String },
    InterfaceOrientationChanged(InterfaceOrientation),
}

/// Entry point of a platform camera stack.
///
/// Implemented by:
/// - `SimulatedPlatform` (barcode-capture-sim)
/// - Future: AVFoundation, V4L2 backends
pub trait CapturePlatform: Send + Sync + 'static {
    type Device: CaptureDevice + 'static;
    type Session: CaptureSession<Device = Self::Device> + 'static;
    type Preview: PreviewSink<Session = Self::Session>;

    fn authorization_status(&self) -> AuthorizationState;

    /// Show the OS permission prompt. The completion runs exactly once,
    /// possibly on another thread.
    fn request_access(&self, completion: AccessCompletion);

    /// Video devices in enumeration order.
    fn devices(&self) -> Vec<Arc<Self::Device>>;

    /// The device a new graph starts with.
    fn default_device(&self) -> Option<Arc<Self::Device>> {
        self.devices().into_iter().next()
    }

    /// A fresh, unconfigured session.
    fn create_session(&self) -> Self::Session;

    fn set_event_handler(&self, handler: Option<PlatformEventHandler>);
}

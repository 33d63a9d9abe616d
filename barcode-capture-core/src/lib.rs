//! # barcode-capture-core
//!
//! Platform-agnostic camera session core for live barcode scanning.
//!
//! Owns the camera-session lifecycle: permission negotiation, capture graph
//! construction, orientation tracking, scoped device reconfiguration and
//! delivery of detected codes. Decoding is left to the platform's capture
//! stack; platform backends (the simulated backend, future AVFoundation or
//! V4L2 backends) implement the traits in `traits/` and plug into the
//! generic `CameraSession`.
//!
//! ## Architecture
//!
//! ```text
//! barcode-capture-core (this crate)
//! ├── traits/   ← CapturePlatform, CaptureDevice, CaptureSession, PreviewSink, CameraDelegate
//! ├── models/   ← CaptureError, SessionState, CameraConfiguration, DetectedCode, orientations
//! └── session/  ← PermissionGate, CaptureGraph, OrientationTracker, DeviceController,
//!                 CodeDetectionSink, SerialQueue, CameraSession (facade)
//! ```

pub mod models;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::authorization::AuthorizationState;
pub use models::captured_image::{CapturedImage, StillFrame};
pub use models::code::{CodeFamily, DetectedCode, MetadataObject};
pub use models::config::CameraConfiguration;
pub use models::device::{
    Adjustment, DeviceInfo, DevicePosition, FocusMode, OutputKind, Point, Rect, TorchMode,
};
pub use models::error::CaptureError;
pub use models::orientation::{InterfaceOrientation, VideoOrientation};
pub use models::state::{SessionDiagnostics, SessionState};
pub use session::camera::{CameraSession, SnapCompletion};
pub use session::detection::CodeDetectionSink;
pub use session::device_controller::{ConfigurationLock, DeviceController};
pub use session::graph::CaptureGraph;
pub use session::orientation::OrientationTracker;
pub use session::permission::PermissionGate;
pub use session::queue::{QueueHandle, SerialQueue};
pub use traits::camera_delegate::CameraDelegate;
pub use traits::capture_device::CaptureDevice;
pub use traits::capture_platform::{
    AccessCompletion, CapturePlatform, PlatformEvent, PlatformEventHandler,
};
pub use traits::capture_session::{
    CaptureConnection, CaptureSession, MetadataCallback, StillImageCompletion,
};
pub use traits::preview_sink::PreviewSink;

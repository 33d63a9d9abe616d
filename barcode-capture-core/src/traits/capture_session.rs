use std::collections::BTreeSet;
use std::sync::Arc;

use crate::models::captured_image::StillFrame;
use crate::models::code::{CodeFamily, MetadataObject};
use crate::models::device::{OutputKind, Rect};
use crate::models::error::CaptureError;
use crate::models::orientation::VideoOrientation;
use crate::traits::capture_device::CaptureDevice;

/// Callback invoked by the metadata output with the objects of one frame.
///
/// Fires on a platform thread. The core re-posts every batch onto the
/// session queue before touching any state.
pub type MetadataCallback = Arc<dyn Fn(Vec<MetadataObject>) + Send + Sync + 'static>;

/// Single-shot completion of a platform still-image capture.
pub type StillImageCompletion = Box<dyn FnOnce(Result<StillFrame, CaptureError>) + Send + 'static>;

/// A link between an input port and an output leg.
pub trait CaptureConnection {
    /// Whether one of the connection's input ports carries video.
    fn carries_video(&self) -> bool;
    fn supports_video_orientation(&self) -> bool;
    fn video_orientation(&self) -> VideoOrientation;
    fn set_video_orientation(&mut self, orientation: VideoOrientation);
}

/// Platform capture session: one video input, a still-image output and a
/// metadata output.
///
/// Every mutation of inputs and outputs happens between
/// `begin_configuration` and `commit_configuration`.
pub trait CaptureSession: Send {
    type Device: CaptureDevice;

    fn begin_configuration(&mut self);
    fn commit_configuration(&mut self);

    /// Create a device input and add it. Fails when the device is busy, the
    /// format is unsupported, or the session refuses the input.
    fn add_input(&mut self, device: &Arc<Self::Device>) -> Result<(), CaptureError>;
    fn remove_input(&mut self);
    fn has_input(&self) -> bool;

    /// Add an output leg. Fails when the session rejects it.
    fn add_output(&mut self, kind: OutputKind) -> Result<(), CaptureError>;
    fn remove_output(&mut self, kind: OutputKind);
    fn has_output(&self, kind: OutputKind) -> bool;

    /// Families the metadata output can recognize on this hardware.
    fn available_code_families(&self) -> BTreeSet<CodeFamily>;
    fn set_code_families(&mut self, families: &BTreeSet<CodeFamily>);
    fn set_rect_of_interest(&mut self, rect: Rect);
    fn set_metadata_callback(&mut self, callback: Option<MetadataCallback>);

    /// Connections of an output leg. Empty when the leg is absent.
    fn connections(&mut self, kind: OutputKind) -> Vec<&mut dyn CaptureConnection>;

    /// Capture a still image from the still-image output's video connection.
    /// The completion runs exactly once, possibly on another thread.
    fn capture_still_image(&mut self, completion: StillImageCompletion);

    fn start_running(&mut self);
    fn stop_running(&mut self);
    fn is_running(&self) -> bool;
}

//! Simulated capture session.
//!
//! The session's state lives behind an `Arc<Mutex<..>>` shared with a
//! `SessionProbe`, so tests can inspect wiring and drive metadata output after
//! the session has been handed to the core.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;

use barcode_capture_core::models::captured_image::StillFrame;
use barcode_capture_core::models::code::{CodeFamily, MetadataObject};
use barcode_capture_core::models::device::{OutputKind, Rect};
use barcode_capture_core::models::error::CaptureError;
use barcode_capture_core::models::orientation::VideoOrientation;
use barcode_capture_core::traits::capture_device::CaptureDevice;
use barcode_capture_core::traits::capture_session::{
    CaptureConnection, CaptureSession, MetadataCallback, StillImageCompletion,
};

use crate::device::SimulatedDevice;

/// Failures a simulated session injects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionFaults {
    pub reject_still_output: bool,
    pub reject_metadata_output: bool,
    /// Still-image output gets no video-carrying connection.
    pub no_still_video_connection: bool,
    /// Connections refuse orientation changes.
    pub fixed_orientation: bool,
    /// Still captures fail with this message.
    pub capture_failure: Option<String>,
    /// Still captures wait for `SessionProbe::complete_capture`.
    pub defer_capture: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedConnection {
    carries_video: bool,
    supports_orientation: bool,
    orientation: VideoOrientation,
}

impl SimulatedConnection {
    pub fn video(supports_orientation: bool) -> Self {
        Self {
            carries_video: true,
            supports_orientation,
            orientation: VideoOrientation::Portrait,
        }
    }

    pub fn metadata_only() -> Self {
        Self {
            carries_video: false,
            supports_orientation: false,
            orientation: VideoOrientation::Portrait,
        }
    }

    pub fn orientation(&self) -> VideoOrientation {
        self.orientation
    }
}

impl CaptureConnection for SimulatedConnection {
    fn carries_video(&self) -> bool {
        self.carries_video
    }

    fn supports_video_orientation(&self) -> bool {
        self.supports_orientation
    }

    fn video_orientation(&self) -> VideoOrientation {
        self.orientation
    }

    fn set_video_orientation(&mut self, orientation: VideoOrientation) {
        if self.supports_orientation {
            self.orientation = orientation;
        }
    }
}

struct SessionInner {
    input: Option<Arc<SimulatedDevice>>,
    outputs: BTreeSet<OutputKind>,
    still_connections: Vec<SimulatedConnection>,
    available_families: BTreeSet<CodeFamily>,
    code_families: BTreeSet<CodeFamily>,
    rect_of_interest: Rect,
    metadata_callback: Option<MetadataCallback>,
    running: bool,
    configuration_depth: u32,
    commits: u32,
    input_history: Vec<String>,
    faults: SessionFaults,
    pending_capture: Option<StillImageCompletion>,
}

impl SessionInner {
    /// New input, new connections: orientation resets like on real hardware.
    fn rebuild_still_connections(&mut self) {
        self.still_connections.clear();
        if !self.outputs.contains(&OutputKind::StillImage) {
            return;
        }
        if self.faults.no_still_video_connection {
            self.still_connections.push(SimulatedConnection::metadata_only());
        } else {
            self.still_connections
                .push(SimulatedConnection::video(!self.faults.fixed_orientation));
        }
    }
}

pub struct SimulatedSession {
    inner: Arc<Mutex<SessionInner>>,
    views: Vec<ConnectionView>,
}

impl SimulatedSession {
    pub fn new(available_families: BTreeSet<CodeFamily>, faults: SessionFaults) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                input: None,
                outputs: BTreeSet::new(),
                still_connections: Vec::new(),
                available_families,
                code_families: BTreeSet::new(),
                rect_of_interest: Rect::UNIT,
                metadata_callback: None,
                running: false,
                configuration_depth: 0,
                commits: 0,
                input_history: Vec::new(),
                faults,
                pending_capture: None,
            })),
            views: Vec::new(),
        }
    }

    pub fn probe(&self) -> SessionProbe {
        SessionProbe {
            inner: Arc::clone(&self.inner),
        }
    }

    pub(crate) fn fixed_orientation(&self) -> bool {
        self.inner.lock().faults.fixed_orientation
    }
}

impl CaptureSession for SimulatedSession {
    type Device = SimulatedDevice;

    fn begin_configuration(&mut self) {
        self.inner.lock().configuration_depth += 1;
    }

    fn commit_configuration(&mut self) {
        let mut inner = self.inner.lock();
        inner.configuration_depth = inner.configuration_depth.saturating_sub(1);
        inner.commits += 1;
    }

    fn add_input(&mut self, device: &Arc<SimulatedDevice>) -> Result<(), CaptureError> {
        if device.is_busy() {
            return Err(CaptureError::InputAttachFailed(format!(
                "{} is in use by another client",
                device.unique_id()
            )));
        }
        let mut inner = self.inner.lock();
        if inner.input.is_some() {
            return Err(CaptureError::InputAttachFailed(
                "session already has a video input".into(),
            ));
        }
        inner.input = Some(Arc::clone(device));
        inner.input_history.push(device.unique_id());
        inner.rebuild_still_connections();
        Ok(())
    }

    fn remove_input(&mut self) {
        let mut inner = self.inner.lock();
        inner.input = None;
        inner.still_connections.clear();
    }

    fn has_input(&self) -> bool {
        self.inner.lock().input.is_some()
    }

    fn add_output(&mut self, kind: OutputKind) -> Result<(), CaptureError> {
        let mut inner = self.inner.lock();
        let rejected = match kind {
            OutputKind::StillImage => inner.faults.reject_still_output,
            OutputKind::Metadata => inner.faults.reject_metadata_output,
        };
        if rejected || inner.outputs.contains(&kind) {
            return Err(CaptureError::OutputAttachFailed(kind));
        }
        inner.outputs.insert(kind);
        if kind == OutputKind::StillImage && inner.input.is_some() {
            inner.rebuild_still_connections();
        }
        Ok(())
    }

    fn remove_output(&mut self, kind: OutputKind) {
        let mut inner = self.inner.lock();
        inner.outputs.remove(&kind);
        match kind {
            OutputKind::StillImage => inner.still_connections.clear(),
            OutputKind::Metadata => {
                inner.code_families.clear();
                inner.metadata_callback = None;
            }
        }
    }

    fn has_output(&self, kind: OutputKind) -> bool {
        self.inner.lock().outputs.contains(&kind)
    }

    fn available_code_families(&self) -> BTreeSet<CodeFamily> {
        let inner = self.inner.lock();
        if inner.outputs.contains(&OutputKind::Metadata) {
            inner.available_families.clone()
        } else {
            BTreeSet::new()
        }
    }

    fn set_code_families(&mut self, families: &BTreeSet<CodeFamily>) {
        let mut inner = self.inner.lock();
        let unsupported: Vec<_> = families.difference(&inner.available_families).collect();
        if !unsupported.is_empty() {
            log::error!("metadata output asked for unavailable families: {:?}", unsupported);
            return;
        }
        inner.code_families = families.clone();
    }

    fn set_rect_of_interest(&mut self, rect: Rect) {
        self.inner.lock().rect_of_interest = rect;
    }

    fn set_metadata_callback(&mut self, callback: Option<MetadataCallback>) {
        self.inner.lock().metadata_callback = callback;
    }

    fn connections(&mut self, kind: OutputKind) -> Vec<&mut dyn CaptureConnection> {
        // Connections live behind the shared lock; hand out a view that
        // writes back through `ConnectionView`.
        match kind {
            OutputKind::StillImage => {
                let count = self.inner.lock().still_connections.len();
                let views: Vec<ConnectionView> = (0..count)
                    .map(|index| ConnectionView {
                        inner: Arc::clone(&self.inner),
                        index,
                    })
                    .collect();
                self.views = views;
                self.views
                    .iter_mut()
                    .map(|v| v as &mut dyn CaptureConnection)
                    .collect()
            }
            OutputKind::Metadata => Vec::new(),
        }
    }

    fn capture_still_image(&mut self, completion: StillImageCompletion) {
        let mut inner = self.inner.lock();
        let has_video = inner.still_connections.iter().any(|c| c.carries_video);
        if !has_video {
            drop(inner);
            completion(Err(CaptureError::NoActiveConnection));
            return;
        }
        if inner.faults.defer_capture {
            inner.pending_capture = Some(completion);
            return;
        }
        let result = match &inner.faults.capture_failure {
            Some(message) => Err(CaptureError::CaptureFailed(message.clone())),
            None => Ok(synthetic_frame()),
        };
        drop(inner);
        completion(result);
    }

    fn start_running(&mut self) {
        self.inner.lock().running = true;
    }

    fn stop_running(&mut self) {
        self.inner.lock().running = false;
    }

    fn is_running(&self) -> bool {
        self.inner.lock().running
    }
}

fn synthetic_frame() -> StillFrame {
    StillFrame {
        data: vec![0xFF, 0xD8, 0xFF, 0xD9],
        width: 1920,
        height: 1080,
    }
}

/// Test-side handle onto a `SimulatedSession`.
#[derive(Clone)]
pub struct SessionProbe {
    inner: Arc<Mutex<SessionInner>>,
}

impl SessionProbe {
    pub fn input_device_id(&self) -> Option<String> {
        self.inner.lock().input.as_ref().map(|d| d.unique_id())
    }

    /// Every device ever attached as input, in order.
    pub fn input_history(&self) -> Vec<String> {
        self.inner.lock().input_history.clone()
    }

    pub fn outputs(&self) -> BTreeSet<OutputKind> {
        self.inner.lock().outputs.clone()
    }

    pub fn is_fully_configured(&self) -> bool {
        let inner = self.inner.lock();
        inner.input.is_some()
            && inner.outputs.contains(&OutputKind::StillImage)
            && inner.outputs.contains(&OutputKind::Metadata)
    }

    pub fn is_unconfigured(&self) -> bool {
        let inner = self.inner.lock();
        inner.input.is_none() && inner.outputs.is_empty()
    }

    pub fn code_families(&self) -> BTreeSet<CodeFamily> {
        self.inner.lock().code_families.clone()
    }

    pub fn rect_of_interest(&self) -> Rect {
        self.inner.lock().rect_of_interest
    }

    pub fn has_metadata_callback(&self) -> bool {
        self.inner.lock().metadata_callback.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    /// Open begin-configuration brackets. Zero between public calls.
    pub fn configuration_depth(&self) -> u32 {
        self.inner.lock().configuration_depth
    }

    pub fn commit_count(&self) -> u32 {
        self.inner.lock().commits
    }

    pub fn still_orientations(&self) -> Vec<VideoOrientation> {
        self.inner
            .lock()
            .still_connections
            .iter()
            .map(|c| c.orientation)
            .collect()
    }

    /// Deliver one frame's metadata objects as the platform would, on the
    /// calling thread. Returns false when no callback is attached.
    pub fn emit(&self, objects: Vec<MetadataObject>) -> bool {
        let callback = self.inner.lock().metadata_callback.clone();
        match callback {
            Some(callback) => {
                callback(objects);
                true
            }
            None => false,
        }
    }

    pub fn has_pending_capture(&self) -> bool {
        self.inner.lock().pending_capture.is_some()
    }

    /// Finish a deferred still capture. Returns false if none was pending.
    pub fn complete_capture(&self) -> bool {
        let pending = self.inner.lock().pending_capture.take();
        match pending {
            Some(completion) => {
                completion(Ok(synthetic_frame()));
                true
            }
            None => false,
        }
    }
}

/// Borrowed view of one still-image connection.
struct ConnectionView {
    inner: Arc<Mutex<SessionInner>>,
    index: usize,
}

impl ConnectionView {
    fn read<R>(&self, f: impl FnOnce(&SimulatedConnection) -> R, default: R) -> R {
        let inner = self.inner.lock();
        inner.still_connections.get(self.index).map(f).unwrap_or(default)
    }
}

impl CaptureConnection for ConnectionView {
    fn carries_video(&self) -> bool {
        self.read(|c| c.carries_video, false)
    }

    fn supports_video_orientation(&self) -> bool {
        self.read(|c| c.supports_orientation, false)
    }

    fn video_orientation(&self) -> VideoOrientation {
        self.read(|c| c.orientation, VideoOrientation::Portrait)
    }

    fn set_video_orientation(&mut self, orientation: VideoOrientation) {
        let mut inner = self.inner.lock();
        if let Some(connection) = inner.still_connections.get_mut(self.index) {
            connection.set_video_orientation(orientation);
        }
    }
}

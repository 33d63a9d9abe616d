//! Simulated preview surface.

use std::sync::Arc;

use parking_lot::Mutex;

use barcode_capture_core::models::device::Point;
use barcode_capture_core::models::orientation::VideoOrientation;
use barcode_capture_core::traits::capture_session::CaptureConnection;
use barcode_capture_core::traits::preview_sink::PreviewSink;

use crate::session::{SimulatedConnection, SimulatedSession};

struct PreviewInner {
    bound: bool,
    binds: u32,
    connection: Option<SimulatedConnection>,
}

/// A preview layer of fixed size with aspect-fill gravity.
///
/// Preview points map linearly onto the normalized device space: the top-left
/// corner is (0, 0), the bottom-right corner (1, 1).
pub struct SimulatedPreview {
    width: f64,
    height: f64,
    inner: Arc<Mutex<PreviewInner>>,
}

impl SimulatedPreview {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            inner: Arc::new(Mutex::new(PreviewInner {
                bound: false,
                binds: 0,
                connection: None,
            })),
        }
    }

    pub fn probe(&self) -> PreviewProbe {
        PreviewProbe {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for SimulatedPreview {
    fn default() -> Self {
        Self::new(375.0, 667.0)
    }
}

impl PreviewSink for SimulatedPreview {
    type Session = SimulatedSession;

    fn bind(&mut self, session: &mut SimulatedSession) {
        let mut inner = self.inner.lock();
        inner.bound = true;
        inner.binds += 1;
        inner.connection = Some(SimulatedConnection::video(!session.fixed_orientation()));
    }

    fn unbind(&mut self) {
        let mut inner = self.inner.lock();
        inner.bound = false;
        inner.connection = None;
    }

    fn connection(&mut self) -> Option<&mut dyn CaptureConnection> {
        // The probe shares the inner state, so hand out a write-through view.
        if self.inner.lock().connection.is_none() {
            return None;
        }
        Some(self as &mut dyn CaptureConnection)
    }

    fn device_point_of_interest(&self, point: Point) -> Point {
        if self.width <= 0.0 || self.height <= 0.0 {
            return Point::CENTER;
        }
        Point::new(point.x / self.width, point.y / self.height).clamped_unit()
    }
}

impl CaptureConnection for SimulatedPreview {
    fn carries_video(&self) -> bool {
        self.inner.lock().connection.is_some()
    }

    fn supports_video_orientation(&self) -> bool {
        self.inner
            .lock()
            .connection
            .as_ref()
            .map_or(false, |c| c.supports_video_orientation())
    }

    fn video_orientation(&self) -> VideoOrientation {
        self.inner
            .lock()
            .connection
            .as_ref()
            .map_or(VideoOrientation::Portrait, |c| c.orientation())
    }

    fn set_video_orientation(&mut self, orientation: VideoOrientation) {
        if let Some(connection) = self.inner.lock().connection.as_mut() {
            connection.set_video_orientation(orientation);
        }
    }
}

/// Test-side handle onto a `SimulatedPreview` owned by a session.
#[derive(Clone)]
pub struct PreviewProbe {
    inner: Arc<Mutex<PreviewInner>>,
}

impl PreviewProbe {
    pub fn is_bound(&self) -> bool {
        self.inner.lock().bound
    }

    pub fn bind_count(&self) -> u32 {
        self.inner.lock().binds
    }

    pub fn orientation(&self) -> Option<VideoOrientation> {
        self.inner.lock().connection.as_ref().map(|c| c.orientation())
    }
}

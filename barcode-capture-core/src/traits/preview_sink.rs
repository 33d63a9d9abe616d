use crate::models::device::Point;
use crate::traits::capture_session::{CaptureConnection, CaptureSession};

/// Render target for the live feed (the external view's preview surface).
pub trait PreviewSink: Send + 'static {
    type Session: CaptureSession;

    /// Start rendering the given session.
    fn bind(&mut self, session: &mut Self::Session);

    /// Stop rendering and drop the preview connection.
    fn unbind(&mut self);

    /// The preview connection, present while bound.
    fn connection(&mut self) -> Option<&mut dyn CaptureConnection>;

    /// Convert a point in preview coordinates into a normalized device point
    /// of interest, accounting for gravity and orientation.
    fn device_point_of_interest(&self, point: Point) -> Point;
}

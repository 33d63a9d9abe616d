use crate::models::device::OutputKind;
use crate::models::orientation::{InterfaceOrientation, VideoOrientation};
use crate::session::graph::CaptureGraph;
use crate::traits::capture_session::CaptureSession;
use crate::traits::preview_sink::PreviewSink;

/// Keeps capture connections aligned with the interface orientation.
///
/// The still-image leg and the preview leg always receive the same
/// orientation.
#[derive(Debug, Clone)]
pub struct OrientationTracker {
    interface: InterfaceOrientation,
}

impl OrientationTracker {
    pub fn new(initial: InterfaceOrientation) -> Self {
        Self { interface: initial }
    }

    /// Interface → capture orientation. Anything unmapped is portrait.
    pub fn map(orientation: InterfaceOrientation) -> VideoOrientation {
        VideoOrientation::from(orientation)
    }

    pub fn interface_orientation(&self) -> InterfaceOrientation {
        self.interface
    }

    pub fn capture_orientation(&self) -> VideoOrientation {
        Self::map(self.interface)
    }

    /// Record a new interface orientation and push it to every connection
    /// that supports orientation changes. Returns the number of connections
    /// updated; zero when there is no graph.
    pub fn apply<S, V>(
        &mut self,
        orientation: InterfaceOrientation,
        graph: Option<&mut CaptureGraph<S>>,
        preview: &mut V,
    ) -> usize
    where
        S: CaptureSession,
        V: PreviewSink<Session = S>,
    {
        self.interface = orientation;
        self.reapply(graph, preview)
    }

    /// Push the current orientation again, e.g. after a camera switch.
    pub fn reapply<S, V>(&self, graph: Option<&mut CaptureGraph<S>>, preview: &mut V) -> usize
    where
        S: CaptureSession,
        V: PreviewSink<Session = S>,
    {
        let Some(graph) = graph else {
            return 0;
        };
        apply_to_connections(graph.session_mut(), preview, self.capture_orientation())
    }
}

impl Default for OrientationTracker {
    fn default() -> Self {
        Self::new(InterfaceOrientation::Portrait)
    }
}

/// Set `orientation` on every orientation-capable still-image connection and
/// on the preview connection.
pub(crate) fn apply_to_connections<S, V>(
    session: &mut S,
    preview: &mut V,
    orientation: VideoOrientation,
) -> usize
where
    S: CaptureSession,
    V: PreviewSink<Session = S>,
{
    let mut updated = 0;

    for connection in session.connections(OutputKind::StillImage) {
        if connection.supports_video_orientation() {
            connection.set_video_orientation(orientation);
            updated += 1;
        }
    }

    if let Some(connection) = preview.connection() {
        if connection.supports_video_orientation() {
            connection.set_video_orientation(orientation);
            updated += 1;
        }
    }

    log::debug!("capture orientation {:?} applied to {} connection(s)", orientation, updated);
    updated
}

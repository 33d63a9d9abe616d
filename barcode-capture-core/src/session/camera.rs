use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::models::authorization::AuthorizationState;
use crate::models::captured_image::CapturedImage;
use crate::models::code::{CodeFamily, MetadataObject};
use crate::models::config::CameraConfiguration;
use crate::models::device::{Adjustment, Point};
use crate::models::error::CaptureError;
use crate::models::orientation::{InterfaceOrientation, VideoOrientation};
use crate::models::state::{SessionDiagnostics, SessionState};
use crate::session::detection::{count_codes, CodeDetectionSink};
use crate::session::device_controller::DeviceController;
use crate::session::graph::CaptureGraph;
use crate::session::orientation::OrientationTracker;
use crate::session::permission::PermissionGate;
use crate::session::queue::{QueueHandle, SerialQueue};
use crate::traits::camera_delegate::CameraDelegate;
use crate::traits::capture_device::CaptureDevice;
use crate::traits::capture_platform::{CapturePlatform, PlatformEvent, PlatformEventHandler};
use crate::traits::capture_session::{MetadataCallback, StillImageCompletion};
use crate::traits::preview_sink::PreviewSink;

/// Completion of `CameraSession::snap`, invoked exactly once on the session
/// queue.
pub type SnapCompletion = Box<dyn FnOnce(Result<CapturedImage, CaptureError>) + Send + 'static>;

/// A snap completion reachable from both the queue and its fallback paths.
/// Whichever path claims it first runs it; later claims are no-ops.
#[derive(Clone)]
struct PendingSnap(Arc<Mutex<Option<SnapCompletion>>>);

impl PendingSnap {
    fn new(completion: SnapCompletion) -> Self {
        Self(Arc::new(Mutex::new(Some(completion))))
    }

    fn complete(&self, result: Result<CapturedImage, CaptureError>) {
        let completion = self.0.lock().take();
        if let Some(completion) = completion {
            completion(result);
        }
    }
}

/// Notifications produced under the core lock and delivered after it is
/// released.
enum Notice {
    State(SessionState),
    Unavailable(CaptureError),
}

/// Mutable session state. Only ever touched from the session queue.
struct SessionCore<P: CapturePlatform> {
    platform: Arc<P>,
    preview: P::Preview,
    config: CameraConfiguration,
    graph: Option<CaptureGraph<P::Session>>,
    gate: PermissionGate,
    tracker: OrientationTracker,
    state: SessionState,
    diagnostics: SessionDiagnostics,
    /// Ticket of the outstanding still capture, if any.
    snap_in_flight: Option<u64>,
    snap_tickets: u64,
    /// Build the graph when the open permission prompt is granted.
    build_on_grant: bool,
    unavailable_reported: bool,
    outbox: Vec<Notice>,
}

impl<P: CapturePlatform> SessionCore<P> {
    fn set_state(&mut self, state: SessionState) {
        if self.state == state {
            return;
        }
        log::debug!("session state {:?} → {:?}", self.state, state);
        self.state = state.clone();
        self.outbox.push(Notice::State(state));
    }

    fn report_unavailable(&mut self, error: CaptureError) {
        self.set_state(SessionState::Unavailable(error.clone()));
        if !self.unavailable_reported {
            self.unavailable_reported = true;
            self.outbox.push(Notice::Unavailable(error));
        }
    }

    fn graph_mut(&mut self) -> Result<&mut CaptureGraph<P::Session>, CaptureError> {
        self.graph.as_mut().ok_or_else(|| {
            log::info!("camera not initialized");
            CaptureError::NotConfigured
        })
    }

    /// Build the capture graph. Returns the enabled families on success.
    fn build_graph(
        &mut self,
        on_metadata: MetadataCallback,
    ) -> Result<BTreeSet<CodeFamily>, CaptureError> {
        if let Some(graph) = &self.graph {
            return Ok(graph.enabled_families().clone());
        }

        let platform = Arc::clone(&self.platform);
        let result = CaptureGraph::setup(
            platform.default_device(),
            || platform.create_session(),
            &mut self.preview,
            &self.config,
            on_metadata,
        );

        let mut graph = match result {
            Ok(graph) => graph,
            Err(e) => {
                log::error!("capture graph setup failed: {}", e);
                self.set_state(SessionState::Failed(e.clone()));
                return Err(e);
            }
        };

        self.tracker.reapply(Some(&mut graph), &mut self.preview);
        if self.config.enable_subject_area_monitoring {
            let monitoring = adjust_device(&mut self.diagnostics, &**graph.device(), |c| {
                c.enable_subject_area_monitoring()
            });
            if let Err(e) = monitoring {
                log::warn!("subject area monitoring not enabled: {}", e);
            }
        }

        let families = graph.enabled_families().clone();
        self.graph = Some(graph);
        self.set_state(SessionState::Ready);
        Ok(families)
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        self.graph_mut()?.start();
        self.set_state(SessionState::Running);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.graph_mut()?.stop();
        self.set_state(SessionState::Ready);
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(graph) = self.graph.take() {
            graph.teardown(&mut self.preview);
        }
        // A capture on the old graph no longer holds the slot.
        self.snap_in_flight = None;
        let awaiting = std::mem::take(&mut self.build_on_grant);
        if self.state.is_configured() || awaiting {
            self.set_state(SessionState::Idle);
        }
    }

    fn switch_camera(&mut self) -> Result<String, CaptureError> {
        let devices = self.platform.devices();
        let orientation = self.tracker.capture_orientation();
        let graph = self.graph.as_mut().ok_or(CaptureError::NotConfigured)?;

        match graph.switch_device(&devices, &mut self.preview, orientation) {
            Ok(device) => {
                self.diagnostics.camera_switches += 1;
                if self.config.enable_subject_area_monitoring {
                    let monitoring = adjust_device(&mut self.diagnostics, &*device, |c| {
                        c.enable_subject_area_monitoring()
                    });
                    if let Err(e) = monitoring {
                        log::warn!("subject area monitoring not enabled on new camera: {}", e);
                    }
                }
                Ok(device.unique_id())
            }
            Err(CaptureError::NoAlternativeCamera) => Err(CaptureError::NoAlternativeCamera),
            Err(e) => {
                self.diagnostics.switch_rollbacks += 1;
                Err(e)
            }
        }
    }

    fn toggle_torch(&mut self) -> Result<Adjustment, CaptureError> {
        let graph = self.graph.as_ref().ok_or(CaptureError::NotConfigured)?;
        adjust_device(&mut self.diagnostics, &**graph.device(), |c| c.toggle_torch())
    }

    fn handle_tap(&mut self, point: Point) -> Result<Adjustment, CaptureError> {
        let graph = self.graph.as_ref().ok_or(CaptureError::NotConfigured)?;
        let point_of_interest = self.preview.device_point_of_interest(point);
        adjust_device(&mut self.diagnostics, &**graph.device(), |c| {
            c.lock_focus(point_of_interest)
        })
    }

    fn subject_area_changed(&mut self, device_id: Option<&str>) -> Result<Adjustment, CaptureError> {
        let graph = self.graph.as_ref().ok_or(CaptureError::NotConfigured)?;
        if let Some(id) = device_id {
            if id != graph.device().unique_id() {
                log::debug!("subject area change for inactive camera {} ignored", id);
                return Ok(Adjustment::Skipped);
            }
        }
        adjust_device(&mut self.diagnostics, &**graph.device(), |c| {
            c.handle_subject_area_change()
        })
    }

    fn update_orientation(&mut self, orientation: InterfaceOrientation) -> VideoOrientation {
        self.tracker
            .apply(orientation, self.graph.as_mut(), &mut self.preview);
        self.tracker.capture_orientation()
    }

    /// Validate a snap request and mark it outstanding.
    fn begin_snap(&mut self) -> Result<(u64, VideoOrientation, String), CaptureError> {
        if self.snap_in_flight.is_some() {
            log::warn!("still capture already in progress");
            return Err(CaptureError::CaptureInProgress);
        }
        let graph = self.graph_mut()?;
        let Some(orientation) = graph.still_video_orientation() else {
            log::warn!("no video connection for still image output");
            return Err(CaptureError::NoActiveConnection);
        };
        let device_id = graph.device().unique_id();
        self.snap_tickets += 1;
        self.snap_in_flight = Some(self.snap_tickets);
        Ok((self.snap_tickets, orientation, device_id))
    }

    fn has_alternative_camera(&self) -> bool {
        match &self.graph {
            Some(graph) => graph.alternative_device(&self.platform.devices()).is_some(),
            None => false,
        }
    }
}

/// Run one device mutation, counting configuration-lock failures.
fn adjust_device<D: CaptureDevice + ?Sized>(
    diagnostics: &mut SessionDiagnostics,
    device: &D,
    adjust: impl FnOnce(&DeviceController<'_, D>) -> Result<Adjustment, CaptureError>,
) -> Result<Adjustment, CaptureError> {
    let result = adjust(&DeviceController::new(device));
    if let Err(CaptureError::ConfigurationLockFailed(_)) = &result {
        diagnostics.lock_failures += 1;
    }
    result
}

/// State shared between the facade, queued jobs and platform callbacks.
struct Inner<P: CapturePlatform> {
    core: Mutex<SessionCore<P>>,
    sink: CodeDetectionSink,
    queue: QueueHandle,
}

impl<P: CapturePlatform> Inner<P> {
    /// Run `f` under the core lock, then deliver whatever it queued for the
    /// delegate with the lock released.
    fn with_core<R>(&self, f: impl FnOnce(&mut SessionCore<P>) -> R) -> R {
        let (result, notices) = {
            let mut core = self.core.lock();
            let result = f(&mut core);
            (result, std::mem::take(&mut core.outbox))
        };
        self.deliver(notices);
        result
    }

    fn deliver(&self, notices: Vec<Notice>) {
        if notices.is_empty() {
            return;
        }
        let Some(delegate) = self.sink.consumer() else {
            return;
        };
        for notice in notices {
            match notice {
                Notice::State(state) => delegate.on_state_changed(&state),
                Notice::Unavailable(error) => delegate.on_camera_unavailable(&error),
            }
        }
    }

    fn metadata_callback(self: &Arc<Self>) -> MetadataCallback {
        let weak = Arc::downgrade(self);
        let queue = self.queue.clone();
        Arc::new(move |objects: Vec<MetadataObject>| {
            let weak = Weak::clone(&weak);
            let posted = queue.dispatch(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.deliver_detections(objects);
                }
            });
            if posted.is_err() {
                log::debug!("detections after session shutdown dropped");
            }
        })
    }

    fn setup(self: &Arc<Self>) -> Result<AuthorizationState, CaptureError> {
        let weak = Arc::downgrade(self);
        let on_metadata = self.metadata_callback();

        let result = self.with_core(|core| {
            if core.graph.is_some() {
                return Ok((AuthorizationState::Authorized, None));
            }

            let platform = Arc::clone(&core.platform);
            let outcome = core.gate.check_and_request(
                platform.authorization_status(),
                |completion| platform.request_access(completion),
                &self.queue,
                move |granted| {
                    if let Some(inner) = weak.upgrade() {
                        inner.access_resolved(granted);
                    }
                },
            );

            match outcome {
                AuthorizationState::Authorized => {
                    core.build_graph(on_metadata).map(|families| (outcome, Some(families)))
                }
                AuthorizationState::NotDetermined => {
                    core.build_on_grant = true;
                    core.set_state(SessionState::AwaitingPermission);
                    Ok((outcome, None))
                }
                AuthorizationState::Restricted | AuthorizationState::Denied => {
                    let error = outcome
                        .as_error()
                        .unwrap_or(CaptureError::PermissionDenied);
                    core.report_unavailable(error.clone());
                    Err(error)
                }
            }
        });

        let (outcome, families) = result?;
        if let Some(families) = families {
            self.sink.set_enabled_families(families);
        }
        Ok(outcome)
    }

    fn access_resolved(self: &Arc<Self>, granted: bool) {
        let on_metadata = self.metadata_callback();
        let families = self.with_core(|core| {
            core.gate.resolve(granted);
            let wanted = std::mem::take(&mut core.build_on_grant);
            if !granted {
                core.report_unavailable(CaptureError::PermissionDenied);
                return None;
            }
            if !wanted {
                log::info!("camera access granted after teardown, graph not built");
                return None;
            }
            core.build_graph(on_metadata).ok()
        });
        if let Some(families) = families {
            self.sink.set_enabled_families(families);
        }
    }

    fn deliver_detections(&self, objects: Vec<MetadataObject>) {
        let running = self
            .core
            .lock()
            .graph
            .as_ref()
            .map_or(false, |g| g.is_running());

        if !running {
            let dropped = count_codes(&objects);
            if dropped > 0 {
                log::debug!("session not running, dropping {} code(s)", dropped);
                self.core.lock().diagnostics.detections_dropped += dropped;
            }
            return;
        }

        let report = self.sink.on_detections(&objects);
        let mut core = self.core.lock();
        core.diagnostics.detections_delivered += report.delivered;
        core.diagnostics.detections_dropped += report.dropped;
    }

    fn snap(self: &Arc<Self>, pending: PendingSnap) {
        let prepared = self.with_core(|core| core.begin_snap());
        let (ticket, orientation, device_id) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                pending.complete(Err(e));
                return;
            }
        };

        let weak = Arc::downgrade(self);
        let queue = self.queue.clone();
        let on_frame: StillImageCompletion = Box::new(move |result| {
            let fallback = pending.clone();
            let posted = queue.dispatch(move || {
                let result = result.map(|frame| {
                    CapturedImage::new(frame.data, frame.width, frame.height, orientation, &device_id)
                });
                if let Some(inner) = weak.upgrade() {
                    inner.finish_snap(ticket, result.is_ok());
                }
                pending.complete(result);
            });
            if posted.is_err() {
                log::warn!("still image arrived after session shutdown");
                fallback.complete(Err(CaptureError::QueueUnavailable));
            }
        });

        self.with_core(|core| match core.graph.as_mut() {
            Some(graph) => graph.capture_still_image(on_frame),
            None => {
                core.snap_in_flight = None;
                on_frame(Err(CaptureError::NotConfigured));
            }
        });
    }

    fn finish_snap(&self, ticket: u64, succeeded: bool) {
        let mut core = self.core.lock();
        if core.snap_in_flight == Some(ticket) {
            core.snap_in_flight = None;
        }
        if succeeded {
            core.diagnostics.snaps_completed += 1;
        }
    }

    fn handle_event(&self, event: PlatformEvent) {
        match event {
            PlatformEvent::SubjectAreaChanged { device_id } => {
                let result = self.with_core(|core| core.subject_area_changed(Some(&device_id)));
                if let Err(e) = result {
                    log::debug!("subject area change not handled: {}", e);
                }
            }
            PlatformEvent::InterfaceOrientationChanged(orientation) => {
                self.with_core(|core| core.update_orientation(orientation));
            }
        }
    }

    fn shutdown(&self) {
        let platform = self.with_core(|core| {
            core.teardown();
            Arc::clone(&core.platform)
        });
        platform.set_event_handler(None);
        self.sink.set_consumer(None);
    }
}

/// Camera session facade.
///
/// Owns the session queue and composes permission handling, the capture
/// graph, orientation tracking, device control and code detection. Every
/// command is executed on the session queue and waits for its result, so the
/// facade can be driven from any thread. Delegate callbacks run on the queue
/// and may call back into the facade.
///
/// ```text
/// UI thread ──command──→ [session queue] ──→ SessionCore (graph, gate, tracker)
/// platform  ──metadata─→ [session queue] ──→ CodeDetectionSink ──→ delegate
/// platform  ──events───→ [session queue] ──→ orientation / subject area
/// ```
pub struct CameraSession<P: CapturePlatform> {
    inner: Arc<Inner<P>>,
    queue: SerialQueue,
}

impl<P: CapturePlatform> CameraSession<P> {
    pub fn new(
        platform: Arc<P>,
        preview: P::Preview,
        config: CameraConfiguration,
    ) -> Result<Self, CaptureError> {
        config.validate()?;

        let queue = SerialQueue::new(&config.queue_label)?;
        let tracker = OrientationTracker::new(config.initial_orientation);

        let inner = Arc::new(Inner {
            core: Mutex::new(SessionCore {
                platform: Arc::clone(&platform),
                preview,
                config,
                graph: None,
                gate: PermissionGate::new(),
                tracker,
                state: SessionState::Idle,
                diagnostics: SessionDiagnostics::default(),
                snap_in_flight: None,
                snap_tickets: 0,
                build_on_grant: false,
                unavailable_reported: false,
                outbox: Vec::new(),
            }),
            sink: CodeDetectionSink::new(),
            queue: queue.handle(),
        });

        let weak = Arc::downgrade(&inner);
        let events = queue.handle();
        let handler: PlatformEventHandler = Arc::new(move |event: PlatformEvent| {
            let weak = Weak::clone(&weak);
            let posted = events.dispatch(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_event(event);
                }
            });
            if posted.is_err() {
                log::debug!("platform event after session shutdown dropped");
            }
        });
        platform.set_event_handler(Some(handler));

        Ok(Self { inner, queue })
    }

    fn run<R: Send + 'static>(
        &self,
        job: impl FnOnce(&Arc<Inner<P>>) -> R + Send + 'static,
    ) -> Result<R, CaptureError> {
        let inner = Arc::clone(&self.inner);
        self.queue.sync(move || job(&inner))
    }

    /// Register the consumer of detected codes and state changes.
    pub fn set_delegate(&self, delegate: Arc<dyn CameraDelegate>) -> Result<(), CaptureError> {
        self.run(move |inner| inner.sink.set_consumer(Some(delegate)))
    }

    /// Back to the explicit "no consumer" state; detections are dropped.
    pub fn clear_delegate(&self) -> Result<(), CaptureError> {
        self.run(|inner| inner.sink.set_consumer(None))
    }

    /// Check authorization and build the capture graph.
    ///
    /// - authorized: builds the graph now and returns `Authorized`;
    /// - not determined: prompts once and returns `NotDetermined`; the graph
    ///   is built on the queue when the prompt is granted;
    /// - restricted/denied: returns the permission error and notifies the
    ///   delegate once. No graph is ever attempted.
    pub fn setup(&self) -> Result<AuthorizationState, CaptureError> {
        self.run(|inner| inner.setup())?
    }

    pub fn start(&self) -> Result<(), CaptureError> {
        self.run(|inner| inner.with_core(|core| core.start()))?
    }

    pub fn stop(&self) -> Result<(), CaptureError> {
        self.run(|inner| inner.with_core(|core| core.stop()))?
    }

    /// Stop and dismantle the graph. A later `setup()` rebuilds it.
    pub fn teardown(&self) -> Result<(), CaptureError> {
        self.run(|inner| {
            inner.with_core(|core| core.teardown());
            inner.sink.set_enabled_families(BTreeSet::new());
        })
    }

    /// Swap to the next camera in enumeration order. Returns its id.
    pub fn switch_camera(&self) -> Result<String, CaptureError> {
        self.run(|inner| inner.with_core(|core| core.switch_camera()))?
    }

    pub fn toggle_torch(&self) -> Result<Adjustment, CaptureError> {
        self.run(|inner| inner.with_core(|core| core.toggle_torch()))?
    }

    /// Tap-to-focus at a point in preview coordinates.
    pub fn handle_tap(&self, point: Point) -> Result<Adjustment, CaptureError> {
        self.run(move |inner| inner.with_core(|core| core.handle_tap(point)))?
    }

    /// Apply a new interface orientation. Returns the capture orientation now
    /// in effect.
    pub fn update_orientation(
        &self,
        orientation: InterfaceOrientation,
    ) -> Result<VideoOrientation, CaptureError> {
        self.run(move |inner| inner.with_core(|core| core.update_orientation(orientation)))
    }

    /// React to a subject-area change on the active camera.
    pub fn subject_area_changed(&self) -> Result<Adjustment, CaptureError> {
        self.run(|inner| inner.with_core(|core| core.subject_area_changed(None)))?
    }

    /// Capture a still image. `completion` runs exactly once, with an error
    /// when the graph is not configured, no video connection exists, or a
    /// capture is already outstanding. It runs on the session queue unless
    /// the queue is gone, in which case it gets `QueueUnavailable` on the
    /// calling thread.
    pub fn snap(
        &self,
        completion: impl FnOnce(Result<CapturedImage, CaptureError>) + Send + 'static,
    ) -> Result<(), CaptureError> {
        let pending = PendingSnap::new(Box::new(completion));
        let job = pending.clone();
        if let Err(e) = self.run(move |inner| inner.snap(job)) {
            log::warn!("snap not queued: {}", e);
            pending.complete(Err(e.clone()));
            return Err(e);
        }
        Ok(())
    }

    /// Wait until every job queued so far, including platform callbacks,
    /// has run.
    pub fn flush(&self) -> Result<(), CaptureError> {
        self.queue.flush()
    }

    pub fn state(&self) -> Result<SessionState, CaptureError> {
        self.run(|inner| inner.core.lock().state.clone())
    }

    pub fn authorization_state(&self) -> Result<AuthorizationState, CaptureError> {
        self.run(|inner| inner.core.lock().gate.state())
    }

    pub fn is_running(&self) -> Result<bool, CaptureError> {
        self.run(|inner| {
            inner
                .core
                .lock()
                .graph
                .as_ref()
                .map_or(false, |g| g.is_running())
        })
    }

    pub fn has_torch(&self) -> Result<bool, CaptureError> {
        self.run(|inner| {
            inner
                .core
                .lock()
                .graph
                .as_ref()
                .map_or(false, |g| g.device().has_torch())
        })
    }

    pub fn has_alternative_camera(&self) -> Result<bool, CaptureError> {
        self.run(|inner| inner.core.lock().has_alternative_camera())
    }

    pub fn active_device_id(&self) -> Result<Option<String>, CaptureError> {
        self.run(|inner| {
            inner
                .core
                .lock()
                .graph
                .as_ref()
                .map(|g| g.device().unique_id())
        })
    }

    pub fn enabled_code_families(&self) -> Result<BTreeSet<CodeFamily>, CaptureError> {
        self.run(|inner| inner.sink.enabled_families())
    }

    pub fn capture_orientation(&self) -> Result<VideoOrientation, CaptureError> {
        self.run(|inner| inner.core.lock().tracker.capture_orientation())
    }

    pub fn diagnostics(&self) -> Result<SessionDiagnostics, CaptureError> {
        self.run(|inner| inner.core.lock().diagnostics.clone())
    }
}

impl<P: CapturePlatform> Drop for CameraSession<P> {
    fn drop(&mut self) {
        if self.run(|inner| inner.shutdown()).is_err() {
            log::warn!("session queue gone before shutdown");
        }
    }
}

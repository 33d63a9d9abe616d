#![allow(dead_code)]

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use barcode_capture_core::{
    CameraConfiguration, CameraDelegate, CameraSession, CaptureError, CapturedImage, DetectedCode,
    SessionState,
};
use barcode_capture_sim::{PreviewProbe, SessionProbe, SimulatedPlatform, SimulatedPreview};

pub type Camera = CameraSession<SimulatedPlatform>;

/// Delegate that records everything it is told.
#[derive(Default)]
pub struct Recorder {
    pub codes: Mutex<Vec<DetectedCode>>,
    pub states: Mutex<Vec<SessionState>>,
    pub unavailable: Mutex<Vec<CaptureError>>,
}

impl Recorder {
    pub fn payloads(&self) -> Vec<String> {
        self.codes.lock().iter().map(|c| c.payload.clone()).collect()
    }
}

impl CameraDelegate for Recorder {
    fn on_code_detected(&self, code: &DetectedCode) {
        self.codes.lock().push(code.clone());
    }

    fn on_state_changed(&self, state: &SessionState) {
        self.states.lock().push(state.clone());
    }

    fn on_camera_unavailable(&self, error: &CaptureError) {
        self.unavailable.lock().push(error.clone());
    }
}

pub struct Harness {
    pub platform: Arc<SimulatedPlatform>,
    pub camera: Camera,
    pub preview: PreviewProbe,
    pub recorder: Arc<Recorder>,
}

impl Harness {
    pub fn new(platform: SimulatedPlatform) -> Self {
        Self::with_config(platform, CameraConfiguration::default())
    }

    pub fn with_config(platform: SimulatedPlatform, config: CameraConfiguration) -> Self {
        Self::build(platform, SimulatedPreview::new(400.0, 800.0), config)
    }

    pub fn build(
        platform: SimulatedPlatform,
        preview: SimulatedPreview,
        config: CameraConfiguration,
    ) -> Self {
        let platform = Arc::new(platform);
        let preview_probe = preview.probe();
        let camera = CameraSession::new(Arc::clone(&platform), preview, config).unwrap();
        let recorder = Arc::new(Recorder::default());
        camera.set_delegate(recorder.clone()).unwrap();
        Self {
            platform,
            camera,
            preview: preview_probe,
            recorder,
        }
    }

    /// Two cameras, authorized, set up and running.
    pub fn running() -> Self {
        let harness = Self::new(SimulatedPlatform::with_two_cameras());
        harness.camera.setup().unwrap();
        harness.camera.start().unwrap();
        harness
    }

    pub fn session(&self) -> SessionProbe {
        self.platform.latest_session().expect("no session created")
    }

    /// Snap and wait for the completion.
    pub fn snap_blocking(&self) -> Result<CapturedImage, CaptureError> {
        let (tx, rx) = mpsc::channel();
        self.camera
            .snap(move |result| {
                tx.send(result).unwrap();
            })
            .unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap()
    }
}

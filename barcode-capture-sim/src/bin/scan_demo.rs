//! Drives a `CameraSession` against the simulated backend and prints what the
//! delegate sees.
//!
//! ```text
//! RUST_LOG=debug cargo run -p barcode-capture-sim --bin scan_demo [config.json]
//! ```

use std::sync::mpsc;
use std::sync::Arc;

use barcode_capture_core::{
    CameraConfiguration, CameraDelegate, CameraSession, CaptureError, CodeFamily, DetectedCode,
    InterfaceOrientation, MetadataObject, Point, PlatformEvent, SessionState,
};
use barcode_capture_sim::{SimulatedPlatform, SimulatedPreview};

struct PrintingDelegate;

impl CameraDelegate for PrintingDelegate {
    fn on_code_detected(&self, code: &DetectedCode) {
        println!("code  {:<16} {}", code.family.as_str(), code.payload);
    }

    fn on_state_changed(&self, state: &SessionState) {
        println!("state {:?}", state);
    }

    fn on_camera_unavailable(&self, error: &CaptureError) {
        println!("camera unavailable: {}", error);
    }
}

fn load_config() -> Result<CameraConfiguration, CaptureError> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .map_err(|e| CaptureError::InvalidConfiguration(format!("{}: {}", path, e)))?;
            CameraConfiguration::from_json_str(&json)
        }
        None => Ok(CameraConfiguration::default()),
    }
}

fn main() -> Result<(), CaptureError> {
    env_logger::init();

    let config = load_config()?;
    let platform = Arc::new(SimulatedPlatform::with_two_cameras());
    let camera = CameraSession::new(Arc::clone(&platform), SimulatedPreview::default(), config)?;
    camera.set_delegate(Arc::new(PrintingDelegate))?;

    camera.setup()?;
    camera.start()?;

    let Some(session) = platform.latest_session() else {
        return Err(CaptureError::NotConfigured);
    };
    session.emit(vec![
        MetadataObject::code(CodeFamily::EAN13, "4006381333931"),
        MetadataObject::Face { face_id: 1 },
        MetadataObject::code(CodeFamily::QR, "https://example.org/ticket/42"),
    ]);

    println!("torch {:?}", camera.toggle_torch()?);
    println!("tap   {:?}", camera.handle_tap(Point::new(187.0, 333.0))?);
    platform.emit_event(PlatformEvent::InterfaceOrientationChanged(
        InterfaceOrientation::LandscapeLeft,
    ));
    camera.flush()?;
    println!("orientation {:?}", camera.capture_orientation()?);

    let (tx, rx) = mpsc::channel();
    camera.snap(move |result| {
        let _ = tx.send(result);
    })?;
    match rx.recv() {
        Ok(Ok(image)) => println!(
            "snap  {} {}x{} {:?} from {}",
            image.id, image.width, image.height, image.orientation, image.device_id
        ),
        Ok(Err(e)) => println!("snap failed: {}", e),
        Err(_) => println!("snap completion dropped"),
    }

    match camera.switch_camera() {
        Ok(id) => println!("switched to {}", id),
        Err(e) => println!("switch failed: {}", e),
    }

    camera.stop()?;
    println!("{:#?}", camera.diagnostics()?);
    camera.teardown()
}

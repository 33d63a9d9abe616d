//! # barcode-capture-sim
//!
//! In-process simulated camera backend for barcode-capture-kit.
//!
//! Provides:
//! - `SimulatedPlatform`: permission prompt, device list, session factory, broadcast events
//! - `SimulatedDevice`: torch, focus and subject-area monitoring behind a configuration lock
//! - `SimulatedSession`: capture graph wiring with injectable faults (`SessionFaults`)
//! - `SimulatedPreview`: preview surface with a fixed size
//!
//! Every simulated object hands out a probe (`SessionProbe`, `PreviewProbe`)
//! so its state can be inspected after ownership moved into a `CameraSession`.
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use barcode_capture_core::{CameraConfiguration, CameraSession, MetadataObject, CodeFamily};
//! use barcode_capture_sim::{SimulatedPlatform, SimulatedPreview};
//!
//! let platform = Arc::new(SimulatedPlatform::with_two_cameras());
//! let camera = CameraSession::new(platform.clone(), SimulatedPreview::default(), CameraConfiguration::default())?;
//! camera.set_delegate(Arc::new(|code: &_| println!("{:?}", code)))?;
//! camera.setup()?;
//! camera.start()?;
//! platform.latest_session().unwrap().emit(vec![MetadataObject::code(CodeFamily::QR, "hello")]);
//! ```

pub mod device;
pub mod platform;
pub mod preview;
pub mod session;

pub use device::{DeviceCapabilities, DeviceSnapshot, SimulatedDevice};
pub use platform::{PromptBehavior, SimulatedPlatform};
pub use preview::{PreviewProbe, SimulatedPreview};
pub use session::{SessionFaults, SessionProbe, SimulatedConnection, SimulatedSession};

//! Simulated camera device.
//!
//! Models the parts of a camera the session core touches: torch, focus and
//! subject-area monitoring, all behind an exclusive configuration lock.
//! Faults (busy device, failing lock) can be injected at any time.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use barcode_capture_core::models::device::{DeviceInfo, DevicePosition, FocusMode, Point, TorchMode};
use barcode_capture_core::models::error::CaptureError;
use barcode_capture_core::traits::capture_device::CaptureDevice;

/// What a simulated device can do.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCapabilities {
    pub position: DevicePosition,
    pub has_torch: bool,
    pub torch_modes: Vec<TorchMode>,
    pub focus_point_of_interest: bool,
    pub focus_modes: Vec<FocusMode>,
}

impl DeviceCapabilities {
    /// Rear camera: torch, tap-to-focus, all focus modes.
    pub fn back_camera() -> Self {
        Self {
            position: DevicePosition::Back,
            has_torch: true,
            torch_modes: vec![TorchMode::Off, TorchMode::On],
            focus_point_of_interest: true,
            focus_modes: vec![
                FocusMode::Locked,
                FocusMode::AutoFocus,
                FocusMode::ContinuousAutoFocus,
            ],
        }
    }

    /// Front camera: fixed focus, no torch.
    pub fn front_camera() -> Self {
        Self {
            position: DevicePosition::Front,
            has_torch: false,
            torch_modes: Vec::new(),
            focus_point_of_interest: false,
            focus_modes: vec![FocusMode::Locked],
        }
    }
}

/// Observable device state, for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub torch_mode: TorchMode,
    pub focus_mode: FocusMode,
    pub focus_point_of_interest: Point,
    pub subject_area_monitoring: bool,
    pub locked: bool,
    pub lock_count: u32,
    /// Mutations attempted without holding the configuration lock.
    pub unlocked_mutations: u32,
}

pub struct SimulatedDevice {
    id: String,
    name: String,
    capabilities: DeviceCapabilities,
    state: Mutex<DeviceSnapshot>,
    busy: AtomicBool,
    lock_fails: AtomicBool,
}

impl SimulatedDevice {
    pub fn new(id: &str, name: &str, capabilities: DeviceCapabilities) -> Self {
        let focus_mode = if capabilities.focus_modes.contains(&FocusMode::ContinuousAutoFocus) {
            FocusMode::ContinuousAutoFocus
        } else {
            FocusMode::Locked
        };
        Self {
            id: id.to_string(),
            name: name.to_string(),
            capabilities,
            state: Mutex::new(DeviceSnapshot {
                torch_mode: TorchMode::Off,
                focus_mode,
                focus_point_of_interest: Point::CENTER,
                subject_area_monitoring: false,
                locked: false,
                lock_count: 0,
                unlocked_mutations: 0,
            }),
            busy: AtomicBool::new(false),
            lock_fails: AtomicBool::new(false),
        }
    }

    pub fn back(id: &str) -> Self {
        Self::new(id, "Back Camera", DeviceCapabilities::back_camera())
    }

    pub fn front(id: &str) -> Self {
        Self::new(id, "Front Camera", DeviceCapabilities::front_camera())
    }

    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        self.state.lock().clone()
    }

    /// A busy device refuses to become a session input.
    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn set_lock_fails(&self, fails: bool) {
        self.lock_fails.store(fails, Ordering::SeqCst);
    }

    fn mutate(&self, what: &str, apply: impl FnOnce(&mut DeviceSnapshot)) {
        let mut state = self.state.lock();
        if !state.locked {
            log::error!("{}: {} changed without configuration lock", self.id, what);
            state.unlocked_mutations += 1;
            return;
        }
        apply(&mut state);
    }
}

impl CaptureDevice for SimulatedDevice {
    fn unique_id(&self) -> String {
        self.id.clone()
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            position: self.capabilities.position,
            has_torch: self.capabilities.has_torch,
        }
    }

    fn has_torch(&self) -> bool {
        self.capabilities.has_torch
    }

    fn torch_mode(&self) -> TorchMode {
        self.state.lock().torch_mode
    }

    fn is_torch_mode_supported(&self, mode: TorchMode) -> bool {
        self.capabilities.has_torch && self.capabilities.torch_modes.contains(&mode)
    }

    fn is_focus_point_of_interest_supported(&self) -> bool {
        self.capabilities.focus_point_of_interest
    }

    fn is_focus_mode_supported(&self, mode: FocusMode) -> bool {
        self.capabilities.focus_modes.contains(&mode)
    }

    fn focus_mode(&self) -> FocusMode {
        self.state.lock().focus_mode
    }

    fn focus_point_of_interest(&self) -> Point {
        self.state.lock().focus_point_of_interest
    }

    fn is_subject_area_change_monitoring_enabled(&self) -> bool {
        self.state.lock().subject_area_monitoring
    }

    fn lock_for_configuration(&self) -> Result<(), CaptureError> {
        if self.lock_fails.load(Ordering::SeqCst) {
            return Err(CaptureError::ConfigurationLockFailed(format!(
                "{} is locked by another client",
                self.id
            )));
        }
        let mut state = self.state.lock();
        if state.locked {
            return Err(CaptureError::ConfigurationLockFailed(format!(
                "{} already locked",
                self.id
            )));
        }
        state.locked = true;
        state.lock_count += 1;
        Ok(())
    }

    fn unlock_for_configuration(&self) {
        self.state.lock().locked = false;
    }

    fn set_torch_mode(&self, mode: TorchMode) {
        self.mutate("torch mode", |s| s.torch_mode = mode);
    }

    fn set_focus_point_of_interest(&self, point: Point) {
        self.mutate("focus point", |s| s.focus_point_of_interest = point);
    }

    /// Auto-focus completes instantly here: the lens settles and locks.
    fn set_focus_mode(&self, mode: FocusMode) {
        let settled = match mode {
            FocusMode::AutoFocus => FocusMode::Locked,
            other => other,
        };
        self.mutate("focus mode", |s| s.focus_mode = settled);
    }

    fn set_subject_area_change_monitoring(&self, enabled: bool) {
        self.mutate("subject area monitoring", |s| s.subject_area_monitoring = enabled);
    }
}

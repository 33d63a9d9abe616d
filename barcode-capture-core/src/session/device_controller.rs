use std::ops::Deref;

use crate::models::device::{Adjustment, FocusMode, Point};
use crate::models::error::CaptureError;
use crate::traits::capture_device::CaptureDevice;

/// Exclusive configuration lock on a device, released on drop.
///
/// Never hold one across a suspension point.
pub struct ConfigurationLock<'a, D: CaptureDevice + ?Sized> {
    device: &'a D,
}

impl<'a, D: CaptureDevice + ?Sized> ConfigurationLock<'a, D> {
    pub fn acquire(device: &'a D) -> Result<Self, CaptureError> {
        device.lock_for_configuration().map_err(|e| {
            log::warn!("error locking camera configuration: {}", e);
            match e {
                CaptureError::ConfigurationLockFailed(_) => e,
                other => CaptureError::ConfigurationLockFailed(other.to_string()),
            }
        })?;
        Ok(Self { device })
    }
}

impl<D: CaptureDevice + ?Sized> Deref for ConfigurationLock<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.device
    }
}

impl<D: CaptureDevice + ?Sized> Drop for ConfigurationLock<'_, D> {
    fn drop(&mut self) {
        self.device.unlock_for_configuration();
    }
}

/// Scoped reconfiguration of a single device.
///
/// Every mutation checks capabilities first (returning `Skipped` without
/// touching the device), then changes one logical property under the
/// configuration lock.
pub struct DeviceController<'a, D: CaptureDevice + ?Sized> {
    device: &'a D,
}

impl<'a, D: CaptureDevice + ?Sized> DeviceController<'a, D> {
    pub fn new(device: &'a D) -> Self {
        Self { device }
    }

    pub fn toggle_torch(&self) -> Result<Adjustment, CaptureError> {
        if !self.device.has_torch() {
            log::debug!("torch toggle ignored, device has no torch");
            return Ok(Adjustment::Skipped);
        }

        let target = self.device.torch_mode().toggled();
        if !self.device.is_torch_mode_supported(target) {
            log::debug!("torch mode {:?} not supported", target);
            return Ok(Adjustment::Skipped);
        }

        let device = ConfigurationLock::acquire(self.device)?;
        device.set_torch_mode(target);
        log::info!("torch is {:?}", target);
        Ok(Adjustment::Applied)
    }

    /// Focus once at `point` (normalized device coordinates), then hold.
    pub fn lock_focus(&self, point: Point) -> Result<Adjustment, CaptureError> {
        if !self.device.is_focus_point_of_interest_supported()
            || !self.device.is_focus_mode_supported(FocusMode::AutoFocus)
        {
            log::info!("focus point not supported by current camera");
            return Ok(Adjustment::Skipped);
        }

        let device = ConfigurationLock::acquire(self.device)?;
        device.set_focus_point_of_interest(point.clamped_unit());
        device.set_focus_mode(FocusMode::AutoFocus);
        log::info!("focus mode locked to focus point ({:.3}, {:.3})", point.x, point.y);
        Ok(Adjustment::Applied)
    }

    pub fn enable_continuous_auto_focus(&self) -> Result<Adjustment, CaptureError> {
        if !self.device.is_focus_mode_supported(FocusMode::ContinuousAutoFocus) {
            return Ok(Adjustment::Skipped);
        }

        let device = ConfigurationLock::acquire(self.device)?;
        device.set_focus_mode(FocusMode::ContinuousAutoFocus);
        log::info!("continuous focus mode");
        Ok(Adjustment::Applied)
    }

    /// Only meaningful on devices that can lock focus.
    pub fn enable_subject_area_monitoring(&self) -> Result<Adjustment, CaptureError> {
        if !self.device.is_focus_mode_supported(FocusMode::Locked) {
            return Ok(Adjustment::Skipped);
        }

        let device = ConfigurationLock::acquire(self.device)?;
        device.set_subject_area_change_monitoring(true);
        Ok(Adjustment::Applied)
    }

    /// The scene changed after a tap-to-focus: recenter and go back to
    /// continuous auto-focus. Ignored unless focus is currently locked.
    pub fn handle_subject_area_change(&self) -> Result<Adjustment, CaptureError> {
        if self.device.focus_mode() != FocusMode::Locked {
            return Ok(Adjustment::Skipped);
        }
        let recenter = self.device.is_focus_point_of_interest_supported();
        let continuous = self.device.is_focus_mode_supported(FocusMode::ContinuousAutoFocus);
        if !recenter && !continuous {
            log::debug!("subject area change ignored, focus is fixed");
            return Ok(Adjustment::Skipped);
        }

        let device = ConfigurationLock::acquire(self.device)?;
        if recenter {
            device.set_focus_point_of_interest(Point::CENTER);
        }
        if continuous {
            device.set_focus_mode(FocusMode::ContinuousAutoFocus);
        }
        log::info!("subject area changed, continuous focus mode");
        Ok(Adjustment::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::{DeviceInfo, DevicePosition, TorchMode};
    use approx::assert_relative_eq;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Settings {
        torch: TorchMode,
        focus: FocusMode,
        point: Point,
        monitoring: bool,
    }

    struct TestDevice {
        has_torch: bool,
        torch_on_supported: bool,
        focus_point_supported: bool,
        focus_modes: Vec<FocusMode>,
        lock_fails: bool,
        locked: Mutex<bool>,
        lock_count: Mutex<u32>,
        settings: Mutex<Settings>,
    }

    impl TestDevice {
        fn full() -> Self {
            Self {
                has_torch: true,
                torch_on_supported: true,
                focus_point_supported: true,
                focus_modes: vec![
                    FocusMode::Locked,
                    FocusMode::AutoFocus,
                    FocusMode::ContinuousAutoFocus,
                ],
                lock_fails: false,
                locked: Mutex::new(false),
                lock_count: Mutex::new(0),
                settings: Mutex::new(Settings {
                    torch: TorchMode::Off,
                    focus: FocusMode::ContinuousAutoFocus,
                    point: Point::CENTER,
                    monitoring: false,
                }),
            }
        }

        fn settings(&self) -> Settings {
            *self.settings.lock()
        }

        fn assert_config_locked(&self) {
            assert!(*self.locked.lock(), "mutated without configuration lock");
        }
    }

    impl CaptureDevice for TestDevice {
        fn unique_id(&self) -> String {
            "test".into()
        }
        fn info(&self) -> DeviceInfo {
            DeviceInfo {
                id: "test".into(),
                name: "Test".into(),
                position: DevicePosition::Back,
                has_torch: self.has_torch,
            }
        }
        fn has_torch(&self) -> bool {
            self.has_torch
        }
        fn torch_mode(&self) -> TorchMode {
            self.settings.lock().torch
        }
        fn is_torch_mode_supported(&self, mode: TorchMode) -> bool {
            self.has_torch && (mode == TorchMode::Off || self.torch_on_supported)
        }
        fn is_focus_point_of_interest_supported(&self) -> bool {
            self.focus_point_supported
        }
        fn is_focus_mode_supported(&self, mode: FocusMode) -> bool {
            self.focus_modes.contains(&mode)
        }
        fn focus_mode(&self) -> FocusMode {
            self.settings.lock().focus
        }
        fn focus_point_of_interest(&self) -> Point {
            self.settings.lock().point
        }
        fn is_subject_area_change_monitoring_enabled(&self) -> bool {
            self.settings.lock().monitoring
        }
        fn lock_for_configuration(&self) -> Result<(), CaptureError> {
            if self.lock_fails {
                return Err(CaptureError::ConfigurationLockFailed("busy".into()));
            }
            *self.locked.lock() = true;
            *self.lock_count.lock() += 1;
            Ok(())
        }
        fn unlock_for_configuration(&self) {
            *self.locked.lock() = false;
        }
        fn set_torch_mode(&self, mode: TorchMode) {
            self.assert_config_locked();
            self.settings.lock().torch = mode;
        }
        fn set_focus_point_of_interest(&self, point: Point) {
            self.assert_config_locked();
            self.settings.lock().point = point;
        }
        fn set_focus_mode(&self, mode: FocusMode) {
            self.assert_config_locked();
            self.settings.lock().focus = mode;
        }
        fn set_subject_area_change_monitoring(&self, enabled: bool) {
            self.assert_config_locked();
            self.settings.lock().monitoring = enabled;
        }
    }

    #[test]
    fn toggle_torch_flips_and_releases_lock() {
        let device = TestDevice::full();
        let controller = DeviceController::new(&device);

        assert_eq!(controller.toggle_torch().unwrap(), Adjustment::Applied);
        assert_eq!(device.settings().torch, TorchMode::On);
        assert!(!*device.locked.lock());

        assert_eq!(controller.toggle_torch().unwrap(), Adjustment::Applied);
        assert_eq!(device.settings().torch, TorchMode::Off);
        assert_eq!(*device.lock_count.lock(), 2);
    }

    #[test]
    fn toggle_torch_without_torch_leaves_device_untouched() {
        for torch_on_supported in [false, true] {
            for lock_fails in [false, true] {
                let device = TestDevice {
                    has_torch: false,
                    torch_on_supported,
                    lock_fails,
                    ..TestDevice::full()
                };
                let before = device.settings();

                let outcome = DeviceController::new(&device).toggle_torch().unwrap();

                assert_eq!(outcome, Adjustment::Skipped);
                assert_eq!(device.settings(), before);
                assert_eq!(*device.lock_count.lock(), 0);
            }
        }
    }

    #[test]
    fn toggle_torch_skips_unsupported_target_mode() {
        let device = TestDevice {
            torch_on_supported: false,
            ..TestDevice::full()
        };

        let outcome = DeviceController::new(&device).toggle_torch().unwrap();

        assert_eq!(outcome, Adjustment::Skipped);
        assert_eq!(device.settings().torch, TorchMode::Off);
    }

    #[test]
    fn lock_failure_aborts_mutation() {
        let device = TestDevice {
            lock_fails: true,
            ..TestDevice::full()
        };
        let before = device.settings();
        let controller = DeviceController::new(&device);

        assert!(matches!(
            controller.toggle_torch(),
            Err(CaptureError::ConfigurationLockFailed(_))
        ));
        assert!(matches!(
            controller.lock_focus(Point::new(0.2, 0.8)),
            Err(CaptureError::ConfigurationLockFailed(_))
        ));
        assert_eq!(device.settings(), before);
    }

    #[test]
    fn lock_focus_sets_point_then_auto_focus() {
        let device = TestDevice::full();

        let outcome = DeviceController::new(&device)
            .lock_focus(Point::new(0.25, 0.75))
            .unwrap();

        assert_eq!(outcome, Adjustment::Applied);
        let settings = device.settings();
        assert_relative_eq!(settings.point.x, 0.25);
        assert_relative_eq!(settings.point.y, 0.75);
        assert_eq!(settings.focus, FocusMode::AutoFocus);
        assert!(!*device.locked.lock());
    }

    #[test]
    fn lock_focus_clamps_point_into_unit_square() {
        let device = TestDevice::full();

        DeviceController::new(&device)
            .lock_focus(Point::new(-0.5, 1.5))
            .unwrap();

        let point = device.settings().point;
        assert_relative_eq!(point.x, 0.0);
        assert_relative_eq!(point.y, 1.0);
    }

    #[test]
    fn lock_focus_skipped_without_point_of_interest() {
        let device = TestDevice {
            focus_point_supported: false,
            ..TestDevice::full()
        };

        let outcome = DeviceController::new(&device)
            .lock_focus(Point::new(0.1, 0.1))
            .unwrap();

        assert_eq!(outcome, Adjustment::Skipped);
        assert_eq!(device.settings().focus, FocusMode::ContinuousAutoFocus);
    }

    #[test]
    fn subject_area_change_relaxes_locked_focus() {
        let device = TestDevice::full();
        {
            let mut settings = device.settings.lock();
            settings.focus = FocusMode::Locked;
            settings.point = Point::new(0.9, 0.1);
        }

        let outcome = DeviceController::new(&device)
            .handle_subject_area_change()
            .unwrap();

        assert_eq!(outcome, Adjustment::Applied);
        let settings = device.settings();
        assert_eq!(settings.focus, FocusMode::ContinuousAutoFocus);
        assert_relative_eq!(settings.point.x, 0.5);
        assert_relative_eq!(settings.point.y, 0.5);
    }

    #[test]
    fn subject_area_change_ignored_unless_locked() {
        let device = TestDevice::full();

        let outcome = DeviceController::new(&device)
            .handle_subject_area_change()
            .unwrap();

        assert_eq!(outcome, Adjustment::Skipped);
        assert_eq!(*device.lock_count.lock(), 0);
    }

    #[test]
    fn subject_area_change_on_fixed_focus_device_is_skipped() {
        let device = TestDevice {
            focus_point_supported: false,
            focus_modes: vec![FocusMode::Locked],
            ..TestDevice::full()
        };
        device.settings.lock().focus = FocusMode::Locked;

        let outcome = DeviceController::new(&device)
            .handle_subject_area_change()
            .unwrap();

        assert_eq!(outcome, Adjustment::Skipped);
        assert_eq!(*device.lock_count.lock(), 0);
    }

    #[test]
    fn subject_area_monitoring_requires_lockable_focus() {
        let device = TestDevice {
            focus_modes: vec![FocusMode::ContinuousAutoFocus],
            ..TestDevice::full()
        };
        assert_eq!(
            DeviceController::new(&device)
                .enable_subject_area_monitoring()
                .unwrap(),
            Adjustment::Skipped
        );

        let device = TestDevice::full();
        assert_eq!(
            DeviceController::new(&device)
                .enable_subject_area_monitoring()
                .unwrap(),
            Adjustment::Applied
        );
        assert!(device.settings().monitoring);
    }

    #[test]
    fn continuous_auto_focus_when_supported() {
        let device = TestDevice::full();
        device.settings.lock().focus = FocusMode::Locked;

        DeviceController::new(&device)
            .enable_continuous_auto_focus()
            .unwrap();

        assert_eq!(device.settings().focus, FocusMode::ContinuousAutoFocus);
    }
}

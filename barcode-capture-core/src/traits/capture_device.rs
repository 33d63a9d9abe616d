use crate::models::device::{DeviceInfo, FocusMode, Point, TorchMode};
use crate::models::error::CaptureError;

/// A physical camera exposed by the platform.
///
/// Read accessors may be called at any time. Mutators are only valid while
/// the exclusive configuration lock is held; the core reaches them
/// exclusively through `DeviceController`, which scopes the lock.
///
/// Implemented by:
/// - `SimulatedDevice` (barcode-capture-sim)
pub trait CaptureDevice: Send + Sync {
    /// Stable identifier, unique among the platform's devices.
    fn unique_id(&self) -> String;

    fn info(&self) -> DeviceInfo;

    fn has_torch(&self) -> bool;
    fn torch_mode(&self) -> TorchMode;
    fn is_torch_mode_supported(&self, mode: TorchMode) -> bool;

    fn is_focus_point_of_interest_supported(&self) -> bool;
    fn is_focus_mode_supported(&self, mode: FocusMode) -> bool;
    fn focus_mode(&self) -> FocusMode;
    fn focus_point_of_interest(&self) -> Point;
    fn is_subject_area_change_monitoring_enabled(&self) -> bool;

    /// Try to take the exclusive configuration lock.
    fn lock_for_configuration(&self) -> Result<(), CaptureError>;

    /// Release the configuration lock.
    fn unlock_for_configuration(&self);

    fn set_torch_mode(&self, mode: TorchMode);
    fn set_focus_point_of_interest(&self, point: Point);
    fn set_focus_mode(&self, mode: FocusMode);
    fn set_subject_area_change_monitoring(&self, enabled: bool);
}

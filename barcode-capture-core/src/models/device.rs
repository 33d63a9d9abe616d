use std::fmt;

use serde::{Deserialize, Serialize};

/// Torch (continuous light) mode of a capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TorchMode {
    #[default]
    Off,
    On,
}

impl TorchMode {
    pub fn toggled(&self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Off,
        }
    }
}

/// Focus mode of a capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FocusMode {
    /// Lens position fixed.
    Locked,
    /// Focus once, then lock.
    AutoFocus,
    #[default]
    ContinuousAutoFocus,
}

/// Position of a camera on the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DevicePosition {
    Back,
    Front,
    External,
    Unspecified,
}

/// A 2D point. Depending on context either in preview coordinates or a
/// normalized (0..1, 0..1) device point of interest.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const CENTER: Point = Point { x: 0.5, y: 0.5 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn clamped_unit(&self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
        }
    }
}

/// Normalized rectangle within the capture frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const UNIT: Rect = Rect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    /// Positive area and fully inside the unit square.
    pub fn is_valid_normalized(&self) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= 1.0
            && self.y + self.height <= 1.0
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self::UNIT
    }
}

/// The output legs of a capture graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputKind {
    StillImage,
    Metadata,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StillImage => f.write_str("still image"),
            Self::Metadata => f.write_str("metadata"),
        }
    }
}

/// Outcome of a device mutation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Applied,
    /// The device lacks the capability; nothing was touched.
    Skipped,
}

impl Adjustment {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Static description of a capture device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub position: DevicePosition,
    pub has_torch: bool,
}

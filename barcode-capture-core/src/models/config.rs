use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::code::CodeFamily;
use super::device::Rect;
use super::error::CaptureError;
use super::orientation::InterfaceOrientation;

/// Configuration for a camera session.
///
/// Loadable from camelCase JSON; absent fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraConfiguration {
    /// Families to enable. The effective set is the intersection with what
    /// the metadata output supports on the active hardware.
    pub code_families: BTreeSet<CodeFamily>,

    /// Normalized region the metadata output scans (default: whole frame).
    pub rect_of_interest: Rect,

    /// Orientation applied right after setup.
    pub initial_orientation: InterfaceOrientation,

    /// Enable subject-area change monitoring on the device after setup.
    pub enable_subject_area_monitoring: bool,

    /// Name of the session queue thread.
    pub queue_label: String,
}

impl CameraConfiguration {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.code_families.is_empty() {
            return Err(CaptureError::InvalidConfiguration(
                "at least one code family must be requested".into(),
            ));
        }
        if !self.rect_of_interest.is_valid_normalized() {
            return Err(CaptureError::InvalidConfiguration(format!(
                "rect of interest out of bounds: {:?}",
                self.rect_of_interest
            )));
        }
        if self.queue_label.is_empty() {
            return Err(CaptureError::InvalidConfiguration(
                "queue label must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::InvalidConfiguration(format!("failed to parse: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, CaptureError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CaptureError::InvalidConfiguration(format!("failed to serialize: {}", e)))
    }
}

impl Default for CameraConfiguration {
    fn default() -> Self {
        Self {
            code_families: CodeFamily::supported(),
            rect_of_interest: Rect::UNIT,
            initial_orientation: InterfaceOrientation::Portrait,
            enable_subject_area_monitoring: true,
            queue_label: "camera-session".into(),
        }
    }
}

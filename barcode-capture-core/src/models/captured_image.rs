use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::orientation::VideoOrientation;

/// A still image delivered by `snap`. Not persisted by the core.
///
/// Serializes as metadata only; the encoded bytes stay out of the JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedImage {
    pub id: String,
    #[serde(skip)]
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub orientation: VideoOrientation,
    pub device_id: String,
    pub captured_at: DateTime<Utc>,
}

impl CapturedImage {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        orientation: VideoOrientation,
        device_id: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            data,
            width,
            height,
            orientation,
            device_id: device_id.to_string(),
            captured_at: Utc::now(),
        }
    }
}

/// Raw frame returned by a platform still-image capture, before the core
/// stamps it with orientation and device identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StillFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

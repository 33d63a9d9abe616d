use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Camera-usage authorization as reported by the OS.
///
/// ```text
/// notDetermined → authorized / denied   (one prompt, resolves once)
/// restricted, denied                    (terminal for the session)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationState {
    Authorized,
    NotDetermined,
    Restricted,
    Denied,
}

impl AuthorizationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Restricted | Self::Denied)
    }

    /// The error surfaced to the consumer for a terminal state.
    pub fn as_error(&self) -> Option<CaptureError> {
        match self {
            Self::Restricted => Some(CaptureError::PermissionRestricted),
            Self::Denied => Some(CaptureError::PermissionDenied),
            Self::Authorized | Self::NotDetermined => None,
        }
    }
}

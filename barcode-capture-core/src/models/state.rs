use super::error::CaptureError;

/// Camera session state machine.
///
/// State transitions:
/// ```text
/// idle → awaitingPermission → ready ⇄ running
///   ↓            ↓              ↓
/// unavailable  unavailable    idle (teardown)
///   failed (setup error, retry with setup())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingPermission,
    Ready,
    Running,
    Unavailable(CaptureError),
    Failed(CaptureError),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Graph exists, whether running or not.
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Ready | Self::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    pub fn error(&self) -> Option<&CaptureError> {
        match self {
            Self::Unavailable(e) | Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Counters for debugging a camera session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDiagnostics {
    pub detections_delivered: u64,
    pub detections_dropped: u64,
    pub camera_switches: u64,
    pub switch_rollbacks: u64,
    pub snaps_completed: u64,
    pub lock_failures: u64,
}

use crate::models::authorization::AuthorizationState;
use crate::session::queue::QueueHandle;
use crate::traits::capture_platform::AccessCompletion;

/// Tracks camera authorization for one session and guarantees at most one
/// outstanding OS prompt.
///
/// Restricted and denied are remembered: once seen, the OS is not queried
/// again for the lifetime of the session.
#[derive(Debug)]
pub struct PermissionGate {
    state: AuthorizationState,
    request_pending: bool,
}

impl PermissionGate {
    pub fn new() -> Self {
        Self {
            state: AuthorizationState::NotDetermined,
            request_pending: false,
        }
    }

    pub fn state(&self) -> AuthorizationState {
        self.state
    }

    pub fn is_request_pending(&self) -> bool {
        self.request_pending
    }

    /// Fold the OS status into the gate and prompt if needed.
    ///
    /// `current` is the status the OS reports now. When it is
    /// `NotDetermined` and no prompt is outstanding, `request_access` is
    /// called exactly once; its completion is re-posted onto `queue` where
    /// `on_resolved` runs. Duplicate calls while the prompt is up only return
    /// `NotDetermined`.
    pub fn check_and_request(
        &mut self,
        current: AuthorizationState,
        request_access: impl FnOnce(AccessCompletion),
        queue: &QueueHandle,
        on_resolved: impl FnOnce(bool) + Send + 'static,
    ) -> AuthorizationState {
        if self.state.is_terminal() {
            return self.state;
        }

        if self.request_pending {
            log::debug!("camera permission prompt already outstanding");
            return AuthorizationState::NotDetermined;
        }

        self.state = current;
        match current {
            AuthorizationState::Authorized => {
                log::info!("authorized to use camera");
            }
            AuthorizationState::NotDetermined => {
                log::info!("requesting camera permission");
                self.request_pending = true;

                let queue = queue.clone();
                request_access(Box::new(move |granted| {
                    let posted = queue.dispatch(move || on_resolved(granted));
                    if posted.is_err() {
                        log::warn!("permission resolved after session queue shut down");
                    }
                }));
            }
            AuthorizationState::Restricted => {
                log::warn!("unauthorized to use camera (restricted)");
            }
            AuthorizationState::Denied => {
                log::warn!("unauthorized to use camera (denied)");
            }
        }
        self.state
    }

    /// Record the prompt's answer. Must run on the session queue.
    pub fn resolve(&mut self, granted: bool) -> AuthorizationState {
        self.request_pending = false;
        self.state = if granted {
            log::info!("camera permission granted");
            AuthorizationState::Authorized
        } else {
            log::warn!("camera permission refused");
            AuthorizationState::Denied
        };
        self.state
    }
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new()
    }
}

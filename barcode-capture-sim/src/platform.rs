//! Simulated platform: permission prompt, device enumeration, session factory
//! and broadcast events.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;

use barcode_capture_core::models::authorization::AuthorizationState;
use barcode_capture_core::models::code::CodeFamily;
use barcode_capture_core::traits::capture_device::CaptureDevice;
use barcode_capture_core::traits::capture_platform::{
    AccessCompletion, CapturePlatform, PlatformEvent, PlatformEventHandler,
};

use crate::device::SimulatedDevice;
use crate::preview::SimulatedPreview;
use crate::session::{SessionFaults, SessionProbe, SimulatedSession};

/// How the permission prompt answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptBehavior {
    /// Answer from inside `request_access`.
    Immediate(bool),
    /// Stay open until `answer_prompt` is called.
    Deferred,
}

struct PlatformInner {
    authorization: AuthorizationState,
    prompt: PromptBehavior,
    pending_prompts: Vec<AccessCompletion>,
    prompts_shown: u32,
    devices: Vec<Arc<SimulatedDevice>>,
    available_families: BTreeSet<CodeFamily>,
    faults: SessionFaults,
    sessions: Vec<SessionProbe>,
    event_handler: Option<PlatformEventHandler>,
}

pub struct SimulatedPlatform {
    inner: Mutex<PlatformInner>,
}

impl SimulatedPlatform {
    /// Authorized, no devices, every known code family available.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PlatformInner {
                authorization: AuthorizationState::Authorized,
                prompt: PromptBehavior::Deferred,
                pending_prompts: Vec::new(),
                prompts_shown: 0,
                devices: Vec::new(),
                available_families: CodeFamily::supported(),
                faults: SessionFaults::default(),
                sessions: Vec::new(),
                event_handler: None,
            }),
        }
    }

    /// A phone-like platform: back camera "back", front camera "front".
    pub fn with_two_cameras() -> Self {
        let platform = Self::new();
        platform.add_device(SimulatedDevice::back("back"));
        platform.add_device(SimulatedDevice::front("front"));
        platform
    }

    pub fn add_device(&self, device: SimulatedDevice) -> Arc<SimulatedDevice> {
        let device = Arc::new(device);
        self.inner.lock().devices.push(Arc::clone(&device));
        device
    }

    pub fn device(&self, id: &str) -> Option<Arc<SimulatedDevice>> {
        self.inner
            .lock()
            .devices
            .iter()
            .find(|d| d.unique_id() == id)
            .cloned()
    }

    pub fn set_authorization(&self, state: AuthorizationState) {
        self.inner.lock().authorization = state;
    }

    pub fn set_prompt_behavior(&self, behavior: PromptBehavior) {
        self.inner.lock().prompt = behavior;
    }

    pub fn set_available_families(&self, families: BTreeSet<CodeFamily>) {
        self.inner.lock().available_families = families;
    }

    /// Faults applied to every session created from now on.
    pub fn set_session_faults(&self, faults: SessionFaults) {
        self.inner.lock().faults = faults;
    }

    pub fn prompts_shown(&self) -> u32 {
        self.inner.lock().prompts_shown
    }

    pub fn pending_prompts(&self) -> usize {
        self.inner.lock().pending_prompts.len()
    }

    /// Answer every open prompt. The recorded authorization follows the
    /// answer. Returns the number of prompts answered.
    pub fn answer_prompt(&self, granted: bool) -> usize {
        let pending = {
            let mut inner = self.inner.lock();
            inner.authorization = granted_state(granted);
            std::mem::take(&mut inner.pending_prompts)
        };
        let answered = pending.len();
        for completion in pending {
            completion(granted);
        }
        answered
    }

    pub fn sessions_created(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn latest_session(&self) -> Option<SessionProbe> {
        self.inner.lock().sessions.last().cloned()
    }

    pub fn has_event_handler(&self) -> bool {
        self.inner.lock().event_handler.is_some()
    }

    /// Broadcast an event on the calling thread. Returns false when nobody
    /// listens.
    pub fn emit_event(&self, event: PlatformEvent) -> bool {
        let handler = self.inner.lock().event_handler.clone();
        match handler {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn granted_state(granted: bool) -> AuthorizationState {
    if granted {
        AuthorizationState::Authorized
    } else {
        AuthorizationState::Denied
    }
}

impl CapturePlatform for SimulatedPlatform {
    type Device = SimulatedDevice;
    type Session = SimulatedSession;
    type Preview = SimulatedPreview;

    fn authorization_status(&self) -> AuthorizationState {
        self.inner.lock().authorization
    }

    fn request_access(&self, completion: AccessCompletion) {
        let immediate = {
            let mut inner = self.inner.lock();
            inner.prompts_shown += 1;
            match inner.prompt {
                PromptBehavior::Immediate(granted) => {
                    inner.authorization = granted_state(granted);
                    Some(granted)
                }
                PromptBehavior::Deferred => {
                    inner.pending_prompts.push(completion);
                    return;
                }
            }
        };
        if let Some(granted) = immediate {
            log::debug!("permission prompt answered: granted={}", granted);
            completion(granted);
        }
    }

    fn devices(&self) -> Vec<Arc<SimulatedDevice>> {
        self.inner.lock().devices.clone()
    }

    fn create_session(&self) -> SimulatedSession {
        let mut inner = self.inner.lock();
        let session = SimulatedSession::new(inner.available_families.clone(), inner.faults.clone());
        inner.sessions.push(session.probe());
        session
    }

    fn set_event_handler(&self, handler: Option<PlatformEventHandler>) {
        self.inner.lock().event_handler = handler;
    }
}

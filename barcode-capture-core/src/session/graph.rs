use std::collections::BTreeSet;
use std::sync::Arc;

use crate::models::code::CodeFamily;
use crate::models::config::CameraConfiguration;
use crate::models::device::OutputKind;
use crate::models::error::CaptureError;
use crate::models::orientation::VideoOrientation;
use crate::session::orientation::apply_to_connections;
use crate::traits::capture_device::CaptureDevice;
use crate::traits::capture_session::{CaptureSession, MetadataCallback, StillImageCompletion};
use crate::traits::preview_sink::PreviewSink;

/// A fully configured capture pipeline.
///
/// ```text
///                      ┌→ [still-image output]
/// [device] → [input] ──┼→ [metadata output] → detection callback
///                      └→ [preview sink]
/// ```
///
/// A `CaptureGraph` only exists when the session holds an input and both
/// outputs. Failed setups dismantle whatever they added before returning, so
/// no partially wired session escapes.
pub struct CaptureGraph<S: CaptureSession> {
    device: Arc<S::Device>,
    session: S,
    enabled_families: BTreeSet<CodeFamily>,
}

impl<S: CaptureSession> CaptureGraph<S> {
    /// Build the pipeline for `device` inside one configuration transaction.
    ///
    /// `create_session` is only called once a device is known to exist.
    pub fn setup<V>(
        device: Option<Arc<S::Device>>,
        create_session: impl FnOnce() -> S,
        preview: &mut V,
        config: &CameraConfiguration,
        on_metadata: MetadataCallback,
    ) -> Result<Self, CaptureError>
    where
        V: PreviewSink<Session = S>,
    {
        let Some(device) = device else {
            log::error!("camera not found");
            return Err(CaptureError::NoDeviceFound);
        };
        let mut session = create_session();

        session.begin_configuration();
        let wired = Self::attach_legs(&mut session, &device, config, on_metadata);
        if wired.is_err() {
            Self::dismantle(&mut session);
        }
        session.commit_configuration();

        let enabled_families = wired?;
        preview.bind(&mut session);
        log::info!("capture graph configured for device {}", device.unique_id());

        Ok(Self {
            device,
            session,
            enabled_families,
        })
    }

    fn attach_legs(
        session: &mut S,
        device: &Arc<S::Device>,
        config: &CameraConfiguration,
        on_metadata: MetadataCallback,
    ) -> Result<BTreeSet<CodeFamily>, CaptureError> {
        session.add_input(device).map_err(|e| {
            log::error!("unable to add video input to capture session: {}", e);
            as_input_error(e)
        })?;

        session.add_output(OutputKind::StillImage).map_err(|e| {
            log::error!("unable to add still image output to capture session: {}", e);
            CaptureError::OutputAttachFailed(OutputKind::StillImage)
        })?;

        session.add_output(OutputKind::Metadata).map_err(|e| {
            log::error!("unable to add metadata output to capture session: {}", e);
            CaptureError::OutputAttachFailed(OutputKind::Metadata)
        })?;
        session.set_metadata_callback(Some(on_metadata));

        let available = session.available_code_families();
        let enabled = intersect_families(&config.code_families, &available);
        if enabled.is_empty() {
            log::warn!("no supported code families active on this hardware");
        } else {
            log::info!("enabled code families: {:?}", enabled);
        }
        let unsupported: Vec<_> = config.code_families.difference(&enabled).collect();
        if !unsupported.is_empty() {
            log::info!("requested but unsupported code families: {:?}", unsupported);
        }
        session.set_code_families(&enabled);
        session.set_rect_of_interest(config.rect_of_interest);

        Ok(enabled)
    }

    /// Remove every leg this graph may have attached. Caller brackets it in
    /// a configuration transaction.
    fn dismantle(session: &mut S) {
        session.set_metadata_callback(None);
        for kind in [OutputKind::Metadata, OutputKind::StillImage] {
            if session.has_output(kind) {
                session.remove_output(kind);
            }
        }
        if session.has_input() {
            session.remove_input();
        }
    }

    /// Stop the session, detach everything and unbind the preview.
    pub fn teardown<V>(mut self, preview: &mut V) -> S
    where
        V: PreviewSink<Session = S>,
    {
        self.stop();
        self.session.begin_configuration();
        Self::dismantle(&mut self.session);
        self.session.commit_configuration();
        preview.unbind();
        log::info!("capture graph torn down");
        self.session
    }

    pub fn start(&mut self) {
        if !self.session.is_running() {
            log::info!("start camera");
            self.session.start_running();
        }
    }

    pub fn stop(&mut self) {
        if self.session.is_running() {
            log::info!("stop camera");
            self.session.stop_running();
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    pub fn device(&self) -> &Arc<S::Device> {
        &self.device
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn enabled_families(&self) -> &BTreeSet<CodeFamily> {
        &self.enabled_families
    }

    /// The first device in enumeration order that is not the active one.
    pub fn alternative_device(&self, devices: &[Arc<S::Device>]) -> Option<Arc<S::Device>> {
        let current = self.device.unique_id();
        devices.iter().find(|d| d.unique_id() != current).cloned()
    }

    /// Swap the input leg to the alternative device.
    ///
    /// Runs in one configuration transaction that is always committed. If the
    /// new input is refused, the original input is put back and the error is
    /// returned; the session never ends up without a video input.
    pub fn switch_device<V>(
        &mut self,
        devices: &[Arc<S::Device>],
        preview: &mut V,
        orientation: VideoOrientation,
    ) -> Result<Arc<S::Device>, CaptureError>
    where
        V: PreviewSink<Session = S>,
    {
        let Some(next) = self.alternative_device(devices) else {
            log::info!("no alternative camera to switch to");
            return Err(CaptureError::NoAlternativeCamera);
        };

        self.session.begin_configuration();
        self.session.remove_input();

        let outcome = match self.session.add_input(&next) {
            Ok(()) => {
                log::info!(
                    "switched camera {} → {}",
                    self.device.unique_id(),
                    next.unique_id()
                );
                self.device = Arc::clone(&next);
                apply_to_connections(&mut self.session, preview, orientation);
                Ok(next)
            }
            Err(e) => {
                log::warn!("unable to switch to camera {}: {}", next.unique_id(), e);
                match self.session.add_input(&self.device) {
                    Ok(()) => {
                        apply_to_connections(&mut self.session, preview, orientation);
                    }
                    Err(restore) => {
                        log::error!("failed to restore original camera input: {}", restore);
                    }
                }
                Err(as_input_error(e))
            }
        };

        self.session.commit_configuration();
        outcome
    }

    /// Orientation of the still-image output's video connection, if any.
    pub fn still_video_orientation(&mut self) -> Option<VideoOrientation> {
        self.session
            .connections(OutputKind::StillImage)
            .into_iter()
            .find(|c| c.carries_video())
            .map(|c| c.video_orientation())
    }

    pub fn capture_still_image(&mut self, completion: StillImageCompletion) {
        self.session.capture_still_image(completion);
    }
}

/// Requested ∩ available. Never a superset of either.
pub fn intersect_families(
    requested: &BTreeSet<CodeFamily>,
    available: &BTreeSet<CodeFamily>,
) -> BTreeSet<CodeFamily> {
    requested.intersection(available).cloned().collect()
}

fn as_input_error(error: CaptureError) -> CaptureError {
    match error {
        CaptureError::InputAttachFailed(_) => error,
        other => CaptureError::InputAttachFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn families(ids: &[&'static str]) -> BTreeSet<CodeFamily> {
        ids.iter().map(|id| CodeFamily::from_static(id)).collect()
    }

    #[test]
    fn intersection_keeps_only_common_families() {
        let requested = families(&["EAN13", "QR", "PDF417"]);
        let available = families(&["QR", "EAN13", "Face"]);

        let enabled = intersect_families(&requested, &available);

        assert_eq!(enabled, families(&["EAN13", "QR"]));
    }

    #[test]
    fn intersection_is_never_a_superset() {
        let requested = CodeFamily::supported();
        let available = families(&["EAN13", "Code128", "Vendor"]);

        let enabled = intersect_families(&requested, &available);

        assert!(enabled.is_subset(&requested));
        assert!(enabled.is_subset(&available));
        assert!(!enabled.contains(&CodeFamily::from_static("Vendor")));
    }

    #[test]
    fn intersection_can_be_empty() {
        let enabled = intersect_families(&families(&["Aztec"]), &families(&["QR"]));
        assert!(enabled.is_empty());
    }

    #[test]
    fn non_input_errors_become_input_attach_failures() {
        assert_eq!(
            as_input_error(CaptureError::NoDeviceFound),
            CaptureError::InputAttachFailed("no capture device found".into())
        );
        assert_eq!(
            as_input_error(CaptureError::InputAttachFailed("busy".into())),
            CaptureError::InputAttachFailed("busy".into())
        );
    }
}

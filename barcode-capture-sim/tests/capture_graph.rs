mod common;

use std::collections::BTreeSet;

use barcode_capture_core::{
    CameraConfiguration, CaptureError, CodeFamily, InterfaceOrientation, OutputKind, Rect,
    SessionState, VideoOrientation,
};
use barcode_capture_sim::{SessionFaults, SimulatedDevice, SimulatedPlatform};

use common::Harness;

fn platform_with_faults(faults: SessionFaults) -> SimulatedPlatform {
    let platform = SimulatedPlatform::with_two_cameras();
    platform.set_session_faults(faults);
    platform
}

fn assert_rolled_back(h: &Harness) {
    let session = h.session();
    assert!(session.is_unconfigured());
    assert!(!session.has_metadata_callback());
    assert_eq!(session.configuration_depth(), 0);
    assert_eq!(session.commit_count(), 1);
    assert!(!h.preview.is_bound());
    assert_eq!(h.camera.start(), Err(CaptureError::NotConfigured));
}

#[test]
fn busy_camera_leaves_session_unconfigured() {
    let platform = SimulatedPlatform::with_two_cameras();
    platform.device("back").unwrap().set_busy(true);
    let h = Harness::new(platform);

    let error = h.camera.setup().unwrap_err();

    assert!(matches!(error, CaptureError::InputAttachFailed(_)));
    assert_rolled_back(&h);
}

#[test]
fn rejected_still_output_rolls_back_input() {
    let h = Harness::new(platform_with_faults(SessionFaults {
        reject_still_output: true,
        ..Default::default()
    }));

    assert_eq!(
        h.camera.setup(),
        Err(CaptureError::OutputAttachFailed(OutputKind::StillImage))
    );
    assert_rolled_back(&h);
    assert!(matches!(h.camera.state().unwrap(), SessionState::Failed(_)));
}

#[test]
fn rejected_metadata_output_rolls_back_everything() {
    let h = Harness::new(platform_with_faults(SessionFaults {
        reject_metadata_output: true,
        ..Default::default()
    }));

    assert_eq!(
        h.camera.setup(),
        Err(CaptureError::OutputAttachFailed(OutputKind::Metadata))
    );
    assert_rolled_back(&h);
}

#[test]
fn failed_setup_can_be_retried() {
    let h = Harness::new(platform_with_faults(SessionFaults {
        reject_metadata_output: true,
        ..Default::default()
    }));
    h.camera.setup().unwrap_err();

    h.platform.set_session_faults(SessionFaults::default());
    h.camera.setup().unwrap();

    assert_eq!(h.platform.sessions_created(), 2);
    assert!(h.session().is_fully_configured());
    assert_eq!(h.camera.state().unwrap(), SessionState::Ready);
}

#[test]
fn enabled_families_are_requested_intersect_available() {
    let platform = SimulatedPlatform::with_two_cameras();
    platform.set_available_families(BTreeSet::from([
        CodeFamily::QR,
        CodeFamily::EAN13,
        CodeFamily::new("Codabar"),
    ]));
    let config = CameraConfiguration {
        code_families: BTreeSet::from([CodeFamily::QR, CodeFamily::EAN13, CodeFamily::PDF417]),
        ..Default::default()
    };
    let h = Harness::with_config(platform, config);

    h.camera.setup().unwrap();

    let expected = BTreeSet::from([CodeFamily::QR, CodeFamily::EAN13]);
    assert_eq!(h.camera.enabled_code_families().unwrap(), expected);
    assert_eq!(h.session().code_families(), expected);
}

#[test]
fn no_common_family_still_configures() {
    let platform = SimulatedPlatform::with_two_cameras();
    platform.set_available_families(BTreeSet::from([CodeFamily::new("Codabar")]));
    let h = Harness::new(platform);

    h.camera.setup().unwrap();

    assert!(h.camera.enabled_code_families().unwrap().is_empty());
    assert!(h.session().is_fully_configured());
}

#[test]
fn rect_of_interest_reaches_the_metadata_output() {
    let rect = Rect {
        x: 0.25,
        y: 0.25,
        width: 0.5,
        height: 0.5,
    };
    let config = CameraConfiguration {
        rect_of_interest: rect,
        ..Default::default()
    };
    let h = Harness::with_config(SimulatedPlatform::with_two_cameras(), config);

    h.camera.setup().unwrap();

    assert_eq!(h.session().rect_of_interest(), rect);
}

#[test]
fn switch_with_single_camera_changes_nothing() {
    let platform = SimulatedPlatform::new();
    platform.add_device(SimulatedDevice::back("only"));
    let h = Harness::new(platform);
    h.camera.setup().unwrap();

    assert!(!h.camera.has_alternative_camera().unwrap());
    assert_eq!(h.camera.switch_camera(), Err(CaptureError::NoAlternativeCamera));

    let session = h.session();
    assert_eq!(session.input_device_id().as_deref(), Some("only"));
    assert_eq!(session.commit_count(), 1);
    assert_eq!(h.camera.diagnostics().unwrap().switch_rollbacks, 0);
}

#[test]
fn switch_alternates_between_cameras() {
    let h = Harness::running();
    assert!(h.camera.has_alternative_camera().unwrap());

    assert_eq!(h.camera.switch_camera().unwrap(), "front");
    assert_eq!(h.camera.active_device_id().unwrap().as_deref(), Some("front"));
    assert_eq!(h.camera.switch_camera().unwrap(), "back");

    let session = h.session();
    assert_eq!(session.input_history(), ["back", "front", "back"]);
    assert_eq!(session.configuration_depth(), 0);
    assert!(session.is_fully_configured());
    assert!(session.is_running());
    assert_eq!(h.camera.diagnostics().unwrap().camera_switches, 2);
}

#[test]
fn refused_switch_restores_original_camera() {
    let h = Harness::running();
    h.platform.device("front").unwrap().set_busy(true);

    let error = h.camera.switch_camera().unwrap_err();

    assert!(matches!(error, CaptureError::InputAttachFailed(_)));
    let session = h.session();
    assert_eq!(session.input_device_id().as_deref(), Some("back"));
    assert_eq!(session.configuration_depth(), 0);
    assert!(session.is_fully_configured());
    assert_eq!(h.camera.active_device_id().unwrap().as_deref(), Some("back"));

    let diagnostics = h.camera.diagnostics().unwrap();
    assert_eq!(diagnostics.switch_rollbacks, 1);
    assert_eq!(diagnostics.camera_switches, 0);
}

#[test]
fn switch_keeps_capture_orientation() {
    let h = Harness::running();
    h.camera
        .update_orientation(InterfaceOrientation::LandscapeRight)
        .unwrap();

    h.camera.switch_camera().unwrap();

    assert_eq!(
        h.session().still_orientations(),
        [VideoOrientation::LandscapeRight]
    );
}

#[test]
fn refused_switch_keeps_capture_orientation() {
    let h = Harness::running();
    h.camera
        .update_orientation(InterfaceOrientation::PortraitUpsideDown)
        .unwrap();
    h.platform.device("front").unwrap().set_busy(true);

    h.camera.switch_camera().unwrap_err();

    assert_eq!(
        h.session().still_orientations(),
        [VideoOrientation::PortraitUpsideDown]
    );
}

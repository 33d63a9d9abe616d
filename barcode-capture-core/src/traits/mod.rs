pub mod camera_delegate;
pub mod capture_device;
pub mod capture_platform;
pub mod capture_session;
pub mod preview_sink;

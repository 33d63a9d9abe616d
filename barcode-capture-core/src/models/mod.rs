pub mod authorization;
pub mod captured_image;
pub mod code;
pub mod config;
pub mod device;
pub mod error;
pub mod orientation;
pub mod state;

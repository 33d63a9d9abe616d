pub mod camera;
pub mod detection;
pub mod device_controller;
pub mod graph;
pub mod orientation;
pub mod permission;
pub mod queue;

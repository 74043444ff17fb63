//! rollcall-hw — Webcam capture over V4L2.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError};
pub use frame::{Frame, FrameError};

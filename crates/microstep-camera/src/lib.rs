//! # Microstep Camera
//!
//! Camera discovery and live feed for the microscope.
//! Scans capture indices for devices that actually deliver frames, names
//! them through an external device listing where one is available, and
//! streams frames to a display sink on a background thread.

pub mod backend;
pub mod enumerate;
pub mod frame;
pub mod names;
#[cfg(feature = "nokhwa")]
pub mod nokhwa_backend;
pub mod stream;

pub use backend::{default_backend, CaptureBackend, CaptureDevice, UnavailableBackend};
pub use enumerate::{enumerate_cameras, fallback_name, CameraInfo};
pub use frame::{Frame, FrameSink, PixelFormat};
pub use names::{
    parse_dshow_video_devices, CameraNameSource, FfmpegDeviceNames, NoCameraNames,
    StaticCameraNames,
};
pub use stream::{CameraStream, StreamStats};

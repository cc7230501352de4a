//! Camera discovery by index scan

use crate::backend::CaptureBackend;
use crate::names::CameraNameSource;
use serde::Serialize;
use std::fmt;

/// A camera that opened and produced a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraInfo {
    /// Capture index
    pub index: u32,
    /// Display name
    pub name: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.index, self.name)
    }
}

/// Placeholder name for a camera the name source does not know
pub fn fallback_name(index: u32) -> String {
    format!("Camera {}", index)
}

/// Scan indices `0..max_index` for live cameras
///
/// Each index is opened, read once and released before the next one is
/// tried. Indices that fail to open, or open without producing a frame,
/// are skipped.
pub fn enumerate_cameras(
    backend: &dyn CaptureBackend,
    names: &dyn CameraNameSource,
    max_index: u32,
) -> Vec<CameraInfo> {
    let mut cameras = Vec::new();

    for index in 0..max_index {
        let mut device = match backend.open(index) {
            Ok(device) => device,
            Err(e) => {
                tracing::trace!("Camera {} not available: {}", index, e);
                continue;
            }
        };

        let live = device.read_frame();
        drop(device);

        match live {
            Ok(frame) => {
                let name = names
                    .lookup_name(index)
                    .unwrap_or_else(|| fallback_name(index));
                tracing::debug!(
                    "Camera {} ({}) is live at {}x{}",
                    index,
                    name,
                    frame.width(),
                    frame.height()
                );
                cameras.push(CameraInfo { index, name });
            }
            Err(e) => tracing::debug!("Camera {} opened but gave no frame: {}", index, e),
        }
    }

    tracing::debug!(
        "Found {} camera(s) via {} backend",
        cameras.len(),
        backend.name()
    );
    cameras
}

//! Capture backend seam
//!
//! Enumeration and streaming only need "open index N" and "read one
//! frame". Real hardware sits behind the `nokhwa` feature; without it the
//! application runs with [`UnavailableBackend`] and simply finds no cameras.

use crate::frame::Frame;
use microstep_core::{CameraError, Result};

/// An open capture device; dropping it releases the hardware
pub trait CaptureDevice {
    /// Capture one frame
    fn read_frame(&mut self) -> Result<Frame>;

    /// Ask for a capture resolution; devices may ignore the request
    fn request_resolution(&mut self, _width: u32, _height: u32) -> Result<()> {
        Ok(())
    }
}

/// Opens capture devices by numeric index
pub trait CaptureBackend: Send + Sync {
    /// Open the device at `index`
    fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Backend used when no capture support is compiled in
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableBackend;

impl CaptureBackend for UnavailableBackend {
    fn open(&self, _index: u32) -> Result<Box<dyn CaptureDevice>> {
        Err(CameraError::BackendUnavailable.into())
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// The best backend this build supports
pub fn default_backend() -> Box<dyn CaptureBackend> {
    #[cfg(feature = "nokhwa")]
    {
        Box::new(crate::nokhwa_backend::NokhwaBackend)
    }

    #[cfg(not(feature = "nokhwa"))]
    {
        tracing::debug!("Built without camera support; camera discovery will find nothing");
        Box::new(UnavailableBackend)
    }
}

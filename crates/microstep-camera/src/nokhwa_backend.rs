//! Native capture through nokhwa

use crate::backend::{CaptureBackend, CaptureDevice};
use crate::frame::{Frame, PixelFormat};
use microstep_core::{CameraError, Result};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

/// Opens cameras through the platform's native API (V4L2, MSMF, AVFoundation)
#[derive(Debug, Clone, Copy, Default)]
pub struct NokhwaBackend;

impl CaptureBackend for NokhwaBackend {
    fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>> {
        let format =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(index), format).map_err(|e| {
            CameraError::OpenFailed {
                index,
                reason: e.to_string(),
            }
        })?;
        camera.open_stream().map_err(|e| CameraError::OpenFailed {
            index,
            reason: e.to_string(),
        })?;

        Ok(Box::new(NokhwaDevice { camera, index }))
    }

    fn name(&self) -> &str {
        "nokhwa"
    }
}

struct NokhwaDevice {
    camera: Camera,
    index: u32,
}

impl CaptureDevice for NokhwaDevice {
    fn read_frame(&mut self) -> Result<Frame> {
        let buffer = self.camera.frame().map_err(|e| {
            tracing::debug!("Camera {} frame error: {}", self.index, e);
            CameraError::NoFrame { index: self.index }
        })?;
        let image = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::InvalidFrame {
                reason: e.to_string(),
            })?;

        let (width, height) = (image.width(), image.height());
        Frame::new(width, height, PixelFormat::Rgb8, image.into_raw())
    }

    fn request_resolution(&mut self, width: u32, height: u32) -> Result<()> {
        self.camera
            .set_resolution(Resolution::new(width, height))
            .map_err(|e| CameraError::ResolutionRejected {
                index: self.index,
                width,
                height,
                reason: e.to_string(),
            })?;
        tracing::debug!("Camera {} set to {}x{}", self.index, width, height);
        Ok(())
    }
}

impl Drop for NokhwaDevice {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!("Failed to release camera {}: {}", self.index, e);
        }
    }
}

//! Captured frames and their conversion to displayable images

use image::{Rgb, RgbImage};
use microstep_core::{CameraError, Result};

/// Pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit red, green, blue
    Rgb8,
    /// 8-bit blue, green, red (the usual webcam driver order)
    Bgr8,
    /// 8-bit red, green, blue, alpha
    Rgba8,
    /// 8-bit greyscale
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn channels(self) -> usize {
        match self {
            Self::Rgb8 | Self::Bgr8 => 3,
            Self::Rgba8 => 4,
            Self::Gray8 => 1,
        }
    }
}

/// One raw frame from a capture device
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a raw buffer, checking its length against the geometry
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(CameraError::InvalidFrame {
                reason: format!(
                    "{}x{} {:?} needs {} bytes, got {}",
                    width,
                    height,
                    format,
                    expected,
                    data.len()
                ),
            }
            .into());
        }

        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw bytes, row-major
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Convert to an RGB image a display layer can draw
    pub fn to_rgb_image(&self) -> RgbImage {
        let channels = self.format.channels();
        let width = self.width as usize;

        RgbImage::from_fn(self.width, self.height, |x, y| {
            let i = (y as usize * width + x as usize) * channels;
            let px = &self.data[i..i + channels];
            match self.format {
                PixelFormat::Rgb8 | PixelFormat::Rgba8 => Rgb([px[0], px[1], px[2]]),
                PixelFormat::Bgr8 => Rgb([px[2], px[1], px[0]]),
                PixelFormat::Gray8 => Rgb([px[0], px[0], px[0]]),
            }
        })
    }
}

/// Consumer of streamed frames, e.g. a preview widget
pub trait FrameSink: Send {
    /// Called on the stream thread for every captured frame
    fn present(&mut self, frame: &Frame);
}

impl<F> FrameSink for F
where
    F: FnMut(&Frame) + Send,
{
    fn present(&mut self, frame: &Frame) {
        self(frame)
    }
}

//! Live camera feed on a background thread
//!
//! The stream opens the device on its own thread, so backends whose
//! handles cannot cross threads still work. Frames go to a [`FrameSink`]
//! until the stream is stopped or the device stops producing frames.

use crate::backend::CaptureBackend;
use crate::frame::FrameSink;
use microstep_core::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Counters for a finished or running stream
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamStats {
    /// Frames delivered to the sink
    pub frames: u64,
    /// Time from first open to stop
    pub elapsed: Duration,
}

impl StreamStats {
    /// Average frames per second
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }
}

/// A running camera feed
pub struct CameraStream {
    index: u32,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<StreamStats>>,
}

impl CameraStream {
    /// Open camera `index` and start delivering frames to `sink`
    ///
    /// Returns once the device is open, or with the open error.
    pub fn start(
        backend: Arc<dyn CaptureBackend>,
        index: u32,
        resolution: Option<(u32, u32)>,
        mut sink: Box<dyn FrameSink>,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
        let flag = running.clone();

        let worker = thread::Builder::new()
            .name(format!("camera {}", index))
            .spawn(move || {
                let started = Instant::now();
                let mut stats = StreamStats::default();

                let mut device = match backend.open(index) {
                    Ok(device) => device,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return stats;
                    }
                };
                if let Some((width, height)) = resolution {
                    if let Err(e) = device.request_resolution(width, height) {
                        tracing::warn!("Camera {} kept its default resolution: {}", index, e);
                    }
                }
                let _ = ready_tx.send(Ok(()));
                tracing::info!("Stream started on camera {}", index);

                while flag.load(Ordering::Acquire) {
                    match device.read_frame() {
                        Ok(frame) => {
                            stats.frames += 1;
                            sink.present(&frame);
                        }
                        Err(e) => {
                            tracing::info!("No frame received, ending stream: {}", e);
                            break;
                        }
                    }
                }

                stats.elapsed = started.elapsed();
                stats
            })?;

        let opened = ready_rx
            .blocking_recv()
            .unwrap_or_else(|_| Err(Error::other("camera thread exited before opening")));

        match opened {
            Ok(()) => Ok(Self {
                index,
                running,
                worker: Some(worker),
            }),
            Err(e) => {
                let _ = worker.join();
                Err(e)
            }
        }
    }

    /// Camera index being streamed
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Whether frames are still being captured
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop capturing, release the device and return the counters
    pub fn stop(&mut self) -> StreamStats {
        self.running.store(false, Ordering::Release);
        let stats = match self.worker.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                tracing::error!("Camera {} thread panicked", self.index);
                StreamStats::default()
            }),
            None => StreamStats::default(),
        };
        if stats.frames > 0 {
            tracing::info!(
                "Stream on camera {} stopped after {} frames ({:.1} fps)",
                self.index,
                stats.frames,
                stats.fps()
            );
        }
        stats
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.stop();
    }
}

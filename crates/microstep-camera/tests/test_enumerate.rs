//! Camera discovery and streaming against a scripted backend

use microstep_camera::{
    enumerate_cameras, CameraInfo, CameraNameSource, CameraStream, CaptureBackend, CaptureDevice,
    Frame, NoCameraNames, PixelFormat, StaticCameraNames, UnavailableBackend,
};
use microstep_core::{CameraError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Copy)]
enum Behaviour {
    Live,
    NoFrame,
}

/// Backend with a fixed set of devices; counts open handles
#[derive(Default)]
struct FakeBackend {
    devices: HashMap<u32, Behaviour>,
    open_handles: Arc<AtomicUsize>,
    opens: Mutex<Vec<u32>>,
    frame_limit: Option<u64>,
    resolutions: Arc<Mutex<Vec<(u32, u32)>>>,
    reject_resolution: bool,
}

impl FakeBackend {
    fn with(devices: &[(u32, Behaviour)]) -> Self {
        Self {
            devices: devices.iter().copied().collect(),
            ..Default::default()
        }
    }

    fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

impl CaptureBackend for FakeBackend {
    fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>> {
        self.opens.lock().unwrap().push(index);
        let behaviour = self.devices.get(&index).copied().ok_or(CameraError::OpenFailed {
            index,
            reason: "no such device".to_string(),
        })?;
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeDevice {
            index,
            behaviour,
            handles: self.open_handles.clone(),
            served: 0,
            limit: self.frame_limit,
            resolutions: self.resolutions.clone(),
            reject_resolution: self.reject_resolution,
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeDevice {
    index: u32,
    behaviour: Behaviour,
    handles: Arc<AtomicUsize>,
    served: u64,
    limit: Option<u64>,
    resolutions: Arc<Mutex<Vec<(u32, u32)>>>,
    reject_resolution: bool,
}

impl CaptureDevice for FakeDevice {
    fn read_frame(&mut self) -> Result<Frame> {
        if matches!(self.behaviour, Behaviour::NoFrame)
            || self.limit.is_some_and(|limit| self.served >= limit)
        {
            return Err(CameraError::NoFrame { index: self.index }.into());
        }
        self.served += 1;
        std::thread::sleep(Duration::from_millis(1));
        Frame::new(2, 2, PixelFormat::Rgb8, vec![self.index as u8; 12])
    }

    fn request_resolution(&mut self, width: u32, height: u32) -> Result<()> {
        if self.reject_resolution {
            return Err(CameraError::ResolutionRejected {
                index: self.index,
                width,
                height,
                reason: "fixed mode".to_string(),
            }
            .into());
        }
        self.resolutions.lock().unwrap().push((width, height));
        Ok(())
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.handles.fetch_sub(1, Ordering::SeqCst);
    }
}

#[test]
fn test_skips_index_that_fails_to_open() {
    let backend = FakeBackend::with(&[(0, Behaviour::Live), (2, Behaviour::Live)]);
    let cameras = enumerate_cameras(&backend, &NoCameraNames, 3);

    assert_eq!(
        cameras,
        vec![
            CameraInfo {
                index: 0,
                name: "Camera 0".to_string()
            },
            CameraInfo {
                index: 2,
                name: "Camera 2".to_string()
            },
        ]
    );
    assert_eq!(*backend.opens.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_device_without_frames_is_not_listed() {
    let backend = FakeBackend::with(&[(0, Behaviour::NoFrame), (1, Behaviour::Live)]);
    let cameras = enumerate_cameras(&backend, &NoCameraNames, 3);

    assert_eq!(cameras.len(), 1);
    assert_eq!(cameras[0].index, 1);
}

#[test]
fn test_every_handle_is_released() {
    let backend = FakeBackend::with(&[
        (0, Behaviour::Live),
        (1, Behaviour::NoFrame),
        (2, Behaviour::Live),
    ]);
    enumerate_cameras(&backend, &NoCameraNames, 3);
    assert_eq!(backend.open_handles(), 0);
}

#[test]
fn test_names_come_from_the_source_with_fallback() {
    let backend = FakeBackend::with(&[(0, Behaviour::Live), (1, Behaviour::Live)]);
    let names = StaticCameraNames::from_listing(vec!["USB2.0 Microscope".to_string()]);
    let cameras = enumerate_cameras(&backend, &names, 2);

    assert_eq!(cameras[0].name, "USB2.0 Microscope");
    assert_eq!(cameras[1].name, "Camera 1");
    assert_eq!(cameras[0].to_string(), "0: USB2.0 Microscope");
}

#[test]
fn test_name_source_is_not_consulted_for_dead_indices() {
    struct Recording(Mutex<Vec<u32>>);
    impl CameraNameSource for Recording {
        fn lookup_name(&self, index: u32) -> Option<String> {
            self.0.lock().unwrap().push(index);
            None
        }
    }

    let backend = FakeBackend::with(&[(1, Behaviour::Live)]);
    let names = Recording(Mutex::new(Vec::new()));
    enumerate_cameras(&backend, &names, 3);
    assert_eq!(*names.0.lock().unwrap(), vec![1]);
}

#[test]
fn test_zero_max_index_and_no_backend() {
    let backend = FakeBackend::with(&[(0, Behaviour::Live)]);
    assert!(enumerate_cameras(&backend, &NoCameraNames, 0).is_empty());
    assert!(enumerate_cameras(&UnavailableBackend, &NoCameraNames, 3).is_empty());
}

#[test]
fn test_camera_info_serializes() {
    let info = CameraInfo {
        index: 2,
        name: "Camera 2".to_string(),
    };
    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["index"], 2);
    assert_eq!(json["name"], "Camera 2");
}

#[test]
fn test_stream_delivers_frames_until_stopped() {
    let backend = Arc::new(FakeBackend::with(&[(0, Behaviour::Live)]));
    let handles = backend.open_handles.clone();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();

    let mut stream = CameraStream::start(
        backend,
        0,
        Some((640, 480)),
        Box::new(move |frame: &Frame| {
            assert_eq!(frame.width(), 2);
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .unwrap();

    while seen.load(Ordering::SeqCst) < 3 {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(stream.is_running());

    let stats = stream.stop();
    assert!(!stream.is_running());
    assert_eq!(stats.frames as usize, seen.load(Ordering::SeqCst));
    assert_eq!(handles.load(Ordering::SeqCst), 0);
}

#[test]
fn test_stream_open_failure_is_reported() {
    let backend = Arc::new(FakeBackend::with(&[]));
    let result = CameraStream::start(backend, 4, None, Box::new(|_: &Frame| {}));

    let err = result.err().expect("open should fail");
    assert!(err.is_camera_error());
}

#[test]
fn test_stream_ends_when_frames_stop() {
    let mut backend = FakeBackend::with(&[(1, Behaviour::Live)]);
    backend.frame_limit = Some(5);
    let handles = backend.open_handles.clone();

    let mut stream =
        CameraStream::start(Arc::new(backend), 1, None, Box::new(|_: &Frame| {})).unwrap();
    while stream.is_running() {
        std::thread::sleep(Duration::from_millis(1));
    }

    let stats = stream.stop();
    assert_eq!(stats.frames, 5);
    assert_eq!(handles.load(Ordering::SeqCst), 0);
}

#[test]
fn test_stream_requests_configured_resolution() {
    let backend = FakeBackend::with(&[(0, Behaviour::Live)]);
    let requested = backend.resolutions.clone();

    let mut stream = CameraStream::start(
        Arc::new(backend),
        0,
        Some((1280, 720)),
        Box::new(|_: &Frame| {}),
    )
    .unwrap();
    stream.stop();

    assert_eq!(requested.lock().unwrap().as_slice(), [(1280, 720)]);
}

#[test]
fn test_stream_survives_rejected_resolution() {
    let mut backend = FakeBackend::with(&[(0, Behaviour::Live)]);
    backend.reject_resolution = true;
    backend.frame_limit = Some(2);

    let mut stream = CameraStream::start(
        Arc::new(backend),
        0,
        Some((4000, 3000)),
        Box::new(|_: &Frame| {}),
    )
    .unwrap();
    while stream.is_running() {
        std::thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(stream.stop().frames, 2);
}

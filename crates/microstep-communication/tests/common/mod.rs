//! Scripted serial device shared by the integration tests

#![allow(dead_code)]

use microstep_communication::{PortOpener, SerialTransport, SessionConfig};
use microstep_core::{ConnectionError, Result};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = Box<dyn FnMut(&str) -> Option<String> + Send>;

/// Everything the fake device has seen
pub struct FakeState {
    /// Complete lines written by the host, without terminators
    pub written: Vec<String>,
    /// (path, baud, timeout) per successful open
    pub opens: Vec<(String, u32, Duration)>,
    /// Ports dropped so far
    pub closed: usize,
    inbound: VecDeque<u8>,
    partial: Vec<u8>,
    responder: Responder,
}

/// Opens `FakePort`s that answer through a responder closure
#[derive(Clone)]
pub struct FakeOpener {
    pub state: Arc<Mutex<FakeState>>,
    failing: Vec<String>,
    fail_all: bool,
    banner: String,
}

impl FakeOpener {
    pub fn new<F>(responder: F) -> Self
    where
        F: FnMut(&str) -> Option<String> + Send + 'static,
    {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                written: Vec::new(),
                opens: Vec::new(),
                closed: 0,
                inbound: VecDeque::new(),
                partial: Vec::new(),
                responder: Box::new(responder),
            })),
            failing: Vec::new(),
            fail_all: false,
            banner: String::new(),
        }
    }

    /// A device that acknowledges every line with "ok"
    pub fn always_ok() -> Self {
        Self::new(|_| Some("ok".to_string()))
    }

    /// A device that never answers
    pub fn silent() -> Self {
        Self::new(|_| None)
    }

    pub fn fail_open_for(mut self, path: &str) -> Self {
        self.failing.push(path.to_string());
        self
    }

    pub fn fail_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Bytes queued on every successful open, as a resetting board prints
    pub fn with_banner(mut self, banner: &str) -> Self {
        self.banner = banner.to_string();
        self
    }

    pub fn written(&self) -> Vec<String> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().opens.len()
    }

    pub fn closed_count(&self) -> usize {
        self.state.lock().unwrap().closed
    }
}

impl PortOpener for FakeOpener {
    fn open(
        &self,
        path: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Box<dyn SerialTransport>> {
        if self.fail_all || self.failing.iter().any(|p| p == path) {
            return Err(ConnectionError::FailedToOpen {
                port: path.to_string(),
                reason: "no such device".to_string(),
            }
            .into());
        }

        let mut state = self.state.lock().unwrap();
        state.opens.push((path.to_string(), baud_rate, timeout));
        state.inbound.extend(self.banner.bytes());
        Ok(Box::new(FakePort {
            state: self.state.clone(),
            path: path.to_string(),
        }))
    }
}

pub struct FakePort {
    state: Arc<Mutex<FakeState>>,
    path: String,
}

impl Read for FakePort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.inbound.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"));
        }
        let n = buf.len().min(state.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for FakePort {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state.partial.extend_from_slice(data);
        while let Some(pos) = state.partial.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = state.partial.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]).to_string();
            if let Some(reply) = (state.responder)(&line) {
                state.inbound.extend(reply.bytes());
                state.inbound.push_back(b'\n');
            }
            state.written.push(line);
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SerialTransport for FakePort {
    fn bytes_to_read(&self) -> io::Result<u32> {
        Ok(self.state.lock().unwrap().inbound.len() as u32)
    }

    fn name(&self) -> String {
        self.path.clone()
    }
}

impl Drop for FakePort {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.closed += 1;
        }
    }
}

/// Session settings with no settle delay and short timeouts
pub fn fast_config(port: &str) -> SessionConfig {
    let mut config = SessionConfig::new(port);
    config.timeout = Duration::from_millis(50);
    config.settle_delay = Duration::ZERO;
    config.poll_interval = Duration::from_millis(1);
    config
}

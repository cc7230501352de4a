//! CNC command session
//!
//! A `CncSession` owns at most one open serial link to a motion controller
//! and exposes a request/response API on top of it.
//!
//! # I/O model
//!
//! `connect` moves the opened transport into a dedicated I/O thread, which
//! is the only reader and writer of the byte stream. Callers submit
//! requests over a channel and block on a oneshot reply. While idle, the
//! thread forwards unsolicited lines to the registered [`LineListener`]s.
//! Command replies and passive lines are therefore read by the same
//! consumer, and a reply can never be swallowed by the passive path.
//!
//! The blocking calls on this type must not be made from inside an async
//! runtime; use `spawn_blocking` there.

use crate::communication::{write_line, LineReader, PortOpener, SerialTransport};
use crate::controller::commands::{self, DEFAULT_JOG_FEED_RATE};
use crate::controller::listener::{LineListener, ListenerRegistry};
use microstep_core::{Axis, ConnectionError, ControllerError, JogDirection, Result};
use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::sync::oneshot;

/// Connection and motion parameters for a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Device path of the controller port
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Per-line read timeout
    pub timeout: Duration,
    /// Wait after opening for firmware that resets on connect
    pub settle_delay: Duration,
    /// Initial jog step in millimetres
    pub step_size: f64,
    /// Jog feed rate in mm/min
    pub feed_rate: f64,
    /// Idle polling interval of the I/O thread
    pub poll_interval: Duration,
}

impl SessionConfig {
    /// Defaults for `port`: 115200 baud, 1 s timeout, 2 s settle, 1 mm steps
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: 115_200,
            timeout: Duration::from_secs(1),
            settle_delay: Duration::from_secs(2),
            step_size: 1.0,
            feed_rate: DEFAULT_JOG_FEED_RATE,
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Outcome of a jog, as reported to the operator
#[derive(Debug, Clone, PartialEq)]
pub struct JogReport {
    /// Axis moved
    pub axis: Axis,
    /// Signed distance in millimetres
    pub distance: f64,
    /// Reply to the move command; `None` when the controller stayed silent
    pub response: Option<String>,
}

impl fmt::Display for JogReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Move {} {}mm Status: {}",
            self.axis,
            self.distance,
            self.response.as_deref().unwrap_or("No response.")
        )
    }
}

enum Request {
    /// Send each command and read one reply line per command, back to back
    Exchange {
        commands: Vec<String>,
        reply: oneshot::Sender<io::Result<Vec<String>>>,
    },
    Shutdown,
}

struct Link {
    requests: mpsc::UnboundedSender<Request>,
    worker: Option<JoinHandle<()>>,
}

impl Link {
    fn is_alive(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn shutdown(&mut self) {
        let _ = self.requests.send(Request::Shutdown);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("Serial I/O thread panicked");
            }
        }
    }
}

/// A request/response session with one motion controller
pub struct CncSession {
    config: SessionConfig,
    step_size: f64,
    opener: Arc<dyn PortOpener>,
    listeners: ListenerRegistry,
    link: Option<Link>,
}

impl CncSession {
    /// Create a disconnected session
    pub fn new(config: SessionConfig, opener: Arc<dyn PortOpener>) -> Self {
        let step_size = if is_valid_step(config.step_size) {
            config.step_size
        } else {
            tracing::warn!(
                "Ignoring invalid initial step size {}, using 1.0 mm",
                config.step_size
            );
            1.0
        };

        Self {
            config,
            step_size,
            opener,
            listeners: ListenerRegistry::new(),
            link: None,
        }
    }

    /// Device path of the controller port
    pub fn port(&self) -> &str {
        &self.config.port
    }

    /// Current jog step in millimetres
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Whether the link is open and its I/O thread running
    pub fn is_connected(&self) -> bool {
        self.link.as_ref().is_some_and(Link::is_alive)
    }

    /// Register a passive observer for unsolicited controller lines
    pub fn add_listener(&self, listener: Arc<dyn LineListener>) {
        self.listeners.add(listener);
    }

    /// Open the serial link
    ///
    /// On failure the session stays disconnected and the error describes
    /// why; callers may retry. Connecting an already connected session
    /// closes the old link first.
    pub fn connect(&mut self) -> Result<()> {
        if self.link.is_some() {
            self.disconnect();
        }

        let port = self
            .opener
            .open(&self.config.port, self.config.baud_rate, self.config.timeout)
            .map_err(|e| {
                tracing::error!("Error while connecting to CNC: {}", e);
                e
            })?;

        let (requests, inbox) = mpsc::unbounded_channel();
        let io = IoLoop {
            port,
            reader: LineReader::new(),
            inbox,
            listeners: self.listeners.clone(),
            timeout: self.config.timeout,
            poll_interval: self.config.poll_interval,
        };

        let worker = thread::Builder::new()
            .name(format!("cnc-io {}", self.config.port))
            .spawn(move || io.run())
            .map_err(|e| ConnectionError::FailedToOpen {
                port: self.config.port.clone(),
                reason: format!("could not start I/O thread: {}", e),
            })?;

        self.link = Some(Link {
            requests,
            worker: Some(worker),
        });

        if !self.config.settle_delay.is_zero() {
            thread::sleep(self.config.settle_delay);
        }

        tracing::info!("CNC connected on {}", self.config.port);
        Ok(())
    }

    /// Close the link if open; a no-op otherwise
    pub fn disconnect(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.shutdown();
            tracing::info!("CNC connection closed.");
        }
    }

    /// Send one command and return its reply line
    ///
    /// Returns `None` without touching the port when disconnected, and
    /// `None` after logging when the link fails. A silent controller yields
    /// `Some("")` once the read timeout elapses.
    pub fn send_command(&self, command: &str) -> Option<String> {
        match self.request(command) {
            Ok(response) => Some(response),
            Err(e) if e.is_not_connected() => {
                tracing::warn!("Serial connection not open.");
                None
            }
            Err(e) => {
                tracing::error!("Command {} failed: {}", command, e);
                None
            }
        }
    }

    /// Send one command; the fallible form of [`CncSession::send_command`]
    pub fn request(&self, command: &str) -> Result<String> {
        let mut replies = self.exchange(vec![command.to_string()])?;
        Ok(replies.pop().unwrap_or_default())
    }

    /// Update the jog step; non-positive or non-finite values are rejected
    /// and the current step is kept
    pub fn set_step_size(&mut self, mm: f64) -> Result<()> {
        if !is_valid_step(mm) {
            tracing::warn!("Rejected step size {}", mm);
            return Err(ControllerError::InvalidStepSize { value: mm }.into());
        }
        self.step_size = mm;
        Ok(())
    }

    /// Jog one axis by the current step size
    ///
    /// Sends `G91`, the move, then `G90`. Each command gets its own
    /// single-line reply read. The three run as one unit on the I/O thread
    /// so no other caller's command can land between them.
    pub fn jog(&self, axis: Axis, direction: JogDirection) -> Result<JogReport> {
        let distance = direction.sign() * self.step_size;
        let replies = self.exchange(
            commands::relative_jog(axis, distance, self.config.feed_rate).to_vec(),
        )?;

        let response = replies.get(1).filter(|r| !r.is_empty()).cloned();
        let report = JogReport {
            axis,
            distance,
            response,
        };
        tracing::info!("{}", report);
        Ok(report)
    }

    /// Run the homing cycle
    pub fn home(&self) -> Option<String> {
        self.send_command(commands::HOME)
    }

    fn exchange(&self, commands: Vec<String>) -> Result<Vec<String>> {
        let link = self.link.as_ref().ok_or(ConnectionError::NotConnected)?;
        let (reply, response) = oneshot::channel();

        link.requests
            .send(Request::Exchange { commands, reply })
            .map_err(|_| lost("I/O thread stopped"))?;

        let replies = response
            .blocking_recv()
            .map_err(|_| lost("I/O thread dropped the request"))?
            .map_err(|e| ConnectionError::IoError {
                reason: e.to_string(),
            })?;
        Ok(replies)
    }
}

impl Drop for CncSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn is_valid_step(mm: f64) -> bool {
    mm.is_finite() && mm > 0.0
}

fn lost(reason: &str) -> ConnectionError {
    ConnectionError::ConnectionLost {
        reason: reason.to_string(),
    }
}

/// State owned by the I/O thread
struct IoLoop {
    port: Box<dyn SerialTransport>,
    reader: LineReader,
    inbox: mpsc::UnboundedReceiver<Request>,
    listeners: ListenerRegistry,
    timeout: Duration,
    poll_interval: Duration,
}

impl IoLoop {
    fn run(mut self) {
        let name = self.port.name();
        tracing::debug!("I/O thread for {} started", name);

        loop {
            match self.inbox.try_recv() {
                Ok(Request::Exchange { commands, reply }) => {
                    let result = self.exchange(&commands);
                    let failed = result.as_ref().err().map(|e| e.to_string());
                    let _ = reply.send(result);
                    if let Some(reason) = failed {
                        self.listeners.notify_link_lost(&reason);
                        break;
                    }
                    continue;
                }
                Ok(Request::Shutdown) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            match self.forward_unsolicited() {
                Ok(0) => thread::sleep(self.poll_interval),
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Serial link {} lost: {}", name, e);
                    self.listeners.notify_link_lost(&e.to_string());
                    break;
                }
            }
        }

        tracing::debug!("I/O thread for {} stopped", name);
    }

    /// Forward complete lines already received; returns bytes consumed
    fn forward_unsolicited(&mut self) -> io::Result<usize> {
        let n = self.reader.fill_available(self.port.as_mut())?;
        while let Some(line) = self.reader.take_buffered_line() {
            if !line.is_empty() {
                self.listeners.notify_line(&line);
            }
        }
        Ok(n)
    }

    fn exchange(&mut self, commands: &[String]) -> io::Result<Vec<String>> {
        // Lines that arrived before this request are not replies to it
        self.forward_unsolicited()?;
        if let Some(fragment) = self.reader.take_pending() {
            tracing::debug!("Unterminated line before command: {}", fragment);
            self.listeners.notify_line(&fragment);
        }

        let mut replies = Vec::with_capacity(commands.len());
        for command in commands {
            write_line(self.port.as_mut(), command)?;
            tracing::debug!("Command sent: {}", command);
            let response = self.reader.read_line(self.port.as_mut(), self.timeout)?;
            tracing::debug!("Response: {}", response);
            replies.push(response);
        }
        Ok(replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jog_report_display() {
        let report = JogReport {
            axis: Axis::X,
            distance: -2.5,
            response: None,
        };
        assert_eq!(report.to_string(), "Move X -2.5mm Status: No response.");

        let report = JogReport {
            axis: Axis::Z,
            distance: 1.0,
            response: Some("ok".to_string()),
        };
        assert_eq!(report.to_string(), "Move Z 1mm Status: ok");
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::new("/dev/ttyACM0");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.settle_delay, Duration::from_secs(2));
        assert_eq!(config.step_size, 1.0);
        assert_eq!(config.feed_rate, 3000.0);
    }
}

//! CNC port identification
//!
//! A port is classified as a motion controller when it answers one of the
//! candidate commands with a line containing "ok" (case-insensitive). The
//! heuristic is best-effort: open failures, I/O errors, silence and
//! negative replies all classify as "not a CNC port", so an unrelated
//! device on the bus never aborts discovery.

use crate::communication::{write_line, LineReader, PortOpener, SerialPortInfo, SystemPortOpener};
use crate::controller::commands::FIRMWARE_INFO;
use microstep_core::Result;
use std::time::Duration;

/// Default baud rate for identification
pub const DEFAULT_PROBE_BAUD_RATE: u32 = 115_200;

/// Default per-line read timeout while probing
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Probe `port_path` on the host serial subsystem
pub fn probe(
    port_path: &str,
    candidate_commands: &[String],
    baud_rate: u32,
    timeout: Duration,
) -> bool {
    probe_with(&SystemPortOpener, port_path, candidate_commands, baud_rate, timeout)
}

/// Probe `port_path` through `opener`
pub fn probe_with(
    opener: &dyn PortOpener,
    port_path: &str,
    candidate_commands: &[String],
    baud_rate: u32,
    timeout: Duration,
) -> bool {
    match try_probe(opener, port_path, candidate_commands, baud_rate, timeout) {
        Ok(Some(command)) => {
            tracing::info!("Port {} acknowledged {}: CNC device", port_path, command);
            true
        }
        Ok(None) => {
            tracing::debug!("Port {} did not acknowledge any probe command", port_path);
            false
        }
        Err(e) => {
            tracing::debug!("Probe of {} failed: {}", port_path, e);
            false
        }
    }
}

/// Returns the first command that was acknowledged
///
/// The port is owned by this frame and closed on every return path.
fn try_probe(
    opener: &dyn PortOpener,
    port_path: &str,
    candidate_commands: &[String],
    baud_rate: u32,
    timeout: Duration,
) -> Result<Option<String>> {
    let mut port = opener.open(port_path, baud_rate, timeout)?;
    let mut reader = LineReader::new();

    for command in candidate_commands {
        write_line(port.as_mut(), command)?;
        let response = reader.read_line(port.as_mut(), timeout)?.to_lowercase();
        tracing::trace!("Probe {} <- {:?}", command, response);
        if is_acknowledgment(&response) {
            return Ok(Some(command.clone()));
        }
    }

    Ok(None)
}

/// Whether a reply line counts as a CNC acknowledgment
pub fn is_acknowledgment(response: &str) -> bool {
    response.trim().to_lowercase().contains("ok")
}

/// Probe settings bundled for repeated use over many ports
pub struct CncProbe<O: PortOpener = SystemPortOpener> {
    opener: O,
    commands: Vec<String>,
    baud_rate: u32,
    timeout: Duration,
}

impl CncProbe<SystemPortOpener> {
    /// Probe on the host with the default settings (`M115`, 115200 baud, 100 ms)
    pub fn new() -> Self {
        Self::with_opener(SystemPortOpener)
    }
}

impl Default for CncProbe<SystemPortOpener> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: PortOpener> CncProbe<O> {
    /// Probe through a custom opener with the default settings
    pub fn with_opener(opener: O) -> Self {
        Self {
            opener,
            commands: vec![FIRMWARE_INFO.to_string()],
            baud_rate: DEFAULT_PROBE_BAUD_RATE,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Replace the candidate commands
    pub fn commands(mut self, commands: Vec<String>) -> Self {
        self.commands = commands;
        self
    }

    /// Set the baud rate
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the per-line read timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Classify one port
    pub fn is_cnc_port(&self, port_path: &str) -> bool {
        probe_with(
            &self.opener,
            port_path,
            &self.commands,
            self.baud_rate,
            self.timeout,
        )
    }

    /// Classify each port in turn and return the paths that answered
    pub fn find_cnc_ports(&self, ports: &[SerialPortInfo]) -> Vec<String> {
        ports
            .iter()
            .filter(|port| self.is_cnc_port(&port.device))
            .map(|port| port.device.clone())
            .collect()
    }
}

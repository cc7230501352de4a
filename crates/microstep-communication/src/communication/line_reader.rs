//! Newline-delimited reads and writes over a serial transport
//!
//! The controller speaks plain text: one command per line out, one reply
//! per line back. `LineReader` keeps bytes received past a newline so that
//! the next read starts where the previous one stopped.

use crate::communication::serial::SerialTransport;
use std::io;
use std::time::{Duration, Instant};

const READ_CHUNK: usize = 256;

/// Write `line` followed by a newline terminator
pub fn write_line(port: &mut dyn SerialTransport, line: &str) -> io::Result<()> {
    let mut data = Vec::with_capacity(line.len() + 1);
    data.extend_from_slice(line.as_bytes());
    data.push(b'\n');
    port.write_all(&data)?;
    port.flush()
}

/// Decode bytes as UTF-8, dropping invalid sequences, and trim whitespace
pub fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Buffered line assembler
#[derive(Debug, Default)]
pub struct LineReader {
    pending: Vec<u8>,
}

impl LineReader {
    /// Create an empty reader
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one line, terminated by a newline or by `timeout` elapsing
    ///
    /// On timeout whatever arrived so far is returned, which is the empty
    /// string when the device stayed silent. The result is decoded and
    /// trimmed.
    pub fn read_line(
        &mut self,
        port: &mut dyn SerialTransport,
        timeout: Duration,
    ) -> io::Result<String> {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(line) = self.take_buffered_line() {
                return Ok(line);
            }
            if Instant::now() >= deadline {
                return Ok(self.take_partial());
            }

            match port.read(&mut chunk) {
                Ok(0) => return Ok(self.take_partial()),
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::WouldBlock =>
                {
                    return Ok(self.take_partial());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Pull in whatever bytes are already waiting, without blocking
    ///
    /// Returns the number of bytes read.
    pub fn fill_available(&mut self, port: &mut dyn SerialTransport) -> io::Result<usize> {
        let waiting = port.bytes_to_read()? as usize;
        if waiting == 0 {
            return Ok(0);
        }

        let mut buf = vec![0u8; waiting];
        match port.read(&mut buf) {
            Ok(n) => {
                self.pending.extend_from_slice(&buf[..n]);
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Take the next complete line from the buffer, if one is present
    pub fn take_buffered_line(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|b| *b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=pos).collect();
        Some(decode_line(&raw))
    }

    /// Whether a complete line is waiting in the buffer
    pub fn has_buffered_line(&self) -> bool {
        self.pending.contains(&b'\n')
    }

    /// Take an unterminated fragment left in the buffer, if any
    ///
    /// Empty or whitespace-only fragments are discarded and yield `None`.
    pub fn take_pending(&mut self) -> Option<String> {
        let partial = self.take_partial();
        (!partial.is_empty()).then_some(partial)
    }

    fn take_partial(&mut self) -> String {
        let raw = std::mem::take(&mut self.pending);
        decode_line(&raw)
    }
}

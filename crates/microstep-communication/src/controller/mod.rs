//! Motion controller protocol
//!
//! Port identification, the command session and the G-code templates the
//! session sends.

pub mod commands;
pub mod listener;
pub mod probe;
pub mod session;

pub use listener::{LineListener, ListenerRegistry};
pub use probe::{
    is_acknowledgment, probe, probe_with, CncProbe, DEFAULT_PROBE_BAUD_RATE,
    DEFAULT_PROBE_TIMEOUT,
};
pub use session::{CncSession, JogReport, SessionConfig};

//! # Microstep Communication
//!
//! Serial link to the microscope's motion controller.
//! Enumerates serial ports, identifies which one answers like a CNC
//! controller, and drives the controller through a line-oriented
//! request/response session with jog and homing helpers.

pub mod communication;
pub mod controller;

pub use communication::{
    serial::{list_ports, SerialPortInfo},
    LineReader, PortOpener, SerialTransport, SystemPortOpener,
};

pub use controller::{
    probe, probe_with, CncProbe, CncSession, JogReport, LineListener, SessionConfig,
};

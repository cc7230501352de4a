//! Serial link layer
//!
//! Port enumeration, the transport abstraction and newline framing.

pub mod line_reader;
pub mod serial;

pub use line_reader::{decode_line, write_line, LineReader};
pub use serial::{
    list_ports, usb_ids, PortOpener, SerialPortInfo, SerialTransport, SystemPortOpener,
    SystemSerialPort,
};

//! Serial port communication implementation
//!
//! Provides low-level serial port operations for the link to the motion
//! controller:
//! - Port enumeration with USB metadata
//! - A byte-level transport trait so probing and the session can be driven
//!   by scripted fakes
//! - The system opener backed by the `serialport` crate

use microstep_core::{ConnectionError, Result};
use serde::Serialize;
use std::fmt;
use std::io::{self, Read, Write};
use std::time::Duration;

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerialPortInfo {
    /// Device path (e.g., "/dev/ttyUSB0", "COM3")
    pub device: String,

    /// Port description (e.g., "USB QinHeng USB Serial")
    pub description: String,

    /// USB vendor/product id pair, present only when both are non-zero
    pub usb_ids: Option<(u16, u16)>,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// USB product string if available
    pub product: Option<String>,

    /// Serial number if available
    pub serial_number: Option<String>,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(device: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            description: description.into(),
            usb_ids: None,
            manufacturer: None,
            product: None,
            serial_number: None,
        }
    }

    /// Set manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Set product string
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    /// Set serial number
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    /// Set USB IDs; a zero vendor or product id leaves the pair absent
    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.usb_ids = usb_ids(vid, pid);
        self
    }

    /// VID:PID rendered as upper-case hex, or "Unknown"
    pub fn vid_pid_label(&self) -> String {
        match self.usb_ids {
            Some((vid, pid)) => format!("{:04X}:{:04X}", vid, pid),
            None => "Unknown".to_string(),
        }
    }
}

impl fmt::Display for SerialPortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} (VID:PID={})",
            self.device,
            self.description,
            self.vid_pid_label()
        )
    }
}

/// Pair a vendor and product id, rejecting the zero placeholders some
/// drivers report for non-USB or unidentified adapters
pub fn usb_ids(vid: u16, pid: u16) -> Option<(u16, u16)> {
    if vid != 0 && pid != 0 {
        Some((vid, pid))
    } else {
        None
    }
}

/// List available serial ports on the system
///
/// Returns every port the OS reports, in OS order. An empty list means no
/// ports; enumeration failures are logged and also yield an empty list.
pub fn list_ports() -> Vec<SerialPortInfo> {
    match serialport::available_ports() {
        Ok(ports) => {
            let infos: Vec<SerialPortInfo> = ports.iter().map(port_info_from).collect();
            tracing::debug!("Found {} serial port(s)", infos.len());
            infos
        }
        Err(e) => {
            let err = ConnectionError::EnumerationFailed {
                reason: e.to_string(),
            };
            tracing::error!("{}", err);
            Vec::new()
        }
    }
}

fn port_info_from(port: &serialport::SerialPortInfo) -> SerialPortInfo {
    let info = SerialPortInfo::new(&port.port_name, get_port_description(port));

    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            let mut info = info.with_usb_ids(usb_info.vid, usb_info.pid);
            if let Some(ref mfg) = usb_info.manufacturer {
                info = info.with_manufacturer(mfg);
            }
            if let Some(ref product) = usb_info.product {
                info = info.with_product(product);
            }
            if let Some(ref serial) = usb_info.serial_number {
                info = info.with_serial_number(serial);
            }
            info
        }
        _ => info,
    }
}

/// Get a user-friendly description for a port
fn get_port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            format!(
                "USB {} {}",
                usb_info.manufacturer.as_deref().unwrap_or("Device"),
                usb_info.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Byte-level serial transport
///
/// Reads must honour the read timeout the port was opened with and report
/// an elapsed timeout as `io::ErrorKind::TimedOut`.
pub trait SerialTransport: Read + Write + Send {
    /// Number of bytes already received and waiting to be read
    fn bytes_to_read(&self) -> io::Result<u32>;

    /// Port name for logging
    fn name(&self) -> String;
}

/// Opens serial transports by device path
pub trait PortOpener: Send + Sync {
    /// Open `path` at `baud_rate`, with reads bounded by `timeout`
    fn open(
        &self,
        path: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Box<dyn SerialTransport>>;
}

/// Real serial port implementation using serialport crate
pub struct SystemSerialPort {
    port: Box<dyn serialport::SerialPort>,
    path: String,
}

impl Read for SystemSerialPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SystemSerialPort {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.port.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl SerialTransport for SystemSerialPort {
    fn bytes_to_read(&self) -> io::Result<u32> {
        self.port.bytes_to_read().map_err(io::Error::from)
    }

    fn name(&self) -> String {
        self.port.name().unwrap_or_else(|| self.path.clone())
    }
}

/// Opens ports on the host with 8N1 framing and no flow control
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPortOpener;

impl PortOpener for SystemPortOpener {
    fn open(
        &self,
        path: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Box<dyn SerialTransport>> {
        let builder = serialport::new(path, baud_rate)
            .timeout(timeout)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None);

        match builder.open() {
            Ok(port) => Ok(Box::new(SystemSerialPort {
                port,
                path: path.to_string(),
            })),
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", path, e);
                Err(ConnectionError::FailedToOpen {
                    port: path.to_string(),
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usb_ids_require_both_nonzero() {
        assert_eq!(usb_ids(0x1A86, 0x7523), Some((0x1A86, 0x7523)));
        assert_eq!(usb_ids(0, 0x7523), None);
        assert_eq!(usb_ids(0x1A86, 0), None);
    }

    #[test]
    fn test_port_display() {
        let info = SerialPortInfo::new("/dev/ttyUSB0", "USB QinHeng Serial")
            .with_usb_ids(0x1a86, 0x7523);
        assert_eq!(info.vid_pid_label(), "1A86:7523");
        assert_eq!(
            info.to_string(),
            "/dev/ttyUSB0 - USB QinHeng Serial (VID:PID=1A86:7523)"
        );

        let bare = SerialPortInfo::new("COM1", "Serial Port");
        assert_eq!(bare.to_string(), "COM1 - Serial Port (VID:PID=Unknown)");
    }

    #[test]
    fn test_port_info_serializes() {
        let info = SerialPortInfo::new("COM3", "USB Device Serial Port")
            .with_usb_ids(0x2341, 0x0043)
            .with_manufacturer("Arduino");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["device"], "COM3");
        assert_eq!(json["usb_ids"][0], 0x2341);
        assert_eq!(json["manufacturer"], "Arduino");
    }

    #[test]
    fn test_usb_port_metadata_is_kept() {
        let port = serialport::SerialPortInfo {
            port_name: "/dev/ttyACM0".to_string(),
            port_type: serialport::SerialPortType::UsbPort(serialport::UsbPortInfo {
                vid: 0x2341,
                pid: 0x0043,
                serial_number: Some("75735".to_string()),
                manufacturer: Some("Arduino".to_string()),
                product: Some("Uno".to_string()),
            }),
        };

        let info = port_info_from(&port);
        assert_eq!(info.description, "USB Arduino Uno");
        assert_eq!(info.usb_ids, Some((0x2341, 0x0043)));
        assert_eq!(info.manufacturer.as_deref(), Some("Arduino"));
        assert_eq!(info.product.as_deref(), Some("Uno"));
        assert_eq!(info.serial_number.as_deref(), Some("75735"));

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["product"], "Uno");
    }

    #[test]
    fn test_list_ports_does_not_fail() {
        // Hosts without serial hardware still enumerate to an empty list
        let ports = list_ports();
        assert!(ports.iter().all(|p| !p.device.is_empty()));
    }
}

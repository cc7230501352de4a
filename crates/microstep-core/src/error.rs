//! Error handling for Microstep
//!
//! Provides error types for every layer of the rig controller:
//! - Connection errors (serial link to the motion controller)
//! - Controller errors (rejected user input, session state)
//! - Camera errors (capture devices and name listing)
//!
//! All error types use `thiserror` for ergonomic error handling.
//! Discovery code converts these into negative results at the point of
//! failure; they only surface to callers through the fallible APIs.

use thiserror::Error;

/// Controller error type
///
/// Represents rejected input and invalid operations on a CNC session.
/// None of these change session state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControllerError {
    /// Step size must be strictly positive and finite
    #[error("Invalid step size {value}: must be a positive number of millimetres")]
    InvalidStepSize {
        /// The rejected value.
        value: f64,
    },

    /// A menu selection was out of range or not a number
    #[error("Invalid selection '{input}': expected a number between 0 and {max}")]
    InvalidSelection {
        /// The raw user input.
        input: String,
        /// The highest valid index.
        max: usize,
    },

    /// Unknown axis letter
    #[error("Unknown axis: {axis}")]
    UnknownAxis {
        /// The rejected axis text.
        axis: String,
    },

    /// Generic controller error
    #[error("Controller error: {message}")]
    Other {
        /// The error message.
        message: String,
    },
}

/// Connection error type
///
/// Represents errors on the serial link to a CNC controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// Failed to open port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Operation requires an open connection
    #[error("Serial connection not open")]
    NotConnected,

    /// Connection lost
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },

    /// I/O error on an open port
    #[error("I/O error: {reason}")]
    IoError {
        /// The reason for the I/O error.
        reason: String,
    },

    /// Port enumeration failed
    #[error("Failed to enumerate ports: {reason}")]
    EnumerationFailed {
        /// The reason enumeration failed.
        reason: String,
    },
}

/// Camera error type
///
/// Represents errors from capture devices and from the external
/// device-listing tool.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    /// Capture device could not be opened
    #[error("Could not open camera {index}: {reason}")]
    OpenFailed {
        /// The camera index.
        index: u32,
        /// The reason the device failed to open.
        reason: String,
    },

    /// Device opened but produced no frame
    #[error("Camera {index} returned no frame")]
    NoFrame {
        /// The camera index.
        index: u32,
    },

    /// No capture backend compiled in
    #[error("No camera backend available")]
    BackendUnavailable,

    /// External device listing failed
    #[error("Failed to list camera names: {reason}")]
    NameListing {
        /// The reason the listing failed.
        reason: String,
    },

    /// Device refused the requested capture size
    #[error("Camera {index} rejected resolution {width}x{height}: {reason}")]
    ResolutionRejected {
        /// The camera index.
        index: u32,
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// The reason given by the device.
        reason: String,
    },

    /// Frame buffer does not match its declared geometry
    #[error("Invalid frame: {reason}")]
    InvalidFrame {
        /// The reason the frame was rejected.
        reason: String,
    },
}

/// Main error type for Microstep
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Controller error
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Camera error
    #[error(transparent)]
    Camera(#[from] CameraError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut)
    }

    /// Check if this error means the session had no open link
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Error::Connection(ConnectionError::NotConnected))
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a controller error
    pub fn is_controller_error(&self) -> bool {
        matches!(self, Error::Controller(_))
    }

    /// Check if this is a camera error
    pub fn is_camera_error(&self) -> bool {
        matches!(self, Error::Camera(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

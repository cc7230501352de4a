//! # Microstep Core
//!
//! Core types shared by the Microstep crates: the error taxonomy used by
//! discovery, the CNC session and the camera layer, and the axis/direction
//! vocabulary used for jogging.

pub mod error;
pub mod motion;

pub use error::{CameraError, ConnectionError, ControllerError, Error, Result};
pub use motion::{Axis, JogDirection};

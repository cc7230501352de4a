//! Microstep Settings Crate
//!
//! Configuration defaults for the serial link, motion and cameras, with
//! optional read-only loading from a JSON or TOML file.

pub mod config;
pub mod error;

pub use config::{CameraSettings, Config, MotionSettings, SerialSettings};
pub use error::{ConfigError, SettingsError, SettingsResult};

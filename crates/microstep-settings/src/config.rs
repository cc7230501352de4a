//! Configuration for the microscope rig
//!
//! Configuration is organized into logical sections:
//! - Serial settings (line speed, timeouts, probe commands)
//! - Motion preferences (jog step, feed rate)
//! - Camera settings (scan range, name listing, stream size)
//!
//! Every field has a default, so a config file only needs the values it
//! changes. Files are read, never written.

use crate::error::{ConfigError, SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Serial link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Baud rate for sessions and probes
    pub baud_rate: u32,
    /// Read timeout for a session in milliseconds
    pub timeout_ms: u64,
    /// Read timeout while probing in milliseconds
    pub probe_timeout_ms: u64,
    /// Commands tried in order when probing a port
    pub probe_commands: Vec<String>,
    /// Wait after opening a port before talking to the board
    pub settle_delay_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            timeout_ms: 1000,
            probe_timeout_ms: 100,
            probe_commands: vec!["M115".to_string()],
            settle_delay_ms: 2000,
        }
    }
}

impl SerialSettings {
    /// Session read timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Probe read timeout
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Post-open settle delay
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Jog preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    /// Initial jog step in millimetres
    pub step_size_mm: f64,
    /// Jog feed rate in mm/min
    pub feed_rate: f64,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            step_size_mm: 1.0,
            feed_rate: 3000.0,
        }
    }
}

/// Camera discovery and streaming settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Indices `0..max_index` are scanned
    pub max_index: u32,
    /// FFmpeg executable used to list camera names, if any
    pub ffmpeg_path: Option<PathBuf>,
    /// Requested stream width
    pub width: u32,
    /// Requested stream height
    pub height: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            max_index: 3,
            ffmpeg_path: None,
            width: 640,
            height: 480,
        }
    }
}

impl CameraSettings {
    /// Requested stream size as (width, height)
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Serial link settings
    pub serial: SerialSettings,
    /// Jog preferences
    pub motion: MotionSettings,
    /// Camera settings
    pub camera: CameraSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or("no extension").to_string(),
                )
                .into())
            }
        };

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.serial.baud_rate == 0 {
            return Err(SettingsError::invalid("serial.baud_rate", "must be > 0"));
        }

        if self.serial.timeout_ms == 0 {
            return Err(SettingsError::invalid("serial.timeout_ms", "must be > 0"));
        }

        if self.serial.probe_timeout_ms == 0 {
            return Err(SettingsError::invalid(
                "serial.probe_timeout_ms",
                "must be > 0",
            ));
        }

        if self.serial.probe_commands.iter().all(|c| c.trim().is_empty()) {
            return Err(SettingsError::invalid(
                "serial.probe_commands",
                "at least one command is required",
            ));
        }

        if !self.motion.step_size_mm.is_finite() || self.motion.step_size_mm <= 0.0 {
            return Err(SettingsError::invalid(
                "motion.step_size_mm",
                "must be a finite number > 0",
            ));
        }

        if !self.motion.feed_rate.is_finite() || self.motion.feed_rate <= 0.0 {
            return Err(SettingsError::invalid(
                "motion.feed_rate",
                "must be a finite number > 0",
            ));
        }

        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(SettingsError::invalid(
                "camera",
                "stream dimensions must be > 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.serial.timeout(), Duration::from_secs(1));
        assert_eq!(config.serial.probe_timeout(), Duration::from_millis(100));
        assert_eq!(config.serial.settle_delay(), Duration::from_secs(2));
        assert_eq!(config.serial.probe_commands, vec!["M115".to_string()]);
        assert_eq!(config.motion.step_size_mm, 1.0);
        assert_eq!(config.motion.feed_rate, 3000.0);
        assert_eq!(config.camera.max_index, 3);
        assert_eq!(config.camera.resolution(), (640, 480));
        assert!(config.camera.ffmpeg_path.is_none());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::new();
        config.serial.baud_rate = 0;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.serial.probe_commands.clear();
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.serial.probe_commands = vec!["  ".to_string()];
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.motion.step_size_mm = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.motion.step_size_mm = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.motion.feed_rate = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.motion.step_size_mm = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.motion.feed_rate = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.camera.height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_error_names_the_field() {
        let mut config = Config::new();
        config.motion.feed_rate = -5.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("motion.feed_rate"));
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config: Config = toml::from_str("[motion]\nstep_size_mm = 0.25\n").unwrap();
        assert_eq!(config.motion.step_size_mm, 0.25);
        assert_eq!(config.motion.feed_rate, 3000.0);
        assert_eq!(config.serial, SerialSettings::default());
    }
}

//! Human-readable camera names
//!
//! Capture APIs address cameras by index only. On Windows the DirectShow
//! device list printed by FFmpeg gives the names in the same order, so the
//! n-th video entry names camera n.

use microstep_core::{CameraError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

/// Resolves a display name for a camera index
pub trait CameraNameSource {
    /// Name for `index`, if the source knows one
    fn lookup_name(&self, index: u32) -> Option<String>;
}

/// A source that never knows a name
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCameraNames;

impl CameraNameSource for NoCameraNames {
    fn lookup_name(&self, _index: u32) -> Option<String> {
        None
    }
}

/// A fixed index-to-name map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticCameraNames {
    names: HashMap<u32, String>,
}

impl StaticCameraNames {
    /// Number names in listing order, starting at index 0
    pub fn from_listing(names: Vec<String>) -> Self {
        Self {
            names: names
                .into_iter()
                .enumerate()
                .map(|(i, name)| (i as u32, name))
                .collect(),
        }
    }

    /// Number of known names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no names are known
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl From<HashMap<u32, String>> for StaticCameraNames {
    fn from(names: HashMap<u32, String>) -> Self {
        Self { names }
    }
}

impl CameraNameSource for StaticCameraNames {
    fn lookup_name(&self, index: u32) -> Option<String> {
        self.names.get(&index).cloned()
    }
}

/// Extract DirectShow video device names from `ffmpeg -list_devices` output
///
/// Audio devices and alternative-name lines are skipped.
pub fn parse_dshow_video_devices(output: &str) -> Vec<String> {
    static DSHOW_VIDEO: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = DSHOW_VIDEO
        .get_or_init(|| Regex::new(r#"\[dshow @ .*\]  "(.*?)"\s+\(video\)"#).ok())
        .as_ref()
    else {
        return Vec::new();
    };

    re.captures_iter(output)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Camera names listed by an external FFmpeg executable
///
/// The listing runs at most once per instance, on the first lookup.
#[derive(Debug)]
pub struct FfmpegDeviceNames {
    ffmpeg: PathBuf,
    names: OnceLock<StaticCameraNames>,
}

impl FfmpegDeviceNames {
    /// Use the FFmpeg executable at `ffmpeg`
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            names: OnceLock::new(),
        }
    }

    /// Path of the executable
    pub fn executable(&self) -> &Path {
        &self.ffmpeg
    }

    /// Run the device listing
    ///
    /// Returns no names off Windows, where DirectShow does not exist.
    pub fn list_devices(&self) -> Result<Vec<String>> {
        if !cfg!(target_os = "windows") {
            tracing::debug!("DirectShow device listing is only available on Windows");
            return Ok(Vec::new());
        }

        if !self.ffmpeg.is_file() {
            return Err(CameraError::NameListing {
                reason: format!("FFmpeg not found at: {}", self.ffmpeg.display()),
            }
            .into());
        }

        let output = Command::new(&self.ffmpeg)
            .args(["-list_devices", "true", "-f", "dshow", "-i", "dummy"])
            .output()
            .map_err(|e| CameraError::NameListing {
                reason: e.to_string(),
            })?;

        // FFmpeg prints the listing on stderr and exits non-zero for the dummy input
        let stderr = String::from_utf8_lossy(&output.stderr);
        let names = parse_dshow_video_devices(&stderr);
        tracing::debug!("FFmpeg listed {} video device(s)", names.len());
        Ok(names)
    }

    fn names(&self) -> &StaticCameraNames {
        self.names.get_or_init(|| match self.list_devices() {
            Ok(names) => StaticCameraNames::from_listing(names),
            Err(e) => {
                tracing::warn!("Error while listing devices: {}", e);
                StaticCameraNames::default()
            }
        })
    }
}

impl CameraNameSource for FfmpegDeviceNames {
    fn lookup_name(&self, index: u32) -> Option<String> {
        self.names().lookup_name(index)
    }
}

//! # Microstep
//!
//! Serial CNC and camera control for a desktop microscopy rig:
//! - Serial port enumeration with USB vendor/product ids
//! - CNC controller identification (`M115` answered with `ok`)
//! - Relative X/Y/Z jogging and homing over a line-oriented G-code session
//! - Camera discovery with DirectShow names from FFmpeg, and a live feed
//!
//! ## Architecture
//!
//! Microstep is organized as a workspace with multiple crates:
//!
//! 1. **microstep-core** - Error taxonomy and motion vocabulary
//! 2. **microstep-communication** - Serial transport, probe, CNC session
//! 3. **microstep-camera** - Capture backends, enumeration, streaming
//! 4. **microstep-settings** - Read-only configuration
//! 5. **microstep** - CLI binary, interactive menu and jog console

pub mod cli;
pub mod console;
pub mod menu;

pub use microstep_camera::{enumerate_cameras, CameraInfo, CameraStream};
pub use microstep_communication::{
    list_ports, probe, CncProbe, CncSession, JogReport, SerialPortInfo, SessionConfig,
};
pub use microstep_core::{Axis, Error, JogDirection, Result};
pub use microstep_settings::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Sets up structured logging with:
/// - Output on stderr, so stdout stays machine-readable
/// - RUST_LOG environment variable support
/// - `info` by default, `debug` when `verbose` is set
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(true)
        .with_thread_names(verbose);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

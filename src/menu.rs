//! Interactive numbered-menu device selection

use microstep_camera::CameraInfo;
use microstep_communication::SerialPortInfo;
use microstep_core::ControllerError;
use std::io::{self, BufRead, Write};

/// Label shown at index 0 when "no selection" is allowed
pub const NONE_LABEL: &str = "None";

/// Ask the user to pick one of `options` by number
///
/// Returns the index into `options`, or `None` when the list is empty,
/// the user picks the "None" entry (offered at 0 when `allow_none` is set),
/// or input ends. Invalid input re-prompts.
pub fn select_option<R: BufRead, W: Write>(
    options: &[String],
    prompt: &str,
    allow_none: bool,
    input: &mut R,
    output: &mut W,
) -> io::Result<Option<usize>> {
    if options.is_empty() {
        writeln!(output, "No options found.")?;
        return Ok(None);
    }

    let offset = usize::from(allow_none);
    let count = options.len() + offset;

    writeln!(output, "{}", prompt)?;
    if allow_none {
        writeln!(output, "0: {}", NONE_LABEL)?;
    }
    for (idx, option) in options.iter().enumerate() {
        writeln!(output, "{}: {}", idx + offset, option)?;
    }

    let mut line = String::new();
    loop {
        write!(output, "Select a number (0-{}): ", count - 1)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(None);
        }

        match parse_choice(&line, count) {
            Ok(0) if allow_none => return Ok(None),
            Ok(choice) => return Ok(Some(choice - offset)),
            Err(e) => {
                tracing::debug!("{}", e);
                writeln!(output, "Invalid input. Please try again.")?;
            }
        }
    }
}

/// Parse a menu answer against `count` numbered entries
pub fn parse_choice(input: &str, count: usize) -> Result<usize, ControllerError> {
    let input = input.trim();
    input
        .parse::<usize>()
        .ok()
        .filter(|choice| *choice < count)
        .ok_or_else(|| ControllerError::InvalidSelection {
            input: input.to_string(),
            max: count.saturating_sub(1),
        })
}

/// Devices picked in the interactive flow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Port confirmed as a CNC controller
    pub cnc_port: Option<String>,
    /// Chosen camera index
    pub camera_index: Option<u32>,
}

/// Walk the user through picking a CNC port and a camera
///
/// A chosen port is only kept if `is_cnc` confirms it. The camera list
/// has no "None" entry.
pub fn select_devices<R, W, F>(
    ports: &[SerialPortInfo],
    cameras: &[CameraInfo],
    is_cnc: F,
    input: &mut R,
    output: &mut W,
) -> io::Result<Selection>
where
    R: BufRead,
    W: Write,
    F: Fn(&str) -> bool,
{
    let mut selection = Selection::default();

    if ports.is_empty() {
        writeln!(output, "No serial ports available.")?;
    } else {
        let labels: Vec<String> = ports.iter().map(ToString::to_string).collect();
        match select_option(&labels, "Available serial ports:", true, input, output)? {
            Some(idx) => {
                let port = &ports[idx].device;
                writeln!(output, "Checking if port {} is a CNC device...", port)?;
                if is_cnc(port) {
                    writeln!(output, "Port {} is a CNC device.", port)?;
                    selection.cnc_port = Some(port.clone());
                } else {
                    writeln!(output, "Port {} is not a CNC device or not responding.", port)?;
                }
            }
            None => writeln!(output, "No CNC device selected.")?,
        }
    }

    if cameras.is_empty() {
        writeln!(output, "No cameras found.")?;
    } else {
        let labels: Vec<String> = cameras.iter().map(ToString::to_string).collect();
        if let Some(idx) = select_option(&labels, "Available cameras:", false, input, output)? {
            selection.camera_index = Some(cameras[idx].index);
        }
    }

    Ok(selection)
}

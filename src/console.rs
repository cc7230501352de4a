//! Interactive jog console
//!
//! One command per line:
//!
//! | input | action |
//! |---|---|
//! | `x+`, `y -`, `z-1` | jog one axis by the current step |
//! | `home` | homing cycle (`G28`) |
//! | `step 0.5` | change the jog step in mm |
//! | `help` | list commands |
//! | `quit`, `exit` | leave the console |
//!
//! Anything else is sent to the controller verbatim.

use microstep_communication::CncSession;
use microstep_core::{Axis, Error, JogDirection, Result};
use std::io::{self, BufRead, Write};

/// A parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Jog one axis by the session's step size
    Jog(Axis, JogDirection),
    /// Run the homing cycle
    Home,
    /// Change the jog step
    Step(f64),
    /// Print the command list
    Help,
    /// Leave the console
    Quit,
    /// Send the line as-is
    Raw(String),
}

/// Parse one console line; blank lines yield `Ok(None)`
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let keyword = tokens[0].to_ascii_lowercase();

    let command = match (keyword.as_str(), tokens.len()) {
        ("quit" | "exit", 1) => ConsoleCommand::Quit,
        ("help", 1) => ConsoleCommand::Help,
        ("home", 1) => ConsoleCommand::Home,
        ("step", 2) => {
            let value = tokens[1]
                .parse::<f64>()
                .map_err(|_| Error::other(format!("Invalid step size: {}", tokens[1])))?;
            ConsoleCommand::Step(value)
        }
        ("step", _) => return Err(Error::other("Usage: step <mm>")),
        _ => parse_jog(&tokens).unwrap_or_else(|| ConsoleCommand::Raw(line.to_string())),
    };

    Ok(Some(command))
}

fn parse_jog(tokens: &[&str]) -> Option<ConsoleCommand> {
    let (axis, direction) = match tokens {
        [word] => {
            let mut chars = word.chars();
            let axis = chars.next()?.to_string();
            (axis, chars.as_str().to_string())
        }
        [axis, direction] => (axis.to_string(), direction.to_string()),
        _ => return None,
    };

    let axis = axis.parse::<Axis>().ok()?;
    let direction = direction.parse::<JogDirection>().ok()?;
    Some(ConsoleCommand::Jog(axis, direction))
}

fn print_help<W: Write>(output: &mut W) -> io::Result<()> {
    writeln!(output, "  x+ | x- | y+ | y- | z+ | z-   jog by the current step")?;
    writeln!(output, "  home                         homing cycle")?;
    writeln!(output, "  step <mm>                    set the jog step")?;
    writeln!(output, "  quit                         leave the console")?;
    writeln!(output, "  anything else is sent to the controller as-is")
}

/// Read console lines from `input` until `quit` or end of input
///
/// The session must already be connected; commands on a disconnected
/// session report "No response." like a silent controller.
pub fn run_console<R: BufRead, W: Write>(
    session: &mut CncSession,
    input: &mut R,
    output: &mut W,
) -> io::Result<()> {
    writeln!(
        output,
        "Connected to {}. Step size {} mm. Type 'help' for commands.",
        session.port(),
        session.step_size()
    )?;

    let mut line = String::new();
    loop {
        write!(output, "> ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(());
        }

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writeln!(output, "{}", e)?;
                continue;
            }
        };

        match command {
            ConsoleCommand::Quit => return Ok(()),
            ConsoleCommand::Help => print_help(output)?,
            ConsoleCommand::Step(mm) => match session.set_step_size(mm) {
                Ok(()) => writeln!(output, "Step size: {} mm", session.step_size())?,
                Err(e) => writeln!(output, "{}", e)?,
            },
            ConsoleCommand::Jog(axis, direction) => match session.jog(axis, direction) {
                Ok(report) => writeln!(output, "{}", report)?,
                Err(e) => writeln!(output, "Move {}{} failed: {}", axis, direction, e)?,
            },
            ConsoleCommand::Home => writeln!(output, "{}", status(session.home()))?,
            ConsoleCommand::Raw(gcode) => {
                writeln!(output, "{}", status(session.send_command(&gcode)))?
            }
        }
    }
}

fn status(response: Option<String>) -> String {
    match response {
        Some(r) if !r.is_empty() => r,
        _ => "No response.".to_string(),
    }
}

//! Motion vocabulary
//!
//! Axis letters and jog directions shared by the session, the console and
//! the CLI. Parsing is case-insensitive and accepts the forms the console
//! understands (`x`, `+`, `-1`, `neg`).

use crate::error::ControllerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A linear machine axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Axis {
    /// X axis
    X,
    /// Y axis
    Y,
    /// Z axis (focus)
    Z,
}

impl Axis {
    /// All axes in display order
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// G-code axis letter
    pub fn letter(self) -> char {
        match self {
            Self::X => 'X',
            Self::Y => 'Y',
            Self::Z => 'Z',
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for Axis {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "X" => Ok(Self::X),
            "Y" => Ok(Self::Y),
            "Z" => Ok(Self::Z),
            _ => Err(ControllerError::UnknownAxis {
                axis: s.to_string(),
            }),
        }
    }
}

/// Direction of a jog along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JogDirection {
    /// Towards positive coordinates (+1)
    Positive,
    /// Towards negative coordinates (-1)
    Negative,
}

impl JogDirection {
    /// Sign multiplier applied to the step size
    pub fn sign(self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
        }
    }
}

impl fmt::Display for JogDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "+"),
            Self::Negative => write!(f, "-"),
        }
    }
}

impl FromStr for JogDirection {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "+" | "+1" | "1" | "pos" | "positive" => Ok(Self::Positive),
            "-" | "-1" | "neg" | "negative" => Ok(Self::Negative),
            other => Err(ControllerError::Other {
                message: format!("Unknown jog direction: {}", other),
            }),
        }
    }
}

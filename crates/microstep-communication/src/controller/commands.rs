//! Fixed G-code templates used by the session and the probe

use microstep_core::Axis;

/// Firmware info request; controllers acknowledge it with "ok"
pub const FIRMWARE_INFO: &str = "M115";

/// Switch to relative positioning
pub const RELATIVE_POSITIONING: &str = "G91";

/// Switch to absolute positioning
pub const ABSOLUTE_POSITIONING: &str = "G90";

/// Run the homing cycle
pub const HOME: &str = "G28";

/// Default feed rate for jog moves, in mm/min
pub const DEFAULT_JOG_FEED_RATE: f64 = 3000.0;

/// Linear move on one axis, with an explicitly signed distance
///
/// `linear_move(Axis::X, 2.0, 3000.0)` yields `G1 X+2.000 F3000`.
pub fn linear_move(axis: Axis, distance: f64, feed_rate: f64) -> String {
    format!("G1 {}{:+.3} F{:.0}", axis.letter(), distance, feed_rate)
}

/// The three-line relative jog: relative mode, move, absolute mode
pub fn relative_jog(axis: Axis, distance: f64, feed_rate: f64) -> [String; 3] {
    [
        RELATIVE_POSITIONING.to_string(),
        linear_move(axis, distance, feed_rate),
        ABSOLUTE_POSITIONING.to_string(),
    ]
}

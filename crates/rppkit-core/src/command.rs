//! Device dialect commands
//!
//! The device accepts a small line protocol:
//! - `G00`/`G01 [X<f>] [Y<f>] [Z<f>] F<f>`: linear move (rapid / feed)
//! - `J1`/`J2`/`J3 D<f> [F<f>]`: jog a single joint
//! - `G28`: home all axes
//! - `M114`: report position
//!
//! Everything else the device understands (`G90`, `M17`, ...) travels as
//! [`DeviceCommand::Raw`] and has no effect on the kinematic model.

use crate::error::GcodeError;
use serde::{Deserialize, Serialize};

/// Joint addressed by a jog command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointAxis {
    /// J1, rotation in degrees
    Rotation,
    /// J2, vertical extension
    Extension1,
    /// J3, radial extension
    Extension2,
}

impl JointAxis {
    /// Wire number of the axis
    pub fn number(&self) -> u8 {
        match self {
            Self::Rotation => 1,
            Self::Extension1 => 2,
            Self::Extension2 => 3,
        }
    }

    /// Axis for a wire number
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Rotation),
            2 => Some(Self::Extension1),
            3 => Some(Self::Extension2),
            _ => None,
        }
    }

    /// Unit label used in log messages
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Rotation => "deg",
            Self::Extension1 | Self::Extension2 => "mm",
        }
    }
}

impl std::fmt::Display for JointAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rotation => write!(f, "θ1"),
            Self::Extension1 => write!(f, "d2"),
            Self::Extension2 => write!(f, "d3"),
        }
    }
}

/// A single command in the device dialect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceCommand {
    /// Linear move in Cartesian coordinates
    LinearMove {
        /// `G00` when true, `G01` otherwise
        rapid: bool,
        /// Target X
        x: Option<f64>,
        /// Target Y
        y: Option<f64>,
        /// Target Z
        z: Option<f64>,
        /// Feedrate
        feedrate: Option<f64>,
    },
    /// Relative move of one joint
    JogAxis {
        /// Joint to move
        axis: JointAxis,
        /// Signed distance (degrees for rotation)
        distance: f64,
        /// Feedrate
        feedrate: Option<f64>,
    },
    /// Home all axes
    Home,
    /// Ask the device to report its position
    ReportPosition,
    /// Any other line, passed through verbatim
    Raw(String),
}

impl DeviceCommand {
    /// Absolute positioning mode command
    pub fn absolute_mode() -> Self {
        Self::Raw("G90".to_string())
    }

    /// Whether the command carries at least one target axis
    pub fn has_motion(&self) -> bool {
        match self {
            Self::LinearMove { x, y, z, .. } => x.is_some() || y.is_some() || z.is_some(),
            Self::JogAxis { .. } | Self::Home => true,
            Self::ReportPosition | Self::Raw(_) => false,
        }
    }

    /// Parse a device dialect line
    ///
    /// `line_number` is only used for error context. Comments must be
    /// stripped by the caller (see [`strip_comment`]).
    pub fn parse(line: &str, line_number: u32) -> Result<Self, GcodeError> {
        let text = line.trim();
        let mut tokens = text.split_whitespace();
        let code = tokens
            .next()
            .ok_or(GcodeError::Empty { line_number })?
            .to_ascii_uppercase();

        match code.as_str() {
            "G0" | "G00" | "G1" | "G01" => {
                let rapid = code == "G0" || code == "G00";
                let (mut x, mut y, mut z, mut feedrate) = (None, None, None, None);
                for token in tokens {
                    let (letter, value) = split_word(token);
                    let slot = match letter {
                        'X' => &mut x,
                        'Y' => &mut y,
                        'Z' => &mut z,
                        'F' => &mut feedrate,
                        _ => continue,
                    };
                    *slot = Some(parse_value(letter, value, text, line_number)?);
                }
                Ok(Self::LinearMove {
                    rapid,
                    x,
                    y,
                    z,
                    feedrate,
                })
            }
            "G28" => Ok(Self::Home),
            "M114" => Ok(Self::ReportPosition),
            jog if jog.len() == 2 && jog.starts_with('J') => {
                let axis = jog[1..]
                    .parse::<u8>()
                    .ok()
                    .and_then(JointAxis::from_number)
                    .ok_or_else(|| GcodeError::InvalidAxis {
                        line_number,
                        text: text.to_string(),
                    })?;
                let (mut distance, mut feedrate) = (None, None);
                for token in tokens {
                    let (letter, value) = split_word(token);
                    match letter {
                        'D' => distance = Some(parse_value(letter, value, text, line_number)?),
                        'F' => feedrate = Some(parse_value(letter, value, text, line_number)?),
                        _ => {}
                    }
                }
                let distance = distance.ok_or_else(|| GcodeError::MissingParameter {
                    line_number,
                    param: 'D',
                    text: text.to_string(),
                })?;
                Ok(Self::JogAxis {
                    axis,
                    distance,
                    feedrate,
                })
            }
            _ => Ok(Self::Raw(text.to_string())),
        }
    }
}

impl std::fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LinearMove {
                rapid,
                x,
                y,
                z,
                feedrate,
            } => {
                write!(f, "{}", if *rapid { "G00" } else { "G01" })?;
                for (letter, value) in [('X', x), ('Y', y), ('Z', z), ('F', feedrate)] {
                    if let Some(value) = value {
                        write!(f, " {}{:.3}", letter, value)?;
                    }
                }
                Ok(())
            }
            Self::JogAxis {
                axis,
                distance,
                feedrate,
            } => {
                write!(f, "J{} D{:.3}", axis.number(), distance)?;
                if let Some(feedrate) = feedrate {
                    write!(f, " F{:.3}", feedrate)?;
                }
                Ok(())
            }
            Self::Home => write!(f, "G28"),
            Self::ReportPosition => write!(f, "M114"),
            Self::Raw(text) => write!(f, "{}", text),
        }
    }
}

/// Remove a `;` comment and surrounding whitespace from a line
pub fn strip_comment(line: &str) -> &str {
    line.split(';').next().unwrap_or_default().trim()
}

/// Parse a whole device-dialect program
///
/// Blank and comment-only lines are skipped. Lines that fail to parse are
/// returned separately so the caller can report them; parsing continues.
pub fn parse_program(text: &str) -> (Vec<DeviceCommand>, Vec<GcodeError>) {
    let mut commands = Vec::new();
    let mut errors = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = strip_comment(raw);
        if line.is_empty() {
            continue;
        }
        match DeviceCommand::parse(line, index as u32 + 1) {
            Ok(command) => commands.push(command),
            Err(e) => errors.push(e),
        }
    }
    (commands, errors)
}

/// Split `X12.5` into `('X', "12.5")`
fn split_word(token: &str) -> (char, &str) {
    let mut chars = token.chars();
    match chars.next() {
        Some(letter) => (letter.to_ascii_uppercase(), chars.as_str()),
        None => (' ', ""),
    }
}

fn parse_value(field: char, value: &str, text: &str, line_number: u32) -> Result<f64, GcodeError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GcodeError::InvalidNumber {
            line_number,
            field,
            text: text.to_string(),
        })
}

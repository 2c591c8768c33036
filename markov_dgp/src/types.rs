// src/types.rs
//
// Core value types shared by the dynamics, policies and encoders.
//
// Numeric codes follow the exported dataset convention:
// - Side:        LEFT = -1, RIGHT = +1
// - Observation: placeholder = 0, heard side = -1/+1, terminal sentinel = 3
// - Action:      listen = 0, open door = -1/+1, end-of-trajectory marker = 3

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Code of the terminal sentinel observation and of the end-of-trajectory action.
pub const TERMINAL_CODE: i8 = 3;

/// Code of the neutral placeholder observation at position 0.
pub const PLACEHOLDER_CODE: i8 = 0;

/// Location of the tiger (the latent state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    #[serde(alias = "L")]
    Left,
    #[serde(alias = "R")]
    Right,
}

impl Side {
    pub fn code(self) -> i8 {
        match self {
            Side::Left => -1,
            Side::Right => 1,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn from_code(code: i64) -> Result<Side, ConfigError> {
        match code {
            -1 => Ok(Side::Left),
            1 => Ok(Side::Right),
            other => Err(ConfigError::InvalidStateCode(other)),
        }
    }

    /// Parse `L`/`R`/`LEFT`/`RIGHT` (case-insensitive) or a numeric code.
    pub fn parse(s: &str) -> Result<Side, ConfigError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" | "LEFT" | "-1" => Ok(Side::Left),
            "R" | "RIGHT" | "1" | "+1" => Ok(Side::Right),
            other => Err(ConfigError::UnknownVariant {
                kind: "side",
                value: other.to_string(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Side::Left => "LEFT",
            Side::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One raw observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Observation {
    /// Neutral value at position 0; not a sensor reading.
    Placeholder,
    /// Sensor report of a side (possibly wrong under the noisy regime).
    Heard(Side),
    /// Emitted once a terminating action has been taken.
    Terminal,
}

impl Observation {
    pub fn code(self) -> i8 {
        match self {
            Observation::Placeholder => PLACEHOLDER_CODE,
            Observation::Heard(side) => side.code(),
            Observation::Terminal => TERMINAL_CODE,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Observation::Terminal)
    }
}

/// Agent action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Non-terminating "observe" action.
    Listen,
    /// Terminating action: open the door on the given side.
    Open(Side),
    /// Reserved marker appended (and padded) after the trajectory ends.
    /// Never a valid input to the dynamics.
    End,
}

impl Action {
    pub fn code(self) -> i8 {
        match self {
            Action::Listen => 0,
            Action::Open(side) => side.code(),
            Action::End => TERMINAL_CODE,
        }
    }

    /// Decode an action code. Only codes an agent may choose are accepted;
    /// the end marker is produced by the generator, never chosen.
    pub fn from_code(code: i64) -> Result<Action, ConfigError> {
        match code {
            0 => Ok(Action::Listen),
            -1 => Ok(Action::Open(Side::Left)),
            1 => Ok(Action::Open(Side::Right)),
            other => Err(ConfigError::InvalidActionCode(other)),
        }
    }

    pub fn is_terminating(self) -> bool {
        matches!(self, Action::Open(_))
    }
}

//! Outbound engine commands
//!
//! Every command is an address plus an ordered argument list:
//!
//! ```text
//! /slot{N} "rec"   0|1
//! /slot{N} "play"  0|1
//! /slot{N} "crop"  <signed ms>
//! /slot{N} "reset" 1
//! /slot{N} "clear" 1
//! /monitor         0|1
//! ```
//!
//! Delivery is fire-and-forget: nothing is acknowledged or retracted.

use std::fmt;

/// Per-slot command parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotParam {
    Rec,
    Play,
    Crop,
    Reset,
    Clear,
}

impl SlotParam {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rec => "rec",
            Self::Play => "play",
            Self::Crop => "crop",
            Self::Reset => "reset",
            Self::Clear => "clear",
        }
    }
}

/// A single argument of an outbound command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandArg {
    Str(&'static str),
    Int(i64),
}

/// Command for the remote looping engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Transport/length command for one slot (ids are 1-based)
    Slot {
        slot: u8,
        param: SlotParam,
        value: i64,
    },
    /// Monitor passthrough level (idempotent level-set)
    Monitor(bool),
}

impl Command {
    pub fn slot(slot: u8, param: SlotParam, value: i64) -> Self {
        Self::Slot { slot, param, value }
    }

    /// Destination address
    pub fn address(&self) -> String {
        match self {
            Self::Slot { slot, .. } => format!("/slot{}", slot),
            Self::Monitor(_) => "/monitor".to_string(),
        }
    }

    /// Ordered argument list
    pub fn args(&self) -> Vec<CommandArg> {
        match self {
            Self::Slot { param, value, .. } => {
                vec![CommandArg::Str(param.as_str()), CommandArg::Int(*value)]
            }
            Self::Monitor(on) => vec![CommandArg::Int(i64::from(*on))],
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slot { param, value, .. } => {
                write!(f, "{} {} {}", self.address(), param.as_str(), value)
            }
            Self::Monitor(on) => write!(f, "{} {}", self.address(), i64::from(*on)),
        }
    }
}

/// Sends commands to the remote engine
pub trait CommandEmitter {
    /// Send one command; failures are the emitter's to log, never the caller's
    fn emit(&mut self, command: &Command);
}

/// In-memory emitter that records every command
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingEmitter {
    pub sent: Vec<Command>,
}

#[cfg(test)]
impl RecordingEmitter {
    /// Return and forget everything sent so far
    pub fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.sent)
    }
}

#[cfg(test)]
impl CommandEmitter for RecordingEmitter {
    fn emit(&mut self, command: &Command) {
        self.sent.push(*command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_command_layout() {
        let cmd = Command::slot(2, SlotParam::Crop, -150);
        assert_eq!(cmd.address(), "/slot2");
        assert_eq!(
            cmd.args(),
            vec![CommandArg::Str("crop"), CommandArg::Int(-150)]
        );
        assert_eq!(cmd.to_string(), "/slot2 crop -150");
    }

    #[test]
    fn test_monitor_command_layout() {
        let cmd = Command::Monitor(true);
        assert_eq!(cmd.address(), "/monitor");
        assert_eq!(cmd.args(), vec![CommandArg::Int(1)]);
        assert_eq!(Command::Monitor(false).to_string(), "/monitor 0");
    }
}

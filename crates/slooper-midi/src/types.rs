//! Protocol-level control types
//!
//! A control is identified by its message kind, number and channel. The
//! controller core only sees [`ControlEvent`]s; the MIDI adapter converts raw
//! bytes into them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical control identity (note or controller number plus channel)
///
/// Used as the key for profile lookups and LED feedback routing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlAddress {
    /// Note On/Off message (buttons)
    Note {
        /// MIDI channel (0-15)
        channel: u8,
        /// Note number (0-127)
        note: u8,
    },
    /// Control Change message (encoders)
    #[serde(rename = "control_change")]
    CC {
        /// MIDI channel (0-15)
        channel: u8,
        /// CC number (0-127)
        cc: u8,
    },
}

impl ControlAddress {
    /// Create a Note control
    pub fn note(channel: u8, note: u8) -> Self {
        Self::Note { channel, note }
    }

    /// Create a CC control
    pub fn cc(channel: u8, cc: u8) -> Self {
        Self::CC { channel, cc }
    }

    /// Get the MIDI channel
    pub fn channel(&self) -> u8 {
        match self {
            Self::Note { channel, .. } | Self::CC { channel, .. } => *channel,
        }
    }
}

impl fmt::Display for ControlAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Note { channel, note } => write!(f, "note {} ch {}", note, channel),
            Self::CC { channel, cc } => write!(f, "cc {} ch {}", cc, channel),
        }
    }
}

/// Semantic value of a control interaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlValue {
    /// Button pressed with the given velocity (0 means released)
    Press { velocity: u8 },
    /// Button released
    Release,
    /// Continuous controller value (0-127)
    Continuous(u8),
}

impl ControlValue {
    /// Check if this is a real press (velocity 0 does not count)
    pub fn is_press(&self) -> bool {
        matches!(self, Self::Press { velocity } if *velocity > 0)
    }

    /// Check if this is a release, including the "note on, velocity 0" form
    pub fn is_release(&self) -> bool {
        matches!(self, Self::Release | Self::Press { velocity: 0 })
    }
}

/// Input event from the controller hardware
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlEvent {
    /// Which control was touched
    pub address: ControlAddress,
    /// What happened to it
    pub value: ControlValue,
}

impl ControlEvent {
    pub fn press(address: ControlAddress, velocity: u8) -> Self {
        Self {
            address,
            value: ControlValue::Press { velocity },
        }
    }

    pub fn release(address: ControlAddress) -> Self {
        Self {
            address,
            value: ControlValue::Release,
        }
    }

    pub fn continuous(address: ControlAddress, value: u8) -> Self {
        Self {
            address,
            value: ControlValue::Continuous(value),
        }
    }
}

// === Conversion between MidiInputEvent and ControlEvent ===

impl From<&crate::midi::input::MidiInputEvent> for ControlEvent {
    fn from(event: &crate::midi::input::MidiInputEvent) -> Self {
        use crate::midi::input::MidiInputEvent;
        match *event {
            MidiInputEvent::NoteOn {
                channel,
                note,
                velocity,
            } => ControlEvent::press(ControlAddress::note(channel, note), velocity),
            MidiInputEvent::NoteOff { channel, note, .. } => {
                ControlEvent::release(ControlAddress::note(channel, note))
            }
            MidiInputEvent::ControlChange { channel, cc, value } => {
                ControlEvent::continuous(ControlAddress::cc(channel, cc), value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::input::MidiInputEvent;

    #[test]
    fn test_zero_velocity_press_is_release() {
        let zero = ControlValue::Press { velocity: 0 };
        assert!(!zero.is_press());
        assert!(zero.is_release());

        let press = ControlValue::Press { velocity: 127 };
        assert!(press.is_press());
        assert!(!press.is_release());

        assert!(ControlValue::Release.is_release());
        assert!(!ControlValue::Continuous(0).is_release());
    }

    #[test]
    fn test_from_midi_event() {
        let event = ControlEvent::from(&MidiInputEvent::NoteOff {
            channel: 15,
            note: 15,
            velocity: 64,
        });
        assert_eq!(event, ControlEvent::release(ControlAddress::note(15, 15)));

        let event = ControlEvent::from(&MidiInputEvent::ControlChange {
            channel: 0,
            cc: 20,
            value: 65,
        });
        assert_eq!(event.address, ControlAddress::cc(0, 20));
        assert_eq!(event.value, ControlValue::Continuous(65));
    }

    #[test]
    fn test_control_address_serde() {
        let note = ControlAddress::note(0, 10);
        let yaml = serde_yaml::to_string(&note).unwrap();
        assert!(yaml.contains("type: note"));
        let parsed: ControlAddress = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, note);

        let cc: ControlAddress =
            serde_yaml::from_str("type: control_change\nchannel: 15\ncc: 8\n").unwrap();
        assert_eq!(cc, ControlAddress::cc(15, 8));
        assert_eq!(cc.channel(), 15);
    }
}

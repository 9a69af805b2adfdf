//! MIDI output for LED feedback
//!
//! Encodes indicator writes as MIDI messages. Buttons are lit with a Note On
//! carrying the configured on velocity and darkened with a Note Off; CC
//! addresses receive the on/off value directly.

use crate::config::LedConfig;
use crate::feedback::Indicator;
use crate::types::ControlAddress;
use midir::MidiOutputConnection;
use std::collections::HashSet;

/// MIDI output handler for LED feedback
pub struct MidiOutputHandler {
    /// MIDI output connection
    connection: MidiOutputConnection,
    /// Velocities used for on/off
    led: LedConfig,
    /// Addresses currently lit (turned off again on drop)
    lit: HashSet<ControlAddress>,
}

impl MidiOutputHandler {
    /// Create a new output handler
    pub fn new(connection: MidiOutputConnection, led: LedConfig) -> Self {
        Self {
            connection,
            led,
            lit: HashSet::new(),
        }
    }

    /// Send a raw MIDI feedback message
    fn send_midi(&mut self, control: &ControlAddress, value: u8) {
        let message = encode_led(control, value);
        log::debug!("[MIDI OUT] {} val={}", control, value);

        if let Err(e) = self.connection.send(&message) {
            log::warn!("MIDI output: Failed to send message: {}", e);
        }
    }

    /// Turn off every LED this handler has lit
    pub fn clear_all(&mut self) {
        let addresses: Vec<ControlAddress> = self.lit.drain().collect();
        let off = self.led.off_value;
        for address in &addresses {
            self.send_midi(address, off);
        }
    }
}

impl Indicator for MidiOutputHandler {
    fn set(&mut self, control: &ControlAddress, on: bool) {
        let value = if on {
            self.lit.insert(*control);
            self.led.on_value
        } else {
            self.lit.remove(control);
            self.led.off_value
        };
        self.send_midi(control, value);
    }
}

impl Drop for MidiOutputHandler {
    fn drop(&mut self) {
        self.clear_all();
    }
}

/// Encode an LED write as MIDI bytes
///
/// Notes use Note On for non-zero values and Note Off for zero, since some
/// controllers ignore a zero-velocity Note On.
fn encode_led(control: &ControlAddress, value: u8) -> [u8; 3] {
    match *control {
        ControlAddress::Note { channel, note } => {
            if value > 0 {
                [0x90 | (channel & 0x0F), note, value]
            } else {
                [0x80 | (channel & 0x0F), note, 0]
            }
        }
        ControlAddress::CC { channel, cc } => [0xB0 | (channel & 0x0F), cc, value],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_note_led() {
        let control = ControlAddress::note(15, 15);
        assert_eq!(encode_led(&control, 127), [0x9F, 15, 127]);
        assert_eq!(encode_led(&control, 0), [0x8F, 15, 0]);
    }

    #[test]
    fn test_encode_cc_led() {
        let control = ControlAddress::cc(0, 20);
        assert_eq!(encode_led(&control, 127), [0xB0, 20, 127]);
        assert_eq!(encode_led(&control, 0), [0xB0, 20, 0]);
    }
}

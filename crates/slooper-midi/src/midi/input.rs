//! MIDI input handling
//!
//! Receives raw MIDI bytes from the midir callback, parses them and forwards
//! the events to the runtime loop via a flume channel. The callback never
//! touches controller state; all processing happens on the consuming thread.

use super::connection::{MidiConnection, MidiConnectionError};
use crate::config::DeviceProfile;
use flume::Sender;
use midir::{MidiInput, MidiInputConnection, MidiInputPort};

/// Raw MIDI input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiInputEvent {
    /// Note On message
    NoteOn {
        channel: u8,
        note: u8,
        velocity: u8,
    },
    /// Note Off message
    NoteOff {
        channel: u8,
        note: u8,
        velocity: u8,
    },
    /// Control Change message
    ControlChange { channel: u8, cc: u8, value: u8 },
}

impl MidiInputEvent {
    /// Parse raw MIDI bytes into an event
    ///
    /// MIDI message format:
    /// - Note Off: 0x8n nn vv (n=channel, nn=note, vv=velocity)
    /// - Note On: 0x9n nn vv
    /// - Control Change: 0xBn cc vv (cc=controller, vv=value)
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 3 {
            return None;
        }

        let status = data[0];
        let channel = status & 0x0F;

        match status & 0xF0 {
            0x80 => Some(Self::NoteOff {
                channel,
                note: data[1],
                velocity: data[2],
            }),
            // Note On with velocity 0 is a Note Off for controllers that never send 0x8n
            0x90 if data[2] == 0 => Some(Self::NoteOff {
                channel,
                note: data[1],
                velocity: 0,
            }),
            0x90 => Some(Self::NoteOn {
                channel,
                note: data[1],
                velocity: data[2],
            }),
            0xB0 => Some(Self::ControlChange {
                channel,
                cc: data[1],
                value: data[2],
            }),
            _ => None, // Ignore other message types (pitch bend, aftertouch, clock, etc.)
        }
    }

    /// Get the MIDI channel
    pub fn channel(&self) -> u8 {
        match self {
            Self::NoteOn { channel, .. } => *channel,
            Self::NoteOff { channel, .. } => *channel,
            Self::ControlChange { channel, .. } => *channel,
        }
    }
}

/// MIDI input handler
///
/// Owns the midir connection; dropping it closes the port and disconnects
/// the event channel.
pub struct MidiInputHandler {
    /// The midir connection (kept alive for the duration)
    _connection: MidiInputConnection<Sender<MidiInputEvent>>,
}

impl MidiInputHandler {
    /// Connect to the input port of a device profile
    pub fn connect(
        profile: &DeviceProfile,
        event_tx: Sender<MidiInputEvent>,
    ) -> Result<Self, MidiConnectionError> {
        let (midi_in, port) = MidiConnection::find_input_port_for(profile)?;
        Self::open(midi_in, &port, event_tx)
    }

    /// Connect to the first input port whose name contains `port_match`
    ///
    /// Used by learn mode, where no profile exists yet.
    pub fn connect_matching(
        port_match: &str,
        event_tx: Sender<MidiInputEvent>,
    ) -> Result<Self, MidiConnectionError> {
        let (midi_in, port) = MidiConnection::find_input_port(port_match)?;
        Self::open(midi_in, &port, event_tx)
    }

    fn open(
        midi_in: MidiInput,
        port: &MidiInputPort,
        event_tx: Sender<MidiInputEvent>,
    ) -> Result<Self, MidiConnectionError> {
        let connection = midi_in
            .connect(port, "slooper-midi-input", Self::midi_callback, event_tx)
            .map_err(|e| MidiConnectionError::ConnectionError(e.to_string()))?;

        log::info!("MIDI: Input handler connected");

        Ok(Self {
            _connection: connection,
        })
    }

    /// The midir callback function
    ///
    /// Called from the MIDI driver thread whenever a message is received.
    /// Must be fast and non-blocking.
    fn midi_callback(_timestamp: u64, data: &[u8], event_tx: &mut Sender<MidiInputEvent>) {
        let Some(event) = MidiInputEvent::parse(data) else {
            return;
        };

        log::debug!("[MIDI IN] {:?}", event);

        if event_tx.try_send(event).is_err() {
            log::warn!("MIDI: Event channel full, dropping event");
        }
    }
}

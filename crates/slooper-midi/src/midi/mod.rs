//! MIDI protocol backend
//!
//! Handles MIDI device connection, input parsing, and LED output via midir.

pub mod connection;
pub mod input;
pub mod output;

pub use connection::{MidiConnection, MidiConnectionError};
pub use input::{MidiInputEvent, MidiInputHandler};
pub use output::MidiOutputHandler;

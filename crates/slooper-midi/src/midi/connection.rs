//! MIDI port discovery and connection
//!
//! Uses midir for cross-platform MIDI I/O (ALSA on Linux, CoreMIDI on macOS, WinMM on Windows).

use crate::config::DeviceProfile;
use midir::{MidiInput, MidiInputPort, MidiOutput, MidiOutputConnection};

/// Error type for MIDI connection operations
#[derive(Debug, thiserror::Error)]
pub enum MidiConnectionError {
    #[error("Failed to initialize MIDI input: {0}")]
    InputInitError(String),

    #[error("Failed to initialize MIDI output: {0}")]
    OutputInitError(String),

    #[error("No MIDI input ports available")]
    NoInputPorts,

    #[error("No MIDI port found matching pattern: {0}")]
    PortNotFound(String),

    #[error("Failed to connect to MIDI port: {0}")]
    ConnectionError(String),

    #[error("Failed to get port info: {0}")]
    PortInfoError(String),
}

/// Port lookup helpers
pub struct MidiConnection;

impl MidiConnection {
    /// Find the input port for a device profile
    ///
    /// Tries the learned exact port name first, then the `port_match` substring.
    pub fn find_input_port_for(
        profile: &DeviceProfile,
    ) -> Result<(MidiInput, MidiInputPort), MidiConnectionError> {
        Self::find_input(&profile.port_match, |name| profile.matches_port(name))
    }

    /// Find an input port whose name contains `port_match` (case-insensitive)
    ///
    /// An empty pattern matches the first available port.
    pub fn find_input_port(
        port_match: &str,
    ) -> Result<(MidiInput, MidiInputPort), MidiConnectionError> {
        let pattern = port_match.to_lowercase();
        Self::find_input(port_match, |name| name.to_lowercase().contains(&pattern))
    }

    fn find_input(
        label: &str,
        matches: impl Fn(&str) -> bool,
    ) -> Result<(MidiInput, MidiInputPort), MidiConnectionError> {
        let midi_in = MidiInput::new("slooper-midi-in")
            .map_err(|e| MidiConnectionError::InputInitError(e.to_string()))?;

        let in_ports = midi_in.ports();
        if in_ports.is_empty() {
            return Err(MidiConnectionError::NoInputPorts);
        }

        let input_port = in_ports
            .into_iter()
            .find(|port| {
                midi_in
                    .port_name(port)
                    .map(|name| matches(&name))
                    .unwrap_or(false)
            })
            .ok_or_else(|| MidiConnectionError::PortNotFound(label.to_string()))?;

        let port_name = midi_in
            .port_name(&input_port)
            .map_err(|e| MidiConnectionError::PortInfoError(e.to_string()))?;

        log::info!("MIDI: Found input port: {}", port_name);

        Ok((midi_in, input_port))
    }

    /// Find and connect to the output port for a device profile
    ///
    /// LED feedback is optional, so failures are logged and yield `None`.
    pub fn connect_output_for(profile: &DeviceProfile) -> Option<MidiOutputConnection> {
        let midi_out = match MidiOutput::new("slooper-midi-out") {
            Ok(out) => out,
            Err(e) => {
                log::warn!("MIDI: Failed to initialize output: {}", e);
                return None;
            }
        };

        let out_ports = midi_out.ports();

        let output_port = out_ports.iter().find(|port| {
            midi_out
                .port_name(port)
                .map(|name| profile.matches_port(&name))
                .unwrap_or(false)
        })?;

        let port_name = midi_out.port_name(output_port).ok()?;
        log::info!("MIDI: Found output port: {}", port_name);

        match midi_out.connect(output_port, "slooper-midi-output") {
            Ok(conn) => {
                log::info!("MIDI: Connected to output port");
                Some(conn)
            }
            Err(e) => {
                log::warn!("MIDI: Failed to connect to output: {}", e);
                None
            }
        }
    }

    /// List all available MIDI input ports
    pub fn list_input_ports() -> Result<Vec<String>, MidiConnectionError> {
        let midi_in = MidiInput::new("slooper-midi-list")
            .map_err(|e| MidiConnectionError::InputInitError(e.to_string()))?;

        let ports: Vec<String> = midi_in
            .ports()
            .iter()
            .filter_map(|port| midi_in.port_name(port).ok())
            .collect();

        Ok(ports)
    }

    /// List all available MIDI output ports
    pub fn list_output_ports() -> Result<Vec<String>, MidiConnectionError> {
        let midi_out = MidiOutput::new("slooper-midi-list")
            .map_err(|e| MidiConnectionError::OutputInitError(e.to_string()))?;

        let ports: Vec<String> = midi_out
            .ports()
            .iter()
            .filter_map(|port| midi_out.port_name(port).ok())
            .collect();

        Ok(ports)
    }
}

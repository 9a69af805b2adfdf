//! Gesture-driven loop transport control
//!
//! This crate provides:
//! - MIDI device connection and input handling via midir
//! - Tap/hold gesture decoding per slot button
//! - The per-slot transport state machine (record, play, stop, clear)
//! - Coalesced encoder crop adjustments
//! - Monitor passthrough arbitration
//! - LED feedback output
//! - OSC command emission via rosc
//!
//! # Architecture
//!
//! ```text
//! MIDI Device → midir callback → flume channel → runtime loop → Controller
//!                                                                  │
//!                                   OSC (engine) ◄── CommandEmitter┤
//!                                   MIDI (LEDs)  ◄── Indicator ────┘
//! ```
//!
//! The midir callback only parses and forwards. All state lives in the
//! [`Controller`], which is driven from a single thread together with its
//! timer [`Scheduler`].

pub mod command;
pub mod config;
pub mod controller;
pub mod crop;
pub mod feedback;
pub mod gesture;
pub mod midi;
pub mod monitor;
pub mod osc;
pub mod scheduler;
pub mod slot;
pub mod types;

pub use command::{Command, CommandArg, CommandEmitter, SlotParam};
pub use config::{
    builtin_profiles, default_config_path, load_config, save_config, try_load_config,
    ConfigError, DeviceProfile, LedConfig, MonitorControls, OscConfig, SlooperConfig,
    SlotControls, TimingConfig,
};
pub use controller::Controller;
pub use feedback::{FlashSequence, Indicator};
pub use gesture::{Gesture, GestureDecoder};
pub use midi::{
    MidiConnection, MidiConnectionError, MidiInputEvent, MidiInputHandler, MidiOutputHandler,
};
pub use monitor::MonitorArbiter;
pub use osc::{OscEmitter, OscError};
pub use scheduler::{Clock, ManualClock, MonotonicClock, Scheduler, Timer, TimerHandle};
pub use slot::{Slot, SlotState, Transition};
pub use types::{ControlAddress, ControlEvent, ControlValue};

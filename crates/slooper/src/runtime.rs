//! Single-threaded runtime loop
//!
//! ```text
//! midir thread ──try_send──► flume channel ──recv_timeout──► Controller
//!                                                  ▲              │
//!                                                  └─ next timer ─┘
//! ```
//!
//! The loop blocks until either an input event arrives or the earliest
//! timer is due. Timers that came due while blocked fire before the event
//! is handled, then the event runs to completion. Nothing else touches
//! controller state.

use anyhow::{Context, Result};
use flume::RecvTimeoutError;
use slooper_midi::{
    Clock, CommandEmitter, ControlEvent, Controller, DeviceProfile, Indicator, MidiConnection,
    MidiInputEvent, MidiInputHandler, MidiOutputHandler, MonotonicClock, OscEmitter,
    SlooperConfig,
};
use std::time::Duration;

/// Capacity of the MIDI event channel
const EVENT_QUEUE: usize = 256;

/// Wake-up interval when no timer is pending
const IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Drive the controller for `profile` until the process is interrupted
///
/// The midir connection owns the event sender, so the channel stays open
/// for as long as the input handler lives.
pub fn run(config: &SlooperConfig, profile: &DeviceProfile) -> Result<()> {
    let emitter = OscEmitter::connect(&config.osc).context("Failed to set up OSC output")?;

    let indicator = MidiConnection::connect_output_for(profile)
        .map(|connection| MidiOutputHandler::new(connection, config.led));
    if indicator.is_none() {
        log::warn!("MIDI: No output port for '{}', LED feedback disabled", profile.name);
    }

    let (event_tx, event_rx) = flume::bounded::<MidiInputEvent>(EVENT_QUEUE);
    let _input = MidiInputHandler::connect(profile, event_tx)
        .with_context(|| format!("Failed to connect to '{}'", profile.name))?;

    let mut controller = Controller::new(
        profile,
        config.timing,
        emitter,
        indicator,
        MonotonicClock::new(),
    );
    controller.start();

    log::info!("slooper: Running with profile '{}' (Ctrl-C to stop)", profile.name);

    loop {
        let received = event_rx.recv_timeout(wait_time(&controller));
        if !step(&mut controller, received) {
            break;
        }
    }

    Ok(())
}

/// How long to block before the next timer is due
fn wait_time<E: CommandEmitter, I: Indicator, C: Clock>(
    controller: &Controller<E, I, C>,
) -> Duration {
    controller
        .next_deadline()
        .map(|deadline| Duration::from_millis(deadline.saturating_sub(controller.now_ms())))
        .unwrap_or(IDLE_TIMEOUT)
}

/// One loop pass: timers due by now fire before the event is applied
///
/// Returns `false` once the event channel is gone.
fn step<E: CommandEmitter, I: Indicator, C: Clock>(
    controller: &mut Controller<E, I, C>,
    received: Result<MidiInputEvent, RecvTimeoutError>,
) -> bool {
    controller.fire_due();
    match received {
        Ok(event) => controller.handle_event(&ControlEvent::from(&event)),
        Err(RecvTimeoutError::Timeout) => {}
        Err(RecvTimeoutError::Disconnected) => {
            log::info!("slooper: Input channel closed, shutting down");
            return false;
        }
    }
    controller.fire_due();
    true
}

/// Print every raw event from the first port matching `port_match`
pub fn learn(port_match: &str) -> Result<()> {
    let (event_tx, event_rx) = flume::bounded::<MidiInputEvent>(EVENT_QUEUE);
    let _input = MidiInputHandler::connect_matching(port_match, event_tx)
        .with_context(|| format!("Failed to open MIDI input matching '{}'", port_match))?;

    println!("Listening for MIDI events (Ctrl-C to stop)...");
    for event in event_rx.iter() {
        println!("{}", describe_event(&event));
    }
    Ok(())
}

/// Human-readable line for learn mode, in profile terms
fn describe_event(event: &MidiInputEvent) -> String {
    match *event {
        MidiInputEvent::NoteOn {
            channel,
            note,
            velocity,
        } => format!("note on   note={:<3} ch={:<2} velocity={}", note, channel, velocity),
        MidiInputEvent::NoteOff {
            channel,
            note,
            velocity,
        } => format!("note off  note={:<3} ch={:<2} velocity={}", note, channel, velocity),
        MidiInputEvent::ControlChange { channel, cc, value } => {
            format!("cc        cc={:<5} ch={:<2} value={}", cc, channel, value)
        }
    }
}

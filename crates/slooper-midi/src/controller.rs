//! Controller: routes control events to slots and monitors
//!
//! # Architecture
//!
//! ```text
//! ControlEvent ─► route by address ─┬─► GestureDecoder ─► Slot::tap / Slot::hold ─┐
//!                                   ├─► CropCoalescer ──► (flush timer) ──────────┤
//!                                   └─► MonitorArbiter ───────────────────────────┤
//!                                                                                 ▼
//!                                                       CommandEmitter + Indicator
//! ```
//!
//! Everything runs on one thread. Each event or fired timer is handled to
//! completion before the next; the [`Scheduler`] is the only source of
//! deferred work.

use crate::command::{Command, CommandEmitter};
use crate::config::{DeviceProfile, TimingConfig};
use crate::feedback::{FlashSequence, Indicator};
use crate::gesture::Gesture;
use crate::monitor::MonitorArbiter;
use crate::scheduler::{Clock, ManualClock, MonotonicClock, Scheduler, Timer, TimerHandle};
use crate::slot::{Slot, SlotState, Transition};
use crate::types::{ControlAddress, ControlEvent, ControlValue};
use std::collections::HashMap;

/// What a mapped control drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    SlotButton(usize),
    Encoder(usize),
    EncoderPress(usize),
    Monitor(usize),
}

/// Composition root owning all slot and monitor state
pub struct Controller<E: CommandEmitter, I: Indicator, C: Clock = MonotonicClock> {
    timing: TimingConfig,
    slots: Vec<Slot>,
    /// LED address of each slot (its transport button)
    slot_leds: Vec<ControlAddress>,
    monitor_buttons: Vec<ControlAddress>,
    routes: HashMap<ControlAddress, Route>,
    monitors: MonitorArbiter,
    scheduler: Scheduler<C>,
    emitter: E,
    indicator: I,
}

impl<E: CommandEmitter, I: Indicator, C: Clock> Controller<E, I, C> {
    /// Build a controller for a (validated) device profile
    pub fn new(
        profile: &DeviceProfile,
        timing: TimingConfig,
        emitter: E,
        indicator: I,
        clock: C,
    ) -> Self {
        let mut routes = HashMap::new();
        let mut slots = Vec::with_capacity(profile.slots.len());
        let mut slot_leds = Vec::with_capacity(profile.slots.len());

        for (index, controls) in profile.slots.iter().enumerate() {
            slots.push(Slot::new((index + 1) as u8));
            slot_leds.push(controls.button);
            routes.insert(controls.button, Route::SlotButton(index));
            if let Some(encoder) = controls.encoder {
                routes.insert(encoder, Route::Encoder(index));
            }
            if let Some(press) = controls.encoder_press {
                routes.insert(press, Route::EncoderPress(index));
            }
        }

        let monitor_buttons: Vec<ControlAddress> =
            profile.monitors.iter().map(|m| m.button).collect();
        for (index, button) in monitor_buttons.iter().enumerate() {
            routes.insert(*button, Route::Monitor(index));
        }

        log::info!(
            "Controller: profile '{}' with {} slot(s), {} monitor(s)",
            profile.name,
            slots.len(),
            monitor_buttons.len()
        );

        Self {
            timing,
            slots,
            slot_leds,
            monitors: MonitorArbiter::new(monitor_buttons.len()),
            monitor_buttons,
            routes,
            scheduler: Scheduler::new(clock),
            emitter,
            indicator,
        }
    }

    /// Put the hardware into a known state: LEDs off, monitor level sent
    pub fn start(&mut self) {
        for led in self.slot_leds.iter().chain(self.monitor_buttons.iter()) {
            self.indicator.set(led, false);
        }
        self.update_monitor();
    }

    /// Process one input event to completion
    ///
    /// Timers already due fire first, so an event delivered late never
    /// overtakes a deadline that passed before it. Unmapped controls and
    /// meaningless values are ignored.
    pub fn handle_event(&mut self, event: &ControlEvent) {
        self.fire_due();

        let Some(route) = self.routes.get(&event.address).copied() else {
            log::trace!("Controller: ignoring unmapped {}", event.address);
            return;
        };

        match (route, event.value) {
            (Route::SlotButton(slot), value) => match button_state(value) {
                Some(true) => self.slot_press(slot),
                Some(false) => self.slot_release(slot),
                None => {}
            },
            (Route::Encoder(slot), ControlValue::Continuous(value)) => {
                self.encoder_turn(slot, value)
            }
            (Route::EncoderPress(slot), value) if is_button_down(value) => {
                self.encoder_press(slot)
            }
            (Route::Monitor(index), value) if is_button_down(value) => self.monitor_press(index),
            (route, value) => {
                log::trace!("Controller: {:?} ignores {:?}", route, value);
            }
        }
    }

    /// Fire every timer whose deadline has passed
    pub fn fire_due(&mut self) {
        while let Some((handle, timer)) = self.scheduler.pop_due() {
            self.fire(handle, timer);
        }
    }

    /// Deadline of the next pending timer (clock ms)
    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_deadline()
    }

    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn monitors(&self) -> &MonitorArbiter {
        &self.monitors
    }

    /// Current derived monitor level
    pub fn monitor_active(&self) -> bool {
        self.monitors.active(self.any_playing())
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    pub fn emitter_mut(&mut self) -> &mut E {
        &mut self.emitter
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    fn any_playing(&self) -> bool {
        self.slots.iter().any(|s| s.state() == SlotState::Playing)
    }

    fn emit(&mut self, command: &Command) {
        self.emitter.emit(command);
    }

    fn slot_press(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        // Resuming from Stopped fires on press; no release latency
        let tap_on_press = slot.state() == SlotState::Stopped;
        let gesture = slot.gesture.press(
            index,
            tap_on_press,
            self.timing.hold_threshold_ms,
            &mut self.scheduler,
        );
        if let Some(gesture) = gesture {
            self.apply_gesture(index, gesture);
        }
    }

    fn slot_release(&mut self, index: usize) {
        let gesture = self.slots[index].gesture.release(&mut self.scheduler);
        if let Some(gesture) = gesture {
            self.apply_gesture(index, gesture);
        }
    }

    fn apply_gesture(&mut self, index: usize, gesture: Gesture) {
        match gesture {
            Gesture::Tap => {
                let now = self.scheduler.now_ms();
                let transition = self.slots[index].tap(now);
                self.cancel_flash(index);
                let led = transition.to.led_on();
                self.indicator.set(&self.slot_leds[index], led);
                self.finish_transition(transition);
            }
            Gesture::Hold => {
                let transition = self.slots[index].hold(&mut self.scheduler);
                for command in &transition.commands {
                    self.emitter.emit(command);
                }
                self.start_flash(index);
                self.update_monitor();
            }
        }
    }

    fn finish_transition(&mut self, transition: Transition) {
        for command in &transition.commands {
            self.emitter.emit(command);
        }
        if transition.crosses_playing() {
            self.update_monitor();
        }
    }

    fn encoder_turn(&mut self, index: usize, value: u8) {
        let slot = &mut self.slots[index];
        if slot.state() != SlotState::Playing {
            log::trace!("[Slot {}] Encoder ignored in {:?}", slot.id(), slot.state());
            return;
        }
        slot.crop.tick(
            index,
            value,
            self.timing.crop_step_ms,
            self.timing.crop_throttle_ms,
            &mut self.scheduler,
        );
    }

    fn encoder_press(&mut self, index: usize) {
        if let Some(command) = self.slots[index].reset_crop() {
            self.emit(&command);
        }
    }

    fn monitor_press(&mut self, index: usize) {
        let Some(enabled) = self.monitors.toggle(index) else {
            return;
        };
        log::info!(
            "[Monitor {}] {}",
            index + 1,
            if enabled { "enabled" } else { "disabled" }
        );
        self.indicator.set(&self.monitor_buttons[index], enabled);
        self.update_monitor();
    }

    /// Re-derive the monitor level and send it (level-set, may repeat)
    fn update_monitor(&mut self) {
        let active = self.monitor_active();
        log::debug!("Monitor: {}", if active { "on" } else { "off" });
        self.emit(&Command::Monitor(active));
    }

    fn start_flash(&mut self, index: usize) {
        self.cancel_flash(index);
        let mut flash = FlashSequence::new(self.timing.flash_count);
        self.flash_step(index, &mut flash);
        if flash.has_more() {
            let handle = self
                .scheduler
                .schedule(self.timing.flash_interval_ms, Timer::Flash { slot: index });
            self.slots[index].flash = Some((handle, flash));
        }
    }

    fn flash_step(&mut self, index: usize, flash: &mut FlashSequence) {
        let led = flash.next_state().unwrap_or(false);
        self.indicator.set(&self.slot_leds[index], led);
    }

    fn cancel_flash(&mut self, index: usize) {
        if let Some((handle, _)) = self.slots[index].flash.take() {
            self.scheduler.cancel(handle);
        }
    }

    fn fire(&mut self, handle: TimerHandle, timer: Timer) {
        match timer {
            Timer::Hold { slot } => {
                let gesture = self
                    .slots
                    .get_mut(slot)
                    .and_then(|s| s.gesture.hold_elapsed(handle));
                if let Some(gesture) = gesture {
                    self.apply_gesture(slot, gesture);
                }
            }
            Timer::CropFlush { slot } => {
                let command = self.slots.get_mut(slot).and_then(|s| s.flush_crop(handle));
                if let Some(command) = command {
                    self.emit(&command);
                }
            }
            Timer::Flash { slot } => {
                let Some((expected, mut flash)) =
                    self.slots.get_mut(slot).and_then(|s| s.flash.take())
                else {
                    return;
                };
                if expected != handle {
                    self.slots[slot].flash = Some((expected, flash));
                    return;
                }
                self.flash_step(slot, &mut flash);
                if flash.has_more() {
                    let next = self
                        .scheduler
                        .schedule(self.timing.flash_interval_ms, Timer::Flash { slot });
                    self.slots[slot].flash = Some((next, flash));
                }
            }
        }
    }
}

impl<E: CommandEmitter, I: Indicator> Controller<E, I, ManualClock> {
    /// Move virtual time forward, firing timers at their own deadlines
    pub fn advance(&mut self, ms: u64) {
        let target = self.scheduler.now_ms() + ms;
        while let Some(deadline) = self.scheduler.next_deadline().filter(|d| *d <= target) {
            let now = self.scheduler.now_ms();
            self.scheduler.clock().set(deadline.max(now));
            self.fire_due();
        }
        self.scheduler.clock().set(target);
    }
}

/// Button-down for controls that may be notes or CCs
fn is_button_down(value: ControlValue) -> bool {
    button_state(value) == Some(true)
}

/// Down/up for a button; CC buttons send non-zero while held and 0 on release
fn button_state(value: ControlValue) -> Option<bool> {
    match value {
        ControlValue::Continuous(v) => Some(v > 0),
        other if other.is_press() => Some(true),
        other if other.is_release() => Some(false),
        _ => None,
    }
}

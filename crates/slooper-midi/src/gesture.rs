//! Tap/hold disambiguation for a single button
//!
//! ```text
//! press ──► hold timer started ──┬── release before threshold ──► Tap
//!                                └── threshold elapsed ─────────► Hold
//!                                    (release later does nothing)
//! ```
//!
//! A press may also fire Tap immediately (used to resume a stopped slot
//! without waiting for the release); the hold timer still runs in that case.

use crate::scheduler::{Clock, Scheduler, Timer, TimerHandle};

/// Semantic action decoded from a press/release pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Tap,
    Hold,
}

/// Per-button gesture state
#[derive(Debug, Default)]
pub struct GestureDecoder {
    /// Outstanding hold timer, if any
    hold_timer: Option<TimerHandle>,
    /// Set once this press has produced its action
    action_fired: bool,
    /// Between a press and its release
    pressed: bool,
}

impl GestureDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a button press for `slot`
    ///
    /// Returns `Some(Gesture::Tap)` when `tap_on_press` asks for the
    /// low-latency path.
    pub fn press<C: Clock>(
        &mut self,
        slot: usize,
        tap_on_press: bool,
        hold_threshold_ms: u64,
        scheduler: &mut Scheduler<C>,
    ) -> Option<Gesture> {
        // Stale timer from a press whose release never arrived
        if let Some(stale) = self.hold_timer.take() {
            scheduler.cancel(stale);
        }
        self.pressed = true;
        self.action_fired = false;
        self.hold_timer = Some(scheduler.schedule(hold_threshold_ms, Timer::Hold { slot }));

        if tap_on_press {
            self.action_fired = true;
            Some(Gesture::Tap)
        } else {
            None
        }
    }

    /// Handle a button release
    ///
    /// Releases without a matching press are ignored.
    pub fn release<C: Clock>(&mut self, scheduler: &mut Scheduler<C>) -> Option<Gesture> {
        if !self.pressed {
            return None;
        }
        self.pressed = false;

        if let Some(timer) = self.hold_timer.take() {
            scheduler.cancel(timer);
        }

        let gesture = (!self.action_fired).then_some(Gesture::Tap);
        self.action_fired = false;
        gesture
    }

    /// Handle the hold timer firing
    ///
    /// Returns `Some(Gesture::Hold)` only if `handle` is the timer this
    /// decoder is still waiting on.
    pub fn hold_elapsed(&mut self, handle: TimerHandle) -> Option<Gesture> {
        if self.hold_timer != Some(handle) {
            return None;
        }
        self.hold_timer = None;
        self.action_fired = true;
        Some(Gesture::Hold)
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn hold_pending(&self) -> bool {
        self.hold_timer.is_some()
    }
}

//! Loop slot transport state machine
//!
//! ```text
//!            tap                tap               tap
//! Empty ──────────► Recording ──────► Playing ◄──────► Stopped
//!   ▲   rec=1              rec=0,play=1      play=0 / play=1
//!   │
//!   └──────────── hold (any state): play=0, clear=1
//! ```
//!
//! Every state has a defined response to both gestures, so there is no
//! error state.

use crate::command::{Command, SlotParam};
use crate::crop::CropCoalescer;
use crate::feedback::FlashSequence;
use crate::gesture::GestureDecoder;
use crate::scheduler::{Clock, Scheduler, TimerHandle};

/// Transport state of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    #[default]
    Empty,
    Recording,
    Playing,
    Stopped,
}

impl SlotState {
    /// Whether the slot's LED should be lit
    pub fn led_on(&self) -> bool {
        matches!(self, Self::Recording | Self::Playing)
    }
}

/// Result of applying a gesture to a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: SlotState,
    pub to: SlotState,
    /// Commands to send, in order
    pub commands: Vec<Command>,
}

impl Transition {
    /// Whether the slot entered or left Playing
    pub fn crosses_playing(&self) -> bool {
        (self.from == SlotState::Playing) != (self.to == SlotState::Playing)
    }
}

/// One loop track and everything timed that belongs to it
#[derive(Debug)]
pub struct Slot {
    /// 1-based id used in the `/slot{N}` address
    id: u8,
    state: SlotState,
    /// Clock time the current take started (ms)
    record_start: u64,
    /// Length of the take as recorded (ms)
    original_length: u64,
    pub(crate) gesture: GestureDecoder,
    pub(crate) crop: CropCoalescer,
    /// Clear acknowledgment in progress
    pub(crate) flash: Option<(TimerHandle, FlashSequence)>,
}

impl Slot {
    pub fn new(id: u8) -> Self {
        Self {
            id,
            state: SlotState::Empty,
            record_start: 0,
            original_length: 0,
            gesture: GestureDecoder::new(),
            crop: CropCoalescer::new(),
            flash: None,
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn original_length(&self) -> u64 {
        self.original_length
    }

    pub fn crop_offset(&self) -> i64 {
        self.crop.crop_offset()
    }

    pub fn pending_delta(&self) -> i64 {
        self.crop.pending_delta()
    }

    /// Recorded length plus crop adjustment (may be zero or negative; the
    /// engine clamps)
    pub fn effective_length(&self) -> i64 {
        self.original_length as i64 + self.crop.crop_offset()
    }

    fn command(&self, param: SlotParam, value: i64) -> Command {
        Command::slot(self.id, param, value)
    }

    /// Advance the transport cycle
    pub fn tap(&mut self, now_ms: u64) -> Transition {
        let from = self.state;
        let (to, commands) = match from {
            SlotState::Empty => {
                self.record_start = now_ms;
                self.crop.reset_offset();
                log::info!("[Slot {}] Rec Start", self.id);
                (SlotState::Recording, vec![self.command(SlotParam::Rec, 1)])
            }
            SlotState::Recording => {
                self.original_length = now_ms.saturating_sub(self.record_start);
                log::info!(
                    "[Slot {}] Rec Stop -> Play ({}ms)",
                    self.id,
                    self.original_length
                );
                (
                    SlotState::Playing,
                    vec![
                        self.command(SlotParam::Rec, 0),
                        self.command(SlotParam::Play, 1),
                    ],
                )
            }
            SlotState::Playing => {
                log::info!("[Slot {}] Stopped", self.id);
                (SlotState::Stopped, vec![self.command(SlotParam::Play, 0)])
            }
            SlotState::Stopped => {
                log::info!("[Slot {}] Resuming", self.id);
                (SlotState::Playing, vec![self.command(SlotParam::Play, 1)])
            }
        };
        self.state = to;
        Transition { from, to, commands }
    }

    /// Clear the slot from any state
    ///
    /// Cancels an open crop window; the caller starts the acknowledgment flash.
    pub fn hold<C: Clock>(&mut self, scheduler: &mut Scheduler<C>) -> Transition {
        let from = self.state;
        log::info!("[Slot {}] CLEARED (was {:?})", self.id, from);

        self.state = SlotState::Empty;
        self.original_length = 0;
        self.crop.clear(scheduler);

        Transition {
            from,
            to: SlotState::Empty,
            commands: vec![
                self.command(SlotParam::Play, 0),
                self.command(SlotParam::Clear, 1),
            ],
        }
    }

    /// Encoder push: drop the crop adjustment while playing
    pub fn reset_crop(&mut self) -> Option<Command> {
        if self.state != SlotState::Playing {
            return None;
        }
        self.crop.reset_offset();
        log::info!(
            "[Slot {}] Crop reset ({}ms)",
            self.id,
            self.original_length
        );
        Some(self.command(SlotParam::Reset, 1))
    }

    /// Flush a coalesced crop window into a command
    pub fn flush_crop(&mut self, handle: TimerHandle) -> Option<Command> {
        let delta = self.crop.flush(handle)?;
        log::info!(
            "[Slot {}] Crop: {:+}ms (offset {:+}ms)",
            self.id,
            delta,
            self.crop.crop_offset()
        );
        Some(self.command(SlotParam::Crop, delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualClock;

    fn play(slot: u8, value: i64) -> Command {
        Command::slot(slot, SlotParam::Play, value)
    }

    #[test]
    fn test_tap_cycle() {
        let mut slot = Slot::new(1);

        let t = slot.tap(100);
        assert_eq!((t.from, t.to), (SlotState::Empty, SlotState::Recording));
        assert_eq!(t.commands, vec![Command::slot(1, SlotParam::Rec, 1)]);
        assert!(!t.crosses_playing());

        let t = slot.tap(2100);
        assert_eq!(t.to, SlotState::Playing);
        assert_eq!(
            t.commands,
            vec![Command::slot(1, SlotParam::Rec, 0), play(1, 1)]
        );
        assert!(t.crosses_playing());
        assert_eq!(slot.original_length(), 2000);

        let t = slot.tap(3000);
        assert_eq!(t.to, SlotState::Stopped);
        assert_eq!(t.commands, vec![play(1, 0)]);

        let t = slot.tap(4000);
        assert_eq!(t.to, SlotState::Playing);
        assert_eq!(t.commands, vec![play(1, 1)]);
        // Resuming keeps the take
        assert_eq!(slot.original_length(), 2000);
    }

    #[test]
    fn test_taps_have_period_two_after_recording() {
        let mut slot = Slot::new(1);
        let states: Vec<SlotState> = (0..7).map(|i| slot.tap(i * 10).to).collect();
        assert_eq!(
            states,
            vec![
                SlotState::Recording,
                SlotState::Playing,
                SlotState::Stopped,
                SlotState::Playing,
                SlotState::Stopped,
                SlotState::Playing,
                SlotState::Stopped,
            ]
        );
    }

    #[test]
    fn test_hold_clears_from_every_state() {
        for taps in 0..4 {
            let mut scheduler = Scheduler::new(ManualClock::new());
            let mut slot = Slot::new(2);
            for i in 0..taps {
                slot.tap(i * 500);
            }
            let t = slot.hold(&mut scheduler);
            assert_eq!(t.to, SlotState::Empty);
            assert_eq!(
                t.commands,
                vec![play(2, 0), Command::slot(2, SlotParam::Clear, 1)]
            );
            assert_eq!(slot.original_length(), 0);
            assert_eq!(slot.crop_offset(), 0);
            assert_eq!(slot.pending_delta(), 0);
        }
    }

    #[test]
    fn test_hold_cancels_crop_window() {
        let mut scheduler = Scheduler::new(ManualClock::new());
        let mut slot = Slot::new(1);
        slot.tap(0);
        slot.tap(1000);
        slot.crop.tick(0, 100, 50, 50, &mut scheduler);
        assert_eq!(scheduler.pending_count(), 1);

        slot.hold(&mut scheduler);
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(slot.pending_delta(), 0);
    }

    #[test]
    fn test_reset_crop_only_while_playing() {
        let clock = ManualClock::new();
        let mut scheduler = Scheduler::new(clock.clone());
        let mut slot = Slot::new(1);
        assert_eq!(slot.reset_crop(), None);

        slot.tap(0);
        slot.tap(1000);
        slot.crop.tick(0, 100, 50, 50, &mut scheduler);
        clock.advance(50);
        let (handle, _) = scheduler.pop_due().unwrap();
        assert_eq!(
            slot.flush_crop(handle),
            Some(Command::slot(1, SlotParam::Crop, 50))
        );
        assert_eq!(slot.effective_length(), 1050);

        assert_eq!(
            slot.reset_crop(),
            Some(Command::slot(1, SlotParam::Reset, 1))
        );
        assert_eq!(slot.effective_length(), 1000);

        slot.crop.tick(0, 100, 50, 50, &mut scheduler);
        slot.tap(2000); // stop
        assert_eq!(slot.reset_crop(), None);
        assert_eq!(slot.original_length(), 1000);
    }

    #[test]
    fn test_rerecord_zeroes_crop_offset() {
        let clock = ManualClock::new();
        let mut scheduler = Scheduler::new(clock.clone());
        let mut slot = Slot::new(1);
        slot.tap(0);
        slot.tap(1000);
        slot.crop.tick(0, 10, 50, 50, &mut scheduler);
        clock.advance(50);
        let (handle, _) = scheduler.pop_due().unwrap();
        slot.flush_crop(handle);
        assert_eq!(slot.crop_offset(), -50);

        slot.hold(&mut scheduler);
        slot.tap(5000);
        assert_eq!(slot.state(), SlotState::Recording);
        assert_eq!(slot.crop_offset(), 0);
    }
}

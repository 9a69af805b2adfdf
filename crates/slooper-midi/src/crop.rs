//! Encoder-driven loop length adjustment
//!
//! Relative encoders send one message per detent. Ticks arriving within a
//! throttle window are summed and sent as a single `crop` command carrying
//! the window's net delta; the engine applies each delta incrementally.
//!
//! Encoder values are centered at 64: above is clockwise (extend), below is
//! counter-clockwise (shorten), 64 itself carries no movement.

use crate::scheduler::{Clock, Scheduler, Timer, TimerHandle};

/// Center value of a relative encoder
pub const ENCODER_CENTER: u8 = 64;

/// Signed length change for one encoder message
pub fn encoder_delta(value: u8, step_ms: i32) -> i64 {
    match value.cmp(&ENCODER_CENTER) {
        std::cmp::Ordering::Greater => i64::from(step_ms),
        std::cmp::Ordering::Less => -i64::from(step_ms),
        std::cmp::Ordering::Equal => 0,
    }
}

/// Per-slot crop accumulator
#[derive(Debug, Default)]
pub struct CropCoalescer {
    /// Adjustment applied on top of the recorded length (ms)
    crop_offset: i64,
    /// Net delta collected in the open window (ms)
    pending_delta: i64,
    /// Flush timer of the open window
    flush_timer: Option<TimerHandle>,
}

impl CropCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one encoder message
    ///
    /// Opens a coalescing window if none is open. Returns `false` for the
    /// center value, which is ignored entirely.
    pub fn tick<C: Clock>(
        &mut self,
        slot: usize,
        value: u8,
        step_ms: i32,
        throttle_ms: u64,
        scheduler: &mut Scheduler<C>,
    ) -> bool {
        let delta = encoder_delta(value, step_ms);
        if delta == 0 {
            return false;
        }
        self.pending_delta += delta;
        if self.flush_timer.is_none() {
            self.flush_timer = Some(scheduler.schedule(throttle_ms, Timer::CropFlush { slot }));
        }
        true
    }

    /// Close the window opened by `handle`
    ///
    /// Returns the net delta to send, or `None` if the ticks cancelled out
    /// or `handle` is not the open window.
    pub fn flush(&mut self, handle: TimerHandle) -> Option<i64> {
        if self.flush_timer != Some(handle) {
            return None;
        }
        self.flush_timer = None;

        let delta = std::mem::take(&mut self.pending_delta);
        if delta == 0 {
            return None;
        }
        self.crop_offset += delta;
        Some(delta)
    }

    /// Drop the accumulated offset; the recorded length applies again
    ///
    /// An open window is left alone and still flushes on top of the reset.
    pub fn reset_offset(&mut self) {
        self.crop_offset = 0;
    }

    /// Forget everything, cancelling an open window
    pub fn clear<C: Clock>(&mut self, scheduler: &mut Scheduler<C>) {
        if let Some(timer) = self.flush_timer.take() {
            scheduler.cancel(timer);
        }
        self.crop_offset = 0;
        self.pending_delta = 0;
    }

    pub fn crop_offset(&self) -> i64 {
        self.crop_offset
    }

    pub fn pending_delta(&self) -> i64 {
        self.pending_delta
    }

    pub fn window_open(&self) -> bool {
        self.flush_timer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualClock;

    const STEP: i32 = 50;
    const THROTTLE: u64 = 50;

    fn flush_due(scheduler: &mut Scheduler<ManualClock>, crop: &mut CropCoalescer) -> Vec<i64> {
        let mut sent = Vec::new();
        while let Some((handle, timer)) = scheduler.pop_due() {
            assert_eq!(timer, Timer::CropFlush { slot: 0 });
            sent.extend(crop.flush(handle));
        }
        sent
    }

    #[test]
    fn test_encoder_delta() {
        assert_eq!(encoder_delta(65, STEP), 50);
        assert_eq!(encoder_delta(127, STEP), 50);
        assert_eq!(encoder_delta(63, STEP), -50);
        assert_eq!(encoder_delta(0, STEP), -50);
        assert_eq!(encoder_delta(64, STEP), 0);
    }

    #[test]
    fn test_ticks_coalesce_into_one_flush() {
        let clock = ManualClock::new();
        let mut scheduler = Scheduler::new(clock.clone());
        let mut crop = CropCoalescer::new();

        for value in [65, 65, 63] {
            assert!(crop.tick(0, value, STEP, THROTTLE, &mut scheduler));
            clock.advance(10);
        }
        assert_eq!(scheduler.pending_count(), 1);
        assert_eq!(crop.pending_delta(), 50);

        clock.advance(THROTTLE);
        assert_eq!(flush_due(&mut scheduler, &mut crop), vec![50]);
        assert_eq!(crop.crop_offset(), 50);
        assert_eq!(crop.pending_delta(), 0);
        assert!(!crop.window_open());
    }

    #[test]
    fn test_net_zero_window_sends_nothing() {
        let clock = ManualClock::new();
        let mut scheduler = Scheduler::new(clock.clone());
        let mut crop = CropCoalescer::new();

        crop.tick(0, 70, STEP, THROTTLE, &mut scheduler);
        crop.tick(0, 60, STEP, THROTTLE, &mut scheduler);
        clock.advance(THROTTLE);
        assert!(flush_due(&mut scheduler, &mut crop).is_empty());
        assert_eq!(crop.crop_offset(), 0);
        assert!(!crop.window_open());
    }

    #[test]
    fn test_center_value_does_not_open_window() {
        let mut scheduler = Scheduler::new(ManualClock::new());
        let mut crop = CropCoalescer::new();
        assert!(!crop.tick(0, 64, STEP, THROTTLE, &mut scheduler));
        assert_eq!(scheduler.pending_count(), 0);
        assert!(!crop.window_open());
    }

    #[test]
    fn test_offset_accumulates_across_windows_and_resets() {
        let clock = ManualClock::new();
        let mut scheduler = Scheduler::new(clock.clone());
        let mut crop = CropCoalescer::new();

        crop.tick(0, 65, STEP, THROTTLE, &mut scheduler);
        clock.advance(THROTTLE);
        flush_due(&mut scheduler, &mut crop);
        crop.tick(0, 10, STEP, THROTTLE, &mut scheduler);
        crop.tick(0, 10, STEP, THROTTLE, &mut scheduler);
        clock.advance(THROTTLE);
        assert_eq!(flush_due(&mut scheduler, &mut crop), vec![-100]);
        assert_eq!(crop.crop_offset(), -50);

        crop.reset_offset();
        assert_eq!(crop.crop_offset(), 0);
    }

    #[test]
    fn test_clear_cancels_open_window() {
        let clock = ManualClock::new();
        let mut scheduler = Scheduler::new(clock.clone());
        let mut crop = CropCoalescer::new();

        crop.tick(0, 65, STEP, THROTTLE, &mut scheduler);
        crop.clear(&mut scheduler);
        assert_eq!(crop.pending_delta(), 0);
        assert_eq!(scheduler.pending_count(), 0);

        clock.advance(THROTTLE);
        assert!(flush_due(&mut scheduler, &mut crop).is_empty());
    }

    #[test]
    fn test_large_window_sum_is_exact() {
        let clock = ManualClock::new();
        let mut scheduler = Scheduler::new(clock.clone());
        let mut crop = CropCoalescer::new();

        for _ in 0..3 {
            crop.tick(0, 127, i32::MAX, THROTTLE, &mut scheduler);
        }
        clock.advance(THROTTLE);
        let expected = 3 * i64::from(i32::MAX);
        assert_eq!(flush_due(&mut scheduler, &mut crop), vec![expected]);
        assert_eq!(crop.crop_offset(), expected);
    }
}

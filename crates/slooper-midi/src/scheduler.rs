//! Delayed, cancellable timers against a swappable clock
//!
//! Timers carry a [`Timer`] value naming what should happen and which slot
//! it concerns; the owner pops due timers and dispatches them itself. There
//! are no callbacks, so a fired timer always acts on current state.
//!
//! ```text
//! schedule(delay, timer) ──► TimerHandle
//! cancel(handle)             (no-op if already fired or cancelled)
//! pop_due() ──► Some((handle, timer)) while deadline <= now
//! ```

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Instant;

/// Monotonic millisecond clock
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall clock based on `Instant`, zeroed at construction
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Virtual clock that only moves when told to
///
/// Clones share the same time, so a test can keep a handle while the
/// scheduler owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Tap/hold disambiguation window for a slot button elapsed
    Hold { slot: usize },
    /// Crop coalescing window for a slot closed
    CropFlush { slot: usize },
    /// Next step of a slot's clear-acknowledgment flash
    Flash { slot: usize },
}

/// Identifies one scheduled timer; never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Timer queue ordered by deadline, then by scheduling order
pub struct Scheduler<C: Clock> {
    clock: C,
    next_id: u64,
    queue: BTreeMap<(u64, TimerHandle), Timer>,
    deadlines: HashMap<TimerHandle, u64>,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            next_id: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Schedule `timer` to fire `delay_ms` from now
    pub fn schedule(&mut self, delay_ms: u64, timer: Timer) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        let deadline = self.now_ms().saturating_add(delay_ms);
        self.queue.insert((deadline, handle), timer);
        self.deadlines.insert(handle, deadline);
        log::trace!("scheduler: {:?} {:?} due at {}ms", handle, timer, deadline);
        handle
    }

    /// Cancel a pending timer; returns whether it was still pending
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.deadlines.remove(&handle) {
            Some(deadline) => {
                self.queue.remove(&(deadline, handle));
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.deadlines.contains_key(&handle)
    }

    /// Deadline of the earliest pending timer
    pub fn next_deadline(&self) -> Option<u64> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove and return the earliest timer if it is due
    pub fn pop_due(&mut self) -> Option<(TimerHandle, Timer)> {
        let now = self.now_ms();
        let (&(deadline, handle), _) = self.queue.iter().next()?;
        if deadline > now {
            return None;
        }
        let timer = self.queue.remove(&(deadline, handle))?;
        self.deadlines.remove(&handle);
        Some((handle, timer))
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }
}

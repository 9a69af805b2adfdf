//! LED feedback
//!
//! The controller core drives indicators through the [`Indicator`] trait;
//! the MIDI output handler is the production implementation.

use crate::types::ControlAddress;

/// Sink for on/off LED writes
pub trait Indicator {
    /// Light or darken the LED belonging to `control`
    fn set(&mut self, control: &ControlAddress, on: bool);
}

/// Devices without an output port simply get no feedback
impl<I: Indicator> Indicator for Option<I> {
    fn set(&mut self, control: &ControlAddress, on: bool) {
        if let Some(inner) = self {
            inner.set(control, on);
        }
    }
}

/// Blink pattern acknowledging a slot clear
///
/// Yields `count` on/off pairs and always finishes dark.
#[derive(Debug, Clone)]
pub struct FlashSequence {
    step: u32,
    total: u32,
}

impl FlashSequence {
    pub fn new(count: u32) -> Self {
        Self {
            step: 0,
            total: count.saturating_mul(2),
        }
    }

    /// Next LED state, or `None` once the sequence is done
    pub fn next_state(&mut self) -> Option<bool> {
        if self.step >= self.total {
            return None;
        }
        let on = self.step % 2 == 0;
        self.step += 1;
        Some(on)
    }

    /// Whether another step follows the one just emitted
    pub fn has_more(&self) -> bool {
        self.step < self.total
    }
}

/// In-memory indicator that records every write
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingIndicator {
    pub writes: Vec<(ControlAddress, bool)>,
}

#[cfg(test)]
impl RecordingIndicator {
    /// Writes addressed to one control, in order
    pub fn writes_for(&self, control: ControlAddress) -> Vec<bool> {
        self.writes
            .iter()
            .filter(|(addr, _)| *addr == control)
            .map(|(_, on)| *on)
            .collect()
    }
}

#[cfg(test)]
impl Indicator for RecordingIndicator {
    fn set(&mut self, control: &ControlAddress, on: bool) {
        self.writes.push((*control, on));
    }
}

//! Monitor passthrough arbitration
//!
//! Input monitoring is audible only while at least one monitor button is
//! enabled and no slot is playing back, so a playing loop never competes
//! with the live input.

/// Per-button enable flags and the derived global level
#[derive(Debug, Default)]
pub struct MonitorArbiter {
    enabled: Vec<bool>,
}

impl MonitorArbiter {
    pub fn new(monitor_count: usize) -> Self {
        Self {
            enabled: vec![false; monitor_count],
        }
    }

    /// Flip one monitor; returns its new state, or `None` for an unknown index
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let flag = self.enabled.get_mut(index)?;
        *flag = !*flag;
        Some(*flag)
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.enabled.get(index).copied().unwrap_or(false)
    }

    pub fn any_enabled(&self) -> bool {
        self.enabled.iter().any(|&on| on)
    }

    /// Derive the global monitor level
    pub fn active(&self, any_slot_playing: bool) -> bool {
        self.any_enabled() && !any_slot_playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let mut monitors = MonitorArbiter::new(2);
        assert_eq!(monitors.toggle(1), Some(true));
        assert!(monitors.is_enabled(1));
        assert!(!monitors.is_enabled(0));
        assert_eq!(monitors.toggle(1), Some(false));
        assert_eq!(monitors.toggle(2), None);
    }

    #[test]
    fn test_active_truth_table() {
        let mut monitors = MonitorArbiter::new(2);
        assert!(!monitors.active(false));
        assert!(!monitors.active(true));

        monitors.toggle(0);
        assert!(monitors.active(false));
        assert!(!monitors.active(true));

        monitors.toggle(1);
        monitors.toggle(0);
        assert!(monitors.active(false));
    }

    #[test]
    fn test_no_monitors_never_active() {
        let monitors = MonitorArbiter::new(0);
        assert!(!monitors.active(false));
    }
}

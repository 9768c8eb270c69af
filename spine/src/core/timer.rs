//! Pulse-counted timers. Never wall-clock: elapsed time is measured in the
//! same discrete pulses the runtime schedules with.

/// A restartable countdown measured in pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTimer {
    started_at: Option<u64>,
    duration: u64,
}

impl PulseTimer {
    pub const fn new(duration: u64) -> Self {
        Self {
            started_at: None,
            duration,
        }
    }

    /// Start (or restart) counting from `pulse`.
    pub fn start(&mut self, pulse: u64) {
        self.started_at = Some(pulse);
    }

    pub fn stop(&mut self) {
        self.started_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn elapsed(&self, pulse: u64) -> u64 {
        self.started_at
            .map(|start| pulse.saturating_sub(start))
            .unwrap_or(0)
    }

    /// True once a running timer has counted `duration` pulses.
    pub fn expired(&self, pulse: u64) -> bool {
        self.is_running() && self.elapsed(pulse) >= self.duration
    }
}

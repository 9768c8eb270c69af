//! Transition-table state machine shared by multi-step leaf tasks.
//!
//! A task declares its phases as a small `Copy` enum implementing [`Phase`];
//! the table lives in [`Phase::allowed`] and per-phase timeouts in
//! [`Phase::timeout`]. [`PhaseMachine`] does the bookkeeping: current phase,
//! the pulse it was entered on, and refusing edges the table does not list.

use std::fmt;

use tracing::{debug, warn};

use crate::core::task::TaskSettings;

pub trait Phase: Copy + Eq + fmt::Debug {
    /// Whether `self -> next` is an edge of the transition table.
    fn allowed(self, next: Self) -> bool;

    /// Pulses this phase may last before the task should give up.
    fn timeout(self, _settings: &TaskSettings) -> Option<u64> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseMachine<P> {
    phase: P,
    entered_at: u64,
}

impl<P: Phase> PhaseMachine<P> {
    pub fn new(initial: P) -> Self {
        Self {
            phase: initial,
            entered_at: 0,
        }
    }

    /// Reset to `initial`, entered at `pulse`. Not checked against the table.
    pub fn restart(&mut self, initial: P, pulse: u64) {
        self.phase = initial;
        self.entered_at = pulse;
    }

    pub fn phase(&self) -> P {
        self.phase
    }

    /// Move to `next` if the table allows it. Returns whether it moved.
    pub fn transition(&mut self, next: P, pulse: u64) -> bool {
        if !self.phase.allowed(next) {
            warn!(from = ?self.phase, to = ?next, "refusing transition not in table");
            return false;
        }
        debug!(from = ?self.phase, to = ?next, pulse, "phase transition");
        self.phase = next;
        self.entered_at = pulse;
        true
    }

    /// Pulses spent in the current phase.
    pub fn in_phase_for(&self, pulse: u64) -> u64 {
        pulse.saturating_sub(self.entered_at)
    }

    pub fn timed_out(&self, pulse: u64, settings: &TaskSettings) -> bool {
        self.phase
            .timeout(settings)
            .is_some_and(|limit| self.in_phase_for(pulse) >= limit)
    }
}

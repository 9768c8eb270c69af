//! Stable exit codes for spine CLI commands.

/// Command succeeded or the goal was reached.
pub const OK: i32 = 0;
/// Invalid config, catalogue or scenario, or any other error.
pub const INVALID: i32 = 1;
/// `spine run` stopped because the goal failed.
pub const GOAL_FAILED: i32 = 2;
/// `spine run` used up its pulse budget before the goal concluded.
pub const PULSE_BUDGET_EXHAUSTED: i32 = 3;

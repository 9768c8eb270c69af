//! The unit-of-work contract every behavior implements.
//!
//! A task is activated at most once: `on_start` exactly once, `on_tick` once
//! per pulse while active, `on_stop` exactly once. The runtime owns active
//! tasks; a stopped task is dropped and never reactivated.
//!
//! `on_tick` returns either `None` ("I am acting directly, or waiting") or a
//! freshly built delegate ("I want a child doing this now"). Delegates are
//! compared against the already-active child with [`Task::is_equal`]; when
//! equal, the fresh delegate is discarded and the active child continues with
//! its internal state intact.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::core::catalogue::Catalogue;
use crate::core::types::Inventory;
use crate::env::{Environment, SelfStatus};

/// Tunables read by tasks on every pulse. All durations are pulse counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TaskSettings {
    /// Pulses a navigation may run before it fails.
    pub navigate_timeout_pulses: u64,
    /// Pulses of swinging at one block before mining fails.
    pub mine_timeout_pulses: u64,
    /// Pulses to wait for an interaction surface to open or produce a result.
    pub surface_timeout_pulses: u64,
    /// Search radius for source blocks when gathering.
    pub gather_search_radius: u32,
    /// Distance from which a block can be swung at.
    pub reach_distance: u32,
    /// Lookahead depth when checking whether a recipe can be resolved.
    ///
    /// Each nested resolver checks from this full depth again, so it does
    /// not cap how deep a plan nests overall.
    pub max_recipe_depth: u32,
    /// Hunger at or below which eating takes priority.
    pub hunger_threshold: u32,
    /// Hunger at which eating stops.
    pub hunger_satisfied: u32,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            navigate_timeout_pulses: 400,
            mine_timeout_pulses: 100,
            surface_timeout_pulses: 40,
            gather_search_radius: 64,
            reach_distance: 2,
            max_recipe_depth: 8,
            hunger_threshold: 6,
            hunger_satisfied: 18,
        }
    }
}

/// Everything a task may read or actuate during one lifecycle call.
pub struct TaskContext<'a> {
    /// Current pulse number, owned by the runtime.
    pub pulse: u64,
    pub env: &'a mut dyn Environment,
    pub catalogue: &'a Catalogue,
    pub settings: &'a TaskSettings,
}

impl<'a> TaskContext<'a> {
    pub fn new(
        env: &'a mut dyn Environment,
        catalogue: &'a Catalogue,
        settings: &'a TaskSettings,
    ) -> Self {
        Self {
            pulse: 0,
            env,
            catalogue,
            settings,
        }
    }

    pub fn inventory(&self) -> Inventory {
        self.env.inventory()
    }

    pub fn status(&self) -> SelfStatus {
        self.env.status()
    }
}

/// Type-erased access used by structural equality.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub trait Task: AsAny {
    /// Human-readable label for logs and traces.
    fn label(&self) -> String;

    /// Initialize internal state. Called once, before the first tick.
    fn on_start(&mut self, ctx: &mut TaskContext<'_>);

    /// Act directly (`None`) or request a delegate child.
    fn on_tick(&mut self, ctx: &mut TaskContext<'_>) -> Option<Box<dyn Task>>;

    /// Release every external resource the task acquired.
    ///
    /// `preemptor` is the task that displaced this one, or `None` when the
    /// task finished or its parent chose to act directly.
    fn on_stop(&mut self, ctx: &mut TaskContext<'_>, preemptor: Option<&dyn Task>);

    /// Called after a finished child was stopped, before this task is ticked
    /// again in the same pulse.
    fn on_child_finished(&mut self, _ctx: &mut TaskContext<'_>, _child: &dyn Task) {}

    fn is_finished(&self) -> bool;

    /// A failed task must also report [`Task::is_finished`].
    fn is_failed(&self) -> bool {
        false
    }

    /// Structural comparison: "is `other` the same ongoing work as `self`".
    fn is_equal(&self, other: &dyn Task) -> bool;
}

/// Downcast `other` to a concrete task type for structural comparison.
///
/// Always pass a `&dyn Task`, never a `&Box<dyn Task>`.
pub fn downcast<T: Task + 'static>(other: &dyn Task) -> Option<&T> {
    other.as_any().downcast_ref::<T>()
}

/// Finished or failed, which the runtime treats alike.
pub fn is_done(task: &dyn Task) -> bool {
    task.is_finished() || task.is_failed()
}

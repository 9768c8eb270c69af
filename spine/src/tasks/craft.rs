//! Craft a fixed number of batches at the crafting surface.
//!
//! Assumes ingredients are already in inventory; the resolver's craft
//! composite guarantees that before delegating here.

use tracing::{debug, warn};

use crate::core::machine::{Phase, PhaseMachine};
use crate::core::task::{Task, TaskContext, TaskSettings, downcast};
use crate::core::types::ItemId;
use crate::env::{ContainerClick, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CraftPhase {
    Open,
    AwaitOpen,
    Click,
    AwaitResult,
    Done,
}

impl Phase for CraftPhase {
    fn allowed(self, next: Self) -> bool {
        use CraftPhase::{AwaitOpen, AwaitResult, Click, Done, Open};
        matches!(
            (self, next),
            (Open, AwaitOpen)
                | (AwaitOpen, Click)
                | (AwaitOpen, Open)
                | (Click, AwaitResult)
                | (AwaitResult, Done)
        )
    }

    fn timeout(self, settings: &TaskSettings) -> Option<u64> {
        match self {
            CraftPhase::AwaitOpen | CraftPhase::AwaitResult => Some(settings.surface_timeout_pulses),
            _ => None,
        }
    }
}

pub struct CraftTask {
    output: ItemId,
    batches: u32,
    machine: PhaseMachine<CraftPhase>,
    baseline: u32,
    opened: bool,
    failed: bool,
}

impl CraftTask {
    pub fn new(output: ItemId, batches: u32) -> Self {
        Self {
            output,
            batches,
            machine: PhaseMachine::new(CraftPhase::Open),
            baseline: 0,
            opened: false,
            failed: false,
        }
    }

    /// The open request may still be queued, so close whenever one was sent.
    fn close(&mut self, ctx: &mut TaskContext<'_>) {
        if self.opened {
            ctx.env.container_click(ContainerClick::Close);
        }
        self.opened = false;
    }
}

impl Task for CraftTask {
    fn label(&self) -> String {
        format!("craft {} x{}", self.output, self.batches)
    }

    fn on_start(&mut self, ctx: &mut TaskContext<'_>) {
        self.baseline = ctx.inventory().count(&self.output);
        self.machine.restart(CraftPhase::Open, ctx.pulse);
    }

    fn on_tick(&mut self, ctx: &mut TaskContext<'_>) -> Option<Box<dyn Task>> {
        if self.failed || self.machine.phase() == CraftPhase::Done {
            return None;
        }
        if self.machine.timed_out(ctx.pulse, ctx.settings) {
            warn!(output = %self.output, phase = ?self.machine.phase(), "crafting timed out");
            self.failed = true;
            self.close(ctx);
            return None;
        }

        match self.machine.phase() {
            CraftPhase::Open => {
                ctx.env.container_click(ContainerClick::Open {
                    surface: Surface::Crafting,
                });
                self.opened = true;
                self.machine.transition(CraftPhase::AwaitOpen, ctx.pulse);
            }
            CraftPhase::AwaitOpen => {
                if ctx.env.open_surface() == Some(Surface::Crafting) {
                    self.machine.transition(CraftPhase::Click, ctx.pulse);
                }
            }
            CraftPhase::Click => {
                ctx.env.container_click(ContainerClick::Craft {
                    output: self.output.clone(),
                    batches: self.batches,
                });
                self.machine.transition(CraftPhase::AwaitResult, ctx.pulse);
            }
            CraftPhase::AwaitResult => {
                if ctx.inventory().count(&self.output) > self.baseline {
                    debug!(output = %self.output, batches = self.batches, "crafted");
                    self.close(ctx);
                    self.machine.transition(CraftPhase::Done, ctx.pulse);
                }
            }
            CraftPhase::Done => {}
        }
        None
    }

    fn on_stop(&mut self, ctx: &mut TaskContext<'_>, _preemptor: Option<&dyn Task>) {
        self.close(ctx);
    }

    fn is_finished(&self) -> bool {
        self.failed || self.machine.phase() == CraftPhase::Done
    }

    fn is_failed(&self) -> bool {
        self.failed
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        downcast::<Self>(other)
            .is_some_and(|other| other.output == self.output && other.batches == self.batches)
    }
}

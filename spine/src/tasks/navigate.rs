//! Walk until within a radius of a target position.

use tracing::warn;

use crate::core::task::{Task, TaskContext, downcast};
use crate::core::timer::PulseTimer;
use crate::core::types::BlockPos;

pub struct NavigateTask {
    target: BlockPos,
    radius: u32,
    timer: PulseTimer,
    arrived: bool,
    failed: bool,
}

impl NavigateTask {
    pub fn new(target: BlockPos, radius: u32) -> Self {
        Self {
            target,
            radius,
            timer: PulseTimer::new(0),
            arrived: false,
            failed: false,
        }
    }

    pub fn target(&self) -> BlockPos {
        self.target
    }
}

impl Task for NavigateTask {
    fn label(&self) -> String {
        format!("navigate to {} r={}", self.target, self.radius)
    }

    fn on_start(&mut self, ctx: &mut TaskContext<'_>) {
        self.timer = PulseTimer::new(ctx.settings.navigate_timeout_pulses);
        self.timer.start(ctx.pulse);
    }

    fn on_tick(&mut self, ctx: &mut TaskContext<'_>) -> Option<Box<dyn Task>> {
        if self.arrived || self.failed {
            return None;
        }
        let position = ctx.status().position;
        if position.within(&self.target, self.radius) {
            self.arrived = true;
            ctx.env.set_movement_intent(None);
            return None;
        }
        if self.timer.expired(ctx.pulse) {
            warn!(target = %self.target, position = %position, "navigation timed out");
            self.failed = true;
            ctx.env.set_movement_intent(None);
            return None;
        }
        ctx.env.set_movement_intent(Some(self.target));
        None
    }

    fn on_stop(&mut self, ctx: &mut TaskContext<'_>, _preemptor: Option<&dyn Task>) {
        ctx.env.set_movement_intent(None);
    }

    fn is_finished(&self) -> bool {
        self.arrived || self.failed
    }

    fn is_failed(&self) -> bool {
        self.failed
    }

    // Radius is part of the work: a tighter approach is a different request.
    fn is_equal(&self, other: &dyn Task) -> bool {
        downcast::<Self>(other)
            .is_some_and(|other| other.target == self.target && other.radius == self.radius)
    }
}

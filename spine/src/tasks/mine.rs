//! Break one block: approach it, then look at it and swing until it is gone.

use tracing::{debug, warn};

use crate::core::machine::{Phase, PhaseMachine};
use crate::core::task::{Task, TaskContext, TaskSettings, downcast};
use crate::core::types::{BlockKind, BlockPos};
use crate::env::Activation;
use crate::tasks::navigate::NavigateTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MinePhase {
    Approach,
    Swing,
}

impl Phase for MinePhase {
    fn allowed(self, next: Self) -> bool {
        matches!(
            (self, next),
            (MinePhase::Approach, MinePhase::Swing) | (MinePhase::Swing, MinePhase::Approach)
        )
    }

    fn timeout(self, settings: &TaskSettings) -> Option<u64> {
        match self {
            MinePhase::Approach => None,
            MinePhase::Swing => Some(settings.mine_timeout_pulses),
        }
    }
}

pub struct MineBlockTask {
    pos: BlockPos,
    kind: BlockKind,
    machine: PhaseMachine<MinePhase>,
    looking: bool,
    broken: bool,
    failed: bool,
}

impl MineBlockTask {
    pub fn new(pos: BlockPos, kind: BlockKind) -> Self {
        Self {
            pos,
            kind,
            machine: PhaseMachine::new(MinePhase::Approach),
            looking: false,
            broken: false,
            failed: false,
        }
    }

    fn release_look(&mut self, ctx: &mut TaskContext<'_>) {
        if self.looking {
            ctx.env.set_look(None);
            self.looking = false;
        }
    }
}

impl Task for MineBlockTask {
    fn label(&self) -> String {
        format!("mine {} at {}", self.kind, self.pos)
    }

    fn on_start(&mut self, ctx: &mut TaskContext<'_>) {
        self.machine.restart(MinePhase::Approach, ctx.pulse);
    }

    fn on_tick(&mut self, ctx: &mut TaskContext<'_>) -> Option<Box<dyn Task>> {
        if self.broken || self.failed {
            return None;
        }
        if ctx.env.block_at(self.pos).as_ref() != Some(&self.kind) {
            debug!(pos = %self.pos, kind = %self.kind, "block gone");
            self.broken = true;
            self.release_look(ctx);
            return None;
        }

        let in_reach = ctx
            .status()
            .position
            .within(&self.pos, ctx.settings.reach_distance);
        match (self.machine.phase(), in_reach) {
            (MinePhase::Approach, false) => {
                return Some(Box::new(NavigateTask::new(
                    self.pos,
                    ctx.settings.reach_distance,
                )));
            }
            (MinePhase::Approach, true) => {
                self.machine.transition(MinePhase::Swing, ctx.pulse);
            }
            (MinePhase::Swing, false) => {
                self.release_look(ctx);
                self.machine.transition(MinePhase::Approach, ctx.pulse);
                return Some(Box::new(NavigateTask::new(
                    self.pos,
                    ctx.settings.reach_distance,
                )));
            }
            (MinePhase::Swing, true) => {}
        }

        if self.machine.timed_out(ctx.pulse, ctx.settings) {
            warn!(pos = %self.pos, kind = %self.kind, "mining timed out");
            self.failed = true;
            self.release_look(ctx);
            return None;
        }
        ctx.env.set_look(Some(self.pos));
        self.looking = true;
        ctx.env.activate(Activation::Swing { target: self.pos });
        None
    }

    fn on_stop(&mut self, ctx: &mut TaskContext<'_>, _preemptor: Option<&dyn Task>) {
        self.release_look(ctx);
    }

    fn on_child_finished(&mut self, _ctx: &mut TaskContext<'_>, child: &dyn Task) {
        if child.is_failed() {
            warn!(pos = %self.pos, child = %child.label(), "could not reach block");
            self.failed = true;
        }
    }

    fn is_finished(&self) -> bool {
        self.broken || self.failed
    }

    fn is_failed(&self) -> bool {
        self.failed
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        downcast::<Self>(other).is_some_and(|other| other.pos == self.pos && other.kind == self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalogue::Catalogue;
    use crate::test_support::{MotorCall, RecordingEnv};

    #[test]
    fn delegates_navigation_when_out_of_reach() {
        let pos = BlockPos::new(10, 64, 0);
        let mut env = RecordingEnv::default().with_block(pos, "oak_log");
        let catalogue = Catalogue::default();
        let settings = TaskSettings::default();
        let mut ctx = TaskContext::new(&mut env, &catalogue, &settings);
        let mut task = MineBlockTask::new(pos, "oak_log".into());
        task.on_start(&mut ctx);

        let delegate = task.on_tick(&mut ctx).expect("navigate delegate");
        assert!(delegate.is_equal(&NavigateTask::new(pos, settings.reach_distance)));
    }

    #[test]
    fn swings_in_reach_and_finishes_when_block_disappears() {
        let pos = BlockPos::new(1, 64, 0);
        let mut env = RecordingEnv::default().with_block(pos, "oak_log");
        let catalogue = Catalogue::default();
        let settings = TaskSettings::default();
        let mut task = MineBlockTask::new(pos, "oak_log".into());
        {
            let mut ctx = TaskContext::new(&mut env, &catalogue, &settings);
            task.on_start(&mut ctx);
            assert!(task.on_tick(&mut ctx).is_none());
        }
        assert!(env
            .calls()
            .contains(&MotorCall::Activate(Activation::Swing { target: pos })));
        assert_eq!(env.look(), Some(pos));

        env.blocks.clear();
        let mut ctx = TaskContext::new(&mut env, &catalogue, &settings);
        task.on_tick(&mut ctx);
        assert!(task.is_finished());
        assert!(!task.is_failed());
        assert!(env.look().is_none());
    }

    #[test]
    fn stop_mid_swing_releases_look() {
        let pos = BlockPos::new(1, 64, 0);
        let mut env = RecordingEnv::default().with_block(pos, "stone");
        let catalogue = Catalogue::default();
        let settings = TaskSettings::default();
        let mut ctx = TaskContext::new(&mut env, &catalogue, &settings);
        let mut task = MineBlockTask::new(pos, "stone".into());
        task.on_start(&mut ctx);
        task.on_tick(&mut ctx);
        task.on_stop(&mut ctx, None);
        assert!(env.look().is_none());
    }
}

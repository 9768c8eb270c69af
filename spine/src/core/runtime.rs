//! Reconciliation runtime: drives a spine of active tasks once per pulse.
//!
//! The spine is `root -> child -> ... -> leaf`, one active task per level.
//! Each pulse descends from the root:
//!
//! 1. If the level's active child is finished (or failed), stop it with no
//!    preemptor, notify the level via `on_child_finished`, and clear the slot.
//! 2. Tick the level. `None` means the level acts directly: any child it still
//!    has is stopped and the descent ends here.
//! 3. A delegate with no active child is started and becomes the next level.
//! 4. A delegate `is_equal` to the active child is discarded and the child
//!    continues; otherwise the child (and everything below it) is stopped,
//!    bottom first, with the delegate as preemptor, and the delegate started.
//!
//! A level only observes its child's completion when the descent reaches it,
//! so a failure climbs at most one level per pulse.

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::core::task::{Task, TaskContext, is_done};

/// Spine depth beyond which delegation is refused and the level acts directly.
pub const MAX_SPINE_DEPTH: usize = 64;

/// Lifecycle transition observed during a pulse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SpineEvent {
    Started {
        depth: usize,
        label: String,
    },
    Continued {
        depth: usize,
        label: String,
    },
    Stopped {
        depth: usize,
        label: String,
        preempted_by: Option<String>,
        failed: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseStatus {
    /// No root installed.
    Idle,
    /// A leaf acted (or waited) this pulse.
    Acting,
    /// The root finished successfully and was stopped.
    RootFinished,
    /// The root failed and was stopped.
    RootFailed,
}

/// What happened during one pulse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PulseReport {
    pub pulse: u64,
    pub status: PulseStatus,
    /// Labels along the spine after reconciliation, root first.
    pub spine: Vec<String>,
    /// Depth of the task that acted this pulse.
    pub acting: Option<usize>,
    pub events: Vec<SpineEvent>,
}

#[derive(Default)]
pub struct Runtime {
    spine: Vec<Box<dyn Task>>,
    pulse: u64,
    events: Vec<SpineEvent>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of the next pulse to run.
    pub fn current_pulse(&self) -> u64 {
        self.pulse
    }

    pub fn depth(&self) -> usize {
        self.spine.len()
    }

    pub fn is_idle(&self) -> bool {
        self.spine.is_empty()
    }

    pub fn root(&self) -> Option<&dyn Task> {
        self.node(0)
    }

    /// Active task at `depth` (root is 0).
    pub fn node(&self, depth: usize) -> Option<&dyn Task> {
        self.spine.get(depth).map(|task| task.as_ref())
    }

    pub fn spine_labels(&self) -> Vec<String> {
        self.spine.iter().map(|task| task.label()).collect()
    }

    /// Replace the root unconditionally.
    ///
    /// The whole previous spine is stopped bottom first, each task receiving
    /// `root` as preemptor, before `root.on_start` runs.
    pub fn set_root(&mut self, mut root: Box<dyn Task>, ctx: &mut TaskContext<'_>) {
        ctx.pulse = self.pulse;
        self.truncate(0, ctx, Some(root.as_ref()));
        self.start(&mut root, 0, ctx);
        self.spine.push(root);
    }

    /// Install `root` unless the current root is the same ongoing work.
    ///
    /// Returns true if `root` was installed.
    pub fn offer_root(&mut self, root: Box<dyn Task>, ctx: &mut TaskContext<'_>) -> bool {
        if let Some(current) = self.spine.first() {
            if current.is_equal(root.as_ref()) {
                return false;
            }
        }
        self.set_root(root, ctx);
        true
    }

    /// Stop a finished (or failed) root with no preemptor.
    ///
    /// Returns `RootFinished` or `RootFailed` if a root was reaped. Its stop
    /// events land in the next pulse report.
    pub fn reap_root(&mut self, ctx: &mut TaskContext<'_>) -> Option<PulseStatus> {
        let root = self.spine.first().filter(|root| is_done(root.as_ref()))?;
        let failed = root.is_failed();
        if failed {
            warn!(task = %root.label(), pulse = self.pulse, "root failed");
        } else {
            debug!(task = %root.label(), pulse = self.pulse, "root finished");
        }
        ctx.pulse = self.pulse;
        self.truncate(0, ctx, None);
        Some(if failed {
            PulseStatus::RootFailed
        } else {
            PulseStatus::RootFinished
        })
    }

    /// Stop the entire spine with no preemptor.
    pub fn clear(&mut self, ctx: &mut TaskContext<'_>) {
        ctx.pulse = self.pulse;
        self.truncate(0, ctx, None);
    }

    /// Run one pulse and advance the pulse counter.
    pub fn pulse(&mut self, ctx: &mut TaskContext<'_>) -> PulseReport {
        ctx.pulse = self.pulse;
        let (status, acting) = self.reconcile(ctx);
        let report = PulseReport {
            pulse: self.pulse,
            status,
            spine: self.spine_labels(),
            acting,
            events: std::mem::take(&mut self.events),
        };
        trace!(pulse = report.pulse, status = ?report.status, acting = ?report.acting, "pulse complete");
        self.pulse += 1;
        report
    }

    fn reconcile(&mut self, ctx: &mut TaskContext<'_>) -> (PulseStatus, Option<usize>) {
        let Some(root) = self.spine.first() else {
            return (PulseStatus::Idle, None);
        };
        if is_done(root.as_ref()) {
            let status = self.reap_root(ctx).unwrap_or(PulseStatus::Idle);
            return (status, None);
        }

        let mut depth = 0;
        loop {
            self.reap_finished_child(depth, ctx);

            let desired = self.spine[depth].on_tick(ctx);
            let Some(mut delegate) = desired else {
                self.truncate(depth + 1, ctx, None);
                return (PulseStatus::Acting, Some(depth));
            };

            if depth + 1 >= MAX_SPINE_DEPTH {
                warn!(
                    task = %self.spine[depth].label(),
                    depth,
                    "spine depth limit reached; ignoring delegate"
                );
                self.truncate(depth + 1, ctx, None);
                return (PulseStatus::Acting, Some(depth));
            }

            let continues = self
                .spine
                .get(depth + 1)
                .is_some_and(|current| current.is_equal(delegate.as_ref()));
            if continues {
                let label = self.spine[depth + 1].label();
                trace!(task = %label, depth = depth + 1, "continuing");
                self.events.push(SpineEvent::Continued {
                    depth: depth + 1,
                    label,
                });
            } else {
                self.truncate(depth + 1, ctx, Some(delegate.as_ref()));
                self.start(&mut delegate, depth + 1, ctx);
                self.spine.push(delegate);
            }
            depth += 1;
        }
    }

    /// Step 1: stop a finished child (and anything below it) and tell the parent.
    fn reap_finished_child(&mut self, depth: usize, ctx: &mut TaskContext<'_>) {
        let finished = self
            .spine
            .get(depth + 1)
            .is_some_and(|child| is_done(child.as_ref()));
        if !finished {
            return;
        }
        self.truncate(depth + 2, ctx, None);
        let Some(mut child) = self.spine.pop() else {
            return;
        };
        self.stop(&mut child, depth + 1, ctx, None);
        self.spine[depth].on_child_finished(ctx, child.as_ref());
    }

    /// Stop every task at `from` and deeper, deepest first.
    fn truncate(&mut self, from: usize, ctx: &mut TaskContext<'_>, preemptor: Option<&dyn Task>) {
        if self.spine.len() <= from {
            return;
        }
        let stopped = self.spine.split_off(from);
        for (offset, mut task) in stopped.into_iter().enumerate().rev() {
            self.stop(&mut task, from + offset, ctx, preemptor);
        }
    }

    fn start(&mut self, task: &mut Box<dyn Task>, depth: usize, ctx: &mut TaskContext<'_>) {
        let label = task.label();
        debug!(task = %label, depth, pulse = self.pulse, "starting");
        task.on_start(ctx);
        self.events.push(SpineEvent::Started { depth, label });
    }

    fn stop(
        &mut self,
        task: &mut Box<dyn Task>,
        depth: usize,
        ctx: &mut TaskContext<'_>,
        preemptor: Option<&dyn Task>,
    ) {
        let label = task.label();
        let failed = task.is_failed();
        let preempted_by = preemptor.map(|p| p.label());
        if failed {
            warn!(task = %label, depth, pulse = self.pulse, "stopping failed task");
        } else {
            debug!(task = %label, depth, pulse = self.pulse, preempted_by = ?preempted_by, "stopping");
        }
        task.on_stop(ctx, preemptor);
        self.events.push(SpineEvent::Stopped {
            depth,
            label,
            preempted_by,
            failed,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::core::catalogue::Catalogue;
    use crate::core::task::{TaskSettings, downcast};
    use crate::core::types::BlockPos;
    use crate::test_support::{Journal, RecordingEnv, ScriptedTask};

    fn run_pulses(runtime: &mut Runtime, env: &mut RecordingEnv, pulses: usize) -> Vec<PulseReport> {
        let catalogue = Catalogue::default();
        let settings = TaskSettings::default();
        let mut ctx = TaskContext::new(env, &catalogue, &settings);
        (0..pulses).map(|_| runtime.pulse(&mut ctx)).collect()
    }

    fn install(runtime: &mut Runtime, env: &mut RecordingEnv, root: Box<dyn Task>) {
        let catalogue = Catalogue::default();
        let settings = TaskSettings::default();
        let mut ctx = TaskContext::new(env, &catalogue, &settings);
        runtime.set_root(root, &mut ctx);
    }

    /// A -> B -> C, each level building a fresh delegate every pulse.
    fn three_level_chain(journal: &Journal) -> Box<dyn Task> {
        let j = journal.clone();
        let make_c = move || Some(ScriptedTask::new("c", &j).holding_motor(BlockPos::new(5, 64, 5)).boxed());
        let j = journal.clone();
        let make_b = move || Some(ScriptedTask::new("b", &j).delegating(make_c.clone()).boxed());
        ScriptedTask::new("a", journal).delegating(make_b).boxed()
    }

    #[test]
    fn activation_cascades_within_one_pulse() {
        let journal = Journal::default();
        let mut env = RecordingEnv::default();
        let mut runtime = Runtime::new();
        install(&mut runtime, &mut env, three_level_chain(&journal));

        let reports = run_pulses(&mut runtime, &mut env, 1);

        assert_eq!(reports[0].spine, vec!["a", "b", "c"]);
        assert_eq!(reports[0].acting, Some(2));
        assert_eq!(
            journal.entries(),
            vec!["start:a", "tick:a", "start:b", "tick:b", "start:c", "tick:c"]
        );
    }

    #[test]
    fn equal_delegate_continues_without_restart() {
        let journal = Journal::default();
        let mut env = RecordingEnv::default();
        let mut runtime = Runtime::new();
        install(&mut runtime, &mut env, three_level_chain(&journal));

        run_pulses(&mut runtime, &mut env, 5);

        let starts = journal.count_prefix("start:");
        let stops = journal.count_prefix("stop:");
        assert_eq!(starts, 3);
        assert_eq!(stops, 0);
        let leaf = runtime.node(2).and_then(downcast::<ScriptedTask>).expect("leaf");
        assert_eq!(leaf.ticks(), 5);
    }

    #[test]
    fn unequal_delegate_replaces_child_and_its_descendants() {
        let journal = Journal::default();
        let mut env = RecordingEnv::default();
        let mut runtime = Runtime::new();
        let variant = Rc::new(Cell::new(0u32));

        let j = journal.clone();
        let make_leaf = move || Some(ScriptedTask::new("leaf", &j).boxed());
        let j = journal.clone();
        let v = variant.clone();
        let make_mid = move || {
            Some(
                ScriptedTask::new("mid", &j)
                    .keyed(v.get())
                    .delegating(make_leaf.clone())
                    .boxed(),
            )
        };
        install(
            &mut runtime,
            &mut env,
            ScriptedTask::new("root", &journal).delegating(make_mid).boxed(),
        );
        run_pulses(&mut runtime, &mut env, 1);
        journal.clear();

        variant.set(1);
        run_pulses(&mut runtime, &mut env, 1);

        assert_eq!(
            journal.entries(),
            vec![
                "tick:root",
                "stop:leaf<-mid#1",
                "stop:mid<-mid#1",
                "start:mid",
                "tick:mid",
                "start:leaf",
                "tick:leaf",
            ]
        );
    }

    #[test]
    fn finished_child_is_stopped_and_parent_reticked_same_pulse() {
        let journal = Journal::default();
        let mut env = RecordingEnv::default();
        let mut runtime = Runtime::new();
        let j = journal.clone();
        let make_child = move || Some(ScriptedTask::new("child", &j).finishing_after(1).boxed());
        let parent = ScriptedTask::new("parent", &journal)
            .delegating(make_child)
            .boxed();
        install(&mut runtime, &mut env, parent);

        run_pulses(&mut runtime, &mut env, 1);
        journal.clear();
        let reports = run_pulses(&mut runtime, &mut env, 1);

        assert_eq!(
            journal.entries(),
            vec![
                "stop:child<-none",
                "child_finished:parent<-child",
                "tick:parent",
                "start:child",
                "tick:child",
            ]
        );
        assert_eq!(reports[0].acting, Some(1));
    }

    #[test]
    fn acting_directly_stops_existing_child() {
        let journal = Journal::default();
        let mut env = RecordingEnv::default();
        let mut runtime = Runtime::new();
        let delegate = Rc::new(Cell::new(true));
        let j = journal.clone();
        let d = delegate.clone();
        let make_child = move || {
            d.get()
                .then(|| ScriptedTask::new("child", &j).holding_motor(BlockPos::new(1, 64, 1)).boxed())
        };
        install(
            &mut runtime,
            &mut env,
            ScriptedTask::new("parent", &journal).delegating(make_child).boxed(),
        );
        run_pulses(&mut runtime, &mut env, 1);
        assert!(env.movement_intent().is_some());

        delegate.set(false);
        let reports = run_pulses(&mut runtime, &mut env, 1);

        assert_eq!(reports[0].acting, Some(0));
        assert_eq!(reports[0].spine, vec!["parent"]);
        assert!(journal.entries().contains(&"stop:child<-none".to_string()));
        assert!(env.movement_intent().is_none());
    }

    #[test]
    fn exactly_one_acting_level_per_pulse() {
        let journal = Journal::default();
        let mut env = RecordingEnv::default();
        let mut runtime = Runtime::new();
        install(&mut runtime, &mut env, three_level_chain(&journal));
        journal.clear();

        for report in run_pulses(&mut runtime, &mut env, 4) {
            assert_eq!(report.status, PulseStatus::Acting);
            assert_eq!(report.acting, Some(report.spine.len() - 1));
        }
        // Only the leaf's ticks return None; every tick line per pulse is a/b/c.
        assert_eq!(journal.count_prefix("tick:c"), 4);
    }

    #[test]
    fn root_preemption_stops_bottom_first_before_new_start() {
        let journal = Journal::default();
        let mut env = RecordingEnv::default();
        let mut runtime = Runtime::new();
        install(&mut runtime, &mut env, three_level_chain(&journal));
        run_pulses(&mut runtime, &mut env, 2);
        assert_eq!(env.movement_intent(), Some(BlockPos::new(5, 64, 5)));
        journal.clear();

        install(
            &mut runtime,
            &mut env,
            ScriptedTask::new("d", &journal).boxed(),
        );

        assert_eq!(
            journal.entries(),
            vec!["stop:c<-d", "stop:b<-d", "stop:a<-d", "start:d"]
        );
        assert!(env.movement_intent().is_none());
        assert_eq!(runtime.spine_labels(), vec!["d"]);
    }

    #[test]
    fn offer_root_keeps_equal_root() {
        let journal = Journal::default();
        let mut env = RecordingEnv::default();
        let mut runtime = Runtime::new();
        let catalogue = Catalogue::default();
        let settings = TaskSettings::default();
        let mut ctx = TaskContext::new(&mut env, &catalogue, &settings);

        assert!(runtime.offer_root(ScriptedTask::new("r", &journal).boxed(), &mut ctx));
        runtime.pulse(&mut ctx);
        assert!(!runtime.offer_root(ScriptedTask::new("r", &journal).boxed(), &mut ctx));
        assert!(runtime.offer_root(ScriptedTask::new("r", &journal).keyed(7).boxed(), &mut ctx));

        assert_eq!(journal.count_prefix("start:"), 2);
        assert_eq!(journal.count_prefix("stop:"), 1);
    }

    #[test]
    fn finished_root_is_stopped_and_reported() {
        let journal = Journal::default();
        let mut env = RecordingEnv::default();
        let mut runtime = Runtime::new();
        install(
            &mut runtime,
            &mut env,
            ScriptedTask::new("once", &journal).finishing_after(1).failing().boxed(),
        );

        let reports = run_pulses(&mut runtime, &mut env, 3);

        assert_eq!(reports[0].status, PulseStatus::Acting);
        assert_eq!(reports[1].status, PulseStatus::RootFailed);
        assert_eq!(reports[2].status, PulseStatus::Idle);
        assert!(runtime.is_idle());
        assert_eq!(journal.count_prefix("stop:once"), 1);
    }

    #[test]
    fn start_stop_pairs_never_overlap_at_a_slot() {
        let journal = Journal::default();
        let mut env = RecordingEnv::default();
        let mut runtime = Runtime::new();
        let counter = Rc::new(Cell::new(0u32));
        let j = journal.clone();
        let c = counter.clone();
        // Swap the child every other pulse.
        let make_child = move || {
            c.set(c.get() + 1);
            Some(ScriptedTask::new("child", &j).keyed(c.get() / 2).boxed())
        };
        install(
            &mut runtime,
            &mut env,
            ScriptedTask::new("root", &journal).delegating(make_child).boxed(),
        );
        run_pulses(&mut runtime, &mut env, 9);

        let mut open = false;
        for entry in journal.entries() {
            if entry.starts_with("start:child") {
                assert!(!open, "child started while another was active");
                open = true;
            } else if entry.starts_with("stop:child") {
                assert!(open, "child stopped without being started");
                open = false;
            }
        }
        assert_eq!(journal.count_prefix("start:child"), 5);
    }

    #[test]
    fn failure_climbs_one_level_per_pulse() {
        let journal = Journal::default();
        let mut env = RecordingEnv::default();
        let mut runtime = Runtime::new();
        let j = journal.clone();
        let make_leaf = move || Some(ScriptedTask::new("leaf", &j).finishing_after(1).failing().boxed());
        let j = journal.clone();
        let make_mid = move || {
            Some(
                ScriptedTask::new("mid", &j)
                    .delegating(make_leaf.clone())
                    .failing_with_child()
                    .boxed(),
            )
        };
        install(
            &mut runtime,
            &mut env,
            ScriptedTask::new("top", &journal)
                .delegating(make_mid)
                .failing_with_child()
                .boxed(),
        );

        let reports = run_pulses(&mut runtime, &mut env, 4);

        assert_eq!(reports[0].acting, Some(2));
        // mid sees the failed leaf and fails itself, acting as the leaf.
        assert_eq!(reports[1].acting, Some(1));
        // top sees the failed mid and fails itself.
        assert_eq!(reports[2].acting, Some(0));
        assert_eq!(reports[3].status, PulseStatus::RootFailed);
    }
}

//! Priority chains over a single runtime.
//!
//! Every pulse each chain may propose a root task with a priority. The highest
//! proposal wins (ties go to the chain registered first). A proposal from the
//! chain that already owns the root is reconciled with `is_equal`; a proposal
//! from a different chain preempts the whole spine.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::runtime::{PulseReport, PulseStatus, Runtime};
use crate::core::task::{Task, TaskContext};
use crate::core::types::{ItemId, ItemTarget};
use crate::goal::hooks::PickupDrops;
use crate::goal::resolver::ResourceGoal;
use crate::tasks::eat::EatTask;

/// Chain priorities and resolver options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SupervisorConfig {
    pub user_priority: u32,
    pub vitals_priority: u32,
    /// Radius within which the user goal walks onto wanted drops.
    pub pickup_radius: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            user_priority: 50,
            vitals_priority: 90,
            pickup_radius: 16,
        }
    }
}

pub struct Proposal {
    pub priority: u32,
    pub task: Box<dyn Task>,
}

pub trait Chain {
    fn name(&self) -> &str;

    /// Root this chain wants running now, if any. Called every pulse.
    fn propose(&mut self, ctx: &mut TaskContext<'_>) -> Option<Proposal>;

    /// The root this chain installed finished (or failed) and was stopped.
    fn on_root_finished(&mut self, _failed: bool) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainOutcome {
    Complete,
    Failed,
}

/// Proposes the operator's resource goal until it completes or fails.
pub struct UserChain {
    targets: Vec<ItemTarget>,
    crafting: bool,
    priority: u32,
    pickup_radius: u32,
    outcome: Option<ChainOutcome>,
}

impl UserChain {
    pub const NAME: &'static str = "user";

    pub fn new(targets: Vec<ItemTarget>, crafting: bool, config: &SupervisorConfig) -> Self {
        Self {
            targets,
            crafting,
            priority: config.user_priority,
            pickup_radius: config.pickup_radius,
            outcome: None,
        }
    }
}

impl Chain for UserChain {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn propose(&mut self, _ctx: &mut TaskContext<'_>) -> Option<Proposal> {
        if self.outcome.is_some() {
            return None;
        }
        Some(Proposal {
            priority: self.priority,
            task: Box::new(ResourceGoal::with_hook(
                self.targets.clone(),
                self.crafting,
                PickupDrops::new(self.pickup_radius),
            )),
        })
    }

    fn on_root_finished(&mut self, failed: bool) {
        self.outcome = Some(if failed {
            ChainOutcome::Failed
        } else {
            ChainOutcome::Complete
        });
    }
}

/// Eats when hunger drops to the threshold, and keeps eating until sated.
pub struct VitalsChain {
    foods: Vec<ItemId>,
    priority: u32,
    eating: bool,
}

impl VitalsChain {
    pub const NAME: &'static str = "vitals";

    pub fn new(foods: Vec<ItemId>, config: &SupervisorConfig) -> Self {
        Self {
            foods,
            priority: config.vitals_priority,
            eating: false,
        }
    }
}

impl Chain for VitalsChain {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn propose(&mut self, ctx: &mut TaskContext<'_>) -> Option<Proposal> {
        let hunger = ctx.status().hunger;
        if hunger >= ctx.settings.hunger_satisfied {
            self.eating = false;
        } else if hunger <= ctx.settings.hunger_threshold {
            self.eating = true;
        }
        if !self.eating {
            return None;
        }
        let inventory = ctx.inventory();
        let Some(food) = self.foods.iter().find(|food| inventory.count(food) > 0) else {
            self.eating = false;
            return None;
        };
        Some(Proposal {
            priority: self.priority,
            task: Box::new(EatTask::new(food.clone())),
        })
    }

    fn on_root_finished(&mut self, _failed: bool) {
        self.eating = false;
    }
}

/// A pulse as seen by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorReport {
    /// Chain owning the root during this pulse.
    pub chain: Option<String>,
    /// Chain whose root finished this pulse, with its outcome.
    pub concluded: Option<(String, ChainOutcome)>,
    #[serde(flatten)]
    pub pulse: PulseReport,
}

/// Coarse state of the user goal after a pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorOutcome {
    Running,
    GoalComplete,
    GoalFailed,
    Idle,
}

impl SupervisorReport {
    pub fn outcome(&self) -> SupervisorOutcome {
        match &self.concluded {
            Some((chain, ChainOutcome::Complete)) if chain == UserChain::NAME => {
                SupervisorOutcome::GoalComplete
            }
            Some((chain, ChainOutcome::Failed)) if chain == UserChain::NAME => {
                SupervisorOutcome::GoalFailed
            }
            _ if self.pulse.status == PulseStatus::Idle => SupervisorOutcome::Idle,
            _ => SupervisorOutcome::Running,
        }
    }
}

#[derive(Default)]
pub struct Supervisor {
    runtime: Runtime,
    chains: Vec<Box<dyn Chain>>,
    active: Option<usize>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a chain; earlier chains win priority ties.
    pub fn add_chain(&mut self, chain: Box<dyn Chain>) {
        self.chains.push(chain);
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn active_chain(&self) -> Option<&str> {
        self.active.map(|index| self.chains[index].name())
    }

    pub fn pulse(&mut self, ctx: &mut TaskContext<'_>) -> SupervisorReport {
        ctx.pulse = self.runtime.current_pulse();
        // A finished root concludes its chain before any chain can preempt it.
        let reaped = self.runtime.reap_root(ctx);
        let mut concluded = reaped.and_then(|status| self.conclude(status));

        let mut best: Option<(usize, Proposal)> = None;
        for (index, chain) in self.chains.iter_mut().enumerate() {
            let Some(proposal) = chain.propose(ctx) else {
                continue;
            };
            if best
                .as_ref()
                .is_none_or(|(_, current)| proposal.priority > current.priority)
            {
                best = Some((index, proposal));
            }
        }

        match best {
            Some((index, proposal)) if self.active == Some(index) => {
                self.runtime.offer_root(proposal.task, ctx);
            }
            Some((index, proposal)) => {
                info!(
                    chain = self.chains[index].name(),
                    previous = ?self.active_chain(),
                    task = %proposal.task.label(),
                    "chain takes over"
                );
                self.runtime.set_root(proposal.task, ctx);
                self.active = Some(index);
            }
            None => {
                if !self.runtime.is_idle() {
                    debug!("no chain proposes work; clearing spine");
                    self.runtime.clear(ctx);
                }
                self.active = None;
            }
        }

        let chain = self.active_chain().map(str::to_string);
        let mut report = self.runtime.pulse(ctx);
        match (report.status, reaped) {
            (PulseStatus::RootFinished | PulseStatus::RootFailed, _) => {
                concluded = self.conclude(report.status).or(concluded);
            }
            (PulseStatus::Idle, Some(status)) => report.status = status,
            _ => {}
        }

        SupervisorReport {
            chain,
            concluded,
            pulse: report,
        }
    }

    /// Hand a reaped root's outcome to the chain that installed it.
    fn conclude(&mut self, status: PulseStatus) -> Option<(String, ChainOutcome)> {
        let failed = status == PulseStatus::RootFailed;
        let index = self.active.take()?;
        let chain = &mut self.chains[index];
        chain.on_root_finished(failed);
        let outcome = if failed {
            ChainOutcome::Failed
        } else {
            ChainOutcome::Complete
        };
        info!(chain = chain.name(), outcome = ?outcome, "chain root concluded");
        Some((chain.name().to_string(), outcome))
    }

    /// Stop everything, releasing all held resources.
    pub fn shutdown(&mut self, ctx: &mut TaskContext<'_>) {
        self.runtime.clear(ctx);
        self.active = None;
    }
}

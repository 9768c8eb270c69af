//! Scenario runner for `spine run`.

use anyhow::{Result, anyhow};
use serde::Serialize;
use tracing::info;

use crate::core::catalogue::Catalogue;
use crate::core::task::TaskContext;
use crate::core::types::Inventory;
use crate::env::WorldQuery;
use crate::io::config::SpineConfig;
use crate::io::scenario::Scenario;
use crate::supervisor::{Supervisor, SupervisorOutcome, SupervisorReport, UserChain, VitalsChain};

/// Reason why `run_scenario` stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RunStop {
    /// Every goal target is held.
    GoalComplete,
    /// The goal's root task failed.
    GoalFailed,
    /// `max_pulses` ran out before the goal concluded.
    PulseBudgetExhausted { max_pulses: u64 },
}

/// Summary of a scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub pulses: u64,
    pub stop: RunStop,
    pub inventory: Inventory,
}

/// Pulse the supervisor against a simulated world until the user goal
/// concludes or the pulse budget runs out.
///
/// `on_pulse` sees every report, in order. The spine is cleared before
/// returning so every active task receives its `on_stop`.
pub fn run_scenario<F: FnMut(&SupervisorReport) -> Result<()>>(
    scenario: &Scenario,
    catalogue: &Catalogue,
    config: &SpineConfig,
    max_pulses: Option<u64>,
    mut on_pulse: F,
) -> Result<RunOutcome> {
    let errors = scenario.validate();
    if !errors.is_empty() {
        return Err(anyhow!("scenario invalid:\n- {}", errors.join("\n- ")));
    }
    let max_pulses = max_pulses.unwrap_or(config.max_pulses);
    if max_pulses == 0 {
        return Err(anyhow!("max pulses must be > 0"));
    }

    let mut world = scenario.build_world(catalogue);
    let mut supervisor = Supervisor::new();
    supervisor.add_chain(Box::new(VitalsChain::new(
        scenario.food_items(),
        &config.supervisor,
    )));
    supervisor.add_chain(Box::new(UserChain::new(
        scenario.goal.clone(),
        scenario.crafting,
        &config.supervisor,
    )));

    let mut pulses = 0u64;
    let mut stop = RunStop::PulseBudgetExhausted { max_pulses };
    while pulses < max_pulses {
        let report = {
            let mut ctx = TaskContext::new(&mut world, catalogue, &config.tasks);
            supervisor.pulse(&mut ctx)
        };
        pulses += 1;
        on_pulse(&report)?;
        match report.outcome() {
            SupervisorOutcome::GoalComplete => {
                stop = RunStop::GoalComplete;
                break;
            }
            SupervisorOutcome::GoalFailed => {
                stop = RunStop::GoalFailed;
                break;
            }
            SupervisorOutcome::Running | SupervisorOutcome::Idle => {}
        }
        world.advance();
    }

    let mut ctx = TaskContext::new(&mut world, catalogue, &config.tasks);
    supervisor.shutdown(&mut ctx);
    info!(pulses, stop = ?stop, "run finished");
    Ok(RunOutcome {
        pulses,
        stop,
        inventory: world.inventory(),
    })
}

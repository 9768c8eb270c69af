//! End-to-end runs of the supervisor against the grid world.
//!
//! These drive the real resolver and leaf tasks through `run_scenario` and
//! check convergence, preemption by the vitals chain, and that every started
//! task is stopped exactly once.

use std::collections::BTreeMap;

use spine::core::catalogue::Catalogue;
use spine::core::runtime::SpineEvent;
use spine::core::types::ItemId;
use spine::io::catalogue_store::parse_catalogue;
use spine::io::config::SpineConfig;
use spine::io::init::{DEFAULT_CATALOGUE, DEMO_SCENARIO};
use spine::io::scenario::parse_scenario;
use spine::run::{RunOutcome, RunStop, run_scenario};
use spine::supervisor::SupervisorReport;

fn catalogue() -> Catalogue {
    parse_catalogue(DEFAULT_CATALOGUE).expect("default catalogue")
}

fn run(scenario: &str) -> (RunOutcome, Vec<SupervisorReport>) {
    let scenario = parse_scenario(scenario).expect("scenario");
    let mut reports = Vec::new();
    let outcome = run_scenario(
        &scenario,
        &catalogue(),
        &SpineConfig::default(),
        None,
        |report| {
            reports.push(report.clone());
            Ok(())
        },
    )
    .expect("run");
    (outcome, reports)
}

fn stopped_events(reports: &[SupervisorReport]) -> Vec<&SpineEvent> {
    reports
        .iter()
        .flat_map(|report| report.pulse.events.iter())
        .filter(|event| matches!(event, SpineEvent::Stopped { .. }))
        .collect()
}

#[test]
fn sticks_from_a_single_log() {
    let (outcome, reports) = run(r#"
[drops]
oak_log = "log"

[[goal]]
items = ["stick"]
count = 4

[[blocks]]
kind = "oak_log"
at = [{ x = 4, y = 64, z = 0 }]
"#);
    assert_eq!(outcome.stop, RunStop::GoalComplete);
    assert_eq!(outcome.inventory.count(&ItemId::from("stick")), 4);
    assert_eq!(outcome.inventory.count(&ItemId::from("planks")), 2);

    // The deepest spine reached runs goal -> craft -> ... -> navigate.
    let deepest = reports.iter().map(|report| report.pulse.spine.len()).max();
    assert_eq!(deepest, Some(8));
    assert!(reports
        .iter()
        .all(|report| report.chain.as_deref().is_none_or(|chain| chain == "user")));
}

#[test]
fn demo_scenario_converges_with_a_meal_break() {
    let (outcome, reports) = run(DEMO_SCENARIO);
    assert_eq!(outcome.stop, RunStop::GoalComplete);
    assert_eq!(outcome.inventory.count(&ItemId::from("stick")), 4);
    assert_eq!(outcome.inventory.count(&ItemId::from("crafting_table")), 1);
    assert_eq!(outcome.inventory.count(&ItemId::from("bread")), 0);
    assert!(reports
        .iter()
        .any(|report| report.chain.as_deref() == Some("vitals")));
}

#[test]
fn hunger_preempts_the_goal_and_the_goal_resumes() {
    let (outcome, reports) = run(r#"
[agent]
hunger = 7

[inventory]
bread = 2

[foods]
bread = 10

[drops]
oak_log = "log"

[rules]
hunger_decay_pulses = 3

[[goal]]
items = ["log"]
count = 1

[[blocks]]
kind = "oak_log"
at = [{ x = 6, y = 64, z = 0 }]
"#);
    assert_eq!(outcome.stop, RunStop::GoalComplete);
    assert_eq!(outcome.inventory.count(&ItemId::from("log")), 1);

    let preempted = stopped_events(&reports).into_iter().any(|event| {
        matches!(
            event,
            SpineEvent::Stopped { depth: 0, label, preempted_by: Some(by), failed: false }
                if label == "resolve [1xlog]" && by == "eat bread"
        )
    });
    assert!(preempted, "user goal was never preempted by eating");

    let chains: Vec<Option<&str>> = reports.iter().map(|report| report.chain.as_deref()).collect();
    let first_vitals = chains.iter().position(|chain| *chain == Some("vitals")).expect("ate");
    assert!(chains[..first_vitals].contains(&Some("user")));
    assert!(chains[first_vitals..].contains(&Some("user")));
}

#[test]
fn every_started_task_is_stopped_once() {
    let scenario = parse_scenario(DEMO_SCENARIO).expect("scenario");
    let mut starts: BTreeMap<String, usize> = BTreeMap::new();
    let mut stops: BTreeMap<String, usize> = BTreeMap::new();
    let outcome = run_scenario(
        &scenario,
        &catalogue(),
        &SpineConfig::default(),
        None,
        |report| {
            for event in &report.pulse.events {
                match event {
                    SpineEvent::Started { label, .. } => *starts.entry(label.clone()).or_default() += 1,
                    SpineEvent::Stopped { label, .. } => *stops.entry(label.clone()).or_default() += 1,
                    SpineEvent::Continued { .. } => {}
                }
            }
            Ok(())
        },
    )
    .expect("run");
    assert_eq!(outcome.stop, RunStop::GoalComplete);
    // The final pulse reaps the root, so nothing is left running at shutdown.
    assert_eq!(starts, stops);
}

#[test]
fn gather_only_goal_fails_when_sources_run_out() {
    let (outcome, reports) = run(r#"
crafting = false

[drops]
oak_log = "log"

[[goal]]
items = ["log"]
count = 2

[[blocks]]
kind = "oak_log"
at = [{ x = 2, y = 64, z = 0 }]
"#);
    assert_eq!(outcome.stop, RunStop::GoalFailed);
    assert_eq!(outcome.inventory.count(&ItemId::from("log")), 1);
    let failed_leaf = stopped_events(&reports).into_iter().any(|event| {
        matches!(event, SpineEvent::Stopped { label, failed: true, .. } if label.starts_with("gather"))
    });
    assert!(failed_leaf);
}

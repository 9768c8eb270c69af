//! CLI tests for `spine validate` and `spine run`.
//!
//! Spawns the spine binary and verifies exit codes for valid and invalid
//! inputs and for each way a run can stop.

use std::fs;
use std::process::Command;

use spine::exit_codes;
use spine::io::init::{InitOptions, SpinePaths, init_spine};
use spine::test_support::{temp_dir, write_file};

fn spine(root: &std::path::Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_spine"))
        .current_dir(root)
        .args(args)
        .output()
        .expect("spawn spine")
}

#[test]
fn validate_after_init_succeeds() {
    let temp = temp_dir().expect("tempdir");
    init_spine(temp.path(), &InitOptions { force: false }).expect("init");

    let output = spine(temp.path(), &["validate", "--scenario", ".spine/scenarios/demo.toml"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
}

#[test]
fn validate_without_catalogue_is_invalid() {
    let temp = temp_dir().expect("tempdir");
    let output = spine(temp.path(), &["validate"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("catalogue"), "{stderr}");
}

#[test]
fn validate_reports_catalogue_cycle() {
    let temp = temp_dir().expect("tempdir");
    write_file(
        temp.path(),
        "cyclic.json",
        r#"{"recipes": {"a": {"yield": 1, "ingredients": {"a": 1}}}}"#,
    )
    .expect("write");
    let output = spine(temp.path(), &["validate", "--catalogue", "cyclic.json"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("recipe cycle: a -> a"), "{stderr}");
}

#[test]
fn init_twice_without_force_is_invalid() {
    let temp = temp_dir().expect("tempdir");
    assert_eq!(spine(temp.path(), &["init"]).status.code(), Some(exit_codes::OK));
    assert_eq!(spine(temp.path(), &["init"]).status.code(), Some(exit_codes::INVALID));
    assert_eq!(
        spine(temp.path(), &["init", "--force"]).status.code(),
        Some(exit_codes::OK)
    );
}

#[test]
fn demo_run_completes_and_traces_every_pulse() {
    let temp = temp_dir().expect("tempdir");
    init_spine(temp.path(), &InitOptions { force: false }).expect("init");

    let output = spine(
        temp.path(),
        &[
            "run",
            "--scenario",
            ".spine/scenarios/demo.toml",
            "--trace",
            ".spine/traces/demo.jsonl",
        ],
    );
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("summary json");
    assert_eq!(summary["stop"]["reason"], "goal_complete");
    assert_eq!(summary["inventory"]["stick"], 4);
    assert_eq!(summary["inventory"]["crafting_table"], 1);

    let paths = SpinePaths::new(temp.path());
    let trace = fs::read_to_string(paths.traces_dir.join("demo.jsonl")).expect("trace");
    let pulses = summary["pulses"].as_u64().expect("pulses");
    assert_eq!(trace.lines().count() as u64, pulses);
}

#[test]
fn impossible_goal_exits_with_goal_failed() {
    let temp = temp_dir().expect("tempdir");
    init_spine(temp.path(), &InitOptions { force: false }).expect("init");
    write_file(
        temp.path(),
        "diamond.toml",
        "[[goal]]\nitems = [\"diamond\"]\ncount = 1\n",
    )
    .expect("write");

    let output = spine(temp.path(), &["run", "--scenario", "diamond.toml"]);
    assert_eq!(output.status.code(), Some(exit_codes::GOAL_FAILED));
}

#[test]
fn small_budget_exits_with_budget_exhausted() {
    let temp = temp_dir().expect("tempdir");
    init_spine(temp.path(), &InitOptions { force: false }).expect("init");

    let output = spine(
        temp.path(),
        &[
            "run",
            "--scenario",
            ".spine/scenarios/demo.toml",
            "--max-pulses",
            "3",
        ],
    );
    assert_eq!(output.status.code(), Some(exit_codes::PULSE_BUDGET_EXHAUSTED));
}

#[test]
fn malformed_scenario_is_invalid() {
    let temp = temp_dir().expect("tempdir");
    init_spine(temp.path(), &InitOptions { force: false }).expect("init");
    write_file(temp.path(), "broken.toml", "goal = []\n").expect("write");

    let output = spine(temp.path(), &["run", "--scenario", "broken.toml"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
}

//! Pulse-driven task-tree engine CLI.
//!
//! Scaffolds `.spine/`, validates config and catalogue files, and runs
//! scenarios against the built-in grid world.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use spine::exit_codes;
use spine::io::catalogue_store::load_catalogue;
use spine::io::config::load_config;
use spine::io::init::{InitOptions, SpinePaths, init_spine};
use spine::io::scenario::load_scenario;
use spine::io::trace::TraceWriter;
use spine::logging;
use spine::run::{RunStop, run_scenario};

#[derive(Parser)]
#[command(name = "spine", version, about = "Pulse-driven task-tree reconciliation engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.spine/` with default config, catalogue and a demo scenario.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// Check config and catalogue (and optionally a scenario) for errors.
    Validate {
        /// Catalogue to check instead of `.spine/catalogue.json`.
        #[arg(long)]
        catalogue: Option<PathBuf>,
        /// Scenario file to check as well.
        #[arg(long)]
        scenario: Option<PathBuf>,
    },
    /// Run a scenario until its goal completes, fails or the pulse budget runs out.
    Run {
        #[arg(long)]
        scenario: PathBuf,
        /// Catalogue to use instead of `.spine/catalogue.json`.
        #[arg(long)]
        catalogue: Option<PathBuf>,
        /// Write one JSON line per pulse to this file.
        #[arg(long)]
        trace: Option<PathBuf>,
        /// Override `max_pulses` from the config.
        #[arg(long)]
        max_pulses: Option<u64>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = std::env::current_dir().context("resolve current directory")?;
    match cli.command {
        Command::Init { force } => cmd_init(&root, force),
        Command::Validate {
            catalogue,
            scenario,
        } => cmd_validate(&root, catalogue.as_deref(), scenario.as_deref()),
        Command::Run {
            scenario,
            catalogue,
            trace,
            max_pulses,
        } => cmd_run(
            &root,
            &scenario,
            catalogue.as_deref(),
            trace.as_deref(),
            max_pulses,
        ),
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<i32> {
    let paths = init_spine(root, &InitOptions { force })?;
    println!("initialized {}", paths.spine_dir.display());
    Ok(exit_codes::OK)
}

fn cmd_validate(root: &Path, catalogue: Option<&Path>, scenario: Option<&Path>) -> Result<i32> {
    let paths = SpinePaths::new(root);
    load_config(&paths.config_path)?;
    load_catalogue(catalogue.unwrap_or(&paths.catalogue_path))?;
    if let Some(scenario) = scenario {
        load_scenario(scenario)?;
    }
    println!("ok");
    Ok(exit_codes::OK)
}

fn cmd_run(
    root: &Path,
    scenario: &Path,
    catalogue: Option<&Path>,
    trace: Option<&Path>,
    max_pulses: Option<u64>,
) -> Result<i32> {
    let paths = SpinePaths::new(root);
    let config = load_config(&paths.config_path)?;
    let catalogue = load_catalogue(catalogue.unwrap_or(&paths.catalogue_path))?;
    let scenario = load_scenario(scenario)?;

    let mut writer = trace.map(TraceWriter::create).transpose()?;
    let outcome = run_scenario(&scenario, &catalogue, &config, max_pulses, |report| {
        match writer.as_mut() {
            Some(writer) => writer.write(report),
            None => Ok(()),
        }
    })?;
    if let Some(writer) = writer {
        writer.finish()?;
    }

    let summary = serde_json::to_string_pretty(&outcome).context("serialize run summary")?;
    println!("{}", summary);
    Ok(match outcome.stop {
        RunStop::GoalComplete => exit_codes::OK,
        RunStop::GoalFailed => exit_codes::GOAL_FAILED,
        RunStop::PulseBudgetExhausted { .. } => exit_codes::PULSE_BUDGET_EXHAUSTED,
    })
}

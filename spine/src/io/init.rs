//! Initialization helpers for `.spine/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use super::catalogue_store::parse_catalogue;
use super::config::{SpineConfig, write_config};

const SPINE_GITIGNORE: &str = "traces/\n";

/// Wood and stone basics: enough for the demo scenario.
pub const DEFAULT_CATALOGUE: &str = r#"{
  "recipes": {
    "planks": { "yield": 4, "ingredients": { "log": 1 } },
    "stick": { "yield": 4, "ingredients": { "planks": 2 } },
    "crafting_table": { "yield": 1, "ingredients": { "planks": 4 } },
    "wooden_pickaxe": { "yield": 1, "ingredients": { "planks": 3, "stick": 2 } },
    "torch": { "yield": 4, "ingredients": { "coal": 1, "stick": 1 } }
  },
  "sources": {
    "log": ["oak_log", "birch_log"],
    "coal": ["coal_ore"],
    "cobblestone": ["stone"]
  }
}
"#;

/// Sticks and a crafting table from a small grove, with a snack break.
pub const DEMO_SCENARIO: &str = r#"crafting = true

[agent]
position = { x = 0, y = 64, z = 0 }
hunger = 9

[inventory]
bread = 2

[foods]
bread = 5

[drops]
oak_log = "log"
birch_log = "log"

[rules]
hunger_decay_pulses = 10

[[goal]]
items = ["stick"]
count = 4

[[goal]]
items = ["crafting_table"]
count = 1

[[blocks]]
kind = "oak_log"
at = [{ x = 4, y = 64, z = 0 }, { x = 4, y = 65, z = 0 }]

[[blocks]]
kind = "birch_log"
at = [{ x = -3, y = 64, z = 5 }]
"#;

/// All canonical paths within `.spine/` for a project root.
#[derive(Debug, Clone)]
pub struct SpinePaths {
    pub root: PathBuf,
    pub spine_dir: PathBuf,
    pub gitignore_path: PathBuf,
    pub config_path: PathBuf,
    pub catalogue_path: PathBuf,
    pub scenarios_dir: PathBuf,
    pub demo_scenario_path: PathBuf,
    pub traces_dir: PathBuf,
}

impl SpinePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let spine_dir = root.join(".spine");
        let scenarios_dir = spine_dir.join("scenarios");
        Self {
            root: root.clone(),
            spine_dir: spine_dir.clone(),
            gitignore_path: spine_dir.join(".gitignore"),
            config_path: spine_dir.join("config.toml"),
            catalogue_path: spine_dir.join("catalogue.json"),
            scenarios_dir: scenarios_dir.clone(),
            demo_scenario_path: scenarios_dir.join("demo.toml"),
            traces_dir: spine_dir.join("traces"),
        }
    }
}

/// Options for `init_spine`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing spine-owned files.
    pub force: bool,
}

/// Create `.spine/` scaffolding in `root`.
///
/// Fails if `.spine/` already exists unless `options.force` is set.
pub fn init_spine(root: &Path, options: &InitOptions) -> Result<SpinePaths> {
    let paths = SpinePaths::new(root);
    if paths.spine_dir.exists() && !paths.spine_dir.is_dir() {
        return Err(anyhow!("spine init: .spine exists but is not a directory"));
    }
    if paths.spine_dir.exists() && !options.force {
        return Err(anyhow!(
            "spine init: .spine already exists (use --force to overwrite)"
        ));
    }

    create_dir(&paths.spine_dir)?;
    create_dir(&paths.scenarios_dir)?;
    create_dir(&paths.traces_dir)?;

    parse_catalogue(DEFAULT_CATALOGUE).context("default catalogue")?;
    write_file(&paths.gitignore_path, SPINE_GITIGNORE)?;
    write_config(&paths.config_path, &SpineConfig::default())?;
    write_file(&paths.catalogue_path, DEFAULT_CATALOGUE)?;
    write_file(&paths.demo_scenario_path, DEMO_SCENARIO)?;

    Ok(paths)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("write file {}", path.display()))
}

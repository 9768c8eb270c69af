//! Engine configuration stored under `.spine/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::task::TaskSettings;
use crate::supervisor::SupervisorConfig;

/// Engine configuration (TOML).
///
/// Meant to be edited by hand. Missing fields fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SpineConfig {
    /// Pulses `spine run` executes before giving up on the goal.
    pub max_pulses: u64,

    pub tasks: TaskSettings,

    pub supervisor: SupervisorConfig,
}

impl Default for SpineConfig {
    fn default() -> Self {
        Self {
            max_pulses: 2_000,
            tasks: TaskSettings::default(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl SpineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_pulses == 0 {
            return Err(anyhow!("max_pulses must be > 0"));
        }
        let tasks = &self.tasks;
        if tasks.navigate_timeout_pulses == 0 {
            return Err(anyhow!("tasks.navigate_timeout_pulses must be > 0"));
        }
        if tasks.mine_timeout_pulses == 0 {
            return Err(anyhow!("tasks.mine_timeout_pulses must be > 0"));
        }
        if tasks.surface_timeout_pulses == 0 {
            return Err(anyhow!("tasks.surface_timeout_pulses must be > 0"));
        }
        if tasks.gather_search_radius == 0 {
            return Err(anyhow!("tasks.gather_search_radius must be > 0"));
        }
        if tasks.max_recipe_depth == 0 {
            return Err(anyhow!("tasks.max_recipe_depth must be > 0"));
        }
        if tasks.hunger_satisfied <= tasks.hunger_threshold {
            return Err(anyhow!(
                "tasks.hunger_satisfied ({}) must be above tasks.hunger_threshold ({})",
                tasks.hunger_satisfied,
                tasks.hunger_threshold
            ));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SpineConfig::default()`.
pub fn load_config(path: &Path) -> Result<SpineConfig> {
    if !path.exists() {
        let cfg = SpineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SpineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &SpineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

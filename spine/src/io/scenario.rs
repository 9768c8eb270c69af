//! Scenario files: a starting world, the agent's state and the goal to reach.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::catalogue::Catalogue;
use crate::core::types::{BlockKind, BlockPos, ItemId, ItemTarget};
use crate::sim::{GridWorld, MAX_VITAL, SimRules};

/// A scenario (TOML). Only `[[goal]]` is required.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Whether the resolver may craft, or only gather.
    #[serde(default = "default_crafting")]
    pub crafting: bool,
    #[serde(default)]
    pub agent: AgentSpec,
    #[serde(default)]
    pub inventory: BTreeMap<ItemId, u32>,
    /// Edible items and the hunger each restores.
    #[serde(default)]
    pub foods: BTreeMap<ItemId, u32>,
    /// Block kind -> item dropped when broken. Unlisted blocks drop themselves.
    #[serde(default)]
    pub drops: BTreeMap<BlockKind, ItemId>,
    #[serde(default)]
    pub rules: SimRules,
    pub goal: Vec<ItemTarget>,
    #[serde(default)]
    pub blocks: Vec<BlockSpec>,
    #[serde(default)]
    pub ground: Vec<GroundItem>,
}

fn default_crafting() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentSpec {
    pub position: BlockPos,
    pub health: u32,
    pub hunger: u32,
}

impl Default for AgentSpec {
    fn default() -> Self {
        Self {
            position: BlockPos::new(0, 64, 0),
            health: MAX_VITAL,
            hunger: MAX_VITAL,
        }
    }
}

/// Blocks of one kind placed at each of `at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockSpec {
    pub kind: BlockKind,
    pub at: Vec<BlockPos>,
}

/// A dropped item lying in the world at the start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroundItem {
    pub item: ItemId,
    #[serde(default = "default_ground_count")]
    pub count: u32,
    pub at: BlockPos,
}

fn default_ground_count() -> u32 {
    1
}

impl Scenario {
    /// Structural checks serde cannot express; returns stable messages.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.goal.is_empty() {
            errors.push("goal: at least one target is required".to_string());
        }
        for (index, target) in self.goal.iter().enumerate() {
            if target.items.is_empty() {
                errors.push(format!("goal[{}]: items must not be empty", index));
            }
            if target.count == 0 {
                errors.push(format!("goal[{}]: count must be > 0", index));
            }
        }
        if self.agent.health > MAX_VITAL || self.agent.hunger > MAX_VITAL {
            errors.push(format!("agent: health and hunger must be <= {}", MAX_VITAL));
        }
        if self.rules.swings_to_break == 0 {
            errors.push("rules.swings_to_break must be > 0".to_string());
        }
        let mut occupied = BTreeSet::new();
        for spec in &self.blocks {
            for pos in &spec.at {
                if !occupied.insert(*pos) {
                    errors.push(format!("blocks: position {} is used twice", pos));
                }
            }
        }
        for (index, ground) in self.ground.iter().enumerate() {
            if ground.count == 0 {
                errors.push(format!("ground[{}]: count must be > 0", index));
            }
        }
        errors
    }

    /// Edible items, in name order.
    pub fn food_items(&self) -> Vec<ItemId> {
        self.foods.keys().cloned().collect()
    }

    /// Build the starting world for this scenario.
    pub fn build_world(&self, catalogue: &Catalogue) -> GridWorld {
        let mut world = GridWorld::new(catalogue.clone(), self.rules.clone())
            .with_position(self.agent.position)
            .with_vitals(self.agent.health, self.agent.hunger);
        for (item, count) in &self.inventory {
            world = world.with_item(item.clone(), *count);
        }
        for (item, restores) in &self.foods {
            world = world.with_food(item.clone(), *restores);
        }
        for (kind, item) in &self.drops {
            world = world.with_drop(kind.clone(), item.clone());
        }
        for spec in &self.blocks {
            for pos in &spec.at {
                world = world.with_block(*pos, spec.kind.clone());
            }
        }
        for ground in &self.ground {
            world = world.with_ground_item(ground.at, ground.item.clone(), ground.count);
        }
        world
    }
}

/// Load and validate a scenario from disk.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read scenario {}", path.display()))?;
    parse_scenario(&contents).with_context(|| format!("load scenario {}", path.display()))
}

pub fn parse_scenario(contents: &str) -> Result<Scenario> {
    let scenario: Scenario = toml::from_str(contents).context("parse scenario toml")?;
    let errors = scenario.validate();
    if !errors.is_empty() {
        return Err(anyhow!("scenario invalid:\n- {}", errors.join("\n- ")));
    }
    Ok(scenario)
}

//! Static recipe and source catalogue, read-only to the engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{BlockKind, ItemId};

/// One crafting recipe: `ingredients` per batch produce `output_count` items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(rename = "yield")]
    pub output_count: u32,
    pub ingredients: BTreeMap<ItemId, u32>,
}

impl Recipe {
    /// Number of batches needed to produce at least `need` items.
    pub fn batches_for(&self, need: u32) -> u32 {
        need.div_ceil(self.output_count.max(1))
    }

    /// Ingredient totals for `batches` crafts, in ingredient order.
    pub fn requirements(&self, batches: u32) -> Vec<(ItemId, u32)> {
        self.ingredients
            .iter()
            .map(|(item, per_batch)| (item.clone(), per_batch.saturating_mul(batches)))
            .collect()
    }
}

/// Item → recipe and item → source-block mappings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalogue {
    #[serde(default)]
    pub recipes: BTreeMap<ItemId, Recipe>,
    #[serde(default)]
    pub sources: BTreeMap<ItemId, Vec<BlockKind>>,
}

impl Catalogue {
    pub fn recipe(&self, item: &ItemId) -> Option<&Recipe> {
        self.recipes.get(item)
    }

    /// Source blocks for `item`; `None` when there are none.
    pub fn sources(&self, item: &ItemId) -> Option<&[BlockKind]> {
        self.sources
            .get(item)
            .map(Vec::as_slice)
            .filter(|sources| !sources.is_empty())
    }

    /// True if `item` has a recipe whose every ingredient is itself obtainable
    /// within `depth` levels of nesting.
    pub fn can_craft(&self, item: &ItemId, depth: u32) -> bool {
        if depth == 0 {
            return false;
        }
        let Some(recipe) = self.recipe(item) else {
            return false;
        };
        recipe
            .ingredients
            .keys()
            .all(|ingredient| self.is_obtainable(ingredient, true, depth - 1))
    }

    /// True if `item` can be produced from scratch by crafting (when enabled)
    /// or gathering.
    pub fn is_obtainable(&self, item: &ItemId, crafting: bool, depth: u32) -> bool {
        if depth == 0 {
            return false;
        }
        (crafting && self.can_craft(item, depth)) || self.sources(item).is_some()
    }

    pub fn with_recipe(mut self, output: &str, output_count: u32, ingredients: &[(&str, u32)]) -> Self {
        self.recipes.insert(
            ItemId::from(output),
            Recipe {
                output_count,
                ingredients: ingredients
                    .iter()
                    .map(|(item, count)| (ItemId::from(*item), *count))
                    .collect(),
            },
        );
        self
    }

    pub fn with_source(mut self, item: &str, blocks: &[&str]) -> Self {
        self.sources.insert(
            ItemId::from(item),
            blocks.iter().map(|block| BlockKind::from(*block)).collect(),
        );
        self
    }
}

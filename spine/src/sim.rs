//! Deterministic grid world implementing the environment boundary.
//!
//! Motor commands are only recorded when issued; [`GridWorld::advance`]
//! applies them between pulses, so every effect becomes visible one pulse
//! later at the earliest. Movement is one block per advance, a surface opens
//! on the advance after it was requested, and a block breaks after
//! `swings_to_break` swings from within reach.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::catalogue::Catalogue;
use crate::core::types::{BlockKind, BlockPos, Inventory, ItemId};
use crate::env::{
    Activation, ContainerClick, EntityKind, EntitySnapshot, Motor, SelfStatus, Surface, WorldQuery,
};

/// Hunger and health are capped here.
pub const MAX_VITAL: u32 = 20;

/// Physics knobs for the grid world.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SimRules {
    pub swings_to_break: u32,
    /// Max distance from which a swing lands.
    pub reach: u32,
    /// Dropped items within this distance are picked up automatically.
    pub pickup_radius: u32,
    /// Entities beyond this distance are not reported.
    pub view_distance: u32,
    /// Lose one hunger point every this many advances; 0 disables decay.
    pub hunger_decay_pulses: u64,
}

impl Default for SimRules {
    fn default() -> Self {
        Self {
            swings_to_break: 3,
            reach: 3,
            pickup_radius: 1,
            view_distance: 32,
            hunger_decay_pulses: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PendingMotor {
    swing: Option<BlockPos>,
    open: Option<Surface>,
    close: bool,
    craft: Option<(ItemId, u32)>,
    use_held: bool,
}

#[derive(Debug, Clone)]
pub struct GridWorld {
    catalogue: Catalogue,
    rules: SimRules,
    blocks: BTreeMap<BlockPos, BlockKind>,
    drop_table: BTreeMap<BlockKind, ItemId>,
    foods: BTreeMap<ItemId, u32>,
    entities: Vec<EntitySnapshot>,
    next_entity_id: u64,
    status: SelfStatus,
    inventory: Inventory,
    equipped: Option<ItemId>,
    surface: Option<Surface>,
    movement_intent: Option<BlockPos>,
    look: Option<BlockPos>,
    damage: BTreeMap<BlockPos, u32>,
    pending: PendingMotor,
    ticks: u64,
}

impl GridWorld {
    pub fn new(catalogue: Catalogue, rules: SimRules) -> Self {
        Self {
            catalogue,
            rules,
            blocks: BTreeMap::new(),
            drop_table: BTreeMap::new(),
            foods: BTreeMap::new(),
            entities: Vec::new(),
            next_entity_id: 1,
            status: SelfStatus {
                position: BlockPos::new(0, 64, 0),
                health: MAX_VITAL,
                hunger: MAX_VITAL,
            },
            inventory: Inventory::new(),
            equipped: None,
            surface: None,
            movement_intent: None,
            look: None,
            damage: BTreeMap::new(),
            pending: PendingMotor::default(),
            ticks: 0,
        }
    }

    pub fn with_position(mut self, position: BlockPos) -> Self {
        self.status.position = position;
        self
    }

    pub fn with_vitals(mut self, health: u32, hunger: u32) -> Self {
        self.status.health = health.min(MAX_VITAL);
        self.status.hunger = hunger.min(MAX_VITAL);
        self
    }

    pub fn with_block(mut self, pos: BlockPos, kind: BlockKind) -> Self {
        self.blocks.insert(pos, kind);
        self
    }

    pub fn with_item(mut self, item: ItemId, count: u32) -> Self {
        self.inventory.add(item, count);
        self
    }

    /// Breaking `kind` drops `item` instead of an item named after the block.
    pub fn with_drop(mut self, kind: BlockKind, item: ItemId) -> Self {
        self.drop_table.insert(kind, item);
        self
    }

    /// `item` restores `hunger` points when used.
    pub fn with_food(mut self, item: ItemId, hunger: u32) -> Self {
        self.foods.insert(item, hunger);
        self
    }

    pub fn with_ground_item(mut self, pos: BlockPos, item: ItemId, count: u32) -> Self {
        self.spawn_drop(pos, item, count);
        self
    }

    pub fn movement_intent(&self) -> Option<BlockPos> {
        self.movement_intent
    }

    pub fn look(&self) -> Option<BlockPos> {
        self.look
    }

    pub fn equipped(&self) -> Option<&ItemId> {
        self.equipped.as_ref()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Apply everything the motor was asked to do since the last advance.
    pub fn advance(&mut self) {
        let pending = std::mem::take(&mut self.pending);

        if let Some(target) = self.movement_intent {
            if self.status.position != target {
                self.status.position = self.status.position.step_toward(&target);
                trace!(position = %self.status.position, target = %target, "moved");
            }
        }
        self.pick_up();

        if let Some(target) = pending.swing {
            self.swing(target);
        }
        if let Some((output, batches)) = pending.craft {
            self.craft(&output, batches);
        }
        if pending.use_held {
            self.use_held();
        }
        if pending.close {
            self.surface = None;
        } else if let Some(surface) = pending.open {
            self.surface = Some(surface);
        }

        self.ticks += 1;
        let decay = self.rules.hunger_decay_pulses;
        if decay > 0 && self.ticks % decay == 0 {
            self.status.hunger = self.status.hunger.saturating_sub(1);
        }
    }

    fn pick_up(&mut self) {
        let position = self.status.position;
        let radius = self.rules.pickup_radius;
        let mut kept = Vec::with_capacity(self.entities.len());
        for entity in std::mem::take(&mut self.entities) {
            match &entity.kind {
                EntityKind::DroppedItem { item, count } if entity.position.within(&position, radius) => {
                    debug!(item = %item, count, "picked up");
                    self.inventory.add(item.clone(), *count);
                }
                _ => kept.push(entity),
            }
        }
        self.entities = kept;
    }

    fn swing(&mut self, target: BlockPos) {
        if !self.status.position.within(&target, self.rules.reach) {
            trace!(target = %target, "swing out of reach");
            return;
        }
        let Some(kind) = self.blocks.get(&target).cloned() else {
            return;
        };
        let hits = self.damage.entry(target).or_insert(0);
        *hits += 1;
        if *hits < self.rules.swings_to_break {
            return;
        }
        self.damage.remove(&target);
        self.blocks.remove(&target);
        let item = self
            .drop_table
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| ItemId::new(kind.as_str()));
        debug!(pos = %target, kind = %kind, item = %item, "block broken");
        self.spawn_drop(target, item, 1);
    }

    fn craft(&mut self, output: &ItemId, batches: u32) {
        if self.surface != Some(Surface::Crafting) {
            debug!(output = %output, "craft click without open surface");
            return;
        }
        let Some(recipe) = self.catalogue.recipe(output) else {
            debug!(output = %output, "craft click for unknown recipe");
            return;
        };
        let requirements = recipe.requirements(batches);
        let affordable = requirements
            .iter()
            .all(|(ingredient, required)| self.inventory.count(ingredient) >= *required);
        if !affordable {
            debug!(output = %output, batches, "craft click without ingredients");
            return;
        }
        for (ingredient, required) in &requirements {
            self.inventory.remove(ingredient, *required);
        }
        let produced = recipe.output_count.saturating_mul(batches);
        self.inventory.add(output.clone(), produced);
        debug!(output = %output, produced, "crafted");
    }

    fn use_held(&mut self) {
        let Some(item) = self.equipped.clone() else {
            return;
        };
        let Some(restores) = self.foods.get(&item).copied() else {
            return;
        };
        if self.inventory.remove(&item, 1) {
            self.status.hunger = self.status.hunger.saturating_add(restores).min(MAX_VITAL);
            debug!(food = %item, hunger = self.status.hunger, "ate");
        }
    }

    fn spawn_drop(&mut self, position: BlockPos, item: ItemId, count: u32) {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        self.entities.push(EntitySnapshot {
            id,
            position,
            kind: EntityKind::DroppedItem { item, count },
        });
    }
}

impl WorldQuery for GridWorld {
    fn block_at(&self, pos: BlockPos) -> Option<BlockKind> {
        self.blocks.get(&pos).cloned()
    }

    fn find_nearest(&self, kinds: &[BlockKind], radius: u32) -> Option<BlockPos> {
        let origin = self.status.position;
        self.blocks
            .iter()
            .filter(|(pos, kind)| kinds.contains(*kind) && pos.within(&origin, radius))
            .min_by_key(|(pos, _)| (pos.distance_sq(&origin), **pos))
            .map(|(pos, _)| *pos)
    }

    fn nearby_entities(&self) -> Vec<EntitySnapshot> {
        let origin = self.status.position;
        self.entities
            .iter()
            .filter(|entity| entity.position.within(&origin, self.rules.view_distance))
            .cloned()
            .collect()
    }

    fn inventory(&self) -> Inventory {
        self.inventory.clone()
    }

    fn status(&self) -> SelfStatus {
        self.status.clone()
    }

    fn open_surface(&self) -> Option<Surface> {
        self.surface
    }
}

impl Motor for GridWorld {
    fn set_movement_intent(&mut self, target: Option<BlockPos>) {
        self.movement_intent = target;
    }

    fn set_look(&mut self, target: Option<BlockPos>) {
        self.look = target;
    }

    fn activate(&mut self, activation: Activation) {
        match activation {
            Activation::Swing { target } => self.pending.swing = Some(target),
            Activation::UseHeld => self.pending.use_held = true,
        }
    }

    fn container_click(&mut self, click: ContainerClick) {
        match click {
            ContainerClick::Open { surface } => {
                self.pending.open = Some(surface);
                self.pending.close = false;
            }
            ContainerClick::Craft { output, batches } => self.pending.craft = Some((output, batches)),
            ContainerClick::Close => {
                self.pending.close = true;
                self.pending.open = None;
            }
        }
    }

    fn equip(&mut self, item: &ItemId) {
        if self.inventory.count(item) > 0 {
            self.equipped = Some(item.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::wood_catalogue;

    fn world() -> GridWorld {
        GridWorld::new(wood_catalogue(), SimRules::default())
    }

    #[test]
    fn movement_takes_one_step_per_advance() {
        let mut world = world();
        world.set_movement_intent(Some(BlockPos::new(2, 64, 0)));
        assert_eq!(world.status().position, BlockPos::new(0, 64, 0));

        world.advance();
        assert_eq!(world.status().position, BlockPos::new(1, 64, 0));
        world.advance();
        world.advance();
        assert_eq!(world.status().position, BlockPos::new(2, 64, 0));
    }

    #[test]
    fn block_breaks_after_enough_swings_and_drops_item() {
        let pos = BlockPos::new(1, 64, 0);
        let mut world = world()
            .with_block(pos, "oak_log".into())
            .with_drop("oak_log".into(), "log".into());

        for _ in 0..2 {
            world.activate(Activation::Swing { target: pos });
            world.advance();
        }
        assert_eq!(world.block_at(pos), Some(BlockKind::from("oak_log")));

        world.activate(Activation::Swing { target: pos });
        world.advance();
        assert_eq!(world.block_at(pos), None);
        // Drop lands within pickup radius and is collected on the next advance.
        world.advance();
        assert_eq!(world.inventory().count(&"log".into()), 1);
        assert!(world.nearby_entities().is_empty());
    }

    #[test]
    fn swing_out_of_reach_does_nothing() {
        let pos = BlockPos::new(10, 64, 0);
        let mut world = world().with_block(pos, "oak_log".into());
        for _ in 0..5 {
            world.activate(Activation::Swing { target: pos });
            world.advance();
        }
        assert_eq!(world.block_at(pos), Some(BlockKind::from("oak_log")));
    }

    #[test]
    fn surface_opens_one_advance_later_and_craft_needs_it() {
        let mut world = world().with_item("planks".into(), 2);
        world.container_click(ContainerClick::Craft {
            output: "stick".into(),
            batches: 1,
        });
        world.advance();
        assert_eq!(world.inventory().count(&"stick".into()), 0);

        world.container_click(ContainerClick::Open {
            surface: Surface::Crafting,
        });
        assert_eq!(world.open_surface(), None);
        world.advance();
        assert_eq!(world.open_surface(), Some(Surface::Crafting));

        world.container_click(ContainerClick::Craft {
            output: "stick".into(),
            batches: 1,
        });
        world.advance();
        assert_eq!(world.inventory().count(&"stick".into()), 4);
        assert_eq!(world.inventory().count(&"planks".into()), 0);
    }

    #[test]
    fn eating_restores_hunger_up_to_cap() {
        let mut world = world()
            .with_item("bread".into(), 2)
            .with_food("bread".into(), 15)
            .with_vitals(20, 10);
        world.equip(&"bread".into());
        world.activate(Activation::UseHeld);
        world.advance();
        assert_eq!(world.status().hunger, MAX_VITAL);
        assert_eq!(world.inventory().count(&"bread".into()), 1);
    }

    #[test]
    fn hunger_decays_when_enabled() {
        let rules = SimRules {
            hunger_decay_pulses: 2,
            ..SimRules::default()
        };
        let mut world = GridWorld::new(Catalogue::default(), rules);
        for _ in 0..4 {
            world.advance();
        }
        assert_eq!(world.status().hunger, MAX_VITAL - 2);
    }
}

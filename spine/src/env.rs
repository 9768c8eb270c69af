//! Boundary to the live environment: read-only world queries and
//! fire-and-forget motor commands.
//!
//! Nothing here is implemented by the engine itself. Motor calls are
//! unconfirmed; tasks must re-verify their effect through [`WorldQuery`] on a
//! later pulse.

use serde::{Deserialize, Serialize};

use crate::core::types::{BlockKind, BlockPos, Inventory, ItemId};

/// Vital signs and position of the controlled agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfStatus {
    pub position: BlockPos,
    pub health: u32,
    pub hunger: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityKind {
    DroppedItem { item: ItemId, count: u32 },
    Hostile { name: String },
    Passive { name: String },
}

/// One entry of the nearby-entities snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: u64,
    pub position: BlockPos,
    pub kind: EntityKind,
}

/// Interaction surfaces that a container click can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Crafting,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ContainerClick {
    Open { surface: Surface },
    Craft { output: ItemId, batches: u32 },
    Close,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Activation {
    /// Swing at the block at a position.
    Swing { target: BlockPos },
    /// Use whatever is held (eat, drink, …).
    UseHeld,
}

/// Read-only world state, polled fresh every pulse.
pub trait WorldQuery {
    fn block_at(&self, pos: BlockPos) -> Option<BlockKind>;

    /// Nearest block of any of `kinds` within `radius` of the agent.
    fn find_nearest(&self, kinds: &[BlockKind], radius: u32) -> Option<BlockPos>;

    fn nearby_entities(&self) -> Vec<EntitySnapshot>;

    fn inventory(&self) -> Inventory;

    fn status(&self) -> SelfStatus;

    /// The currently open interaction surface, if any.
    fn open_surface(&self) -> Option<Surface>;
}

/// Fire-and-forget actuation. Effects become visible asynchronously.
pub trait Motor {
    /// `None` clears any movement intent.
    fn set_movement_intent(&mut self, target: Option<BlockPos>);

    /// `None` releases the look lock.
    fn set_look(&mut self, target: Option<BlockPos>);

    fn activate(&mut self, activation: Activation);

    fn container_click(&mut self, click: ContainerClick);

    fn equip(&mut self, item: &ItemId);
}

/// Everything a task may touch: one value implementing both halves.
pub trait Environment: WorldQuery + Motor {}

impl<T: WorldQuery + Motor> Environment for T {}

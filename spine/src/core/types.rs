//! Value types shared by tasks, the resolver and the environment boundary.
//!
//! These are plain data: cheap to clone, comparable, and serializable so that
//! scenarios and pulse traces can carry them verbatim.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an inventory item (e.g. `"stick"`, `"oak_planks"`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a kind of world block (an environment source).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockKind(String);

impl BlockKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockKind {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Integer world coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Squared euclidean distance.
    pub fn distance_sq(&self, other: &BlockPos) -> i64 {
        let dx = i64::from(self.x - other.x);
        let dy = i64::from(self.y - other.y);
        let dz = i64::from(self.z - other.z);
        dx * dx + dy * dy + dz * dz
    }

    pub fn within(&self, other: &BlockPos, radius: u32) -> bool {
        let r = i64::from(radius);
        self.distance_sq(other) <= r * r
    }

    /// One unit step toward `target`, resolving x before z before y.
    pub fn step_toward(&self, target: &BlockPos) -> BlockPos {
        let mut next = *self;
        if self.x != target.x {
            next.x += (target.x - self.x).signum();
        } else if self.z != target.z {
            next.z += (target.z - self.z).signum();
        } else if self.y != target.y {
            next.y += (target.y - self.y).signum();
        }
        next
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Snapshot of item counts. Re-read from the environment every pulse.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory(BTreeMap<ItemId, u32>);

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, item: &ItemId) -> u32 {
        self.0.get(item).copied().unwrap_or(0)
    }

    /// Total count over a set of interchangeable items.
    pub fn count_any(&self, items: &[ItemId]) -> u32 {
        items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(self.count(item)))
    }

    pub fn add(&mut self, item: ItemId, amount: u32) {
        if amount == 0 {
            return;
        }
        let slot = self.0.entry(item).or_insert(0);
        *slot = slot.saturating_add(amount);
    }

    /// Remove `amount` of `item`; returns false (and removes nothing) if short.
    pub fn remove(&mut self, item: &ItemId, amount: u32) -> bool {
        let have = self.count(item);
        if have < amount {
            return false;
        }
        if have == amount {
            self.0.remove(item);
        } else {
            self.0.insert(item.clone(), have - amount);
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, u32)> {
        self.0.iter().map(|(item, count)| (item, *count))
    }
}

impl FromIterator<(ItemId, u32)> for Inventory {
    fn from_iter<T: IntoIterator<Item = (ItemId, u32)>>(iter: T) -> Self {
        let mut inventory = Inventory::new();
        for (item, count) in iter {
            inventory.add(item, count);
        }
        inventory
    }
}

/// "Have at least `count` of any of `items` in inventory."
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTarget {
    pub items: Vec<ItemId>,
    pub count: u32,
}

impl ItemTarget {
    pub fn new(item: impl Into<ItemId>, count: u32) -> Self {
        Self {
            items: vec![item.into()],
            count,
        }
    }

    pub fn any_of(items: Vec<ItemId>, count: u32) -> Self {
        Self { items, count }
    }

    /// Remaining need against a live inventory read, saturating at zero.
    pub fn remaining(&self, inventory: &Inventory) -> u32 {
        self.count.saturating_sub(inventory.count_any(&self.items))
    }

    pub fn is_satisfied(&self, inventory: &Inventory) -> bool {
        self.remaining(inventory) == 0
    }
}

impl fmt::Display for ItemTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.items.iter().map(ItemId::as_str).collect();
        write!(f, "{}x{}", self.count, names.join("|"))
    }
}

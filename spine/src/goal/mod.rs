//! Goal resolution: decompose item quantity goals into craft and gather work.

pub mod craft;
pub mod hooks;
pub mod resolver;

pub use craft::CraftWithIngredients;
pub use hooks::{NoHook, PickupDrops, ResourceHook};
pub use resolver::ResourceGoal;

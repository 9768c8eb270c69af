//! Extension points run by the resolver before its generic craft/gather logic.

use crate::core::task::{Task, TaskContext};
use crate::core::types::ItemTarget;
use crate::env::EntityKind;
use crate::tasks::navigate::NavigateTask;

/// Strategy consulted first on every resolver tick.
///
/// Hooks are part of the resolver's identity: two resolvers with unequal
/// hooks are different work.
pub trait ResourceHook: PartialEq + 'static {
    /// Return a delegate to run instead of the generic plan this pulse.
    fn on_resource_tick(
        &mut self,
        ctx: &mut TaskContext<'_>,
        unmet: &[&ItemTarget],
    ) -> Option<Box<dyn Task>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoHook;

impl ResourceHook for NoHook {
    fn on_resource_tick(
        &mut self,
        _ctx: &mut TaskContext<'_>,
        _unmet: &[&ItemTarget],
    ) -> Option<Box<dyn Task>> {
        None
    }
}

/// Walk onto dropped items that satisfy an unmet target before planning
/// anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickupDrops {
    radius: u32,
}

impl PickupDrops {
    pub fn new(radius: u32) -> Self {
        Self { radius }
    }
}

impl ResourceHook for PickupDrops {
    fn on_resource_tick(
        &mut self,
        ctx: &mut TaskContext<'_>,
        unmet: &[&ItemTarget],
    ) -> Option<Box<dyn Task>> {
        let origin = ctx.status().position;
        ctx.env
            .nearby_entities()
            .into_iter()
            .filter(|entity| entity.position.within(&origin, self.radius))
            .filter(|entity| match &entity.kind {
                EntityKind::DroppedItem { item, .. } => {
                    unmet.iter().any(|target| target.items.contains(item))
                }
                _ => false,
            })
            .min_by_key(|entity| (entity.position.distance_sq(&origin), entity.id))
            .map(|entity| Box::new(NavigateTask::new(entity.position, 0)) as Box<dyn Task>)
    }
}

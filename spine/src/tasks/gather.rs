//! Collect an item by mining its source blocks and picking up the drops.

use tracing::{debug, warn};

use crate::core::task::{Task, TaskContext, downcast};
use crate::core::types::{BlockKind, ItemId};
use crate::env::EntityKind;
use crate::tasks::mine::MineBlockTask;
use crate::tasks::navigate::NavigateTask;

/// Hold at least `count` of `item`, mined from any of `sources`.
pub struct GatherTask {
    item: ItemId,
    count: u32,
    sources: Vec<BlockKind>,
    done: bool,
    failed: bool,
}

impl GatherTask {
    pub fn new(item: ItemId, count: u32, sources: Vec<BlockKind>) -> Self {
        Self {
            item,
            count,
            sources,
            done: false,
            failed: false,
        }
    }
}

impl Task for GatherTask {
    fn label(&self) -> String {
        let sources: Vec<&str> = self.sources.iter().map(BlockKind::as_str).collect();
        format!("gather {}x{} from [{}]", self.count, self.item, sources.join(", "))
    }

    fn on_start(&mut self, _ctx: &mut TaskContext<'_>) {}

    fn on_tick(&mut self, ctx: &mut TaskContext<'_>) -> Option<Box<dyn Task>> {
        if self.done || self.failed {
            return None;
        }
        if ctx.inventory().count(&self.item) >= self.count {
            debug!(item = %self.item, count = self.count, "gathered");
            self.done = true;
            return None;
        }

        let origin = ctx.status().position;
        let radius = ctx.settings.gather_search_radius;
        let drop = ctx
            .env
            .nearby_entities()
            .into_iter()
            .filter(|entity| {
                matches!(&entity.kind, EntityKind::DroppedItem { item, .. } if *item == self.item)
                    && entity.position.within(&origin, radius)
            })
            .min_by_key(|entity| (entity.position.distance_sq(&origin), entity.id));
        if let Some(entity) = drop {
            return Some(Box::new(NavigateTask::new(entity.position, 0)));
        }

        let Some(pos) = ctx.env.find_nearest(&self.sources, radius) else {
            warn!(item = %self.item, radius, "no source block in range");
            self.failed = true;
            return None;
        };
        let Some(kind) = ctx.env.block_at(pos) else {
            // Vanished between queries; look again next pulse.
            return None;
        };
        Some(Box::new(MineBlockTask::new(pos, kind)))
    }

    fn on_stop(&mut self, _ctx: &mut TaskContext<'_>, _preemptor: Option<&dyn Task>) {}

    fn on_child_finished(&mut self, _ctx: &mut TaskContext<'_>, child: &dyn Task) {
        if child.is_failed() {
            warn!(item = %self.item, child = %child.label(), "gather step failed");
            self.failed = true;
        }
    }

    fn is_finished(&self) -> bool {
        self.done || self.failed
    }

    fn is_failed(&self) -> bool {
        self.failed
    }

    // Search radius comes from settings, not the request, so it is not compared.
    fn is_equal(&self, other: &dyn Task) -> bool {
        downcast::<Self>(other).is_some_and(|other| {
            other.item == self.item && other.count == self.count && other.sources == self.sources
        })
    }
}

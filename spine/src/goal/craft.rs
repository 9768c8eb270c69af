//! "Resolve ingredients, then craft" composite.

use tracing::{debug, warn};

use crate::core::task::{Task, TaskContext, downcast};
use crate::core::types::{ItemId, ItemTarget};
use crate::goal::resolver::ResourceGoal;
use crate::tasks::craft::CraftTask;

/// Hold `total` of `output`, crafting whatever is missing.
///
/// While any ingredient is short, delegates to a nested resolver over the
/// full requirement list (satisfied entries included, so the nested resolver
/// stays the same work as ingredients trickle in). Once every ingredient is
/// held, delegates to the craft leaf.
pub struct CraftWithIngredients {
    output: ItemId,
    total: u32,
    done: bool,
    failed: bool,
}

impl CraftWithIngredients {
    pub fn new(output: ItemId, total: u32) -> Self {
        Self {
            output,
            total,
            done: false,
            failed: false,
        }
    }
}

impl Task for CraftWithIngredients {
    fn label(&self) -> String {
        format!("obtain {}x{} by crafting", self.total, self.output)
    }

    fn on_start(&mut self, _ctx: &mut TaskContext<'_>) {}

    fn on_tick(&mut self, ctx: &mut TaskContext<'_>) -> Option<Box<dyn Task>> {
        if self.done || self.failed {
            return None;
        }
        let inventory = ctx.inventory();
        let need = self.total.saturating_sub(inventory.count(&self.output));
        if need == 0 {
            debug!(output = %self.output, total = self.total, "crafted enough");
            self.done = true;
            return None;
        }
        let Some(recipe) = ctx.catalogue.recipe(&self.output) else {
            warn!(output = %self.output, "recipe disappeared");
            self.failed = true;
            return None;
        };

        let batches = recipe.batches_for(need);
        let requirements = recipe.requirements(batches);
        let short = requirements
            .iter()
            .any(|(ingredient, required)| inventory.count(ingredient) < *required);
        if short {
            let targets = requirements
                .into_iter()
                .map(|(ingredient, required)| ItemTarget::new(ingredient, required))
                .collect();
            return Some(Box::new(ResourceGoal::new(targets, true)));
        }
        Some(Box::new(CraftTask::new(self.output.clone(), batches)))
    }

    fn on_stop(&mut self, _ctx: &mut TaskContext<'_>, _preemptor: Option<&dyn Task>) {}

    fn on_child_finished(&mut self, _ctx: &mut TaskContext<'_>, child: &dyn Task) {
        if child.is_failed() {
            warn!(output = %self.output, child = %child.label(), "craft step failed");
            self.failed = true;
        }
    }

    fn is_finished(&self) -> bool {
        self.done || self.failed
    }

    fn is_failed(&self) -> bool {
        self.failed
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        downcast::<Self>(other).is_some_and(|other| other.output == self.output && other.total == self.total)
    }
}

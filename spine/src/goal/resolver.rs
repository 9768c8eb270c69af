//! Resource goal resolver: turn "hold N of item X" into craft and gather work.
//!
//! The resolver never acts on the environment. Every tick it re-reads the
//! inventory, and either reports done, reports failure, or returns a delegate:
//!
//! - the hook's delegate, if the hook wants one;
//! - else a craft composite for the first unmet target whose recipe can be
//!   resolved (crafting enabled only);
//! - else a gather task over the item's source blocks;
//! - else failure. There is no retry at this layer.

use tracing::{debug, warn};

use crate::core::catalogue::Recipe;
use crate::core::task::{Task, TaskContext, downcast};
use crate::core::types::{Inventory, ItemTarget};
use crate::goal::craft::CraftWithIngredients;
use crate::goal::hooks::{NoHook, ResourceHook};
use crate::tasks::gather::GatherTask;

pub struct ResourceGoal<H = NoHook> {
    targets: Vec<ItemTarget>,
    crafting: bool,
    hook: H,
    done: bool,
    failed: bool,
}

impl ResourceGoal<NoHook> {
    pub fn new(targets: Vec<ItemTarget>, crafting: bool) -> Self {
        Self::with_hook(targets, crafting, NoHook)
    }
}

impl<H: ResourceHook> ResourceGoal<H> {
    pub fn with_hook(targets: Vec<ItemTarget>, crafting: bool, hook: H) -> Self {
        Self {
            targets,
            crafting,
            hook,
            done: false,
            failed: false,
        }
    }

    pub fn targets(&self) -> &[ItemTarget] {
        &self.targets
    }
}

impl<H: ResourceHook> Task for ResourceGoal<H> {
    fn label(&self) -> String {
        let targets: Vec<String> = self.targets.iter().map(ToString::to_string).collect();
        format!("resolve [{}]", targets.join(", "))
    }

    fn on_start(&mut self, _ctx: &mut TaskContext<'_>) {}

    fn on_tick(&mut self, ctx: &mut TaskContext<'_>) -> Option<Box<dyn Task>> {
        if self.done || self.failed {
            return None;
        }
        let inventory = ctx.inventory();
        let unmet: Vec<&ItemTarget> = self
            .targets
            .iter()
            .filter(|target| !target.is_satisfied(&inventory))
            .collect();
        let Some(next) = unmet.first().copied() else {
            debug!(goal = %self.label(), "all targets satisfied");
            self.done = true;
            return None;
        };

        if let Some(delegate) = self.hook.on_resource_tick(ctx, &unmet) {
            return Some(delegate);
        }

        match plan(next, &inventory, self.crafting, ctx) {
            Some(delegate) => Some(delegate),
            None => {
                warn!(target = %next, "no recipe or source for target");
                self.failed = true;
                None
            }
        }
    }

    fn on_stop(&mut self, _ctx: &mut TaskContext<'_>, _preemptor: Option<&dyn Task>) {}

    fn on_child_finished(&mut self, _ctx: &mut TaskContext<'_>, child: &dyn Task) {
        if child.is_failed() {
            warn!(child = %child.label(), "resource step failed");
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
        downcast::<Self>(other).is_some_and(|other| {
            other.targets == self.targets && other.crafting == self.crafting && other.hook == self.hook
        })
    }
}

/// Choose craft or gather work for one unmet target.
fn plan(
    target: &ItemTarget,
    inventory: &Inventory,
    crafting: bool,
    ctx: &TaskContext<'_>,
) -> Option<Box<dyn Task>> {
    let need = target.remaining(inventory);
    let catalogue = ctx.catalogue;

    if crafting {
        for item in &target.items {
            let Some(recipe) = catalogue.recipe(item) else {
                continue;
            };
            let batches = recipe.batches_for(need);
            if recipe_resolvable(recipe, batches, inventory, ctx) {
                let total = inventory.count(item).saturating_add(need);
                return Some(Box::new(CraftWithIngredients::new(item.clone(), total)));
            }
        }
    }

    for item in &target.items {
        if let Some(sources) = catalogue.sources(item) {
            let total = inventory.count(item).saturating_add(need);
            return Some(Box::new(GatherTask::new(item.clone(), total, sources.to_vec())));
        }
    }
    None
}

/// Every ingredient is either already held in the needed amount or obtainable
/// through the catalogue.
pub(crate) fn recipe_resolvable(
    recipe: &Recipe,
    batches: u32,
    inventory: &Inventory,
    ctx: &TaskContext<'_>,
) -> bool {
    let depth = ctx.settings.max_recipe_depth.saturating_sub(1);
    recipe.requirements(batches).iter().all(|(ingredient, required)| {
        inventory.count(ingredient) >= *required || ctx.catalogue.is_obtainable(ingredient, true, depth)
    })
}

//! Eat until hunger is restored.

use tracing::warn;

use crate::core::task::{Task, TaskContext, downcast};
use crate::core::types::ItemId;
use crate::env::Activation;

pub struct EatTask {
    food: ItemId,
    done: bool,
    failed: bool,
}

impl EatTask {
    pub fn new(food: ItemId) -> Self {
        Self {
            food,
            done: false,
            failed: false,
        }
    }
}

impl Task for EatTask {
    fn label(&self) -> String {
        format!("eat {}", self.food)
    }

    fn on_start(&mut self, ctx: &mut TaskContext<'_>) {
        ctx.env.equip(&self.food);
    }

    fn on_tick(&mut self, ctx: &mut TaskContext<'_>) -> Option<Box<dyn Task>> {
        if self.done || self.failed {
            return None;
        }
        if ctx.status().hunger >= ctx.settings.hunger_satisfied {
            self.done = true;
            return None;
        }
        if ctx.inventory().count(&self.food) == 0 {
            warn!(food = %self.food, "out of food");
            self.failed = true;
            return None;
        }
        ctx.env.equip(&self.food);
        ctx.env.activate(Activation::UseHeld);
        None
    }

    fn on_stop(&mut self, _ctx: &mut TaskContext<'_>, _preemptor: Option<&dyn Task>) {}

    fn is_finished(&self) -> bool {
        self.done || self.failed
    }

    fn is_failed(&self) -> bool {
        self.failed
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        downcast::<Self>(other).is_some_and(|other| other.food == self.food)
    }
}

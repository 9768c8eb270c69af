//! Test-only doubles: a lifecycle journal, scripted tasks and a recording
//! environment.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::core::catalogue::Catalogue;
use crate::core::task::{Task, TaskContext, downcast};
use crate::core::types::{BlockKind, BlockPos, Inventory, ItemId};
use crate::env::{
    Activation, ContainerClick, EntitySnapshot, Motor, SelfStatus, Surface, WorldQuery,
};

/// Shared, ordered record of lifecycle calls.
#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

type DelegateFn = Rc<dyn Fn() -> Option<Box<dyn Task>>>;

/// Configurable task double that journals every lifecycle call.
///
/// Journal lines: `start:NAME`, `tick:NAME`, `stop:NAME<-PREEMPTOR|none`,
/// `child_finished:NAME<-CHILD`. Equality compares name and key.
pub struct ScriptedTask {
    name: String,
    key: u32,
    journal: Journal,
    delegate: Option<DelegateFn>,
    finish_after: Option<u32>,
    fails: bool,
    fails_with_child: bool,
    motor_target: Option<BlockPos>,
    ticks: u32,
    finished: bool,
}

impl ScriptedTask {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            key: 0,
            journal: journal.clone(),
            delegate: None,
            finish_after: None,
            fails: false,
            fails_with_child: false,
            motor_target: None,
            ticks: 0,
            finished: false,
        }
    }

    /// Distinguishes otherwise identical tasks for `is_equal`.
    pub fn keyed(mut self, key: u32) -> Self {
        self.key = key;
        self
    }

    /// Build a fresh delegate on every tick.
    pub fn delegating(mut self, make: impl Fn() -> Option<Box<dyn Task>> + 'static) -> Self {
        self.delegate = Some(Rc::new(make));
        self
    }

    /// Finish on the `ticks`-th tick.
    pub fn finishing_after(mut self, ticks: u32) -> Self {
        self.finish_after = Some(ticks);
        self
    }

    /// Report failure once finished.
    pub fn failing(mut self) -> Self {
        self.fails = true;
        self
    }

    /// Fail as soon as a child finishes in failure.
    pub fn failing_with_child(mut self) -> Self {
        self.fails_with_child = true;
        self
    }

    /// Hold a movement intent from start until stop.
    pub fn holding_motor(mut self, target: BlockPos) -> Self {
        self.motor_target = Some(target);
        self
    }

    pub fn boxed(self) -> Box<dyn Task> {
        Box::new(self)
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }
}

impl Task for ScriptedTask {
    fn label(&self) -> String {
        if self.key == 0 {
            self.name.clone()
        } else {
            format!("{}#{}", self.name, self.key)
        }
    }

    fn on_start(&mut self, ctx: &mut TaskContext<'_>) {
        self.journal.record(format!("start:{}", self.name));
        if let Some(target) = self.motor_target {
            ctx.env.set_movement_intent(Some(target));
        }
    }

    fn on_tick(&mut self, _ctx: &mut TaskContext<'_>) -> Option<Box<dyn Task>> {
        self.journal.record(format!("tick:{}", self.name));
        if self.finished {
            return None;
        }
        self.ticks += 1;
        if self.finish_after.is_some_and(|limit| self.ticks >= limit) {
            self.finished = true;
            return None;
        }
        self.delegate.as_ref().and_then(|make| make())
    }

    fn on_stop(&mut self, ctx: &mut TaskContext<'_>, preemptor: Option<&dyn Task>) {
        let by = preemptor
            .map(|task| task.label())
            .unwrap_or_else(|| "none".to_string());
        self.journal.record(format!("stop:{}<-{}", self.name, by));
        if self.motor_target.is_some() {
            ctx.env.set_movement_intent(None);
        }
    }

    fn on_child_finished(&mut self, _ctx: &mut TaskContext<'_>, child: &dyn Task) {
        self.journal
            .record(format!("child_finished:{}<-{}", self.name, child.label()));
        if self.fails_with_child && child.is_failed() {
            self.fails = true;
            self.finished = true;
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_failed(&self) -> bool {
        self.finished && self.fails
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        downcast::<Self>(other).is_some_and(|other| other.name == self.name && other.key == self.key)
    }
}

/// One recorded motor command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MotorCall {
    Move(Option<BlockPos>),
    Look(Option<BlockPos>),
    Activate(Activation),
    Click(ContainerClick),
    Equip(ItemId),
}

/// Static world double that records motor commands and applies none of them,
/// except that opening/closing a surface is reflected immediately.
#[derive(Debug, Clone)]
pub struct RecordingEnv {
    pub inventory: Inventory,
    pub status: SelfStatus,
    pub blocks: BTreeMap<BlockPos, BlockKind>,
    pub entities: Vec<EntitySnapshot>,
    pub surface: Option<Surface>,
    movement_intent: Option<BlockPos>,
    look: Option<BlockPos>,
    calls: Vec<MotorCall>,
}

impl Default for RecordingEnv {
    fn default() -> Self {
        Self {
            inventory: Inventory::new(),
            status: SelfStatus {
                position: BlockPos::new(0, 64, 0),
                health: 20,
                hunger: 20,
            },
            blocks: BTreeMap::new(),
            entities: Vec::new(),
            surface: None,
            movement_intent: None,
            look: None,
            calls: Vec::new(),
        }
    }
}

impl RecordingEnv {
    pub fn with_items(mut self, items: &[(&str, u32)]) -> Self {
        for (item, count) in items {
            self.inventory.add(ItemId::from(*item), *count);
        }
        self
    }

    pub fn with_block(mut self, pos: BlockPos, kind: &str) -> Self {
        self.blocks.insert(pos, BlockKind::from(kind));
        self
    }

    pub fn movement_intent(&self) -> Option<BlockPos> {
        self.movement_intent
    }

    pub fn look(&self) -> Option<BlockPos> {
        self.look
    }

    pub fn calls(&self) -> &[MotorCall] {
        &self.calls
    }
}

impl WorldQuery for RecordingEnv {
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
        self.entities.clone()
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

impl Motor for RecordingEnv {
    fn set_movement_intent(&mut self, target: Option<BlockPos>) {
        self.movement_intent = target;
        self.calls.push(MotorCall::Move(target));
    }

    fn set_look(&mut self, target: Option<BlockPos>) {
        self.look = target;
        self.calls.push(MotorCall::Look(target));
    }

    fn activate(&mut self, activation: Activation) {
        self.calls.push(MotorCall::Activate(activation));
    }

    fn container_click(&mut self, click: ContainerClick) {
        match &click {
            ContainerClick::Open { surface } => self.surface = Some(*surface),
            ContainerClick::Close => self.surface = None,
            ContainerClick::Craft { .. } => {}
        }
        self.calls.push(MotorCall::Click(click));
    }

    fn equip(&mut self, item: &ItemId) {
        self.calls.push(MotorCall::Equip(item.clone()));
    }
}

/// `log -> planks -> stick` with logs mined from oak or birch.
pub fn wood_catalogue() -> Catalogue {
    Catalogue::default()
        .with_recipe("planks", 4, &[("log", 1)])
        .with_recipe("stick", 4, &[("planks", 2)])
        .with_recipe("crafting_table", 1, &[("planks", 4)])
        .with_source("log", &["oak_log", "birch_log"])
}

/// Write `contents` under `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &str) -> Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    std::fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
}

/// Temporary directory for filesystem tests.
pub fn temp_dir() -> Result<tempfile::TempDir> {
    tempfile::tempdir().context("create tempdir")
}

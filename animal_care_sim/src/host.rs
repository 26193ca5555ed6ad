// Host ports — the capability interfaces the core consumes.
//
// The host world owns block data, entity lifecycle, persistent entity
// storage, inventories, and timers. The core never touches those directly;
// it reads and mutates them through the narrow traits in this file. Every
// method is infallible: a missing block reads as `Air`, a missing container
// as `None`, a missing creature as `None`. The core treats such absences as
// ordinary outcomes (see `enclosure.rs`, `trough.rs`).
//
// `Host` bundles every port; it has a blanket impl, so any type that
// implements the individual traits is a `Host`. Components take the
// narrowest bound they need (the classifier only needs `BlockGrid`).
//
// See also: `world.rs` for `HeadlessHost`, the in-memory implementation used
// by tests and the headless bridge; `event.rs` for `TickScheduler`, the
// reference `Scheduler`.
//
// **Critical constraint: single-threaded.** All port calls happen on the
// host's simulation thread. No port requires `Send` or `Sync`.

use crate::types::*;
use serde::{Deserialize, Serialize};

/// Point lookup of block materials.
pub trait BlockGrid {
    /// Material of the block at `pos` in `world`. Unloaded or unknown
    /// worlds read as `Air`.
    fn material(&self, world: &WorldName, pos: BlockPos) -> Material;

    fn material_at(&self, loc: &Location) -> Material {
        self.material(&loc.world, loc.pos)
    }
}

/// Visual open/closed sub-state of container blocks. Changing it must not
/// trigger block physics.
pub trait BlockStates {
    fn is_open(&self, loc: &Location) -> bool;
    fn set_open(&mut self, loc: &Location, open: bool);
}

/// What the core knows about a live creature at the moment of a query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatureRecord {
    pub id: CreatureId,
    pub species: Species,
    /// `None` when the creature has no world (removed, in transit).
    pub world: Option<WorldName>,
    pub position: Position,
    /// `false` once the host has despawned or killed the creature.
    pub valid: bool,
}

/// Entity queries.
pub trait CreatureSource {
    /// Every live creature across all loaded worlds.
    fn living_creatures(&self) -> Vec<CreatureRecord>;

    /// Live creatures inside the axis-aligned cube of half-extent `radius`
    /// around `center`.
    fn creatures_near(&self, world: &WorldName, center: Position, radius: f64)
    -> Vec<CreatureRecord>;

    fn creature(&self, id: CreatureId) -> Option<CreatureRecord>;
}

/// Persistent integer storage attached to a creature.
pub trait SatietyStore {
    fn get_int(&self, id: CreatureId, key: &str) -> Option<i64>;
    fn set_int(&mut self, id: CreatureId, key: &str, value: i64);
}

/// Status effects the ledger applies at low satiety.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectKind {
    Slowness,
    Weakness,
}

/// A timed status effect. Ambient effects show no particles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: EffectKind,
    pub duration_ticks: u32,
    pub amplifier: u8,
    pub ambient: bool,
    pub particles: bool,
}

/// Side effects on creatures.
pub trait CreatureEffects {
    /// Apply or refresh an effect.
    fn apply_effect(&mut self, id: CreatureId, effect: StatusEffect);
    fn clear_effect(&mut self, id: CreatureId, kind: EffectKind);
    fn damage(&mut self, id: CreatureId, amount: f64);
    /// Put the creature in love mode for `ticks`, crediting `cause`.
    fn start_breeding(&mut self, id: CreatureId, ticks: u32, cause: ActorId);
}

/// Inventory-bearing block metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub slots: usize,
    /// Custom display name, possibly with `§` formatting codes.
    pub custom_name: Option<String>,
}

/// Block inventories.
pub trait Containers {
    /// `None` if there is no inventory-bearing block at `loc`.
    fn container(&self, loc: &Location) -> Option<ContainerInfo>;
    fn slot(&self, loc: &Location, slot: usize) -> Option<ItemStack>;
    /// Replace a slot's content. `None` clears it.
    fn set_slot(&mut self, loc: &Location, slot: usize, stack: Option<ItemStack>);
    /// Add items, merging into existing stacks first. Returns whatever did
    /// not fit; `None` means everything was stored.
    fn add_item(&mut self, loc: &Location, stack: ItemStack) -> Option<ItemStack>;
}

/// Player inventories.
pub trait ActorInventory {
    fn held_item(&self, actor: ActorId, hand: Hand) -> Option<ItemStack>;
    fn set_held_item(&mut self, actor: ActorId, hand: Hand, stack: Option<ItemStack>);
    /// Creative-mode actors do not spend items.
    fn is_creative(&self, actor: ActorId) -> bool;
}

/// The host's simulation clock.
pub trait Clock {
    fn current_tick(&self) -> u64;
}

/// Periodic work the core registers with the host's scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CareJob {
    SatietyTick,
    EnclosureSweep,
    TroughCycle,
}

/// Periodic callback registration. When a timer fires the host calls
/// `AnimalCare::run_job` with the registered job.
pub trait Scheduler {
    /// Fire `job` every `period_ticks`, first one full period from now.
    fn schedule_repeating(&mut self, period_ticks: u64, job: CareJob) -> TimerId;
    fn cancel(&mut self, timer: TimerId);
}

/// Every host capability the service needs.
pub trait Host:
    BlockGrid
    + BlockStates
    + CreatureSource
    + SatietyStore
    + CreatureEffects
    + Containers
    + ActorInventory
    + Clock
{
}

impl<T> Host for T where
    T: BlockGrid
        + BlockStates
        + CreatureSource
        + SatietyStore
        + CreatureEffects
        + Containers
        + ActorInventory
        + Clock
{
}

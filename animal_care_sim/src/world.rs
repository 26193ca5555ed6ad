// Dense block grid and the in-memory host used outside a live server.
//
// `VoxelWorld` stores one world as a flat `Vec<Material>` indexed by
// `x + z * size_x + y * size_x * size_z`, giving O(1) reads and writes.
// Out-of-bounds reads return `Air`; out-of-bounds writes are no-ops. The
// flood fill in `enclosure.rs` relies on the first rule: a cell beyond the
// grid has nothing to stand on, so the search never walks off the edge.
//
// `HeadlessHost` implements every port in `host.rs` over plain
// collections: a set of named `VoxelWorld`s, container inventories keyed by
// location, a creature table, a per-creature integer store, and actor
// hands. It also records the side effects the service requests (status
// effects, damage, love mode) so tests and the headless bridge can inspect
// them afterwards. Every collection is a `BTreeMap`/`BTreeSet`, so query
// results come back in a stable order.
//
// See also: `host.rs` for the port traits, `walkable.rs` and
// `enclosure.rs` for the main readers of the grid,
// `animal_care_bridge::bridge` which drives a `HeadlessHost` from the
// command line.
//
// **Critical constraint: determinism.** Nothing in this file iterates a
// hash-ordered collection. Two hosts built by the same sequence of calls
// answer every query identically.

use crate::host::*;
use crate::types::*;
use std::collections::{BTreeMap, BTreeSet};

/// Largest stack `HeadlessHost` containers merge into.
pub const MAX_STACK: u32 = 64;

/// Slots in a freshly placed container.
pub const DEFAULT_CONTAINER_SLOTS: usize = 27;

// ---------------------------------------------------------------------------
// VoxelWorld
// ---------------------------------------------------------------------------

/// Dense 3D block grid for a single world.
#[derive(Clone, Debug, Default)]
pub struct VoxelWorld {
    /// Flat storage: index = x + z * size_x + y * size_x * size_z.
    blocks: Vec<Material>,
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
}

impl VoxelWorld {
    /// Create a new world filled with `Air`.
    pub fn new(size_x: u32, size_y: u32, size_z: u32) -> Self {
        let total = (size_x as usize) * (size_y as usize) * (size_z as usize);
        Self {
            blocks: vec![Material::Air; total],
            size_x,
            size_y,
            size_z,
        }
    }

    pub fn in_bounds(&self, pos: BlockPos) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && pos.z >= 0
            && (pos.x as u32) < self.size_x
            && (pos.y as u32) < self.size_y
            && (pos.z as u32) < self.size_z
    }

    fn index(&self, pos: BlockPos) -> Option<usize> {
        if !self.in_bounds(pos) {
            return None;
        }
        let sx = self.size_x as usize;
        let sz = self.size_z as usize;
        Some(pos.x as usize + pos.z as usize * sx + pos.y as usize * sx * sz)
    }

    /// Material at `pos`. Returns `Air` for out-of-bounds positions.
    pub fn get(&self, pos: BlockPos) -> Material {
        self.index(pos).map_or(Material::Air, |idx| self.blocks[idx])
    }

    /// Set the material at `pos`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, pos: BlockPos, material: Material) {
        if let Some(idx) = self.index(pos) {
            self.blocks[idx] = material;
        }
    }

    /// Fill the inclusive box between `a` and `b`.
    pub fn fill(&mut self, a: BlockPos, b: BlockPos, material: Material) {
        for y in a.y.min(b.y)..=a.y.max(b.y) {
            for z in a.z.min(b.z)..=a.z.max(b.z) {
                for x in a.x.min(b.x)..=a.x.max(b.x) {
                    self.set(BlockPos::new(x, y, z), material);
                }
            }
        }
    }

    /// Cover the whole layer at `y`.
    pub fn fill_layer(&mut self, y: i32, material: Material) {
        let max_x = self.size_x as i32 - 1;
        let max_z = self.size_z as i32 - 1;
        self.fill(BlockPos::new(0, y, 0), BlockPos::new(max_x, y, max_z), material);
    }

    /// Build a one-block-thick ring of `material` around the interior
    /// rectangle `min..=max` (inclusive, X/Z only), `height` blocks tall
    /// starting at `base_y`. The interior itself is left untouched.
    pub fn ring(
        &mut self,
        min: (i32, i32),
        max: (i32, i32),
        base_y: i32,
        height: i32,
        material: Material,
    ) {
        let (x0, z0) = (min.0 - 1, min.1 - 1);
        let (x1, z1) = (max.0 + 1, max.1 + 1);
        for y in base_y..base_y + height {
            for x in x0..=x1 {
                self.set(BlockPos::new(x, y, z0), material);
                self.set(BlockPos::new(x, y, z1), material);
            }
            for z in z0..=z1 {
                self.set(BlockPos::new(x0, y, z), material);
                self.set(BlockPos::new(x1, y, z), material);
            }
        }
    }
}

impl BlockGrid for VoxelWorld {
    fn material(&self, _world: &WorldName, pos: BlockPos) -> Material {
        self.get(pos)
    }
}

// ---------------------------------------------------------------------------
// HeadlessHost
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
struct ContainerState {
    custom_name: Option<String>,
    slots: Vec<Option<ItemStack>>,
}

#[derive(Clone, Debug, Default)]
struct ActorState {
    main_hand: Option<ItemStack>,
    off_hand: Option<ItemStack>,
    creative: bool,
}

/// A love-mode request recorded by `HeadlessHost`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BreedingRecord {
    pub ticks: u32,
    pub cause: ActorId,
}

/// In-memory implementation of every host port.
#[derive(Clone, Debug, Default)]
pub struct HeadlessHost {
    worlds: BTreeMap<WorldName, VoxelWorld>,
    open_blocks: BTreeSet<Location>,
    containers: BTreeMap<Location, ContainerState>,
    creatures: BTreeMap<CreatureId, CreatureRecord>,
    store: BTreeMap<(CreatureId, String), i64>,
    effects: BTreeMap<CreatureId, BTreeMap<EffectKind, StatusEffect>>,
    damage_taken: BTreeMap<CreatureId, f64>,
    breeding: BTreeMap<CreatureId, BreedingRecord>,
    actors: BTreeMap<ActorId, ActorState>,
    tick: u64,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_world(&mut self, name: WorldName, world: VoxelWorld) {
        self.worlds.insert(name, world);
    }

    pub fn world_mut(&mut self, name: &WorldName) -> Option<&mut VoxelWorld> {
        self.worlds.get_mut(name)
    }

    pub fn set_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    /// Change a block. Replacing an inventory block drops its contents and
    /// its open state.
    pub fn set_block(&mut self, loc: &Location, material: Material) {
        if let Some(world) = self.worlds.get_mut(&loc.world) {
            world.set(loc.pos, material);
        }
        if !material.has_inventory() {
            self.containers.remove(loc);
            self.open_blocks.remove(loc);
        }
    }

    /// Place an empty inventory block with an optional custom name.
    pub fn place_container(&mut self, loc: &Location, material: Material, name: Option<&str>) {
        self.set_block(loc, material);
        if material.has_inventory() {
            self.containers.insert(
                loc.clone(),
                ContainerState {
                    custom_name: name.map(String::from),
                    slots: vec![None; DEFAULT_CONTAINER_SLOTS],
                },
            );
        }
    }

    /// Every non-empty stack in the container, in slot order.
    pub fn container_items(&self, loc: &Location) -> Vec<ItemStack> {
        self.containers
            .get(loc)
            .map(|c| c.slots.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    pub fn spawn(&mut self, record: CreatureRecord) {
        self.creatures.insert(record.id, record);
    }

    /// Mark a creature as gone. Its record stays queryable but invalid.
    pub fn despawn(&mut self, id: CreatureId) {
        if let Some(record) = self.creatures.get_mut(&id) {
            record.valid = false;
            record.world = None;
        }
    }

    pub fn give(&mut self, actor: ActorId, hand: Hand, stack: Option<ItemStack>) {
        self.set_held_item(actor, hand, stack);
    }

    pub fn set_creative(&mut self, actor: ActorId, creative: bool) {
        self.actors.entry(actor).or_default().creative = creative;
    }

    pub fn active_effects(&self, id: CreatureId) -> Vec<StatusEffect> {
        self.effects
            .get(&id)
            .map(|m| m.values().copied().collect())
            .unwrap_or_default()
    }

    pub fn damage_taken(&self, id: CreatureId) -> f64 {
        self.damage_taken.get(&id).copied().unwrap_or(0.0)
    }

    pub fn breeding(&self, id: CreatureId) -> Option<BreedingRecord> {
        self.breeding.get(&id).copied()
    }
}

impl BlockGrid for HeadlessHost {
    fn material(&self, world: &WorldName, pos: BlockPos) -> Material {
        self.worlds.get(world).map_or(Material::Air, |w| w.get(pos))
    }
}

impl BlockStates for HeadlessHost {
    fn is_open(&self, loc: &Location) -> bool {
        self.open_blocks.contains(loc)
    }

    fn set_open(&mut self, loc: &Location, open: bool) {
        if open {
            self.open_blocks.insert(loc.clone());
        } else {
            self.open_blocks.remove(loc);
        }
    }
}

impl CreatureSource for HeadlessHost {
    fn living_creatures(&self) -> Vec<CreatureRecord> {
        self.creatures
            .values()
            .filter(|c| c.valid && c.world.is_some())
            .cloned()
            .collect()
    }

    fn creatures_near(
        &self,
        world: &WorldName,
        center: Position,
        radius: f64,
    ) -> Vec<CreatureRecord> {
        self.creatures
            .values()
            .filter(|c| c.valid && c.world.as_ref() == Some(world))
            .filter(|c| {
                (c.position.x - center.x).abs() <= radius
                    && (c.position.y - center.y).abs() <= radius
                    && (c.position.z - center.z).abs() <= radius
            })
            .cloned()
            .collect()
    }

    fn creature(&self, id: CreatureId) -> Option<CreatureRecord> {
        self.creatures.get(&id).cloned()
    }
}

impl SatietyStore for HeadlessHost {
    fn get_int(&self, id: CreatureId, key: &str) -> Option<i64> {
        self.store.get(&(id, key.to_string())).copied()
    }

    fn set_int(&mut self, id: CreatureId, key: &str, value: i64) {
        self.store.insert((id, key.to_string()), value);
    }
}

impl CreatureEffects for HeadlessHost {
    fn apply_effect(&mut self, id: CreatureId, effect: StatusEffect) {
        self.effects.entry(id).or_default().insert(effect.kind, effect);
    }

    fn clear_effect(&mut self, id: CreatureId, kind: EffectKind) {
        if let Some(active) = self.effects.get_mut(&id) {
            active.remove(&kind);
        }
    }

    fn damage(&mut self, id: CreatureId, amount: f64) {
        *self.damage_taken.entry(id).or_insert(0.0) += amount;
    }

    fn start_breeding(&mut self, id: CreatureId, ticks: u32, cause: ActorId) {
        self.breeding.insert(id, BreedingRecord { ticks, cause });
    }
}

impl Containers for HeadlessHost {
    fn container(&self, loc: &Location) -> Option<ContainerInfo> {
        if !self.material_at(loc).has_inventory() {
            return None;
        }
        self.containers.get(loc).map(|c| ContainerInfo {
            slots: c.slots.len(),
            custom_name: c.custom_name.clone(),
        })
    }

    fn slot(&self, loc: &Location, slot: usize) -> Option<ItemStack> {
        self.containers.get(loc)?.slots.get(slot).copied().flatten()
    }

    fn set_slot(&mut self, loc: &Location, slot: usize, stack: Option<ItemStack>) {
        if let Some(cell) = self
            .containers
            .get_mut(loc)
            .and_then(|c| c.slots.get_mut(slot))
        {
            *cell = stack.filter(|s| s.amount > 0);
        }
    }

    fn add_item(&mut self, loc: &Location, stack: ItemStack) -> Option<ItemStack> {
        let Some(container) = self.containers.get_mut(loc) else {
            return Some(stack);
        };
        let mut remaining = stack.amount;
        for existing in container.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if existing.kind == stack.kind && existing.amount < MAX_STACK {
                let moved = remaining.min(MAX_STACK - existing.amount);
                existing.amount += moved;
                remaining -= moved;
            }
        }
        for cell in container.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if cell.is_none() {
                let moved = remaining.min(MAX_STACK);
                *cell = Some(ItemStack::new(stack.kind, moved));
                remaining -= moved;
            }
        }
        (remaining > 0).then(|| ItemStack::new(stack.kind, remaining))
    }
}

impl ActorInventory for HeadlessHost {
    fn held_item(&self, actor: ActorId, hand: Hand) -> Option<ItemStack> {
        let state = self.actors.get(&actor)?;
        match hand {
            Hand::Main => state.main_hand,
            Hand::Off => state.off_hand,
        }
    }

    fn set_held_item(&mut self, actor: ActorId, hand: Hand, stack: Option<ItemStack>) {
        let state = self.actors.entry(actor).or_default();
        let stack = stack.filter(|s| s.amount > 0);
        match hand {
            Hand::Main => state.main_hand = stack,
            Hand::Off => state.off_hand = stack,
        }
    }

    fn is_creative(&self, actor: ActorId) -> bool {
        self.actors.get(&actor).is_some_and(|a| a.creative)
    }
}

impl Clock for HeadlessHost {
    fn current_tick(&self) -> u64 {
        self.tick
    }
}

// Trough engine — containers that feed nearby penned creatures.
//
// A trough is a container block of a configured material, optionally
// required to carry a custom name (`trough.name_tag`). Storage comes in two
// shapes (`TroughStorage`):
//
// - `Single`: one container, keyed by its own location.
// - `Paired`: two horizontally adjacent containers of a pairable material
//   (barrels) acting as one pool. Keyed by the smaller location; its centre
//   is the midpoint of the two cells. Deposits and consumption try the
//   primary side first, then the secondary.
//
// Resolution (`resolve`) runs on every interaction, cycle, and inspection.
// It first looks for a registered pair at the location and re-checks its
// integrity (both blocks still the same pairable material with
// inventories, still face-adjacent on one level). A broken pair is
// dissolved (both sides closed, both keys dropped) even when the block at
// the location is gone; an intact one is reused and shown open. Failing
// that, exactly one eligible neighbor among the four horizontal ones forms
// a new pair; zero or several fall back to treating the block as a single
// container. A cycle that finds a pair key gone carries on with the
// surviving side.
//
// Each trough key is either active (known to hold food) or not. A key
// becomes active on any successful deposit and is re-checked every
// `CareJob::TroughCycle`. A cycle feeds up to `max_feeds_per_cycle`
// non-wild tracked creatures with a positive deficit near the trough,
// nearest first, each one consuming energy for exactly its deficit. A
// trough left without consumable food, or that no longer resolves, drops
// out of the active set.
//
// See also: `satiety.rs` for the ledger the engine feeds into, `cache.rs`
// for the status lookups, `care.rs` for the service that owns the engine.
//
// **Critical constraint: single owner.** The active set and the pair
// registry belong to the engine alone and are cleared on `stop`, which also
// closes every paired barrel.

use crate::cache::ClassificationCache;
use crate::config::{FeedingConfig, TroughConfig, resolve_names};
use crate::enclosure::EnclosureClassifier;
use crate::event::{CareEvent, CareEventKind};
use crate::host::*;
use crate::satiety::SatietyLedger;
use crate::types::*;
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Feed energy table
// ---------------------------------------------------------------------------

/// Energy yielded by one item of each accepted food.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEnergyTable {
    energy: BTreeMap<ItemKind, u64>,
}

impl FeedEnergyTable {
    pub fn new(entries: impl IntoIterator<Item = (ItemKind, u64)>) -> Self {
        Self {
            energy: entries.into_iter().filter(|&(_, e)| e > 0).collect(),
        }
    }

    /// Build from config, dropping unknown items and values that are not
    /// positive integers.
    pub fn from_config(config: &FeedingConfig) -> Self {
        let mut energy = BTreeMap::new();
        for (name, value) in &config.item_energy {
            let Some(kind) = ItemKind::from_name(name) else {
                warn!(item = %name, "Unknown food item in configuration, skipping");
                continue;
            };
            let parsed = match value {
                serde_json::Value::Number(n) => n.as_i64(),
                serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            match parsed {
                Some(e) if e > 0 => {
                    energy.insert(kind, e as u64);
                }
                Some(e) => warn!(item = %name, energy = e, "Food energy must be positive, skipping"),
                None => warn!(item = %name, value = %value, "Unparseable food energy, skipping"),
            }
        }
        Self { energy }
    }

    pub fn energy(&self, kind: ItemKind) -> Option<u64> {
        self.energy.get(&kind).copied()
    }

    pub fn contains(&self, kind: ItemKind) -> bool {
        self.energy.contains_key(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ItemKind> + '_ {
        self.energy.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.energy.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Storage topology
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TroughTopology {
    Single,
    Paired,
}

/// Two adjacent containers acting as one trough.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairedContainer {
    /// The smaller of the two locations; the trough key.
    pub primary: Location,
    pub secondary: Location,
}

impl PairedContainer {
    pub fn new(a: Location, b: Location) -> Self {
        if a <= b {
            Self {
                primary: a,
                secondary: b,
            }
        } else {
            Self {
                primary: b,
                secondary: a,
            }
        }
    }

    pub fn contains(&self, loc: &Location) -> bool {
        &self.primary == loc || &self.secondary == loc
    }

    /// Both blocks are still the same pairable container, face-adjacent on
    /// one level.
    pub fn is_intact(&self, host: &(impl BlockGrid + Containers)) -> bool {
        let material = host.material_at(&self.primary);
        material.supports_pairing()
            && host.material_at(&self.secondary) == material
            && self.primary.world == self.secondary.world
            && self.primary.pos.is_horizontal_neighbor(self.secondary.pos)
            && host.container(&self.primary).is_some()
            && host.container(&self.secondary).is_some()
    }

    fn set_open(&self, host: &mut (impl BlockGrid + BlockStates), open: bool) {
        for side in [&self.primary, &self.secondary] {
            if host.material_at(side).supports_pairing() {
                host.set_open(side, open);
            }
        }
    }
}

/// Energy and items taken from a trough in one feed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Consumption {
    pub items: u32,
    pub energy: u64,
}

/// A resolved trough.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TroughStorage {
    Single(Location),
    Paired(PairedContainer),
}

impl TroughStorage {
    pub fn key(&self) -> &Location {
        match self {
            TroughStorage::Single(loc) => loc,
            TroughStorage::Paired(pair) => &pair.primary,
        }
    }

    pub fn topology(&self) -> TroughTopology {
        match self {
            TroughStorage::Single(_) => TroughTopology::Single,
            TroughStorage::Paired(_) => TroughTopology::Paired,
        }
    }

    pub fn center(&self) -> Position {
        match self {
            TroughStorage::Single(loc) => loc.pos.center(),
            TroughStorage::Paired(pair) => {
                pair.primary.pos.center().midpoint(pair.secondary.pos.center())
            }
        }
    }

    /// Container locations in fill and drain order.
    pub fn sides(&self) -> SmallVec<[Location; 2]> {
        match self {
            TroughStorage::Single(loc) => smallvec![loc.clone()],
            TroughStorage::Paired(pair) => {
                smallvec![pair.primary.clone(), pair.secondary.clone()]
            }
        }
    }

    /// Store one item, primary side first. False if no side has room.
    pub fn add_one(&self, host: &mut impl Containers, kind: ItemKind) -> bool {
        let item = ItemStack::new(kind, 1);
        self.sides()
            .iter()
            .any(|side| host.add_item(side, item).is_none())
    }

    /// Food items and their total energy across every side.
    pub fn stored(&self, host: &impl Containers, table: &FeedEnergyTable) -> (u32, u64) {
        let mut items = 0;
        let mut energy = 0;
        for side in self.sides() {
            let Some(info) = host.container(&side) else {
                continue;
            };
            for slot in 0..info.slots {
                let Some(stack) = host.slot(&side, slot) else {
                    continue;
                };
                if let Some(per_item) = table.energy(stack.kind) {
                    items += stack.amount;
                    energy += per_item * u64::from(stack.amount);
                }
            }
        }
        (items, energy)
    }

    pub fn has_food(&self, host: &impl Containers, table: &FeedEnergyTable) -> bool {
        self.stored(host, table).0 > 0
    }

    /// Take food worth at least `requested` energy, or everything if there
    /// is less. Slots are scanned in order; each matching stack gives
    /// `ceil(remaining / energy_per_item)` items at most, so the energy
    /// taken can overshoot the request by less than one item.
    pub fn consume(
        &self,
        host: &mut impl Containers,
        table: &FeedEnergyTable,
        requested: u64,
    ) -> Consumption {
        let mut taken = Consumption::default();
        for side in self.sides() {
            if taken.energy >= requested {
                break;
            }
            let Some(info) = host.container(&side) else {
                continue;
            };
            for slot in 0..info.slots {
                if taken.energy >= requested {
                    break;
                }
                let Some(stack) = host.slot(&side, slot) else {
                    continue;
                };
                let Some(per_item) = table.energy(stack.kind) else {
                    continue;
                };
                let needed = (requested - taken.energy).div_ceil(per_item);
                let eaten = u64::from(stack.amount).min(needed) as u32;
                let left = stack.amount - eaten;
                host.set_slot(
                    &side,
                    slot,
                    (left > 0).then(|| ItemStack::new(stack.kind, left)),
                );
                taken.items += eaten;
                taken.energy += u64::from(eaten) * per_item;
            }
        }
        taken
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Result of a player interacting with a block while holding something.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractOutcome {
    /// Not a trough material, no inventory, or missing the name tag.
    NotTrough,
    /// Empty hand, or an item with no feed energy.
    NotFeedItem,
    ContainerFull,
    Added,
}

/// Diagnostic snapshot of one trough.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroughInspection {
    pub key: Location,
    pub topology: TroughTopology,
    pub stored_items: u32,
    pub stored_energy: u64,
    /// Tracked, non-wild creatures within the feed radius.
    pub nearby_qualifying: usize,
    pub active: bool,
    pub ticks_until_next_cycle: u64,
}

/// The parts of the service a feeding pass reads and writes besides the
/// engine itself.
pub struct FeedContext<'a> {
    pub cache: &'a mut ClassificationCache,
    pub classifier: &'a EnclosureClassifier,
    pub ledger: &'a SatietyLedger,
}

/// Remove `§x` formatting codes.
pub fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '§' {
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}

#[derive(Clone, Debug)]
pub struct TroughEngine {
    trough_materials: BTreeSet<Material>,
    table: FeedEnergyTable,
    radius: f64,
    feed_interval: u64,
    max_feeds_per_cycle: usize,
    /// Lower-cased, formatting stripped. Empty accepts any container.
    name_tag: String,
    active: BTreeSet<Location>,
    /// Both locations of every registered pair map to the same record.
    pairs: BTreeMap<Location, PairedContainer>,
    timer: Option<TimerId>,
    next_cycle_tick: u64,
}

impl TroughEngine {
    pub fn new(config: &TroughConfig, table: FeedEnergyTable) -> Self {
        let trough_materials: BTreeSet<Material> =
            resolve_names(&config.blocks, Material::from_name, "trough block")
                .into_iter()
                .filter(|m| {
                    let ok = m.has_inventory();
                    if !ok {
                        warn!(block = %m, "Trough block has no inventory, skipping");
                    }
                    ok
                })
                .collect();
        Self {
            trough_materials,
            table,
            radius: config.radius.max(0.0),
            feed_interval: config.feed_interval_ticks,
            max_feeds_per_cycle: config.max_feeds_per_cycle,
            name_tag: strip_formatting(&config.name_tag).to_lowercase(),
            active: BTreeSet::new(),
            pairs: BTreeMap::new(),
            timer: None,
            next_cycle_tick: 0,
        }
    }

    pub fn table(&self) -> &FeedEnergyTable {
        &self.table
    }

    pub fn is_trough_material(&self, material: Material) -> bool {
        self.trough_materials.contains(&material)
    }

    pub fn is_active(&self, key: &Location) -> bool {
        self.active.contains(key)
    }

    pub fn active_troughs(&self) -> impl Iterator<Item = &Location> {
        self.active.iter()
    }

    /// The registered pair containing `loc`, if any.
    pub fn pair_at(&self, loc: &Location) -> Option<&PairedContainer> {
        self.pairs.get(loc)
    }

    pub fn next_cycle_tick(&self) -> u64 {
        self.next_cycle_tick
    }

    pub fn start(&mut self, scheduler: &mut impl Scheduler, now: u64) {
        if self.timer.is_none() {
            self.timer = Some(scheduler.schedule_repeating(self.feed_interval, CareJob::TroughCycle));
            self.next_cycle_tick = now + self.feed_interval.max(1);
        }
    }

    /// Cancel the cycle timer, forget every active trough, and close every
    /// registered pair.
    pub fn stop(&mut self, host: &mut (impl BlockGrid + BlockStates), scheduler: &mut impl Scheduler) {
        if let Some(timer) = self.timer.take() {
            scheduler.cancel(timer);
        }
        self.active.clear();
        let pairs: BTreeSet<PairedContainer> = std::mem::take(&mut self.pairs).into_values().collect();
        for pair in &pairs {
            pair.set_open(host, false);
        }
    }

    fn name_tag_matches(&self, custom_name: Option<&str>) -> bool {
        if self.name_tag.is_empty() {
            return true;
        }
        custom_name.is_some_and(|name| strip_formatting(name).to_lowercase() == self.name_tag)
    }

    fn is_tagged(&self, host: &impl Containers, loc: &Location) -> bool {
        host.container(loc)
            .is_some_and(|info| self.name_tag_matches(info.custom_name.as_deref()))
    }

    /// Resolve the trough at `loc`, forming, reusing, or dissolving pairs
    /// as needed. `None` if `loc` is not a usable trough.
    pub fn resolve<H>(
        &mut self,
        host: &mut H,
        loc: &Location,
        now: u64,
        events: &mut Vec<CareEvent>,
    ) -> Option<TroughStorage>
    where
        H: BlockGrid + BlockStates + Containers,
    {
        if let Some(existing) = self.pairs.get(loc).cloned() {
            if !existing.is_intact(&*host) {
                self.dissolve(host, &existing, now, events);
            }
        }
        let material = host.material_at(loc);
        if !self.is_trough_material(material) {
            return None;
        }
        if material.supports_pairing() {
            if let Some(pair) = self.resolve_pair(host, loc, material, now, events) {
                return Some(TroughStorage::Paired(pair));
            }
        }
        self.is_tagged(&*host, loc)
            .then(|| TroughStorage::Single(loc.clone()))
    }

    fn resolve_pair<H>(
        &mut self,
        host: &mut H,
        loc: &Location,
        material: Material,
        now: u64,
        events: &mut Vec<CareEvent>,
    ) -> Option<PairedContainer>
    where
        H: BlockGrid + BlockStates + Containers,
    {
        // `resolve` has already dissolved a broken pair at `loc`.
        if let Some(existing) = self.pairs.get(loc).cloned() {
            existing.set_open(host, true);
            return Some(existing);
        }

        let partner = self.pair_candidate(&*host, loc, material)?;
        let pair = PairedContainer::new(loc.clone(), partner);
        if !self.is_tagged(&*host, &pair.primary) && !self.is_tagged(&*host, &pair.secondary) {
            return None;
        }
        self.pairs.insert(pair.primary.clone(), pair.clone());
        self.pairs.insert(pair.secondary.clone(), pair.clone());
        pair.set_open(host, true);
        debug!(key = %pair.primary, partner = %pair.secondary, "Paired trough formed");
        events.push(CareEvent {
            tick: now,
            kind: CareEventKind::PairFormed {
                key: pair.primary.clone(),
                partner: pair.secondary.clone(),
            },
        });
        Some(pair)
    }

    /// The single eligible horizontal neighbor of `loc`, if there is
    /// exactly one. Neighbors already in another intact pair are not
    /// eligible.
    fn pair_candidate(
        &self,
        host: &(impl BlockGrid + Containers),
        loc: &Location,
        material: Material,
    ) -> Option<Location> {
        let mut candidates = HORIZONTAL_OFFSETS
            .iter()
            .map(|&(dx, dz)| loc.shifted(dx, dz))
            .filter(|n| host.material_at(n) == material && host.container(n).is_some())
            .filter(|n| {
                self.pairs
                    .get(n)
                    .is_none_or(|other| other.contains(loc) || !other.is_intact(host))
            });
        let first = candidates.next()?;
        candidates.next().is_none().then_some(first)
    }

    fn dissolve(
        &mut self,
        host: &mut (impl BlockGrid + BlockStates),
        pair: &PairedContainer,
        now: u64,
        events: &mut Vec<CareEvent>,
    ) {
        for side in [&pair.primary, &pair.secondary] {
            if self.pairs.get(side) == Some(pair) {
                self.pairs.remove(side);
            }
        }
        pair.set_open(host, false);
        debug!(key = %pair.primary, partner = %pair.secondary, "Paired trough dissolved");
        events.push(CareEvent {
            tick: now,
            kind: CareEventKind::PairBroken {
                key: pair.primary.clone(),
                partner: pair.secondary.clone(),
            },
        });
    }

    /// A player used `hand` on the block at `loc`. Deposits one held food
    /// item and feeds nearby creatures straight away.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_interact<H: Host>(
        &mut self,
        host: &mut H,
        ctx: &mut FeedContext<'_>,
        actor: ActorId,
        loc: &Location,
        hand: Hand,
        now: u64,
        events: &mut Vec<CareEvent>,
    ) -> InteractOutcome {
        let Some(storage) = self.resolve(host, loc, now, events) else {
            return InteractOutcome::NotTrough;
        };
        let Some(held) = host
            .held_item(actor, hand)
            .filter(|stack| stack.amount > 0 && self.table.contains(stack.kind))
        else {
            return InteractOutcome::NotFeedItem;
        };
        if !storage.add_one(host, held.kind) {
            return InteractOutcome::ContainerFull;
        }
        if !host.is_creative(actor) {
            let left = held.amount - 1;
            host.set_held_item(actor, hand, (left > 0).then(|| ItemStack::new(held.kind, left)));
        }
        self.active.insert(storage.key().clone());
        debug!(trough = %storage.key(), item = %held.kind, "Food deposited");
        self.feed_nearby(host, ctx, &storage, now, events);
        InteractOutcome::Added
    }

    /// Feed hungry penned creatures around `storage`. Returns how many were
    /// fed.
    pub fn feed_nearby<H: Host>(
        &self,
        host: &mut H,
        ctx: &mut FeedContext<'_>,
        storage: &TroughStorage,
        now: u64,
        events: &mut Vec<CareEvent>,
    ) -> usize {
        let center = storage.center();
        let mut candidates: Vec<CreatureRecord> = host
            .creatures_near(&storage.key().world, center, self.radius)
            .into_iter()
            .filter(|c| c.valid && ctx.cache.is_tracked(c.species))
            .collect();
        candidates.sort_by(|a, b| {
            a.position
                .distance_squared(center)
                .total_cmp(&b.position.distance_squared(center))
                .then(a.id.cmp(&b.id))
        });

        let mut fed = 0;
        for creature in candidates {
            if fed >= self.max_feeds_per_cycle {
                break;
            }
            if ctx.cache.status(ctx.classifier, &*host, &creature, now).is_wild() {
                continue;
            }
            let deficit = ctx.ledger.deficit(&*host, creature.id);
            if deficit <= 0 {
                continue;
            }
            let taken = storage.consume(host, &self.table, deficit as u64);
            if taken.energy == 0 {
                break;
            }
            let gained = i64::try_from(taken.energy).unwrap_or(i64::MAX);
            let satiety = ctx.ledger.add(host, creature.id, gained);
            events.push(CareEvent {
                tick: now,
                kind: CareEventKind::CreatureFed {
                    creature_id: creature.id,
                    trough: storage.key().clone(),
                    items: taken.items,
                    energy: taken.energy,
                    satiety,
                },
            });
            fed += 1;
        }
        fed
    }

    /// One feeding cycle over every active trough and every registered pair
    /// that still holds food. Returns the number of creatures fed.
    pub fn process_cycle<H: Host>(
        &mut self,
        host: &mut H,
        ctx: &mut FeedContext<'_>,
        now: u64,
        events: &mut Vec<CareEvent>,
    ) -> usize {
        self.next_cycle_tick = now + self.feed_interval.max(1);

        let mut keys = self.active.clone();
        keys.extend(self.pairs.values().map(|p| p.primary.clone()));
        let mut pending: Vec<Location> = keys.into_iter().rev().collect();

        let mut processed = BTreeSet::new();
        let mut fed = 0;
        while let Some(key) = pending.pop() {
            let partner = self.pairs.get(&key).map(|pair| {
                if pair.primary == key {
                    pair.secondary.clone()
                } else {
                    pair.primary.clone()
                }
            });
            let Some(storage) = self.resolve(host, &key, now, events) else {
                if self.active.remove(&key) {
                    debug!(trough = %key, "Trough no longer resolves, deactivated");
                }
                // The surviving side of a broken pair keeps its food.
                if let Some(partner) = partner.filter(|p| !processed.contains(p)) {
                    pending.push(partner);
                }
                continue;
            };
            if storage.key() != &key {
                self.active.remove(&key);
            }
            if !processed.insert(storage.key().clone()) {
                continue;
            }
            if !storage.has_food(&*host, &self.table) {
                self.active.remove(storage.key());
                continue;
            }
            self.active.insert(storage.key().clone());
            fed += self.feed_nearby(host, ctx, &storage, now, events);
            if !storage.has_food(&*host, &self.table) {
                self.active.remove(storage.key());
                info!(trough = %storage.key(), "Trough drained");
                events.push(CareEvent {
                    tick: now,
                    kind: CareEventKind::TroughDrained {
                        trough: storage.key().clone(),
                    },
                });
            }
        }
        fed
    }

    /// Forget the trough at `loc`. Called when the block is destroyed. A
    /// pair is dissolved and both of its keys dropped.
    pub fn deactivate<H>(&mut self, host: &mut H, loc: &Location, now: u64, events: &mut Vec<CareEvent>)
    where
        H: BlockGrid + BlockStates,
    {
        if let Some(pair) = self.pairs.get(loc).cloned() {
            self.active.remove(&pair.primary);
            self.active.remove(&pair.secondary);
            self.dissolve(host, &pair, now, events);
        } else {
            self.active.remove(loc);
        }
    }

    pub fn inspect<H: Host>(
        &mut self,
        host: &mut H,
        ctx: &mut FeedContext<'_>,
        loc: &Location,
        now: u64,
        events: &mut Vec<CareEvent>,
    ) -> Option<TroughInspection> {
        let storage = self.resolve(host, loc, now, events)?;
        let (stored_items, stored_energy) = storage.stored(&*host, &self.table);
        let nearby = host.creatures_near(&storage.key().world, storage.center(), self.radius);
        let mut nearby_qualifying = 0;
        for creature in &nearby {
            if !creature.valid || !ctx.cache.is_tracked(creature.species) {
                continue;
            }
            if !ctx.cache.status(ctx.classifier, &*host, creature, now).is_wild() {
                nearby_qualifying += 1;
            }
        }
        Some(TroughInspection {
            key: storage.key().clone(),
            topology: storage.topology(),
            stored_items,
            stored_energy,
            nearby_qualifying,
            active: self.active.contains(storage.key()),
            ticks_until_next_cycle: self.next_cycle_tick.saturating_sub(now),
        })
    }
}

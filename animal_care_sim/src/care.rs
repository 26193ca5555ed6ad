// The animal care service — one object the host talks to.
//
// `AnimalCare` owns every component (classifier, classification cache,
// satiety ledger, trough engine) and exposes the operations an interaction
// layer needs:
//
// - lifecycle: `start` registers the three repeating timers, `stop`
//   cancels them and clears all in-memory state;
// - `run_job`: the host calls this whenever one of those timers fires;
// - queries: `is_managed_kind`, `satiety`, `max_satiety`, `status`,
//   `is_trough_material`, `inspect`, `inspect_creature`;
// - interactions: `add_satiety`, `handle_interact` (deposit into a
//   trough), `hand_feed`, `deactivate` (trough destroyed).
//
// Narrative events from every operation accumulate in an internal buffer;
// the caller drains it with `take_events` after each step.
//
// The host is passed into each call rather than stored, so the service
// holds no borrow between calls and the host stays free to do other work
// on the same thread.
//
// See also: `host.rs` for the ports, `animal_care_bridge` for the
// interaction layer that renders outcomes as player messages.
//
// **Critical constraint: single-threaded.** Every call runs to completion
// on the host's simulation thread; there is no internal locking.

use crate::cache::ClassificationCache;
use crate::config::{CareConfig, resolve_names};
use crate::enclosure::{EnclosureClassifier, EnclosureStatus};
use crate::event::{CareEvent, CareEventKind};
use crate::host::*;
use crate::satiety::SatietyLedger;
use crate::trough::{FeedContext, FeedEnergyTable, InteractOutcome, TroughEngine, TroughInspection};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Result of a player feeding a creature by hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandFeedOutcome {
    /// Unknown creature or untracked species.
    Unmanaged,
    /// Empty hand, or an item that is not accepted for hand feeding.
    WrongItem,
    /// The creature is not in an enclosure.
    NotInPen,
    /// Satiety is already at max.
    NotHungry,
    Fed { satiety: i64, became_full: bool },
}

/// Diagnostic view of one creature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureSnapshot {
    pub id: CreatureId,
    pub species: Species,
    pub status: EnclosureStatus,
    pub satiety: i64,
    pub max: i64,
}

#[derive(Clone, Debug)]
pub struct AnimalCare {
    classifier: EnclosureClassifier,
    cache: ClassificationCache,
    ledger: SatietyLedger,
    troughs: TroughEngine,
    hand_feed_items: BTreeSet<ItemKind>,
    breeding_ticks: u32,
    running: bool,
    events: Vec<CareEvent>,
}

impl AnimalCare {
    pub fn new(config: &CareConfig) -> Self {
        let tracked = resolve_names(&config.tracked_species, Species::from_name, "species");
        let table = FeedEnergyTable::from_config(&config.feeding);

        let hand_feed_items: BTreeSet<ItemKind> = if config.feeding.hand_feed_items.is_empty() {
            table.kinds().collect()
        } else {
            resolve_names(&config.feeding.hand_feed_items, ItemKind::from_name, "hand feed item")
                .into_iter()
                .filter(|&kind| {
                    let known = table.contains(kind);
                    if !known {
                        warn!(item = %kind, "Hand feed item has no feed energy, skipping");
                    }
                    known
                })
                .collect()
        };

        Self {
            classifier: EnclosureClassifier::from_config(&config.enclosure),
            cache: ClassificationCache::new(tracked, config.enclosure.scan_interval_ticks),
            ledger: SatietyLedger::from_config(&config.satiety),
            troughs: TroughEngine::new(&config.trough, table),
            hand_feed_items,
            breeding_ticks: config.feeding.breeding_ticks,
            running: false,
            events: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub fn start(&mut self, scheduler: &mut impl Scheduler, now: u64) {
        if self.running {
            return;
        }
        self.cache.start(scheduler);
        self.ledger.start(scheduler);
        self.troughs.start(scheduler, now);
        self.running = true;
        info!(
            tick = now,
            tracked = self.cache.tracked().len(),
            "Animal care started"
        );
    }

    /// Cancel the timers and clear all in-memory state. Safe to call while
    /// stopped; lazily cached classifications are dropped either way.
    pub fn stop(&mut self, host: &mut (impl BlockGrid + BlockStates), scheduler: &mut impl Scheduler) {
        self.cache.stop(scheduler);
        self.ledger.stop(scheduler);
        self.troughs.stop(host, scheduler);
        if self.running {
            self.running = false;
            info!("Animal care stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run one periodic job. Ignored while stopped.
    pub fn run_job<H: Host>(&mut self, job: CareJob, host: &mut H) {
        if !self.running {
            return;
        }
        let now = host.current_tick();
        match job {
            CareJob::EnclosureSweep => {
                self.cache.sweep(&self.classifier, &*host, now);
            }
            CareJob::SatietyTick => {
                self.ledger
                    .tick(host, &mut self.cache, &self.classifier, now, &mut self.events);
            }
            CareJob::TroughCycle => {
                let mut ctx = FeedContext {
                    cache: &mut self.cache,
                    classifier: &self.classifier,
                    ledger: &self.ledger,
                };
                self.troughs
                    .process_cycle(host, &mut ctx, now, &mut self.events);
            }
        }
    }

    /// Drain the narrative events produced since the last call.
    pub fn take_events(&mut self) -> Vec<CareEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn is_managed_kind(&self, species: Species) -> bool {
        self.cache.is_tracked(species)
    }

    pub fn satiety(&self, host: &impl SatietyStore, id: CreatureId) -> i64 {
        self.ledger.get(host, id)
    }

    pub fn add_satiety(&self, host: &mut impl SatietyStore, id: CreatureId, delta: i64) -> i64 {
        self.ledger.add(host, id, delta)
    }

    pub fn max_satiety(&self) -> i64 {
        self.ledger.max()
    }

    pub fn status(&mut self, host: &(impl BlockGrid + Clock), creature: &CreatureRecord) -> EnclosureStatus {
        let now = host.current_tick();
        self.cache.status(&self.classifier, host, creature, now)
    }

    pub fn is_trough_material(&self, material: Material) -> bool {
        self.troughs.is_trough_material(material)
    }

    pub fn is_hand_feed_item(&self, kind: ItemKind) -> bool {
        self.hand_feed_items.contains(&kind)
    }

    pub fn inspect<H: Host>(&mut self, host: &mut H, loc: &Location) -> Option<TroughInspection> {
        let now = host.current_tick();
        let mut ctx = FeedContext {
            cache: &mut self.cache,
            classifier: &self.classifier,
            ledger: &self.ledger,
        };
        self.troughs
            .inspect(host, &mut ctx, loc, now, &mut self.events)
    }

    /// Status and satiety of a tracked creature. `None` for unknown or
    /// untracked creatures.
    pub fn inspect_creature<H: Host>(&mut self, host: &H, id: CreatureId) -> Option<CreatureSnapshot> {
        let creature = host.creature(id).filter(|c| self.is_managed_kind(c.species))?;
        let status = self.status(host, &creature);
        Some(CreatureSnapshot {
            id,
            species: creature.species,
            status,
            satiety: self.ledger.get(host, id),
            max: self.ledger.max(),
        })
    }

    // -----------------------------------------------------------------------
    // Interactions
    // -----------------------------------------------------------------------

    pub fn handle_interact<H: Host>(
        &mut self,
        host: &mut H,
        actor: ActorId,
        loc: &Location,
        hand: Hand,
    ) -> InteractOutcome {
        let now = host.current_tick();
        let mut ctx = FeedContext {
            cache: &mut self.cache,
            classifier: &self.classifier,
            ledger: &self.ledger,
        };
        self.troughs
            .handle_interact(host, &mut ctx, actor, loc, hand, now, &mut self.events)
    }

    /// The trough block at `loc` was destroyed.
    pub fn deactivate(&mut self, host: &mut (impl BlockGrid + BlockStates + Clock), loc: &Location) {
        let now = host.current_tick();
        self.troughs.deactivate(host, loc, now, &mut self.events);
    }

    /// Feed the held item to a creature. Reaching max satiety from below
    /// puts the creature in love mode, credited to `actor`.
    pub fn hand_feed<H: Host>(
        &mut self,
        host: &mut H,
        actor: ActorId,
        creature_id: CreatureId,
        hand: Hand,
    ) -> HandFeedOutcome {
        let Some(creature) = host
            .creature(creature_id)
            .filter(|c| c.valid && self.is_managed_kind(c.species))
        else {
            return HandFeedOutcome::Unmanaged;
        };
        let Some((held, energy)) = host
            .held_item(actor, hand)
            .filter(|stack| stack.amount > 0 && self.is_hand_feed_item(stack.kind))
            .and_then(|stack| Some((stack, self.troughs.table().energy(stack.kind)?)))
        else {
            return HandFeedOutcome::WrongItem;
        };
        if self.status(&*host, &creature).is_wild() {
            return HandFeedOutcome::NotInPen;
        }
        let before = self.ledger.get(&*host, creature_id);
        let max = self.ledger.max();
        if before >= max {
            return HandFeedOutcome::NotHungry;
        }

        let gained = i64::try_from(energy).unwrap_or(i64::MAX);
        let satiety = self.ledger.add(host, creature_id, gained);
        if !host.is_creative(actor) {
            let left = held.amount - 1;
            host.set_held_item(actor, hand, (left > 0).then(|| ItemStack::new(held.kind, left)));
        }
        let became_full = satiety >= max;
        if became_full {
            host.start_breeding(creature_id, self.breeding_ticks, actor);
        }
        self.events.push(CareEvent {
            tick: host.current_tick(),
            kind: CareEventKind::HandFed {
                creature_id,
                actor,
                satiety,
                became_full,
            },
        });
        HandFeedOutcome::Fed {
            satiety,
            became_full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TickScheduler;
    use crate::world::{HeadlessHost, VoxelWorld};

    const ACTOR: ActorId = ActorId::from_u128(0xA);

    fn overworld() -> WorldName {
        WorldName::new("overworld")
    }

    fn config() -> CareConfig {
        let mut config = CareConfig::default();
        config.enclosure.detection_radius = 8;
        config
    }

    /// Fenced 6x6 pen at x/z 10..=15 on a 32x32 meadow, with one cow
    /// inside and one outside.
    fn setup() -> (HeadlessHost, AnimalCare) {
        let mut world = VoxelWorld::new(32, 8, 32);
        world.fill_layer(0, Material::GrassBlock);
        world.ring((10, 10), (15, 15), 1, 1, Material::OakFence);
        let mut host = HeadlessHost::new();
        host.add_world(overworld(), world);
        for (n, x) in [(1u128, 12.5), (2, 24.5)] {
            host.spawn(CreatureRecord {
                id: CreatureId::from_u128(n),
                species: Species::Cow,
                world: Some(overworld()),
                position: Position::new(x, 1.0, 12.5),
                valid: true,
            });
        }
        (host, AnimalCare::new(&config()))
    }

    const PENNED: CreatureId = CreatureId::from_u128(1);
    const FREE: CreatureId = CreatureId::from_u128(2);

    #[test]
    fn jobs_are_ignored_until_started() {
        let (mut host, mut care) = setup();
        care.add_satiety(&mut host, PENNED, -50);
        care.run_job(CareJob::SatietyTick, &mut host);
        assert_eq!(care.satiety(&host, PENNED), 50);
    }

    #[test]
    fn scheduled_jobs_drive_satiety() {
        let (mut host, mut care) = setup();
        let mut sched = TickScheduler::new(0);
        care.start(&mut sched, 0);
        assert_eq!(sched.active_timers(), 3);

        while let Some((tick, job)) = sched.pop_due(2400) {
            host.set_tick(tick);
            care.run_job(job, &mut host);
        }
        assert_eq!(care.satiety(&host, PENNED), 90);
        assert_eq!(care.satiety(&host, FREE), 100);

        care.stop(&mut host, &mut sched);
        assert_eq!(sched.active_timers(), 0);
        assert!(!care.is_running());
    }

    #[test]
    fn hand_feed_outcomes() {
        let (mut host, mut care) = setup();
        assert_eq!(
            care.hand_feed(&mut host, ACTOR, PENNED, Hand::Main),
            HandFeedOutcome::WrongItem
        );

        host.give(ACTOR, Hand::Main, Some(ItemStack::new(ItemKind::Wheat, 5)));
        assert_eq!(
            care.hand_feed(&mut host, ACTOR, CreatureId::from_u128(99), Hand::Main),
            HandFeedOutcome::Unmanaged
        );
        assert_eq!(
            care.hand_feed(&mut host, ACTOR, FREE, Hand::Main),
            HandFeedOutcome::NotInPen
        );
        assert_eq!(
            care.hand_feed(&mut host, ACTOR, PENNED, Hand::Main),
            HandFeedOutcome::NotHungry
        );

        care.add_satiety(&mut host, PENNED, -40);
        assert_eq!(
            care.hand_feed(&mut host, ACTOR, PENNED, Hand::Main),
            HandFeedOutcome::Fed {
                satiety: 85,
                became_full: false
            }
        );
        assert_eq!(
            host.held_item(ACTOR, Hand::Main),
            Some(ItemStack::new(ItemKind::Wheat, 4))
        );
        assert_eq!(host.breeding(PENNED), None);

        assert_eq!(
            care.hand_feed(&mut host, ACTOR, PENNED, Hand::Main),
            HandFeedOutcome::Fed {
                satiety: 100,
                became_full: true
            }
        );
        let breeding = host.breeding(PENNED).unwrap();
        assert_eq!((breeding.ticks, breeding.cause), (600, ACTOR));

        let events = care.take_events();
        assert_eq!(events.len(), 2);
        assert!(care.take_events().is_empty());
    }

    #[test]
    fn hand_feed_allow_list_restricts_items() {
        let (mut host, _) = setup();
        let mut config = config();
        config.feeding.hand_feed_items = vec!["carrot".into(), "stick".into()];
        let mut care = AnimalCare::new(&config);
        assert!(care.is_hand_feed_item(ItemKind::Carrot));
        assert!(!care.is_hand_feed_item(ItemKind::Stick));
        assert!(!care.is_hand_feed_item(ItemKind::Wheat));

        care.add_satiety(&mut host, PENNED, -40);
        host.give(ACTOR, Hand::Off, Some(ItemStack::new(ItemKind::Wheat, 1)));
        assert_eq!(
            care.hand_feed(&mut host, ACTOR, PENNED, Hand::Off),
            HandFeedOutcome::WrongItem
        );
    }

    #[test]
    fn creative_hand_feed_keeps_the_item() {
        let (mut host, mut care) = setup();
        host.set_creative(ACTOR, true);
        host.give(ACTOR, Hand::Main, Some(ItemStack::new(ItemKind::Carrot, 1)));
        care.add_satiety(&mut host, PENNED, -30);
        assert!(matches!(
            care.hand_feed(&mut host, ACTOR, PENNED, Hand::Main),
            HandFeedOutcome::Fed { satiety: 90, .. }
        ));
        assert_eq!(
            host.held_item(ACTOR, Hand::Main),
            Some(ItemStack::new(ItemKind::Carrot, 1))
        );
    }

    #[test]
    fn creature_inspection() {
        let (mut host, mut care) = setup();
        care.add_satiety(&mut host, PENNED, -25);
        let snapshot = care.inspect_creature(&host, PENNED).unwrap();
        assert_eq!(snapshot.satiety, 75);
        assert_eq!(snapshot.max, 100);
        assert_eq!(snapshot.status.label(), "captive");
        assert_eq!(care.inspect_creature(&host, FREE).unwrap().status, EnclosureStatus::Wild);
        assert!(care.inspect_creature(&host, CreatureId::from_u128(99)).is_none());
    }

    #[test]
    fn trough_round_trip_through_the_service() {
        let (mut host, mut care) = setup();
        let mut sched = TickScheduler::new(0);
        care.start(&mut sched, 0);
        let trough = Location::new(overworld(), BlockPos::new(10, 1, 10));
        host.place_container(&trough, Material::Barrel, Some("[Trough]"));
        assert!(care.is_trough_material(Material::Barrel));

        host.give(ACTOR, Hand::Main, Some(ItemStack::new(ItemKind::Wheat, 2)));
        assert_eq!(
            care.handle_interact(&mut host, ACTOR, &trough, Hand::Main),
            InteractOutcome::Added
        );
        let report = care.inspect(&mut host, &trough).unwrap();
        assert!(report.active);
        assert_eq!(report.stored_items, 1);
        assert_eq!(report.nearby_qualifying, 1);

        care.deactivate(&mut host, &trough);
        assert!(!care.inspect(&mut host, &trough).unwrap().active);
    }

    #[test]
    fn stop_clears_cached_classifications() {
        let (mut host, mut care) = setup();
        let mut sched = TickScheduler::new(0);
        care.start(&mut sched, 0);
        let penned = host.creature(PENNED).unwrap();
        assert!(!care.status(&host, &penned).is_wild());

        host.set_block(
            &Location::new(overworld(), BlockPos::new(12, 1, 9)),
            Material::Air,
        );
        care.stop(&mut host, &mut sched);
        care.start(&mut sched, 0);
        assert!(care.status(&host, &penned).is_wild());
    }

    #[test]
    fn stop_before_start_drops_lazy_classifications() {
        let (mut host, mut care) = setup();
        let mut sched = TickScheduler::new(0);
        let penned = host.creature(PENNED).unwrap();
        assert!(!care.status(&host, &penned).is_wild());

        host.set_block(
            &Location::new(overworld(), BlockPos::new(12, 1, 9)),
            Material::Air,
        );
        care.stop(&mut host, &mut sched);
        assert!(!care.is_running());
        assert!(care.status(&host, &penned).is_wild());
    }
}

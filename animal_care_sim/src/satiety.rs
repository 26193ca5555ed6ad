// Satiety ledger — per-creature bounded hunger counter.
//
// Satiety lives in the host's persistent per-creature store under
// `SATIETY_KEY`. The ledger owns the rules, not the storage: every read and
// write is clamped into `[0, max]`, and a creature with no stored value
// reads as `max` (newly seen creatures start full).
//
// On each `CareJob::SatietyTick` every live tracked creature is adjusted by
// its cached enclosure status:
// - `Wild` is forced back to `max`. A free creature is never hungry, and
//   one that is penned again starts full.
// - `Captive` loses `|captive_loss|`.
// - `Pasture` changes by `pasture_change` (usually small, either sign).
//
// After every adjustment the low-satiety effects are reconciled: at or below
// `low_threshold` slowness and weakness are (re)applied with duration
// `max(100, interval + 40)`, so they outlast the gap to the next tick;
// above it both are cleared. At zero satiety a positive
// `starvation_damage` is dealt once per tick.
//
// See also: `cache.rs` for the status lookups, `trough.rs` and `care.rs`
// which add satiety when creatures are fed.

use crate::cache::ClassificationCache;
use crate::config::SatietyConfig;
use crate::enclosure::{EnclosureClassifier, EnclosureStatus};
use crate::event::{CareEvent, CareEventKind};
use crate::host::{
    BlockGrid, CareJob, CreatureEffects, CreatureSource, EffectKind, SatietyStore, Scheduler,
    StatusEffect,
};
use crate::types::{CreatureId, TimerId};
use tracing::debug;

/// Persistent-store key holding a creature's satiety.
pub const SATIETY_KEY: &str = "animal_care:satiety";

/// Shortest low-satiety effect, in ticks.
const MIN_EFFECT_TICKS: u64 = 100;

/// Extra effect duration past the tick interval, so effects never lapse
/// between two ticks.
const EFFECT_OVERLAP_TICKS: u64 = 40;

#[derive(Clone, Debug)]
pub struct SatietyLedger {
    max: i64,
    captive_loss: i64,
    pasture_change: i64,
    interval_ticks: u64,
    low_threshold: i64,
    starvation_damage: f64,
    timer: Option<TimerId>,
}

impl SatietyLedger {
    pub fn from_config(config: &SatietyConfig) -> Self {
        Self {
            max: config.max.max(0),
            captive_loss: config.captive_loss.saturating_abs(),
            pasture_change: config.pasture_change,
            interval_ticks: config.interval_ticks,
            low_threshold: config.effects.low_threshold,
            starvation_damage: config.effects.starvation_damage,
            timer: None,
        }
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn start(&mut self, scheduler: &mut impl Scheduler) {
        if self.timer.is_none() {
            self.timer = Some(scheduler.schedule_repeating(self.interval_ticks, CareJob::SatietyTick));
        }
    }

    pub fn stop(&mut self, scheduler: &mut impl Scheduler) {
        if let Some(timer) = self.timer.take() {
            scheduler.cancel(timer);
        }
    }

    /// Current satiety, `max` if nothing is stored yet.
    pub fn get(&self, store: &impl SatietyStore, id: CreatureId) -> i64 {
        store
            .get_int(id, SATIETY_KEY)
            .map_or(self.max, |v| v.clamp(0, self.max))
    }

    /// Store `value` clamped into range and return what was stored.
    pub fn set(&self, store: &mut impl SatietyStore, id: CreatureId, value: i64) -> i64 {
        let value = value.clamp(0, self.max);
        store.set_int(id, SATIETY_KEY, value);
        value
    }

    /// Add `delta` (clamped) and return the new value. A zero delta is a
    /// plain read and writes nothing.
    pub fn add(&self, store: &mut impl SatietyStore, id: CreatureId, delta: i64) -> i64 {
        let current = self.get(store, id);
        if delta == 0 {
            return current;
        }
        self.set(store, id, current.saturating_add(delta))
    }

    /// How much satiety the creature is missing.
    pub fn deficit(&self, store: &impl SatietyStore, id: CreatureId) -> i64 {
        self.max - self.get(store, id)
    }

    pub fn effect_duration(&self) -> u32 {
        let ticks = MIN_EFFECT_TICKS.max(self.interval_ticks.saturating_add(EFFECT_OVERLAP_TICKS));
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }

    /// One satiety tick over every live tracked creature. Returns how many
    /// creatures were adjusted.
    pub fn tick<H>(
        &self,
        host: &mut H,
        cache: &mut ClassificationCache,
        classifier: &EnclosureClassifier,
        now: u64,
        events: &mut Vec<CareEvent>,
    ) -> usize
    where
        H: BlockGrid + CreatureSource + SatietyStore + CreatureEffects,
    {
        let mut adjusted = 0;
        for creature in host.living_creatures() {
            if !cache.is_tracked(creature.species) || !creature.valid {
                continue;
            }
            let status = cache.status(classifier, &*host, &creature, now);
            let satiety = self.apply_status(host, creature.id, &status);
            self.apply_effects(host, creature.id, satiety, now, events);
            adjusted += 1;
        }
        debug!(tick = now, adjusted, "Satiety tick complete");
        adjusted
    }

    /// Adjust one creature for its enclosure status.
    pub fn apply_status(
        &self,
        store: &mut impl SatietyStore,
        id: CreatureId,
        status: &EnclosureStatus,
    ) -> i64 {
        match status {
            EnclosureStatus::Wild => self.set(store, id, self.max),
            EnclosureStatus::Captive(_) => self.add(store, id, -self.captive_loss),
            EnclosureStatus::Pasture(_) => self.add(store, id, self.pasture_change),
        }
    }

    /// Reconcile low-satiety effects and starvation for `satiety`.
    pub fn apply_effects(
        &self,
        effects: &mut impl CreatureEffects,
        id: CreatureId,
        satiety: i64,
        now: u64,
        events: &mut Vec<CareEvent>,
    ) {
        if satiety <= self.low_threshold {
            let duration_ticks = self.effect_duration();
            for kind in [EffectKind::Slowness, EffectKind::Weakness] {
                effects.apply_effect(
                    id,
                    StatusEffect {
                        kind,
                        duration_ticks,
                        amplifier: 0,
                        ambient: true,
                        particles: false,
                    },
                );
            }
        } else {
            effects.clear_effect(id, EffectKind::Slowness);
            effects.clear_effect(id, EffectKind::Weakness);
        }

        if satiety <= 0 && self.starvation_damage > 0.0 {
            effects.damage(id, self.starvation_damage);
            events.push(CareEvent {
                tick: now,
                kind: CareEventKind::Starving {
                    creature_id: id,
                    damage: self.starvation_damage,
                },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enclosure::{Bounds, Enclosure};
    use crate::event::TickScheduler;
    use crate::host::CreatureRecord;
    use crate::types::{BlockPos, Material, Position, Species, WorldName};
    use crate::walkable::WalkabilityPolicy;
    use crate::world::{HeadlessHost, VoxelWorld};

    fn ledger() -> SatietyLedger {
        SatietyLedger::from_config(&SatietyConfig::default())
    }

    fn some_enclosure() -> Enclosure {
        Enclosure {
            bounds: Bounds {
                min: BlockPos::new(0, 0, 0),
                max: BlockPos::new(7, 3, 7),
            },
            width: 6,
            length: 6,
        }
    }

    const COW: CreatureId = CreatureId::from_u128(1);

    #[test]
    fn absent_value_reads_as_max() {
        let host = HeadlessHost::new();
        assert_eq!(ledger().get(&host, COW), 100);
    }

    #[test]
    fn add_clamps_into_range() {
        let mut host = HeadlessHost::new();
        let ledger = ledger();
        for delta in [-1000, -101, -100, -1, 1, 50, 1000, i64::MIN, i64::MAX] {
            let value = ledger.add(&mut host, COW, delta);
            assert!((0..=100).contains(&value), "delta {delta} gave {value}");
        }
    }

    #[test]
    fn zero_delta_is_a_read() {
        let mut host = HeadlessHost::new();
        let ledger = ledger();
        assert_eq!(ledger.add(&mut host, COW, 0), 100);
        assert_eq!(host.get_int(COW, SATIETY_KEY), None);

        ledger.set(&mut host, COW, 40);
        assert_eq!(ledger.add(&mut host, COW, 0), 40);
    }

    #[test]
    fn stored_out_of_range_values_are_clamped_on_read() {
        let mut host = HeadlessHost::new();
        host.set_int(COW, SATIETY_KEY, 250);
        assert_eq!(ledger().get(&host, COW), 100);
        host.set_int(COW, SATIETY_KEY, -3);
        assert_eq!(ledger().get(&host, COW), 0);
    }

    #[test]
    fn status_rules() {
        let mut host = HeadlessHost::new();
        let config = SatietyConfig {
            captive_loss: -7,
            pasture_change: 2,
            ..SatietyConfig::default()
        };
        let ledger = SatietyLedger::from_config(&config);
        ledger.set(&mut host, COW, 50);

        assert_eq!(
            ledger.apply_status(&mut host, COW, &EnclosureStatus::Captive(some_enclosure())),
            43
        );
        assert_eq!(
            ledger.apply_status(&mut host, COW, &EnclosureStatus::Pasture(some_enclosure())),
            45
        );
        assert_eq!(ledger.apply_status(&mut host, COW, &EnclosureStatus::Wild), 100);
    }

    #[test]
    fn low_satiety_applies_ambient_effects() {
        let mut host = HeadlessHost::new();
        let mut events = Vec::new();
        ledger().apply_effects(&mut host, COW, 30, 0, &mut events);

        let effects = host.active_effects(COW);
        assert_eq!(effects.len(), 2);
        for effect in effects {
            assert_eq!(effect.duration_ticks, 1240);
            assert_eq!(effect.amplifier, 0);
            assert!(effect.ambient);
            assert!(!effect.particles);
        }
        assert!(events.is_empty());

        ledger().apply_effects(&mut host, COW, 31, 0, &mut events);
        assert!(host.active_effects(COW).is_empty());
    }

    #[test]
    fn short_interval_still_gets_minimum_duration() {
        let config = SatietyConfig {
            interval_ticks: 20,
            ..SatietyConfig::default()
        };
        assert_eq!(SatietyLedger::from_config(&config).effect_duration(), 100);
    }

    #[test]
    fn starvation_repeats_every_tick_at_zero() {
        let mut host = HeadlessHost::new();
        let mut events = Vec::new();
        let ledger = ledger();
        ledger.apply_effects(&mut host, COW, 0, 10, &mut events);
        ledger.apply_effects(&mut host, COW, 0, 20, &mut events);
        assert_eq!(host.damage_taken(COW), 2.0);
        assert_eq!(events.len(), 2);

        let config = SatietyConfig {
            effects: crate::config::EffectsConfig {
                starvation_damage: 0.0,
                ..Default::default()
            },
            ..SatietyConfig::default()
        };
        let harmless = SatietyLedger::from_config(&config);
        harmless.apply_effects(&mut host, COW, 0, 30, &mut events);
        assert_eq!(host.damage_taken(COW), 2.0);
    }

    #[test]
    fn tick_drains_captive_creatures() {
        let name = WorldName::new("overworld");
        let mut world = VoxelWorld::new(32, 8, 32);
        world.fill_layer(0, Material::GrassBlock);
        world.ring((10, 10), (13, 13), 1, 1, Material::OakFence);
        let mut host = HeadlessHost::new();
        host.add_world(name.clone(), world);
        host.spawn(CreatureRecord {
            id: COW,
            species: Species::Cow,
            world: Some(name.clone()),
            position: Position::new(11.5, 1.0, 11.5),
            valid: true,
        });
        host.spawn(CreatureRecord {
            id: CreatureId::from_u128(2),
            species: Species::Cow,
            world: Some(name),
            position: Position::new(25.5, 1.0, 25.5),
            valid: true,
        });

        let ledger = ledger();
        ledger.set(&mut host, CreatureId::from_u128(2), 10);
        let classifier = EnclosureClassifier::new(WalkabilityPolicy::default(), 6, 10, 4);
        let mut cache = ClassificationCache::new([Species::Cow].into(), 1200);
        let mut events = Vec::new();

        assert_eq!(ledger.tick(&mut host, &mut cache, &classifier, 0, &mut events), 2);
        assert_eq!(ledger.get(&host, COW), 95);
        // The wild cow is reset to full.
        assert_eq!(ledger.get(&host, CreatureId::from_u128(2)), 100);

        for _ in 0..18 {
            ledger.tick(&mut host, &mut cache, &classifier, 0, &mut events);
        }
        assert_eq!(ledger.get(&host, COW), 5);
        assert!(!host.active_effects(COW).is_empty());
        ledger.tick(&mut host, &mut cache, &classifier, 0, &mut events);
        ledger.tick(&mut host, &mut cache, &classifier, 0, &mut events);
        assert_eq!(ledger.get(&host, COW), 0);
        assert_eq!(host.damage_taken(COW), 2.0);
    }

    #[test]
    fn start_and_stop_manage_the_timer() {
        let mut sched = TickScheduler::new(0);
        let mut ledger = ledger();
        ledger.start(&mut sched);
        assert_eq!(sched.pop_due(1200), Some((1200, CareJob::SatietyTick)));
        ledger.stop(&mut sched);
        assert_eq!(sched.pop_due(10_000), None);
    }
}

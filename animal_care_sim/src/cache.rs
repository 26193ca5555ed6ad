// Classification cache — enclosure status per creature between sweeps.
//
// Classification is a flood fill, far too expensive to run on every lookup.
// The cache stores `(status, computed_at)` per creature:
//
// - `status` returns the cached entry, or classifies on first sight and
//   stores the result, so creatures spawned between sweeps never wait for
//   the next one.
// - `sweep` reclassifies every live creature of a tracked species and
//   overwrites its entry unconditionally. It runs on its own timer
//   (`CareJob::EnclosureSweep`).
// - `stop` cancels the timer and clears every entry. Terrain may change
//   while the service is down, so nothing survives a restart.
//
// Creatures of untracked species are always `Wild` and never cached.
// Entries for removed creatures are not evicted; they are simply never
// looked up again, and the map only ever holds identities that were live
// at some sweep.
//
// See also: `enclosure.rs` for the classifier, `satiety.rs` and
// `trough.rs`, the two readers.

use crate::enclosure::{EnclosureClassifier, EnclosureStatus};
use crate::host::{BlockGrid, CareJob, CreatureRecord, CreatureSource, Scheduler};
use crate::types::{CreatureId, Species, TimerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A cached classification and the tick it was computed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedStatus {
    pub status: EnclosureStatus,
    pub computed_at: u64,
}

#[derive(Clone, Debug)]
pub struct ClassificationCache {
    tracked: BTreeSet<Species>,
    scan_interval: u64,
    entries: BTreeMap<CreatureId, CachedStatus>,
    timer: Option<TimerId>,
}

impl ClassificationCache {
    pub fn new(tracked: BTreeSet<Species>, scan_interval: u64) -> Self {
        Self {
            tracked,
            scan_interval,
            entries: BTreeMap::new(),
            timer: None,
        }
    }

    pub fn is_tracked(&self, species: Species) -> bool {
        self.tracked.contains(&species)
    }

    pub fn tracked(&self) -> &BTreeSet<Species> {
        &self.tracked
    }

    pub fn start(&mut self, scheduler: &mut impl Scheduler) {
        if self.timer.is_none() {
            self.timer = Some(scheduler.schedule_repeating(self.scan_interval, CareJob::EnclosureSweep));
        }
    }

    pub fn stop(&mut self, scheduler: &mut impl Scheduler) {
        if let Some(timer) = self.timer.take() {
            scheduler.cancel(timer);
        }
        self.entries.clear();
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cached(&self, id: CreatureId) -> Option<&CachedStatus> {
        self.entries.get(&id)
    }

    /// Cached status, classifying and storing it on a miss.
    pub fn status(
        &mut self,
        classifier: &EnclosureClassifier,
        grid: &impl BlockGrid,
        creature: &CreatureRecord,
        now: u64,
    ) -> EnclosureStatus {
        if !self.is_tracked(creature.species) {
            return EnclosureStatus::Wild;
        }
        if let Some(entry) = self.entries.get(&creature.id) {
            return entry.status;
        }
        let status = classifier.classify(grid, creature);
        self.entries.insert(
            creature.id,
            CachedStatus {
                status,
                computed_at: now,
            },
        );
        status
    }

    /// Reclassify every live tracked creature. Returns how many were
    /// classified.
    pub fn sweep<H>(&mut self, classifier: &EnclosureClassifier, host: &H, now: u64) -> usize
    where
        H: BlockGrid + CreatureSource,
    {
        let mut classified = 0;
        for creature in host.living_creatures() {
            if !self.is_tracked(creature.species) || !creature.valid {
                continue;
            }
            let status = classifier.classify(host, &creature);
            self.entries.insert(
                creature.id,
                CachedStatus {
                    status,
                    computed_at: now,
                },
            );
            classified += 1;
        }
        debug!(tick = now, classified, "Enclosure sweep complete");
        classified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TickScheduler;
    use crate::types::{BlockPos, Material, Position, WorldName};
    use crate::walkable::WalkabilityPolicy;
    use crate::world::{HeadlessHost, VoxelWorld};

    fn overworld() -> WorldName {
        WorldName::new("overworld")
    }

    fn cow(n: u128, x: f64, z: f64) -> CreatureRecord {
        CreatureRecord {
            id: CreatureId::from_u128(n),
            species: Species::Cow,
            world: Some(overworld()),
            position: Position::new(x, 1.0, z),
            valid: true,
        }
    }

    fn setup() -> (HeadlessHost, EnclosureClassifier, ClassificationCache) {
        let mut world = VoxelWorld::new(40, 8, 40);
        world.fill_layer(0, Material::GrassBlock);
        world.ring((10, 10), (15, 15), 1, 1, Material::OakFence);
        let mut host = HeadlessHost::new();
        host.add_world(overworld(), world);
        let classifier = EnclosureClassifier::new(WalkabilityPolicy::default(), 8, 10, 4);
        let cache = ClassificationCache::new([Species::Cow, Species::Sheep].into(), 100);
        (host, classifier, cache)
    }

    #[test]
    fn miss_classifies_and_stores() {
        let (host, classifier, mut cache) = setup();
        let creature = cow(1, 12.5, 12.5);
        let status = cache.status(&classifier, &host, &creature, 5);
        assert!(matches!(status, EnclosureStatus::Captive(_)));
        assert_eq!(cache.cached(creature.id).map(|c| c.computed_at), Some(5));
    }

    #[test]
    fn hit_returns_stale_entry_until_sweep() {
        let (mut host, classifier, mut cache) = setup();
        let creature = cow(1, 12.5, 12.5);
        host.spawn(creature.clone());
        cache.status(&classifier, &host, &creature, 0);

        // Open the pen. The cached entry still says captive.
        host.set_block(
            &crate::types::Location::new(overworld(), BlockPos::new(12, 1, 9)),
            Material::Air,
        );
        assert!(matches!(
            cache.status(&classifier, &host, &creature, 10),
            EnclosureStatus::Captive(_)
        ));

        assert_eq!(cache.sweep(&classifier, &host, 20), 1);
        assert!(cache.status(&classifier, &host, &creature, 30).is_wild());
        assert_eq!(cache.cached(creature.id).map(|c| c.computed_at), Some(20));
    }

    #[test]
    fn untracked_species_are_wild_and_uncached() {
        let (host, classifier, mut cache) = setup();
        let mut pig = cow(2, 12.5, 12.5);
        pig.species = Species::Pig;
        assert!(cache.status(&classifier, &host, &pig, 0).is_wild());
        assert!(cache.is_empty());
    }

    #[test]
    fn sweep_skips_untracked_and_despawned() {
        let (mut host, classifier, mut cache) = setup();
        host.spawn(cow(1, 12.5, 12.5));
        host.spawn(cow(2, 30.5, 30.5));
        let mut pig = cow(3, 12.5, 13.5);
        pig.species = Species::Pig;
        host.spawn(pig);
        host.spawn(cow(4, 13.5, 13.5));
        host.despawn(CreatureId::from_u128(4));

        assert_eq!(cache.sweep(&classifier, &host, 0), 2);
        assert!(cache.cached(CreatureId::from_u128(2)).is_some_and(|c| c.status.is_wild()));
        assert!(cache.cached(CreatureId::from_u128(3)).is_none());
        assert!(cache.cached(CreatureId::from_u128(4)).is_none());
    }

    #[test]
    fn stop_clears_and_restart_recomputes() {
        let (mut host, classifier, mut cache) = setup();
        let mut sched = TickScheduler::new(0);
        cache.start(&mut sched);
        assert!(cache.is_running());

        let creature = cow(1, 12.5, 12.5);
        host.spawn(creature.clone());
        cache.status(&classifier, &host, &creature, 0);
        assert_eq!(cache.len(), 1);

        cache.stop(&mut sched);
        assert!(cache.is_empty());
        assert!(!cache.is_running());
        assert_eq!(sched.active_timers(), 0);

        host.set_block(
            &crate::types::Location::new(overworld(), BlockPos::new(12, 1, 9)),
            Material::Air,
        );
        cache.start(&mut sched);
        assert!(cache.status(&classifier, &host, &creature, 50).is_wild());
    }

    #[test]
    fn start_is_idempotent() {
        let (_, _, mut cache) = setup();
        let mut sched = TickScheduler::new(0);
        cache.start(&mut sched);
        cache.start(&mut sched);
        assert_eq!(sched.active_timers(), 1);
    }
}

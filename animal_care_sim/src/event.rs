// Timer queue and narrative events.
//
// This file defines two related but distinct concepts:
// - `EventQueue` / `TickScheduler`: a min-heap of timer firings ordered by
//   `(tick, sequence)`, and the `Scheduler` implementation built on it. The
//   headless bridge drives the service by popping due firings and handing
//   each job to `AnimalCare::run_job`.
// - `CareEvent`: narrative events the service emits (a creature was fed, a
//   trough ran dry, a pair formed) for logs and the bridge's message layer.
//
// Cancellation is lazy: `cancel` forgets the timer, and its pending firing is
// discarded when it reaches the front of the queue. A live server host would
// implement `Scheduler` over its own task system instead.
//
// See also: `host.rs` for the `Scheduler` trait and `CareJob`, `care.rs`
// for the job dispatcher.
//
// **Critical constraint: determinism.** Firings at the same tick pop in
// registration order. The `(tick, sequence)` key provides a total order.

use crate::host::{CareJob, Scheduler};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

// ---------------------------------------------------------------------------
// Timer queue
// ---------------------------------------------------------------------------

/// A pending timer firing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub tick: u64,
    /// Tiebreak within a tick. Lower values fire first.
    pub sequence: u64,
    pub timer: TimerId,
}

// Min-heap: lowest (tick, sequence) fires first. BinaryHeap is a max-heap,
// so the ordering is reversed.
impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick && self.sequence == other.sequence
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .tick
            .cmp(&self.tick)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Priority queue of timer firings, earliest first.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    next_sequence: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, tick: u64, timer: TimerId) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(ScheduledEvent {
            tick,
            sequence,
            timer,
        });
    }

    /// Pop the next firing if its tick is <= `up_to_tick`.
    pub fn pop_if_ready(&mut self, up_to_tick: u64) -> Option<ScheduledEvent> {
        if self.heap.peek().is_some_and(|e| e.tick <= up_to_tick) {
            self.heap.pop()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct RepeatingTimer {
    period: u64,
    job: CareJob,
}

/// Reference `Scheduler`: repeating timers on a tick-ordered queue.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TickScheduler {
    queue: EventQueue,
    timers: BTreeMap<TimerId, RepeatingTimer>,
    next_timer: u64,
    now: u64,
}

impl TickScheduler {
    pub fn new(now: u64) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    /// Tick of the last firing popped, or the last `up_to_tick` that had
    /// nothing left to fire.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Registered, not-cancelled timers.
    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    /// Pop the next due job at or before `up_to_tick` and re-arm its timer.
    /// Returns the firing tick and the job, or `None` once nothing else is
    /// due, at which point the clock advances to `up_to_tick`.
    pub fn pop_due(&mut self, up_to_tick: u64) -> Option<(u64, CareJob)> {
        while let Some(event) = self.queue.pop_if_ready(up_to_tick) {
            self.now = event.tick;
            let Some(timer) = self.timers.get(&event.timer).copied() else {
                // Cancelled.
                continue;
            };
            self.queue.schedule(event.tick + timer.period, event.timer);
            return Some((event.tick, timer.job));
        }
        self.now = self.now.max(up_to_tick);
        None
    }
}

impl Scheduler for TickScheduler {
    /// A period of 0 is treated as 1 so a timer can never fire twice in the
    /// same tick.
    fn schedule_repeating(&mut self, period_ticks: u64, job: CareJob) -> TimerId {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        let period = period_ticks.max(1);
        self.timers.insert(id, RepeatingTimer { period, job });
        self.queue.schedule(self.now + period, id);
        id
    }

    fn cancel(&mut self, timer: TimerId) {
        self.timers.remove(&timer);
    }
}

// ---------------------------------------------------------------------------
// Narrative events (output)
// ---------------------------------------------------------------------------

/// A narrative event emitted by the service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CareEvent {
    pub tick: u64,
    pub kind: CareEventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CareEventKind {
    /// A trough fed a creature during its cycle.
    CreatureFed {
        creature_id: CreatureId,
        trough: Location,
        items: u32,
        energy: u64,
        satiety: i64,
    },
    /// An actor fed a creature by hand.
    HandFed {
        creature_id: CreatureId,
        actor: ActorId,
        satiety: i64,
        became_full: bool,
    },
    /// A feeding cycle left the trough without consumable food.
    TroughDrained { trough: Location },
    /// Two adjacent containers were joined into one trough.
    PairFormed { key: Location, partner: Location },
    /// A paired trough was dissolved, by breakage or deactivation.
    PairBroken { key: Location, partner: Location },
    /// A creature at zero satiety took starvation damage.
    Starving { creature_id: CreatureId, damage: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_queue_ordering() {
        let mut queue = EventQueue::new();
        queue.schedule(100, TimerId(0));
        queue.schedule(50, TimerId(1));
        queue.schedule(50, TimerId(2));

        let first = queue.pop_if_ready(200).unwrap();
        assert_eq!((first.tick, first.timer), (50, TimerId(1)));
        let second = queue.pop_if_ready(200).unwrap();
        assert_eq!((second.tick, second.timer), (50, TimerId(2)));
        let third = queue.pop_if_ready(200).unwrap();
        assert_eq!(third.tick, 100);
        assert!(queue.pop_if_ready(200).is_none());
    }

    #[test]
    fn pop_if_ready_respects_tick_limit() {
        let mut queue = EventQueue::new();
        queue.schedule(100, TimerId(0));
        assert!(queue.pop_if_ready(99).is_none());
        assert!(queue.pop_if_ready(100).is_some());
    }

    #[test]
    fn repeating_timer_first_fires_one_period_later() {
        let mut sched = TickScheduler::new(10);
        sched.schedule_repeating(20, CareJob::TroughCycle);

        assert_eq!(sched.pop_due(29), None);
        assert_eq!(sched.now(), 29);
        assert_eq!(sched.pop_due(100), Some((30, CareJob::TroughCycle)));
        assert_eq!(sched.pop_due(100), Some((50, CareJob::TroughCycle)));
        assert_eq!(sched.pop_due(100), Some((70, CareJob::TroughCycle)));
        assert_eq!(sched.pop_due(100), Some((90, CareJob::TroughCycle)));
        assert_eq!(sched.pop_due(100), None);
        assert_eq!(sched.now(), 100);
    }

    #[test]
    fn same_tick_firings_keep_registration_order() {
        let mut sched = TickScheduler::new(0);
        sched.schedule_repeating(10, CareJob::EnclosureSweep);
        sched.schedule_repeating(10, CareJob::SatietyTick);
        assert_eq!(sched.pop_due(10), Some((10, CareJob::EnclosureSweep)));
        assert_eq!(sched.pop_due(10), Some((10, CareJob::SatietyTick)));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut sched = TickScheduler::new(0);
        let sweep = sched.schedule_repeating(5, CareJob::EnclosureSweep);
        sched.schedule_repeating(7, CareJob::SatietyTick);
        sched.cancel(sweep);

        assert_eq!(sched.active_timers(), 1);
        assert_eq!(sched.pop_due(10), Some((7, CareJob::SatietyTick)));
        assert_eq!(sched.pop_due(10), None);
    }

    #[test]
    fn zero_period_does_not_spin() {
        let mut sched = TickScheduler::new(0);
        sched.schedule_repeating(0, CareJob::TroughCycle);
        assert_eq!(sched.pop_due(2), Some((1, CareJob::TroughCycle)));
        assert_eq!(sched.pop_due(2), Some((2, CareJob::TroughCycle)));
        assert_eq!(sched.pop_due(2), None);
    }

    #[test]
    fn scheduler_serialization() {
        let mut sched = TickScheduler::new(0);
        sched.schedule_repeating(10, CareJob::SatietyTick);
        let json = serde_json::to_string(&sched).unwrap();
        let mut restored: TickScheduler = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.pop_due(10), Some((10, CareJob::SatietyTick)));
    }
}

// animal_care_sim — captive-animal welfare logic for a voxel world host.
//
// Tracked creatures carry a hidden satiety value that drains while they are
// penned and resets while they roam free. Whether a creature is penned is
// inferred from terrain alone, by a bounded flood fill around it. Troughs
// (named containers) feed hungry penned creatures nearby on a timer.
//
// Module overview:
// - `care.rs`:      AnimalCare — the service facade, lifecycle, job dispatch, hand feeding.
// - `enclosure.rs`: Flood-fill classifier (Wild / Captive / Pasture).
// - `walkable.rs`:  Cell walkability policy used by the flood fill.
// - `cache.rs`:     Per-creature classification cache and periodic sweep.
// - `satiety.rs`:   Satiety ledger: clamped storage, tick rules, low-satiety effects.
// - `trough.rs`:    Trough engine: single/paired storage, deposits, feeding cycles.
// - `event.rs`:     Timer queue, TickScheduler, and narrative CareEvents.
// - `host.rs`:      Port traits the host implements (blocks, creatures, inventories, timers).
// - `world.rs`:     Dense VoxelWorld and HeadlessHost, the in-memory host.
// - `config.rs`:    CareConfig — every tunable parameter, loaded from JSON.
// - `error.rs`:     ConfigError.
// - `types.rs`:     Positions, locations, identities, and named vocabularies.
//
// The companion crate `animal_care_bridge` turns player interactions into
// service calls and renders the outcomes as messages. This crate has no
// notion of chat, commands, or permissions.
//
// **Critical constraint: no fatal paths.** Simulation operations never
// return errors. Misconfiguration is logged and skipped, and a missing
// block, creature, or container reads as an ordinary outcome.

pub mod cache;
pub mod care;
pub mod config;
pub mod enclosure;
pub mod error;
pub mod event;
pub mod host;
pub mod satiety;
pub mod trough;
pub mod types;
pub mod walkable;
pub mod world;

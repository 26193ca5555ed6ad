// animal_care_bridge — interaction layer between a host and the care service.
//
// This crate holds no welfare logic. It turns host input (a player using a
// block, using a creature, breaking a block) into `animal_care_sim` calls,
// renders the outcomes as advisory chat messages, and drives the tick
// scheduler that fires the service's periodic jobs.
//
// Module overview:
// - `bridge.rs`:  `CareBridge` — owns the service, the headless host, and
//                 the scheduler. Also `BridgeConfig` (care config plus debug
//                 tool and message templates) and `BridgeError`.
// - `main.rs`:    `headless` binary: runs a scripted pen scenario and logs
//                 the narrative events.
//
// See also: `animal_care_sim` for all simulation logic.

pub mod bridge;

pub use bridge::{BridgeConfig, BridgeError, CareBridge, DebugConfig, MessageTemplates, Reply};

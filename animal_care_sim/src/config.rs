// Data-driven service configuration.
//
// All tunable parameters live in `CareConfig`, loaded from JSON at startup.
// The service never uses magic numbers — it reads from the config. Every
// section is `#[serde(default)]`, so a partial file is completed from the
// defaults below and a missing file section never fails the load.
//
// Names of species, materials, and items stay as strings here. They are
// resolved into typed sets when the service is built (`resolve_names`),
// and unknown names are dropped with a warning rather than failing. The
// feed energy table is read as raw JSON values so a single malformed entry
// is dropped on its own (see `trough::FeedEnergyTable::from_config`).
//
// See also: `care.rs` which builds every component from this config,
// `error.rs` for `ConfigError`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::warn;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Status effects applied at low satiety.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    /// Satiety at or below which slowness and weakness are applied.
    pub low_threshold: i64,
    /// Damage dealt per satiety tick at zero satiety. 0 disables starvation.
    pub starvation_damage: f64,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            low_threshold: 30,
            starvation_damage: 1.0,
        }
    }
}

/// Satiety ledger parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SatietyConfig {
    /// Upper bound of the satiety range. New creatures start here.
    pub max: i64,
    /// Loss per tick for captive creatures. The sign is ignored; captivity
    /// always drains.
    pub captive_loss: i64,
    /// Signed change per tick for pasture creatures.
    pub pasture_change: i64,
    /// Ticks between satiety updates.
    pub interval_ticks: u64,
    pub effects: EffectsConfig,
}

impl Default for SatietyConfig {
    fn default() -> Self {
        Self {
            max: 100,
            captive_loss: 5,
            pasture_change: -1,
            interval_ticks: 20 * 60,
            effects: EffectsConfig::default(),
        }
    }
}

/// Enclosure detection parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnclosureConfig {
    /// Horizontal flood-fill radius around the creature. 0 disables
    /// detection (every creature is `Wild`).
    pub detection_radius: i32,
    /// Minimum horizontal extent, on both axes, for an enclosure to count
    /// as pasture.
    pub min_pen_size: i32,
    /// How far above or below the seed the flood fill may climb.
    pub max_vertical_delta: i32,
    /// Block names treated as passable even if solid or hazardous.
    pub passable_blocks: Vec<String>,
    /// Ticks between full classification sweeps.
    pub scan_interval_ticks: u64,
}

impl Default for EnclosureConfig {
    fn default() -> Self {
        Self {
            detection_radius: 15,
            min_pen_size: 10,
            max_vertical_delta: 4,
            passable_blocks: Vec::new(),
            scan_interval_ticks: 20 * 60,
        }
    }
}

/// Trough engine parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TroughConfig {
    /// Block names that can act as troughs.
    pub blocks: Vec<String>,
    /// Half-extent of the cube around the trough centre searched for
    /// creatures to feed.
    pub radius: f64,
    /// Ticks between feeding cycles.
    pub feed_interval_ticks: u64,
    /// Creatures fed per trough per cycle.
    pub max_feeds_per_cycle: usize,
    /// Container name required for a block to act as a trough. Compared
    /// case-insensitively with formatting codes stripped. Empty accepts any
    /// container.
    pub name_tag: String,
}

impl Default for TroughConfig {
    fn default() -> Self {
        Self {
            blocks: vec!["barrel".into()],
            radius: 6.0,
            feed_interval_ticks: 20 * 10,
            max_feeds_per_cycle: 3,
            name_tag: "[Trough]".into(),
        }
    }
}

/// Food parameters shared by troughs and hand feeding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedingConfig {
    /// Energy yielded by one item of each food kind. Values that are not
    /// positive integers are dropped with a warning.
    pub item_energy: BTreeMap<String, serde_json::Value>,
    /// Items accepted for hand feeding. Empty means every item in
    /// `item_energy`.
    pub hand_feed_items: Vec<String>,
    /// Love-mode duration after hand feeding a creature to full.
    pub breeding_ticks: u32,
}

impl Default for FeedingConfig {
    fn default() -> Self {
        let item_energy = [
            ("wheat", 25),
            ("wheat_seeds", 10),
            ("carrot", 20),
            ("hay_block", 80),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
        .collect();
        Self {
            item_energy,
            hand_feed_items: Vec::new(),
            breeding_ticks: 600,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level service configuration. Loaded from JSON, never mutated at
/// runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CareConfig {
    /// Species whose satiety is tracked.
    pub tracked_species: Vec<String>,
    pub satiety: SatietyConfig,
    pub enclosure: EnclosureConfig,
    pub trough: TroughConfig,
    pub feeding: FeedingConfig,
}

impl Default for CareConfig {
    fn default() -> Self {
        Self {
            tracked_species: ["cow", "sheep", "pig", "chicken"]
                .into_iter()
                .map(String::from)
                .collect(),
            satiety: SatietyConfig::default(),
            enclosure: EnclosureConfig::default(),
            trough: TroughConfig::default(),
            feeding: FeedingConfig::default(),
        }
    }
}

impl CareConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Resolve configured names into a typed set. Unknown names are logged and
/// skipped; the rest of the list still applies.
pub fn resolve_names<T: Ord>(
    names: &[String],
    parse: impl Fn(&str) -> Option<T>,
    what: &str,
) -> BTreeSet<T> {
    let mut out = BTreeSet::new();
    for name in names {
        match parse(name) {
            Some(value) => {
                out.insert(value);
            }
            None => warn!(name = %name, kind = what, "Unknown name in configuration, skipping"),
        }
    }
    out
}

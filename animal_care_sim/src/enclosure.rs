// Enclosure classifier — infers whether a creature is penned from terrain.
//
// There is no "pen" data structure. A creature is enclosed when the
// walkable region around it is bounded: a breadth-first flood fill from the
// creature's ground cell that never strays more than `detection_radius`
// cells from the seed on either horizontal axis. The fill expands to the
// four horizontal neighbors at three vertical offsets each (same level, one
// up, one down), staying within `max_vertical_delta` of the seed's Y.
//
// Outcomes:
// - `Wild`: the creature is invalid, detection is disabled (radius <= 0),
//   the seed is not walkable, or the fill escaped the radius.
// - `Captive`: the fill drained and either horizontal extent is below
//   `min_pen_size`.
// - `Pasture`: the fill drained and both extents reach `min_pen_size`.
//
// Escape is checked both when a cell is popped and when a neighbor is
// first discovered. The classification depends only on the set of cells
// reachable from the seed, never on the order they are visited, so
// direction order changes nothing but incidental visit order.
//
// Visited cells are bounded by `(2r+1)^2 * (2d+1)` for radius `r` and
// vertical delta `d`; that is the per-creature worst case of one sweep.
//
// See also: `walkable.rs` for the cell predicate, `cache.rs` which stores
// the results between sweeps, `benches/enclosure.rs`.
//
// **Critical constraint: bounded work.** The fill runs on the host's main
// loop. Every path through `flood_fill` terminates within the visited-cell
// bound above.

use crate::config::EnclosureConfig;
use crate::host::{BlockGrid, CreatureRecord};
use crate::types::{BlockPos, HORIZONTAL_OFFSETS, WorldName};
use crate::walkable::WalkabilityPolicy;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Vertical offsets tried for each horizontal step, in order.
const VERTICAL_STEPS: [i32; 3] = [0, 1, -1];

/// Seed probe offsets from the reported Y: down first, then up.
const SEED_PROBES: [i32; 5] = [0, -1, -2, 1, 2];

/// Axis-aligned volume (inclusive) containing an enclosure and its walls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl Bounds {
    pub fn contains(&self, pos: BlockPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }
}

/// A drained flood fill: the enclosing volume and the footprint size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enclosure {
    pub bounds: Bounds,
    /// `max_x - min_x + 1` of the walkable footprint.
    pub width: i32,
    /// `max_z - min_z + 1` of the walkable footprint.
    pub length: i32,
}

/// Containment state inferred from terrain connectivity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnclosureStatus {
    Wild,
    Captive(Enclosure),
    Pasture(Enclosure),
}

impl EnclosureStatus {
    pub fn is_wild(&self) -> bool {
        matches!(self, EnclosureStatus::Wild)
    }

    pub fn enclosure(&self) -> Option<&Enclosure> {
        match self {
            EnclosureStatus::Wild => None,
            EnclosureStatus::Captive(e) | EnclosureStatus::Pasture(e) => Some(e),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EnclosureStatus::Wild => "wild",
            EnclosureStatus::Captive(_) => "captive",
            EnclosureStatus::Pasture(_) => "pasture",
        }
    }
}

/// Result of a single flood fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FloodFill {
    Escaped,
    Enclosed { min: BlockPos, max: BlockPos },
}

/// Stateless classifier; one per service, shared by every caller.
#[derive(Clone, Debug)]
pub struct EnclosureClassifier {
    policy: WalkabilityPolicy,
    detection_radius: i32,
    min_pen_size: i32,
    max_vertical_delta: i32,
}

impl EnclosureClassifier {
    pub fn new(
        policy: WalkabilityPolicy,
        detection_radius: i32,
        min_pen_size: i32,
        max_vertical_delta: i32,
    ) -> Self {
        Self {
            policy,
            detection_radius,
            min_pen_size,
            max_vertical_delta,
        }
    }

    pub fn from_config(config: &EnclosureConfig) -> Self {
        Self::new(
            WalkabilityPolicy::from_config(config),
            config.detection_radius,
            config.min_pen_size,
            config.max_vertical_delta,
        )
    }

    /// Worst-case visited cells for one classification.
    pub fn max_visited_cells(&self) -> usize {
        let side = (2 * self.horizontal_limit() + 1) as usize;
        let depth = (2 * self.vertical_limit() + 1) as usize;
        side * side * depth
    }

    fn horizontal_limit(&self) -> i32 {
        self.detection_radius.max(1)
    }

    fn vertical_limit(&self) -> i32 {
        self.max_vertical_delta.max(1)
    }

    pub fn classify(&self, grid: &impl BlockGrid, creature: &CreatureRecord) -> EnclosureStatus {
        let Some(world) = creature.world.as_ref().filter(|_| creature.valid) else {
            return EnclosureStatus::Wild;
        };
        if self.detection_radius <= 0 {
            return EnclosureStatus::Wild;
        }

        let reported = creature.position.block();
        let seed = self.find_seed(grid, world, reported);
        if !self.policy.is_walkable(grid, world, seed) {
            return EnclosureStatus::Wild;
        }

        match self.flood_fill(grid, world, seed) {
            FloodFill::Escaped => EnclosureStatus::Wild,
            FloodFill::Enclosed { min, max } => {
                let enclosure = Enclosure {
                    bounds: Bounds {
                        min: BlockPos::new(min.x - 1, min.y - 1, min.z - 1),
                        max: BlockPos::new(max.x + 1, max.y + 2, max.z + 1),
                    },
                    width: max.x - min.x + 1,
                    length: max.z - min.z + 1,
                };
                if enclosure.width < self.min_pen_size || enclosure.length < self.min_pen_size {
                    EnclosureStatus::Captive(enclosure)
                } else {
                    EnclosureStatus::Pasture(enclosure)
                }
            }
        }
    }

    /// First walkable cell at the reported Y, then up to two below, then up
    /// to two above. Falls back to the reported cell unchanged.
    pub fn find_seed(&self, grid: &impl BlockGrid, world: &WorldName, reported: BlockPos) -> BlockPos {
        SEED_PROBES
            .iter()
            .map(|&dy| reported.offset(0, dy, 0))
            .find(|&pos| self.policy.is_walkable(grid, world, pos))
            .unwrap_or(reported)
    }

    /// Breadth-first fill from `seed`, aborting as soon as any cell lies
    /// beyond the horizontal radius.
    pub fn flood_fill(&self, grid: &impl BlockGrid, world: &WorldName, seed: BlockPos) -> FloodFill {
        let radius = self.horizontal_limit();
        let vertical = self.vertical_limit();
        let escapes = |pos: BlockPos| (pos.x - seed.x).abs() > radius || (pos.z - seed.z).abs() > radius;

        let mut visited: FxHashSet<BlockPos> = FxHashSet::default();
        let mut queue = VecDeque::new();
        visited.insert(seed);
        queue.push_back(seed);

        let mut min = seed;
        let mut max = seed;

        while let Some(current) = queue.pop_front() {
            if escapes(current) {
                return FloodFill::Escaped;
            }
            min = BlockPos::new(min.x.min(current.x), min.y.min(current.y), min.z.min(current.z));
            max = BlockPos::new(max.x.max(current.x), max.y.max(current.y), max.z.max(current.z));

            for (dx, dz) in HORIZONTAL_OFFSETS {
                for dy in VERTICAL_STEPS {
                    let next = current.offset(dx, dy, dz);
                    if (next.y - seed.y).abs() > vertical {
                        continue;
                    }
                    if visited.contains(&next) || !self.policy.is_walkable(grid, world, next) {
                        continue;
                    }
                    if escapes(next) {
                        return FloodFill::Escaped;
                    }
                    visited.insert(next);
                    queue.push_back(next);
                }
            }
        }

        FloodFill::Enclosed { min, max }
    }
}

// Walkability oracle — "can a creature stand in this cell?"
//
// A cell is walkable when the cell and the one above it are passable and
// the one below can be stood on:
//
// - Passable: air or any non-solid block, unless it is a hazard (water,
//   lava, powder snow). Blocks listed in `enclosure.passable_blocks`
//   override both rules and are always passable.
// - Standable: any solid block except fences, walls, and gates (those are
//   enclosure boundaries, not floors), plus the soft floors that are not
//   full blocks (farmland, snow layers, paths, carpets). Air never is.
//
// The policy holds no mutable state, so it is shared freely between the
// classifier and anything else that wants to ask.
//
// See also: `enclosure.rs`, the only caller on the hot path,
// `types.rs` for the `Material` predicates these rules compose.

use crate::config::{EnclosureConfig, resolve_names};
use crate::host::BlockGrid;
use crate::types::{BlockPos, Material, WorldName};
use std::collections::BTreeSet;

/// Allow/deny policy for standing cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalkabilityPolicy {
    passable_overrides: BTreeSet<Material>,
}

impl WalkabilityPolicy {
    pub fn new(passable_overrides: BTreeSet<Material>) -> Self {
        Self { passable_overrides }
    }

    pub fn from_config(config: &EnclosureConfig) -> Self {
        Self::new(resolve_names(
            &config.passable_blocks,
            Material::from_name,
            "passable block",
        ))
    }

    /// Whether a creature's body can occupy a block of this material.
    pub fn is_passable(&self, material: Material) -> bool {
        if self.passable_overrides.contains(&material) {
            return true;
        }
        if material.is_hazard() {
            return false;
        }
        material.is_air() || !material.is_solid()
    }

    /// Whether a creature can stand on top of a block of this material.
    pub fn can_stand_on(&self, material: Material) -> bool {
        if material.is_air() || material.is_fence_like() {
            return false;
        }
        material.is_soft_floor() || material.is_solid()
    }

    pub fn is_walkable(&self, grid: &impl BlockGrid, world: &WorldName, pos: BlockPos) -> bool {
        self.is_passable(grid.material(world, pos))
            && self.is_passable(grid.material(world, pos.above()))
            && self.can_stand_on(grid.material(world, pos.below()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::VoxelWorld;

    fn world_name() -> WorldName {
        WorldName::new("overworld")
    }

    #[test]
    fn air_above_grass_is_walkable() {
        let mut world = VoxelWorld::new(8, 8, 8);
        world.set(BlockPos::new(2, 0, 2), Material::GrassBlock);
        let policy = WalkabilityPolicy::default();
        assert!(policy.is_walkable(&world, &world_name(), BlockPos::new(2, 1, 2)));
    }

    #[test]
    fn floating_cell_is_not_walkable() {
        let world = VoxelWorld::new(8, 8, 8);
        let policy = WalkabilityPolicy::default();
        assert!(!policy.is_walkable(&world, &world_name(), BlockPos::new(2, 3, 2)));
    }

    #[test]
    fn low_ceiling_blocks_walking() {
        let mut world = VoxelWorld::new(8, 8, 8);
        world.set(BlockPos::new(2, 0, 2), Material::Stone);
        world.set(BlockPos::new(2, 2, 2), Material::Stone);
        let policy = WalkabilityPolicy::default();
        assert!(!policy.is_walkable(&world, &world_name(), BlockPos::new(2, 1, 2)));
    }

    #[test]
    fn fence_tops_are_not_floors() {
        let mut world = VoxelWorld::new(8, 8, 8);
        world.set(BlockPos::new(2, 0, 2), Material::OakFence);
        world.set(BlockPos::new(3, 0, 2), Material::CobblestoneWall);
        world.set(BlockPos::new(4, 0, 2), Material::OakFenceGate);
        let policy = WalkabilityPolicy::default();
        for x in 2..=4 {
            assert!(!policy.is_walkable(&world, &world_name(), BlockPos::new(x, 1, 2)));
        }
    }

    #[test]
    fn soft_floors_are_standable() {
        let policy = WalkabilityPolicy::default();
        for m in [
            Material::Farmland,
            Material::Snow,
            Material::DirtPath,
            Material::WhiteCarpet,
        ] {
            assert!(policy.can_stand_on(m), "{m} should be standable");
        }
        assert!(!policy.can_stand_on(Material::Air));
        assert!(!policy.can_stand_on(Material::Water));
    }

    #[test]
    fn hazards_are_never_passable_by_default() {
        let policy = WalkabilityPolicy::default();
        assert!(!policy.is_passable(Material::Water));
        assert!(!policy.is_passable(Material::Lava));
        assert!(!policy.is_passable(Material::PowderSnow));
        assert!(policy.is_passable(Material::ShortGrass));
        assert!(policy.is_passable(Material::Cobweb));
        assert!(!policy.is_passable(Material::Stone));
    }

    #[test]
    fn overrides_make_blocks_passable() {
        let policy = WalkabilityPolicy::new([Material::Water, Material::OakFenceGate].into());
        assert!(policy.is_passable(Material::Water));
        assert!(policy.is_passable(Material::OakFenceGate));
        // Overrides affect passability only, never standability.
        assert!(!policy.can_stand_on(Material::OakFenceGate));
    }

    #[test]
    fn overrides_load_from_config() {
        let config = EnclosureConfig {
            passable_blocks: vec!["oak_fence_gate".into(), "bogus".into()],
            ..EnclosureConfig::default()
        };
        let policy = WalkabilityPolicy::from_config(&config);
        assert!(policy.is_passable(Material::OakFenceGate));
    }
}

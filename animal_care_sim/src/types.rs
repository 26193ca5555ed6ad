// Core types shared across the animal care simulation.
//
// Defines grid coordinates (`BlockPos`), world-qualified locations
// (`Location`), host-issued identities (`CreatureId`, `ActorId` — UUID
// wrappers), and the enumerated vocabularies the configuration refers to by
// name: `Species`, `Material`, `ItemKind`. All types derive `Serialize` and
// `Deserialize` so inspection snapshots and configs can cross the bridge as
// JSON.
//
// Names are matched case-insensitively and may carry a `minecraft:` prefix,
// so `"COW"`, `"cow"` and `"minecraft:cow"` all resolve to `Species::Cow`.
//
// See also: `host.rs` for the ports that hand these types across the host
// boundary, `config.rs` which resolves configured names into these enums.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A cell in the 3D block grid. Each component is in block units.
///
/// The coordinate system follows the host's conventions:
/// - X: east  (positive) / west  (negative)
/// - Y: up    (positive) / down  (negative)
/// - Z: south (positive) / north (negative)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub const fn above(self) -> Self {
        self.offset(0, 1, 0)
    }

    pub const fn below(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// Centre point of the cell in continuous coordinates.
    pub fn center(self) -> Position {
        Position::new(
            self.x as f64 + 0.5,
            self.y as f64 + 0.5,
            self.z as f64 + 0.5,
        )
    }

    /// True if `other` shares a face with `self` on the same Y level.
    pub fn is_horizontal_neighbor(self, other: Self) -> bool {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        let dz = (self.z - other.z).unsigned_abs();
        dy == 0 && dx + dz == 1
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// The four horizontal face directions, in the fixed order the trough and
/// enclosure scans use.
pub const HORIZONTAL_OFFSETS: [(i32, i32); 4] = [(0, -1), (0, 1), (1, 0), (-1, 0)];

/// A continuous position, as reported by the host for entities.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The grid cell containing this position.
    pub fn block(self) -> BlockPos {
        BlockPos::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }

    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Midpoint between two positions.
    pub fn midpoint(self, other: Self) -> Self {
        Self::new(
            (self.x + other.x) / 2.0,
            (self.y + other.y) / 2.0,
            (self.z + other.z) / 2.0,
        )
    }
}

/// Name of a loaded world. Ordered by string so locations compare by world
/// name first.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldName(pub String);

impl WorldName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A block cell in a specific world.
///
/// The derived ordering is lexicographic: world name, then X, then Y, then
/// Z. Paired troughs use it to pick their canonical key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub world: WorldName,
    pub pos: BlockPos,
}

impl Location {
    pub fn new(world: WorldName, pos: BlockPos) -> Self {
        Self { world, pos }
    }

    /// The location `dx, dz` away on the same level of the same world.
    pub fn shifted(&self, dx: i32, dz: i32) -> Self {
        Self::new(self.world.clone(), self.pos.offset(dx, 0, dz))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.world, self.pos)
    }
}

// ---------------------------------------------------------------------------
// Host identities — 128-bit UUIDs issued by the host
// ---------------------------------------------------------------------------

/// A UUID issued by the host for an entity. The core never generates these;
/// it only compares, orders, and prints them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostUuid([u8; 16]);

impl HostUuid {
    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    /// Parse a UUID from its 8-4-4-4-12 hex string representation.
    pub fn parse(s: &str) -> Option<Self> {
        let hex: String = s.chars().filter(|c| *c != '-').collect();
        if hex.len() != 32 || !hex.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }
}

// Serialize as the 8-4-4-4-12 hex string so ids work as JSON map keys.
impl Serialize for HostUuid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HostUuid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        HostUuid::parse(&s).ok_or_else(|| serde::de::Error::custom("invalid UUID format"))
    }
}

impl fmt::Debug for HostUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostUuid({})", self)
    }
}

impl fmt::Display for HostUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3],
            b[4], b[5],
            b[6], b[7],
            b[8], b[9],
            b[10], b[11], b[12], b[13], b[14], b[15],
        )
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub HostUuid);

        impl $name {
            pub const fn from_u128(value: u128) -> Self {
                Self(HostUuid::from_u128(value))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

entity_id!(/// Stable identity of a creature, issued by the host.
CreatureId);
entity_id!(/// Identity of an acting player.
ActorId);

/// Timer registration handle returned by a `Scheduler`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(pub u64);

/// Which hand an interaction was performed with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hand {
    Main,
    Off,
}

// ---------------------------------------------------------------------------
// Named vocabularies
// ---------------------------------------------------------------------------

/// Lower-case a configured name, strip the `minecraft:` namespace, and map
/// spaces and dashes to underscores.
pub fn normalize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();
    let bare = lowered.strip_prefix("minecraft:").unwrap_or(&lowered);
    bare.replace([' ', '-'], "_")
}

macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical snake_case name.
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Resolve a configured name. Returns `None` for unknown names.
            pub fn from_name(raw: &str) -> Option<Self> {
                let normalized = normalize_name(raw);
                Self::ALL.iter().copied().find(|v| v.name() == normalized)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

named_enum!(
    /// Creature kinds the host can spawn.
    Species {
        Cow => "cow",
        Sheep => "sheep",
        Pig => "pig",
        Chicken => "chicken",
        Goat => "goat",
        Horse => "horse",
        Donkey => "donkey",
        Llama => "llama",
        Rabbit => "rabbit",
        Mooshroom => "mooshroom",
        Wolf => "wolf",
        Villager => "villager",
    }
);

impl Species {
    /// Human-readable name for advisory messages ("mooshroom", "cow").
    pub fn readable_name(self) -> String {
        self.name().replace('_', " ")
    }
}

named_enum!(
    /// Block materials of the host grid.
    Material {
        Air => "air",
        CaveAir => "cave_air",
        GrassBlock => "grass_block",
        Dirt => "dirt",
        Stone => "stone",
        Cobblestone => "cobblestone",
        Sand => "sand",
        Gravel => "gravel",
        OakPlanks => "oak_planks",
        OakLog => "oak_log",
        Glass => "glass",
        HayBlock => "hay_block",
        SnowBlock => "snow_block",
        Farmland => "farmland",
        Snow => "snow",
        DirtPath => "dirt_path",
        WhiteCarpet => "white_carpet",
        RedCarpet => "red_carpet",
        ShortGrass => "short_grass",
        Fern => "fern",
        Dandelion => "dandelion",
        Torch => "torch",
        OakFence => "oak_fence",
        SpruceFence => "spruce_fence",
        NetherBrickFence => "nether_brick_fence",
        OakFenceGate => "oak_fence_gate",
        CobblestoneWall => "cobblestone_wall",
        StoneBrickWall => "stone_brick_wall",
        Water => "water",
        Lava => "lava",
        PowderSnow => "powder_snow",
        Cobweb => "cobweb",
        Barrel => "barrel",
        Chest => "chest",
        Hopper => "hopper",
    }
);

impl Material {
    pub fn is_air(self) -> bool {
        matches!(self, Material::Air | Material::CaveAir)
    }

    /// Whether the block has a full collision shape.
    pub fn is_solid(self) -> bool {
        !matches!(
            self,
            Material::Air
                | Material::CaveAir
                | Material::Snow
                | Material::WhiteCarpet
                | Material::RedCarpet
                | Material::ShortGrass
                | Material::Fern
                | Material::Dandelion
                | Material::Torch
                | Material::Water
                | Material::Lava
                | Material::PowderSnow
                | Material::Cobweb
        )
    }

    /// Fences, walls, and gates. Solid, but boundaries rather than floors.
    pub fn is_fence_like(self) -> bool {
        let name = self.name();
        name.ends_with("_fence") || name.ends_with("_wall") || name.ends_with("_gate")
    }

    /// Liquids and damaging particulate blocks. Never passable, even though
    /// they have no collision shape.
    pub fn is_hazard(self) -> bool {
        matches!(self, Material::Water | Material::Lava | Material::PowderSnow)
    }

    /// Non-solid (or partial) surfaces a creature can still stand on.
    pub fn is_soft_floor(self) -> bool {
        let name = self.name();
        matches!(self, Material::Farmland | Material::Snow)
            || name.ends_with("_path")
            || name.ends_with("_carpet")
    }

    /// Blocks that carry an inventory.
    pub fn has_inventory(self) -> bool {
        matches!(self, Material::Barrel | Material::Chest | Material::Hopper)
    }

    /// Container blocks that can join a horizontally adjacent twin to form a
    /// paired trough.
    pub fn supports_pairing(self) -> bool {
        self == Material::Barrel
    }
}

named_enum!(
    /// Item kinds that can be held, deposited, or stored.
    ItemKind {
        Wheat => "wheat",
        WheatSeeds => "wheat_seeds",
        Carrot => "carrot",
        Potato => "potato",
        Beetroot => "beetroot",
        Apple => "apple",
        HayBlock => "hay_block",
        DriedKelp => "dried_kelp",
        Stick => "stick",
        Cobblestone => "cobblestone",
        WoodenSword => "wooden_sword",
    }
);

/// A stack of identical items in a slot or hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub kind: ItemKind,
    pub amount: u32,
}

impl ItemStack {
    pub const fn new(kind: ItemKind, amount: u32) -> Self {
        Self { kind, amount }
    }
}

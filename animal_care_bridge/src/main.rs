// Headless scenario driver for the animal care bridge.
//
// Builds a small meadow with a cramped pen, a roomy pasture, a paired
// barrel trough, and a few cows and sheep, then steps the service for a
// number of ticks and logs every narrative event. Useful for eyeballing how
// a config change plays out without a game host.
//
// Usage:
//   headless [OPTIONS]
//     --config <PATH>   JSON config (default: built-in defaults)
//     --ticks <N>       Ticks to simulate (default: 6000)
//     --step <N>        Ticks per step (default: 200)
//
// Logging goes through `tracing`; set `RUST_LOG=debug` for sweep and pair
// details.

use animal_care_bridge::{BridgeConfig, CareBridge};
use animal_care_sim::host::{CreatureRecord, CreatureSource};
use animal_care_sim::types::{
    ActorId, BlockPos, CreatureId, Hand, ItemKind, ItemStack, Location, Material, Position,
    Species, WorldName,
};
use animal_care_sim::world::{HeadlessHost, VoxelWorld};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const FARMER: ActorId = ActorId::from_u128(0xFA);

struct Options {
    config: Option<PathBuf>,
    ticks: u64,
    step: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let options = parse_args();
    let config = match &options.config {
        Some(path) => match BridgeConfig::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        },
        None => BridgeConfig::default(),
    };

    let mut bridge = CareBridge::new(&config, scenario_host());
    let overworld = WorldName::new("overworld");

    // Stock the paired trough in the pasture.
    let trough = Location::new(overworld.clone(), BlockPos::new(20, 1, 25));
    bridge
        .host_mut()
        .give(FARMER, Hand::Main, Some(ItemStack::new(ItemKind::Wheat, 12)));
    for _ in 0..12 {
        let reply = bridge.interact_block(FARMER, &trough, Hand::Main);
        if let Some(message) = reply.message {
            info!(actor = %FARMER, "{message}");
        }
    }

    let mut tick = bridge.current_tick();
    let end = tick + options.ticks;
    while tick < end {
        tick = (tick + options.step.max(1)).min(end);
        for event in bridge.step_to_tick(tick) {
            info!(tick = event.tick, event = ?event.kind, "care event");
        }
    }

    for creature in bridge.host().living_creatures() {
        let satiety = bridge.satiety(creature.id);
        info!(
            creature = %creature.id,
            species = %creature.species,
            satiety,
            "final state"
        );
    }
}

/// A 48x12x48 grass meadow with:
/// - a 4x4 fenced pen at x/z 5..=8 holding two cows (captive),
/// - a 14x14 walled pasture at x/z 20..=33 holding two sheep and a cow,
///   with a paired barrel trough against its west wall,
/// - one cow roaming outside.
fn scenario_host() -> HeadlessHost {
    let mut world = VoxelWorld::new(48, 12, 48);
    world.fill_layer(0, Material::GrassBlock);
    world.ring((5, 5), (8, 8), 1, 1, Material::OakFence);
    world.ring((20, 20), (33, 33), 1, 2, Material::CobblestoneWall);

    let overworld = WorldName::new("overworld");
    let mut host = HeadlessHost::new();
    host.add_world(overworld.clone(), world);
    for z in [25, 26] {
        host.place_container(
            &Location::new(overworld.clone(), BlockPos::new(20, 1, z)),
            Material::Barrel,
            Some("[Trough]"),
        );
    }

    let animals = [
        (1u128, Species::Cow, 6.5, 6.5),
        (2, Species::Cow, 7.5, 7.5),
        (3, Species::Sheep, 26.5, 26.5),
        (4, Species::Sheep, 28.5, 24.5),
        (5, Species::Cow, 24.5, 30.5),
        (6, Species::Cow, 42.5, 12.5),
    ];
    for (n, species, x, z) in animals {
        host.spawn(CreatureRecord {
            id: CreatureId::from_u128(n),
            species,
            world: Some(overworld.clone()),
            position: Position::new(x, 1.0, z),
            valid: true,
        });
    }
    host
}

/// Parse command-line arguments. Plain `std::env::args()` matching.
fn parse_args() -> Options {
    let mut options = Options {
        config: None,
        ticks: 6000,
        step: 200,
    };
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                options.config = args.get(i).map(PathBuf::from).or_else(|| {
                    eprintln!("--config requires a path");
                    std::process::exit(1);
                });
            }
            "--ticks" => {
                i += 1;
                options.ticks = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--ticks requires a valid number");
                    std::process::exit(1);
                });
            }
            "--step" => {
                i += 1;
                options.step = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--step requires a valid number");
                    std::process::exit(1);
                });
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    options
}

fn print_usage() {
    println!("Usage: headless [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config <PATH>   JSON config (default: built-in defaults)");
    println!("  --ticks <N>       Ticks to simulate (default: 6000)");
    println!("  --step <N>        Ticks per step (default: 200)");
    println!("  --help, -h        Show this help");
}

// Interaction façade for the care service.
//
// `CareBridge` is the one object a host loop talks to. It owns the
// `AnimalCare` service, a `HeadlessHost` world, and the `TickScheduler`
// that fires the service's repeating jobs, and exposes:
//
// - **Clock:** `step_to_tick(tick)` pops every due job up to `tick`, runs
//   it against the host, and returns the narrative events produced.
// - **Block use:** `interact_block(actor, loc, hand)` — deposits the held
//   food into a trough, or with the debug tool prints a trough report.
// - **Creature use:** `interact_creature(actor, id, hand)` — hand feeding,
//   or with the debug tool a status/satiety report.
// - **Block break:** `break_block(loc)` — deactivates a trough before the
//   block is removed.
//
// Every interaction returns a `Reply`: `handled` tells the host to suppress
// its default action (opening the container, vanilla feeding), `message` is
// an optional advisory line for the acting player. Messages come from
// configurable templates: `%entity%` is replaced by the creature's readable
// name and `&x` colour codes are translated to `§x`. An empty template
// silences that message.
//
// Only main-hand interactions are considered; off-hand events are ignored
// so one click is never handled twice.
//
// See also: `animal_care_sim::care` for the service itself,
// `animal_care_sim::world` for `HeadlessHost`, `main.rs` for the headless
// scenario driver.
//
// **Critical constraint: the bridge never decides welfare outcomes.** It
// only maps service results to replies; everything that changes satiety,
// storage, or classification happens inside `AnimalCare`.

use animal_care_sim::care::{AnimalCare, CreatureSnapshot, HandFeedOutcome};
use animal_care_sim::config::CareConfig;
use animal_care_sim::error::ConfigError;
use animal_care_sim::event::{CareEvent, TickScheduler};
use animal_care_sim::host::{ActorInventory, BlockGrid, Clock, CreatureSource};
use animal_care_sim::trough::{InteractOutcome, TroughInspection, TroughTopology};
use animal_care_sim::types::{ActorId, CreatureId, Hand, ItemKind, Location, Material};
use animal_care_sim::world::HeadlessHost;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Host ticks per real-time second, for the debug report.
const TICKS_PER_SECOND: f64 = 20.0;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    /// Item that triggers the inspection reports.
    pub tool: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tool: "wooden_sword".into(),
        }
    }
}

/// Advisory message templates. `%entity%` expands to the creature name,
/// `&x` to a colour code. Empty strings are never sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTemplates {
    pub wrong_item: String,
    pub not_in_pen: String,
    pub not_hungry: String,
    pub feed_success: String,
    pub trough_filled: String,
    pub trough_full: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            wrong_item: "&cThe %entity% won't eat that.".into(),
            not_in_pen: "&eThe %entity% only takes food inside a pen.".into(),
            not_hungry: "&7The %entity% is not hungry.".into(),
            feed_success: "&aYou fed the %entity%.".into(),
            trough_filled: "&aFood added to the trough.".into(),
            trough_full: "&cThe trough is full.".into(),
        }
    }
}

/// Everything the bridge reads at startup: the service config plus the
/// interaction-layer sections.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    #[serde(flatten)]
    pub care: CareConfig,
    pub debug: DebugConfig,
    pub messages: MessageTemplates,
}

impl BridgeConfig {
    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(json).map_err(|e| BridgeError::Config(ConfigError::from(e)))
    }

    pub fn from_path(path: &Path) -> Result<Self, BridgeError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to load bridge config: {0}")]
    Config(#[from] ConfigError),

    /// A debug inspection named a creature the host does not know.
    #[error("unknown creature {0:?}")]
    UnknownCreature(CreatureId),
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// What the host should do with an interaction after the bridge saw it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    /// Suppress the host's default handling of the interaction.
    pub handled: bool,
    /// Advisory line for the acting player.
    pub message: Option<String>,
}

impl Reply {
    fn handled(message: Option<String>) -> Self {
        Self {
            handled: true,
            message,
        }
    }
}

/// Translate `&x` colour codes into `§x`. Unrecognised codes are left alone.
pub fn colorize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(&code) if c == '&' && is_format_code(code) => {
                out.push('§');
                out.push(code.to_ascii_lowercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

fn is_format_code(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), '0'..='9' | 'a'..='f' | 'k'..='o' | 'r')
}

fn render(template: &str, entity: Option<&str>) -> Option<String> {
    if template.is_empty() {
        return None;
    }
    let text = match entity {
        Some(name) => template.replace("%entity%", name),
        None => template.to_string(),
    };
    Some(colorize(&text))
}

fn creature_report(snapshot: &CreatureSnapshot) -> String {
    format!(
        "§6Animal debug:§7 status={} satiety={}/{}",
        snapshot.status.label(),
        snapshot.satiety,
        snapshot.max
    )
}

fn trough_report(report: &TroughInspection) -> String {
    let kind = match report.topology {
        TroughTopology::Single => "single",
        TroughTopology::Paired => "paired",
    };
    let seconds = report.ticks_until_next_cycle as f64 / TICKS_PER_SECOND;
    format!(
        "§6Trough debug:§7 type={kind} food={} animals={} active={} next feed in {seconds:.1}s",
        report.stored_items,
        report.nearby_qualifying,
        if report.active { "yes" } else { "no" },
    )
}

// ---------------------------------------------------------------------------
// CareBridge
// ---------------------------------------------------------------------------

pub struct CareBridge {
    care: AnimalCare,
    host: HeadlessHost,
    scheduler: TickScheduler,
    debug_tool: Option<ItemKind>,
    messages: MessageTemplates,
}

impl CareBridge {
    /// Build the service over `host` and start it at the host's current
    /// tick.
    pub fn new(config: &BridgeConfig, host: HeadlessHost) -> Self {
        let debug_tool = config.debug.enabled.then(|| {
            ItemKind::from_name(&config.debug.tool).unwrap_or_else(|| {
                warn!(tool = %config.debug.tool, "Unknown debug tool, using wooden_sword");
                ItemKind::WoodenSword
            })
        });
        let now = host.current_tick();
        let mut bridge = Self {
            care: AnimalCare::new(&config.care),
            host,
            scheduler: TickScheduler::new(now),
            debug_tool,
            messages: config.messages.clone(),
        };
        bridge.start();
        bridge
    }

    pub fn start(&mut self) {
        let now = self.host.current_tick();
        self.care.start(&mut self.scheduler, now);
    }

    pub fn stop(&mut self) {
        self.care.stop(&mut self.host, &mut self.scheduler);
    }

    pub fn care(&self) -> &AnimalCare {
        &self.care
    }

    pub fn host(&self) -> &HeadlessHost {
        &self.host
    }

    /// Direct host access for terrain and creature setup.
    pub fn host_mut(&mut self) -> &mut HeadlessHost {
        &mut self.host
    }

    pub fn current_tick(&self) -> u64 {
        self.host.current_tick()
    }

    pub fn satiety(&self, id: CreatureId) -> i64 {
        self.care.satiety(&self.host, id)
    }

    /// Status and satiety of a tracked creature, as the debug tool shows it.
    pub fn snapshot(&mut self, id: CreatureId) -> Option<CreatureSnapshot> {
        self.care.inspect_creature(&self.host, id)
    }

    /// Fire every job due up to `target_tick` and return the events produced
    /// since the last drain. Targets in the past are clamped to now.
    pub fn step_to_tick(&mut self, target_tick: u64) -> Vec<CareEvent> {
        let target = target_tick.max(self.host.current_tick());
        while let Some((tick, job)) = self.scheduler.pop_due(target) {
            self.host.set_tick(tick);
            self.care.run_job(job, &mut self.host);
        }
        self.host.set_tick(target);
        self.care.take_events()
    }

    /// Events produced by interactions since the last drain.
    pub fn take_events(&mut self) -> Vec<CareEvent> {
        self.care.take_events()
    }

    fn holds_debug_tool(&self, actor: ActorId, hand: Hand) -> bool {
        self.debug_tool.is_some_and(|tool| {
            self.host
                .held_item(actor, hand)
                .is_some_and(|stack| stack.kind == tool)
        })
    }

    /// A player used the block at `loc`.
    pub fn interact_block(&mut self, actor: ActorId, loc: &Location, hand: Hand) -> Reply {
        if hand != Hand::Main || !self.care.is_trough_material(self.host.material_at(loc)) {
            return Reply::default();
        }
        if self.holds_debug_tool(actor, hand) {
            let message = match self.care.inspect(&mut self.host, loc) {
                Some(report) => trough_report(&report),
                None => "§cNo trough at this block.".to_string(),
            };
            return Reply::handled(Some(message));
        }
        match self.care.handle_interact(&mut self.host, actor, loc, hand) {
            InteractOutcome::Added => Reply::handled(render(&self.messages.trough_filled, None)),
            InteractOutcome::ContainerFull => {
                Reply::handled(render(&self.messages.trough_full, None))
            }
            // Not feeding: the container opens normally.
            InteractOutcome::NotTrough | InteractOutcome::NotFeedItem => Reply::default(),
        }
    }

    /// A player used the creature `id`. Fails only when the debug tool is
    /// pointed at a creature the host does not know.
    pub fn interact_creature(
        &mut self,
        actor: ActorId,
        id: CreatureId,
        hand: Hand,
    ) -> Result<Reply, BridgeError> {
        if hand != Hand::Main {
            return Ok(Reply::default());
        }
        let creature = self.host.creature(id);

        if self.holds_debug_tool(actor, hand) {
            if creature.is_none() {
                return Err(BridgeError::UnknownCreature(id));
            }
            return Ok(match self.care.inspect_creature(&self.host, id) {
                Some(snapshot) => Reply::handled(Some(creature_report(&snapshot))),
                None => Reply::default(),
            });
        }

        let name = creature
            .map(|c| c.species.readable_name())
            .unwrap_or_default();
        let outcome = self.care.hand_feed(&mut self.host, actor, id, hand);
        debug!(creature = ?id, ?outcome, "Hand feed");
        let template = match outcome {
            HandFeedOutcome::Unmanaged => return Ok(Reply::default()),
            HandFeedOutcome::WrongItem => &self.messages.wrong_item,
            HandFeedOutcome::NotInPen => &self.messages.not_in_pen,
            HandFeedOutcome::NotHungry => &self.messages.not_hungry,
            HandFeedOutcome::Fed { .. } => &self.messages.feed_success,
        };
        Ok(Reply::handled(render(template, Some(&name))))
    }

    /// The block at `loc` was broken. Troughs are deactivated first, then
    /// the block becomes air.
    pub fn break_block(&mut self, loc: &Location) {
        if self.care.is_trough_material(self.host.material_at(loc)) {
            self.care.deactivate(&mut self.host, loc);
        }
        self.host.set_block(loc, Material::Air);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use animal_care_sim::host::CreatureRecord;
    use animal_care_sim::types::{BlockPos, ItemStack, Position, Species, WorldName};
    use animal_care_sim::world::VoxelWorld;

    const ACTOR: ActorId = ActorId::from_u128(0xA);
    const PENNED: CreatureId = CreatureId::from_u128(1);
    const FREE: CreatureId = CreatureId::from_u128(2);

    fn overworld() -> WorldName {
        WorldName::new("overworld")
    }

    fn trough() -> Location {
        Location::new(overworld(), BlockPos::new(10, 1, 10))
    }

    /// Fenced 6x6 pen at x/z 10..=15 with a named barrel in one corner, a
    /// cow inside and a cow outside.
    fn bridge(config: BridgeConfig) -> CareBridge {
        let mut world = VoxelWorld::new(32, 8, 32);
        world.fill_layer(0, Material::GrassBlock);
        world.ring((10, 10), (15, 15), 1, 1, Material::OakFence);
        let mut host = HeadlessHost::new();
        host.add_world(overworld(), world);
        host.place_container(&trough(), Material::Barrel, Some("[Trough]"));
        for (n, x) in [(1u128, 12.5), (2, 24.5)] {
            host.spawn(CreatureRecord {
                id: CreatureId::from_u128(n),
                species: Species::Cow,
                world: Some(overworld()),
                position: Position::new(x, 1.0, 12.5),
                valid: true,
            });
        }
        CareBridge::new(&config, host)
    }

    fn config() -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.care.enclosure.detection_radius = 8;
        config
    }

    fn debug_config() -> BridgeConfig {
        let mut config = config();
        config.debug.enabled = true;
        config
    }

    #[test]
    fn colour_codes_translate() {
        assert_eq!(colorize("&aGreen &Lbold"), "§aGreen §lbold");
        assert_eq!(colorize("fish & chips &z"), "fish & chips &z");
        assert_eq!(colorize("trailing &"), "trailing &");
    }

    #[test]
    fn templates_expand_entity_and_skip_empty() {
        assert_eq!(
            render("&aYou fed the %entity%.", Some("mooshroom")),
            Some("§aYou fed the mooshroom.".into())
        );
        assert_eq!(render("", Some("cow")), None);
    }

    #[test]
    fn config_sections_default_independently() {
        let config = BridgeConfig::from_json(
            r#"{ "tracked_species": ["sheep"], "debug": { "enabled": true },
                 "messages": { "trough_full": "" } }"#,
        )
        .unwrap();
        assert_eq!(config.care.tracked_species, vec!["sheep".to_string()]);
        assert!(config.debug.enabled);
        assert_eq!(config.debug.tool, "wooden_sword");
        assert!(config.messages.trough_full.is_empty());
        assert_eq!(config.messages.not_hungry, MessageTemplates::default().not_hungry);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(matches!(
            BridgeConfig::from_json("{ not json"),
            Err(BridgeError::Config(ConfigError::Parse(_)))
        ));
        assert!(matches!(
            BridgeConfig::from_path(Path::new("/nonexistent/animal_care.json")),
            Err(BridgeError::Config(ConfigError::Io { .. }))
        ));
    }

    #[test]
    fn deposit_replies() {
        let mut bridge = bridge(config());
        bridge
            .host_mut()
            .give(ACTOR, Hand::Main, Some(ItemStack::new(ItemKind::Wheat, 3)));

        let reply = bridge.interact_block(ACTOR, &trough(), Hand::Main);
        assert!(reply.handled);
        assert_eq!(reply.message.as_deref(), Some("§aFood added to the trough."));

        // Off-hand and non-food interactions fall through to the host.
        assert_eq!(bridge.interact_block(ACTOR, &trough(), Hand::Off), Reply::default());
        bridge
            .host_mut()
            .give(ACTOR, Hand::Main, Some(ItemStack::new(ItemKind::Cobblestone, 1)));
        assert_eq!(bridge.interact_block(ACTOR, &trough(), Hand::Main), Reply::default());
    }

    #[test]
    fn hand_feed_replies() {
        let mut bridge = bridge(config());
        bridge
            .host_mut()
            .give(ACTOR, Hand::Main, Some(ItemStack::new(ItemKind::Wheat, 4)));

        let reply = bridge.interact_creature(ACTOR, PENNED, Hand::Main).unwrap();
        assert_eq!(reply.message.as_deref(), Some("§7The cow is not hungry."));

        let reply = bridge.interact_creature(ACTOR, FREE, Hand::Main).unwrap();
        assert_eq!(reply.message.as_deref(), Some("§eThe cow only takes food inside a pen."));

        bridge.care.add_satiety(&mut bridge.host, PENNED, -30);
        let reply = bridge.interact_creature(ACTOR, PENNED, Hand::Main).unwrap();
        assert!(reply.handled);
        assert_eq!(reply.message.as_deref(), Some("§aYou fed the cow."));
        assert_eq!(bridge.care().satiety(bridge.host(), PENNED), 95);

        // Unknown creatures are not ours to handle.
        let reply = bridge
            .interact_creature(ACTOR, CreatureId::from_u128(77), Hand::Main)
            .unwrap();
        assert_eq!(reply, Reply::default());
    }

    #[test]
    fn debug_tool_reports() {
        let mut bridge = bridge(debug_config());
        bridge
            .host_mut()
            .give(ACTOR, Hand::Main, Some(ItemStack::new(ItemKind::WoodenSword, 1)));

        let reply = bridge.interact_creature(ACTOR, PENNED, Hand::Main).unwrap();
        assert_eq!(
            reply.message.as_deref(),
            Some("§6Animal debug:§7 status=captive satiety=100/100")
        );
        assert!(matches!(
            bridge.interact_creature(ACTOR, CreatureId::from_u128(77), Hand::Main),
            Err(BridgeError::UnknownCreature(_))
        ));

        let reply = bridge.interact_block(ACTOR, &trough(), Hand::Main);
        assert!(reply.handled);
        let message = reply.message.unwrap();
        assert!(message.starts_with("§6Trough debug:§7 type=single food=0 animals=1"));
    }

    #[test]
    fn unknown_debug_tool_falls_back_to_the_sword() {
        let mut config = debug_config();
        config.debug.tool = "golden_trident".into();
        let mut bridge = bridge(config);
        bridge
            .host_mut()
            .give(ACTOR, Hand::Main, Some(ItemStack::new(ItemKind::WoodenSword, 1)));

        let reply = bridge.interact_creature(ACTOR, PENNED, Hand::Main).unwrap();
        assert_eq!(
            reply.message.as_deref(),
            Some("§6Animal debug:§7 status=captive satiety=100/100")
        );
    }

    #[test]
    fn disabled_debug_tool_is_just_an_item() {
        let mut bridge = bridge(config());
        bridge
            .host_mut()
            .give(ACTOR, Hand::Main, Some(ItemStack::new(ItemKind::WoodenSword, 1)));
        let reply = bridge.interact_creature(ACTOR, PENNED, Hand::Main).unwrap();
        assert_eq!(reply.message.as_deref(), Some("§cThe cow won't eat that."));
    }

    #[test]
    fn stepping_fires_jobs_and_advances_the_clock() {
        let mut bridge = bridge(config());
        bridge.step_to_tick(1200);
        assert_eq!(bridge.current_tick(), 1200);
        assert_eq!(bridge.care().satiety(bridge.host(), PENNED), 95);
        assert_eq!(bridge.care().satiety(bridge.host(), FREE), 100);

        // Going backwards is a no-op.
        bridge.step_to_tick(10);
        assert_eq!(bridge.current_tick(), 1200);

        bridge.stop();
        bridge.step_to_tick(5000);
        assert_eq!(bridge.care().satiety(bridge.host(), PENNED), 95);
    }

    #[test]
    fn breaking_a_trough_deactivates_it() {
        let mut bridge = bridge(debug_config());
        bridge
            .host_mut()
            .give(ACTOR, Hand::Main, Some(ItemStack::new(ItemKind::Wheat, 1)));
        bridge.interact_block(ACTOR, &trough(), Hand::Main);

        bridge.break_block(&trough());
        assert_eq!(bridge.host().material_at(&trough()), Material::Air);
        assert!(bridge.host().container_items(&trough()).is_empty());
    }
}

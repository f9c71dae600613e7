//! Layout Sim - headless layout runner
//!
//! Builds a seeded side-view level (floor with gaps, floating platforms,
//! walkers driven by scripted input) and steps it for a fixed number of
//! frames, printing a summary or a JSON snapshot of the final state.

use std::path::PathBuf;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use layout_core::behaviors::{
    register_builtins, DamageableBehavior, FallRespawnBehavior, PlatformerBehavior, TimerBehavior,
};
use layout_core::ecs::{DefinitionCatalog, EntitySnapshot};
use layout_core::{
    Button, ButtonSet, EntityDefinition, EntityId, FrameStats, InputSnapshot, Layout, LayoutConfig,
    Result, Vec2,
};

const TILE: f32 = 32.0;
const FRAME_DELTA: f32 = 1.0 / 60.0;

#[derive(Parser, Debug)]
#[command(name = "layout-sim")]
#[command(about = "Step a seeded platformer layout headlessly")]
struct Args {
    /// Layout config (TOML); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra entity definitions (TOML `[[entity]]` tables) spawned along the floor
    #[arg(long)]
    definitions: Option<PathBuf>,

    /// Number of frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Number of walkers
    #[arg(long, default_value_t = 3)]
    walkers: usize,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Print the final state as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct SimReport {
    seed: u64,
    frames: u64,
    last_frame: FrameStats,
    respawns: u32,
    entities: Vec<EntitySnapshot>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("layout_core=info")),
        )
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let config = match &args.config {
        Some(path) => LayoutConfig::load(path)?,
        None => LayoutConfig::default(),
    };
    let mut layout = Layout::new(config)?;

    let mut catalog = DefinitionCatalog::new();
    register_builtins(&mut catalog);
    if let Some(path) = &args.definitions {
        catalog.load(path)?;
    }

    build_level(&mut layout, &mut rng);
    let walkers = spawn_walkers(&mut layout, &mut rng, args.walkers);
    spawn_catalog_entities(&mut layout, &catalog, args.definitions.is_some())?;

    tracing::info!(
        "Simulating {} frames with {} walkers (seed {})",
        args.frames,
        walkers.len(),
        seed
    );

    let mut input = InputSnapshot::idle();
    let mut last_frame = FrameStats::default();
    for frame in 0..args.frames {
        input = input.advance(scripted_buttons(frame));

        // A hazard tick: one random walker gets hurt every few seconds
        if frame > 0 && frame % 180 == 0 && !walkers.is_empty() {
            let target = walkers[rng.gen_range(0..walkers.len())];
            if let Some(damageable) = layout.behavior_mut::<DamageableBehavior>(target) {
                damageable.damage(1);
            }
        }

        last_frame = layout.step(FRAME_DELTA, input)?;
    }

    let respawns: u32 = walkers
        .iter()
        .filter_map(|&id| layout.behavior::<FallRespawnBehavior>(id))
        .map(|r| r.respawns())
        .sum();

    if args.json {
        let report = SimReport {
            seed,
            frames: args.frames,
            last_frame,
            respawns,
            entities: layout.snapshot(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n=== LAYOUT SIM ===");
    println!("Seed: {}", seed);
    println!("Frames: {}", layout.frame());
    println!("Live entities: {}", last_frame.live);
    println!("Respawns: {}", respawns);
    println!();
    for &id in &walkers {
        match layout.entity(id) {
            Some(walker) => {
                let health = layout
                    .behavior::<DamageableBehavior>(id)
                    .map_or(0, |d| d.health());
                let state = layout
                    .behavior::<PlatformerBehavior>(id)
                    .map(|p| format!("{:?}", p.state()))
                    .unwrap_or_default();
                println!(
                    "  {} {:<8} pos ({:>7.1}, {:>6.1})  hp {}  {}",
                    id,
                    walker.name(),
                    walker.position().x,
                    walker.position().y,
                    health,
                    state
                );
            }
            None => println!("  {} destroyed", id),
        }
    }

    Ok(())
}

/// Floor along the bottom edge with random gaps, plus floating platforms
fn build_level(layout: &mut Layout, rng: &mut ChaCha8Rng) {
    let world = layout.grid().world_bounds();
    let tile = EntityDefinition::new(Vec2::new(TILE, TILE))
        .named("floor")
        .solid()
        .with_tag("terrain");
    let platform = EntityDefinition::new(Vec2::new(TILE * 3.0, TILE / 2.0))
        .named("platform")
        .solid()
        .with_tag("terrain");

    let columns = (world.width() / TILE) as usize;
    let floor_y = world.bottom() - TILE;
    let mut tiles = 0;
    for column in 0..columns {
        // Keep solid ground under the spawn area
        if column > 3 && rng.gen_bool(0.12) {
            continue;
        }
        layout.spawn(&tile, Vec2::new(column as f32 * TILE, floor_y));
        tiles += 1;
    }

    let xs = world.left()..world.right() - TILE * 3.0;
    let ys = world.top() + TILE * 4.0..floor_y - TILE * 3.0;
    let mut platforms = 0;
    if !xs.is_empty() && !ys.is_empty() {
        platforms = rng.gen_range(3..7);
        for _ in 0..platforms {
            let x = rng.gen_range(xs.clone());
            let y = rng.gen_range(ys.clone());
            layout.spawn(&platform, Vec2::new(x, y));
        }
    }

    tracing::debug!("Level: {} floor tiles, {} platforms", tiles, platforms);
}

fn spawn_walkers(layout: &mut Layout, rng: &mut ChaCha8Rng, count: usize) -> Vec<EntityId> {
    let walker = EntityDefinition::new(Vec2::new(24.0, 32.0))
        .named("walker")
        .with_origin(Vec2::new(12.0, 32.0))
        .overlap()
        .with_tag("actor")
        .with_behavior(TimerBehavior::new)
        .with_behavior(|| DamageableBehavior::new(3).with_invulnerability(1.0))
        .with_behavior(PlatformerBehavior::default)
        .with_behavior(FallRespawnBehavior::new);

    (0..count)
        .map(|_| {
            let x = rng.gen_range(TILE..TILE * 4.0);
            layout.spawn(&walker, Vec2::new(x, TILE * 4.0))
        })
        .collect()
}

/// One of every catalog definition, evenly spaced above the floor
fn spawn_catalog_entities(layout: &mut Layout, catalog: &DefinitionCatalog, enabled: bool) -> Result<()> {
    if !enabled {
        return Ok(());
    }
    let mut names: Vec<&str> = catalog.names().collect();
    names.sort_unstable();

    let spacing = layout.config().width / (names.len() + 1) as f32;
    for (i, name) in names.into_iter().enumerate() {
        let definition = catalog.require(name)?.clone();
        layout.spawn(&definition, Vec2::new(spacing * (i + 1) as f32, TILE * 2.0));
    }
    Ok(())
}

/// Run right, jump every second and a half, turn around every four seconds
fn scripted_buttons(frame: u64) -> ButtonSet {
    let direction = if (frame / 240) % 2 == 0 {
        Button::Right
    } else {
        Button::Left
    };
    let mut buttons = ButtonSet::new().with(direction);
    if frame % 90 < 20 {
        buttons.insert(Button::Jump);
    }
    buttons
}

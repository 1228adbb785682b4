#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that hosts a Conquest session.
//!
//! Without a window the session runs for a fixed number of ticks, commits the
//! spawn immediately and keeps dispatching attacks whenever the previous one
//! finished. With a window, left click previews a spawn (or dispatches an
//! attack once playing), Enter commits, Space arms the placement highlight and
//! Escape quits.

mod config;
mod map;
mod script;
mod session;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use conquest_core::{CellIndex, Command, Event, SessionPhase};
use conquest_rendering::{
    build_overlays, Color, Compositor, OverlayContext, PointerState, Presentation,
    RenderingBackend,
};
use conquest_rendering_macroquad::MacroquadBackend;
use conquest_world::World;
use tracing_subscriber::EnvFilter;

use crate::{
    config::CliConfig,
    script::Script,
    session::{log_events, Session},
};

#[derive(Debug, Parser)]
#[command(name = "conquest", about = "Pixel-grid territorial conquest")]
struct CliArgs {
    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Ocean layer PNG.
    #[arg(long, requires = "land")]
    ocean: Option<PathBuf>,
    /// Land layer PNG.
    #[arg(long, requires = "ocean")]
    land: Option<PathBuf>,
    /// Width the rasters are resampled to.
    #[arg(long)]
    width: Option<u32>,
    /// Seed of the procedural map used when no rasters are given.
    #[arg(long)]
    seed: Option<u64>,
    /// JSON script of remote notifications.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Run without opening a window.
    #[arg(long)]
    headless: bool,
    /// Number of ticks simulated in headless mode.
    #[arg(long, default_value_t = 600)]
    ticks: u64,
    /// Spawn cell requested by the local player in headless mode.
    #[arg(long)]
    spawn: Option<u32>,
    /// Share of troops dispatched per attack, in percent.
    #[arg(long)]
    attack_ratio: Option<u8>,
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Request vertical sync from the windowing backend.
    #[arg(long)]
    vsync: bool,
    /// Log the frame rate once per second.
    #[arg(long)]
    show_fps: bool,
}

impl CliArgs {
    fn apply_overrides(&self, config: &mut CliConfig) {
        if let Some(ocean) = &self.ocean {
            config.map.ocean = Some(ocean.clone());
        }
        if let Some(land) = &self.land {
            config.map.land = Some(land.clone());
        }
        if let Some(width) = self.width {
            config.map.width = width;
        }
        if let Some(seed) = self.seed {
            config.map.seed = seed;
        }
        if let Some(script) = &self.script {
            config.session.script = Some(script.clone());
        }
        if let Some(spawn) = self.spawn {
            config.session.spawn = Some(spawn);
        }
        if let Some(ratio) = self.attack_ratio {
            config.session.attack_ratio = ratio;
        }
    }
}

/// Entry point for the Conquest command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_level)?;

    let mut config = match &args.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    args.apply_overrides(&mut config);

    let world = build_world(&config)?;
    let script = match &config.session.script {
        Some(path) => Script::load(path)?,
        None => Script::default(),
    };
    let session = Session::new(world, &config.session, config.simulation, script);

    if args.headless {
        run_headless(session, config.session.spawn, args.ticks)
    } else {
        run_windowed(session, args.vsync, args.show_fps)
    }
}

fn init_tracing(fallback: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .with_context(|| format!("invalid log filter {fallback:?}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init()
        .map_err(anyhow::Error::from_boxed)
        .context("failed to install the log subscriber")
}

fn build_world(config: &CliConfig) -> Result<World> {
    let map = &config.map;
    let (ocean, land) = match (&map.ocean, &map.land) {
        (Some(ocean), Some(land)) => map::load_rasters(ocean, land, map.width)?,
        _ => map::procedural(map.procedural_width, map.procedural_height, map.seed)?,
    };
    World::from_rasters(&ocean, &land, map.land_alpha_threshold)
        .context("failed to build the grid from terrain rasters")
}

fn run_headless(mut session: Session, spawn: Option<u32>, ticks: u64) -> Result<()> {
    let requested = spawn
        .map(CellIndex::new)
        .unwrap_or_else(|| session.simulation().world().center());
    log_events(&session.preview(requested));
    log_events(&session.issue(Command::CommitSpawn));
    if session.simulation().phase() != SessionPhase::Playing {
        anyhow::bail!("spawn at cell {} could not be committed", requested.get());
    }

    for _ in 0..ticks {
        if session.simulation().banked() <= 0.0 {
            log_events(&session.attack());
        }
        log_events(&session.tick());
    }

    let simulation = session.simulation();
    let claimed = simulation
        .local_territory()
        .map_or(0, |territory| territory.claimed());
    tracing::info!(
        ticks = simulation.tick(),
        claimed,
        claimable = simulation.world().claimable_cells(),
        troops = session.treasury().troops(),
        mirrors = simulation.mirrors().len(),
        undelivered = session.script().remaining(),
        "headless session finished"
    );
    Ok(())
}

fn run_windowed(mut session: Session, vsync: bool, show_fps: bool) -> Result<()> {
    let world = session.simulation().world();
    let presentation = Presentation::new(
        "Conquest",
        Color::from_rgb_u8(15, 23, 42),
        world.width(),
        world.height(),
    )?;

    let mut backend = MacroquadBackend::new().with_show_fps(show_fps);
    if vsync {
        backend = backend.with_vsync(true);
    }

    let mut compositor = Compositor::new();
    let mut pointer = PointerState::default();

    backend.run(presentation, move |_dt, input, viewport, surface| {
        let mut events: Vec<Event> = Vec::new();
        pointer.hovered = input.cursor.and_then(|cursor| viewport.cell_at(cursor));
        let phase = session.simulation().phase();

        if input.mode_toggle && phase == SessionPhase::Playing {
            pointer.placement_armed = !pointer.placement_armed;
        }
        if input.primary_click {
            match (phase, pointer.hovered) {
                (SessionPhase::SpawnSelection, Some(cell)) => {
                    pointer.selected = Some(cell);
                    events.extend(session.preview(cell));
                }
                (SessionPhase::Playing, _) => events.extend(session.attack()),
                (SessionPhase::SpawnSelection, None) => {}
            }
        }
        if input.confirm_action {
            events.extend(session.issue(Command::CommitSpawn));
        }
        events.extend(session.tick());
        log_events(&events);

        let simulation = session.simulation();
        let remote_spawns = session.remote_spawns();
        let context = OverlayContext {
            world: simulation.world(),
            phase: simulation.phase(),
            local: simulation.local_entity(),
            remote_spawns: &remote_spawns,
        };
        let overlays = build_overlays(&context, &pointer);
        let _ = compositor.present(simulation.world(), &overlays, surface);
    })
}

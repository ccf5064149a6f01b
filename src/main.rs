/*
 * Herd Simulation - Headless Runner
 *
 * Spawns a population, drives it through the frame driver for a number of
 * frames and logs debug snapshots along the way. Useful for profiling and
 * for checking that a TOML configuration behaves before wiring it into a
 * front end.
 *
 * Logging is controlled with RUST_LOG, e.g. RUST_LOG=herdsim=debug.
 */

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use herdsim::{FrameDriver, SimError, Simulation, SimulationConfig, Species};

// Agents per spawn request
const GROUP_SIZE: usize = 10;

/// Headless herd simulation runner
#[derive(Parser, Debug)]
#[command(name = "herdsim")]
#[command(about = "Run the herd simulation without a window and log what the herds do")]
struct Args {
    /// TOML configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Species to spawn
    #[arg(long, default_value = "Sheep")]
    species: String,

    /// Number of agents to spawn
    #[arg(long, short = 'n', default_value_t = 100)]
    count: usize,

    /// Frames to run
    #[arg(long, short = 'f', default_value_t = 600)]
    frames: u64,

    /// Speed multiplier (clamped to 0..=8)
    #[arg(long)]
    speed: Option<f32>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Pace frames against the wall clock instead of a virtual one
    #[arg(long)]
    realtime: bool,

    /// Log a debug snapshot every N frames
    #[arg(long, default_value_t = 60)]
    report_every: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("herdsim=info")),
        )
        .init();

    let args = Args::parse();
    if let Err(err) = run(&args) {
        tracing::error!(%err, "simulation failed");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> herdsim::Result<()> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::new(),
    };
    if args.seed.is_some() {
        config.engine.seed = args.seed;
    }

    let species = match args.species.parse::<Species>() {
        Ok(species) => species,
        Err(SimError::UnknownSpecies(name)) => {
            tracing::warn!(%name, "unknown species, spawning sheep instead");
            Species::Sheep
        }
        Err(err) => return Err(err),
    };

    let mut driver = FrameDriver::new(&config.driver);
    if let Some(speed) = args.speed {
        driver.set_speed_multiplier(speed);
    }

    let seed = config.engine.seed.unwrap_or_else(rand::random);
    let (width, height) = (config.world.width.max(1.0), config.world.height.max(1.0));
    let mut sim = Simulation::new(config);

    // Scatter the population in groups across the world
    let mut rng = StdRng::seed_from_u64(seed);
    let mut remaining = args.count;
    while remaining > 0 {
        let group = remaining.min(GROUP_SIZE);
        let centre = Vec2::new(rng.gen_range(0.0..width), rng.gen_range(0.0..height));
        sim.spawn(species, centre, group);
        remaining -= group;
    }

    tracing::info!(
        %species,
        count = args.count,
        frames = args.frames,
        speed = driver.speed_multiplier(),
        realtime = args.realtime,
        seed,
        "starting simulation"
    );

    let started = Instant::now();
    let mut now = started;
    for _ in 0..args.frames {
        let report = driver.frame(&mut sim, now)?;

        if args.report_every > 0 && report.frame % args.report_every == 0 {
            tracing::info!("{}", sim.debug_info());
        }

        if args.realtime {
            let wait = report.next_deadline.saturating_duration_since(Instant::now());
            std::thread::sleep(wait);
            now = Instant::now();
        } else {
            now = report.next_deadline;
        }
    }

    sim.validate()?;
    let info = sim.debug_info();
    tracing::info!(
        ticks = info.tick_count,
        flocks = info.flocks,
        largest_flock = info.largest_flock,
        mean_flock_size = info.mean_flock_size(),
        elapsed = ?started.elapsed(),
        "simulation finished"
    );
    Ok(())
}

//! # engine_app — demo runner
//!
//! Builds the kinematics demo world, spawns a batch of particles and drives
//! it with the fixed-timestep tick loop until the tick budget is used up.
//! Set `RUST_LOG=debug` to watch systems matching and dropping entities.

mod demo;
mod tick;

use anyhow::Result;
use clap::Parser;
use engine_ecs::{Registry, WorldConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tick::{TickConfig, TickLoop};

#[derive(Parser)]
#[command(name = "engine_app", about = "Run the kinematics ECS demo")]
struct Args {
    /// Target ticks per second
    #[arg(short, long, default_value_t = 60.0)]
    tick_rate: f64,

    /// Number of ticks to run (0 runs until interrupted)
    #[arg(short = 'n', long, default_value_t = 180)]
    ticks: u64,

    /// Number of particles to spawn
    #[arg(short, long, default_value_t = 16)]
    particles: usize,

    /// Spare list nodes pre-allocated per container
    #[arg(long, default_value_t = 32)]
    pool_warmup: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    if !(args.tick_rate > 0.0 && args.tick_rate.is_finite()) {
        anyhow::bail!("tick rate must be positive and finite, got {}", args.tick_rate);
    }

    let mut registry = Registry::new();
    demo::build(
        &mut registry,
        args.particles,
        WorldConfig::new().with_pool_warmup(args.pool_warmup),
    )?;

    let config = TickConfig {
        tick_rate: args.tick_rate,
        max_ticks: args.ticks,
    };
    let mut tick_loop = TickLoop::new(config, registry, demo::WORLD);
    tick_loop.run()?;

    let world = tick_loop.world()?;
    info!(
        ticks = world.tick_count(),
        survivors = world.entities().len(),
        "demo finished"
    );
    Ok(())
}

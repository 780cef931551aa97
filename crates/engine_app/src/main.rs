//! # engine_app
//!
//! Runs a small scene on the action-dispatch core: a stopwatch agent that
//! ends the scene after a configurable amount of simulated time, and a
//! heartbeat producer with an agent counting its beats.
//!
//! ## Configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults.
//! 2. A JSON file given with `--config`.
//! 3. `ENGINE_TIME_STEP`, `ENGINE_TICK_RATE`, `ENGINE_MAX_TICKS`.
//! 4. Command-line flags.

mod demo;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use engine_agent::Agent;
use engine_scene::{SceneError, TickConfig, TickLoop};
use tracing::info;
use tracing_subscriber::EnvFilter;

use demo::{BeatCounter, Stopwatch, heartbeat_source};

#[derive(Parser)]
#[command(name = "engine_app", about = "Runs a demo scene on the action-dispatch core")]
struct Args {
    /// Path to a JSON tick configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated seconds per time step (0 for variable steps)
    #[arg(long)]
    time_step: Option<f64>,

    /// Target updates per second
    #[arg(long)]
    tick_rate: Option<f64>,

    /// Maximum number of updates (0 = unlimited)
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Simulated seconds before the stopwatch ends the scene
    #[arg(long, default_value_t = 1.0)]
    run_for: f64,

    /// Exit code reported when the stopwatch ends the scene
    #[arg(long, default_value_t = 0)]
    exit_code: i32,

    /// Updates between heartbeats
    #[arg(long, default_value_t = 10)]
    heartbeat_every: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!(?config, "engine_app starting");

    let mut tick_loop = TickLoop::new(config)?;
    let scene = tick_loop.scene_mut();
    let stopwatch =
        scene.add_agent(Agent::from_behaviour(Stopwatch::new(args.run_for, args.exit_code))?)?;
    let counter = scene.add_agent(Agent::from_behaviour(BeatCounter::default())?)?;
    tick_loop.add_source(heartbeat_source(args.heartbeat_every));

    let code = match tick_loop.run() {
        Ok(code) => code,
        Err(SceneError::NotEnded) => {
            info!(ticks = tick_loop.tick_id(), "stopped before the scene ended");
            0
        }
        Err(err) => return Err(err.into()),
    };

    let scene = tick_loop.scene();
    let beats = scene
        .agent::<BeatCounter>(counter)
        .map_or(0, |counter| counter.beats);
    let simulated = scene
        .agent::<Stopwatch>(stopwatch)
        .map_or(0.0, Stopwatch::elapsed);
    info!(code, ticks = tick_loop.tick_id(), beats, simulated, "engine_app shut down");
    std::process::exit(code);
}

fn load_config(args: &Args) -> Result<TickConfig> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => TickConfig::default(),
    }
    .with_overrides(|var| std::env::var(var).ok())?;

    if let Some(time_step) = args.time_step {
        config = config.with_time_step(time_step);
    }
    if let Some(tick_rate) = args.tick_rate {
        config = config.with_tick_rate(tick_rate);
    }
    if let Some(max_ticks) = args.max_ticks {
        config = config.with_max_ticks(max_ticks);
    }
    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<TickConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::{info, warn, LogPlugin};
use bevy::prelude::*;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use trailsim::config::SimConfig;
use trailsim::systems::SimulationPlugin;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless ant foraging simulation", long_about = None)]
struct Cli {
    /// JSON config file; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many host ticks (0 runs forever)
    #[arg(short, long, default_value_t = 0)]
    ticks: u64,

    /// Override the number of ants
    #[arg(short, long)]
    ants: Option<usize>,

    /// Seed for a reproducible run
    #[arg(short, long)]
    seed: Option<u64>,

    /// Simulated milliseconds per host tick
    #[arg(long, default_value_t = 16.0)]
    tick_ms: f64,
}

fn load_config(cli: &Cli) -> SimConfig {
    let mut config = match &cli.config {
        Some(path) => match SimConfig::from_json_file(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(err) => {
                warn!("{err}; falling back to default config");
                SimConfig::default()
            }
        },
        None => {
            info!("Using default config");
            SimConfig::default()
        }
    };

    if let Some(ants) = cli.ants {
        config.initial_ants = ants;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    config
}

fn main() -> AppExit {
    let cli = Cli::parse();
    let tick_ms = if cli.tick_ms > 0.0 && cli.tick_ms.is_finite() {
        cli.tick_ms
    } else {
        16.0
    };

    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(tick_ms / 1000.0))),
        LogPlugin::default(),
    ));

    let config = load_config(&cli);
    info!(
        "Starting with {} ants in a {}x{} world, {} ms per tick",
        config.initial_ants, config.world_width, config.world_height, tick_ms
    );

    app.add_plugins(SimulationPlugin {
        config,
        tick_ms,
        max_ticks: cli.ticks,
    })
    .run()
}

//! Maze Link Server
//!
//! Serves the maze game over HTTP and mirrors it onto the attached device.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use maze_link::{
    config::{Cli, ServiceConfig},
    core::rng::{clock_seed, DeterministicRng},
    device::{connect, DeviceHandle},
    driver::GameDriver,
    game::maze::MazeGenerator,
    network::GameServer,
    VERSION,
};

#[cfg(feature = "debug-tracing")]
const DEFAULT_FILTER: &str = "maze_link=debug,tower_http=debug,info";
#[cfg(not(feature = "debug-tracing"))]
const DEFAULT_FILTER: &str = "info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();

    let config = ServiceConfig::try_from(Cli::parse()).context("invalid configuration")?;

    info!("Maze Link Server v{}", VERSION);
    info!(
        "Maze: {}x{}, goal at {}",
        config.maze.width,
        config.maze.height,
        config.maze.goal()
    );

    let seed = config.seed.unwrap_or_else(clock_seed);
    info!("RNG Seed: {}", seed);

    // Opening the port sleeps while the board resets.
    let device_config = config.device.clone();
    let link = tokio::task::spawn_blocking(move || connect(&device_config))
        .await
        .context("device connection task failed")?;
    let device = DeviceHandle::spawn(
        link,
        config.device.timing,
        config.device.queue_capacity,
    );
    info!(mode = ?device.mode(), port = ?device.port(), "Device link ready");

    let generator = MazeGenerator::new(config.maze)?;
    let driver = GameDriver::new(generator, DeterministicRng::new(seed), device);

    GameServer::new(config.server, driver)
        .run()
        .await
        .context("server failed")?;

    Ok(())
}

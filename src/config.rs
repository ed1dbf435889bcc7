//! Service Configuration
//!
//! Command-line flags (with environment fallbacks) resolved into the
//! per-subsystem configs the rest of the crate consumes.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

use crate::device::link::DeviceConfig;
use crate::game::maze::{MazeConfig, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::network::server::ServerConfig;

/// Default HTTP listen port.
pub const DEFAULT_WEB_PORT: u16 = 3002;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Grid too small to separate start and goal.
    #[error("maze must be at least {min}x{min}, got {width}x{height}")]
    InvalidDimensions {
        /// Requested columns
        width: usize,
        /// Requested rows
        height: usize,
        /// Minimum side
        min: usize,
    },

    /// An explicit device path was empty.
    #[error("device path must not be empty")]
    EmptyDevicePath,
}

/// Maze game server that mirrors the board onto a serial-attached microcontroller.
#[derive(Parser, Debug, Clone)]
#[command(name = "maze-link-server")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Web server port
    #[arg(long, env = "MAZE_PORT", default_value_t = DEFAULT_WEB_PORT)]
    pub port: u16,

    /// Address to bind to
    #[arg(long, env = "MAZE_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Serial device path (auto-detected when omitted)
    #[arg(long = "arduino-port", env = "MAZE_DEVICE")]
    pub arduino_port: Option<String>,

    /// Run without hardware; device commands are logged and answered locally
    #[arg(long, env = "MAZE_DEBUG")]
    pub debug: bool,

    /// Maze width
    #[arg(long, env = "MAZE_WIDTH", default_value_t = DEFAULT_WIDTH)]
    pub width: usize,

    /// Maze height
    #[arg(long, env = "MAZE_HEIGHT", default_value_t = DEFAULT_HEIGHT)]
    pub height: usize,

    /// Seed for maze generation (system clock when omitted)
    #[arg(long, env = "MAZE_SEED")]
    pub seed: Option<u64>,

    /// Directory holding the browser front end
    #[arg(long, env = "MAZE_STATIC_DIR", default_value = "frontend")]
    pub static_dir: PathBuf,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Maze dimensions
    pub maze: MazeConfig,
    /// Device link selection and timing
    pub device: DeviceConfig,
    /// HTTP listener
    pub server: ServerConfig,
    /// Generation seed, if pinned
    pub seed: Option<u64>,
}

impl TryFrom<Cli> for ServiceConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let maze = MazeConfig {
            width: cli.width,
            height: cli.height,
        };
        maze.validate()?;

        if cli.arduino_port.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(ConfigError::EmptyDevicePath);
        }

        Ok(Self {
            maze,
            device: DeviceConfig {
                port_path: cli.arduino_port,
                debug: cli.debug,
                ..DeviceConfig::default()
            },
            server: ServerConfig {
                bind_addr: SocketAddr::new(cli.host, cli.port),
                static_dir: cli.static_dir,
            },
            seed: cli.seed,
        })
    }
}

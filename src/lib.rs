//! # Maze Link Server
//!
//! Single-player maze game served over HTTP and mirrored onto a
//! serial-attached microcontroller that drives a physical display.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     MAZE LINK SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── grid.rs     - Positions and directions                  │
//! │  └── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │                                                              │
//! │  game/           - Game logic (no I/O)                       │
//! │  ├── maze.rs     - Grid, generation, reachability            │
//! │  ├── state.rs    - Player, moves, win detection              │
//! │  └── events.rs   - Transition results                        │
//! │                                                              │
//! │  device/         - Peripheral link (best-effort)             │
//! │  ├── protocol.rs - Line commands and replies                 │
//! │  ├── link.rs     - Link variants and selection               │
//! │  ├── serial.rs   - Port discovery and serial transport       │
//! │  └── worker.rs   - Background queue to the link              │
//! │                                                              │
//! │  driver.rs       - Game state → device commands              │
//! │  config.rs       - CLI flags and environment                 │
//! │                                                              │
//! │  network/        - HTTP surface                              │
//! │  ├── server.rs   - Axum router and listener                  │
//! │  └── protocol.rs - JSON response bodies                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Device Isolation
//!
//! The game never waits on the peripheral. State changes are applied first;
//! the matching commands are queued to a worker thread that owns the link.
//! A missing, slow or misbehaving device degrades to a log line.
//!
//! Given the same seed, maze generation produces the same sequence of mazes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod device;
pub mod driver;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use config::{Cli, ConfigError, ServiceConfig};
pub use core::grid::{Direction, Position};
pub use core::rng::DeterministicRng;
pub use device::{DeviceCommand, DeviceHandle, DeviceLink, LinkMode};
pub use driver::{GameDriver, MoveReport};
pub use game::maze::{Cell, Maze, MazeConfig, MazeGenerator};
pub use game::state::{GameState, Snapshot};
pub use network::{GameServer, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Game Logic Module
//!
//! Maze generation and the single-player game state. No I/O happens here.
//!
//! ## Module Structure
//!
//! - `maze`: Grid, cells, generation, reachability
//! - `state`: Player position, moves, win detection
//! - `events`: What each transition changed

pub mod events;
pub mod maze;
pub mod state;

// Re-export key types
pub use events::{GameEvent, MoveOutcome, MoveResult};
pub use maze::{Cell, Maze, MazeConfig, MazeGenerator};
pub use state::{GameState, GameStateError, Snapshot};

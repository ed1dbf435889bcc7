//! Network Layer
//!
//! HTTP surface for the browser front end. All game logic runs through
//! [`crate::driver`]; handlers only translate requests and responses.

pub mod protocol;
pub mod server;

pub use protocol::{DeviceStatusResponse, MazeResponse, MoveResponse, NewMazeResponse};
pub use server::{router, AppState, GameServer, GameServerError, ServerConfig};

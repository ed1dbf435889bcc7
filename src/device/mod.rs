//! Device Layer
//!
//! Keeps the serial-attached peripheral in step with the game. This layer is
//! best-effort: nothing here can fail a game operation.

pub mod link;
pub mod protocol;
pub mod serial;
pub mod worker;

pub use link::{connect, DebugLink, DeviceConfig, DeviceLink, DeviceTiming, DisconnectedLink, LinkMode};
pub use protocol::{DeviceCommand, DeviceReply, BAUD_RATE};
pub use serial::{DeviceError, SerialLink};
pub use worker::DeviceHandle;

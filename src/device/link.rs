//! Device Links
//!
//! A [`DeviceLink`] carries protocol commands to the peripheral. The variant
//! is chosen once by [`connect`] and every caller treats it the same way:
//!
//! - [`SerialLink`]: real serial port, handshake verified
//! - [`DebugLink`]: no hardware; answers locally
//! - [`DisconnectedLink`]: hardware missing or handshake failed; drops commands

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::device::protocol::{is_pong, DeviceCommand};
use crate::device::serial::{resolve_port, SerialLink};

/// How the link ended up after startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    /// No device; commands are discarded.
    Disconnected,
    /// No device by request; commands are answered locally.
    Debug,
    /// Live serial device.
    Connected,
}

/// Fixed waits of the peripheral protocol, plus read bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceTiming {
    /// Wait after opening the port (the board resets on open).
    pub open_settle: Duration,
    /// Wait after each write before draining replies.
    pub response_wait: Duration,
    /// How long the handshake may take to see `PONG`.
    pub handshake_window: Duration,
    /// Upper bound on any single blocking read.
    pub read_timeout: Duration,
    /// Gap between a maze snapshot and the player position that follows it.
    pub maze_to_player: Duration,
    /// Gap after a reset so the board can clear its win display.
    pub after_reset: Duration,
    /// Gap after a win so the victory animation can play.
    pub win_hold: Duration,
}

impl Default for DeviceTiming {
    fn default() -> Self {
        Self {
            open_settle: Duration::from_secs(2),
            response_wait: Duration::from_millis(100),
            handshake_window: Duration::from_secs(1),
            read_timeout: Duration::from_secs(1),
            maze_to_player: Duration::from_millis(500),
            after_reset: Duration::from_millis(500),
            win_hold: Duration::from_secs(1),
        }
    }
}

impl DeviceTiming {
    /// No waits at all. Used by tests and the debug link.
    pub const fn immediate() -> Self {
        Self {
            open_settle: Duration::ZERO,
            response_wait: Duration::ZERO,
            handshake_window: Duration::ZERO,
            read_timeout: Duration::ZERO,
            maze_to_player: Duration::ZERO,
            after_reset: Duration::ZERO,
            win_hold: Duration::ZERO,
        }
    }

    /// Pause the peripheral needs after `command` before the next one.
    pub fn pause_after(&self, command: &DeviceCommand) -> Duration {
        match command {
            DeviceCommand::Maze(_) => self.maze_to_player,
            DeviceCommand::Reset => self.after_reset,
            DeviceCommand::Win => self.win_hold,
            DeviceCommand::Ping | DeviceCommand::Player(_) => Duration::ZERO,
        }
    }
}

/// Device link configuration.
#[derive(Clone, Debug)]
pub struct DeviceConfig {
    /// Explicit port path; auto-detected when `None`.
    pub port_path: Option<String>,
    /// Skip hardware entirely.
    pub debug: bool,
    /// Protocol waits.
    pub timing: DeviceTiming,
    /// Commands that may wait for the worker before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port_path: None,
            debug: false,
            timing: DeviceTiming::default(),
            queue_capacity: 64,
        }
    }
}

/// Transport to the peripheral.
///
/// Implementations never fail outward: I/O problems are logged and come back
/// as an empty response.
pub trait DeviceLink: Send {
    /// Which variant this is.
    fn mode(&self) -> LinkMode;

    /// Port the link talks to, if any.
    fn port_name(&self) -> Option<&str> {
        None
    }

    /// Send one command and return whatever the peer answered (possibly empty).
    fn send_command(&mut self, command: &DeviceCommand) -> String;

    /// `PING`/`PONG` exchange.
    fn handshake(&mut self) -> bool {
        is_pong(&self.send_command(&DeviceCommand::Ping))
    }
}

/// Link used when no hardware is wanted. Every command succeeds.
#[derive(Debug, Default)]
pub struct DebugLink {
    sent: u64,
}

impl DebugLink {
    /// Create a debug link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands accepted so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl DeviceLink for DebugLink {
    fn mode(&self) -> LinkMode {
        LinkMode::Debug
    }

    fn send_command(&mut self, command: &DeviceCommand) -> String {
        self.sent += 1;
        info!("DEBUG: would send to device: {}", command);
        match command {
            DeviceCommand::Ping => "PONG".to_string(),
            _ => "OK".to_string(),
        }
    }
}

/// Link used when the device is absent. Commands go nowhere.
#[derive(Debug, Default)]
pub struct DisconnectedLink;

impl DeviceLink for DisconnectedLink {
    fn mode(&self) -> LinkMode {
        LinkMode::Disconnected
    }

    fn send_command(&mut self, command: &DeviceCommand) -> String {
        debug!(command = command.kind(), "device not connected, dropping command");
        String::new()
    }
}

/// Establish the link for this process. Never retried.
///
/// Blocks for the port settle time when hardware is found.
pub fn connect(config: &DeviceConfig) -> Box<dyn DeviceLink> {
    if config.debug {
        info!("Running in debug mode - skipping device connection");
        return Box::new(DebugLink::new());
    }

    let path = match resolve_port(config.port_path.as_deref()) {
        Ok(path) => path,
        Err(e) => {
            warn!("{}; run with --arduino-port PORT or --debug", e);
            return Box::new(DisconnectedLink);
        }
    };

    info!("Connecting to device on {}...", path);
    match SerialLink::connect(&path, config.timing) {
        Ok(link) => {
            info!("Device connected on {}", path);
            Box::new(link)
        }
        Err(e) => {
            warn!("Failed to connect to device on {}: {}", path, e);
            Box::new(DisconnectedLink)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Records every encoded command; answers like the debug link.
    #[derive(Clone, Default)]
    pub struct RecordingLink {
        pub log: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingLink {
        pub fn sent(&self) -> Vec<String> {
            self.log.lock().map(|l| l.clone()).unwrap_or_default()
        }
    }

    impl DeviceLink for RecordingLink {
        fn mode(&self) -> LinkMode {
            LinkMode::Connected
        }

        fn port_name(&self) -> Option<&str> {
            Some("recording")
        }

        fn send_command(&mut self, command: &DeviceCommand) -> String {
            if let Ok(mut log) = self.log.lock() {
                log.push(command.encode());
            }
            match command {
                DeviceCommand::Ping => "PONG".to_string(),
                _ => "OK".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::Position;

    #[test]
    fn test_debug_link_handshake_always_succeeds() {
        let mut link = DebugLink::new();
        assert!(link.handshake());
        assert!(link.send_command(&DeviceCommand::Ping).contains("PONG"));
    }

    #[test]
    fn test_debug_link_answers_every_command() {
        let mut link = DebugLink::new();
        for command in [
            DeviceCommand::Reset,
            DeviceCommand::Win,
            DeviceCommand::Player(Position::new(1, 1)),
            DeviceCommand::Maze("[[0]]".into()),
        ] {
            assert!(!link.send_command(&command).is_empty());
        }
        assert_eq!(link.sent(), 4);
    }

    #[test]
    fn test_disconnected_link_is_silent() {
        let mut link = DisconnectedLink;
        assert_eq!(link.send_command(&DeviceCommand::Win), "");
        assert!(!link.handshake());
        assert_eq!(link.mode(), LinkMode::Disconnected);
    }

    #[test]
    fn test_connect_debug_mode() {
        let config = DeviceConfig {
            debug: true,
            ..DeviceConfig::default()
        };
        assert_eq!(connect(&config).mode(), LinkMode::Debug);
    }

    #[test]
    fn test_connect_missing_port_falls_back() {
        let config = DeviceConfig {
            port_path: Some("/dev/maze-link-does-not-exist".into()),
            timing: DeviceTiming::immediate(),
            ..DeviceConfig::default()
        };
        let link = connect(&config);
        assert_eq!(link.mode(), LinkMode::Disconnected);
    }

    #[test]
    fn test_pause_after_commands() {
        let timing = DeviceTiming::default();
        assert_eq!(timing.pause_after(&DeviceCommand::Maze(String::new())), Duration::from_millis(500));
        assert_eq!(timing.pause_after(&DeviceCommand::Win), Duration::from_secs(1));
        assert_eq!(timing.pause_after(&DeviceCommand::Player(Position::new(0, 0))), Duration::ZERO);
    }
}

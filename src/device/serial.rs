//! Serial Transport
//!
//! Port discovery and the live serial link.

use std::io::{self, Read, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, SerialPort, SerialPortInfo, SerialPortType};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::device::link::{DeviceLink, DeviceTiming, LinkMode};
use crate::device::protocol::{is_pong, DeviceCommand, BAUD_RATE};

/// Conventional device paths tried when nothing looks like the board.
pub const CONVENTIONAL_PORTS: &[&str] = &[
    "/dev/ttyACM0",
    "/dev/ttyUSB0",
    "/dev/cu.usbmodem1401",
    "/dev/cu.usbmodem1301",
    "/dev/cu.usbmodem14201",
    "COM3",
    "COM4",
];

/// How often a pending read re-checks the input buffer.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Device-layer errors. None of these escape the link boundary.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No plausible port was found.
    #[error("could not auto-detect a device port")]
    NoPortFound,

    /// The port could not be opened.
    #[error("failed to open port: {0}")]
    Open(#[from] serialport::Error),

    /// Read or write failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The peer answered the handshake with something other than `PONG`.
    #[error("device not responding properly: {0:?}")]
    HandshakeRejected(String),
}

/// Use `explicit` if given, otherwise auto-detect.
pub fn resolve_port(explicit: Option<&str>) -> Result<String, DeviceError> {
    if let Some(path) = explicit {
        return Ok(path.to_string());
    }
    discover_port().ok_or(DeviceError::NoPortFound)
}

/// Scan the OS port list for something that looks like the board.
pub fn discover_port() -> Option<String> {
    info!("Looking for device ports...");
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            warn!("Could not enumerate serial ports: {}", e);
            Vec::new()
        }
    };

    for port in &ports {
        debug!("  {} - {}", port.port_name, describe(&port.port_type));
    }

    choose_port(&ports, |path| Path::new(path).exists())
}

/// Pick a port: board-like descriptors first, then the conventional paths
/// that are either enumerated or present according to `exists`.
pub fn choose_port(ports: &[SerialPortInfo], exists: impl Fn(&str) -> bool) -> Option<String> {
    if let Some(port) = ports.iter().find(|p| looks_like_board(p)) {
        info!(
            "Found potential device at {} - {}",
            port.port_name,
            describe(&port.port_type)
        );
        return Some(port.port_name.clone());
    }

    CONVENTIONAL_PORTS
        .iter()
        .find(|path| ports.iter().any(|p| p.port_name == **path) || exists(path))
        .map(|path| {
            info!("Falling back to conventional port {}", path);
            path.to_string()
        })
}

fn looks_like_board(port: &SerialPortInfo) -> bool {
    let name = &port.port_name;
    if name.contains("usbmodem") || name.contains("cu.") {
        return true;
    }
    match &port.port_type {
        SerialPortType::UsbPort(usb) => [usb.product.as_deref(), usb.manufacturer.as_deref()]
            .into_iter()
            .flatten()
            .any(|s| s.contains("Arduino")),
        _ => false,
    }
}

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .or_else(|| usb.manufacturer.clone())
            .unwrap_or_else(|| format!("USB {:04x}:{:04x}", usb.vid, usb.pid)),
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "n/a".to_string(),
    }
}

/// Live serial link. Owns the port for the life of the process.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    path: String,
    timing: DeviceTiming,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("path", &self.path)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl SerialLink {
    /// Open `path`, let the board settle, and require `PONG` within the
    /// handshake window.
    pub fn connect(path: &str, timing: DeviceTiming) -> Result<Self, DeviceError> {
        let port = serialport::new(path, BAUD_RATE)
            .timeout(timing.read_timeout)
            .open()?;
        Self::establish(port, path, timing)
    }

    /// Take over an already-open port: settle, drop stale input, then
    /// require `PONG` within the handshake window.
    pub fn establish(
        port: Box<dyn SerialPort>,
        path: &str,
        timing: DeviceTiming,
    ) -> Result<Self, DeviceError> {
        let mut link = Self::from_port(port, path, timing);

        thread::sleep(timing.open_settle);
        // Boot chatter from the board is not a handshake reply.
        if let Err(e) = link.port.clear(ClearBuffer::Input) {
            debug!("could not clear input buffer: {}", e);
        }

        let response = link.ping()?;
        if is_pong(&response) {
            Ok(link)
        } else {
            Err(DeviceError::HandshakeRejected(response))
        }
    }

    fn from_port(port: Box<dyn SerialPort>, path: &str, timing: DeviceTiming) -> Self {
        Self {
            port,
            path: path.to_string(),
            timing,
        }
    }

    fn ping(&mut self) -> io::Result<String> {
        self.write_line(&DeviceCommand::Ping)?;
        let deadline = Instant::now() + self.timing.handshake_window;
        self.read_until(deadline, is_pong)
    }

    fn write_line(&mut self, command: &DeviceCommand) -> io::Result<()> {
        self.port.write_all(&command.to_line())?;
        self.port.flush()
    }

    /// Collect reply text until `done` accepts it or `deadline` passes.
    /// Each blocking read is bounded by the port timeout.
    fn read_until(&mut self, deadline: Instant, done: impl Fn(&str) -> bool) -> io::Result<String> {
        let mut raw = Vec::new();
        loop {
            let pending = self.port.bytes_to_read()? as usize;
            if pending > 0 {
                let mut buf = vec![0u8; pending];
                let n = self.port.read(&mut buf)?;
                raw.extend_from_slice(&buf[..n]);
                continue;
            }

            let text = normalize(&raw);
            if done(&text) || Instant::now() >= deadline {
                return Ok(text);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn exchange(&mut self, command: &DeviceCommand) -> io::Result<String> {
        self.write_line(command)?;
        thread::sleep(self.timing.response_wait);
        // Drain only what has already arrived.
        self.read_until(Instant::now(), |_| true)
    }
}

impl DeviceLink for SerialLink {
    fn mode(&self) -> LinkMode {
        LinkMode::Connected
    }

    fn port_name(&self) -> Option<&str> {
        Some(&self.path)
    }

    fn send_command(&mut self, command: &DeviceCommand) -> String {
        match self.exchange(command) {
            Ok(response) => response,
            Err(e) => {
                warn!("Error sending {} to device: {}", command.kind(), e);
                String::new()
            }
        }
    }
}

/// Trim every received line and terminate each with `\n`.
fn normalize(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .fold(String::new(), |mut acc, line| {
            acc.push_str(line);
            acc.push('\n');
            acc
        })
}

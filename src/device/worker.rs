//! Device Worker
//!
//! Runs the blocking link on its own thread behind a bounded queue, so a slow
//! or hung peripheral never stalls request handling. Commands are processed
//! strictly in submission order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::device::link::{DeviceLink, DeviceTiming, LinkMode};
use crate::device::protocol::{parse_response, DeviceCommand};

/// Work item for the device thread.
#[derive(Debug)]
enum DeviceJob {
    /// Send one command.
    Send(DeviceCommand),
    /// Signal once every earlier job is done.
    Flush(oneshot::Sender<()>),
}

/// Cheap, cloneable front end to the device thread.
#[derive(Clone, Debug)]
pub struct DeviceHandle {
    tx: mpsc::Sender<DeviceJob>,
    mode: LinkMode,
    port: Option<String>,
    dropped: Arc<AtomicU64>,
}

impl DeviceHandle {
    /// Move `link` onto a dedicated thread and return a handle to it.
    pub fn spawn(link: Box<dyn DeviceLink>, timing: DeviceTiming, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let mode = link.mode();
        let port = link.port_name().map(str::to_string);

        let spawned = thread::Builder::new()
            .name("device-link".to_string())
            .spawn(move || run_worker(link, timing, rx));
        if let Err(e) = spawned {
            // The receiver went down with the closure; submissions will be dropped.
            error!("Failed to start device worker: {}", e);
        }

        Self {
            tx,
            mode,
            port,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Link variant chosen at startup.
    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    /// Port path, when connected.
    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    /// Commands dropped because the queue was full or the worker had stopped.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Queue a command without waiting. Returns false if it was dropped.
    pub fn submit(&self, command: DeviceCommand) -> bool {
        match self.tx.try_send(DeviceJob::Send(command)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(DeviceJob::Send(command))) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Device queue full, dropping {}", command.kind());
                false
            }
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Device worker unavailable: {}", e);
                false
            }
        }
    }

    /// Wait until every command submitted before this call has been handled.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(DeviceJob::Flush(done_tx)).await.is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

fn run_worker(mut link: Box<dyn DeviceLink>, timing: DeviceTiming, mut rx: mpsc::Receiver<DeviceJob>) {
    info!(mode = ?link.mode(), "Device worker started");

    while let Some(job) = rx.blocking_recv() {
        match job {
            DeviceJob::Send(command) => {
                debug!("Sending to device: {}", command);
                let response = link.send_command(&command);
                if response.is_empty() {
                    debug!(command = command.kind(), "no response from device");
                } else {
                    debug!(command = command.kind(), replies = ?parse_response(&response), "device response");
                }

                let pause = timing.pause_after(&command);
                if !pause.is_zero() {
                    thread::sleep(pause);
                }
            }
            DeviceJob::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    info!("Device worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::Position;
    use crate::device::link::testing::RecordingLink;
    use crate::device::link::{DebugLink, DisconnectedLink};

    #[tokio::test]
    async fn test_commands_processed_in_order() {
        let link = RecordingLink::default();
        let handle = DeviceHandle::spawn(Box::new(link.clone()), DeviceTiming::immediate(), 8);

        assert!(handle.submit(DeviceCommand::Reset));
        assert!(handle.submit(DeviceCommand::Maze("[[0]]".into())));
        assert!(handle.submit(DeviceCommand::Player(Position::new(1, 1))));
        handle.flush().await;

        assert_eq!(link.sent(), vec!["RESET:TRUE", "MAZE:[[0]]", "PLAYER:1,1"]);
        assert_eq!(handle.mode(), LinkMode::Connected);
        assert_eq!(handle.port(), Some("recording"));
    }

    #[tokio::test]
    async fn test_disconnected_worker_accepts_and_discards() {
        let handle = DeviceHandle::spawn(Box::new(DisconnectedLink), DeviceTiming::immediate(), 4);

        assert!(handle.submit(DeviceCommand::Win));
        handle.flush().await;

        assert_eq!(handle.mode(), LinkMode::Disconnected);
        assert_eq!(handle.port(), None);
        assert_eq!(handle.dropped(), 0);
    }

    #[tokio::test]
    async fn test_debug_worker() {
        let handle = DeviceHandle::spawn(Box::new(DebugLink::new()), DeviceTiming::immediate(), 4);
        assert!(handle.submit(DeviceCommand::Ping));
        handle.flush().await;
        assert_eq!(handle.mode(), LinkMode::Debug);
    }

    #[test]
    fn test_full_queue_drops_instead_of_blocking() {
        // No worker draining the queue.
        let (tx, _rx) = mpsc::channel(1);
        let handle = DeviceHandle {
            tx,
            mode: LinkMode::Connected,
            port: None,
            dropped: Arc::new(AtomicU64::new(0)),
        };

        assert!(handle.submit(DeviceCommand::Win));
        assert!(!handle.submit(DeviceCommand::Reset));
        assert_eq!(handle.dropped(), 1);
    }

    #[test]
    fn test_stopped_worker_drops() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let handle = DeviceHandle {
            tx,
            mode: LinkMode::Connected,
            port: None,
            dropped: Arc::new(AtomicU64::new(0)),
        };

        assert!(!handle.submit(DeviceCommand::Win));
        assert_eq!(handle.dropped(), 1);
    }
}

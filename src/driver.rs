//! Game Driver
//!
//! Applies game operations to the [`GameState`] and forwards the resulting
//! events to the device. State is always mutated first; device delivery is
//! queued afterwards and its outcome never feeds back into the game.

use tracing::{debug, info, instrument};

use crate::core::grid::Direction;
use crate::core::rng::DeterministicRng;
use crate::device::protocol::DeviceCommand;
use crate::device::worker::DeviceHandle;
use crate::game::events::{GameEvent, MoveOutcome};
use crate::game::maze::MazeGenerator;
use crate::game::state::{GameState, Snapshot};

/// What a move request produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveReport {
    /// How the move resolved
    pub outcome: MoveOutcome,
    /// State after the move
    pub snapshot: Snapshot,
}

/// Owns the game and the device handle for the life of the service.
pub struct GameDriver {
    state: GameState,
    generator: MazeGenerator,
    rng: DeterministicRng,
    device: DeviceHandle,
}

impl GameDriver {
    /// Generate the first maze and announce it to the device.
    pub fn new(generator: MazeGenerator, mut rng: DeterministicRng, device: DeviceHandle) -> Self {
        let state = GameState::new(&generator, &mut rng);
        Self::with_state(state, generator, rng, device)
    }

    /// Drive an existing state, announcing it to the device.
    pub fn with_state(
        state: GameState,
        generator: MazeGenerator,
        rng: DeterministicRng,
        device: DeviceHandle,
    ) -> Self {
        let driver = Self {
            state,
            generator,
            rng,
            device,
        };
        info!(
            mode = ?driver.device.mode(),
            goal = %driver.state.goal(),
            "Game ready"
        );
        driver.notify(&GameEvent::MazeGenerated {
            player: driver.state.player(),
            goal: driver.state.goal(),
        });
        driver
    }

    /// Current game state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Device handle.
    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }

    /// Copy of the current state. Never mutates.
    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    /// Move the player by a raw direction token. Unknown tokens are no-ops.
    #[instrument(skip(self))]
    pub fn attempt_move(&mut self, token: &str) -> MoveReport {
        let direction = Direction::parse(token);
        if direction.is_none() {
            debug!("Ignoring unknown direction");
        }

        let from = self.state.player();
        let result = self.state.attempt_move(direction);

        match result.outcome {
            MoveOutcome::Moved { to, .. } => debug!(%from, %to, "Movement allowed"),
            MoveOutcome::Won { to } => info!(%to, "Player won!"),
            MoveOutcome::Blocked { at } => debug!(%at, "Move blocked by wall"),
            MoveOutcome::OutOfBounds | MoveOutcome::Ignored | MoveOutcome::AlreadyWon => {}
        }

        for event in &result.events {
            self.notify(event);
        }

        MoveReport {
            outcome: result.outcome,
            snapshot: self.state.snapshot(),
        }
    }

    /// Clear the device's win display, then generate and announce a new maze.
    #[instrument(skip(self))]
    pub fn new_maze(&mut self) -> Snapshot {
        self.notify(&GameEvent::MazeReset);

        let events = self.state.new_maze(&self.generator, &mut self.rng);
        info!(goal = %self.state.goal(), "New maze generated");
        for event in &events {
            self.notify(event);
        }

        self.state.snapshot()
    }

    /// Translate one event into device commands.
    fn notify(&self, event: &GameEvent) {
        if !event.is_device_visible() {
            return;
        }
        match event {
            GameEvent::MazeReset => {
                self.device.submit(DeviceCommand::Reset);
            }
            GameEvent::MazeGenerated { player, .. } => {
                self.device.submit(DeviceCommand::maze(self.state.maze()));
                self.device.submit(DeviceCommand::Player(*player));
            }
            GameEvent::PlayerMoved { to, .. } => {
                self.device.submit(DeviceCommand::Player(*to));
            }
            GameEvent::GoalReached { .. } => {
                self.device.submit(DeviceCommand::Win);
            }
            GameEvent::MoveBlocked { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::Position;
    use crate::device::link::testing::RecordingLink;
    use crate::device::link::{DeviceTiming, DisconnectedLink};
    use crate::game::maze::{Cell, Maze};

    fn recording_driver() -> (GameDriver, RecordingLink) {
        const W: Cell = Cell::Wall;
        const P: Cell = Cell::Path;
        const G: Cell = Cell::Goal;
        let maze = Maze::from_rows(vec![
            vec![W, W, W, W],
            vec![W, P, P, W],
            vec![W, W, P, W],
            vec![W, W, G, W],
        ])
        .unwrap();
        let state = GameState::with_maze(maze, Position::new(1, 1)).unwrap();

        let link = RecordingLink::default();
        let device = DeviceHandle::spawn(Box::new(link.clone()), DeviceTiming::immediate(), 64);
        let driver = GameDriver::with_state(
            state,
            MazeGenerator::default(),
            DeterministicRng::new(1),
            device,
        );
        (driver, link)
    }

    #[tokio::test]
    async fn test_startup_announces_maze_then_player() {
        let (driver, link) = recording_driver();
        driver.device().flush().await;

        assert_eq!(
            link.sent(),
            vec!["MAZE:[[1,1,1,1],[1,0,0,1],[1,1,0,1],[1,1,2,1]]", "PLAYER:1,1"]
        );
    }

    #[tokio::test]
    async fn test_blocked_move_not_sent() {
        let (mut driver, link) = recording_driver();
        let report = driver.attempt_move("up");
        driver.device().flush().await;

        assert_eq!(report.outcome, MoveOutcome::Blocked { at: Position::new(1, 0) });
        assert_eq!(report.snapshot.player, Position::new(1, 1));
        assert_eq!(link.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_moves_and_win_sent() {
        let (mut driver, link) = recording_driver();
        driver.attempt_move("right");
        driver.attempt_move("down");
        let report = driver.attempt_move("down");
        driver.device().flush().await;

        assert!(report.outcome.is_win());
        assert!(report.snapshot.won);
        assert_eq!(
            link.sent()[2..],
            ["PLAYER:2,1", "PLAYER:2,2", "PLAYER:2,3", "WIN:TRUE"]
        );
    }

    #[tokio::test]
    async fn test_unknown_direction_sends_nothing() {
        let (mut driver, link) = recording_driver();
        let before = driver.snapshot();
        let report = driver.attempt_move("sideways");
        driver.device().flush().await;

        assert_eq!(report.outcome, MoveOutcome::Ignored);
        assert_eq!(report.snapshot, before);
        assert_eq!(link.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_new_maze_resets_device_first() {
        let (mut driver, link) = recording_driver();
        driver.attempt_move("right");
        driver.device().flush().await;
        let before = link.sent().len();

        let snapshot = driver.new_maze();
        driver.device().flush().await;

        let sent = link.sent()[before..].to_vec();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0], "RESET:TRUE");
        assert!(sent[1].starts_with("MAZE:[["));
        assert_eq!(sent[2], "PLAYER:1,1");

        assert_eq!(snapshot.player, Position::new(1, 1));
        assert_eq!(snapshot.goal, Position::new(6, 6));
        assert!(!snapshot.won);
    }

    #[tokio::test]
    async fn test_win_persists_until_new_maze() {
        let (mut driver, _link) = recording_driver();
        for token in ["right", "down", "down"] {
            driver.attempt_move(token);
        }
        assert!(driver.attempt_move("up").snapshot.won);
        assert!(driver.snapshot().won);

        driver.new_maze();
        assert!(!driver.snapshot().won);
    }

    #[tokio::test]
    async fn test_disconnected_device_does_not_affect_game() {
        let device = DeviceHandle::spawn(Box::new(DisconnectedLink), DeviceTiming::immediate(), 4);
        let mut driver = GameDriver::new(MazeGenerator::default(), DeterministicRng::new(8), device);

        let first = driver.snapshot();
        assert_eq!(first, driver.snapshot());

        for token in ["right", "down", "left", "up", "down", "right"] {
            let report = driver.attempt_move(token);
            assert_ne!(
                report.snapshot.maze.get(report.snapshot.player),
                Some(Cell::Wall)
            );
        }
        driver.device().flush().await;
    }
}

//! HTTP Response Bodies
//!
//! JSON shapes returned to the browser front end. Positions are `[x, y]`
//! arrays and the maze is rows of cell codes (0 path, 1 wall, 2 goal).

use serde::Serialize;

use crate::core::grid::Position;
use crate::device::link::LinkMode;
use crate::driver::MoveReport;
use crate::game::maze::Maze;
use crate::game::state::Snapshot;

/// Message attached to the move that wins the game.
pub const WIN_MESSAGE: &str = "You won!";

// =============================================================================
// GAME RESPONSES
// =============================================================================

/// Reply to `GET /move/{direction}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveResponse {
    /// Current grid
    pub maze: Maze,
    /// Player position after the move
    pub player_pos: Position,
    /// Win flag
    pub won: bool,
    /// Present only on the move that reached the goal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<MoveReport> for MoveResponse {
    fn from(report: MoveReport) -> Self {
        let message = report.outcome.is_win().then(|| WIN_MESSAGE.to_string());
        Self {
            maze: report.snapshot.maze,
            player_pos: report.snapshot.player,
            won: report.snapshot.won,
            message,
        }
    }
}

/// Reply to `POST /api/new_maze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMazeResponse {
    /// Fresh grid
    pub maze: Maze,
    /// Player back at the start
    pub player_pos: Position,
}

impl From<Snapshot> for NewMazeResponse {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            maze: snapshot.maze,
            player_pos: snapshot.player,
        }
    }
}

/// Reply to `GET /api/maze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MazeResponse {
    /// Current grid
    pub maze: Maze,
    /// Player position
    pub player_pos: Position,
    /// Goal position
    pub end_pos: Position,
}

impl From<Snapshot> for MazeResponse {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            maze: snapshot.maze,
            player_pos: snapshot.player,
            end_pos: snapshot.goal,
        }
    }
}

// =============================================================================
// DIAGNOSTICS
// =============================================================================

/// Reply to `GET /api/device`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatusResponse {
    /// Link variant chosen at startup
    pub mode: LinkMode,
    /// Port path when connected
    pub port: Option<String>,
    /// Commands dropped so far
    pub dropped: u64,
}

/// Error body for failures the handlers surface.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// What went wrong
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::MoveOutcome;
    use crate::game::maze::Cell;
    use serde_json::json;

    fn snapshot(won: bool) -> Snapshot {
        let maze = Maze::from_rows(vec![
            vec![Cell::Wall, Cell::Wall],
            vec![Cell::Path, Cell::Goal],
        ])
        .unwrap();
        Snapshot {
            maze,
            player: if won { Position::new(1, 1) } else { Position::new(0, 1) },
            goal: Position::new(1, 1),
            won,
        }
    }

    #[test]
    fn test_move_response_json_shape() {
        let report = MoveReport {
            outcome: MoveOutcome::Blocked { at: Position::new(0, 0) },
            snapshot: snapshot(false),
        };
        let value = serde_json::to_value(MoveResponse::from(report)).unwrap();

        assert_eq!(
            value,
            json!({ "maze": [[1, 1], [0, 2]], "player_pos": [0, 1], "won": false })
        );
    }

    #[test]
    fn test_win_message_only_on_winning_move() {
        let winning = MoveResponse::from(MoveReport {
            outcome: MoveOutcome::Won { to: Position::new(1, 1) },
            snapshot: snapshot(true),
        });
        assert_eq!(winning.message.as_deref(), Some(WIN_MESSAGE));

        let after = MoveResponse::from(MoveReport {
            outcome: MoveOutcome::AlreadyWon,
            snapshot: snapshot(true),
        });
        assert!(after.won);
        assert_eq!(after.message, None);
    }

    #[test]
    fn test_maze_response_includes_goal() {
        let value = serde_json::to_value(MazeResponse::from(snapshot(false))).unwrap();
        assert_eq!(value["end_pos"], json!([1, 1]));
        assert_eq!(value["player_pos"], json!([0, 1]));

        let value = serde_json::to_value(NewMazeResponse::from(snapshot(false))).unwrap();
        assert!(value.get("end_pos").is_none());
    }

    #[test]
    fn test_device_status_json() {
        let status = DeviceStatusResponse {
            mode: LinkMode::Disconnected,
            port: None,
            dropped: 0,
        };
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            json!({ "mode": "disconnected", "port": null, "dropped": 0 })
        );
    }
}

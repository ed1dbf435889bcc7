//! Game Events
//!
//! Descriptions of what a state transition changed. The driver turns these
//! into device commands; the state itself never talks to the device.

use crate::core::grid::{Direction, Position};

/// Something that changed (or was refused) during a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    /// Any win indication should be cleared.
    MazeReset,

    /// A new maze is in place and the player is back at the start.
    MazeGenerated {
        /// Player start
        player: Position,
        /// Goal cell
        goal: Position,
    },

    /// Player stepped onto a new cell.
    PlayerMoved {
        /// Previous cell
        from: Position,
        /// New cell
        to: Position,
    },

    /// Step refused because the target is a wall.
    MoveBlocked {
        /// The wall cell
        at: Position,
    },

    /// Player reached the goal.
    GoalReached {
        /// Goal cell
        at: Position,
    },
}

impl GameEvent {
    /// Does this event need to reach the device?
    pub fn is_device_visible(&self) -> bool {
        !matches!(self, GameEvent::MoveBlocked { .. })
    }
}

/// How a move request was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Player moved onto a PATH cell.
    Moved {
        /// Direction taken
        direction: Direction,
        /// New position
        to: Position,
    },

    /// Player moved onto the GOAL cell. Only reported on the transition.
    Won {
        /// Goal position
        to: Position,
    },

    /// Target cell is a wall; nothing changed.
    Blocked {
        /// The wall cell
        at: Position,
    },

    /// Step would leave the grid; nothing changed.
    OutOfBounds,

    /// Direction token was not recognised; nothing changed.
    Ignored,

    /// The maze is already won; moves are frozen until the next maze.
    AlreadyWon,
}

impl MoveOutcome {
    /// Did the player's position change?
    pub fn moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved { .. } | MoveOutcome::Won { .. })
    }

    /// Is this the first-win transition?
    pub fn is_win(&self) -> bool {
        matches!(self, MoveOutcome::Won { .. })
    }
}

/// Result of a move: the outcome plus the events it produced, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveResult {
    /// How the request resolved
    pub outcome: MoveOutcome,
    /// Events to forward
    pub events: Vec<GameEvent>,
}

impl MoveResult {
    /// A result with no events.
    pub fn quiet(outcome: MoveOutcome) -> Self {
        Self {
            outcome,
            events: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_is_not_device_visible() {
        let blocked = GameEvent::MoveBlocked { at: Position::new(1, 0) };
        let moved = GameEvent::PlayerMoved {
            from: Position::new(1, 1),
            to: Position::new(2, 1),
        };
        assert!(!blocked.is_device_visible());
        assert!(moved.is_device_visible());
        assert!(GameEvent::MazeReset.is_device_visible());
    }

    #[test]
    fn test_outcome_flags() {
        assert!(MoveOutcome::Won { to: Position::new(6, 6) }.is_win());
        assert!(MoveOutcome::Won { to: Position::new(6, 6) }.moved());
        assert!(!MoveOutcome::Blocked { at: Position::new(0, 0) }.moved());
        assert!(!MoveOutcome::Ignored.moved());
        assert!(!MoveOutcome::AlreadyWon.is_win());
    }
}

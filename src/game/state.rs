//! Game State
//!
//! The single active maze, the player on it, and the win flag.
//! All mutation goes through [`GameState::attempt_move`] and
//! [`GameState::new_maze`], which keep these invariants:
//!
//! - the player never stands on a wall and never leaves the grid
//! - `goal` is the maze's only GOAL cell
//! - `won` holds exactly when the player stands on the goal

use serde::Serialize;
use tracing::debug;

use crate::core::grid::{Direction, Position};
use crate::core::rng::DeterministicRng;
use crate::game::events::{GameEvent, MoveOutcome, MoveResult};
use crate::game::maze::{Cell, Maze, MazeGenerator};

/// Errors adopting a hand-built maze.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameStateError {
    /// Start lies outside the grid.
    #[error("start {0} is outside the maze")]
    StartOutside(Position),

    /// Start is a wall.
    #[error("start {0} is a wall")]
    StartBlocked(Position),

    /// Start is the goal itself.
    #[error("start {0} is the goal")]
    StartOnGoal(Position),

    /// Maze must hold exactly one goal.
    #[error("maze has {0} goal cells, expected exactly one")]
    GoalCount(usize),
}

/// Read-only copy of the state, as handed to the HTTP layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Grid as rows of cell codes
    pub maze: Maze,
    /// Player position
    pub player: Position,
    /// Goal position
    pub goal: Position,
    /// Win flag
    pub won: bool,
}

/// The current game.
#[derive(Clone, Debug)]
pub struct GameState {
    maze: Maze,
    player: Position,
    goal: Position,
    won: bool,
}

impl GameState {
    /// Generate a first maze and place the player at the start.
    pub fn new(generator: &MazeGenerator, rng: &mut DeterministicRng) -> Self {
        let config = generator.config();
        Self {
            maze: generator.generate(rng),
            player: config.start(),
            goal: config.goal(),
            won: false,
        }
    }

    /// Adopt an existing maze with the player at `start`.
    pub fn with_maze(maze: Maze, start: Position) -> Result<Self, GameStateError> {
        let goals = maze.count(Cell::Goal);
        if goals != 1 {
            return Err(GameStateError::GoalCount(goals));
        }
        let goal = maze.goal().ok_or(GameStateError::GoalCount(0))?;

        match maze.get(start) {
            None => return Err(GameStateError::StartOutside(start)),
            Some(Cell::Wall) => return Err(GameStateError::StartBlocked(start)),
            Some(Cell::Goal) => return Err(GameStateError::StartOnGoal(start)),
            Some(Cell::Path) => {}
        }

        Ok(Self {
            maze,
            player: start,
            goal,
            won: false,
        })
    }

    /// Current maze.
    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    /// Player position.
    pub fn player(&self) -> Position {
        self.player
    }

    /// Goal position.
    pub fn goal(&self) -> Position {
        self.goal
    }

    /// Has the goal been reached?
    pub fn won(&self) -> bool {
        self.won
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            maze: self.maze.clone(),
            player: self.player,
            goal: self.goal,
            won: self.won,
        }
    }

    /// Try to step the player one cell.
    ///
    /// `None` stands for an unrecognised direction token and is a no-op.
    pub fn attempt_move(&mut self, direction: Option<Direction>) -> MoveResult {
        let Some(direction) = direction else {
            return MoveResult::quiet(MoveOutcome::Ignored);
        };

        if self.won {
            return MoveResult::quiet(MoveOutcome::AlreadyWon);
        }

        let Some(candidate) = self
            .player
            .step(direction, self.maze.width(), self.maze.height())
        else {
            debug!(%direction, player = %self.player, "move clamped at boundary");
            return MoveResult::quiet(MoveOutcome::OutOfBounds);
        };

        let from = self.player;
        match self.maze.get(candidate) {
            Some(Cell::Path) => {
                self.player = candidate;
                MoveResult {
                    outcome: MoveOutcome::Moved { direction, to: candidate },
                    events: vec![GameEvent::PlayerMoved { from, to: candidate }],
                }
            }
            Some(Cell::Goal) => {
                self.player = candidate;
                self.won = true;
                MoveResult {
                    outcome: MoveOutcome::Won { to: candidate },
                    events: vec![
                        GameEvent::PlayerMoved { from, to: candidate },
                        GameEvent::GoalReached { at: candidate },
                    ],
                }
            }
            // `step` only yields in-grid positions, so `None` cannot occur.
            Some(Cell::Wall) | None => MoveResult {
                outcome: MoveOutcome::Blocked { at: candidate },
                events: vec![GameEvent::MoveBlocked { at: candidate }],
            },
        }
    }

    /// Replace the maze, put the player back at the start and clear the win.
    pub fn new_maze(&mut self, generator: &MazeGenerator, rng: &mut DeterministicRng) -> Vec<GameEvent> {
        *self = Self::new(generator, rng);
        vec![GameEvent::MazeGenerated {
            player: self.player,
            goal: self.goal,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const W: Cell = Cell::Wall;
    const P: Cell = Cell::Path;
    const G: Cell = Cell::Goal;

    /// 4x4:
    /// ```text
    /// W W W W
    /// W P P W
    /// W W P W
    /// W W G W
    /// ```
    fn small_state() -> GameState {
        let maze = Maze::from_rows(vec![
            vec![W, W, W, W],
            vec![W, P, P, W],
            vec![W, W, P, W],
            vec![W, W, G, W],
        ])
        .unwrap();
        GameState::with_maze(maze, Position::new(1, 1)).unwrap()
    }

    #[test]
    fn test_wall_rejection() {
        let mut state = small_state();
        let result = state.attempt_move(Some(Direction::Up));

        assert_eq!(result.outcome, MoveOutcome::Blocked { at: Position::new(1, 0) });
        assert_eq!(result.events, vec![GameEvent::MoveBlocked { at: Position::new(1, 0) }]);
        assert_eq!(state.player(), Position::new(1, 1));
        assert!(!state.won());
    }

    #[test]
    fn test_move_onto_path() {
        let mut state = small_state();
        let result = state.attempt_move(Some(Direction::Right));

        assert_eq!(
            result.events,
            vec![GameEvent::PlayerMoved {
                from: Position::new(1, 1),
                to: Position::new(2, 1),
            }]
        );
        assert_eq!(state.player(), Position::new(2, 1));
    }

    #[test]
    fn test_reaching_goal_wins_once() {
        let mut state = small_state();
        state.attempt_move(Some(Direction::Right));
        state.attempt_move(Some(Direction::Down));
        let result = state.attempt_move(Some(Direction::Down));

        assert_eq!(result.outcome, MoveOutcome::Won { to: Position::new(2, 3) });
        assert_eq!(result.events.last(), Some(&GameEvent::GoalReached { at: Position::new(2, 3) }));
        assert!(state.won());
        assert_eq!(state.player(), state.goal());

        let again = state.attempt_move(Some(Direction::Up));
        assert_eq!(again.outcome, MoveOutcome::AlreadyWon);
        assert!(again.events.is_empty());
        assert!(state.won());
        assert_eq!(state.player(), state.goal());
    }

    #[test]
    fn test_unknown_direction_is_noop() {
        let mut state = small_state();
        let before = state.snapshot();
        let result = state.attempt_move(Direction::parse("diagonal"));

        assert_eq!(result.outcome, MoveOutcome::Ignored);
        assert!(result.events.is_empty());
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn test_boundary_clamps_silently() {
        let maze = Maze::from_rows(vec![
            vec![P, P, W, W],
            vec![P, P, W, W],
            vec![W, W, W, W],
            vec![W, W, G, W],
        ])
        .unwrap();
        let mut state = GameState::with_maze(maze, Position::new(0, 0)).unwrap();

        let result = state.attempt_move(Some(Direction::Up));
        assert_eq!(result.outcome, MoveOutcome::OutOfBounds);
        assert!(result.events.is_empty());
        assert_eq!(state.player(), Position::new(0, 0));
    }

    #[test]
    fn test_with_maze_validates() {
        let two_goals = Maze::from_rows(vec![vec![P, G], vec![G, W]]).unwrap();
        assert_eq!(
            GameState::with_maze(two_goals, Position::new(0, 0)).unwrap_err(),
            GameStateError::GoalCount(2)
        );

        let blocked = Maze::from_rows(vec![vec![W, G]]).unwrap();
        assert_eq!(
            GameState::with_maze(blocked, Position::new(0, 0)).unwrap_err(),
            GameStateError::StartBlocked(Position::new(0, 0))
        );

        let maze = Maze::from_rows(vec![vec![P, G]]).unwrap();
        assert_eq!(
            GameState::with_maze(maze, Position::new(5, 0)).unwrap_err(),
            GameStateError::StartOutside(Position::new(5, 0))
        );
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let mut rng = DeterministicRng::new(3);
        let state = GameState::new(&MazeGenerator::default(), &mut rng);
        assert_eq!(state.snapshot(), state.snapshot());
    }

    #[test]
    fn test_new_maze_resets_player_and_win() {
        let generator = MazeGenerator::default();
        let mut rng = DeterministicRng::new(11);
        let mut state = small_state();
        state.attempt_move(Some(Direction::Right));

        let events = state.new_maze(&generator, &mut rng);

        assert_eq!(
            events,
            vec![GameEvent::MazeGenerated {
                player: Position::new(1, 1),
                goal: Position::new(6, 6),
            }]
        );
        assert_eq!(state.player(), Position::new(1, 1));
        assert_eq!(state.maze().width(), 8);
        assert!(!state.won());
    }

    fn direction_strategy() -> impl Strategy<Value = Direction> {
        prop_oneof![
            Just(Direction::Up),
            Just(Direction::Right),
            Just(Direction::Down),
            Just(Direction::Left),
        ]
    }

    proptest! {
        #[test]
        fn prop_moves_keep_player_safe(
            seed in any::<u64>(),
            moves in prop::collection::vec(direction_strategy(), 0..200),
        ) {
            let mut rng = DeterministicRng::new(seed);
            let mut state = GameState::new(&MazeGenerator::default(), &mut rng);
            let mut won_at_least_once = false;

            for dir in moves {
                state.attempt_move(Some(dir));
                let p = state.player();

                prop_assert!(p.x < 8 && p.y < 8);
                prop_assert_ne!(state.maze().get(p), Some(Cell::Wall));
                prop_assert_eq!(state.won(), p == state.goal());

                if won_at_least_once {
                    prop_assert!(state.won());
                }
                won_at_least_once |= state.won();
            }
        }
    }
}

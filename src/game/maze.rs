//! Maze Grid and Generation
//!
//! Randomized growing-tree (Prim's-style) generation over a rectangular grid,
//! followed by a probabilistic clearing pass and a carve-back step that
//! guarantees the goal is reachable from the start.

use std::collections::VecDeque;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::config::ConfigError;
use crate::core::grid::Position;
use crate::core::rng::DeterministicRng;

/// Default maze width.
pub const DEFAULT_WIDTH: usize = 8;

/// Default maze height.
pub const DEFAULT_HEIGHT: usize = 8;

/// Smallest side length that keeps start and goal apart.
pub const MIN_SIDE: usize = 4;

/// Chance (percent) that the clearing pass opens a given cell.
pub const CLEAR_CHANCE_PERCENT: u32 = 70;

/// Fixed player start.
pub const START: Position = Position::new(1, 1);

// =============================================================================
// CELL
// =============================================================================

/// A single maze cell. Encoded as 0 / 1 / 2 on every wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Cell {
    /// Walkable
    #[default]
    Path = 0,
    /// Blocks movement
    Wall = 1,
    /// Walkable; reaching it wins
    Goal = 2,
}

impl Cell {
    /// Wire encoding.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Can the player stand here?
    #[inline]
    pub const fn is_open(self) -> bool {
        !matches!(self, Cell::Wall)
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

// =============================================================================
// MAZE
// =============================================================================

/// Errors building a maze from raw rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MazeError {
    /// No rows, or rows with no cells.
    #[error("maze must have at least one row and one column")]
    Empty,

    /// A row length differs from the first row.
    #[error("row {row} has {len} cells, expected {expected}")]
    Ragged {
        /// Offending row index
        row: usize,
        /// Its length
        len: usize,
        /// Length of row 0
        expected: usize,
    },
}

/// Rectangular grid of cells, row-major. Dimensions never change after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Maze {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Maze {
    /// A maze with every cell set to `cell`.
    pub fn filled(width: usize, height: usize, cell: Cell) -> Self {
        Self {
            width,
            height,
            cells: vec![cell; width * height],
        }
    }

    /// Build from explicit rows (row 0 first).
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self, MazeError> {
        let expected = rows.first().map(Vec::len).unwrap_or(0);
        if expected == 0 {
            return Err(MazeError::Empty);
        }
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != expected {
                return Err(MazeError::Ragged {
                    row,
                    len: cells.len(),
                    expected,
                });
            }
        }
        let height = rows.len();
        Ok(Self {
            width: expected,
            height,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Is `pos` inside the grid?
    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        crate::core::grid::is_valid(pos.x, pos.y, self.width, self.height)
    }

    /// Cell at `pos`, or `None` outside the grid.
    #[inline]
    pub fn get(&self, pos: Position) -> Option<Cell> {
        self.contains(pos).then(|| self.cells[self.index(pos)])
    }

    /// Overwrite the cell at `pos`. Out-of-grid writes are ignored.
    #[inline]
    pub fn set(&mut self, pos: Position, cell: Cell) {
        if self.contains(pos) {
            let idx = self.index(pos);
            self.cells[idx] = cell;
        }
    }

    /// How many cells hold `cell`.
    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|c| **c == cell).count()
    }

    /// Position of the first GOAL cell, scanning row by row.
    pub fn goal(&self) -> Option<Position> {
        self.cells
            .iter()
            .position(|c| *c == Cell::Goal)
            .map(|idx| Position::new(idx % self.width, idx / self.width))
    }

    /// Rows as wire codes, row 0 first.
    pub fn rows(&self) -> Vec<Vec<u8>> {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| row.iter().map(|c| c.code()).collect())
            .collect()
    }

    /// Compact JSON (`[[1,1,...],...]`) as sent to the device.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }

    /// Flags every open cell reachable from `start` through open cells.
    pub fn reachable_from(&self, start: Position) -> Vec<bool> {
        let mut seen = vec![false; self.cells.len()];
        if !self.get(start).is_some_and(Cell::is_open) {
            return seen;
        }

        let mut queue = VecDeque::from([start]);
        seen[self.index(start)] = true;
        while let Some(pos) = queue.pop_front() {
            for next in pos.neighbours(self.width, self.height) {
                let idx = self.index(next);
                if !seen[idx] && self.cells[idx].is_open() {
                    seen[idx] = true;
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Length in steps of the shortest open path, or `None` if disconnected.
    pub fn shortest_path_len(&self, from: Position, to: Position) -> Option<usize> {
        if !self.get(from).is_some_and(Cell::is_open) || !self.get(to).is_some_and(Cell::is_open) {
            return None;
        }

        let mut dist = vec![usize::MAX; self.cells.len()];
        let mut queue = VecDeque::from([from]);
        dist[self.index(from)] = 0;
        while let Some(pos) = queue.pop_front() {
            let d = dist[self.index(pos)];
            if pos == to {
                return Some(d);
            }
            for next in pos.neighbours(self.width, self.height) {
                let idx = self.index(next);
                if dist[idx] == usize::MAX && self.cells[idx].is_open() {
                    dist[idx] = d + 1;
                    queue.push_back(next);
                }
            }
        }
        None
    }

    #[inline]
    fn index(&self, pos: Position) -> usize {
        pos.y * self.width + pos.x
    }
}

impl Serialize for Maze {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.height))?;
        for row in self.cells.chunks(self.width.max(1)) {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

// =============================================================================
// GENERATION
// =============================================================================

/// Maze dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MazeConfig {
    /// Columns
    pub width: usize,
    /// Rows
    pub height: usize,
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl MazeConfig {
    /// Reject grids too small to separate start from goal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < MIN_SIDE || self.height < MIN_SIDE {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
                min: MIN_SIDE,
            });
        }
        Ok(())
    }

    /// Player start.
    pub fn start(&self) -> Position {
        START
    }

    /// Goal near the opposite corner.
    pub fn goal(&self) -> Position {
        goal_for(self.width, self.height)
    }
}

/// Goal cell for a grid: one step in from the bottom-right corner.
pub fn goal_for(width: usize, height: usize) -> Position {
    Position::new(width.saturating_sub(2), height.saturating_sub(2))
}

/// Produces mazes for a fixed configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct MazeGenerator {
    config: MazeConfig,
}

impl MazeGenerator {
    /// Create a generator for validated dimensions.
    pub fn new(config: MazeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Dimensions this generator produces.
    pub fn config(&self) -> MazeConfig {
        self.config
    }

    /// Generate a fresh maze.
    pub fn generate(&self, rng: &mut DeterministicRng) -> Maze {
        generate(self.config.width, self.config.height, self.config.start(), rng)
    }
}

/// Generate a `width` x `height` maze carved outward from `start`.
///
/// The result has `start` as PATH, exactly one GOAL at [`goal_for`], and a
/// PATH route between them. Dimensions must already satisfy
/// [`MazeConfig::validate`]; callers go through [`MazeGenerator`].
pub(crate) fn generate(width: usize, height: usize, start: Position, rng: &mut DeterministicRng) -> Maze {
    let goal = goal_for(width, height);
    let mut maze = Maze::filled(width, height, Cell::Wall);

    grow_tree(&mut maze, start, rng);

    maze.set(start, Cell::Path);
    maze.set(goal, Cell::Goal);

    clear_corridor(&mut maze, start, goal, rng);

    // The clearing pass may run over either marker.
    maze.set(start, Cell::Path);
    maze.set(goal, Cell::Goal);

    let carved = carve_back(&mut maze, start, goal);
    if carved > 0 {
        debug!(carved, "goal was cut off, carved a route back to the start");
    }

    maze
}

/// Randomized growing tree. A frontier wall becomes PATH only when exactly
/// one of its neighbours is already PATH, so carved cells form a tree.
fn grow_tree(maze: &mut Maze, start: Position, rng: &mut DeterministicRng) {
    let (width, height) = (maze.width, maze.height);
    maze.set(start, Cell::Path);

    let mut frontier: Vec<Position> = Vec::new();
    let mut in_frontier = vec![false; width * height];

    for next in start.neighbours(width, height) {
        frontier.push(next);
        in_frontier[maze.index(next)] = true;
    }

    while !frontier.is_empty() {
        let picked = frontier.swap_remove(rng.next_int(frontier.len()));
        in_frontier[maze.index(picked)] = false;

        let open_neighbours = picked
            .neighbours(width, height)
            .filter(|n| maze.get(*n) == Some(Cell::Path))
            .count();
        if open_neighbours != 1 {
            continue;
        }

        maze.set(picked, Cell::Path);
        for next in picked.neighbours(width, height) {
            let idx = maze.index(next);
            if maze.cells[idx] == Cell::Wall && !in_frontier[idx] {
                frontier.push(next);
                in_frontier[idx] = true;
            }
        }
    }
}

/// Biased-coin nudge along the start row, then down the goal column.
fn clear_corridor(maze: &mut Maze, start: Position, goal: Position, rng: &mut DeterministicRng) {
    let (x0, x1) = (start.x.min(goal.x), start.x.max(goal.x));
    for x in x0..=x1 {
        if rng.next_chance(CLEAR_CHANCE_PERCENT) {
            maze.set(Position::new(x, start.y), Cell::Path);
        }
    }

    let (y0, y1) = (start.y.min(goal.y), start.y.max(goal.y));
    for y in y0..=y1 {
        if rng.next_chance(CLEAR_CHANCE_PERCENT) {
            maze.set(Position::new(goal.x, y), Cell::Path);
        }
    }
}

/// Walk from the goal up its column to the start row, then along that row to
/// the start, opening walls until the walk touches a cell reachable from the
/// start. Returns the number of walls opened.
fn carve_back(maze: &mut Maze, start: Position, goal: Position) -> usize {
    let reachable = maze.reachable_from(start);
    if reachable[maze.index(goal)] {
        return 0;
    }

    let column = walk(goal.y, start.y).map(|y| Position::new(goal.x, y));
    let row = walk(goal.x, start.x).map(|x| Position::new(x, start.y));

    let mut carved = 0;
    for pos in column.chain(row).skip(1) {
        if reachable[maze.index(pos)] {
            break;
        }
        if maze.get(pos) == Some(Cell::Wall) {
            maze.set(pos, Cell::Path);
            carved += 1;
        }
    }
    carved
}

/// Inclusive walk from `from` to `to` in either direction.
fn walk(from: usize, to: usize) -> Box<dyn Iterator<Item = usize>> {
    if from <= to {
        Box::new(from..=to)
    } else {
        Box::new((to..=from).rev())
    }
}

//! Grid Coordinates
//!
//! Positions and unit steps on the maze grid. No wraparound: a step that
//! would leave the grid yields `None`.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A cell coordinate. `x` is the column, `y` the row.
///
/// Serialized as a `[x, y]` array on every wire (HTTP and device payloads).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    /// Column index
    pub x: usize,
    /// Row index
    pub y: usize,
}

impl Position {
    /// Create a position.
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Apply a unit step, returning `None` if the result leaves
    /// `[0, width) x [0, height)`.
    pub fn step(self, direction: Direction, width: usize, height: usize) -> Option<Position> {
        let (dx, dy) = direction.delta();
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        is_valid(x, y, width, height).then_some(Position { x, y })
    }

    /// All in-grid 4-neighbours, in N/E/S/W order.
    pub fn neighbours(self, width: usize, height: usize) -> impl Iterator<Item = Position> {
        Direction::ALL
            .into_iter()
            .filter_map(move |dir| self.step(dir, width, height))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.x, self.y].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [x, y] = <[usize; 2]>::deserialize(deserializer)?;
        Ok(Position { x, y })
    }
}

/// Bounds check against `[0, width) x [0, height)`.
#[inline]
pub fn is_valid(x: usize, y: usize, width: usize, height: usize) -> bool {
    x < width && y < height
}

/// A movement direction. Up decreases `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards row 0
    Up,
    /// Towards the last column
    Right,
    /// Towards the last row
    Down,
    /// Towards column 0
    Left,
}

impl Direction {
    /// N/E/S/W.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Unit step as (dx, dy).
    pub const fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }

    /// Lowercase token used in URLs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
        }
    }

    /// Parse an exact lowercase direction token. Anything else yields `None`.
    pub fn parse(token: &str) -> Option<Direction> {
        match token {
            "up" => Some(Direction::Up),
            "right" => Some(Direction::Right),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

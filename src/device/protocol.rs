//! Device Wire Protocol
//!
//! Line-oriented ASCII commands, newline-terminated and case-sensitive:
//!
//! | Command              | Effect on the peripheral      |
//! |----------------------|-------------------------------|
//! | `PING`               | replies `PONG`                |
//! | `MAZE:<json rows>`   | redraws wall indicators       |
//! | `PLAYER:<x>,<y>`     | moves the player marker       |
//! | `WIN:TRUE`           | plays the victory indication  |
//! | `RESET:TRUE`         | clears the victory indication |
//!
//! Replies are parsed for diagnostics only.

use std::fmt;

use crate::core::grid::Position;
use crate::game::maze::Maze;

/// Serial baud rate.
pub const BAUD_RATE: u32 = 9600;

/// A command for the peripheral.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Liveness probe.
    Ping,
    /// Full grid snapshot, already JSON-encoded as rows of cell codes.
    Maze(String),
    /// Player marker position.
    Player(Position),
    /// Victory indication.
    Win,
    /// Clear victory indication.
    Reset,
}

impl DeviceCommand {
    /// Snapshot command for `maze`.
    pub fn maze(maze: &Maze) -> Self {
        DeviceCommand::Maze(maze.to_json())
    }

    /// Encoded line, without the trailing newline.
    pub fn encode(&self) -> String {
        match self {
            DeviceCommand::Ping => "PING".to_string(),
            DeviceCommand::Maze(rows) => format!("MAZE:{rows}"),
            DeviceCommand::Player(pos) => format!("PLAYER:{},{}", pos.x, pos.y),
            DeviceCommand::Win => "WIN:TRUE".to_string(),
            DeviceCommand::Reset => "RESET:TRUE".to_string(),
        }
    }

    /// Bytes to put on the wire, newline included.
    pub fn to_line(&self) -> Vec<u8> {
        let mut line = self.encode().into_bytes();
        line.push(b'\n');
        line
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceCommand::Ping => "PING",
            DeviceCommand::Maze(_) => "MAZE",
            DeviceCommand::Player(_) => "PLAYER",
            DeviceCommand::Win => "WIN",
            DeviceCommand::Reset => "RESET",
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// One parsed reply line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceReply {
    /// Answer to `PING`.
    Pong,
    /// Generic acknowledgement.
    Ok,
    /// Peripheral announced itself.
    Ready(String),
    /// Peripheral reports its marker position.
    Position(Position),
    /// Peripheral reports a win.
    Win(String),
    /// Peripheral reported a problem.
    Error(String),
    /// Anything else.
    Other(String),
}

impl DeviceReply {
    /// Parse one trimmed line.
    pub fn parse(line: &str) -> DeviceReply {
        let line = line.trim();
        if line.contains("PONG") {
            return DeviceReply::Pong;
        }
        if line == "OK" {
            return DeviceReply::Ok;
        }
        if let Some(rest) = line.strip_prefix("READY:") {
            return DeviceReply::Ready(rest.to_string());
        }
        if let Some(rest) = line.strip_prefix("POS:") {
            if let Some(pos) = parse_pair(rest) {
                return DeviceReply::Position(pos);
            }
        }
        if let Some(rest) = line.strip_prefix("WIN:") {
            return DeviceReply::Win(rest.to_string());
        }
        if let Some(rest) = line.strip_prefix("ERROR:") {
            return DeviceReply::Error(rest.to_string());
        }
        DeviceReply::Other(line.to_string())
    }
}

/// Parse a raw (possibly multi-line) response into replies, skipping blanks.
pub fn parse_response(raw: &str) -> Vec<DeviceReply> {
    raw.lines()
        .filter(|l| !l.trim().is_empty())
        .map(DeviceReply::parse)
        .collect()
}

/// Does a raw response acknowledge a `PING`?
pub fn is_pong(raw: &str) -> bool {
    raw.contains("PONG")
}

fn parse_pair(text: &str) -> Option<Position> {
    let (x, y) = text.split_once(',')?;
    Some(Position::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::maze::Cell;

    #[test]
    fn test_encode_vocabulary() {
        assert_eq!(DeviceCommand::Ping.encode(), "PING");
        assert_eq!(DeviceCommand::Player(Position::new(3, 4)).encode(), "PLAYER:3,4");
        assert_eq!(DeviceCommand::Win.encode(), "WIN:TRUE");
        assert_eq!(DeviceCommand::Reset.encode(), "RESET:TRUE");
        assert_eq!(DeviceCommand::Reset.to_line(), b"RESET:TRUE\n".to_vec());
    }

    #[test]
    fn test_maze_command_payload() {
        let maze = Maze::from_rows(vec![
            vec![Cell::Wall, Cell::Wall],
            vec![Cell::Path, Cell::Goal],
        ])
        .unwrap();
        assert_eq!(DeviceCommand::maze(&maze).encode(), "MAZE:[[1,1],[0,2]]");
    }

    #[test]
    fn test_parse_replies() {
        assert_eq!(DeviceReply::parse("PONG"), DeviceReply::Pong);
        assert_eq!(DeviceReply::parse(" OK \r"), DeviceReply::Ok);
        assert_eq!(DeviceReply::parse("POS:2,5"), DeviceReply::Position(Position::new(2, 5)));
        assert_eq!(DeviceReply::parse("READY:matrix"), DeviceReply::Ready("matrix".into()));
        assert_eq!(DeviceReply::parse("ERROR:bad row"), DeviceReply::Error("bad row".into()));
        assert_eq!(DeviceReply::parse("POS:x"), DeviceReply::Other("POS:x".into()));
    }

    #[test]
    fn test_parse_multiline_response() {
        let replies = parse_response("OK\n\nREADY:1\n");
        assert_eq!(replies, vec![DeviceReply::Ok, DeviceReply::Ready("1".into())]);
        assert!(parse_response("").is_empty());
        assert!(is_pong("boot\nPONG\n"));
        assert!(!is_pong("OK\n"));
    }
}

// Grid game wire types
// Shapes exchanged with the snake game server over the WebSocket channel

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Notice text the server sends once our player has been registered
pub const CONNECTED_MESSAGE: &str = "Player connected successfully.";

/// One occupied cell of the map as the server describes it
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CellDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(alias = "playerName", default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
}

/// Player summary attached to every snapshot
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PlayerSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub cells: Value,
}

/// Complete game state received each tick
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    #[serde(default)]
    pub map: Option<Vec<Vec<Option<CellDescriptor>>>>,
    #[serde(default)]
    pub winner: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub players: Vec<PlayerSummary>,
    #[serde(
        rename = "generationCount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub generation_count: Option<u64>,
}

impl Snapshot {
    /// A snapshot with any non-null winner is terminal
    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// Human readable winner; the server reports a draw as -1
    pub fn winner_label(&self) -> Option<String> {
        self.winner.as_ref().map(|w| match w {
            Value::String(name) => name.clone(),
            Value::Number(n) if n.as_i64() == Some(-1) => "draw".to_string(),
            other => other.to_string(),
        })
    }
}

/// Status message sent outside the snapshot stream (registration, rejection,
/// move errors and warnings)
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Keys that mark a frame as a status message rather than a tick
const NOTICE_KEYS: [&str; 3] = ["message", "error", "warning"];

/// Anything the server can push down the channel
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Notice(Notice),
    Snapshot(Snapshot),
}

impl ServerMessage {
    /// Decodes one text frame
    ///
    /// Frames carrying `message`, `error` or `warning`, or carrying neither `map`
    /// nor `winner`, are notices and never count as a tick. Everything else is a
    /// snapshot; a map that does not have the expected shape is dropped so the
    /// tick still gets a (fallback) move instead of being discarded.
    pub fn decode(text: &str) -> Result<ServerMessage, String> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| format!("Invalid JSON frame: {}", e))?;

        let object = value
            .as_object()
            .ok_or_else(|| "Frame is not a JSON object".to_string())?;

        let has_status = NOTICE_KEYS.iter().any(|key| object.contains_key(*key));
        let has_state = object.contains_key("map") || object.contains_key("winner");
        if has_status || !has_state {
            let message = NOTICE_KEYS
                .iter()
                .find_map(|key| object.get(*key))
                .map(|v| match v {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| text.to_string());
            let field = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
            return Ok(ServerMessage::Notice(Notice {
                message,
                id: field("id"),
                name: field("name"),
            }));
        }

        match serde_json::from_value::<Snapshot>(value.clone()) {
            Ok(snapshot) => Ok(ServerMessage::Snapshot(snapshot)),
            Err(e) => {
                log::warn!("Snapshot map could not be decoded ({}), keeping status only", e);
                let winner = object.get("winner").filter(|w| !w.is_null()).cloned();
                Ok(ServerMessage::Snapshot(Snapshot {
                    map: None,
                    winner,
                    players: Vec::new(),
                    generation_count: object.get("generationCount").and_then(Value::as_u64),
                }))
            }
        }
    }
}

/// Grid coordinate: `x` indexes rows, `y` indexes columns
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The four possible movement directions
///
/// Row/column convention: up/down move along rows (x), left/right along columns (y).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Returns all possible directions in search order
    pub fn all() -> [Direction; 4] {
        [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
    }

    /// Converts direction to its wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Unit delta as (dx, dy)
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    /// Maps a unit delta back to its direction; anything else is `None`
    pub fn from_delta(dx: i32, dy: i32) -> Option<Direction> {
        match (dx, dy) {
            (1, 0) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Up),
            (0, 1) => Some(Direction::Right),
            (0, -1) => Some(Direction::Left),
            _ => None,
        }
    }

    /// Calculates the next position when moving in this direction
    pub fn apply(&self, pos: Position) -> Position {
        let (dx, dy) = self.delta();
        Position {
            x: pos.x + dx,
            y: pos.y + dy,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            _ => Err(format!("Invalid direction: {}", s)),
        }
    }
}

/// Move command sent back to the server once per tick
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MoveCommand {
    #[serde(rename = "playerId")]
    pub player_id: String,
    pub direction: Direction,
}

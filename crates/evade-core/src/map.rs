use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::geometry::Position;

/// Content of a single grid cell. Walls never change during a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TileType {
    Empty,
    Wall,
}

/// Behavior family of a threat, as written in map files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatStyle {
    /// Chases the last position where it saw the character.
    Surveillance,
    /// Picks a random open direction every step.
    Girouette,
    /// Keeps its heading until blocked.
    StraightAhead,
    /// Follows the shortest path to the character.
    Aggressive,
    /// Chases from afar, retreats home when close.
    Ghost,
}

impl ThreatStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Surveillance => "surveillance",
            Self::Girouette => "girouette",
            Self::StraightAhead => "straight_ahead",
            Self::Aggressive => "aggressive",
            Self::Ghost => "ghost",
        }
    }
}

impl std::str::FromStr for ThreatStyle {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "surveillance" => Ok(Self::Surveillance),
            "girouette" => Ok(Self::Girouette),
            "straight_ahead" => Ok(Self::StraightAhead),
            "aggressive" => Ok(Self::Aggressive),
            "ghost" => Ok(Self::Ghost),
            other => Err(MapError::UnknownThreatStyle(other.to_string())),
        }
    }
}

/// Where a threat starts and how it behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatSpec {
    pub position: Position,
    pub style: ThreatStyle,
}

/// Static description of a level. Loaded once and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Map {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub non_walkable: BTreeSet<Position>,
    pub character_spawn: Position,
    pub threats: Vec<ThreatSpec>,
}

impl Map {
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    pub fn is_walkable(&self, pos: Position) -> bool {
        self.contains(pos) && !self.non_walkable.contains(&pos)
    }

    /// Every in-bounds cell that is not a wall, in column-major order.
    pub fn walkable_cells(&self) -> Vec<Position> {
        let mut cells = Vec::new();
        for x in 0..self.width as i32 {
            for y in 0..self.height as i32 {
                let pos = Position::new(x, y);
                if !self.non_walkable.contains(&pos) {
                    cells.push(pos);
                }
            }
        }
        cells
    }

    /// Reject maps the world cannot be built from.
    pub fn validate(&self) -> Result<(), MapError> {
        if self.width == 0 || self.height == 0 {
            return Err(MapError::InvalidLayout(format!(
                "map '{}' has empty dimensions {}x{}",
                self.name, self.width, self.height
            )));
        }
        if let Some(wall) = self.non_walkable.iter().find(|p| !self.contains(**p)) {
            return Err(MapError::InvalidPosition {
                what: "wall",
                position: *wall,
            });
        }
        if !self.is_walkable(self.character_spawn) {
            return Err(MapError::InvalidPosition {
                what: "character spawn",
                position: self.character_spawn,
            });
        }
        if let Some(spec) = self.threats.iter().find(|t| !self.is_walkable(t.position)) {
            return Err(MapError::InvalidPosition {
                what: "threat spawn",
                position: spec.position,
            });
        }
        Ok(())
    }
}

/// Failure to load or build a map. Always fatal for the match.
#[derive(Debug)]
pub enum MapError {
    UnknownMap(String),
    NoMapForDifficulty(String),
    UnknownThreatStyle(String),
    InvalidLayout(String),
    InvalidPosition { what: &'static str, position: Position },
    Io(String),
    Parse(String),
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownMap(name) => write!(f, "unknown map '{name}'"),
            Self::NoMapForDifficulty(d) => write!(f, "no map available for difficulty {d}"),
            Self::UnknownThreatStyle(s) => write!(f, "unknown threat style '{s}'"),
            Self::InvalidLayout(m) => write!(f, "invalid map layout: {m}"),
            Self::InvalidPosition { what, position } => write!(
                f,
                "{what} at ({}, {}) is outside the map or on a wall",
                position.x, position.y
            ),
            Self::Io(e) => write!(f, "map i/o error: {e}"),
            Self::Parse(e) => write!(f, "map parse error: {e}"),
        }
    }
}

impl std::error::Error for MapError {}

//! Audience-specific projections of the world state.
//!
//! Three audiences share the same map encoding:
//! - spectators and replays get [`ViewerState`] (everything),
//! - a team gets [`PlayerState`] (its own character, path distances and its
//!   own errors from the previous tick),
//! - each threat gets a [`ThreatSnapshot`] to decide its next move. This one
//!   never leaves the process.

use serde::{Deserialize, Serialize};

use crate::geometry::{Direction, Position};
use crate::map::{ThreatStyle, TileType};
use crate::team::TeamId;

/// Match constants exposed to clients. Currently carries no fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constants {}

/// Tile grid as sent on the wire. `tiles[x][y]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapView {
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<Vec<TileType>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatView {
    pub id: String,
    pub position: Position,
    pub direction: Direction,
    pub personality: String,
    pub style: ThreatStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterView {
    pub id: String,
    pub team_id: TeamId,
    pub position: Position,
    pub alive: bool,
    pub spawn_point: Position,
}

/// The owning team's character with a shortest-path distance overlay,
/// `distances[x][y]`, `None` for unreachable cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCharacterView {
    #[serde(flatten)]
    pub character: CharacterView,
    pub distances: Vec<Vec<Option<u32>>>,
}

/// Spectator projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerState {
    pub constants: Constants,
    pub current_tick_number: u32,
    pub tick: u32,
    pub map_name: String,
    pub map: MapView,
    pub threats: Vec<ThreatView>,
    pub character: Option<CharacterView>,
}

/// Projection sent to one team each tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub constants: Constants,
    pub current_tick_number: u32,
    pub tick: u32,
    pub map: MapView,
    pub threats: Vec<ThreatView>,
    pub your_character: Option<PlayerCharacterView>,
    pub last_tick_errors: Vec<String>,
}

/// Internal projection fed to every threat's decision function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatSnapshot {
    pub constants: Constants,
    pub current_tick_number: u32,
    pub tick: u32,
    pub map: MapView,
    pub threats: Vec<ThreatView>,
    pub character: Option<CharacterView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_character_flattens_into_one_object() {
        let view = PlayerCharacterView {
            character: CharacterView {
                id: "c1".to_string(),
                team_id: TeamId::from("t1"),
                position: Position::new(1, 2),
                alive: true,
                spawn_point: Position::new(1, 1),
            },
            distances: vec![vec![Some(0), None]],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["teamId"], "t1");
        assert_eq!(json["spawnPoint"]["y"], 1);
        assert_eq!(json["distances"][0][1], serde_json::Value::Null);
    }

    #[test]
    fn constants_serialize_as_empty_object() {
        assert_eq!(serde_json::to_string(&Constants::default()).unwrap(), "{}");
    }
}

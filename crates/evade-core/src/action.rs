use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geometry::{Direction, Position};

/// Action type names accepted on the wire.
pub const ACTION_TYPES: [&str; 5] = ["MOVE_LEFT", "MOVE_RIGHT", "MOVE_UP", "MOVE_DOWN", "MOVE_TO"];

/// A validated request to move the team's character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    MoveTo { position: Position },
}

impl Action {
    /// Decode one raw action object.
    pub fn from_value(value: &Value) -> Result<Self, ActionError> {
        let Some(object) = value.as_object() else {
            return Err(ActionError::Malformed(format!(
                "expected an object, got {value}"
            )));
        };
        let Some(kind) = object.get("type").and_then(Value::as_str) else {
            return Err(ActionError::Malformed(
                "action is missing a string 'type'".to_string(),
            ));
        };
        if !ACTION_TYPES.contains(&kind) {
            return Err(ActionError::UnknownActionType(kind.to_string()));
        }
        serde_json::from_value(value.clone()).map_err(|e| ActionError::Malformed(e.to_string()))
    }

    /// Unit direction for the directional actions.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Action::MoveLeft => Some(Direction::Left),
            Action::MoveRight => Some(Direction::Right),
            Action::MoveUp => Some(Direction::Up),
            Action::MoveDown => Some(Direction::Down),
            Action::MoveTo { .. } => None,
        }
    }
}

/// What a team sent for one tick, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Value>,
}

impl Command {
    pub fn new(actions: Vec<Value>) -> Self {
        Self {
            actions: Some(Value::Array(actions)),
        }
    }

    /// Build a command from typed actions.
    pub fn from_actions(actions: &[Action]) -> Self {
        Self::new(
            actions
                .iter()
                .filter_map(|a| serde_json::to_value(a).ok())
                .collect(),
        )
    }

    /// Decode every entry. The outer error rejects the whole command; inner
    /// errors reject a single action, paired with its raw JSON.
    #[allow(clippy::type_complexity)]
    pub fn decode(&self) -> Result<Vec<(Value, Result<Action, ActionError>)>, ActionError> {
        match &self.actions {
            None | Some(Value::Null) => Err(ActionError::MissingActions),
            Some(Value::Array(items)) => Ok(items
                .iter()
                .map(|item| (item.clone(), Action::from_value(item)))
                .collect()),
            Some(other) => Err(ActionError::Malformed(format!(
                "'actions' must be an array, got {other}"
            ))),
        }
    }
}

/// A per-team problem with a command. Never fatal for the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    MissingActions,
    Malformed(String),
    UnknownActionType(String),
    TargetOutOfBounds(Position),
    NotCharacterOwner,
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingActions => write!(f, "Command invalid: 'actions' missing."),
            Self::Malformed(m) => write!(f, "Malformed action: {m}"),
            Self::UnknownActionType(t) => write!(f, "Unknown action type '{t}'"),
            Self::TargetOutOfBounds(p) => {
                write!(f, "Target position ({}, {}) is outside the map", p.x, p.y)
            },
            Self::NotCharacterOwner => write!(f, "Team does not control a character"),
        }
    }
}

impl std::error::Error for ActionError {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_directional_actions() {
        assert_eq!(
            Action::from_value(&json!({"type": "MOVE_UP"})),
            Ok(Action::MoveUp)
        );
        assert_eq!(
            Action::from_value(&json!({"type": "MOVE_LEFT"})).unwrap().direction(),
            Some(Direction::Left)
        );
    }

    #[test]
    fn decodes_move_to_with_position() {
        let action = Action::from_value(&json!({"type": "MOVE_TO", "position": {"x": 4, "y": 7}}));
        assert_eq!(
            action,
            Ok(Action::MoveTo {
                position: Position::new(4, 7)
            })
        );
    }

    #[test]
    fn move_to_without_position_is_malformed() {
        let err = Action::from_value(&json!({"type": "MOVE_TO"})).unwrap_err();
        assert!(matches!(err, ActionError::Malformed(_)));
    }

    #[test]
    fn unknown_type_is_reported_by_name() {
        let err = Action::from_value(&json!({"type": "TELEPORT"})).unwrap_err();
        assert_eq!(err, ActionError::UnknownActionType("TELEPORT".to_string()));
        assert_eq!(err.to_string(), "Unknown action type 'TELEPORT'");
    }

    #[test]
    fn non_object_action_is_malformed() {
        assert!(matches!(
            Action::from_value(&json!("MOVE_UP")),
            Err(ActionError::Malformed(_))
        ));
        assert!(matches!(
            Action::from_value(&json!({"kind": "MOVE_UP"})),
            Err(ActionError::Malformed(_))
        ));
    }

    #[test]
    fn command_without_actions_is_rejected() {
        let command: Command = serde_json::from_value(json!({})).unwrap();
        assert_eq!(command.decode().unwrap_err(), ActionError::MissingActions);
    }

    #[test]
    fn command_with_non_array_actions_is_malformed() {
        let command: Command = serde_json::from_value(json!({"actions": 3})).unwrap();
        assert!(matches!(command.decode(), Err(ActionError::Malformed(_))));
    }

    #[test]
    fn command_decodes_each_entry_independently() {
        let command = Command::new(vec![json!({"type": "MOVE_DOWN"}), json!({"type": "JUMP"})]);
        let decoded = command.decode().unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].1, Ok(Action::MoveDown));
        assert!(decoded[1].1.is_err());
    }

    #[test]
    fn from_actions_round_trips() {
        let actions = [
            Action::MoveRight,
            Action::MoveTo {
                position: Position::new(1, 2),
            },
        ];
        let decoded: Vec<Action> = Command::from_actions(&actions)
            .decode()
            .unwrap()
            .into_iter()
            .map(|(_, a)| a.unwrap())
            .collect();
        assert_eq!(decoded, actions);
    }
}

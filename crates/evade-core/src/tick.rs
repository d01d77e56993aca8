use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::team::TeamId;
use crate::views::ViewerState;

/// Error messages per team for a single tick.
pub type TickErrors = BTreeMap<TeamId, Vec<String>>;

/// Final standing of one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamResult {
    pub rank: u32,
    pub score: u64,
    pub team_id: String,
    pub team_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResults {
    pub results: Vec<TeamResult>,
}

/// Outcome of one call to the tick function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "TickResultWire", try_from = "TickResultWire")]
pub enum TickResult {
    InProgress {
        game_state: Box<ViewerState>,
        errors_per_team: TickErrors,
    },
    Complete {
        game_results: GameResults,
    },
}

impl TickResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, TickResult::Complete { .. })
    }

    pub fn game_state(&self) -> Option<&ViewerState> {
        match self {
            TickResult::InProgress { game_state, .. } => Some(game_state),
            TickResult::Complete { .. } => None,
        }
    }
}

/// Flat wire shape: `{gameComplete, gameState?, gameResults?, errorsPerTeam?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickResultWire {
    game_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    game_state: Option<Box<ViewerState>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    game_results: Option<GameResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    errors_per_team: Option<TickErrors>,
}

impl From<TickResult> for TickResultWire {
    fn from(result: TickResult) -> Self {
        match result {
            TickResult::InProgress {
                game_state,
                errors_per_team,
            } => Self {
                game_complete: false,
                game_state: Some(game_state),
                game_results: None,
                errors_per_team: Some(errors_per_team),
            },
            TickResult::Complete { game_results } => Self {
                game_complete: true,
                game_state: None,
                game_results: Some(game_results),
                errors_per_team: None,
            },
        }
    }
}

impl TryFrom<TickResultWire> for TickResult {
    type Error = String;

    fn try_from(wire: TickResultWire) -> Result<Self, Self::Error> {
        if wire.game_complete {
            let game_results = wire
                .game_results
                .ok_or_else(|| "completed tick without gameResults".to_string())?;
            Ok(TickResult::Complete { game_results })
        } else {
            let game_state = wire
                .game_state
                .ok_or_else(|| "in-progress tick without gameState".to_string())?;
            Ok(TickResult::InProgress {
                game_state,
                errors_per_team: wire.errors_per_team.unwrap_or_default(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_result_has_only_results() {
        let result = TickResult::Complete {
            game_results: GameResults {
                results: vec![TeamResult {
                    rank: 1,
                    score: 15,
                    team_id: "ext".to_string(),
                    team_name: "name".to_string(),
                }],
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["gameComplete"], true);
        assert_eq!(json["gameResults"]["results"][0]["score"], 15);
        assert!(json.get("gameState").is_none());
        assert!(json.get("errorsPerTeam").is_none());
    }

    #[test]
    fn wire_without_results_is_rejected() {
        let parsed: Result<TickResult, _> =
            serde_json::from_value(serde_json::json!({"gameComplete": true}));
        assert!(parsed.is_err());
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::Command;
use crate::team::TeamId;
use crate::tick::{GameResults, TickResult};
use crate::views::PlayerState;

/// Messages a client sends over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Join the match as a team. The token maps to the organizer's name/id.
    Register { token: String },
    /// Actions for the tick announced by the last `TICK` message.
    Command {
        tick: u32,
        #[serde(default)]
        actions: Option<Value>,
    },
    /// Subscribe as a spectator.
    Viewer,
}

impl ClientMessage {
    /// The command payload carried by a `COMMAND` message.
    pub fn into_command(self) -> Option<(u32, Command)> {
        match self {
            ClientMessage::Command { tick, actions } => Some((tick, Command { actions })),
            _ => None,
        }
    }
}

/// Messages the server sends over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Registration accepted.
    Registered {
        #[serde(rename = "teamId")]
        team_id: TeamId,
        #[serde(rename = "teamName")]
        team_name: String,
    },
    /// Team view for the tick about to be played.
    Tick(Box<PlayerState>),
    /// Spectator view of a played tick.
    ViewerTick { result: Box<TickResult> },
    /// Final standings.
    GameResults(GameResults),
    Error { message: String },
}

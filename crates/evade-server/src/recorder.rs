use std::collections::VecDeque;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use evade_core::net::messages::ServerMessage;
use evade_core::net::protocol::encode_server_message;
use evade_core::options::GameOptions;
use evade_core::tick::TickResult;

/// Receives every tick result the engine produces.
pub trait TickObserver: Send {
    fn on_tick(&mut self, tick: u32, result: &TickResult);
}

#[derive(Debug)]
pub enum RecorderError {
    Io(std::io::Error),
    Encode(String),
    Decode(String),
}

impl std::fmt::Display for RecorderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "replay I/O error: {e}"),
            Self::Encode(e) => write!(f, "replay encode error: {e}"),
            Self::Decode(e) => write!(f, "replay decode error: {e}"),
        }
    }
}

impl std::error::Error for RecorderError {}

impl From<std::io::Error> for RecorderError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedTick {
    pub tick: u32,
    pub result: TickResult,
}

/// Replay file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub options: GameOptions,
    pub ticks: Vec<RecordedTick>,
}

/// In-memory match history. With a non-zero cap the oldest ticks are evicted.
#[derive(Debug)]
pub struct MatchRecorder {
    options: GameOptions,
    ticks: VecDeque<RecordedTick>,
    max_ticks: usize,
}

impl MatchRecorder {
    /// `max_ticks == 0` keeps the whole match.
    pub fn new(options: GameOptions, max_ticks: usize) -> Self {
        Self {
            options,
            ticks: VecDeque::new(),
            max_ticks,
        }
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn ticks(&self) -> impl Iterator<Item = &RecordedTick> {
        self.ticks.iter()
    }

    pub fn to_record(&self) -> MatchRecord {
        MatchRecord {
            options: self.options.clone(),
            ticks: self.ticks.iter().cloned().collect(),
        }
    }

    /// Write the replay. `.msgpack` files are MessagePack, anything else JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<(), RecorderError> {
        let record = self.to_record();
        let bytes = if is_msgpack(path) {
            rmp_serde::to_vec_named(&record).map_err(|e| RecorderError::Encode(e.to_string()))?
        } else {
            serde_json::to_vec(&record).map_err(|e| RecorderError::Encode(e.to_string()))?
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        tracing::info!(path = %path.display(), ticks = record.ticks.len(), "Replay saved");
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<MatchRecord, RecorderError> {
        let bytes = std::fs::read(path)?;
        if is_msgpack(path) {
            rmp_serde::from_slice(&bytes).map_err(|e| RecorderError::Decode(e.to_string()))
        } else {
            serde_json::from_slice(&bytes).map_err(|e| RecorderError::Decode(e.to_string()))
        }
    }
}

impl TickObserver for MatchRecorder {
    fn on_tick(&mut self, tick: u32, result: &TickResult) {
        self.ticks.push_back(RecordedTick {
            tick,
            result: result.clone(),
        });
        if self.max_ticks > 0 {
            while self.ticks.len() > self.max_ticks {
                self.ticks.pop_front();
            }
        }
    }
}

fn is_msgpack(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "msgpack")
}

/// Pushes each tick, encoded as a `VIEWER_TICK` message, to spectators.
#[derive(Debug, Clone)]
pub struct SpectatorFeed {
    tx: broadcast::Sender<String>,
}

impl SpectatorFeed {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }
}

impl TickObserver for SpectatorFeed {
    fn on_tick(&mut self, tick: u32, result: &TickResult) {
        let msg = ServerMessage::ViewerTick {
            result: Box::new(result.clone()),
        };
        match encode_server_message(&msg) {
            // No subscribers is not an error.
            Ok(data) => {
                let _ = self.tx.send(data);
            },
            Err(e) => tracing::warn!(tick, error = %e, "Failed to encode viewer tick"),
        }
    }
}

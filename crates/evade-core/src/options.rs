use serde::{Deserialize, Serialize};

/// Default tick budget for a match.
pub const DEFAULT_TICK_LIMIT: u32 = 2000;

/// Default cooldown before a dead character may respawn.
pub const DEFAULT_RESPAWN_COOLDOWN_TICKS: u32 = 10;

/// Map pool a random map is drawn from when no map name is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapDifficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl std::fmt::Display for MapDifficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Easy => write!(f, "easy"),
            Self::Medium => write!(f, "medium"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

impl std::str::FromStr for MapDifficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown map difficulty '{other}'")),
        }
    }
}

/// Options fixed for the whole match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOptions {
    pub random_seed: u64,
    pub tick_limit: u32,
    pub respawn_cooldown_ticks: u32,
    pub map_name: Option<String>,
    pub map_difficulty: MapDifficulty,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            random_seed: rand::random::<u64>(),
            tick_limit: DEFAULT_TICK_LIMIT,
            respawn_cooldown_ticks: DEFAULT_RESPAWN_COOLDOWN_TICKS,
            map_name: None,
            map_difficulty: MapDifficulty::default(),
        }
    }
}

/// Caller-supplied options. Every field left as `None` keeps its default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameOptionOverrides {
    pub random_seed: Option<u64>,
    pub tick_limit: Option<u32>,
    pub respawn_cooldown_ticks: Option<u32>,
    pub map_name: Option<String>,
    pub map_difficulty: Option<MapDifficulty>,
}

impl GameOptions {
    /// Merge overrides onto the defaults.
    pub fn from_overrides(overrides: GameOptionOverrides) -> Self {
        let defaults = Self::default();
        Self {
            random_seed: overrides.random_seed.unwrap_or(defaults.random_seed),
            tick_limit: overrides.tick_limit.unwrap_or(defaults.tick_limit),
            respawn_cooldown_ticks: overrides
                .respawn_cooldown_ticks
                .unwrap_or(defaults.respawn_cooldown_ticks),
            map_name: overrides.map_name.filter(|name| !name.is_empty()),
            map_difficulty: overrides
                .map_difficulty
                .unwrap_or(defaults.map_difficulty),
        }
    }
}

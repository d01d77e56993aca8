use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use evade_core::options::{GameOptionOverrides, MapDifficulty};

/// Config file read when `EVADE_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "evade.toml";

/// Top-level server configuration, loaded from `evade.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Where to write the match history. `.msgpack` selects MessagePack,
    /// anything else JSON. Empty disables recording.
    pub record_path: String,
    /// Start a new match when one completes.
    pub keep_alive: bool,
    pub game: GameConfig,
    pub timing: TimingConfig,
    pub teams: TeamsConfig,
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8765".to_string(),
            record_path: String::new(),
            keep_alive: true,
            game: GameConfig::default(),
            timing: TimingConfig::default(),
            teams: TeamsConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Match options. Unset fields keep the engine defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub random_seed: Option<u64>,
    pub tick_limit: Option<u32>,
    pub respawn_cooldown_ticks: Option<u32>,
    pub map_name: Option<String>,
    pub map_difficulty: Option<MapDifficulty>,
    /// Extra TOML map files added to the built-in catalog.
    pub map_files: Vec<String>,
}

impl GameConfig {
    pub fn overrides(&self) -> GameOptionOverrides {
        GameOptionOverrides {
            random_seed: self.random_seed,
            tick_limit: self.tick_limit,
            respawn_cooldown_ticks: self.respawn_cooldown_ticks,
            map_name: self.map_name.clone(),
            map_difficulty: self.map_difficulty,
        }
    }
}

/// Tick pacing and startup deadline, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub time_per_tick_ms: u64,
    pub delay_between_ticks_ms: u64,
    pub game_start_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            time_per_tick_ms: 1000,
            delay_between_ticks_ms: 50,
            game_start_timeout_ms: 500_000,
        }
    }
}

impl TimingConfig {
    pub fn time_per_tick(&self) -> Duration {
        Duration::from_millis(self.time_per_tick_ms)
    }

    pub fn delay_between_ticks(&self) -> Duration {
        Duration::from_millis(self.delay_between_ticks_ms)
    }

    pub fn game_start_timeout(&self) -> Duration {
        Duration::from_millis(self.game_start_timeout_ms)
    }
}

/// Who may register, and how many teams a match waits for.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TeamsConfig {
    pub expected: usize,
    /// Display name per registration token.
    pub names_by_token: HashMap<String, String>,
    /// Organizer-side team id per registration token.
    pub ids_by_token: HashMap<String, String>,
}

impl Default for TeamsConfig {
    fn default() -> Self {
        Self {
            expected: 1,
            names_by_token: HashMap::new(),
            ids_by_token: HashMap::new(),
        }
    }
}

impl TeamsConfig {
    /// Resolve a registration token to `(name, external_id)`. With no token
    /// table configured every token is accepted and used as both.
    pub fn resolve(&self, token: &str) -> Option<(String, String)> {
        if self.names_by_token.is_empty() && self.ids_by_token.is_empty() {
            return Some((token.to_string(), token.to_string()));
        }
        let name = self.names_by_token.get(token)?;
        let id = self
            .ids_by_token
            .get(token)
            .cloned()
            .unwrap_or_else(|| token.to_string());
        Some((name.clone(), id))
    }
}

/// Infrastructure limits (connection caps, buffer sizes).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub team_message_buffer: usize,
    pub spectator_buffer: usize,
    /// Keep at most this many ticks in memory. 0 keeps all of them.
    pub max_recorded_ticks: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 64,
            team_message_buffer: 16,
            spectator_buffer: 256,
            max_recorded_ticks: 0,
        }
    }
}

impl ServerConfig {
    /// Validate configuration. Invalid values are fatal.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }
        if self.timing.time_per_tick_ms == 0 {
            tracing::error!("timing.time_per_tick_ms must be > 0");
            std::process::exit(1);
        }
        if self.teams.expected == 0 {
            tracing::error!("teams.expected must be > 0");
            std::process::exit(1);
        }
        if self.game.tick_limit == Some(0) {
            tracing::error!("game.tick_limit must be > 0");
            std::process::exit(1);
        }
        if self.limits.max_ws_connections == 0 {
            tracing::error!("limits.max_ws_connections must be > 0");
            std::process::exit(1);
        }
        if self.limits.team_message_buffer == 0 {
            tracing::error!("limits.team_message_buffer must be > 0");
            std::process::exit(1);
        }
        if self.limits.spectator_buffer == 0 {
            tracing::error!("limits.spectator_buffer must be > 0");
            std::process::exit(1);
        }
        if self.teams.expected > self.limits.max_ws_connections {
            tracing::warn!(
                expected = self.teams.expected,
                max = self.limits.max_ws_connections,
                "More teams expected than WebSocket connections allowed"
            );
        }
    }

    /// Load config from `EVADE_CONFIG` (or `evade.toml`) if it exists, then
    /// apply env var overrides.
    pub fn load() -> Self {
        let path =
            std::env::var("EVADE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(%path, "Loaded configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(%path, "Failed to parse config: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!(%path, "No config file found, using defaults");
                ServerConfig::default()
            },
        };
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("EVADE_LISTEN_ADDR")
            && !addr.is_empty()
        {
            self.listen_addr = addr;
        }
        if let Ok(path) = std::env::var("EVADE_RECORD_PATH") {
            self.record_path = path;
        }
        if let Ok(val) = std::env::var("EVADE_KEEP_ALIVE")
            && let Ok(b) = val.parse::<bool>()
        {
            self.keep_alive = b;
        }

        // Game overrides
        if let Ok(val) = std::env::var("EVADE_RANDOM_SEED")
            && let Ok(n) = val.parse::<u64>()
        {
            self.game.random_seed = Some(n);
        }
        if let Ok(val) = std::env::var("EVADE_TICK_LIMIT")
            && let Ok(n) = val.parse::<u32>()
        {
            self.game.tick_limit = Some(n);
        }
        if let Ok(name) = std::env::var("EVADE_MAP_NAME")
            && !name.is_empty()
        {
            self.game.map_name = Some(name);
        }
        if let Ok(val) = std::env::var("EVADE_MAP_DIFFICULTY")
            && let Ok(d) = val.parse::<MapDifficulty>()
        {
            self.game.map_difficulty = Some(d);
        }

        // Timing overrides
        if let Ok(val) = std::env::var("EVADE_TIME_PER_TICK_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.timing.time_per_tick_ms = n;
        }
        if let Ok(val) = std::env::var("EVADE_DELAY_BETWEEN_TICKS_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.timing.delay_between_ticks_ms = n;
        }
        if let Ok(val) = std::env::var("EVADE_GAME_START_TIMEOUT_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.timing.game_start_timeout_ms = n;
        }
        if let Ok(val) = std::env::var("EVADE_EXPECTED_TEAMS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.teams.expected = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen_addr, "0.0.0.0:8765");
        assert!(cfg.keep_alive);
        assert!(cfg.record_path.is_empty());
        assert_eq!(cfg.timing.time_per_tick_ms, 1000);
        assert_eq!(cfg.timing.delay_between_ticks_ms, 50);
        assert_eq!(cfg.timing.game_start_timeout_ms, 500_000);
        assert_eq!(cfg.teams.expected, 1);
    }

    #[test]
    fn validate_accepts_valid_config() {
        ServerConfig::default().validate();
    }

    #[test]
    fn validate_rejects_invalid_addr() {
        let cfg = ServerConfig {
            listen_addr: "not-an-address".to_string(),
            ..ServerConfig::default()
        };
        // validate() calls process::exit, so we test the underlying check
        assert!(cfg.listen_addr.parse::<std::net::SocketAddr>().is_err());
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
listen_addr = "127.0.0.1:9000"
record_path = "replays/match.msgpack"
keep_alive = false

[game]
random_seed = 42
tick_limit = 300
map_name = "corridor"
map_difficulty = "hard"
map_files = ["maps/extra.toml"]

[timing]
time_per_tick_ms = 200
delay_between_ticks_ms = 0
game_start_timeout_ms = 10000

[teams]
expected = 2

[teams.names_by_token]
tok-a = "Alpha"
tok-b = "Bravo"

[teams.ids_by_token]
tok-a = "team-1"
"#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:9000");
        assert!(!cfg.keep_alive);
        assert_eq!(cfg.game.random_seed, Some(42));
        assert_eq!(cfg.game.map_difficulty, Some(MapDifficulty::Hard));
        assert_eq!(cfg.game.map_files.len(), 1);
        assert_eq!(cfg.timing.time_per_tick(), Duration::from_millis(200));
        assert_eq!(cfg.teams.expected, 2);
        assert_eq!(
            cfg.teams.resolve("tok-a"),
            Some(("Alpha".to_string(), "team-1".to_string()))
        );
        assert_eq!(
            cfg.teams.resolve("tok-b"),
            Some(("Bravo".to_string(), "tok-b".to_string()))
        );
        assert_eq!(cfg.teams.resolve("tok-z"), None);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let cfg: ServerConfig = toml::from_str("keep_alive = false\n").unwrap();
        assert_eq!(cfg.timing.time_per_tick_ms, 1000);
        assert_eq!(cfg.limits.team_message_buffer, 16);
        assert!(cfg.game.random_seed.is_none());
    }

    #[test]
    fn open_registration_without_token_table() {
        let teams = TeamsConfig::default();
        assert_eq!(
            teams.resolve("anyone"),
            Some(("anyone".to_string(), "anyone".to_string()))
        );
    }

    #[test]
    fn game_section_maps_to_overrides() {
        let game = GameConfig {
            random_seed: Some(3),
            map_name: Some("watchtower".to_string()),
            ..GameConfig::default()
        };
        let overrides = game.overrides();
        assert_eq!(overrides.random_seed, Some(3));
        assert_eq!(overrides.map_name.as_deref(), Some("watchtower"));
        assert!(overrides.tick_limit.is_none());
    }
}

pub mod action;
pub mod geometry;
pub mod map;
pub mod net;
pub mod options;
pub mod team;
pub mod tick;
pub mod views;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::BTreeSet;

    use crate::geometry::Position;
    use crate::map::Map;
    use crate::options::{GameOptionOverrides, GameOptions};
    use crate::team::{Team, TeamId};

    /// Create a team with a recognizable name and external id.
    pub fn make_team(name: &str) -> Team {
        Team::new(TeamId(format!("team-{name}")), name, format!("ext-{name}"))
    }

    /// Options with a fixed seed and the given tick limit.
    pub fn seeded_options(seed: u64, tick_limit: u32) -> GameOptions {
        GameOptions::from_overrides(GameOptionOverrides {
            random_seed: Some(seed),
            tick_limit: Some(tick_limit),
            ..GameOptionOverrides::default()
        })
    }

    /// A wall-free map with the character at `spawn` and no threats.
    pub fn open_map(width: u32, height: u32, spawn: Position) -> Map {
        Map {
            name: "open-field".to_string(),
            width,
            height,
            non_walkable: BTreeSet::new(),
            character_spawn: spawn,
            threats: Vec::new(),
        }
    }
}

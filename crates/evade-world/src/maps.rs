use std::collections::BTreeSet;
use std::path::Path;

use rand::Rng;
use rand::rngs::StdRng;
use serde::Deserialize;

use evade_core::geometry::Position;
use evade_core::map::{Map, MapError, ThreatSpec, ThreatStyle};
use evade_core::options::MapDifficulty;

/// Built-in levels: (name, difficulty, rows).
const BUILTIN_MAPS: &[(&str, MapDifficulty, &[&str])] = &[
    (
        "open-yard",
        MapDifficulty::Easy,
        &[
            "##########",
            "#C.......#",
            "#........#",
            "#..##....#",
            "#..##....#",
            "#........#",
            "#.......S#",
            "##########",
        ],
    ),
    (
        "corridor",
        MapDifficulty::Easy,
        &[
            "############",
            "#C.........#",
            "#.########.#",
            "#.#......#.#",
            "#.########.#",
            "#.........S#",
            "############",
        ],
    ),
    (
        "watchtower",
        MapDifficulty::Medium,
        &[
            "#############",
            "#C....#.....#",
            "#.##..#..##.#",
            "#.#.......#.#",
            "#...S...G...#",
            "#.#.......#.#",
            "#.##..#..##.#",
            "#.....#....B#",
            "#############",
        ],
    ),
    (
        "maze-ward",
        MapDifficulty::Hard,
        &[
            "###############",
            "#C..#.....#...#",
            "#.#.#.###.#.#.#",
            "#.#...#...#.#.#",
            "#.#####.###.#.#",
            "#.....#..S..#.#",
            "###.#.#.###.#.#",
            "#...#...#A....#",
            "#.###.###.###.#",
            "#.....F.......#",
            "###############",
        ],
    ),
];

/// Parse an ASCII layout, one string per row (top row first).
///
/// Legend: `#` wall, `C` character spawn, `S` surveillance, `G` girouette,
/// `B` straight ahead, `A` aggressive, `F` ghost, `.` or space empty.
pub fn parse_layout(name: &str, rows: &[&str]) -> Result<Map, MapError> {
    let height = rows.len();
    let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
    if height == 0 || width == 0 {
        return Err(MapError::InvalidLayout(format!("map '{name}' is empty")));
    }

    let mut non_walkable = BTreeSet::new();
    let mut character_spawn = None;
    let mut threats = Vec::new();

    for (y, row) in rows.iter().enumerate() {
        if row.chars().count() != width {
            return Err(MapError::InvalidLayout(format!(
                "map '{name}' row {y} has {} cells, expected {width}",
                row.chars().count()
            )));
        }
        for (x, c) in row.chars().enumerate() {
            let pos = Position::new(x as i32, y as i32);
            let style = match c {
                '#' => {
                    non_walkable.insert(pos);
                    continue;
                },
                '.' | ' ' => continue,
                'C' => {
                    if character_spawn.replace(pos).is_some() {
                        return Err(MapError::InvalidLayout(format!(
                            "map '{name}' has more than one character spawn"
                        )));
                    }
                    continue;
                },
                'S' => ThreatStyle::Surveillance,
                'G' => ThreatStyle::Girouette,
                'B' => ThreatStyle::StraightAhead,
                'A' => ThreatStyle::Aggressive,
                'F' => ThreatStyle::Ghost,
                other => {
                    return Err(MapError::InvalidLayout(format!(
                        "map '{name}' has unknown cell '{other}' at ({x}, {y})"
                    )));
                },
            };
            threats.push(ThreatSpec {
                position: pos,
                style,
            });
        }
    }

    let Some(character_spawn) = character_spawn else {
        return Err(MapError::InvalidLayout(format!(
            "map '{name}' has no character spawn"
        )));
    };

    let map = Map {
        name: name.to_string(),
        width: width as u32,
        height: height as u32,
        non_walkable,
        character_spawn,
        threats,
    };
    map.validate()?;
    Ok(map)
}

/// On-disk map format.
#[derive(Debug, Deserialize)]
struct MapFile {
    name: String,
    #[serde(default)]
    difficulty: MapDifficulty,
    layout: Vec<String>,
}

/// Catalog of playable maps, keyed by name and difficulty.
#[derive(Debug, Clone, Default)]
pub struct MapLoader {
    maps: Vec<(MapDifficulty, Map)>,
}

impl MapLoader {
    /// A loader with no maps at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A loader with every built-in map.
    pub fn builtin() -> Result<Self, MapError> {
        let mut loader = Self::empty();
        for (name, difficulty, rows) in BUILTIN_MAPS {
            loader.insert(*difficulty, parse_layout(name, rows)?);
        }
        Ok(loader)
    }

    /// Add a map, replacing any previous map with the same name.
    pub fn insert(&mut self, difficulty: MapDifficulty, map: Map) {
        self.maps.retain(|(_, m)| m.name != map.name);
        self.maps.push((difficulty, map));
    }

    pub fn with_map(mut self, difficulty: MapDifficulty, map: Map) -> Self {
        self.insert(difficulty, map);
        self
    }

    /// Read a TOML map file (`name`, `difficulty`, `layout`) and add it.
    pub fn load_file(&mut self, path: &Path) -> Result<(), MapError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MapError::Io(format!("{}: {e}", path.display())))?;
        let (difficulty, map) = Self::parse_file(&contents)?;
        tracing::info!(
            map = %map.name,
            %difficulty,
            path = %path.display(),
            "Loaded map file"
        );
        self.insert(difficulty, map);
        Ok(())
    }

    fn parse_file(contents: &str) -> Result<(MapDifficulty, Map), MapError> {
        let file: MapFile = toml::from_str(contents).map_err(|e| MapError::Parse(e.to_string()))?;
        let rows: Vec<&str> = file.layout.iter().map(String::as_str).collect();
        let map = parse_layout(&file.name, &rows)?;
        Ok((file.difficulty, map))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.maps.iter().map(|(_, m)| m.name.as_str())
    }

    /// Resolve the map for a match: by name when given, otherwise a seeded
    /// random pick among the maps of `difficulty`.
    pub fn load(
        &self,
        name: Option<&str>,
        difficulty: MapDifficulty,
        rng: &mut StdRng,
    ) -> Result<Map, MapError> {
        if let Some(name) = name {
            return self
                .maps
                .iter()
                .find(|(_, m)| m.name == name)
                .map(|(_, m)| m.clone())
                .ok_or_else(|| MapError::UnknownMap(name.to_string()));
        }

        let candidates: Vec<&Map> = self
            .maps
            .iter()
            .filter(|(d, _)| *d == difficulty)
            .map(|(_, m)| m)
            .collect();
        if candidates.is_empty() {
            return Err(MapError::NoMapForDifficulty(difficulty.to_string()));
        }
        let map = candidates[rng.random_range(0..candidates.len())].clone();
        tracing::debug!(map = %map.name, %difficulty, "Picked random map");
        Ok(map)
    }
}

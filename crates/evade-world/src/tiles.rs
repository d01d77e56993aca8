use evade_core::geometry::Position;
use evade_core::map::{Map, TileType};
use evade_core::views::MapView;

/// Static tile grid, indexed `[x][y]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tiles {
    width: u32,
    height: u32,
    cells: Vec<Vec<TileType>>,
}

impl Tiles {
    /// Build a width×height grid of `Empty`, then mark every non-walkable
    /// cell as `Wall`.
    pub fn create(map: &Map) -> Self {
        let mut cells = vec![vec![TileType::Empty; map.height as usize]; map.width as usize];
        for wall in &map.non_walkable {
            if map.contains(*wall) {
                cells[wall.x as usize][wall.y as usize] = TileType::Wall;
            }
        }
        Self {
            width: map.width,
            height: map.height,
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, pos: Position) -> Option<TileType> {
        if pos.x < 0 || pos.y < 0 {
            return None;
        }
        self.cells
            .get(pos.x as usize)
            .and_then(|column| column.get(pos.y as usize))
            .copied()
    }

    /// 1 for walkable, 0 for walls. Consumed by the pathfinding grid.
    pub fn walkability_matrix(&self) -> Vec<Vec<u8>> {
        self.cells
            .iter()
            .map(|column| {
                column
                    .iter()
                    .map(|t| u8::from(*t != TileType::Wall))
                    .collect()
            })
            .collect()
    }

    /// 0 for open corridor, 1 for obstacles. Consumed by line-of-sight checks.
    pub fn obstacle_matrix(&self) -> ObstacleGrid {
        ObstacleGrid {
            cells: self
                .cells
                .iter()
                .map(|column| {
                    column
                        .iter()
                        .map(|t| u8::from(*t == TileType::Wall))
                        .collect()
                })
                .collect(),
        }
    }

    pub fn to_view(&self) -> MapView {
        MapView {
            width: self.width,
            height: self.height,
            tiles: self.cells.clone(),
        }
    }
}

/// Inverted walkability used by threats to scan for obstacles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObstacleGrid {
    cells: Vec<Vec<u8>>,
}

impl ObstacleGrid {
    /// Out-of-bounds cells count as obstacles.
    pub fn is_obstacle(&self, pos: Position) -> bool {
        if pos.x < 0 || pos.y < 0 {
            return true;
        }
        self.cells
            .get(pos.x as usize)
            .and_then(|column| column.get(pos.y as usize))
            .is_none_or(|cell| *cell != 0)
    }

    pub fn cells(&self) -> &[Vec<u8>] {
        &self.cells
    }
}

use std::cmp::Reverse;
use std::collections::VecDeque;

use evade_core::geometry::{Direction, Position};

/// Neighbor order used by the aggressive search.
const AGGRESSIVE_ORDER: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

/// Shortest-path oracle over a static grid.
pub trait Pathfinder {
    /// Cells from `from` to `to`, both included, or `None` when unreachable.
    /// Must return the same path for the same inputs.
    fn get_path(&self, from: Position, to: Position) -> Option<Vec<Position>>;
}

/// Breadth-first pathfinding over a walkability matrix (`[x][y]`, 1 = walkable).
///
/// Neighbors are expanded left, right, up, down so that ties between equally
/// short paths always resolve the same way.
#[derive(Debug, Clone)]
pub struct PathfindingGrid {
    width: usize,
    height: usize,
    walkable: Vec<bool>,
}

impl PathfindingGrid {
    pub fn from_matrix(matrix: &[Vec<u8>]) -> Self {
        let width = matrix.len();
        let height = matrix.first().map(Vec::len).unwrap_or(0);
        let mut walkable = vec![false; width * height];
        for (x, column) in matrix.iter().enumerate() {
            for (y, cell) in column.iter().enumerate().take(height) {
                walkable[y * width + x] = *cell != 0;
            }
        }
        Self {
            width,
            height,
            walkable,
        }
    }

    pub fn is_walkable(&self, pos: Position) -> bool {
        self.index(pos).is_some_and(|i| self.walkable[i])
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 {
            return None;
        }
        let (x, y) = (pos.x as usize, pos.y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    fn position(&self, index: usize) -> Position {
        Position::new((index % self.width) as i32, (index / self.width) as i32)
    }

    /// BFS from `from`. Returns per-cell (distance, parent) tables, stopping
    /// early once `target` is settled.
    fn search(&self, from: usize, target: Option<usize>) -> (Vec<Option<u32>>, Vec<Option<usize>>) {
        let mut cost = vec![None; self.walkable.len()];
        let mut came_from = vec![None; self.walkable.len()];
        let mut frontier = VecDeque::new();
        cost[from] = Some(0);
        frontier.push_back(from);

        while let Some(node) = frontier.pop_front() {
            if Some(node) == target {
                break;
            }
            let node_cost = cost[node].unwrap_or(0);
            let here = self.position(node);
            for direction in Direction::ALL {
                let Some(next) = self.index(here.step(direction)) else {
                    continue;
                };
                if !self.walkable[next] || cost[next].is_some() {
                    continue;
                }
                cost[next] = Some(node_cost + 1);
                came_from[next] = Some(node);
                frontier.push_back(next);
            }
        }
        (cost, came_from)
    }

    /// Cells from `goal` back to the search root, reversed.
    fn trace_path(&self, came_from: &[Option<usize>], goal: usize) -> Vec<Position> {
        let mut path = vec![self.position(goal)];
        let mut node = goal;
        while let Some(parent) = came_from[node] {
            path.push(self.position(parent));
            node = parent;
        }
        path.reverse();
        path
    }

    /// Shortest path the way aggressive threats search it, both ends included.
    ///
    /// Every walkable cell starts in an unseen list in column-major order.
    /// Each round the list is stably sorted by decreasing cost and the last
    /// cell, the cheapest, is expanded up, down, left, right. Ties therefore
    /// break differently from [`Pathfinder::get_path`].
    pub fn get_aggressive_path(&self, from: Position, to: Position) -> Option<Vec<Position>> {
        let start = self.index(from).filter(|i| self.walkable[*i])?;
        let goal = self.index(to).filter(|i| self.walkable[*i])?;

        let width = self.width;
        let mut unseen: Vec<usize> = (0..self.width)
            .flat_map(|x| (0..self.height).map(move |y| y * width + x))
            .filter(|i| self.walkable[*i])
            .collect();
        let mut cost: Vec<Option<u32>> = vec![None; self.walkable.len()];
        let mut came_from = vec![None; self.walkable.len()];
        cost[start] = Some(0);

        loop {
            unseen.sort_by_key(|i| Reverse(cost[*i].unwrap_or(u32::MAX)));
            let Some(node) = unseen.pop() else {
                break;
            };
            let Some(node_cost) = cost[node] else {
                break;
            };
            if node == goal {
                break;
            }
            let here = self.position(node);
            for direction in AGGRESSIVE_ORDER {
                let Some(next) = self.index(here.step(direction)).filter(|i| self.walkable[*i])
                else {
                    continue;
                };
                if cost[next].is_none() {
                    cost[next] = Some(node_cost + 1);
                    came_from[next] = Some(node);
                }
            }
        }

        cost[goal]?;
        Some(self.trace_path(&came_from, goal))
    }

    /// Shortest walking distance from `from` to every cell, `[x][y]`.
    /// Walls and unreachable cells are `None`.
    pub fn get_distances(&self, from: Position) -> Vec<Vec<Option<u32>>> {
        let mut distances = vec![vec![None; self.height]; self.width];
        let Some(start) = self.index(from).filter(|i| self.walkable[*i]) else {
            return distances;
        };
        let (cost, _) = self.search(start, None);
        for (index, c) in cost.into_iter().enumerate() {
            let pos = self.position(index);
            distances[pos.x as usize][pos.y as usize] = c;
        }
        distances
    }
}

impl Pathfinder for PathfindingGrid {
    fn get_path(&self, from: Position, to: Position) -> Option<Vec<Position>> {
        let start = self.index(from).filter(|i| self.walkable[*i])?;
        let goal = self.index(to).filter(|i| self.walkable[*i])?;
        let (cost, came_from) = self.search(start, Some(goal));
        cost[goal]?;
        Some(self.trace_path(&came_from, goal))
    }
}

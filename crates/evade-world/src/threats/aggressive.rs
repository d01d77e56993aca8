use std::sync::Arc;

use rand::rngs::StdRng;

use evade_core::geometry::Direction;
use evade_core::map::ThreatStyle;
use evade_core::views::ThreatSnapshot;

use super::{ThreatBehavior, ThreatState};
use crate::pathfinding::PathfindingGrid;

/// Follows the shortest path to the character, searched with
/// [`PathfindingGrid::get_aggressive_path`].
#[derive(Debug)]
pub struct Aggressive {
    pathfinder: Arc<PathfindingGrid>,
}

impl Aggressive {
    pub fn new(pathfinder: Arc<PathfindingGrid>) -> Self {
        Self { pathfinder }
    }
}

impl ThreatBehavior for Aggressive {
    fn style(&self) -> ThreatStyle {
        ThreatStyle::Aggressive
    }

    fn next_move(
        &mut self,
        state: &ThreatState,
        snapshot: &ThreatSnapshot,
        _rng: &mut StdRng,
    ) -> Option<Direction> {
        let target = state
            .known_character_position
            .or_else(|| snapshot.character.as_ref().map(|c| c.position))?;
        match self.pathfinder.get_aggressive_path(state.position, target) {
            Some(path) if path.len() >= 2 => Direction::toward(state.position, path[1]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use evade_core::geometry::Position;

    use super::*;
    use crate::threats::test_support::*;

    #[test]
    fn follows_shortest_path_around_walls() {
        let arena = arena(&["C#A", ".#.", "..."]);
        let mut threat = Aggressive::new(Arc::clone(&arena.pathfinder));
        let state = state(&arena, Position::new(2, 0), Direction::Left);
        assert_eq!(
            threat.next_move(&state, &arena.snapshot, &mut rng()),
            Some(Direction::Down)
        );
    }

    #[test]
    fn prefers_known_position_over_snapshot() {
        let arena = arena(&["C...A"]);
        let mut threat = Aggressive::new(Arc::clone(&arena.pathfinder));
        let mut state = state(&arena, Position::new(2, 0), Direction::Left);
        state.known_character_position = Some(Position::new(4, 0));
        assert_eq!(
            threat.next_move(&state, &arena.snapshot, &mut rng()),
            Some(Direction::Right)
        );
    }

    #[test]
    fn breaks_ties_with_its_own_search_order() {
        let mut arena = arena(&["C..", "...", "..A"]);
        if let Some(c) = arena.snapshot.character.as_mut() {
            c.position = Position::new(0, 0);
        }
        let mut threat = Aggressive::new(Arc::clone(&arena.pathfinder));
        let state = state(&arena, Position::new(2, 2), Direction::Left);
        assert_eq!(
            threat.next_move(&state, &arena.snapshot, &mut rng()),
            Some(Direction::Up)
        );
    }

    #[test]
    fn stays_when_on_target() {
        let arena = arena(&["C..A"]);
        let mut threat = Aggressive::new(Arc::clone(&arena.pathfinder));
        let state = state(&arena, Position::new(0, 0), Direction::Left);
        assert_eq!(threat.next_move(&state, &arena.snapshot, &mut rng()), None);
    }
}

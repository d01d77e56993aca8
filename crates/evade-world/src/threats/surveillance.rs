use std::sync::Arc;

use rand::rngs::StdRng;

use evade_core::geometry::{Direction, Position};
use evade_core::map::ThreatStyle;
use evade_core::views::ThreatSnapshot;

use super::{ThreatBehavior, ThreatState, step_toward};
use crate::pathfinding::PathfindingGrid;
use crate::tiles::ObstacleGrid;

/// Length of one watch cycle, in ticks.
const WATCH_PERIOD: u32 = 60;
/// Ticks at the start of each cycle during which the guard looks around.
const WATCH_WINDOW: u32 = 10;

/// Watches its row and column during the first ticks of every cycle and
/// walks to the last place it saw the character.
#[derive(Debug)]
pub struct Surveillance {
    pathfinder: Arc<PathfindingGrid>,
    obstacles: Arc<ObstacleGrid>,
    last_target_seen_position: Option<Position>,
}

impl Surveillance {
    pub fn new(pathfinder: Arc<PathfindingGrid>, obstacles: Arc<ObstacleGrid>) -> Self {
        Self {
            pathfinder,
            obstacles,
            last_target_seen_position: None,
        }
    }

    pub fn last_target_seen_position(&self) -> Option<Position> {
        self.last_target_seen_position
    }

    /// Same row or column with no obstacle anywhere on the closed segment.
    fn in_line_of_sight(&self, from: Position, to: Position) -> bool {
        if from.x == to.x {
            let (lo, hi) = (from.y.min(to.y), from.y.max(to.y));
            (lo..=hi).all(|y| !self.obstacles.is_obstacle(Position::new(from.x, y)))
        } else if from.y == to.y {
            let (lo, hi) = (from.x.min(to.x), from.x.max(to.x));
            (lo..=hi).all(|x| !self.obstacles.is_obstacle(Position::new(x, from.y)))
        } else {
            false
        }
    }
}

impl ThreatBehavior for Surveillance {
    fn style(&self) -> ThreatStyle {
        ThreatStyle::Surveillance
    }

    fn observe(&mut self, state: &ThreatState, snapshot: &ThreatSnapshot) {
        if snapshot.tick % WATCH_PERIOD < WATCH_WINDOW
            && let Some(character) = snapshot.character.as_ref().filter(|c| c.alive)
            && self.in_line_of_sight(state.position, character.position)
        {
            self.last_target_seen_position = Some(character.position);
        }
    }

    fn next_move(
        &mut self,
        state: &ThreatState,
        _snapshot: &ThreatSnapshot,
        _rng: &mut StdRng,
    ) -> Option<Direction> {
        let target = self.last_target_seen_position?;
        let direction = step_toward(&self.pathfinder, state.position, target);
        if direction.is_none() && target != state.position {
            tracing::debug!(?target, position = ?state.position, "No path to last sighting");
        }
        direction
    }
}

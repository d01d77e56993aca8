use rand::rngs::StdRng;

use evade_core::geometry::Direction;
use evade_core::map::ThreatStyle;
use evade_core::views::ThreatSnapshot;

use super::{ThreatBehavior, ThreatState, random_open_direction};

/// Keeps its heading until blocked, then picks a random open direction.
#[derive(Debug, Default)]
pub struct StraightAhead;

impl ThreatBehavior for StraightAhead {
    fn style(&self) -> ThreatStyle {
        ThreatStyle::StraightAhead
    }

    fn next_move(
        &mut self,
        state: &ThreatState,
        _snapshot: &ThreatSnapshot,
        rng: &mut StdRng,
    ) -> Option<Direction> {
        if state.open_directions.contains(&state.direction) {
            return Some(state.direction);
        }
        random_open_direction(state, rng)
    }
}

use rand::rngs::StdRng;

use evade_core::geometry::{Direction, Position};
use evade_core::map::ThreatStyle;
use evade_core::views::ThreatSnapshot;

use super::{ThreatBehavior, ThreatState};

/// Squared distance under which the ghost gives up the chase.
const SCATTER_DIST_SQUARED: i32 = 36;

/// Chases the character from afar and heads back home once close. Never
/// reverses unless it hits a dead end.
#[derive(Debug, Default)]
pub struct Ghost;

impl Ghost {
    fn target(state: &ThreatState, snapshot: &ThreatSnapshot) -> Option<Position> {
        let character = state
            .known_character_position
            .or_else(|| snapshot.character.as_ref().map(|c| c.position))?;
        if state.position.dist_squared(character) > SCATTER_DIST_SQUARED {
            Some(character)
        } else {
            Some(state.spawn_point)
        }
    }
}

impl ThreatBehavior for Ghost {
    fn style(&self) -> ThreatStyle {
        ThreatStyle::Ghost
    }

    fn next_move(
        &mut self,
        state: &ThreatState,
        snapshot: &ThreatSnapshot,
        _rng: &mut StdRng,
    ) -> Option<Direction> {
        let target = Self::target(state, snapshot)?;
        let reverse = state.direction.opposite();
        let forward: Vec<Direction> = state
            .open_directions
            .iter()
            .copied()
            .filter(|d| *d != reverse)
            .collect();
        let candidates = if forward.is_empty() {
            &state.open_directions
        } else {
            &forward
        };
        // min_by_key keeps the first of equal keys, so ties follow exploration order.
        candidates
            .iter()
            .copied()
            .min_by_key(|d| state.position.step(*d).dist_squared(target))
    }
}

use rand::rngs::StdRng;

use evade_core::geometry::Direction;
use evade_core::map::ThreatStyle;
use evade_core::views::ThreatSnapshot;

use super::{ThreatBehavior, ThreatState, random_open_direction};

/// Turns like a weathervane: a random open direction every step.
#[derive(Debug, Default)]
pub struct Girouette;

impl ThreatBehavior for Girouette {
    fn style(&self) -> ThreatStyle {
        ThreatStyle::Girouette
    }

    fn next_move(
        &mut self,
        state: &ThreatState,
        _snapshot: &ThreatSnapshot,
        rng: &mut StdRng,
    ) -> Option<Direction> {
        random_open_direction(state, rng)
    }
}

#[cfg(test)]
mod tests {
    use evade_core::geometry::Position;

    use super::*;
    use crate::threats::test_support::*;

    #[test]
    fn only_picks_open_directions() {
        let arena = arena(&["C#.", "...", "#.G"]);
        let state = state(&arena, Position::new(1, 1), Direction::Left);
        let mut rng = rng();
        for _ in 0..50 {
            let d = Girouette.next_move(&state, &arena.snapshot, &mut rng);
            assert!(d.is_some_and(|d| d != Direction::Up));
        }
    }

    #[test]
    fn same_seed_same_choices() {
        let arena = arena(&["C..", "...", "..G"]);
        let state = state(&arena, Position::new(1, 1), Direction::Left);
        let run = || {
            let mut rng = rng();
            (0..20)
                .map(|_| Girouette.next_move(&state, &arena.snapshot, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn boxed_in_stays_put() {
        let arena = arena(&["C#", "#G"]);
        let state = state(&arena, Position::new(1, 1), Direction::Left);
        assert_eq!(Girouette.next_move(&state, &arena.snapshot, &mut rng()), None);
    }
}

//! Threats and their movement styles.
//!
//! A [`Threat`] is a shell that owns position and heading and applies moves.
//! The decision of where to go is delegated to a boxed [`ThreatBehavior`],
//! one per style, so the world never branches on the style itself.
//!
//! Threats speed up as the match goes on: early on they only step every fifth
//! tick, and past tick 900 they step every tick (see [`move_interval`]).

mod aggressive;
mod ghost;
mod girouette;
mod straight_ahead;
mod surveillance;

use std::sync::Arc;

use rand::Rng;
use rand::rngs::StdRng;

use evade_core::geometry::{Direction, Position};
use evade_core::map::{ThreatSpec, ThreatStyle};
use evade_core::views::{ThreatSnapshot, ThreatView};

use crate::pathfinding::PathfindingGrid;
use crate::tiles::ObstacleGrid;

pub use aggressive::Aggressive;
pub use ghost::Ghost;
pub use girouette::Girouette;
pub use straight_ahead::StraightAhead;
pub use surveillance::Surveillance;

/// Personality reported for every threat.
pub const PERSONALITY: &str = "lazy";

/// Number of ticks between two threat steps at world tick `tick`.
pub fn move_interval(tick: u32) -> u32 {
    match tick {
        0..=300 => 5,
        301..=500 => 4,
        501..=700 => 3,
        701..=900 => 2,
        _ => 1,
    }
}

/// What a behavior may read about the threat it drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreatState {
    pub position: Position,
    pub direction: Direction,
    pub spawn_point: Position,
    /// Character position stored after the previous world update.
    pub known_character_position: Option<Position>,
    /// Neighboring directions that are not obstacles, in [`Direction::ALL`] order.
    pub open_directions: Vec<Direction>,
}

/// One movement style. Returns the direction of the next step, or `None` to
/// stay in place.
pub trait ThreatBehavior: Send + Sync + std::fmt::Debug {
    fn style(&self) -> ThreatStyle;

    /// Called on every tick, including ticks where the threat does not move.
    fn observe(&mut self, _state: &ThreatState, _snapshot: &ThreatSnapshot) {}

    fn next_move(
        &mut self,
        state: &ThreatState,
        snapshot: &ThreatSnapshot,
        rng: &mut StdRng,
    ) -> Option<Direction>;
}

#[derive(Debug)]
pub struct Threat {
    id: String,
    position: Position,
    direction: Direction,
    spawn_point: Position,
    known_character_position: Option<Position>,
    ticks_since_last_move: u32,
    obstacles: Arc<ObstacleGrid>,
    behavior: Box<dyn ThreatBehavior>,
}

impl Threat {
    pub fn new(
        id: String,
        spawn_point: Position,
        obstacles: Arc<ObstacleGrid>,
        behavior: Box<dyn ThreatBehavior>,
        rng: &mut StdRng,
    ) -> Self {
        let open = open_directions(&obstacles, spawn_point);
        let direction = if open.is_empty() {
            Direction::Left
        } else {
            open[rng.random_range(0..open.len())]
        };
        Self {
            id,
            position: spawn_point,
            direction,
            spawn_point,
            known_character_position: None,
            ticks_since_last_move: 0,
            obstacles,
            behavior,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn style(&self) -> ThreatStyle {
        self.behavior.style()
    }

    pub fn set_character_position(&mut self, position: Option<Position>) {
        self.known_character_position = position;
    }

    fn state(&self) -> ThreatState {
        ThreatState {
            position: self.position,
            direction: self.direction,
            spawn_point: self.spawn_point,
            known_character_position: self.known_character_position,
            open_directions: open_directions(&self.obstacles, self.position),
        }
    }

    /// Let the behavior look around, then, on a move tick, ask it for a step
    /// and take it if the target cell is open.
    pub fn update(&mut self, snapshot: &ThreatSnapshot, rng: &mut StdRng) {
        let state = self.state();
        self.behavior.observe(&state, snapshot);

        self.ticks_since_last_move += 1;
        if self.ticks_since_last_move < move_interval(snapshot.tick) {
            return;
        }
        self.ticks_since_last_move = 0;

        let Some(direction) = self.behavior.next_move(&state, snapshot, rng) else {
            return;
        };
        let next = self.position.step(direction);
        if self.obstacles.is_obstacle(next) {
            tracing::debug!(threat = %self.id, ?direction, "Threat move blocked");
            return;
        }
        self.position = next;
        self.direction = direction;
    }

    pub fn to_view(&self) -> ThreatView {
        ThreatView {
            id: self.id.clone(),
            position: self.position,
            direction: self.direction,
            personality: PERSONALITY.to_string(),
            style: self.style(),
        }
    }
}

/// Directions from `position` that lead onto a non-obstacle cell.
pub fn open_directions(obstacles: &ObstacleGrid, position: Position) -> Vec<Direction> {
    Direction::ALL
        .into_iter()
        .filter(|d| !obstacles.is_obstacle(position.step(*d)))
        .collect()
}

/// Build the threat described by `spec`.
pub fn create_threat(
    index: usize,
    spec: &ThreatSpec,
    pathfinder: &Arc<PathfindingGrid>,
    obstacles: &Arc<ObstacleGrid>,
    rng: &mut StdRng,
) -> Threat {
    let behavior: Box<dyn ThreatBehavior> = match spec.style {
        ThreatStyle::Surveillance => Box::new(Surveillance::new(
            Arc::clone(pathfinder),
            Arc::clone(obstacles),
        )),
        ThreatStyle::Girouette => Box::new(Girouette),
        ThreatStyle::StraightAhead => Box::new(StraightAhead),
        ThreatStyle::Aggressive => Box::new(Aggressive::new(Arc::clone(pathfinder))),
        ThreatStyle::Ghost => Box::new(Ghost),
    };
    Threat::new(
        format!("threat-{index}"),
        spec.position,
        Arc::clone(obstacles),
        behavior,
        rng,
    )
}

/// Uniform pick among the open directions, `None` when boxed in.
pub(crate) fn random_open_direction(state: &ThreatState, rng: &mut StdRng) -> Option<Direction> {
    if state.open_directions.is_empty() {
        return None;
    }
    Some(state.open_directions[rng.random_range(0..state.open_directions.len())])
}

/// Step along the shortest path from `from` to `to`.
pub(crate) fn step_toward(
    pathfinder: &PathfindingGrid,
    from: Position,
    to: Position,
) -> Option<Direction> {
    use crate::pathfinding::Pathfinder;

    match pathfinder.get_path(from, to) {
        Some(path) if path.len() >= 2 => Direction::toward(from, path[1]),
        _ => None,
    }
}

use std::sync::Arc;

use rand::rngs::StdRng;

use evade_core::action::{Action, ActionError};
use evade_core::geometry::{Position, Vector};
use evade_core::map::{Map, MapError};
use evade_core::options::GameOptions;
use evade_core::team::{Team, TeamId};
use evade_core::views::{
    Constants, PlayerCharacterView, PlayerState, ThreatSnapshot, ThreatView, ViewerState,
};

use crate::character::Character;
use crate::pathfinding::{Pathfinder, PathfindingGrid};
use crate::threats::{Threat, create_threat};
use crate::tiles::{ObstacleGrid, Tiles};

/// The simulated level: static tiles, the character and the threats.
#[derive(Debug)]
pub struct World {
    map_name: String,
    tiles: Tiles,
    pathfinder: Arc<PathfindingGrid>,
    character: Option<Character>,
    threats: Vec<Threat>,
    tick_counter: u32,
    rng: StdRng,
}

impl World {
    /// Build the world for `map`. The character is only created when a team
    /// owns it.
    pub fn new(
        options: &GameOptions,
        map: &Map,
        team: Option<&Team>,
        mut rng: StdRng,
    ) -> Result<Self, MapError> {
        map.validate()?;
        let tiles = Tiles::create(map);
        let pathfinder = Arc::new(PathfindingGrid::from_matrix(&tiles.walkability_matrix()));
        let obstacles: Arc<ObstacleGrid> = Arc::new(tiles.obstacle_matrix());

        let character = team.map(|team| {
            Character::new(
                team.id.clone(),
                map.character_spawn,
                options.respawn_cooldown_ticks,
            )
        });
        let threats = map
            .threats
            .iter()
            .enumerate()
            .map(|(i, spec)| create_threat(i, spec, &pathfinder, &obstacles, &mut rng))
            .collect();

        tracing::info!(
            map = %map.name,
            width = map.width,
            height = map.height,
            threats = map.threats.len(),
            "World created"
        );

        Ok(Self {
            map_name: map.name.clone(),
            tiles,
            pathfinder,
            character,
            threats,
            tick_counter: 0,
            rng,
        })
    }

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn tiles(&self) -> &Tiles {
        &self.tiles
    }

    pub fn tick(&self) -> u32 {
        self.tick_counter
    }

    pub fn character(&self) -> Option<&Character> {
        self.character.as_ref()
    }

    pub fn threats(&self) -> &[Threat] {
        &self.threats
    }

    fn is_walkable(&self, pos: Position) -> bool {
        self.pathfinder.is_walkable(pos)
    }

    fn contains(&self, pos: Position) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && (pos.x as u32) < self.tiles.width()
            && (pos.y as u32) < self.tiles.height()
    }

    /// Apply one decoded action on behalf of `team_id`.
    pub fn apply_action(&mut self, team_id: &TeamId, action: Action) -> Result<(), ActionError> {
        let owns_character = self
            .character
            .as_ref()
            .is_some_and(|c| c.team_id() == team_id);
        if !owns_character {
            return Err(ActionError::NotCharacterOwner);
        }

        if let Some(direction) = action.direction() {
            return self.move_character(direction.vector());
        }

        let Action::MoveTo { position: target } = action else {
            return Ok(());
        };
        if !self.contains(target) {
            return Err(ActionError::TargetOutOfBounds(target));
        }
        let Some(from) = self.character.as_ref().map(Character::position) else {
            return Ok(());
        };
        match self.pathfinder.get_path(from, target) {
            Some(path) if path.len() >= 2 => self.move_character(path[1].subtract(from)),
            _ => {
                tracing::debug!(?from, ?target, "No path for MOVE_TO, ignoring");
                Ok(())
            },
        }
    }

    /// Move the character by `vector` if the destination is walkable.
    /// Blocked moves are silently ignored. Every valid move commits, so a
    /// command may chain several steps in one tick.
    pub fn move_character(&mut self, vector: Vector) -> Result<(), ActionError> {
        let Some(character) = self.character.as_ref() else {
            return Ok(());
        };
        if !character.is_alive() {
            return Ok(());
        }
        let candidate = character.position().add(vector);
        if !self.is_walkable(candidate) {
            tracing::debug!(?candidate, "Character move blocked");
            return Ok(());
        }
        if let Some(character) = self.character.as_mut() {
            character.move_to(candidate, vector);
        }
        Ok(())
    }

    /// Advance one step: character bookkeeping, then every threat in order,
    /// each seeing the moves of the threats before it.
    pub fn update(&mut self) {
        if let Some(character) = self.character.as_mut() {
            character.update();
        }

        for i in 0..self.threats.len() {
            let snapshot = self.serialize_for_threat();
            self.threats[i].update(&snapshot, &mut self.rng);
        }

        let character_position = self.character.as_ref().map(Character::position);
        for threat in &mut self.threats {
            threat.set_character_position(character_position);
        }

        self.tick_counter += 1;
    }

    /// True when a threat stands on the character's cell.
    pub fn is_character_caught(&self) -> bool {
        let Some(character) = self.character.as_ref() else {
            return false;
        };
        self.threats
            .iter()
            .any(|t| t.position() == character.position())
    }

    pub fn catch_character(&mut self) {
        if let Some(character) = self.character.as_mut() {
            character.kill();
        }
    }

    fn threat_views(&self) -> Vec<ThreatView> {
        self.threats.iter().map(Threat::to_view).collect()
    }

    pub fn serialize_for_viewer(&self) -> ViewerState {
        ViewerState {
            constants: Constants::default(),
            current_tick_number: self.tick_counter,
            tick: self.tick_counter,
            map_name: self.map_name.replace('-', "_"),
            map: self.tiles.to_view(),
            threats: self.threat_views(),
            character: self.character.as_ref().map(Character::to_view),
        }
    }

    /// View for one team. `your_character` is only filled in for the owner.
    pub fn serialize_for_team(&self, team_id: &TeamId, last_tick_errors: Vec<String>) -> PlayerState {
        let your_character = self
            .character
            .as_ref()
            .filter(|c| c.team_id() == team_id)
            .map(|c| PlayerCharacterView {
                character: c.to_view(),
                distances: self.pathfinder.get_distances(c.position()),
            });
        PlayerState {
            constants: Constants::default(),
            current_tick_number: self.tick_counter,
            tick: self.tick_counter,
            map: self.tiles.to_view(),
            threats: self.threat_views(),
            your_character,
            last_tick_errors,
        }
    }

    pub fn serialize_for_threat(&self) -> ThreatSnapshot {
        ThreatSnapshot {
            constants: Constants::default(),
            current_tick_number: self.tick_counter,
            tick: self.tick_counter,
            map: self.tiles.to_view(),
            threats: self.threat_views(),
            character: self.character.as_ref().map(Character::to_view),
        }
    }
}

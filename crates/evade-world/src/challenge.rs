use std::collections::{BTreeMap, HashMap};

use rand::SeedableRng;
use rand::rngs::StdRng;

use evade_core::action::{ActionError, Command};
use evade_core::map::MapError;
use evade_core::options::GameOptions;
use evade_core::team::{Team, TeamId};
use evade_core::tick::{GameResults, TeamResult, TickErrors, TickResult};
use evade_core::views::{PlayerState, ViewerState};

use crate::maps::MapLoader;
use crate::world::World;

/// Points awarded per survived tick.
pub const SCORE_PER_TICK: u64 = 5;

/// Failure that stops the match.
#[derive(Debug)]
pub enum EngineError {
    NoTeamRegistered,
    StartTimeout { expected: usize, registered: usize },
    Map(MapError),
    NotSetUp,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoTeamRegistered => write!(f, "no team registered to control the character"),
            Self::StartTimeout {
                expected,
                registered,
            } => write!(
                f,
                "timed out waiting for teams ({registered}/{expected} registered)"
            ),
            Self::Map(e) => write!(f, "{e}"),
            Self::NotSetUp => write!(f, "match is not set up"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<MapError> for EngineError {
    fn from(e: MapError) -> Self {
        Self::Map(e)
    }
}

/// Synchronous state of one match: registered teams, the world, the tick
/// number and the per-team error store.
#[derive(Debug)]
pub struct Challenge {
    options: GameOptions,
    maps: MapLoader,
    teams: Vec<Team>,
    world: Option<World>,
    current_tick: u32,
    pending_errors: TickErrors,
    last_tick_errors: TickErrors,
}

impl Challenge {
    pub fn new(options: GameOptions, maps: MapLoader) -> Self {
        Self {
            options,
            maps,
            teams: Vec::new(),
            world: None,
            current_tick: 1,
            pending_errors: TickErrors::new(),
            last_tick_errors: TickErrors::new(),
        }
    }

    pub fn options(&self) -> &GameOptions {
        &self.options
    }

    /// Register a team. The first team registered controls the character;
    /// later teams only receive views.
    pub fn register_team(&mut self, team: Team) {
        tracing::info!(
            team_id = %team.id,
            team_name = %team.external_name,
            owner = self.teams.is_empty(),
            "Team registered"
        );
        self.teams.push(team);
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// The team controlling the character.
    pub fn owner(&self) -> Option<&Team> {
        self.teams.first()
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn is_set_up(&self) -> bool {
        self.world.is_some()
    }

    /// Resolve the map and build the world. Idempotent.
    pub fn setup(&mut self) -> Result<(), EngineError> {
        if self.world.is_some() {
            return Ok(());
        }
        let Some(owner) = self.teams.first() else {
            return Err(EngineError::NoTeamRegistered);
        };
        let mut rng = StdRng::seed_from_u64(self.options.random_seed);
        let map = self.maps.load(
            self.options.map_name.as_deref(),
            self.options.map_difficulty,
            &mut rng,
        )?;
        let world = World::new(&self.options, &map, Some(owner), rng)?;
        tracing::info!(
            map = %map.name,
            seed = self.options.random_seed,
            tick_limit = self.options.tick_limit,
            "Match set up"
        );
        self.world = Some(world);
        Ok(())
    }

    pub fn current_tick(&self) -> u32 {
        self.current_tick
    }

    pub fn set_current_tick(&mut self, tick: u32) {
        self.current_tick = tick;
    }

    /// Checked at the start of a tick, before commands: a threat on the
    /// character's cell, or the tick budget exhausted.
    pub fn is_game_complete(&mut self) -> bool {
        if let Some(world) = self.world.as_mut()
            && world.is_character_caught()
        {
            tracing::info!(tick = self.current_tick, "Character caught");
            world.catch_character();
            return true;
        }
        self.current_tick > self.options.tick_limit
    }

    /// Decode and apply every team's command. Problems are recorded per team
    /// and never abort the tick.
    pub fn apply_commands(&mut self, commands: HashMap<TeamId, Command>) -> Result<(), EngineError> {
        let world = self.world.as_mut().ok_or(EngineError::NotSetUp)?;
        let ordered: BTreeMap<TeamId, Command> = commands.into_iter().collect();

        for (team_id, command) in ordered {
            if !self.teams.iter().any(|t| t.id == team_id) {
                tracing::warn!(team_id = %team_id, "Command from unregistered team ignored");
                continue;
            }
            let decoded = match command.decode() {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!(team_id = %team_id, error = %e, "Command rejected");
                    record_error(&mut self.pending_errors, &team_id, &e);
                    continue;
                },
            };
            for (raw, action) in decoded {
                if let Err(e) = action.and_then(|a| world.apply_action(&team_id, a)) {
                    tracing::warn!(team_id = %team_id, action = %raw, error = %e, "Action rejected");
                    record_error(&mut self.pending_errors, &team_id, &e);
                }
            }
        }
        Ok(())
    }

    /// Step the world and close the tick: snapshot the error store for the
    /// result and for next tick's player views, then clear it.
    pub fn advance(&mut self) -> Result<TickResult, EngineError> {
        let world = self.world.as_mut().ok_or(EngineError::NotSetUp)?;
        world.update();
        let game_state = Box::new(world.serialize_for_viewer());
        let errors_per_team = std::mem::take(&mut self.pending_errors);
        self.last_tick_errors = errors_per_team.clone();
        Ok(TickResult::InProgress {
            game_state,
            errors_per_team,
        })
    }

    pub fn score(&self) -> u64 {
        u64::from(self.current_tick) * SCORE_PER_TICK
    }

    pub fn game_results(&self) -> GameResults {
        let (team_id, team_name) = self
            .owner()
            .map(|t| (t.external_id.clone(), t.external_name.clone()))
            .unwrap_or_default();
        GameResults {
            results: vec![TeamResult {
                rank: 1,
                score: self.score(),
                team_id,
                team_name,
            }],
        }
    }

    pub fn serialize_for_viewer(&self) -> Result<ViewerState, EngineError> {
        let world = self.world.as_ref().ok_or(EngineError::NotSetUp)?;
        Ok(world.serialize_for_viewer())
    }

    /// Player view for `team_id`, carrying that team's errors from the
    /// previous tick and nobody else's.
    pub fn serialize_for_team(&self, team_id: &TeamId) -> Result<PlayerState, EngineError> {
        let world = self.world.as_ref().ok_or(EngineError::NotSetUp)?;
        let errors = self
            .last_tick_errors
            .get(team_id)
            .cloned()
            .unwrap_or_default();
        Ok(world.serialize_for_team(team_id, errors))
    }
}

fn record_error(errors: &mut TickErrors, team_id: &TeamId, error: &ActionError) {
    errors
        .entry(team_id.clone())
        .or_default()
        .push(error.to_string());
}

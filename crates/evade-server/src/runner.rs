use std::path::Path;
use std::sync::atomic::Ordering;

use evade_core::options::GameOptions;
use evade_core::tick::{GameResults, TickResult};
use evade_world::{Challenge, EngineError, MapLoader};

use crate::engine::MatchEngine;
use crate::recorder::{MatchRecorder, SpectatorFeed, TickObserver};
use crate::state::AppState;

/// Play one full match: wait for the expected teams, run ticks until the
/// match completes, save the replay and hand results to the teams.
pub async fn run_match(state: &AppState, maps: &MapLoader) -> Result<GameResults, EngineError> {
    let config = &state.config;
    tracing::info!(
        expected = config.teams.expected,
        timeout_ms = config.timing.game_start_timeout_ms,
        "Waiting for teams"
    );
    let teams = state
        .hub
        .wait_for_teams(config.teams.expected, config.timing.game_start_timeout())
        .await?;

    let options = GameOptions::from_overrides(config.game.overrides());
    let mut challenge = Challenge::new(options.clone(), maps.clone());
    for team in &teams {
        challenge.register_team(team.clone());
    }
    let mut engine = MatchEngine::new(challenge, state.hub.clone(), config.timing.time_per_tick());
    engine.setup()?;

    let mut recorder = MatchRecorder::new(options, config.limits.max_recorded_ticks);
    let mut feed = SpectatorFeed::new(state.spectators.clone());
    let delay = config.timing.delay_between_ticks();

    let mut tick = 1;
    let results = loop {
        state.current_tick.store(tick, Ordering::Relaxed);
        let result = engine.play_one_tick(tick).await?;
        for observer in [&mut recorder as &mut dyn TickObserver, &mut feed] {
            observer.on_tick(tick, &result);
        }
        if let TickResult::Complete { game_results } = result {
            break game_results;
        }
        tick += 1;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    };

    if !config.record_path.is_empty()
        && let Err(e) = recorder.save_to_file(Path::new(&config.record_path))
    {
        tracing::error!(path = %config.record_path, error = %e, "Failed to save replay");
    }

    state.hub.finish(&results, &teams).await;
    state.matches_played.fetch_add(1, Ordering::Relaxed);
    Ok(results)
}

/// Play matches back to back while `keep_alive` is set.
pub async fn run(state: AppState, maps: MapLoader) -> Result<(), EngineError> {
    loop {
        let results = run_match(&state, &maps).await?;
        for r in &results.results {
            tracing::info!(
                rank = r.rank,
                score = r.score,
                team_id = %r.team_id,
                team_name = %r.team_name,
                "Match finished"
            );
        }
        if !state.config.keep_alive {
            return Ok(());
        }
    }
}

pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod recorder;
pub mod runner;
pub mod state;
pub mod ws;

use std::path::Path;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;

use evade_core::map::MapError;
use evade_world::MapLoader;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route(
            "/heartbeat",
            get(health::heartbeat).layer(CorsLayer::permissive()),
        )
        .fallback(error::not_found)
        .with_state(state.clone());

    (app, state)
}

/// Built-in maps plus every map file listed in the config.
pub fn load_maps(config: &ServerConfig) -> Result<MapLoader, MapError> {
    let mut maps = MapLoader::builtin()?;
    for file in &config.game.map_files {
        maps.load_file(Path::new(file))?;
    }
    Ok(maps)
}

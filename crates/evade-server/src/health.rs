use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: ConnectionInfo,
    #[serde(rename = "match")]
    pub match_info: MatchInfo,
}

#[derive(Serialize)]
pub struct ConnectionInfo {
    pub websocket: usize,
    pub teams: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    pub matches_played: u64,
    pub current_tick: u32,
}

/// Heartbeat: server status, connection counts and match progress.
pub async fn heartbeat(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        connections: ConnectionInfo {
            websocket: state.ws_connection_count.load(Ordering::Relaxed),
            teams: state.hub.connected().await,
        },
        match_info: MatchInfo {
            matches_played: state.matches_played.load(Ordering::Relaxed),
            current_tick: state.current_tick.load(Ordering::Relaxed),
        },
    })
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use tokio::sync::broadcast;

use crate::channel::TeamHub;
use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub hub: TeamHub,
    /// Encoded `VIEWER_TICK` messages for spectator connections.
    pub spectators: broadcast::Sender<String>,
    pub config: Arc<ServerConfig>,
    pub ws_connection_count: Arc<AtomicUsize>,
    pub matches_played: Arc<AtomicU64>,
    pub current_tick: Arc<AtomicU32>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let (spectators, _) = broadcast::channel(config.limits.spectator_buffer);
        Self {
            hub: TeamHub::new(),
            spectators,
            config: Arc::new(config),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
            matches_played: Arc::new(AtomicU64::new(0)),
            current_tick: Arc::new(AtomicU32::new(0)),
        }
    }
}

/// Counts a live connection for as long as it is held.
pub struct ConnectionGuard {
    count: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self { count }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_tracks_live_connections() {
        let count = Arc::new(AtomicUsize::new(0));
        let a = ConnectionGuard::new(Arc::clone(&count));
        let b = ConnectionGuard::new(Arc::clone(&count));
        assert_eq!(count.load(Ordering::Relaxed), 2);
        drop(a);
        assert_eq!(count.load(Ordering::Relaxed), 1);
        drop(b);
        assert_eq!(count.load(Ordering::Relaxed), 0);
    }
}

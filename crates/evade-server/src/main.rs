use tracing_subscriber::EnvFilter;

use evade_server::config::ServerConfig;
use evade_server::{build_app, load_maps, runner};

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("EVADE_LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = ServerConfig::load();
    config.validate();

    let maps = match load_maps(&config) {
        Ok(maps) => maps,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load maps");
            std::process::exit(1);
        },
    };
    tracing::info!(maps = ?maps.names().collect::<Vec<_>>(), "Maps loaded");

    let addr = config.listen_addr.clone();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            std::process::exit(1);
        },
    };

    let (app, state) = build_app(config);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Server error");
        }
    });
    tracing::info!(%addr, "Evade server listening");

    if let Err(e) = runner::run(state, maps).await {
        tracing::error!(error = %e, "Match aborted");
        std::process::exit(1);
    }
    tracing::info!("Evade server stopped");
}

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

mod api;
mod config;

use api::{app_router, AppState};
use config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = ServerConfig::path_from_env();
    let config = ServerConfig::load_or_default(&path)
        .with_context(|| format!("loading {}", path.display()))?;
    init_tracing(&config.log_filter);
    if !path.exists() {
        warn!(path = %path.display(), "config file not found, using defaults");
    }

    let state = AppState::new(config.session.clone(), config.idle_ttl());
    state.spawn_sweeper(config.sweep_interval());
    let app = app_router(state, &config.static_dir);

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(
        depth = config.session.search.depth,
        idle_ttl_secs = config.idle_ttl_secs,
        "Listening on http://{}", config.bind
    );
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(filter: &str) {
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

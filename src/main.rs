use tracing_subscriber::EnvFilter;

use daytrip_api::api::{create_router, AppState};
use daytrip_api::config::Config;
use daytrip_api::services::session_history::SWEEP_INTERVAL;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daytrip_api=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    let state = AppState::new(config);
    state.history.spawn_sweeper(SWEEP_INTERVAL);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}

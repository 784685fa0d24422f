use anyhow::Context;
use fresh_api::{app, AppState};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fresh_api=debug,fresh_engine=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = fresh_store::Config::load().context("Failed to load config")?;
    tracing::info!("Starting pricing service on port {}", config.server.port);

    let state = AppState::new(&config);

    // may train a model, keep it off the runtime threads
    let lifecycle = state.lifecycle.clone();
    let status = tokio::task::spawn_blocking(move || lifecycle.initialize()).await?;
    tracing::info!("Model status at startup: {:?}", status);

    let app = app(state, &config.server.allowed_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

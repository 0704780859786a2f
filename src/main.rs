//! Capital Quiz 게임 서버

use anyhow::Context;
use capital_quiz::questions::CapitalsProvider;
use capital_quiz::{server, AppState, Config};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let provider = CapitalsProvider::load(&config.capitals_file)
        .with_context(|| format!("failed to load capitals from {}", config.capitals_file))?;
    anyhow::ensure!(
        provider.len() >= config.game.options_per_question,
        "dataset has {} countries, need at least {}",
        provider.len(),
        config.game.options_per_question
    );

    let state = Arc::new(AppState::new(config.clone(), Arc::new(provider)));
    let app = server::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("🚀 Capital Quiz Server started");
    tracing::info!("Address: {}", addr);
    tracing::info!("Create game: POST http://{}/game", addr);
    tracing::info!("WebSocket: ws://{}/ws", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

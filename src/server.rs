//! HTTP 라우터 구성

use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::State,
    http::HeaderValue,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// 라우터 설정
pub fn router(state: Arc<AppState>) -> Router {
    // CORS 설정
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/game", post(handlers::handle_create_game))
        .route("/ws", get(handlers::handle_join))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index_handler() -> Html<&'static str> {
    Html("<h1>Capital Quiz Server</h1><p>Create a game: POST /game · Join: GET /ws</p>")
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    Json(serde_json::json!({
        "status": "ok",
        "server": "capital-quiz-rs",
        "rooms": state.registry.room_count(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "timestamp": timestamp
    }))
}

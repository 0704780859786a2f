//! 방 생성 핸들러

use crate::error::GameError;
use crate::protocol::RoomId;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 방 생성 요청
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGameRequest {
    #[serde(default)]
    pub players: Vec<String>,
    #[serde(default)]
    pub rounds: i64,
}

/// 방 생성 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGameResponse {
    #[serde(rename = "gameID")]
    pub game_id: RoomId,
}

/// POST /game
pub async fn handle_create_game(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateGameRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateGameResponse>), GameError> {
    // 본문 파싱 실패도 다른 검증 오류와 같은 400 JSON으로 응답
    let Json(request) = body.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Malformed create game body");
        GameError::InvalidRequest(rejection.body_text())
    })?;

    let game_id = state
        .registry
        .create_room(request.players, request.rounds)
        .inspect_err(|e| tracing::warn!(error = %e, "Rejected create game request"))?;

    Ok((StatusCode::CREATED, Json(CreateGameResponse { game_id })))
}

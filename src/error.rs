//! 에러 타입 정의

use crate::protocol::RoomId;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

/// 방 생성/참여/진행 중 발생하는 에러
#[derive(Debug, Clone, thiserror::Error)]
pub enum GameError {
    /// 잘못된 방 생성 요청
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// 플레이어-방 배정이 일치하지 않음
    #[error("player {player_id} is not assigned to room {room_id}")]
    NotFound { player_id: String, room_id: RoomId },

    /// 이미 인원이 찼거나 진행 중인 방
    #[error("room {0} is not accepting players")]
    RoomFull(RoomId),

    #[error("player {0} already joined")]
    AlreadyJoined(String),

    /// 읽기/쓰기 실패 (연결 끊김과 동일하게 취급)
    #[error("transport error: {0}")]
    Transport(String),

    /// 문제 데이터셋 오류
    #[error("dataset error: {0}")]
    Dataset(String),
}

impl GameError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::RoomFull(_) | Self::AlreadyJoined(_) => StatusCode::CONFLICT,
            Self::Transport(_) | Self::Dataset(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GameError>;

//! 연결 핸들러: 배정 확인 후 WebSocket 업그레이드 및 입장

use crate::error::GameError;
use crate::game::Connection;
use crate::protocol::RoomId;
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{future, SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;

/// 입장 파라미터 (헤더가 없을 때 쿼리스트링 사용)
#[derive(Debug, Default, Deserialize)]
pub struct JoinParams {
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
    #[serde(rename = "gameID")]
    pub game_id: Option<String>,
}

/// GET /ws
pub async fn handle_join(
    ws: Option<WebSocketUpgrade>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<JoinParams>,
) -> Response {
    let player_id = header_or(&headers, "userid", params.user_id).unwrap_or_default();
    let room_id = header_or(&headers, "gameid", params.game_id)
        .and_then(|raw| raw.parse::<RoomId>().ok())
        .unwrap_or(RoomId(0));

    let room = match state.registry.check_assignment(&player_id, room_id) {
        Ok(room) => room,
        Err(e) => {
            tracing::warn!(player_id = %player_id, room_id = %room_id, "Rejected join attempt");
            return e.into_response();
        }
    };
    if !room.is_accepting().await {
        tracing::warn!(player_id = %player_id, room_id = %room_id, "Room full, rejected join");
        return GameError::RoomFull(room_id).into_response();
    }

    let Some(ws) = ws else {
        return (StatusCode::UPGRADE_REQUIRED, "WebSocket upgrade required").into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, player_id, room_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, player_id: String, room_id: RoomId) {
    match state
        .registry
        .admit(&player_id, room_id, into_connection(socket))
        .await
    {
        Ok(_) => {
            tracing::info!(player_id = %player_id, room_id = %room_id, "New connection established");
        }
        Err(e) => {
            // 세션이 드롭되면서 연결도 닫힘
            tracing::warn!(
                player_id = %player_id,
                room_id = %room_id,
                error = %e,
                "Connection rejected after upgrade"
            );
        }
    }
}

fn header_or(headers: &HeaderMap, name: &str, fallback: Option<String>) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .or(fallback)
}

/// axum WebSocket을 텍스트 프레임 sink/stream으로 변환
pub fn into_connection(socket: WebSocket) -> Connection {
    let (sink, stream) = socket.split();

    let sink = sink
        .sink_map_err(GameError::transport)
        .with(|text: String| future::ready(Ok::<_, GameError>(Message::Text(text))));

    let stream = stream.filter_map(|frame| {
        future::ready(match frame {
            Ok(Message::Text(text)) => Some(Ok(text)),
            Ok(Message::Binary(bytes)) => Some(Ok(String::from_utf8_lossy(&bytes).into_owned())),
            Ok(Message::Close(_)) => Some(Err(GameError::Transport(
                "connection closed by peer".to_string(),
            ))),
            Ok(_) => None,
            Err(e) => Some(Err(GameError::transport(e))),
        })
    });

    Connection::new(sink, stream)
}

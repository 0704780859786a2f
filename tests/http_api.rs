//! HTTP 엔드포인트: 방 생성, 참여 사전 검사, 헬스 체크

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use capital_quiz::protocol::RoomId;
use capital_quiz::{server, AppState, Config};
use common::ScriptedQuestions;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> (Router, Arc<AppState>) {
    let config = Config {
        port: 0,
        host: "127.0.0.1".into(),
        cors_origins: vec![],
        capitals_file: String::new(),
        game: common::config(),
        log_level: "info".into(),
    };
    let state = Arc::new(AppState::new(config, Arc::new(ScriptedQuestions::default())));
    (server::router(state.clone()), state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn create_game(body: Value) -> Request<Body> {
    Request::post("/game")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn create_game_returns_room_id() {
    let (app, state) = app();

    let (status, body) = send(&app, create_game(json!({ "players": ["a", "b"], "rounds": 3 }))).await;

    assert_eq!(status, StatusCode::CREATED);
    let id = body["gameID"].as_u64().expect("numeric gameID") as u32;
    let room = state.registry.room(RoomId(id)).expect("room registered");
    assert_eq!(room.capacity(), 2);
    assert_eq!(room.rounds(), 3);
}

#[tokio::test]
async fn create_game_validates_input() {
    let (app, state) = app();

    for body in [
        json!({ "players": [], "rounds": 3 }),
        json!({ "players": ["a"], "rounds": 0 }),
        json!({ "players": ["a"], "rounds": -1 }),
        json!({ "players": ["a", "a"], "rounds": 1 }),
    ] {
        let (status, body) = send(&app, create_game(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("invalid request"));
    }
    assert_eq!(state.registry.room_count(), 0);
}

#[tokio::test]
async fn malformed_create_body_is_a_json_bad_request() {
    let (app, state) = app();

    let (status, body) = send(&app, create_game(json!({ "players": ["a"], "rounds": "3" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid request"));

    let request = Request::post("/game")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    assert_eq!(state.registry.room_count(), 0);
}

#[tokio::test]
async fn join_with_unknown_pairing_is_not_found() {
    let (app, state) = app();
    let room_id = state.registry.create_room(vec!["alice".into()], 1).unwrap();

    let uri = format!("/ws?userID=mallory&gameID={room_id}");
    let (status, _) = send(&app, Request::get(uri).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::get("/ws")
        .header("userID", "alice")
        .header("gameID", "not-a-number")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let room = state.registry.room(room_id).unwrap();
    assert_eq!(room.joined_count().await, 0);
}

#[tokio::test]
async fn join_without_upgrade_is_refused_after_pairing_check() {
    let (app, state) = app();
    let room_id = state.registry.create_room(vec!["alice".into()], 1).unwrap();

    let request = Request::get("/ws")
        .header("userID", "alice")
        .header("gameID", room_id.to_string())
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UPGRADE_REQUIRED);
}

#[tokio::test]
async fn health_reports_live_rooms() {
    let (app, state) = app();
    state.registry.create_room(vec!["alice".into()], 1).unwrap();

    let (status, body) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rooms"], 1);
}

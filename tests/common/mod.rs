//! 통합 테스트 공용 도우미: 메모리 연결과 고정 문제 공급자

#![allow(dead_code)]

use capital_quiz::game::{Connection, Registry};
use capital_quiz::protocol::{Question, ServerMessage};
use capital_quiz::questions::QuestionProvider;
use capital_quiz::{GameConfig, GameError, Result};
use futures::channel::mpsc;
use futures::{Sink, SinkExt, StreamExt};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

pub const RIGHT: &str = "Paris";
pub const WRONG: &str = "Lima";

/// 매 라운드 프랑스 수도 문제 (id는 q-1, q-2, ...)
#[derive(Default)]
pub struct ScriptedQuestions {
    drawn: AtomicUsize,
}

impl ScriptedQuestions {
    pub fn drawn(&self) -> usize {
        self.drawn.load(Ordering::SeqCst)
    }
}

impl QuestionProvider for ScriptedQuestions {
    fn next(&self, _options: usize) -> Result<(Question, String)> {
        let n = self.drawn.fetch_add(1, Ordering::SeqCst) + 1;
        let question = Question {
            id: format!("q-{n}"),
            country: "France".into(),
            options: vec![RIGHT.into(), WRONG.into()],
        };
        Ok((question, RIGHT.into()))
    }
}

pub fn config() -> GameConfig {
    GameConfig {
        question_timeout_ms: 10_000,
        round_delay_ms: 1_000,
        options_per_question: 2,
        join_timeout_ms: 60_000,
        inbound_buffer: 4,
    }
}

pub fn registry() -> (Arc<Registry>, Arc<ScriptedQuestions>) {
    let questions = Arc::new(ScriptedQuestions::default());
    (Registry::new(config(), questions.clone()), questions)
}

pub fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// 메모리 연결의 클라이언트 쪽
pub struct TestClient {
    frames: mpsc::UnboundedReceiver<String>,
    input: mpsc::UnboundedSender<Result<String>>,
}

pub fn connection() -> (Connection, TestClient) {
    let (out_tx, out_rx) = mpsc::unbounded::<String>();
    let (in_tx, in_rx) = mpsc::unbounded::<Result<String>>();
    let sink = out_tx.sink_map_err(GameError::transport);
    (
        Connection::new(sink, in_rx),
        TestClient {
            frames: out_rx,
            input: in_tx,
        },
    )
}

/// 서버 프레임을 `frames`개까지만 받고 이후 송신은 모두 실패하는 연결
pub fn connection_accepting(frames: usize) -> (Connection, TestClient) {
    let (out_tx, out_rx) = mpsc::unbounded::<String>();
    let (in_tx, in_rx) = mpsc::unbounded::<Result<String>>();
    let sink = LimitedSink {
        tx: out_tx,
        left: frames,
    };
    (
        Connection::new(sink, in_rx),
        TestClient {
            frames: out_rx,
            input: in_tx,
        },
    )
}

struct LimitedSink {
    tx: mpsc::UnboundedSender<String>,
    left: usize,
}

impl Sink<String> for LimitedSink {
    type Error = GameError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(mut self: Pin<&mut Self>, frame: String) -> Result<()> {
        if self.left == 0 {
            return Err(GameError::Transport("connection reset".into()));
        }
        self.left -= 1;
        self.tx.unbounded_send(frame).map_err(GameError::transport)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.tx.close_channel();
        Poll::Ready(Ok(()))
    }
}

impl TestClient {
    /// 다음 서버 프레임 (서버가 연결을 닫으면 `None`)
    pub async fn next(&mut self) -> Option<ServerMessage> {
        let frame = tokio::time::timeout(Duration::from_secs(600), self.frames.next())
            .await
            .expect("timed out waiting for a server frame")?;
        Some(serde_json::from_str(&frame).expect("server sent an undecodable frame"))
    }

    pub async fn expect(&mut self) -> ServerMessage {
        self.next().await.expect("connection closed unexpectedly")
    }

    pub async fn expect_question(&mut self) -> Question {
        match self.expect().await {
            ServerMessage::Question(q) => q,
            other => panic!("expected question, got {other:?}"),
        }
    }

    pub fn answer(&self, question_id: &str, option: &str) {
        self.raw(
            json!({
                "type": "answer",
                "content": { "id": question_id, "chosenOption": option }
            })
            .to_string(),
        );
    }

    pub fn raw(&self, frame: String) {
        let _ = self.input.unbounded_send(Ok(frame));
    }

    /// 수신 측 소켓 끊김 흉내
    pub fn fail(&self) {
        let _ = self
            .input
            .unbounded_send(Err(GameError::Transport("connection reset".into())));
    }

    /// 서버 프레임 수신 중단 (다음 송신부터 실패)
    pub fn stop_reading(&mut self) {
        self.frames.close();
        while let Ok(Some(_)) = self.frames.try_next() {}
    }

    /// 서버가 연결을 닫을 때까지 남은 프레임 수집
    pub async fn drain(&mut self) -> Vec<ServerMessage> {
        let mut rest = Vec::new();
        while let Some(msg) = self.next().await {
            rest.push(msg);
        }
        rest
    }
}

/// 모든 문제에 `delay` 후 `option`으로 답하고, 연결이 닫힐 때까지 받은
/// 프레임 전체를 기록
pub fn play_along(
    mut client: TestClient,
    delay: Duration,
    option: &'static str,
) -> tokio::task::JoinHandle<Vec<ServerMessage>> {
    tokio::spawn(async move {
        let mut transcript = Vec::new();
        while let Some(msg) = client.next().await {
            if let ServerMessage::Question(q) = &msg {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                client.answer(&q.id, option);
            }
            transcript.push(msg);
        }
        transcript
    })
}

pub fn count<F: Fn(&ServerMessage) -> bool>(transcript: &[ServerMessage], pred: F) -> usize {
    transcript.iter().filter(|m| pred(m)).count()
}

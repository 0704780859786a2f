//! 플레이어 세션: 연결 하나에 대한 수신 루프와 송신 경로

use crate::error::{GameError, Result};
use crate::protocol::{ClientMessage, ServerMessage};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::pin::Pin;
use tokio::sync::{mpsc, watch, Mutex, MutexGuard};
use tokio::task::JoinHandle;

/// 텍스트 프레임 송신부
pub type FrameSink = Pin<Box<dyn Sink<String, Error = GameError> + Send>>;
/// 텍스트 프레임 수신부 (`None`은 연결 종료)
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// 전송 계층 핸들
///
/// 게임 엔진은 WebSocket을 직접 알지 못하고 프레임 단위 sink/stream만 다룹니다.
pub struct Connection {
    sink: FrameSink,
    stream: FrameStream,
}

impl Connection {
    pub fn new<S, R>(sink: S, stream: R) -> Self
    where
        S: Sink<String, Error = GameError> + Send + 'static,
        R: Stream<Item = Result<String>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }
}

/// 수신 큐 항목
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message(ClientMessage),
    /// 디코딩 실패한 프레임
    Malformed(String),
}

pub type InboundItem = Result<Inbound>;

/// 플레이어 세션
pub struct PlayerSession {
    id: String,
    sink: Mutex<FrameSink>,
    /// 수신 루프 시작 전까지 보관
    reader: Mutex<Option<(FrameStream, mpsc::Sender<InboundItem>)>>,
    inbound: Mutex<mpsc::Receiver<InboundItem>>,
    stop: watch::Sender<bool>,
}

impl PlayerSession {
    pub fn new(id: impl Into<String>, connection: Connection, buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let (stop, _) = watch::channel(false);

        Self {
            id: id.into(),
            sink: Mutex::new(connection.sink),
            reader: Mutex::new(Some((connection.stream, tx))),
            inbound: Mutex::new(rx),
            stop,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// 수신 루프 시작 (세션당 한 번만 동작)
    ///
    /// 연결 오류나 종료를 만나면 큐에 넣기 전에 `on_disconnect`를 호출합니다.
    /// 답변 대기가 없는 동안 끊겨도 방이 다음 라운드 경계에서 알 수 있습니다.
    pub async fn start_reading<F>(&self, on_disconnect: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        let (mut stream, tx) = self.reader.lock().await.take()?;
        let mut stop = self.stop.subscribe();
        let player_id = self.id.clone();
        let mut on_disconnect = Some(on_disconnect);

        Some(tokio::spawn(async move {
            tracing::debug!(player_id = %player_id, "Read loop started");

            loop {
                if *stop.borrow() {
                    break;
                }

                let item = tokio::select! {
                    biased;
                    _ = stop.changed() => break,
                    frame = stream.next() => match frame {
                        Some(Ok(text)) => Ok(decode(&text)),
                        Some(Err(e)) => Err(e),
                        None => Err(GameError::Transport("connection closed".to_string())),
                    },
                };

                let terminal = item.is_err();
                if let Err(e) = &item {
                    tracing::info!(player_id = %player_id, error = %e, "Read loop hit transport error");
                    if let Some(notify) = on_disconnect.take() {
                        notify();
                    }
                }

                tokio::select! {
                    biased;
                    _ = stop.changed() => break,
                    sent = tx.send(item) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }

                if terminal {
                    break;
                }
            }

            tracing::debug!(player_id = %player_id, "Read loop stopped");
        }))
    }

    /// 메시지 하나를 직렬화해 전송 (동시 호출은 순차 처리)
    pub async fn send(&self, message: &ServerMessage) -> Result<()> {
        let text = serde_json::to_string(message).map_err(GameError::transport)?;
        let mut sink = self.sink.lock().await;
        sink.send(text).await
    }

    /// 수신 루프 정지 요청 (멱등)
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// 수신 큐 독점 접근 (라운드당 답변 대기 하나)
    pub async fn inbound(&self) -> MutexGuard<'_, mpsc::Receiver<InboundItem>> {
        self.inbound.lock().await
    }

    /// 연결 종료
    pub async fn close(&self) {
        self.stop();
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.close().await {
            tracing::debug!(player_id = %self.id, error = %e, "Error when closing connection");
        }
    }
}

fn decode(text: &str) -> Inbound {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => Inbound::Message(msg),
        Err(e) => Inbound::Malformed(e.to_string()),
    }
}

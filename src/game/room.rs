//! 방(게임) 상태 머신과 라운드 진행

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::game::latch::CountdownLatch;
use crate::game::player::{Inbound, PlayerSession};
use crate::game::registry::Registry;
use crate::protocol::{
    ClientMessage, GameOver, Leaderboard, Question, RoomId, ServerMessage, Status,
};
use crate::questions::QuestionProvider;
use dashmap::DashMap;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};

/// 라운드 최대 점수
pub const MAX_ROUND_SCORE: u32 = 100;

/// 방 상태 (한 방향으로만 전이)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Forming,
    Running,
    Finalizing,
    Closed,
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoomState::Forming => "forming",
            RoomState::Running => "running",
            RoomState::Finalizing => "finalizing",
            RoomState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// 플레이어 한 명의 라운드 답변 대기 결과
#[derive(Debug)]
enum AnswerOutcome {
    Answered { choice: String, elapsed: Duration },
    TimedOut,
    Disconnected(GameError),
}

/// 정답 제출 시점에 따른 라운드 점수: `round(100 × (1 − elapsed/ttl))`, 0 이상
pub fn round_score(elapsed: Duration, ttl: Duration) -> u32 {
    if ttl.is_zero() {
        return 0;
    }
    let fraction = elapsed.as_secs_f64() / ttl.as_secs_f64();
    let score = (f64::from(MAX_ROUND_SCORE) * (1.0 - fraction)).round();
    score.clamp(0.0, f64::from(MAX_ROUND_SCORE)) as u32
}

/// 방 정보
pub struct Room {
    id: RoomId,
    /// 배정된 플레이어 (참여 순서와 무관)
    expected: Vec<String>,
    rounds: u32,
    config: GameConfig,
    provider: Arc<dyn QuestionProvider>,
    registry: Weak<Registry>,
    state: RwLock<RoomState>,
    players: RwLock<Vec<Arc<PlayerSession>>>,
    scores: DashMap<String, u32>,
    /// 마지막으로 끝까지 진행된 라운드 기준 점수
    settled: RwLock<BTreeMap<String, u32>>,
    join_barrier: CountdownLatch,
    cancelled: AtomicBool,
    finalized: AtomicBool,
}

impl Room {
    pub fn new(
        id: RoomId,
        expected: Vec<String>,
        rounds: u32,
        config: GameConfig,
        provider: Arc<dyn QuestionProvider>,
        registry: Weak<Registry>,
    ) -> Self {
        let capacity = expected.len();
        Self {
            id,
            expected,
            rounds,
            config,
            provider,
            registry,
            state: RwLock::new(RoomState::Forming),
            players: RwLock::new(Vec::with_capacity(capacity)),
            scores: DashMap::new(),
            settled: RwLock::new(BTreeMap::new()),
            join_barrier: CountdownLatch::new(capacity),
            cancelled: AtomicBool::new(false),
            finalized: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.expected.len()
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn expected_players(&self) -> &[String] {
        &self.expected
    }

    pub async fn state(&self) -> RoomState {
        *self.state.read().await
    }

    pub async fn joined_count(&self) -> usize {
        self.players.read().await.len()
    }

    /// 아직 플레이어를 받을 수 있는지
    pub async fn is_accepting(&self) -> bool {
        *self.state.read().await == RoomState::Forming
            && self.players.read().await.len() < self.capacity()
    }

    /// 현재 누적 점수
    pub fn scores(&self) -> BTreeMap<String, u32> {
        self.scores
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// 취소 신호 (라운드 경계에서 확인)
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            tracing::info!(room_id = %self.id, "Room cancelled");
        }
    }

    /// 플레이어 추가 (Forming 상태에서만)
    pub async fn add_player(&self, session: Arc<PlayerSession>) -> Result<usize> {
        let joined = {
            let mut state = self.state.write().await;
            let mut players = self.players.write().await;

            if *state != RoomState::Forming || players.len() >= self.capacity() {
                return Err(GameError::RoomFull(self.id));
            }
            if players.iter().any(|p| p.id() == session.id()) {
                return Err(GameError::AlreadyJoined(session.id().to_string()));
            }

            self.scores.insert(session.id().to_string(), 0);
            players.push(session.clone());

            if players.len() == self.capacity() {
                *state = RoomState::Running;
            }
            players.len()
        };

        self.join_barrier.count_down();

        tracing::info!(
            room_id = %self.id,
            player_id = %session.id(),
            joined = joined,
            capacity = self.capacity(),
            "Player joined room"
        );
        Ok(joined)
    }

    /// 방 구동: 참여 대기 → 라운드 진행 → 종료
    pub async fn run(self: Arc<Self>) {
        let joined =
            tokio::time::timeout(self.config.join_timeout(), self.join_barrier.wait()).await;
        if joined.is_err() {
            tracing::warn!(
                room_id = %self.id,
                missing = self.join_barrier.remaining(),
                "Room did not fill in time"
            );
            self.cancel();
            self.finalize().await;
            return;
        }

        let players = self.players.read().await.clone();
        tracing::info!(room_id = %self.id, players = players.len(), "Starting game");

        for player in &players {
            let room = Arc::downgrade(&self);
            let player_id = player.id().to_string();
            player
                .start_reading(move || {
                    if let Some(room) = room.upgrade() {
                        tracing::warn!(room_id = %room.id, player_id = %player_id, "Player connection lost");
                        room.cancel();
                    }
                })
                .await;
        }

        let greeting = ServerMessage::Acknowledged("Let the games begin! 😈".to_string());
        if !self.broadcast(&players, &greeting).await {
            self.cancel();
        }

        self.play(&players).await;
    }

    /// 라운드 진행 후 종료 처리
    pub async fn play(self: &Arc<Self>, players: &[Arc<PlayerSession>]) {
        for round in 1..=self.rounds {
            if self.is_cancelled() {
                tracing::info!(room_id = %self.id, round = round, "Skipping remaining rounds");
                break;
            }

            let (question, answer) = match self.provider.next(self.config.options_per_question) {
                Ok(drawn) => drawn,
                Err(e) => {
                    tracing::error!(room_id = %self.id, error = %e, "Failed to draw question");
                    self.cancel();
                    break;
                }
            };

            tracing::debug!(
                room_id = %self.id,
                round = round,
                question_id = %question.id,
                "Round started"
            );
            self.play_question(players, question, answer).await;

            // 중간에 끊긴 라운드는 점수에 반영하지 않음
            if self.is_cancelled() {
                break;
            }

            let snapshot = self.scores();
            *self.settled.write().await = snapshot.clone();

            if !self.broadcast(players, &ServerMessage::ScoreUpdate(snapshot)).await {
                self.cancel();
            }

            if round < self.rounds && !self.is_cancelled() {
                tokio::time::sleep(self.config.round_delay()).await;
            }
        }

        self.finalize().await;
    }

    /// 문제 하나를 모두에게 보내고 모든 답변 대기가 끝날 때까지 기다림
    pub async fn play_question(
        self: &Arc<Self>,
        players: &[Arc<PlayerSession>],
        question: Question,
        answer: String,
    ) {
        let question = Arc::new(question);
        let answer: Arc<str> = answer.into();
        let mut waits = JoinSet::new();

        for player in players {
            let room = Arc::clone(self);
            let player = Arc::clone(player);
            let question = Arc::clone(&question);
            let answer = Arc::clone(&answer);
            waits.spawn(async move { room.ask(&player, &question, &answer).await });
        }

        while let Some(result) = waits.join_next().await {
            if let Err(e) = result {
                tracing::error!(room_id = %self.id, error = %e, "Answer wait task failed");
                self.cancel();
            }
        }
    }

    /// 플레이어 한 명에게 출제하고 채점, 이번 라운드 획득 점수 반환
    async fn ask(&self, player: &PlayerSession, question: &Question, answer: &str) -> u32 {
        if let Err(e) = player.send(&ServerMessage::Question(question.clone())).await {
            tracing::warn!(
                room_id = %self.id,
                player_id = %player.id(),
                error = %e,
                "Failed to send question"
            );
            self.cancel();
            return 0;
        }

        let ttl = self.config.question_timeout();
        let (points, reply) = match self.await_answer(player, &question.id, ttl).await {
            AnswerOutcome::Answered { choice, elapsed } if choice == answer => {
                let points = round_score(elapsed, ttl);
                self.award(player.id(), points);
                let status = Status {
                    correct: true,
                    message: format!("🌎 You got it right! +{} pts", points),
                    answer: answer.to_string(),
                    points,
                };
                (points, ServerMessage::Status(status))
            }
            AnswerOutcome::Answered { choice, .. } => {
                let status = Status {
                    correct: false,
                    message: format!(
                        "👎 Someone needs to buy an atlas. +0 pts. Right answer was {} and you sent {}",
                        answer, choice
                    ),
                    answer: answer.to_string(),
                    points: 0,
                };
                (0, ServerMessage::Status(status))
            }
            AnswerOutcome::TimedOut => (
                0,
                ServerMessage::Timeout("It's too late buddy! 😭".to_string()),
            ),
            AnswerOutcome::Disconnected(e) => {
                tracing::warn!(
                    room_id = %self.id,
                    player_id = %player.id(),
                    error = %e,
                    "Player disconnected mid-round"
                );
                self.cancel();
                return 0;
            }
        };

        if let Err(e) = player.send(&reply).await {
            tracing::warn!(
                room_id = %self.id,
                player_id = %player.id(),
                error = %e,
                "Failed to send round result"
            );
            self.cancel();
        }

        tracing::debug!(
            room_id = %self.id,
            player_id = %player.id(),
            points = points,
            "Answer scored"
        );
        points
    }

    /// 답변/마감/연결 끊김 중 먼저 오는 것을 기다림
    async fn await_answer(
        &self,
        player: &PlayerSession,
        question_id: &str,
        ttl: Duration,
    ) -> AnswerOutcome {
        let started = Instant::now();
        let deadline = started + ttl;
        let mut inbound = player.inbound().await;

        loop {
            tokio::select! {
                item = inbound.recv() => match item {
                    Some(Ok(Inbound::Message(ClientMessage::Answer(answer)))) => {
                        if answer.id == question_id {
                            return AnswerOutcome::Answered {
                                choice: answer.chosen_option,
                                elapsed: started.elapsed(),
                            };
                        }
                        tracing::debug!(
                            room_id = %self.id,
                            player_id = %player.id(),
                            answer_id = %answer.id,
                            "Discarding stale answer"
                        );
                    }
                    Some(Ok(Inbound::Malformed(reason))) => {
                        tracing::debug!(
                            room_id = %self.id,
                            player_id = %player.id(),
                            reason = %reason,
                            "Discarding malformed frame"
                        );
                    }
                    Some(Err(e)) => return AnswerOutcome::Disconnected(e),
                    None => {
                        return AnswerOutcome::Disconnected(GameError::Transport(
                            "inbound stream closed".to_string(),
                        ))
                    }
                },
                _ = sleep_until(deadline) => return AnswerOutcome::TimedOut,
            }
        }
    }

    fn award(&self, player_id: &str, points: u32) {
        *self.scores.entry(player_id.to_string()).or_insert(0) += points;
    }

    /// 모든 플레이어에게 전송, 하나라도 실패하면 false
    async fn broadcast(&self, players: &[Arc<PlayerSession>], message: &ServerMessage) -> bool {
        let results = join_all(players.iter().map(|p| p.send(message))).await;

        let mut ok = true;
        for (player, result) in players.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(
                    room_id = %self.id,
                    player_id = %player.id(),
                    error = %e,
                    "Broadcast failed"
                );
                ok = false;
            }
        }
        ok
    }

    /// 최종 순위 (로스터 순서 기준, 확정된 라운드 점수)
    pub async fn leaderboard(&self) -> Leaderboard {
        let settled = self.settled.read().await;
        let players = self.players.read().await;
        Leaderboard::from_scores(
            players
                .iter()
                .map(|p| (p.id().to_string(), settled.get(p.id()).copied().unwrap_or(0)))
                .collect(),
        )
    }

    /// 게임 종료: 순위 전송, 수신 루프 정지, 레지스트리에서 제거 (방당 한 번)
    pub async fn finalize(&self) {
        if self.finalized.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.state.write().await = RoomState::Finalizing;

        let leaderboard = self.leaderboard().await;
        let players = self.players.read().await.clone();

        tracing::info!(room_id = %self.id, leaderboard = ?leaderboard, "Game over");

        let game_over = ServerMessage::GameOver(GameOver { leaderboard });
        self.broadcast(&players, &game_over).await;

        for player in &players {
            player.stop();
        }

        match self.registry.upgrade() {
            Some(registry) => registry.reap(self.id).await,
            None => self.close().await,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::SeqCst)
    }

    /// 연결 정리
    pub(crate) async fn close(&self) {
        *self.state.write().await = RoomState::Closed;
        let players = self.players.read().await.clone();
        for player in &players {
            player.close().await;
        }
    }
}

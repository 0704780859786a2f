//! 방 레지스트리: 방 생성, 플레이어 입장, 종료된 방 정리

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::game::player::{Connection, PlayerSession};
use crate::game::room::Room;
use crate::protocol::RoomId;
use crate::questions::QuestionProvider;
use dashmap::{mapref::entry::Entry, DashMap};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;

/// 방 ID 범위
const ROOM_ID_MAX: u32 = 999_999;

/// 활성 방 목록과 플레이어 배정 테이블
pub struct Registry {
    /// 방 정보 (room_id -> Room)
    rooms: DashMap<RoomId, Arc<Room>>,
    /// 플레이어 배정 (player_id -> room_id)
    assignments: DashMap<String, RoomId>,
    config: GameConfig,
    provider: Arc<dyn QuestionProvider>,
}

impl Registry {
    pub fn new(config: GameConfig, provider: Arc<dyn QuestionProvider>) -> Arc<Self> {
        Arc::new(Self {
            rooms: DashMap::new(),
            assignments: DashMap::new(),
            config,
            provider,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room(&self, room_id: RoomId) -> Option<Arc<Room>> {
        self.rooms.get(&room_id).map(|room| room.value().clone())
    }

    pub fn assignment(&self, player_id: &str) -> Option<RoomId> {
        self.assignments.get(player_id).map(|r| *r.value())
    }

    /// 방 생성 후 참여 대기 시작
    pub fn create_room(self: &Arc<Self>, player_ids: Vec<String>, rounds: i64) -> Result<RoomId> {
        let rounds = validate_request(&player_ids, rounds)?;

        let room_id = loop {
            let candidate = RoomId(rand::thread_rng().gen_range(1..=ROOM_ID_MAX));
            match self.rooms.entry(candidate) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(Room::new(
                        candidate,
                        player_ids.clone(),
                        rounds,
                        self.config.clone(),
                        self.provider.clone(),
                        Arc::downgrade(self),
                    )));
                    break candidate;
                }
            }
        };

        let mut assigned: Vec<&String> = Vec::with_capacity(player_ids.len());
        for player_id in &player_ids {
            match self.assignments.entry(player_id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(room_id);
                    assigned.push(player_id);
                }
                Entry::Occupied(existing) => {
                    let other = *existing.get();
                    drop(existing);
                    for id in assigned {
                        self.assignments.remove_if(id, |_, r| *r == room_id);
                    }
                    self.rooms.remove(&room_id);
                    tracing::warn!(
                        player_id = %player_id,
                        room_id = %other,
                        "Player already assigned to a live room"
                    );
                    return Err(GameError::InvalidRequest(format!(
                        "player {} is already in room {}",
                        player_id, other
                    )));
                }
            }
        }

        if let Some(room) = self.room(room_id) {
            tokio::spawn(room.run());
        }

        tracing::info!(
            room_id = %room_id,
            players = ?player_ids,
            rounds = rounds,
            "Room created"
        );
        Ok(room_id)
    }

    /// 배정 확인 (부작용 없음)
    pub fn check_assignment(&self, player_id: &str, room_id: RoomId) -> Result<Arc<Room>> {
        let not_found = || GameError::NotFound {
            player_id: player_id.to_string(),
            room_id,
        };

        if self.assignment(player_id) != Some(room_id) {
            return Err(not_found());
        }
        self.room(room_id).ok_or_else(not_found)
    }

    /// 플레이어 입장: 연결을 세션으로 감싸 방에 추가
    ///
    /// 실패하면 아무 상태도 바꾸지 않으며 연결은 세션과 함께 정리됩니다.
    pub async fn admit(
        &self,
        player_id: &str,
        room_id: RoomId,
        connection: Connection,
    ) -> Result<Arc<PlayerSession>> {
        let room = self.check_assignment(player_id, room_id)?;
        let session = Arc::new(PlayerSession::new(
            player_id,
            connection,
            self.config.inbound_buffer,
        ));

        room.add_player(session.clone()).await?;
        Ok(session)
    }

    /// 종료된 방 제거 (멱등)
    pub async fn reap(&self, room_id: RoomId) {
        let Some((_, room)) = self.rooms.remove(&room_id) else {
            tracing::debug!(room_id = %room_id, "Room already reaped");
            return;
        };

        for player_id in room.expected_players() {
            self.assignments.remove_if(player_id, |_, r| *r == room_id);
        }
        room.close().await;

        tracing::info!(room_id = %room_id, "Room reaped");
    }
}

fn validate_request(player_ids: &[String], rounds: i64) -> Result<u32> {
    if player_ids.is_empty() {
        return Err(GameError::InvalidRequest("players must not be empty".into()));
    }
    if rounds <= 0 {
        return Err(GameError::InvalidRequest("rounds must be positive".into()));
    }
    let rounds = u32::try_from(rounds)
        .map_err(|_| GameError::InvalidRequest("rounds is too large".into()))?;

    let mut seen = HashSet::new();
    for player_id in player_ids {
        if player_id.trim().is_empty() {
            return Err(GameError::InvalidRequest("player id must not be blank".into()));
        }
        if !seen.insert(player_id.as_str()) {
            return Err(GameError::InvalidRequest(format!(
                "duplicate player id {}",
                player_id
            )));
        }
    }
    Ok(rounds)
}

//! 클라이언트-서버 메시지 프로토콜 정의
//!
//! 모든 프레임은 `{"type": ..., "content": ...}` 형태의 JSON 객체 하나입니다.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 방 식별자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoomId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(RoomId)
    }
}

/// 클라이언트 → 서버 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "camelCase")]
pub enum ClientMessage {
    Answer(Answer),
}

/// 서버 → 클라이언트 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "camelCase")]
pub enum ServerMessage {
    Acknowledged(String),
    Question(Question),
    Status(Status),
    /// player id -> 누적 점수
    ScoreUpdate(BTreeMap<String, u32>),
    Timeout(String),
    GameOver(GameOver),
}

/// 출제 문제
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub country: String,
    pub options: Vec<String>,
}

/// 답안
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(alias = "Id")]
    pub id: String,
    #[serde(alias = "capital", alias = "Capital")]
    pub chosen_option: String,
}

/// 라운드 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub correct: bool,
    pub message: String,
    /// 정답
    pub answer: String,
    /// 이번 라운드 획득 점수
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOver {
    pub leaderboard: Leaderboard,
}

/// 최종 순위
///
/// 모든 플레이어의 점수가 같으면 `Tied`, 그 외에는 점수 내림차순 `Ranked`.
/// 같은 점수는 같은 순위를 공유하며 점수 외의 기준으로 순서를 정하지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Leaderboard {
    Tied { score: u32, players: Vec<String> },
    Ranked { standings: Vec<Standing> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub rank: usize,
    pub player: String,
    pub score: u32,
}

impl Leaderboard {
    /// 로스터 순서의 (player, score) 목록으로 순위 계산
    pub fn from_scores(scores: Vec<(String, u32)>) -> Self {
        if scores.len() >= 2 && scores.iter().all(|(_, s)| *s == scores[0].1) {
            return Leaderboard::Tied {
                score: scores[0].1,
                players: scores.into_iter().map(|(player, _)| player).collect(),
            };
        }

        let mut sorted = scores;
        // stable sort: 동점자는 로스터 순서 유지
        sorted.sort_by(|a, b| b.1.cmp(&a.1));

        let mut standings: Vec<Standing> = Vec::with_capacity(sorted.len());
        for (index, (player, score)) in sorted.into_iter().enumerate() {
            let rank = match standings.last() {
                Some(prev) if prev.score == score => prev.rank,
                _ => index + 1,
            };
            standings.push(Standing { rank, player, score });
        }

        Leaderboard::Ranked { standings }
    }
}

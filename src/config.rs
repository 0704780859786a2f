//! 환경 변수 기반 설정 관리

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// 서버 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub capitals_file: String,
    pub game: GameConfig,
    pub log_level: String,
}

/// 게임(방) 진행 설정
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// 문제당 답변 제한 시간
    pub question_timeout_ms: u64,
    /// 라운드 사이 대기 시간 (마지막 라운드 이후는 생략)
    pub round_delay_ms: u64,
    /// 문제당 보기 개수
    pub options_per_question: usize,
    /// 인원이 다 차지 않은 방을 정리하기까지의 시간
    pub join_timeout_ms: u64,
    /// 플레이어별 수신 큐 크기
    pub inbound_buffer: usize,
}

impl GameConfig {
    pub fn question_timeout(&self) -> Duration {
        Duration::from_millis(self.question_timeout_ms)
    }

    pub fn round_delay(&self) -> Duration {
        Duration::from_millis(self.round_delay_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            question_timeout_ms: 10_000,
            round_delay_ms: 1_000,
            options_per_question: 4,
            join_timeout_ms: 300_000,
            inbound_buffer: 4,
        }
    }
}

impl Config {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = GameConfig::default();

        Self {
            port: parse_var("PORT", 3434),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            capitals_file: env::var("CAPITALS_FILE")
                .unwrap_or_else(|_| "assets/countries.json".to_string()),
            game: GameConfig {
                question_timeout_ms: parse_var("QUESTION_TIMEOUT_MS", defaults.question_timeout_ms),
                round_delay_ms: parse_var("ROUND_DELAY_MS", defaults.round_delay_ms),
                options_per_question: parse_var(
                    "OPTIONS_PER_QUESTION",
                    defaults.options_per_question,
                )
                .max(1),
                join_timeout_ms: parse_var("JOIN_TIMEOUT_MS", defaults.join_timeout_ms),
                inbound_buffer: parse_var("INBOUND_BUFFER", defaults.inbound_buffer).max(1),
            },
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

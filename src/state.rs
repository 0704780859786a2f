//! 애플리케이션 상태 관리

use crate::config::Config;
use crate::game::Registry;
use crate::questions::QuestionProvider;
use std::sync::Arc;
use std::time::Instant;

/// 전역 애플리케이션 상태
pub struct AppState {
    /// 방 레지스트리
    pub registry: Arc<Registry>,
    /// 설정
    pub config: Arc<Config>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn QuestionProvider>) -> Self {
        Self {
            registry: Registry::new(config.game.clone(), provider),
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}

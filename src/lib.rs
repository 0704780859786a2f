//! 실시간 멀티플레이 수도 퀴즈 서버

pub mod config;
pub mod error;
pub mod game;
pub mod handlers;
pub mod protocol;
pub mod questions;
pub mod server;
pub mod state;

pub use config::{Config, GameConfig};
pub use error::{GameError, Result};
pub use state::AppState;

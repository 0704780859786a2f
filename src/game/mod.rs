//! 게임 세션 엔진

pub mod latch;
pub mod player;
pub mod registry;
pub mod room;

pub use latch::CountdownLatch;
pub use player::{Connection, Inbound, PlayerSession};
pub use registry::Registry;
pub use room::{round_score, Room, RoomState, MAX_ROUND_SCORE};

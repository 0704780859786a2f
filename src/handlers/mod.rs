//! 핸들러 모듈

pub mod connection;
pub mod room;

pub use connection::*;
pub use room::*;

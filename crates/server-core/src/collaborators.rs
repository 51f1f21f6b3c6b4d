//! External collaborators the core consumes but does not implement (§6).
//! `backend` supplies concrete impls (JWT validation, sqlx persistence, an
//! axum websocket `Transport`); `server-core`'s tests supply fakes so the
//! registry/matchmaker/session actors run with no network or database.

use async_trait::async_trait;
use std::time::Duration;

/// 2-second deadline per §5/§6; callers wrap the call themselves with
/// `tokio::time::timeout` rather than baking it into the trait, so fakes in
/// tests don't have to race a real clock.
pub const TOKEN_VALIDATION_DEADLINE: Duration = Duration::from_secs(2);
pub const SAVE_GAME_DEADLINE: Duration = Duration::from_secs(2);

#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate_token(&self, token: &str) -> Option<u32>;
}

#[derive(Debug, Clone)]
pub struct SaveGameRequest {
    pub game_id: u32,
    pub white: u32,
    pub black: u32,
    pub board_history: Vec<Vec<u8>>,
    pub move_history: Vec<MoveRecord>,
    pub pgn: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRecord {
    pub from: i32,
    pub to: i32,
    pub promotion: i32,
}

#[async_trait]
pub trait GamePersistence: Send + Sync {
    async fn save_game(&self, request: SaveGameRequest) -> Result<(), String>;
}

/// Per-connection write sink. `backend`'s axum integration implements this
/// over a websocket sender; `server-core`'s tests implement it over an
/// `mpsc::UnboundedSender<Vec<u8>>` to assert on what a session broadcasts.
pub trait ConnSink: Send + Sync {
    fn write_frame(&self, frame: Vec<u8>);
    fn close(&self);
}

//! Process wiring for the chess matchmaking/session server: HTTP auth
//! endpoints, the JWT `TokenValidator`, sqlx-backed `GamePersistence`, and
//! the axum websocket transport that drives `server_core::connection`.
//!
//! `server-core` and `chess-core` hold all the protocol/game logic; this
//! crate only supplies the concrete collaborators the Go original called
//! out as external services (§6).

pub mod api;
pub mod auth;
pub mod config;
pub mod persistence;
pub mod transport;

//! Everything built on top of `chess-core` and `wire`: client registry,
//! matchmakers, game keeper, the game session actor, message dispatch, the
//! connection lifecycle, and the buffer pool (§4.3-§4.8, §5).
//!
//! External collaborators (token validation, persistence, transport I/O)
//! are consumed as traits in `collaborators` — `backend` supplies the real
//! implementations.

pub mod buffer_pool;
pub mod collaborators;
pub mod connection;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod game_keeper;
pub mod matchmaker;
pub mod modes;
pub mod registry;
pub mod session;

pub use buffer_pool::BufferPool;
pub use context::ServerContext;
pub use modes::Mode;
pub use registry::{Client, ClientRegistry, ConnId, UserId};
pub use session::{GameId, GameSession, PlayerMove};

//! Error taxonomy per §7. None of these are fatal to the process — every
//! variant maps to a logged-and-continue or connection-local policy, applied
//! at the call sites in `dispatch` and the connection lifecycle (§8).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame shorter than the 2-byte MsgType prefix")]
    FrameTooShort,
    #[error("unknown MsgType {0}")]
    UnknownMsgType(u16),
    #[error(transparent)]
    Codec(#[from] wire::CodecError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token validation failed")]
    Invalid,
    #[error("token validator timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("save-game call failed: {0}")]
    Failed(String),
    #[error("save-game call timed out")]
    Timeout,
}

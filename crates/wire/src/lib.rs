//! Binary frame codec and message catalog (§4.1, §4.7). No transport here —
//! `server-core::collaborators::Transport` owns frame I/O; this crate only
//! knows how to turn bytes into typed fields and back.

pub mod codec;
pub mod message;

pub use codec::{pack, unpack, CodecError, FieldType, FieldValue};
pub use message::{build_frame, client_cmds, server_cmds, split_frame, GameStartedPayload, MovePieceFields};

//! `MsgType` catalog and payload shapes, per §4.7 and §6. Every application
//! message is a 2-byte big-endian `MsgType` followed by its payload, one per
//! binary frame.

use serde::{Deserialize, Serialize};

/// Codes sent client → server.
pub mod client_cmds {
    pub const PONG: u16 = 1;
    pub const AUTH: u16 = 2;
    pub const SEARCHING_FOR_GAME: u16 = 3;
    pub const ACCEPTED_GAME: u16 = 4;
    pub const DECLINED_GAME: u16 = 5;
    pub const MOVE_PIECE: u16 = 10;
    pub const CLOSE_SOCKET: u16 = 61500;
}

/// Codes sent server → client.
pub mod server_cmds {
    pub const PING: u16 = 1;
    pub const CLIENT_AUTHENTICATED: u16 = 3;
    pub const GAME_FOUND: u16 = 4;
    pub const GAME_STARTED: u16 = 5;
    pub const GAME_DECLINED: u16 = 6;
    pub const GAME_SEARCH_TIMEOUT: u16 = 7;
    pub const MOVE_HAPPENED: u16 = 15;
    pub const INVALID_MOVE: u16 = 16;
    pub const GAME_STATE: u16 = 20;
}

/// JSON payload of `server_cmds::GAME_STARTED`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameStartedPayload {
    pub mode: u16,
    pub player_ids: Vec<u32>,
    pub game_id: u32,
}

/// A decoded `move_piece` payload, before the game lookup that turns it into
/// a `PlayerMove` in `server-core`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovePieceFields {
    pub from: i8,
    pub to: i8,
    pub promote_to: i8,
    pub game_id: u32,
}

use crate::codec::{pack, unpack, CodecError, FieldType, FieldValue};

const MOVE_PIECE_FORMAT: [FieldType; 4] = [FieldType::I8, FieldType::I8, FieldType::I8, FieldType::U32];

impl MovePieceFields {
    pub fn decode(payload: &[u8]) -> Result<MovePieceFields, CodecError> {
        let values = unpack(payload, &MOVE_PIECE_FORMAT)?;
        match values.as_slice() {
            [FieldValue::I8(from), FieldValue::I8(to), FieldValue::I8(promote_to), FieldValue::U32(game_id)] => {
                Ok(MovePieceFields { from: *from, to: *to, promote_to: *promote_to, game_id: *game_id })
            }
            _ => unreachable!("format fixes the decoded variant shapes"),
        }
    }
}

/// The `{from,to,promote,game_id}` broadcast payload of `MOVE_HAPPENED`.
pub fn encode_move_happened(from: i8, to: i8, promote_to: i8, game_id: u32) -> Vec<u8> {
    let format = [FieldType::I8, FieldType::I8, FieldType::I8, FieldType::U32];
    let values = [
        FieldValue::I8(from),
        FieldValue::I8(to),
        FieldValue::I8(promote_to),
        FieldValue::U32(game_id),
    ];
    pack(&format, &values).expect("fixed format matches fixed values")
}

/// Extracts the leading 2-byte big-endian `MsgType` from an inbound frame;
/// `None` if the payload is shorter than 2 bytes (dropped silently per §8).
pub fn split_frame(frame: &[u8]) -> Option<(u16, &[u8])> {
    if frame.len() < 2 {
        return None;
    }
    let msg_type = u16::from_be_bytes([frame[0], frame[1]]);
    Some((msg_type, &frame[2..]))
}

/// Prefixes `payload` with its big-endian `MsgType` to build an outbound
/// frame.
pub fn build_frame(msg_type: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(2 + payload.len());
    frame.extend_from_slice(&msg_type.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_frame_rejects_short_payload() {
        assert_eq!(split_frame(&[0]), None);
    }

    #[test]
    fn split_frame_extracts_msg_type_and_payload() {
        let frame = build_frame(client_cmds::SEARCHING_FOR_GAME, &[0, 1]);
        assert_eq!(split_frame(&frame), Some((client_cmds::SEARCHING_FOR_GAME, &[0u8, 1][..])));
    }

    #[test]
    fn move_piece_fields_round_trip_through_the_codec() {
        let payload = encode_move_happened(12, 28, 0, 1);
        let decoded = MovePieceFields::decode(&payload).unwrap();
        assert_eq!(decoded, MovePieceFields { from: 12, to: 28, promote_to: 0, game_id: 1 });
    }

    #[test]
    fn game_started_payload_serializes_as_json() {
        let payload = GameStartedPayload { mode: 1, player_ids: vec![7, 9], game_id: 42 };
        let json = serde_json::to_string(&payload).unwrap();
        let back: GameStartedPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, back);
    }
}

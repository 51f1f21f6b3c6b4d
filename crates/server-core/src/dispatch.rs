//! Post-auth message dispatch, grounded on `internal/message.go`'s
//! `handleMessage`. Takes a decoded `(msg_type, payload)` plus the
//! authenticated client and routes it to the registry, a matchmaker, or a
//! game session's inbox.

use crate::context::ServerContext;
use crate::error::ProtocolError;
use crate::modes::Mode;
use crate::registry::Client;
use crate::session::PlayerMove;
use std::sync::Arc;
use wire::{build_frame, client_cmds, server_cmds, MovePieceFields};

pub async fn dispatch(msg_type: u16, payload: &[u8], client: &Arc<Client>, ctx: &ServerContext) {
    match msg_type {
        client_cmds::PONG => {
            // heartbeat reply, no-op.
        }
        client_cmds::SEARCHING_FOR_GAME => handle_searching_for_game(payload, client, ctx),
        client_cmds::ACCEPTED_GAME | client_cmds::DECLINED_GAME => {
            // reserved; unused by the direct-pair design (§4.7).
        }
        client_cmds::CLOSE_SOCKET => {
            tracing::info!(user_id = client.user_id(), "client wants to close socket");
        }
        client_cmds::MOVE_PIECE => handle_move_piece(payload, client, ctx).await,
        other => {
            let err = ProtocolError::UnknownMsgType(other);
            tracing::warn!(user_id = client.user_id(), %err, "ignoring");
        }
    }
}

fn handle_searching_for_game(payload: &[u8], client: &Arc<Client>, ctx: &ServerContext) {
    if payload.len() < 2 {
        tracing::warn!(user_id = client.user_id(), "SearchingForGame payload too short");
        return;
    }
    let mode_code = u16::from_be_bytes([payload[0], payload[1]]);
    let Some(mode) = Mode::from_code(mode_code) else {
        tracing::warn!(user_id = client.user_id(), mode_code, "no matchmaker for mode");
        return;
    };
    if client.currently_playing().is_some() {
        tracing::warn!(user_id = client.user_id(), %mode, "already in a game, ignoring");
        return;
    }
    tracing::info!(user_id = client.user_id(), %mode, "client wants to find game");

    if !client.mark_queued(mode) {
        return; // already queued for this mode; suppress the duplicate.
    }
    if let Some(matchmaker) = ctx.matchmakers.get(&mode) {
        matchmaker.enqueue(client.clone());
    }
}

async fn handle_move_piece(payload: &[u8], client: &Arc<Client>, ctx: &ServerContext) {
    let invalid = || {
        let frame = build_frame(server_cmds::INVALID_MOVE, &[]);
        client.broadcast(&frame);
    };

    tracing::info!(user_id = client.user_id(), "received move");

    if payload.len() < 3 {
        tracing::warn!(user_id = client.user_id(), "invalid move payload length");
        invalid();
        return;
    }

    let fields = match MovePieceFields::decode(payload) {
        Ok(fields) => fields,
        Err(err) => {
            let err = ProtocolError::from(err);
            tracing::warn!(user_id = client.user_id(), %err, "can't unpack move");
            invalid();
            return;
        }
    };

    let Some(session) = ctx.game_keeper.get_game(fields.game_id) else {
        tracing::warn!(user_id = client.user_id(), game_id = fields.game_id, "couldn't find active game with given id");
        invalid();
        return;
    };

    let mv = PlayerMove { from: fields.from, to: fields.to, promote_to: fields.promote_to, player: client.clone() };
    tracing::info!(
        game_id = session.id(),
        from = fields.from,
        to = fields.to,
        promote_to = fields.promote_to,
        user_id = client.user_id(),
        "sending move to game"
    );
    // bounded at INBOX_CAPACITY; backpressures a spamming sender (§4.5).
    let _ = session.inbox().send(mv).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fakes::{AlwaysValid, ChannelSink, RecordingPersistence};
    use crate::context::ServerContext;

    fn connected_client(ctx: &ServerContext, id: u32) -> (Arc<Client>, tokio::sync::mpsc::UnboundedReceiver<Vec<u8>>) {
        let client = ctx.registry.get_or_create(id);
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        ctx.registry.add_conn(&client, 1, Arc::new(ChannelSink(tx)));
        (client, rx)
    }

    #[tokio::test]
    async fn move_piece_for_unknown_game_replies_invalid_move() {
        let ctx = ServerContext::new(Arc::new(AlwaysValid(1)), Arc::new(RecordingPersistence::default()));
        let (client, mut rx) = connected_client(&ctx, 1);
        let payload = wire::message::encode_move_happened(12, 28, 0, 999);
        dispatch(client_cmds::MOVE_PIECE, &payload, &client, &ctx).await;
        let frame = rx.recv().await.unwrap();
        assert_eq!(u16::from_be_bytes([frame[0], frame[1]]), server_cmds::INVALID_MOVE);
    }

    #[tokio::test]
    async fn searching_for_game_enqueues_into_the_matching_matchmaker() {
        let ctx = ServerContext::new(Arc::new(AlwaysValid(1)), Arc::new(RecordingPersistence::default()));
        let (client, _rx) = connected_client(&ctx, 1);
        let payload = Mode::Classic.code().to_be_bytes();
        dispatch(client_cmds::SEARCHING_FOR_GAME, &payload, &client, &ctx).await;
        let (queued, _) = ctx.matchmakers[&Mode::Classic].queue_depth();
        assert_eq!(queued, 1);
    }

    #[tokio::test]
    async fn duplicate_searching_for_game_is_suppressed() {
        let ctx = ServerContext::new(Arc::new(AlwaysValid(1)), Arc::new(RecordingPersistence::default()));
        let (client, _rx) = connected_client(&ctx, 1);
        let payload = Mode::Classic.code().to_be_bytes();
        dispatch(client_cmds::SEARCHING_FOR_GAME, &payload, &client, &ctx).await;
        dispatch(client_cmds::SEARCHING_FOR_GAME, &payload, &client, &ctx).await;
        let (queued, _) = ctx.matchmakers[&Mode::Classic].queue_depth();
        assert_eq!(queued, 1);
    }
}

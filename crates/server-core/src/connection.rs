//! Connection lifecycle, grounded on `internal/server.go`'s `handleConn` /
//! `closeConn`. Generic over a `FrameReader` so the real websocket framing
//! (an external collaborator, §6) stays in `backend`; this module only
//! knows the pre-auth gate, the auth handshake, and handing post-auth
//! frames to `dispatch`. Every frame is copied into a buffer drawn from
//! `ctx.buffer_pool` and returned to it on every exit from the loop body
//! (§4.8).

use crate::collaborators::{ConnSink, TOKEN_VALIDATION_DEADLINE};
use crate::context::ServerContext;
use crate::dispatch::dispatch;
use crate::error::{AuthError, ProtocolError};
use crate::registry::{Client, ConnId};
use std::sync::Arc;
use wire::{build_frame, client_cmds, pack, server_cmds, split_frame, FieldType, FieldValue};

pub enum InboundFrame {
    Binary(Vec<u8>),
    /// Non-binary transport frame; discarded per §4.8 step 1.
    Other,
}

#[async_trait::async_trait]
pub trait FrameReader: Send {
    /// `None` on read error or clean EOF.
    async fn read_frame(&mut self) -> Option<InboundFrame>;
}

/// Drives one connection end-to-end: pre-auth gate, `Auth` handshake, then
/// `dispatch` for every subsequent frame. On any exit path `RemoveConn` is
/// called exactly once if a client was ever associated with this conn.
pub async fn handle_connection(
    conn_id: ConnId,
    mut reader: impl FrameReader,
    sink: Arc<dyn ConnSink>,
    ctx: &ServerContext,
) {
    let mut client: Option<Arc<Client>> = None;

    loop {
        let Some(frame) = reader.read_frame().await else { break };
        let payload = match frame {
            InboundFrame::Other => continue,
            InboundFrame::Binary(bytes) => bytes,
        };

        // §4.8 step 2: a pooled buffer sized for the frame carries the
        // payload through parsing and dispatch, and goes back to the pool on
        // every exit from this iteration.
        let mut buf = ctx.buffer_pool.get(payload.len());
        buf.copy_from_slice(&payload);

        let (msg_type, body) = match split_frame(&buf) {
            Some(parsed) => parsed,
            None => {
                let err = ProtocolError::FrameTooShort;
                tracing::warn!(conn_id, %err, "dropping malformed frame");
                ctx.buffer_pool.put(buf);
                continue;
            }
        };

        if client.is_none() {
            if msg_type != client_cmds::AUTH {
                ctx.buffer_pool.put(buf);
                sink.close();
                break;
            }
            let token = String::from_utf8_lossy(body).into_owned();
            match authenticate(&token, ctx).await {
                Ok(user_id) => {
                    let authenticated = ctx.registry.get_or_create(user_id);
                    ctx.registry.add_conn(&authenticated, conn_id, sink.clone());
                    let reply =
                        pack(&[FieldType::U32], &[FieldValue::U32(user_id)]).expect("fixed single-field format");
                    sink.write_frame(build_frame(server_cmds::CLIENT_AUTHENTICATED, &reply));
                    client = Some(authenticated);
                }
                Err(err) => {
                    tracing::warn!(conn_id, %err, "closing connection");
                    ctx.buffer_pool.put(buf);
                    sink.close();
                    break;
                }
            }
            ctx.buffer_pool.put(buf);
            continue;
        }

        let authenticated = client.as_ref().expect("checked above");
        dispatch(msg_type, body, authenticated, ctx).await;
        ctx.buffer_pool.put(buf);
    }

    if let Some(authenticated) = client {
        let remaining = ctx.registry.remove_conn(&authenticated, conn_id);
        tracing::info!(user_id = authenticated.user_id(), remaining, "connection closed");
    }
}

async fn authenticate(token: &str, ctx: &ServerContext) -> Result<u32, AuthError> {
    match tokio::time::timeout(TOKEN_VALIDATION_DEADLINE, ctx.token_validator.validate_token(token)).await {
        Ok(Some(user_id)) => Ok(user_id),
        Ok(None) => Err(AuthError::Invalid),
        Err(_) => Err(AuthError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fakes::{AlwaysInvalid, AlwaysValid, ChannelSink, RecordingPersistence};
    use std::collections::VecDeque;

    struct ScriptedReader {
        frames: VecDeque<InboundFrame>,
    }

    #[async_trait::async_trait]
    impl FrameReader for ScriptedReader {
        async fn read_frame(&mut self) -> Option<InboundFrame> {
            self.frames.pop_front()
        }
    }

    fn scripted(frames: Vec<InboundFrame>) -> ScriptedReader {
        ScriptedReader { frames: frames.into_iter().collect() }
    }

    fn auth_frame(token: &str) -> InboundFrame {
        let mut bytes = client_cmds::AUTH.to_be_bytes().to_vec();
        bytes.extend_from_slice(token.as_bytes());
        InboundFrame::Binary(bytes)
    }

    #[tokio::test]
    async fn successful_auth_registers_the_conn_and_replies_client_authenticated() {
        let ctx = ServerContext::new(Arc::new(AlwaysValid(7)), Arc::new(RecordingPersistence::default()));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = Arc::new(ChannelSink(tx));
        let reader = scripted(vec![auth_frame("any-token")]);

        handle_connection(1, reader, sink, &ctx).await;

        let frame = rx.recv().await.expect("ClientAuthenticated reply");
        assert_eq!(u16::from_be_bytes([frame[0], frame[1]]), server_cmds::CLIENT_AUTHENTICATED);
        assert_eq!(u32::from_be_bytes([frame[2], frame[3], frame[4], frame[5]]), 7);
    }

    #[tokio::test]
    async fn non_auth_message_before_auth_closes_the_connection() {
        let ctx = ServerContext::new(Arc::new(AlwaysValid(7)), Arc::new(RecordingPersistence::default()));
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = Arc::new(ChannelSink(tx));
        let pong = InboundFrame::Binary(client_cmds::PONG.to_be_bytes().to_vec());
        let reader = scripted(vec![pong]);

        handle_connection(2, reader, sink, &ctx).await;
        // no panic and no client ever registered is success here; RemoveConn
        // was never called since `client` stayed None throughout.
    }

    #[tokio::test]
    async fn invalid_token_closes_without_registering_a_client() {
        let ctx = ServerContext::new(Arc::new(AlwaysInvalid), Arc::new(RecordingPersistence::default()));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = Arc::new(ChannelSink(tx));
        let reader = scripted(vec![auth_frame("bad-token")]);

        handle_connection(3, reader, sink, &ctx).await;
        assert!(rx.recv().await.is_none(), "no ClientAuthenticated reply should have been sent");
    }
}

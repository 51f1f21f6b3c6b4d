//! The axum websocket `Transport` (§6): implements `server_core::connection`'s
//! `FrameReader`/`ConnSink` traits over a real websocket, and exposes the
//! `/ws` upgrade route `main.rs` mounts. Grounded on the teacher's axum
//! usage in `backend/src/api.rs` for router shape; the split reader/writer
//! halves follow the same "reader drives the actor, writer drains a
//! channel" shape `connection.rs`'s tests use with `ChannelSink`.

use async_trait::async_trait;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use server_core::collaborators::ConnSink;
use server_core::connection::{handle_connection, FrameReader, InboundFrame};
use server_core::context::ServerContext;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

pub fn ws_router(ctx: Arc<ServerContext>) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(ctx)
}

async fn ws_handler(ws: WebSocketUpgrade, State(ctx): State<Arc<ServerContext>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(socket: WebSocket, ctx: Arc<ServerContext>) {
    let (sink, stream) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(writer_task(sink, rx));

    let conn_sink: Arc<dyn ConnSink> = Arc::new(WsSink { tx });
    let reader = WsFrameReader { stream };
    let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);

    handle_connection(conn_id, reader, conn_sink, &ctx).await;
}

enum Outbound {
    Frame(Vec<u8>),
    Close,
}

struct WsSink {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnSink for WsSink {
    fn write_frame(&self, frame: Vec<u8>) {
        let _ = self.tx.send(Outbound::Frame(frame));
    }

    fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
    }
}

async fn writer_task(
    mut sink: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Frame(bytes) => {
                if sink.send(Message::Binary(bytes.into())).await.is_err() {
                    break;
                }
            }
            Outbound::Close => {
                let _ = sink.close().await;
                break;
            }
        }
    }
}

// Hands axum's owned `Vec<u8>` straight to `handle_connection`, which copies
// it into a pooled buffer and returns that buffer to the pool on every exit
// path (§4.8); buffer pooling itself lives in `server-core`, not here.
struct WsFrameReader {
    stream: futures::stream::SplitStream<WebSocket>,
}

#[async_trait]
impl FrameReader for WsFrameReader {
    async fn read_frame(&mut self) -> Option<InboundFrame> {
        match self.stream.next().await? {
            Ok(Message::Binary(bytes)) => Some(InboundFrame::Binary(bytes.to_vec())),
            Ok(_) => Some(InboundFrame::Other),
            Err(_) => None,
        }
    }
}

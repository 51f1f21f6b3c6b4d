//! Per-mode matchmaker actor, grounded on `internal/matchmaker.go`: an owned
//! `waiting_list`, `queue`/`remove` channels, FIFO pairing with stale
//! filtering, drained non-blockingly after every event to coalesce bursts.

use crate::game_keeper::GameKeeper;
use crate::modes::Mode;
use crate::registry::Client;
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};

pub const CHANNEL_BUFFER: usize = 100;

pub struct Matchmaker {
    mode: Mode,
    queue_tx: Sender<Arc<Client>>,
    remove_tx: Sender<Arc<Client>>,
}

impl Matchmaker {
    /// Spawns the matchmaking loop as its own task and returns a handle.
    /// `remove_tx`/`remove_rx` are created here and the sender side must be
    /// registered with the `ClientRegistry` by the caller, so disconnect
    /// fan-out reaches every mode's matchmaker.
    pub fn spawn(mode: Mode, game_keeper: Arc<GameKeeper>) -> (Arc<Matchmaker>, Sender<Arc<Client>>) {
        let (queue_tx, queue_rx) = tokio::sync::mpsc::channel(CHANNEL_BUFFER);
        let (remove_tx, remove_rx) = tokio::sync::mpsc::channel(CHANNEL_BUFFER);
        let matchmaker = Arc::new(Matchmaker { mode, queue_tx, remove_tx: remove_tx.clone() });
        tokio::spawn(matchmaking_loop(mode, queue_rx, remove_rx, game_keeper));
        (matchmaker, remove_tx)
    }

    /// Non-blocking enqueue; a full channel is logged and the request
    /// dropped (§4.6). Duplicate enqueues for the same client+mode are
    /// suppressed by the caller checking `Client::mark_queued` first.
    pub fn enqueue(&self, client: Arc<Client>) {
        let user_id = client.user_id();
        if self.queue_tx.try_send(client).is_err() {
            tracing::warn!(user_id, mode = %self.mode, "matchmaking queue full, dropping enqueue");
        }
    }

    pub fn remove_sender(&self) -> Sender<Arc<Client>> {
        self.remove_tx.clone()
    }

    /// Debug introspection, grounded on `GetQueueStatus` — not wired to any
    /// external RPC, used for observability/tests.
    pub fn queue_depth(&self) -> (usize, usize) {
        (CHANNEL_BUFFER - self.queue_tx.capacity(), CHANNEL_BUFFER - self.remove_tx.capacity())
    }
}

fn is_disconnected(client: &Arc<Client>) -> bool {
    client.is_disconnected()
}

async fn matchmaking_loop(
    mode: Mode,
    mut queue_rx: Receiver<Arc<Client>>,
    mut remove_rx: Receiver<Arc<Client>>,
    game_keeper: Arc<GameKeeper>,
) {
    let mut waiting_list: Vec<Arc<Client>> = Vec::new();

    loop {
        tokio::select! {
            Some(client) = queue_rx.recv() => {
                tracing::info!(user_id = client.user_id(), %mode, "client joined matchmaking queue");
                waiting_list.push(client);
            }
            Some(leaving) = remove_rx.recv() => {
                tracing::info!(user_id = leaving.user_id(), %mode, "removing client from matchmaker");
                remove_client_from_list(&mut waiting_list, &leaving);
            }
            else => break,
        }

        drain_non_blocking(&mut queue_rx, &mut remove_rx, &mut waiting_list, mode);
        waiting_list = process_waiting_list(waiting_list, mode, &game_keeper).await;
    }
}

fn drain_non_blocking(
    queue_rx: &mut Receiver<Arc<Client>>,
    remove_rx: &mut Receiver<Arc<Client>>,
    waiting_list: &mut Vec<Arc<Client>>,
    mode: Mode,
) {
    loop {
        match queue_rx.try_recv() {
            Ok(client) => {
                tracing::info!(user_id = client.user_id(), %mode, "draining: client joined queue");
                waiting_list.push(client);
                continue;
            }
            Err(_) => {}
        }
        match remove_rx.try_recv() {
            Ok(leaving) => {
                tracing::info!(user_id = leaving.user_id(), %mode, "draining: removing client");
                remove_client_from_list(waiting_list, &leaving);
                continue;
            }
            Err(_) => break,
        }
    }
}

fn remove_client_from_list(list: &mut Vec<Arc<Client>>, target: &Arc<Client>) {
    list.retain(|p| !Arc::ptr_eq(p, target) && p.user_id() != target.user_id());
}

/// FIFO pairing with stale filtering, per §4.6: scan left to right, drop
/// disconnected candidates, skip same-user duplicate pairs, otherwise form a
/// match and don't re-enqueue either player. Returns the filtered residue.
async fn process_waiting_list(waiting_list: Vec<Arc<Client>>, mode: Mode, game_keeper: &Arc<GameKeeper>) -> Vec<Arc<Client>> {
    let mut filtered = Vec::with_capacity(waiting_list.len());
    let mut iter = waiting_list.into_iter();

    loop {
        let Some(p1) = iter.next() else { break };

        if is_disconnected(&p1) {
            tracing::info!(user_id = p1.user_id(), %mode, "dropping disconnected client");
            continue;
        }

        let Some(p2) = iter.next() else {
            filtered.push(p1);
            break;
        };

        if is_disconnected(&p2) {
            tracing::info!(user_id = p2.user_id(), %mode, "dropping disconnected client");
            filtered.push(p1);
            continue;
        }

        if p1.user_id() == p2.user_id() {
            tracing::warn!(user_id = p1.user_id(), %mode, "skipping match: same player queued twice");
            continue;
        }

        tracing::info!(p1 = p1.user_id(), p2 = p2.user_id(), %mode, "matched players");
        p1.clear_queued(mode);
        p2.clear_queued(mode);
        game_keeper.create_game([p1, p2], mode).await;
    }

    filtered
}

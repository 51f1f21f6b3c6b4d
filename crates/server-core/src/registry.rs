//! Client registry: a rw-locked `UserId -> Client` map, each `Client` guarded
//! by its own mutex, per §4.3. Grounded on the final design described there
//! (the draft `internal/client.go` uses `int32` ids and no terminal flag —
//! spec.md §9 says to implement only the final design).

use crate::collaborators::ConnSink;
use crate::modes::Mode;
use crate::session::GameId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

pub type UserId = u32;
pub type ConnId = u64;

struct ClientState {
    conns: HashMap<ConnId, Arc<dyn ConnSink>>,
    queued_in_modes: HashSet<Mode>,
    terminal: bool,
    /// Set for the duration of an active game (§4.5 "On start"); cleared
    /// when the session ends. `SearchingForGame` is refused while set.
    currently_playing: Option<GameId>,
}

pub struct Client {
    user_id: UserId,
    state: Mutex<ClientState>,
}

impl Client {
    fn new(user_id: UserId) -> Self {
        Client {
            user_id,
            state: Mutex::new(ClientState {
                conns: HashMap::new(),
                queued_in_modes: HashSet::new(),
                terminal: false,
                currently_playing: None,
            }),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn is_disconnected(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.terminal || state.conns.is_empty()
    }

    pub fn conn_count(&self) -> usize {
        self.state.lock().unwrap().conns.len()
    }

    /// Broadcasts `frame` to every connection of this client, serialized
    /// under the per-client mutex per §5 ("trading throughput for
    /// simplicity").
    pub fn broadcast(&self, frame: &[u8]) {
        let state = self.state.lock().unwrap();
        for sink in state.conns.values() {
            sink.write_frame(frame.to_vec());
        }
    }

    /// True if `mode` was newly marked queued (i.e. this wasn't a duplicate
    /// enqueue); the matchmaker only sends on `queue` when this is true.
    pub fn mark_queued(&self, mode: Mode) -> bool {
        self.state.lock().unwrap().queued_in_modes.insert(mode)
    }

    pub fn clear_queued(&self, mode: Mode) {
        self.state.lock().unwrap().queued_in_modes.remove(&mode);
    }

    pub fn currently_playing(&self) -> Option<GameId> {
        self.state.lock().unwrap().currently_playing
    }

    pub fn set_currently_playing(&self, game_id: GameId) {
        self.state.lock().unwrap().currently_playing = Some(game_id);
    }

    pub fn clear_currently_playing(&self) {
        self.state.lock().unwrap().currently_playing = None;
    }
}

pub struct ClientRegistry {
    clients: RwLock<HashMap<UserId, Arc<Client>>>,
    matchmaker_remove: Mutex<Vec<tokio::sync::mpsc::Sender<Arc<Client>>>>,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        ClientRegistry::new()
    }
}

impl ClientRegistry {
    pub fn new() -> Self {
        ClientRegistry { clients: RwLock::new(HashMap::new()), matchmaker_remove: Mutex::new(Vec::new()) }
    }

    /// Matchmakers register their `remove` sender here so `RemoveConn` can
    /// fan out a terminal notification without depending on the matchmaker
    /// module directly (§4.3 disconnect fan-out).
    pub fn register_matchmaker_remove_channel(&self, sender: tokio::sync::mpsc::Sender<Arc<Client>>) {
        self.matchmaker_remove.lock().unwrap().push(sender);
    }

    /// If a live (non-terminal) entry exists, returns it; a terminal entry
    /// is discarded and replaced with a fresh one; otherwise a fresh one is
    /// created (§4.3).
    pub fn get_or_create(&self, user_id: UserId) -> Arc<Client> {
        {
            let clients = self.clients.read().unwrap();
            if let Some(client) = clients.get(&user_id) {
                if !client.state.lock().unwrap().terminal {
                    return client.clone();
                }
            }
        }
        let mut clients = self.clients.write().unwrap();
        if let Some(client) = clients.get(&user_id) {
            if !client.state.lock().unwrap().terminal {
                return client.clone();
            }
        }
        let client = Arc::new(Client::new(user_id));
        clients.insert(user_id, client.clone());
        client
    }

    pub fn get(&self, user_id: UserId) -> Option<Arc<Client>> {
        let clients = self.clients.read().unwrap();
        clients.get(&user_id).filter(|c| !c.state.lock().unwrap().terminal).cloned()
    }

    pub fn add_conn(&self, client: &Arc<Client>, conn_id: ConnId, sink: Arc<dyn ConnSink>) {
        let mut state = client.state.lock().unwrap();
        if state.terminal {
            return;
        }
        state.conns.insert(conn_id, sink);
    }

    /// Removes `conn_id`; if no conns remain, marks the client terminal,
    /// fans out a non-blocking remove notification to every matchmaker
    /// (without holding the client lock), then deletes it from the
    /// registry. Returns the remaining conn count.
    pub fn remove_conn(&self, client: &Arc<Client>, conn_id: ConnId) -> usize {
        let remaining = {
            let mut state = client.state.lock().unwrap();
            state.conns.remove(&conn_id);
            state.conns.len()
        };
        if remaining == 0 {
            self.terminate(client);
        }
        remaining
    }

    fn terminate(&self, client: &Arc<Client>) {
        {
            let mut state = client.state.lock().unwrap();
            if state.terminal {
                return;
            }
            state.terminal = true;
        }
        for sender in self.matchmaker_remove.lock().unwrap().iter() {
            if sender.try_send(client.clone()).is_err() {
                tracing::warn!(client_id = client.user_id(), "matchmaker remove channel full, dropping fan-out");
            }
        }
        self.clients.write().unwrap().remove(&client.user_id());
    }

    pub fn remove(&self, user_id: UserId) {
        if let Some(client) = self.clients.write().unwrap().remove(&user_id) {
            let mut state = client.state.lock().unwrap();
            state.terminal = true;
            state.conns.clear();
        }
    }

    /// Snapshot of live clients; callers must not rely on stability under
    /// concurrent mutation (§4.3).
    pub fn get_all(&self) -> Vec<Arc<Client>> {
        self.clients.read().unwrap().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fakes::ChannelSink;

    fn sink() -> (Arc<dyn ConnSink>, tokio::sync::mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Arc::new(ChannelSink(tx)), rx)
    }

    #[test]
    fn get_or_create_returns_the_same_client_on_repeat_calls() {
        let registry = ClientRegistry::new();
        let a = registry.get_or_create(7);
        let b = registry.get_or_create(7);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn remove_conn_terminates_client_when_last_conn_drops() {
        let registry = ClientRegistry::new();
        let client = registry.get_or_create(7);
        let (sink, _rx) = sink();
        registry.add_conn(&client, 1, sink);
        assert_eq!(registry.remove_conn(&client, 1), 0);
        assert!(client.is_disconnected());
        assert!(registry.get(7).is_none());
    }

    #[test]
    fn remove_conn_keeps_client_alive_with_remaining_conns() {
        let registry = ClientRegistry::new();
        let client = registry.get_or_create(7);
        let (sink_a, _ra) = sink();
        let (sink_b, _rb) = sink();
        registry.add_conn(&client, 1, sink_a);
        registry.add_conn(&client, 2, sink_b);
        assert_eq!(registry.remove_conn(&client, 1), 1);
        assert!(registry.get(7).is_some());
    }

    #[test]
    fn get_or_create_replaces_a_terminal_entry() {
        let registry = ClientRegistry::new();
        let first = registry.get_or_create(7);
        let (sink, _rx) = sink();
        registry.add_conn(&first, 1, sink);
        registry.remove_conn(&first, 1);
        let second = registry.get_or_create(7);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.conn_count(), 0);
    }

    #[tokio::test]
    async fn terminate_fans_out_to_registered_matchmaker_channels() {
        let registry = ClientRegistry::new();
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        registry.register_matchmaker_remove_channel(tx);
        let client = registry.get_or_create(7);
        let (sink, _rx) = sink();
        registry.add_conn(&client, 1, sink);
        registry.remove_conn(&client, 1);
        let removed = rx.recv().await.expect("fan-out notification");
        assert_eq!(removed.user_id(), 7);
    }
}

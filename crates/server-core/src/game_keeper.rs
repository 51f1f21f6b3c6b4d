//! Game keeper: single mutex around `games`/`next_id`, grounded on
//! `internal/gamekeeper.go`. `CreateGame` allocates an id, builds the
//! session with a fresh starting position and a 4-slot inbox, spawns its
//! actor task, and inserts it. Sessions are evicted at exit time under this
//! same lock (§9 "Game retention" — the source never prunes; this does).

use crate::collaborators::GamePersistence;
use crate::modes::Mode;
use crate::registry::Client;
use crate::session::{GameId, GameSession};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct Inner {
    games: HashMap<GameId, Arc<GameSession>>,
    next_id: GameId,
}

pub struct GameKeeper {
    inner: Mutex<Inner>,
    persistence: Arc<dyn GamePersistence>,
}

struct NullPersistence;

#[async_trait::async_trait]
impl GamePersistence for NullPersistence {
    async fn save_game(&self, _request: crate::collaborators::SaveGameRequest) -> Result<(), String> {
        Ok(())
    }
}

impl GameKeeper {
    pub fn new() -> Self {
        GameKeeper::with_persistence(Arc::new(NullPersistence))
    }

    pub fn with_persistence(persistence: Arc<dyn GamePersistence>) -> Self {
        GameKeeper { inner: Mutex::new(Inner { games: HashMap::new(), next_id: 1 }), persistence }
    }

    pub async fn create_game(self: &Arc<Self>, players: [Arc<Client>; 2], mode: Mode) -> Arc<GameSession> {
        let id = {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_id;
            inner.next_id += 1;
            id
        };

        let player_ids: Vec<u32> = players.iter().map(|p| p.user_id()).collect();
        tracing::info!(game_id = id, ?player_ids, "game created");

        let session = GameSession::spawn(id, players, mode, self.clone(), self.persistence.clone());
        self.inner.lock().unwrap().games.insert(id, session.clone());
        session
    }

    pub fn get_game(&self, id: GameId) -> Option<Arc<GameSession>> {
        self.inner.lock().unwrap().games.get(&id).cloned()
    }

    /// Called by a session at teardown so the map doesn't grow unbounded.
    pub fn evict(&self, id: GameId) {
        self.inner.lock().unwrap().games.remove(&id);
    }

    pub fn game_count(&self) -> usize {
        self.inner.lock().unwrap().games.len()
    }
}

impl Default for GameKeeper {
    fn default() -> Self {
        GameKeeper::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ClientRegistry;

    fn client(registry: &ClientRegistry, id: u32) -> Arc<Client> {
        registry.get_or_create(id)
    }

    #[tokio::test]
    async fn create_game_allocates_sequential_ids_and_spawns_a_session() {
        let registry = ClientRegistry::new();
        let keeper = Arc::new(GameKeeper::new());
        let a = client(&registry, 1);
        let b = client(&registry, 2);
        let first = keeper.create_game([a.clone(), b.clone()], Mode::Classic).await;
        let second = keeper.create_game([a, b], Mode::Classic).await;
        assert_eq!(first.id(), 1);
        assert_eq!(second.id(), 2);
        assert_eq!(keeper.game_count(), 2);
    }

    #[tokio::test]
    async fn get_game_returns_none_for_unknown_id() {
        let keeper = GameKeeper::new();
        assert!(keeper.get_game(999).is_none());
    }
}

//! `ServerContext`: the registry, game keeper, and per-mode matchmakers
//! bundled and passed explicitly at construction, per §9 "Global singletons"
//! — no hidden process-wide statics, unlike the Go source's package-level
//! `matchmakers`/`keeper`/`clients` variables.

use crate::buffer_pool::BufferPool;
use crate::collaborators::{GamePersistence, TokenValidator};
use crate::game_keeper::GameKeeper;
use crate::matchmaker::Matchmaker;
use crate::modes::{Mode, ALL_MODES};
use crate::registry::ClientRegistry;
use std::collections::HashMap;
use std::sync::Arc;

pub struct ServerContext {
    pub registry: Arc<ClientRegistry>,
    pub game_keeper: Arc<GameKeeper>,
    pub matchmakers: HashMap<Mode, Arc<Matchmaker>>,
    pub token_validator: Arc<dyn TokenValidator>,
    pub buffer_pool: Arc<BufferPool>,
}

impl ServerContext {
    /// Spawns one matchmaker per `Mode` and wires its `remove` sender into
    /// the registry's disconnect fan-out, mirroring `InitAllMatchmakers`.
    pub fn new(token_validator: Arc<dyn TokenValidator>, persistence: Arc<dyn GamePersistence>) -> Arc<ServerContext> {
        let registry = Arc::new(ClientRegistry::new());
        let game_keeper = Arc::new(GameKeeper::with_persistence(persistence));

        let mut matchmakers = HashMap::new();
        for mode in ALL_MODES {
            let (matchmaker, remove_tx) = Matchmaker::spawn(mode, game_keeper.clone());
            registry.register_matchmaker_remove_channel(remove_tx);
            matchmakers.insert(mode, matchmaker);
        }

        Arc::new(ServerContext {
            registry,
            game_keeper,
            matchmakers,
            token_validator,
            buffer_pool: Arc::new(BufferPool::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fakes::{AlwaysValid, RecordingPersistence};

    #[test]
    fn new_spawns_a_matchmaker_for_every_mode() {
        let ctx = ServerContext::new(Arc::new(AlwaysValid(1)), Arc::new(RecordingPersistence::default()));
        assert_eq!(ctx.matchmakers.len(), ALL_MODES.len());
        for mode in ALL_MODES {
            assert!(ctx.matchmakers.contains_key(&mode));
        }
    }
}

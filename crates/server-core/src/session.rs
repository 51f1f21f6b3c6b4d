//! Game session actor, grounded on `internal/gamekeeper.go`'s `GameSession`
//! and the event loop sketched in §4.5. Exactly one task owns `board`; all
//! mutation happens through `inbox`.

use crate::collaborators::{GamePersistence, MoveRecord, SaveGameRequest};
use crate::error::PersistenceError;
use crate::game_keeper::GameKeeper;
use crate::modes::Mode;
use crate::registry::Client;
use chess_core::{Board, Color, Move};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{Receiver, Sender};
use wire::{build_frame, server_cmds, GameStartedPayload};

pub type GameId = u32;

pub const INBOX_CAPACITY: usize = 4;

pub struct PlayerMove {
    pub from: i8,
    pub to: i8,
    pub promote_to: i8,
    pub player: Arc<Client>,
}

struct SessionState {
    board: Board,
    board_history: Vec<Board>,
    move_history: Vec<Move>,
}

pub struct GameSession {
    id: GameId,
    players: [Arc<Client>; 2],
    mode: Mode,
    inbox: Sender<PlayerMove>,
    /// Mirrors `state.board.white_to_move()` for lock-free reads from
    /// outside the session task (e.g. diagnostics); the session task is the
    /// sole writer.
    side_to_move_is_white: AtomicU8,
    state: Mutex<SessionState>,
}

impl GameSession {
    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn board_history_len(&self) -> usize {
        self.state.lock().unwrap().board_history.len()
    }

    pub fn move_history_len(&self) -> usize {
        self.state.lock().unwrap().move_history.len()
    }

    pub fn white_to_move(&self) -> bool {
        self.side_to_move_is_white.load(Ordering::Relaxed) != 0
    }

    pub fn inbox(&self) -> Sender<PlayerMove> {
        self.inbox.clone()
    }

    fn player_for_color(&self, color: Color) -> &Arc<Client> {
        match color {
            Color::White => &self.players[0],
            Color::Black => &self.players[1],
        }
    }

    pub fn spawn(
        id: GameId,
        players: [Arc<Client>; 2],
        mode: Mode,
        keeper: Arc<GameKeeper>,
        persistence: Arc<dyn GamePersistence>,
    ) -> Arc<GameSession> {
        let (tx, rx) = tokio::sync::mpsc::channel(INBOX_CAPACITY);
        let board = Board::new_starting_position();
        let session = Arc::new(GameSession {
            id,
            players,
            mode,
            inbox: tx,
            side_to_move_is_white: AtomicU8::new(1),
            state: Mutex::new(SessionState { board_history: vec![board.clone()], move_history: Vec::new(), board }),
        });

        send_game_started(&session);
        tokio::spawn(run(session.clone(), rx, keeper, persistence));
        session
    }
}

fn send_game_started(session: &Arc<GameSession>) {
    let payload = GameStartedPayload {
        mode: session.mode.code(),
        player_ids: session.players.iter().map(|p| p.user_id()).collect(),
        game_id: session.id,
    };
    let bytes = serde_json::to_vec(&payload).expect("GameStartedPayload is always serializable");
    let frame = build_frame(server_cmds::GAME_STARTED, &bytes);
    for player in &session.players {
        player.set_currently_playing(session.id);
        player.broadcast(&frame);
    }
}

fn send_invalid_move(player: &Arc<Client>) {
    let frame = build_frame(server_cmds::INVALID_MOVE, &[]);
    player.broadcast(&frame);
}

async fn run(
    session: Arc<GameSession>,
    mut inbox: Receiver<PlayerMove>,
    keeper: Arc<GameKeeper>,
    persistence: Arc<dyn GamePersistence>,
) {
    while let Some(mv) = inbox.recv().await {
        handle_move(&session, mv);

        let live_players = session.players.iter().filter(|p| p.conn_count() > 0).count();
        if live_players < 2 {
            save_and_exit(&session, &keeper, &persistence).await;
            break;
        }
    }
}

/// §4.5 steps 1-4: turn check, legality, apply, broadcast. Never touches
/// `move_history` on a rejected move (§9 "Move history on illegal inputs").
fn handle_move(session: &Arc<GameSession>, mv: PlayerMove) {
    let mut state = session.state.lock().unwrap();

    let side_to_move = state.board.side_to_move();
    if session.player_for_color(side_to_move).user_id() != mv.player.user_id() {
        drop(state);
        send_invalid_move(&mv.player);
        return;
    }

    let from = mv.from as u8;
    let to = mv.to as u8;
    let promote_to = mv.promote_to as u8;

    if mv.from < 0 || mv.to < 0 || !state.board.is_move_legal(from, to, promote_to) {
        drop(state);
        send_invalid_move(&mv.player);
        return;
    }

    let applied = state.board.make_move(from, to, promote_to).expect("is_move_legal already confirmed this move");
    state.move_history.push(applied);
    state.board_history.push(state.board.clone());
    session
        .side_to_move_is_white
        .store(state.board.white_to_move() as u8, Ordering::Relaxed);

    let frame = build_frame(
        server_cmds::MOVE_HAPPENED,
        &wire::message::encode_move_happened(mv.from, mv.to, mv.promote_to, session.id),
    );
    drop(state);
    for player in &session.players {
        player.broadcast(&frame);
    }
}

async fn save_and_exit(session: &Arc<GameSession>, keeper: &Arc<GameKeeper>, persistence: &Arc<dyn GamePersistence>) {
    let (board_history, move_history, pgn) = {
        let state = session.state.lock().unwrap();
        let board_history: Vec<Vec<u8>> = state.board_history.iter().map(|b| b.to_square_array().to_vec()).collect();
        let move_history: Vec<MoveRecord> = state
            .move_history
            .iter()
            .map(|m| MoveRecord { from: m.from as i32, to: m.to as i32, promotion: m.promotion as i32 })
            .collect();
        let pgn = Board::to_pgn(&state.move_history);
        (board_history, move_history, pgn)
    };

    let request = SaveGameRequest {
        game_id: session.id,
        white: session.players[0].user_id(),
        black: session.players[1].user_id(),
        board_history,
        move_history,
        pgn,
    };

    let outcome = match tokio::time::timeout(crate::collaborators::SAVE_GAME_DEADLINE, persistence.save_game(request)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(PersistenceError::Failed(err)),
        Err(_) => Err(PersistenceError::Timeout),
    };
    if let Err(err) = outcome {
        tracing::warn!(game_id = session.id, %err, "save-game did not complete");
    }

    for player in &session.players {
        player.clear_currently_playing();
    }
    keeper.evict(session.id);
}

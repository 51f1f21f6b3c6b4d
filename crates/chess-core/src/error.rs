use thiserror::Error;

/// Everything that can go wrong applying a move. None of these are fatal to
/// the process (§7) — callers turn them into an `InvalidMove` reply.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    #[error("square index out of range 0..63")]
    OutOfRange,
    #[error("source and destination square are the same")]
    NullMove,
    #[error("no piece of the side to move on the source square")]
    NoPieceToMove,
    #[error("destination square is occupied by a piece of the same color")]
    CapturesOwnPiece,
    #[error("move leaves the mover's king in check")]
    LeavesKingInCheck,
}

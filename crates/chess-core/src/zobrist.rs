//! Zobrist incremental hashing. Tables are seeded from a fixed constant so
//! hashes reproduce identically across processes (§4.2, §8).

use crate::board::Board;
use crate::types::{Color, PieceKind, PIECE_KINDS};
use std::sync::LazyLock;

/// Arbitrary but fixed seed — never change without accepting that saved
/// hashes from prior processes become incomparable.
const ZOBRIST_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

pub struct ZobristTables {
    pub pieces: [[[u64; 64]; 6]; 2],
    pub en_passant: [u64; 64],
    pub side_to_move: u64,
    pub castling: [u64; 16],
}

pub static ZOBRIST: LazyLock<ZobristTables> = LazyLock::new(ZobristTables::build);

/// Small deterministic splitmix64 stream so the table doesn't depend on any
/// platform RNG.
struct SplitMix64(u64);

impl SplitMix64 {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

impl ZobristTables {
    fn build() -> Self {
        let mut rng = SplitMix64(ZOBRIST_SEED);
        let mut pieces = [[[0u64; 64]; 6]; 2];
        for color in pieces.iter_mut() {
            for kind in color.iter_mut() {
                for sq in kind.iter_mut() {
                    *sq = rng.next();
                }
            }
        }
        let mut en_passant = [0u64; 64];
        for key in en_passant.iter_mut() {
            *key = rng.next();
        }
        let side_to_move = rng.next();
        let mut castling = [0u64; 16];
        for key in castling.iter_mut() {
            *key = rng.next();
        }
        ZobristTables {
            pieces,
            en_passant,
            side_to_move,
            castling,
        }
    }
}

/// Recomputes a board's hash from scratch by XOR-ing in the key for every
/// piece on the board plus the en passant, side-to-move, and castling-rights
/// keys.
///
/// `Board` otherwise maintains `hash` incrementally — every `place`/`remove`
/// and the en passant/castling/side-to-move toggles in
/// [`Board::apply_move_unchecked`](crate::board::Board) XOR in the same keys
/// this function would. `compute_hash` exists to seed
/// `Board::new_starting_position` and to verify the incremental hash never
/// drifts (`compute_hash(board) == board.hash` after every move in tests).
///
/// # Performance
///
/// O(32) in the worst case (one XOR per piece on the board), since it walks
/// every set bit in every piece bitboard. Not called on the per-move hot
/// path.
pub fn compute_hash(board: &Board) -> u64 {
    let mut hash = 0u64;
    for &color in &[Color::White, Color::Black] {
        for &kind in &PIECE_KINDS {
            let bb = board.piece_bb(color, kind);
            for sq in crate::bitboard::BitIter(bb) {
                hash ^= ZOBRIST.pieces[color.index()][kind.index()][sq as usize];
            }
        }
    }
    if board.en_passant_square >= 0 {
        hash ^= ZOBRIST.en_passant[board.en_passant_square as usize];
    }
    if !board.white_to_move() {
        hash ^= ZOBRIST.side_to_move;
    }
    hash ^= ZOBRIST.castling[(board.flags & crate::types::flags::CASTLING_MASK) as usize];
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;

    #[test]
    fn starting_position_hash_is_stable_across_processes() {
        // Since the table is seeded from a fixed constant, rebuilding a
        // second independent table must match the first bit-for-bit.
        let a = ZobristTables::build();
        let b = ZobristTables::build();
        assert_eq!(a.pieces, b.pieces);
        assert_eq!(a.en_passant, b.en_passant);
        assert_eq!(a.side_to_move, b.side_to_move);
        assert_eq!(a.castling, b.castling);
    }

    #[test]
    fn board_hash_matches_recompute_at_start() {
        let board = Board::new_starting_position();
        assert_eq!(board.hash, compute_hash(&board));
    }
}

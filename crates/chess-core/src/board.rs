//! `Board`: six piece bitboards per color plus incidental state (en passant
//! target, castling/side-to-move flags, clocks, incremental Zobrist hash).
//! Move application follows the nine-step algorithm in §4.2.

use crate::attacks::{
    bishop_attacks, king_attacks, knight_attacks, pawn_attacks_bb, pawn_pushes, queen_attacks,
    rook_attacks,
};
use crate::bitboard::{square_bb, BitIter, Bitboard, RANK_1, RANK_8};
use crate::castling::{between_mask_clear, castle_squares, detect_castle, CASTLING_RIGHTS_BY_SQUARE};
use crate::error::MoveError;
use crate::types::{flags, Color, Move, PieceKind, PIECE_KINDS};
use crate::zobrist::ZOBRIST;

/// A chess position: per-color, per-kind piece bitboards plus the
/// incidental state needed to apply a move — en passant target, castling
/// rights, side to move, clocks — and an incrementally maintained Zobrist
/// hash.
///
/// ## Memory Layout
///
/// `bitboards` is `[color][kind]`, each a `u64` with bit `i` set when a
/// piece of that color/kind occupies square `i` (0 = a1, 63 = h8, row-major).
/// `occupancy` caches the union per color so movegen doesn't have to fold
/// six bitboards together on every call.
#[derive(Debug, Clone)]
pub struct Board {
    /// `bitboards[color][kind]`
    bitboards: [[Bitboard; 6]; 2],
    pub occupancy: [Bitboard; 2],
    pub hash: u64,
    /// -1 when no en passant capture is available this ply.
    pub en_passant_square: i8,
    /// bits 0..3 castling rights, bit 4 side to move (1 = White).
    pub flags: u8,
    pub halfmove_clock: u8,
    pub fullmove_number: u16,
}

impl Board {
    pub fn new_starting_position() -> Board {
        let mut bitboards = [[0u64; 6]; 2];
        bitboards[Color::White.index()][PieceKind::Pawn.index()] = RANK_1 << 8;
        bitboards[Color::White.index()][PieceKind::Rook.index()] = square_bb(0) | square_bb(7);
        bitboards[Color::White.index()][PieceKind::Knight.index()] = square_bb(1) | square_bb(6);
        bitboards[Color::White.index()][PieceKind::Bishop.index()] = square_bb(2) | square_bb(5);
        bitboards[Color::White.index()][PieceKind::Queen.index()] = square_bb(3);
        bitboards[Color::White.index()][PieceKind::King.index()] = square_bb(4);

        bitboards[Color::Black.index()][PieceKind::Pawn.index()] = RANK_8 >> 8;
        bitboards[Color::Black.index()][PieceKind::Rook.index()] = square_bb(56) | square_bb(63);
        bitboards[Color::Black.index()][PieceKind::Knight.index()] = square_bb(57) | square_bb(62);
        bitboards[Color::Black.index()][PieceKind::Bishop.index()] = square_bb(58) | square_bb(61);
        bitboards[Color::Black.index()][PieceKind::Queen.index()] = square_bb(59);
        bitboards[Color::Black.index()][PieceKind::King.index()] = square_bb(60);

        let occupancy = [
            bitboards[Color::White.index()].iter().fold(0, |a, b| a | b),
            bitboards[Color::Black.index()].iter().fold(0, |a, b| a | b),
        ];

        let mut board = Board {
            bitboards,
            occupancy,
            hash: 0,
            en_passant_square: -1,
            flags: flags::CASTLING_MASK | flags::WHITE_TO_MOVE,
            halfmove_clock: 0,
            fullmove_number: 1,
        };
        board.hash = crate::zobrist::compute_hash(&board);
        board
    }

    #[inline]
    pub fn piece_bb(&self, color: Color, kind: PieceKind) -> Bitboard {
        self.bitboards[color.index()][kind.index()]
    }

    #[inline]
    pub fn white_to_move(&self) -> bool {
        self.flags & flags::WHITE_TO_MOVE != 0
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        if self.white_to_move() {
            Color::White
        } else {
            Color::Black
        }
    }

    fn kind_at(&self, color: Color, sq: u8) -> Option<PieceKind> {
        let bb = square_bb(sq);
        PIECE_KINDS
            .iter()
            .copied()
            .find(|&kind| self.bitboards[color.index()][kind.index()] & bb != 0)
    }

    fn place(&mut self, color: Color, kind: PieceKind, sq: u8) {
        self.bitboards[color.index()][kind.index()] |= square_bb(sq);
        self.occupancy[color.index()] |= square_bb(sq);
        self.hash ^= ZOBRIST.pieces[color.index()][kind.index()][sq as usize];
    }

    fn remove(&mut self, color: Color, kind: PieceKind, sq: u8) {
        self.bitboards[color.index()][kind.index()] &= !square_bb(sq);
        self.occupancy[color.index()] &= !square_bb(sq);
        self.hash ^= ZOBRIST.pieces[color.index()][kind.index()][sq as usize];
    }

    /// Destinations the piece on `from` could move to on the current
    /// occupancy, ignoring whether the move leaves the mover's own king in
    /// check. Does not include castling hops — `is_move_legal` checks those
    /// separately.
    fn pseudo_legal_destinations(&self, color: Color, kind: PieceKind, from: u8) -> Bitboard {
        let own = self.occupancy[color.index()];
        let occ = self.occupancy[0] | self.occupancy[1];
        let enemy = self.occupancy[color.opposite().index()];

        match kind {
            PieceKind::Knight => knight_attacks(from) & !own,
            PieceKind::King => king_attacks(from) & !own,
            PieceKind::Bishop => bishop_attacks(from, occ) & !own,
            PieceKind::Rook => rook_attacks(from, occ) & !own,
            PieceKind::Queen => queen_attacks(from, occ) & !own,
            PieceKind::Pawn => {
                let bb = square_bb(from);
                let empty = !occ;
                let (single, double) = pawn_pushes(bb, empty, color);
                let mut captures = pawn_attacks_bb(bb, color) & enemy;
                if self.en_passant_square >= 0 {
                    captures |= pawn_attacks_bb(bb, color) & square_bb(self.en_passant_square as u8);
                }
                single | double | captures
            }
        }
    }

    /// Checks whether `from -> to` (with `promote_to` applying only to a
    /// pawn reaching the back rank) is a fully legal move for the side to
    /// move, per §4.2.
    ///
    /// ## Algorithm
    ///
    /// 1. Reject out-of-range or null (`from == to`) moves.
    /// 2. Find the moving piece; reject if there is none on `from`, or if
    ///    `to` holds a piece of the same color.
    /// 3. For a king move matching a castle pattern, check castling rights,
    ///    that the path between king and rook is empty, and that no square
    ///    the king passes through (including its start and destination) is
    ///    attacked — castling's extra through-check rule has no equivalent
    ///    for any other piece.
    /// 4. Otherwise require `to` to be one of the piece's pseudo-legal
    ///    destinations on the current occupancy.
    /// 5. Clone the board, apply the move, and confirm the mover's own king
    ///    is not attacked afterward — this is what rules out moving a
    ///    pinned piece or leaving the king in check.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let board = Board::new_starting_position();
    /// assert!(board.is_move_legal(12, 28, 0)); // e2e4
    /// assert!(!board.is_move_legal(12, 44, 0)); // e2e6, not a legal pawn move
    /// ```
    pub fn is_move_legal(&self, from: u8, to: u8, promote_to: u8) -> bool {
        if from > 63 || to > 63 || from == to {
            return false;
        }
        let mover = self.side_to_move();
        let Some(kind) = self.kind_at(mover, from) else {
            return false;
        };
        if self.occupancy[mover.index()] & square_bb(to) != 0 {
            return false;
        }

        if kind == PieceKind::King {
            if let Some(side) = detect_castle(from, to) {
                if !self.can_castle(mover, side) {
                    return false;
                }
                let mut clone = self.clone();
                clone.apply_move_unchecked(from, to, promote_to);
                let king_sq = clone.piece_bb(mover, PieceKind::King).trailing_zeros() as u8;
                return !crate::attacks::is_square_attacked(king_sq, &clone, mover.opposite());
            }
        }

        if self.pseudo_legal_destinations(mover, kind, from) & square_bb(to) == 0 {
            return false;
        }

        let mut clone = self.clone();
        clone.apply_move_unchecked(from, to, promote_to);
        let king_sq = clone.piece_bb(mover, PieceKind::King).trailing_zeros() as u8;
        !crate::attacks::is_square_attacked(king_sq, &clone, mover.opposite())
    }

    fn can_castle(&self, color: Color, side: crate::castling::CastleSide) -> bool {
        let squares = castle_squares(color, side);
        if self.flags & squares.rights_bit == 0 {
            return false;
        }
        let occ = self.occupancy[0] | self.occupancy[1];
        if !between_mask_clear(&squares.king_path, occ, squares.rook_from) {
            return false;
        }
        let opponent = color.opposite();
        !squares
            .king_path
            .iter()
            .any(|&sq| crate::attacks::is_square_attacked(sq, self, opponent))
    }

    /// Validates and applies a move, independent of whether the caller ran
    /// `is_move_legal` first: bounds, piece presence, and own-piece capture
    /// are re-checked here, and a move that leaves the mover's own king in
    /// check is rejected without mutating `self`.
    ///
    /// Does not itself check whether `to` is one of `from`'s pseudo-legal
    /// destinations or validate castling's through-check rule — callers
    /// that want those checks should run `is_move_legal` first, since by
    /// the time `make_move` runs it only guards against the checks cheap
    /// enough to repeat unconditionally.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let mut board = Board::new_starting_position();
    /// let mv = board.make_move(12, 28, 0).unwrap(); // e2e4
    /// assert_eq!(mv.to, 28);
    /// ```
    pub fn make_move(&mut self, from: u8, to: u8, promote_to: u8) -> Result<Move, MoveError> {
        if from > 63 || to > 63 {
            return Err(MoveError::OutOfRange);
        }
        if from == to {
            return Err(MoveError::NullMove);
        }
        let mover = self.side_to_move();
        if self.kind_at(mover, from).is_none() {
            return Err(MoveError::NoPieceToMove);
        }
        if self.occupancy[mover.index()] & square_bb(to) != 0 {
            return Err(MoveError::CapturesOwnPiece);
        }

        let mut applied = self.clone();
        applied.apply_move_unchecked(from, to, promote_to);
        let king_sq = applied.piece_bb(mover, PieceKind::King).trailing_zeros() as u8;
        if crate::attacks::is_square_attacked(king_sq, &applied, mover.opposite()) {
            return Err(MoveError::LeavesKingInCheck);
        }

        *self = applied;
        Ok(Move { from, to, promotion: promote_to })
    }

    fn apply_move_unchecked(&mut self, from: u8, to: u8, promote_to: u8) {
        let mover = self.side_to_move();
        let opponent = mover.opposite();
        let moving_kind = self.kind_at(mover, from).expect("caller validated moving piece");
        let captured_kind = self.kind_at(opponent, to);

        // step 2: XOR out stale en passant and castling keys up front.
        if self.en_passant_square >= 0 {
            self.hash ^= ZOBRIST.en_passant[self.en_passant_square as usize];
        }
        self.hash ^= ZOBRIST.castling[(self.flags & flags::CASTLING_MASK) as usize];

        self.remove(mover, moving_kind, from);
        if let Some(captured) = captured_kind {
            self.remove(opponent, captured, to);
        }

        // step 3: en passant capture removes a pawn one rank behind `to`.
        let is_en_passant_capture = moving_kind == PieceKind::Pawn
            && captured_kind.is_none()
            && self.en_passant_square >= 0
            && to == self.en_passant_square as u8;
        if is_en_passant_capture {
            let captured_sq = match mover {
                Color::White => to - 8,
                Color::Black => to + 8,
            };
            self.remove(opponent, PieceKind::Pawn, captured_sq);
        }

        // step 4: place the final piece at `to`, applying promotion.
        let promotes = moving_kind == PieceKind::Pawn
            && ((mover == Color::White && to / 8 == 7) || (mover == Color::Black && to / 8 == 0));
        let final_kind = if promotes {
            PieceKind::from_promotion_code(promote_to as i8).unwrap_or(PieceKind::Pawn)
        } else {
            moving_kind
        };
        self.place(mover, final_kind, to);

        // castling rook hop.
        if moving_kind == PieceKind::King {
            if let Some(side) = detect_castle(from, to) {
                let squares = castle_squares(mover, side);
                self.remove(mover, PieceKind::Rook, squares.rook_from);
                self.place(mover, PieceKind::Rook, squares.rook_to);
            }
        }

        // step 5: new en passant target on a double pawn push.
        let new_ep = if moving_kind == PieceKind::Pawn && (to as i16 - from as i16).abs() == 16 {
            ((from as i16 + to as i16) / 2) as i8
        } else {
            -1
        };
        self.en_passant_square = new_ep;
        if new_ep >= 0 {
            self.hash ^= ZOBRIST.en_passant[new_ep as usize];
        }

        // step 7: castling rights decay.
        let table = &CASTLING_RIGHTS_BY_SQUARE;
        let kept = (self.flags & flags::CASTLING_MASK) & table[from as usize] & table[to as usize];
        self.flags = (self.flags & !flags::CASTLING_MASK) | (kept & flags::CASTLING_MASK);
        self.hash ^= ZOBRIST.castling[(self.flags & flags::CASTLING_MASK) as usize];

        // step 8: toggle side to move.
        self.flags ^= flags::WHITE_TO_MOVE;
        self.hash ^= ZOBRIST.side_to_move;

        // step 9: clocks.
        let was_capture = captured_kind.is_some() || is_en_passant_capture;
        if moving_kind == PieceKind::Pawn || was_capture {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }
        if mover == Color::Black {
            self.fullmove_number += 1;
        }
    }

    /// Flat 64-entry board snapshot for diagnostics and the `GameState` wire
    /// payload: 0 = empty, white pieces 1..6, black pieces 9..14
    /// (`kind + 1 + color*8`), per §4.2.
    pub fn to_square_array(&self) -> [u8; 64] {
        let mut squares = [0u8; 64];
        for &color in &[Color::White, Color::Black] {
            for &kind in &PIECE_KINDS {
                for sq in BitIter(self.piece_bb(color, kind)) {
                    squares[sq as usize] = (kind.index() as u8) + 1 + (color.index() as u8) * 8;
                }
            }
        }
        squares
    }

    /// Renders `move_history` as `"N. fromsq tosq[promo] …"` pairs, per §4.2:
    /// each move number prefixes White's move, followed by Black's reply if
    /// one exists.
    pub fn to_pgn(move_history: &[Move]) -> String {
        let rendered = |mv: &Move| {
            let from = square_name(mv.from);
            let to = square_name(mv.to);
            match PieceKind::from_promotion_code(mv.promotion as i8) {
                Some(promo) => format!("{from}{to}{promo}"),
                None => format!("{from}{to}"),
            }
        };
        move_history
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| match pair {
                [white, black] => format!("{}. {} {}", i + 1, rendered(white), rendered(black)),
                [white] => format!("{}. {}", i + 1, rendered(white)),
                _ => unreachable!("chunks(2) never yields more than 2"),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn square_name(sq: u8) -> String {
    let file = (b'a' + crate::bitboard::file_of(sq)) as char;
    let rank = (b'1' + crate::bitboard::rank_of(sq)) as char;
    format!("{file}{rank}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_has_thirty_two_pieces() {
        let board = Board::new_starting_position();
        let total: u32 = (board.occupancy[0] | board.occupancy[1]).count_ones();
        assert_eq!(total, 32);
        assert!(board.white_to_move());
    }

    #[test]
    fn white_opens_with_e4_and_sets_en_passant_square() {
        let mut board = Board::new_starting_position();
        assert!(board.is_move_legal(12, 28, 0)); // e2e4
        let mv = board.make_move(12, 28, 0).unwrap();
        assert_eq!(mv, Move { from: 12, to: 28, promotion: 0 });
        assert_eq!(board.en_passant_square, 20); // e3
        assert!(!board.white_to_move());
    }

    #[test]
    fn rook_blocked_by_own_pawn_is_illegal() {
        let board = Board::new_starting_position();
        assert!(!board.is_move_legal(0, 16, 0)); // a1 rook through a2 pawn
    }

    #[test]
    fn cannot_capture_own_piece() {
        let board = Board::new_starting_position();
        assert!(!board.is_move_legal(0, 8, 0)); // a1 rook onto a2, own pawn
    }

    #[test]
    fn hash_matches_recompute_after_a_move() {
        let mut board = Board::new_starting_position();
        board.make_move(12, 28, 0).unwrap(); // e2e4
        assert_eq!(board.hash, crate::zobrist::compute_hash(&board));
    }

    #[test]
    fn castling_requires_empty_path_and_safe_transit() {
        let mut board = Board::new_starting_position();
        // clear b1,c1,d1 to allow white queenside castling.
        for sq in [1u8, 2, 3] {
            if let Some(kind) = board.kind_at(Color::White, sq) {
                board.remove(Color::White, kind, sq);
            }
        }
        assert!(board.is_move_legal(4, 2, 0)); // e1c1
        let mv = board.make_move(4, 2, 0).unwrap();
        assert_eq!(mv.to, 2);
        assert_eq!(board.piece_bb(Color::White, PieceKind::Rook) & square_bb(3), square_bb(3));
        assert_eq!(board.flags & flags::WHITE_KINGSIDE, 0);
        assert_eq!(board.flags & flags::WHITE_QUEENSIDE, 0);
    }

    #[test]
    fn to_square_array_round_trips_piece_positions() {
        let board = Board::new_starting_position();
        let squares = board.to_square_array();
        assert_eq!(squares[0], PieceKind::Rook.index() as u8 + 1); // a1 white rook
        assert_eq!(squares[63], PieceKind::Rook.index() as u8 + 9); // h8 black rook
        assert_eq!(squares[27], 0); // d4 empty
    }

    #[test]
    fn to_pgn_renders_numbered_move_pairs() {
        let moves = [
            Move { from: 12, to: 28, promotion: 0 }, // e2e4
            Move { from: 52, to: 36, promotion: 0 }, // e7e5
        ];
        assert_eq!(Board::to_pgn(&moves), "1. e2e4 e7e5");
    }

    #[test]
    fn to_pgn_renders_trailing_unanswered_move() {
        let moves = [Move { from: 12, to: 28, promotion: 0 }];
        assert_eq!(Board::to_pgn(&moves), "1. e2e4");
    }

    #[test]
    fn make_move_rejects_a_move_that_leaves_the_king_in_check_without_a_precheck() {
        // Bare white king on d1 with its own rook on d2 pinned by a black
        // rook on d8: moving the d2 rook off the d-file exposes the king.
        let mut board = Board::new_starting_position();
        for sq in 0u8..64 {
            if let Some(kind) = board.kind_at(Color::White, sq) {
                board.remove(Color::White, kind, sq);
            }
            if let Some(kind) = board.kind_at(Color::Black, sq) {
                board.remove(Color::Black, kind, sq);
            }
        }
        board.place(Color::White, PieceKind::King, 3); // d1
        board.place(Color::White, PieceKind::Rook, 11); // d2
        board.place(Color::Black, PieceKind::Rook, 59); // d8
        board.place(Color::Black, PieceKind::King, 63); // h8, keep a black king on the board

        assert!(!board.is_move_legal(11, 12, 0)); // d2e2 walks the rook off the pin
        let err = board.make_move(11, 12, 0).unwrap_err();
        assert_eq!(err, MoveError::LeavesKingInCheck);
    }
}

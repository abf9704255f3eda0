use log::warn;

use crate::error::BoardError;
use crate::game::piece::{CastleRights, Color, Piece, PieceKind, Square};

/// Deep copy of the live pieces, compared field by field (flags included)
/// for repetition counting.
pub type Snapshot = Vec<Piece>;

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// What `apply_move` did besides relocating the mover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveEffect {
    pub captured: Option<Piece>,
    pub castled: bool,
}

/// Live pieces plus everything captured so far. There is no grid; occupancy
/// is resolved by scanning the live set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pieces: Vec<Piece>,
    captured: Vec<Piece>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Standard starting position.
    pub fn new() -> Self {
        let mut pieces = Vec::with_capacity(32);
        for color in [Color::Black, Color::White] {
            let home = color.home_rank();
            let pawn_rank = (home as i8 + color.forward()) as u8;
            for x in 0..8 {
                pieces.push(Piece::new(PieceKind::Pawn, color, x, pawn_rank));
            }
            for (x, kind) in BACK_RANK.iter().enumerate() {
                pieces.push(Piece::new(*kind, color, x as u8, home));
            }
        }
        Board {
            pieces,
            captured: Vec::new(),
        }
    }

    /// An empty board, for composing test and puzzle positions.
    pub fn empty() -> Self {
        Board {
            pieces: Vec::new(),
            captured: Vec::new(),
        }
    }

    /// Build a board from an explicit piece list.
    pub fn from_pieces(pieces: Vec<Piece>) -> Self {
        Board {
            pieces,
            captured: Vec::new(),
        }
    }

    /// Place a piece, replacing whatever stood on its square.
    pub fn place(&mut self, piece: Piece) {
        self.pieces.retain(|p| p.square != piece.square);
        self.pieces.push(piece);
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn captured(&self) -> &[Piece] {
        &self.captured
    }

    pub fn piece_at(&self, square: Square) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.square == square)
    }

    pub fn piece_at_mut(&mut self, square: Square) -> Option<&mut Piece> {
        self.pieces.iter_mut().find(|p| p.square == square)
    }

    pub fn find(&self, kind: PieceKind, color: Color) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.kind == kind && p.color == color)
    }

    fn find_mut(&mut self, kind: PieceKind, color: Color) -> Option<&mut Piece> {
        self.pieces.iter_mut().find(|p| p.kind == kind && p.color == color)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.pieces.clone()
    }

    /// Copy of the live pieces only, for trying out candidate moves.
    pub fn hypothetical(&self) -> Board {
        Board::from_pieces(self.pieces.clone())
    }

    pub(crate) fn capture(&mut self, square: Square) -> Option<Piece> {
        let index = self.pieces.iter().position(|p| p.square == square)?;
        let piece = self.pieces.remove(index);
        self.captured.push(piece);
        Some(piece)
    }

    /// Move the piece on `from` to `to`, with all side effects: rook
    /// relocation and rights bookkeeping for castling, en-passant and regular
    /// captures, and en-passant flag maintenance.
    ///
    /// The move is assumed legal. Only a missing mover or an off-board
    /// destination is rejected.
    pub fn apply_move(&mut self, from: Square, to: Square) -> Result<MoveEffect, BoardError> {
        if !to.is_on_board() {
            return Err(BoardError::OffBoard(to));
        }
        let mover = *self.piece_at(from).ok_or(BoardError::EmptySquare(from))?;
        let dx = to.x as i8 - from.x as i8;
        let dy = to.y as i8 - from.y as i8;
        let mut effect = MoveEffect::default();

        if mover.kind == PieceKind::King {
            if dx.abs() == 2 {
                let (rook_from, rook_to) = if dx > 0 {
                    (to.offset(1, 0), to.offset(-1, 0))
                } else {
                    (to.offset(-2, 0), to.offset(1, 0))
                };
                let rook = rook_from.zip(rook_to).and_then(|(rook_from, rook_to)| {
                    self.piece_at_mut(rook_from).map(|rook| rook.square = rook_to)
                });
                if rook.is_none() {
                    warn!("castling from {} to {} without a rook to relocate", from, to);
                }
                effect.castled = true;
            }
            if let Some(king) = self.piece_at_mut(from) {
                king.castle = Some(CastleRights::NONE);
            }
        }

        if mover.kind == PieceKind::Rook && from.y == mover.color.home_rank() {
            if let Some(rights) = self.find_mut(PieceKind::King, mover.color).and_then(|k| k.castle.as_mut()) {
                match from.x {
                    0 => rights.queenside = false,
                    7 => rights.kingside = false,
                    _ => {}
                }
            }
        }

        if mover.kind == PieceKind::Pawn && dx.abs() == 1 && dy.abs() == 1 && self.piece_at(to).is_none() {
            effect.captured = self.capture(Square::new(to.x, from.y));
        }

        if let Some(taken) = self.capture(to) {
            effect.captured = Some(taken);
        }

        for piece in self.pieces.iter_mut() {
            piece.en_passantable = false;
        }

        if let Some(piece) = self.piece_at_mut(from) {
            piece.en_passantable = piece.kind == PieceKind::Pawn && dy.abs() == 2;
            piece.square = to;
        }

        Ok(effect)
    }

    /// Set the kind of the piece on `square`, keeping its identity.
    pub fn promote(&mut self, square: Square, kind: PieceKind) -> Result<(), BoardError> {
        let piece = self.piece_at_mut(square).ok_or(BoardError::EmptySquare(square))?;
        piece.kind = kind;
        Ok(())
    }

    /// Text diagram with rank 8 on top, for logs and the terminal front end.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for y in 0..8u8 {
            out.push_str(&format!("{} ", 8 - y));
            for x in 0..8u8 {
                let symbol = self.piece_at(Square::new(x, y)).map(|p| p.symbol()).unwrap_or('.');
                out.push(symbol);
                out.push(' ');
            }
            out.push('\n');
        }
        out.push_str("  a b c d e f g h\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(text: &str) -> Square {
        Square::parse(text).unwrap()
    }

    fn kings() -> Board {
        Board::from_pieces(vec![
            Piece::new(PieceKind::King, Color::White, 4, 7),
            Piece::new(PieceKind::King, Color::Black, 4, 0),
        ])
    }

    #[test]
    fn starting_position_has_thirty_two_pieces() {
        let board = Board::new();
        assert_eq!(board.pieces().len(), 32);
        assert_eq!(board.piece_at(sq("e1")).map(|p| (p.kind, p.color)), Some((PieceKind::King, Color::White)));
        assert_eq!(board.piece_at(sq("d8")).map(|p| (p.kind, p.color)), Some((PieceKind::Queen, Color::Black)));
        assert!(board.piece_at(sq("e4")).is_none());
    }

    #[test]
    fn kingside_castle_moves_rook_to_crossed_square() {
        let mut board = kings();
        board.place(Piece::new(PieceKind::Rook, Color::White, 7, 7));
        let effect = board.apply_move(sq("e1"), sq("g1")).unwrap();
        assert!(effect.castled);
        assert_eq!(board.piece_at(sq("f1")).map(|p| p.kind), Some(PieceKind::Rook));
        assert!(board.piece_at(sq("h1")).is_none());
        assert_eq!(board.find(PieceKind::King, Color::White).unwrap().castle, Some(CastleRights::NONE));
    }

    #[test]
    fn queenside_castle_moves_rook_to_crossed_square() {
        let mut board = kings();
        board.place(Piece::new(PieceKind::Rook, Color::Black, 0, 0));
        board.apply_move(sq("e8"), sq("c8")).unwrap();
        assert_eq!(board.piece_at(sq("d8")).map(|p| p.kind), Some(PieceKind::Rook));
        assert_eq!(board.piece_at(sq("c8")).map(|p| p.kind), Some(PieceKind::King));
    }

    #[test]
    fn single_king_step_clears_both_rights() {
        let mut board = kings();
        board.apply_move(sq("e1"), sq("e2")).unwrap();
        assert_eq!(board.find(PieceKind::King, Color::White).unwrap().castle, Some(CastleRights::NONE));
        assert_eq!(board.find(PieceKind::King, Color::Black).unwrap().castle, Some(CastleRights::BOTH));
    }

    #[test]
    fn rook_move_clears_matching_right_only() {
        let mut board = kings();
        board.place(Piece::new(PieceKind::Rook, Color::White, 0, 7));
        board.place(Piece::new(PieceKind::Rook, Color::White, 7, 7));
        board.apply_move(sq("a1"), sq("a4")).unwrap();
        let rights = board.find(PieceKind::King, Color::White).unwrap().castle.unwrap();
        assert!(!rights.queenside);
        assert!(rights.kingside);

        board.apply_move(sq("h1"), sq("h2")).unwrap();
        let rights = board.find(PieceKind::King, Color::White).unwrap().castle.unwrap();
        assert!(!rights.kingside);
    }

    #[test]
    fn en_passant_removes_the_passed_pawn() {
        let mut board = kings();
        board.place(Piece::new(PieceKind::Pawn, Color::White, 4, 3));
        board.place(Piece::new(PieceKind::Pawn, Color::Black, 3, 1));
        board.apply_move(sq("d7"), sq("d5")).unwrap();
        assert!(board.piece_at(sq("d5")).unwrap().en_passantable);

        let effect = board.apply_move(sq("e5"), sq("d6")).unwrap();
        assert_eq!(effect.captured.map(|p| p.square), Some(sq("d5")));
        assert!(board.piece_at(sq("d5")).is_none());
        assert_eq!(board.captured().len(), 1);
    }

    #[test]
    fn en_passant_flag_is_cleared_by_the_next_move() {
        let mut board = Board::new();
        board.apply_move(sq("e2"), sq("e4")).unwrap();
        assert!(board.piece_at(sq("e4")).unwrap().en_passantable);
        board.apply_move(sq("g8"), sq("f6")).unwrap();
        assert!(board.pieces().iter().all(|p| !p.en_passantable));
    }

    #[test]
    fn capture_moves_victim_to_captured_list() {
        let mut board = kings();
        board.place(Piece::new(PieceKind::Queen, Color::White, 3, 7));
        board.place(Piece::new(PieceKind::Knight, Color::Black, 3, 2));
        let effect = board.apply_move(sq("d1"), sq("d6")).unwrap();
        assert_eq!(effect.captured.map(|p| p.kind), Some(PieceKind::Knight));
        assert_eq!(board.pieces().len(), 3);
        assert_eq!(board.piece_at(sq("d6")).map(|p| p.color), Some(Color::White));
    }

    #[test]
    fn missing_mover_is_rejected() {
        let mut board = Board::new();
        assert_eq!(board.apply_move(sq("e4"), sq("e5")), Err(BoardError::EmptySquare(sq("e4"))));
        assert_eq!(
            board.apply_move(sq("e2"), Square::new(4, 9)),
            Err(BoardError::OffBoard(Square::new(4, 9)))
        );
    }
}

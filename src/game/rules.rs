//! Move legality and check detection.
//!
//! Everything here is a pure function of a [`Board`]; pieces hold no
//! reference back to the board they stand on.

use crate::game::board::Board;
use crate::game::piece::{Color, Piece, PieceKind, Square};

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// A move that passed self-check filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LegalMove {
    pub from: Square,
    pub to: Square,
}

impl LegalMove {
    pub fn is_castle(&self, board: &Board) -> bool {
        board.piece_at(self.from).map(|p| p.kind) == Some(PieceKind::King)
            && (self.to.x as i8 - self.from.x as i8).abs() == 2
    }
}

/// True when every square strictly between `from` and `to` is empty. The
/// caller guarantees the two squares share a rank, file or diagonal.
fn ray_is_clear(board: &Board, from: Square, to: Square) -> bool {
    let step_x = (to.x as i8 - from.x as i8).signum();
    let step_y = (to.y as i8 - from.y as i8).signum();
    let mut current = from;
    loop {
        current = match current.offset(step_x, step_y) {
            Some(next) => next,
            None => return false,
        };
        if current == to {
            return true;
        }
        if board.piece_at(current).is_some() {
            return false;
        }
    }
}

fn pawn_can_reach(pawn: &Piece, to: Square, board: &Board) -> bool {
    let from = pawn.square;
    let forward = pawn.color.forward();
    let dx = to.x as i8 - from.x as i8;
    let dy = to.y as i8 - from.y as i8;
    let target = board.piece_at(to);

    if dx == 0 && dy == forward {
        return target.is_none();
    }
    if dx == 0 && dy == 2 * forward {
        let start_rank = (pawn.color.home_rank() as i8 + forward) as u8;
        let passed = from.offset(0, forward);
        return from.y == start_rank
            && target.is_none()
            && passed.map_or(false, |sq| board.piece_at(sq).is_none());
    }
    if dx.abs() == 1 && dy == forward {
        if let Some(victim) = target {
            return victim.color != pawn.color;
        }
        return board.piece_at(Square::new(to.x, from.y)).map_or(false, |passed| {
            passed.kind == PieceKind::Pawn && passed.color != pawn.color && passed.en_passantable
        });
    }
    false
}

/// One step in any direction, or a castle two files along the home rank.
/// Castling looks only at the squares strictly between king and
/// destination; an enemy on the destination is captured like any other
/// occupant. The rook must still be on its corner, since `apply_move`
/// relocates whatever stands there.
fn king_can_reach(king: &Piece, to: Square, board: &Board) -> bool {
    let from = king.square;
    let dx = to.x as i8 - from.x as i8;
    let dy = to.y as i8 - from.y as i8;
    if dx.abs() <= 1 && dy.abs() <= 1 {
        return true;
    }
    if dy != 0 || dx.abs() != 2 {
        return false;
    }
    let rights = match king.castle {
        Some(rights) => rights,
        None => return false,
    };
    let (allowed, corner) = if dx > 0 {
        (rights.kingside, Square::new(7, from.y))
    } else {
        (rights.queenside, Square::new(0, from.y))
    };
    let rook_home = board
        .piece_at(corner)
        .map_or(false, |rook| rook.kind == PieceKind::Rook && rook.color == king.color);
    allowed && rook_home && ray_is_clear(board, from, to)
}

/// Geometry and occupancy rules for one piece, ignoring whether the move
/// would leave its own king in check.
pub fn is_pseudo_legal(piece: &Piece, to: Square, board: &Board) -> bool {
    if !to.is_on_board() || to == piece.square {
        return false;
    }
    if board.piece_at(to).map_or(false, |occupant| occupant.color == piece.color) {
        return false;
    }
    let from = piece.square;
    let dx = to.x as i8 - from.x as i8;
    let dy = to.y as i8 - from.y as i8;
    let straight = dx == 0 || dy == 0;
    let diagonal = dx.abs() == dy.abs();

    match piece.kind {
        PieceKind::Pawn => pawn_can_reach(piece, to, board),
        PieceKind::Rook => straight && ray_is_clear(board, from, to),
        PieceKind::Bishop => diagonal && ray_is_clear(board, from, to),
        PieceKind::Queen => (straight || diagonal) && ray_is_clear(board, from, to),
        PieceKind::Knight => KNIGHT_OFFSETS.contains(&(dx, dy)),
        PieceKind::King => king_can_reach(piece, to, board),
    }
}

/// True when some opposing piece could move onto `color`'s king. A board
/// with no king of that color is never in check.
pub fn is_in_check(color: Color, board: &Board) -> bool {
    let king = match board.find(PieceKind::King, color) {
        Some(king) => king.square,
        None => return false,
    };
    board
        .pieces()
        .iter()
        .filter(|p| p.color != color)
        .any(|p| is_pseudo_legal(p, king, board))
}

fn pseudo_legal_moves(color: Color, board: &Board) -> Vec<LegalMove> {
    board
        .pieces()
        .iter()
        .filter(|p| p.color == color)
        .flat_map(|piece| {
            Square::all()
                .filter(move |to| is_pseudo_legal(piece, *to, board))
                .map(move |to| LegalMove { from: piece.square, to })
        })
        .collect()
}

/// A castling king may not start in, pass through, or land in check. The
/// three squares are tried in that order on a copy of the board.
fn castle_path_is_safe(candidate: &LegalMove, color: Color, board: &Board) -> bool {
    let mut trial = board.hypothetical();
    if is_in_check(color, &trial) {
        return false;
    }
    trial.capture(candidate.to);
    let crossed = Square::new((candidate.from.x + candidate.to.x) / 2, candidate.from.y);
    let mut at = candidate.from;
    for waypoint in [crossed, candidate.to] {
        if let Some(king) = trial.piece_at_mut(at) {
            king.square = waypoint;
        }
        at = waypoint;
        if is_in_check(color, &trial) {
            return false;
        }
    }
    true
}

/// Every legal move for `color`: pseudo-legal candidates that do not leave
/// the mover's king in check on a hypothetical copy of the board.
pub fn legal_moves(color: Color, board: &Board) -> Vec<LegalMove> {
    pseudo_legal_moves(color, board)
        .into_iter()
        .filter(|candidate| {
            if candidate.is_castle(board) && !castle_path_is_safe(candidate, color, board) {
                return false;
            }
            let mut trial = board.hypothetical();
            trial.apply_move(candidate.from, candidate.to).is_ok() && !is_in_check(color, &trial)
        })
        .collect()
}

/// Legal destinations for the piece on `from`, for move pickers.
pub fn legal_destinations(from: Square, board: &Board) -> Vec<Square> {
    match board.piece_at(from) {
        Some(piece) => legal_moves(piece.color, board)
            .into_iter()
            .filter(|m| m.from == from)
            .map(|m| m.to)
            .collect(),
        None => Vec::new(),
    }
}

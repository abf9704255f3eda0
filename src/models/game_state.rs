use std::collections::BTreeSet;

use log::debug;

use crate::error::BoardError;
use crate::game::utils::{has_insufficient_material, is_threefold_repetition, Outcome};
use crate::game::{is_in_check, legal_moves, Board, Color, PieceKind, Snapshot};
use crate::models::messages::MoveRecord;

/// Half-moves without a pawn move or capture after which the game is drawn.
pub const FIFTY_MOVE_LIMIT: u32 = 100;

/// What applying a move record did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Played {
    pub capture: bool,
    pub pawn_move: bool,
    /// The mover is a pawn on its last rank and the record named no
    /// promotion piece.
    pub promotion_due: bool,
}

/// State of one game: the position plus the counters and offers that decide
/// when it ends. A rematch replaces it wholesale.
#[derive(Debug, Clone)]
pub struct GameState {
    pub board: Board,
    pub turn: Color,
    pub halfmove_clock: u32,
    pub draw_offers: BTreeSet<Color>,
    pub resigned: Option<Color>,
    pub history: Vec<Snapshot>,
    pub last_move: Option<MoveRecord>,
    pub pending_promotion: Option<MoveRecord>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self::from_board(Board::new(), Color::White)
    }

    /// Start from an arbitrary position; the history is seeded with it.
    pub fn from_board(board: Board, turn: Color) -> Self {
        let history = vec![board.snapshot()];
        GameState {
            board,
            turn,
            halfmove_clock: 0,
            draw_offers: BTreeSet::new(),
            resigned: None,
            history,
            last_move: None,
            pending_promotion: None,
        }
    }

    fn apply(&mut self, record: &MoveRecord) -> Result<Played, BoardError> {
        let from = record.from();
        let to = record.to();
        let mover = *self.board.piece_at(from).ok_or(BoardError::EmptySquare(from))?;
        if mover.color != self.turn {
            return Err(BoardError::WrongColor(from));
        }

        let effect = self.board.apply_move(from, to)?;
        if let Some(kind) = record.promotion {
            self.board.promote(to, kind)?;
        }

        let pawn_move = mover.kind == PieceKind::Pawn;
        let capture = effect.captured.is_some();
        if pawn_move || capture {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        self.turn = self.turn.opponent();
        self.draw_offers.clear();
        self.last_move = Some(record.clone());

        Ok(Played {
            capture,
            pawn_move,
            promotion_due: pawn_move && to.y == mover.color.last_rank() && record.promotion.is_none(),
        })
    }

    /// Apply a complete record (an inbound move, or a local one that needs no
    /// promotion choice) and append the resulting snapshot.
    pub fn play(&mut self, record: &MoveRecord) -> Result<Played, BoardError> {
        let played = self.apply(record)?;
        self.history.push(self.board.snapshot());
        Ok(played)
    }

    /// Apply a locally chosen move. When it promotes, the record is parked in
    /// `pending_promotion` and the snapshot waits for [`GameState::promote`].
    pub fn play_local(&mut self, record: &MoveRecord) -> Result<Played, BoardError> {
        let played = self.apply(record)?;
        if played.promotion_due {
            self.pending_promotion = Some(record.clone());
        } else {
            self.history.push(self.board.snapshot());
        }
        Ok(played)
    }

    /// Finish a parked promotion and return the completed record for sending.
    pub fn promote(&mut self, kind: PieceKind) -> Option<MoveRecord> {
        let mut record = self.pending_promotion.take()?;
        if let Err(e) = self.board.promote(record.to(), kind) {
            debug!("promotion target vanished: {}", e);
            return None;
        }
        record.promotion = Some(kind);
        self.last_move = Some(record.clone());
        self.history.push(self.board.snapshot());
        Some(record)
    }

    /// Game-end detection in priority order; the first condition that holds
    /// decides the result.
    pub fn outcome(&self) -> Option<Outcome> {
        if legal_moves(self.turn, &self.board).is_empty() {
            return Some(if is_in_check(self.turn, &self.board) {
                Outcome::Checkmate {
                    winner: self.turn.opponent(),
                }
            } else {
                Outcome::Stalemate
            });
        }
        if has_insufficient_material(&self.board) {
            return Some(Outcome::InsufficientMaterial);
        }
        if is_threefold_repetition(&self.history) {
            return Some(Outcome::Repetition);
        }
        if self.halfmove_clock >= FIFTY_MOVE_LIMIT {
            return Some(Outcome::FiftyMoveRule);
        }
        if self.draw_offers.len() == 2 {
            return Some(Outcome::Agreement);
        }
        self.resigned.map(|loser| Outcome::Resignation {
            winner: loser.opponent(),
        })
    }
}

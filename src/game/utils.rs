use std::fmt;

use crate::game::board::{Board, Snapshot};
use crate::game::piece::Color;

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Checkmate { winner: Color },
    Stalemate,
    InsufficientMaterial,
    Repetition,
    FiftyMoveRule,
    Agreement,
    Resignation { winner: Color },
}

impl Outcome {
    pub fn winner(&self) -> Option<Color> {
        match self {
            Outcome::Checkmate { winner } | Outcome::Resignation { winner } => Some(*winner),
            _ => None,
        }
    }

    /// Short status token for logs.
    pub fn status(&self) -> &'static str {
        match self.winner() {
            Some(Color::White) => "white_wins",
            Some(Color::Black) => "black_wins",
            None if *self == Outcome::Stalemate => "stalemate",
            None => "draw",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Checkmate { winner } => write!(f, "{} wins by checkmate", winner.name()),
            Outcome::Stalemate => write!(f, "Stalemate"),
            Outcome::InsufficientMaterial => write!(f, "Draw by insufficient material"),
            Outcome::Repetition => write!(f, "Draw by repetition"),
            Outcome::FiftyMoveRule => write!(f, "Draw by fifty move rule"),
            Outcome::Agreement => write!(f, "Draw by agreement"),
            Outcome::Resignation { winner } => write!(f, "{} wins by resignation", winner.name()),
        }
    }
}

/// Material draws by piece count:
/// * bare kings;
/// * a lone bishop or knight against a bare king;
/// * one minor piece per side, in any bishop/knight combination.
///
/// The last rule also calls two opposing knights, or a bishop against a
/// knight, a draw, which is stricter than over-the-board rules.
pub fn has_insufficient_material(board: &Board) -> bool {
    let pieces = board.pieces();
    let minors = |color: Color| {
        pieces
            .iter()
            .filter(|p| p.color == color && p.kind.is_minor())
            .count()
    };
    let white_minors = minors(Color::White);
    let black_minors = minors(Color::Black);

    match pieces.len() {
        2 => true,
        3 => white_minors + black_minors == 1,
        4 => white_minors == 1 && black_minors == 1,
        _ => false,
    }
}

/// True once any snapshot occurs three times in the history.
pub fn is_threefold_repetition(history: &[Snapshot]) -> bool {
    history
        .iter()
        .any(|snapshot| history.iter().filter(|other| *other == snapshot).count() >= 3)
}

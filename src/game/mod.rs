pub mod board;
pub mod piece;
pub mod rules;
pub mod utils;

pub use board::{Board, MoveEffect, Snapshot};
pub use piece::{CastleRights, Color, Piece, PieceKind, Square};
pub use rules::{is_in_check, is_pseudo_legal, legal_destinations, legal_moves, LegalMove};
pub use utils::Outcome;

use thiserror::Error;

use crate::game::Square;

/// Precondition failures raised by [`crate::game::Board::apply_move`].
///
/// Legality is not checked here; these only cover moves that cannot be
/// applied to the position at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("no piece on {0}")]
    EmptySquare(Square),
    #[error("{0:?} is off the board")]
    OffBoard(Square),
    #[error("piece on {0} does not belong to the side to move")]
    WrongColor(Square),
}

/// Failures from the network adapters. None of these are fatal: callers log
/// them and let the next poll or send cycle try again.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("background worker failed to start")]
    Worker,
    #[error("room not found")]
    RoomNotFound,
    #[error("room is full")]
    RoomFull,
    #[error("no free room after {0} attempts")]
    NoRoom(usize),
}

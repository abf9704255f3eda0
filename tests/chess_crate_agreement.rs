//! Cross-checks move generation and check detection against the `chess`
//! crate along real opening lines.

use chess::{ChessMove, File, MoveGen, Rank};
use chess_link::game::{is_in_check, legal_destinations, legal_moves, Square};
use chess_link::models::{GameState, MoveRecord};

fn to_chess(square: Square) -> chess::Square {
    chess::Square::make_square(Rank::from_index(7 - square.y as usize), File::from_index(square.x as usize))
}

fn follow_line(line: &[&str]) {
    let mut ours = GameState::new();
    let mut theirs = chess::Board::default();

    for (ply, text) in line.iter().enumerate() {
        assert_eq!(
            legal_moves(ours.turn, &ours.board).len(),
            MoveGen::new_legal(&theirs).len(),
            "move count before ply {} ({})",
            ply,
            text
        );

        let from = Square::parse(&text[..2]).unwrap();
        let to = Square::parse(&text[2..]).unwrap();
        assert!(legal_destinations(from, &ours.board).contains(&to), "{} rejected", text);
        ours.play(&MoveRecord::new(from, to, ours.halfmove_clock)).unwrap();
        theirs = theirs.make_move_new(ChessMove::new(to_chess(from), to_chess(to), None));

        assert_eq!(
            is_in_check(ours.turn, &ours.board),
            theirs.checkers().popcnt() > 0,
            "check state after {}",
            text
        );
    }

    assert_eq!(
        legal_moves(ours.turn, &ours.board).len(),
        MoveGen::new_legal(&theirs).len(),
        "move count at the end of the line"
    );
}

#[test]
fn closed_ruy_lopez_with_both_sides_castling() {
    follow_line(&[
        "e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6", "b5a4", "g8f6", "e1g1", "f8e7", "f1e1", "b7b5",
        "a4b3", "d7d6", "c2c3", "e8g8", "h2h3", "c6b8", "d2d4", "b8d7",
    ]);
}

#[test]
fn en_passant_line() {
    follow_line(&["e2e4", "g8f6", "e4e5", "d7d5", "e5d6", "c7d6", "d2d4", "d8a5", "c2c3"]);
}

#[test]
fn early_queen_check_and_mate() {
    follow_line(&["e2e4", "f7f6", "d2d4", "g7g5", "d1h5"]);
}

#[test]
fn sicilian_with_exchanges() {
    follow_line(&[
        "e2e4", "c7c5", "g1f3", "d7d6", "d2d4", "c5d4", "f3d4", "g8f6", "b1c3", "a7a6", "c1g5", "e7e6",
        "f2f4", "f8e7", "d1f3", "d8c7", "g5f6", "e7f6",
    ]);
}

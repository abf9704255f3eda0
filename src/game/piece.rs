use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the board. Serialized as the single-letter tokens the relay roster
/// and offer payloads use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Color {
    #[serde(rename = "W")]
    White,
    #[serde(rename = "B")]
    Black,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank the side's pieces start on.
    pub fn home_rank(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    /// Rank a pawn of this color promotes on.
    pub fn last_rank(self) -> u8 {
        self.opponent().home_rank()
    }

    /// Rank delta of a single pawn step.
    pub fn forward(self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::White => "White",
            Color::Black => "Black",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    #[serde(rename = "P")]
    Pawn,
    #[serde(rename = "R")]
    Rook,
    #[serde(rename = "N")]
    Knight,
    #[serde(rename = "B")]
    Bishop,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
}

impl PieceKind {
    /// Kinds a pawn may become.
    pub const PROMOTIONS: [PieceKind; 4] = [
        PieceKind::Queen,
        PieceKind::Rook,
        PieceKind::Bishop,
        PieceKind::Knight,
    ];

    pub fn is_minor(self) -> bool {
        matches!(self, PieceKind::Bishop | PieceKind::Knight)
    }

    pub fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Rook => 'R',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }
}

/// A board coordinate. `x` is the file (0 = a-file), `y` the rank counted
/// from Black's side (0 = rank 8, 7 = rank 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    pub x: u8,
    pub y: u8,
}

impl Square {
    pub const fn new(x: u8, y: u8) -> Self {
        Square { x, y }
    }

    pub fn is_on_board(self) -> bool {
        self.x < 8 && self.y < 8
    }

    pub fn offset(self, dx: i8, dy: i8) -> Option<Square> {
        let x = self.x as i8 + dx;
        let y = self.y as i8 + dy;
        if (0..8).contains(&x) && (0..8).contains(&y) {
            Some(Square::new(x as u8, y as u8))
        } else {
            None
        }
    }

    /// Every square, rank by rank from y = 0.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..8u8).flat_map(|y| (0..8u8).map(move |x| Square::new(x, y)))
    }

    /// Parse algebraic notation such as `e2`.
    pub fn parse(text: &str) -> Option<Square> {
        let mut chars = text.trim().chars();
        let file = chars.next()?.to_ascii_lowercase();
        let rank = chars.next()?.to_digit(10)?;
        if chars.next().is_some() || !('a'..='h').contains(&file) || !(1..=8).contains(&rank) {
            return None;
        }
        Some(Square::new(file as u8 - b'a', 8 - rank as u8))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_on_board() {
            write!(f, "{}{}", (b'a' + self.x) as char, 8 - self.y)
        } else {
            write!(f, "({}, {})", self.x, self.y)
        }
    }
}

/// Castle-rights flags carried by a king.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CastleRights {
    pub kingside: bool,
    pub queenside: bool,
}

impl CastleRights {
    pub const BOTH: CastleRights = CastleRights {
        kingside: true,
        queenside: true,
    };
    pub const NONE: CastleRights = CastleRights {
        kingside: false,
        queenside: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub square: Square,
    pub color: Color,
    pub kind: PieceKind,
    pub en_passantable: bool,
    /// Only kings carry rights; every other kind holds `None`.
    pub castle: Option<CastleRights>,
}

impl Piece {
    pub fn new(kind: PieceKind, color: Color, x: u8, y: u8) -> Self {
        Piece {
            square: Square::new(x, y),
            color,
            kind,
            en_passantable: false,
            castle: (kind == PieceKind::King).then_some(CastleRights::BOTH),
        }
    }

    pub fn x(&self) -> u8 {
        self.square.x
    }

    pub fn y(&self) -> u8 {
        self.square.y
    }

    /// Display letter: upper case for White, lower case for Black.
    pub fn symbol(&self) -> char {
        match self.color {
            Color::White => self.kind.letter(),
            Color::Black => self.kind.letter().to_ascii_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algebraic_squares_map_onto_board_coordinates() {
        assert_eq!(Square::parse("e2"), Some(Square::new(4, 6)));
        assert_eq!(Square::parse("a8"), Some(Square::new(0, 0)));
        assert_eq!(Square::parse("h1"), Some(Square::new(7, 7)));
        assert_eq!(Square::parse("i1"), None);
        assert_eq!(Square::parse("e9"), None);
        assert_eq!(Square::new(4, 4).to_string(), "e4");
    }

    #[test]
    fn only_kings_carry_castle_rights() {
        assert_eq!(Piece::new(PieceKind::King, Color::White, 4, 7).castle, Some(CastleRights::BOTH));
        assert_eq!(Piece::new(PieceKind::Rook, Color::White, 0, 7).castle, None);
    }

    #[test]
    fn colors_serialize_as_roster_tokens() {
        let roster = vec![Color::White, Color::Black];
        assert_eq!(serde_json::to_string(&roster).unwrap(), r#"["W","B"]"#);
    }
}

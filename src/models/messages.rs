use actix::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game::{Color, PieceKind, Square};

/// A move as exchanged between the two sessions, either POSTed to the peer's
/// listener or stored in the relay's move slot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub from_x: u8,
    pub from_y: u8,
    pub to_x: u8,
    pub to_y: u8,
    #[serde(default)]
    pub promotion: Option<PieceKind>,
    /// Sender's half-move counter when the move was made.
    pub fifty_move: u32,
}

impl MoveRecord {
    pub fn new(from: Square, to: Square, fifty_move: u32) -> Self {
        MoveRecord {
            from_x: from.x,
            from_y: from.y,
            to_x: to.x,
            to_y: to.y,
            promotion: None,
            fifty_move,
        }
    }

    pub fn from(&self) -> Square {
        Square::new(self.from_x, self.from_y)
    }

    pub fn to(&self) -> Square {
        Square::new(self.to_x, self.to_y)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OfferKind {
    Resign,
    Draw,
    PlayAgain,
}

/// Resignation, draw offer or rematch request, tagged with the sender's color.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offer {
    #[serde(rename = "type")]
    pub kind: OfferKind,
    pub color: Color,
}

/// Typed notices the direct-pairing listener accepts. Extra fields such as
/// `color` are ignored.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    Connect,
    Resign,
    Draw,
    PlayAgain,
}

/// A decoded listener request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMessage {
    Notice(Notice),
    Move(MoveRecord),
}

impl PeerMessage {
    /// Classify a JSON body: anything with a known `type` is a notice, and
    /// anything carrying `from_x` is a move. Everything else is unrecognized.
    pub fn classify(value: Value) -> Option<PeerMessage> {
        if let Ok(notice) = serde_json::from_value::<Notice>(value.clone()) {
            return Some(PeerMessage::Notice(notice));
        }
        if value.get("from_x").is_some() {
            return serde_json::from_value::<MoveRecord>(value).ok().map(PeerMessage::Move);
        }
        None
    }
}

/// Reply body of the relay's `/create` endpoint.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RoomReply {
    pub message: String,
}

impl RoomReply {
    pub const CREATED: &'static str = "Room created";

    pub fn is_created(&self) -> bool {
        self.message == Self::CREATED
    }
}

/// Outbound work for the courier task.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
#[rtype(result = "()")]
pub enum Parcel {
    Move(MoveRecord),
    Offer(Offer),
    /// Empty the relay's move slot.
    ClearMove,
    /// Empty the relay's offer slot.
    ClearOffer,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn move_record_matches_wire_shape() {
        let record: MoveRecord = serde_json::from_value(json!({
            "from_x": 4, "from_y": 6, "to_x": 4, "to_y": 7, "promotion": "Q", "fifty_move": 3
        }))
        .unwrap();
        assert_eq!(record.promotion, Some(PieceKind::Queen));
        assert_eq!(record.from(), Square::new(4, 6));

        let bare: MoveRecord = serde_json::from_value(json!({
            "from_x": 1, "from_y": 7, "to_x": 2, "to_y": 5, "fifty_move": 0
        }))
        .unwrap();
        assert_eq!(bare.promotion, None);
        assert_eq!(serde_json::to_value(&bare).unwrap()["promotion"], Value::Null);
    }

    #[test]
    fn offer_uses_type_and_color_tokens() {
        let offer = Offer {
            kind: OfferKind::PlayAgain,
            color: Color::Black,
        };
        assert_eq!(serde_json::to_value(offer).unwrap(), json!({"type": "play_again", "color": "B"}));
    }

    #[test]
    fn classify_listener_bodies() {
        assert_eq!(
            PeerMessage::classify(json!({"type": "connect"})),
            Some(PeerMessage::Notice(Notice::Connect))
        );
        assert_eq!(
            PeerMessage::classify(json!({"type": "draw", "color": "W"})),
            Some(PeerMessage::Notice(Notice::Draw))
        );
        assert!(matches!(
            PeerMessage::classify(json!({"from_x": 4, "from_y": 6, "to_x": 4, "to_y": 4, "fifty_move": 0})),
            Some(PeerMessage::Move(_))
        ));
        assert_eq!(PeerMessage::classify(json!({"type": "hello"})), None);
        assert_eq!(PeerMessage::classify(json!({"from_x": "e2"})), None);
        assert_eq!(PeerMessage::classify(json!([1, 2, 3])), None);
    }
}

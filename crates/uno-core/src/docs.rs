//! Document schema shared by the store, the view models and the UI.
//!
//! A room lives at `rooms/{roomId}` and embeds its seated [`Player`]s; each
//! player additionally owns a sub-document at `rooms/{roomId}/players/{uid}`.
//! Field names follow the camelCase layout the documents are stored with.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Room keys
// ---------------------------------------------------------------------------

/// Short key identifying a room, e.g. `ABCD`.
///
/// Stored keys go through [`RoomId::parse`] as well, so `"abcd"` in a
/// document is the same room as the `ABCD` in its path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Length of keys produced by [`RoomId::generate`].
    pub const GENERATED_LEN: usize = 4;

    /// Upper bound (exclusive) on key length.
    pub const MAX_LEN: usize = 20;

    /// Parse a user-typed room key.
    ///
    /// Keys are trimmed and uppercased; they must be non-empty, ASCII
    /// alphanumeric and fewer than 20 characters.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(ValidationError::InvalidRoomKey("Room key cannot be empty"));
        }
        if key.len() >= Self::MAX_LEN {
            return Err(ValidationError::InvalidRoomKey(
                "Room key must be fewer than 20 characters",
            ));
        }
        if !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidRoomKey("Room key must be alphanumeric"));
        }
        Ok(Self(key.to_ascii_uppercase()))
    }

    /// Generate a random key of [`GENERATED_LEN`](Self::GENERATED_LEN)
    /// uppercase letters.
    pub fn generate() -> Self {
        use rand::RngExt;
        const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        let mut rng = rand::rng();
        let key = (0..Self::GENERATED_LEN)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardColor {
    Red,
    Yellow,
    Green,
    Blue,
    Wild,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardFace {
    Number(u8),
    Skip,
    Reverse,
    DrawTwo,
    Wild,
    WildDrawFour,
}

/// A card as stored in the room document. The client only displays cards;
/// it never interprets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub color: CardColor,
    pub face: CardFace,
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let color = match self.color {
            CardColor::Red => "Red",
            CardColor::Yellow => "Yellow",
            CardColor::Green => "Green",
            CardColor::Blue => "Blue",
            CardColor::Wild => "Wild",
        };
        match self.face {
            CardFace::Number(n) => write!(f, "{color} {n}"),
            CardFace::Skip => write!(f, "{color} Skip"),
            CardFace::Reverse => write!(f, "{color} Reverse"),
            CardFace::DrawTwo => write!(f, "{color} +2"),
            CardFace::Wild => f.write_str("Wild"),
            CardFace::WildDrawFour => f.write_str("Wild +4"),
        }
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// Profile picture choices. Each maps to an image under
/// `/assets/ProfileAnimals/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pfp {
    Bear,
    Cat,
    Dog,
    Fox,
    Frog,
    Koala,
    Lion,
    Monkey,
    Panda,
    Penguin,
    Pig,
    Rabbit,
    Tiger,
    Unicorn,
    /// Anything this client version does not recognise.
    #[serde(other)]
    Unknown,
}

impl Pfp {
    /// Every selectable avatar, in picker order.
    pub const ALL: [Pfp; 14] = [
        Pfp::Bear,
        Pfp::Cat,
        Pfp::Dog,
        Pfp::Fox,
        Pfp::Frog,
        Pfp::Koala,
        Pfp::Lion,
        Pfp::Monkey,
        Pfp::Panda,
        Pfp::Penguin,
        Pfp::Pig,
        Pfp::Rabbit,
        Pfp::Tiger,
        Pfp::Unicorn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Pfp::Bear => "bear",
            Pfp::Cat => "cat",
            Pfp::Dog => "dog",
            Pfp::Fox => "fox",
            Pfp::Frog => "frog",
            Pfp::Koala => "koala",
            Pfp::Lion => "lion",
            Pfp::Monkey => "monkey",
            Pfp::Panda => "panda",
            Pfp::Penguin => "penguin",
            Pfp::Pig => "pig",
            Pfp::Rabbit => "rabbit",
            Pfp::Tiger => "tiger",
            Pfp::Unicorn => "unicorn",
            Pfp::Unknown => "unknown",
        }
    }

    /// Look up a selectable avatar by its stored name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

impl fmt::Display for Pfp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A seated player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Anonymous-auth uid, stable for the session.
    pub uid: String,
    pub username: String,
    pub pfp: Pfp,
    pub room_id: RoomId,
    #[serde(default)]
    pub cards: Vec<Card>,
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

/// Turn rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Cw,
    Ccw,
}

impl Direction {
    /// Arrow glyph for the turn indicator.
    pub fn arrow(self) -> &'static str {
        match self {
            Direction::Cw => "↻",
            Direction::Ccw => "↺",
        }
    }
}

/// Schema violations found while decoding a [`RoomDoc`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocError {
    #[error("room document has neither roomId nor uid")]
    MissingRoomId,

    #[error("room document keys disagree: roomId={room_id}, uid={uid}")]
    RoomIdMismatch { room_id: RoomId, uid: RoomId },

    #[error("player {0} is seated twice")]
    DuplicatePlayer(String),

    #[error("player {uid} belongs to room {room_id}")]
    ForeignPlayer { uid: String, room_id: RoomId },
}

/// The shared room document.
///
/// `room_id` is the canonical key. The stored layout also carries a `uid`
/// field holding the same key; it is accepted as a fallback when decoding
/// and always written back equal to `room_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RoomRecord", into = "RoomRecord")]
pub struct RoomDoc {
    pub room_id: RoomId,
    pub players: Vec<Player>,
    /// Card on top of the table; absent until the first card is placed.
    pub current_card: Option<Card>,
    pub current_direction: Direction,
    /// Whose turn it is. Mirrored from the store, never advanced locally.
    pub current_player_uid: Option<String>,
    pub last_cards: Vec<Card>,
    pub started: bool,
}

impl RoomDoc {
    /// An empty, not-yet-started room.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            players: Vec::new(),
            current_card: None,
            current_direction: Direction::Cw,
            current_player_uid: None,
            last_cards: Vec::new(),
            started: false,
        }
    }

    pub fn player(&self, uid: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.uid == uid)
    }

    /// Whether a player with this uid is seated.
    pub fn has_player(&self, uid: &str) -> bool {
        self.player(uid).is_some()
    }

    /// The player holding the turn, if the referenced uid is seated.
    pub fn current_player(&self) -> Option<&Player> {
        self.current_player_uid
            .as_deref()
            .and_then(|uid| self.player(uid))
    }

    pub fn is_turn_of(&self, uid: &str) -> bool {
        self.current_player().is_some_and(|p| p.uid == uid)
    }
}

/// Stored layout of a [`RoomDoc`].
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    room_id: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uid: Option<RoomId>,
    #[serde(default)]
    players: Vec<Player>,
    #[serde(default)]
    current_card: Option<Card>,
    #[serde(default)]
    current_direction: Direction,
    #[serde(default)]
    current_player_uid: Option<String>,
    #[serde(default)]
    last_cards: Vec<Card>,
    #[serde(default)]
    started: bool,
}

impl TryFrom<RoomRecord> for RoomDoc {
    type Error = DocError;

    fn try_from(record: RoomRecord) -> Result<Self, Self::Error> {
        let room_id = match (record.room_id, record.uid) {
            (Some(room_id), Some(uid)) if room_id != uid => {
                return Err(DocError::RoomIdMismatch { room_id, uid });
            }
            (Some(room_id), _) => room_id,
            (None, Some(uid)) => uid,
            (None, None) => return Err(DocError::MissingRoomId),
        };

        for (i, player) in record.players.iter().enumerate() {
            if player.room_id != room_id {
                return Err(DocError::ForeignPlayer {
                    uid: player.uid.clone(),
                    room_id: player.room_id.clone(),
                });
            }
            if record.players[..i].iter().any(|p| p.uid == player.uid) {
                return Err(DocError::DuplicatePlayer(player.uid.clone()));
            }
        }

        Ok(Self {
            room_id,
            players: record.players,
            current_card: record.current_card,
            current_direction: record.current_direction,
            current_player_uid: record.current_player_uid,
            last_cards: record.last_cards,
            started: record.started,
        })
    }
}

impl From<RoomDoc> for RoomRecord {
    fn from(doc: RoomDoc) -> Self {
        Self {
            uid: Some(doc.room_id.clone()),
            room_id: Some(doc.room_id),
            players: doc.players,
            current_card: doc.current_card,
            current_direction: doc.current_direction,
            current_player_uid: doc.current_player_uid,
            last_cards: doc.last_cards,
            started: doc.started,
        }
    }
}

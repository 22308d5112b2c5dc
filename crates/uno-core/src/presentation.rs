//! Render-ready views of player data.
//!
//! Pure functions of already-resolved documents: no subscriptions, no state.

use crate::docs::{Pfp, Player, RoomDoc};

/// Most card backs drawn under a player card. The exact count is shown as
/// text beside the stack.
pub const MAX_CARD_BACKS: usize = 20;

/// One drawn card back. The first is drawn whole, the rest overlap it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardBack {
    Full,
    Partial,
}

/// Card-back stack plus exact count for a player card footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFooterView {
    pub backs: Vec<CardBack>,
    pub count: usize,
}

impl CardFooterView {
    pub fn new(count: usize) -> Self {
        let backs = (0..count.min(MAX_CARD_BACKS))
            .map(|i| if i == 0 { CardBack::Full } else { CardBack::Partial })
            .collect();
        Self { backs, count }
    }

    pub fn count_text(&self) -> String {
        self.count.to_string()
    }
}

/// Image path for an avatar.
pub fn avatar_src(pfp: Pfp) -> String {
    format!("/assets/ProfileAnimals/{pfp}.png")
}

/// Everything a player card displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCardView {
    pub uid: String,
    pub username: String,
    pub avatar_src: String,
    pub avatar_alt: String,
    pub footer: CardFooterView,
    pub has_turn: bool,
}

impl PlayerCardView {
    /// Build the view for `player`. `room` supplies turn state when known.
    pub fn new(player: &Player, room: Option<&RoomDoc>) -> Self {
        Self {
            uid: player.uid.clone(),
            username: player.username.clone(),
            avatar_src: avatar_src(player.pfp),
            avatar_alt: player.pfp.to_string(),
            footer: CardFooterView::new(player.cards.len()),
            has_turn: room.is_some_and(|r| r.is_turn_of(&player.uid)),
        }
    }
}

/// Cards for everyone except `our_uid`, in seat order starting with the
/// player after us.
pub fn opponent_cards(room: &RoomDoc, our_uid: &str) -> Vec<PlayerCardView> {
    let start = room
        .players
        .iter()
        .position(|p| p.uid == our_uid)
        .map_or(0, |i| i + 1);
    room.players[start..]
        .iter()
        .chain(&room.players[..start])
        .filter(|p| p.uid != our_uid)
        .map(|p| PlayerCardView::new(p, Some(room)))
        .collect()
}

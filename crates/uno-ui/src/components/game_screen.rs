//! Game view: opponents around the table, the current card and turn
//! direction, and our own seat with our hand.
//!
//! Everything here is read from the mirrored documents; nothing is played
//! from this screen.

use dioxus::prelude::*;
use uno_core::docs_context::DocsState;
use uno_core::presentation::{PlayerCardView, opponent_cards};

use super::player_card::PlayerCard;

#[component]
pub fn GameScreen(docs: Signal<DocsState>, uid: Signal<String>) -> Element {
    let state = docs.read();
    let our_uid = uid.read().clone();
    let Some(room) = &state.room.doc else {
        return rsx! {
            div { class: "flex-1 flex items-center justify-center", p { "Waiting for the room…" } }
        };
    };

    let opponents = opponent_cards(room, &our_uid);
    let us = room
        .player(&our_uid)
        .map(|player| PlayerCardView::new(player, Some(room)));
    let current_card = room
        .current_card
        .map_or_else(|| "No card played yet".to_string(), |card| card.to_string());
    let arrow = room.current_direction.arrow();
    let turn = match room.current_player() {
        Some(player) if player.uid == our_uid => "Your turn".to_string(),
        Some(player) => format!("{}'s turn", player.username),
        None if room.started => String::new(),
        None => "Waiting for the game to start".to_string(),
    };
    let hand: Vec<String> = state
        .player
        .doc
        .as_ref()
        .map(|me| me.cards.iter().map(ToString::to_string).collect())
        .unwrap_or_default();

    rsx! {
        div { class: "flex-1 flex flex-col gap-6 p-4",
            div { class: "flex flex-wrap justify-center gap-4",
                for view in opponents {
                    PlayerCard { key: "{view.uid}", view }
                }
            }

            div { class: "flex flex-col items-center gap-2",
                div { class: "table-card text-xl font-bold", "{current_card}" }
                span { class: "text-3xl", title: "Turn direction", "{arrow}" }
                if !turn.is_empty() {
                    span { class: "text-sm", "{turn}" }
                }
            }

            if let Some(view) = us {
                div { class: "flex flex-col items-center gap-3 mt-auto",
                    PlayerCard { view, is_us: true }
                    div { class: "flex flex-wrap justify-center gap-2",
                        for (i, card) in hand.iter().enumerate() {
                            div { key: "{i}", class: "hand-card", "{card}" }
                        }
                    }
                }
            }
        }
    }
}

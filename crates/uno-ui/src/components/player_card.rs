//! One player's avatar, name and card count.

use dioxus::prelude::*;
use uno_core::presentation::PlayerCardView;

use super::card_footer::CardFooter;

#[component]
pub fn PlayerCard(view: PlayerCardView, #[props(default)] is_us: bool) -> Element {
    let turn = if view.has_turn { "ring-2 ring-yellow-400" } else { "" };
    let name_class = if is_us { "font-semibold text-emerald-400" } else { "font-semibold" };

    rsx! {
        div { class: "player-card rounded-xl p-3 flex flex-col items-center gap-2 {turn}",
            img {
                class: "w-16 h-16 rounded-full",
                src: "{view.avatar_src}",
                alt: "{view.avatar_alt}",
            }
            span { class: name_class, "{view.username}" }
            CardFooter { view: view.footer.clone() }
        }
    }
}

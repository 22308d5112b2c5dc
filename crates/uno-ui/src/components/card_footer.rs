//! Card-back stack under a player card.

use dioxus::prelude::*;
use uno_core::presentation::{CardBack, CardFooterView};

#[component]
pub fn CardFooter(view: CardFooterView) -> Element {
    rsx! {
        div { class: "card-footer flex items-center gap-2",
            div { class: "card-stack flex",
                for (i, back) in view.backs.iter().enumerate() {
                    {
                        let class = match back {
                            CardBack::Full => "card-back",
                            CardBack::Partial => "card-back card-back-partial",
                        };
                        rsx! {
                            div { key: "{i}", class }
                        }
                    }
                }
            }
            span { class: "text-sm font-semibold", "{view.count_text()}" }
        }
    }
}

//! Room landing shell: the lobby drawer around both room views, plus the
//! waiting / invalid / failed states of the navigation guard.

use dioxus::prelude::*;
use uno_core::guard::GuardDecision;

use crate::{Theme, UiMessage};

#[component]
pub fn RoomLanding(room_id: String, decision: Signal<GuardDecision>, children: Element) -> Element {
    let mut drawer_open = use_signal(|| false);
    let mut theme = use_context::<Signal<Theme>>();
    let coroutine = use_coroutine_handle::<UiMessage>();

    let body = match &*decision.read() {
        GuardDecision::Wait => rsx! {
            div { class: "flex-1 flex items-center justify-center", p { "Loading…" } }
        },
        GuardDecision::InvalidRoom => rsx! {
            div { class: "flex-1 flex flex-col items-center justify-center gap-4",
                p { class: "text-lg", "Room {room_id} does not exist" }
                button {
                    class: "bg-blue-600 hover:bg-blue-500 text-white rounded-lg px-4 py-2",
                    onclick: move |_| coroutine.send(UiMessage::Exit),
                    "Back to home"
                }
            }
        },
        GuardDecision::Failed(err) => {
            let message = err.to_string();
            rsx! {
                div { class: "flex-1 flex flex-col items-center justify-center gap-4",
                    p { class: "text-red-400", "{message}" }
                    button {
                        class: "bg-blue-600 hover:bg-blue-500 text-white rounded-lg px-4 py-2",
                        onclick: move |_| coroutine.send(UiMessage::Retry),
                        "Retry"
                    }
                }
            }
        }
        GuardDecision::Navigate(_) => children,
    };

    rsx! {
        div { class: "min-h-screen flex flex-col",
            header { class: "flex items-center justify-between px-4 py-2 shadow surface",
                button {
                    class: "text-2xl",
                    title: "Menu",
                    onclick: move |_| drawer_open.toggle(),
                    "☰"
                }
                span { class: "font-mono tracking-widest", "{room_id}" }
            }

            if *drawer_open.read() {
                nav { class: "fixed inset-y-0 left-0 w-64 shadow-2xl p-4 flex flex-col gap-3 surface z-10",
                    div { class: "flex items-center justify-between",
                        span { class: "font-mono text-xl", "{room_id}" }
                        button { onclick: move |_| drawer_open.set(false), "✕" }
                    }
                    button {
                        class: "drawer-item",
                        onclick: move |_| coroutine.send(UiMessage::CopyRoomKey),
                        "Copy room key"
                    }
                    button {
                        class: "drawer-item",
                        onclick: move |_| {
                            let next = theme.read().toggled();
                            theme.set(next);
                        },
                        if *theme.read() == Theme::Dark { "Light mode" } else { "Dark mode" }
                    }
                    button {
                        class: "drawer-item",
                        onclick: move |_| coroutine.send(UiMessage::SignOut),
                        "Log out"
                    }
                    button {
                        class: "drawer-item text-red-500",
                        onclick: move |_| coroutine.send(UiMessage::Exit),
                        "Exit room"
                    }
                }
            }

            {body}
        }
    }
}

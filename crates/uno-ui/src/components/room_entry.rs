//! Home page: join a room by key or create a new one.

use dioxus::prelude::*;
use uno_core::docs::RoomId;

use crate::UiMessage;

#[component]
pub fn RoomEntry() -> Element {
    let mut room_key = use_signal(String::new);
    let mut validation_error = use_signal(String::new);
    let coroutine = use_coroutine_handle::<UiMessage>();

    let on_join = move |_: MouseEvent| {
        let key = room_key.read().clone();
        // Checked here for instant feedback; the coroutine parses again.
        if let Err(e) = RoomId::parse(&key) {
            validation_error.set(e.to_string());
            return;
        }
        validation_error.set(String::new());
        coroutine.send(UiMessage::OpenRoom(key));
    };

    let val_err = validation_error.read().clone();

    rsx! {
        div { class: "min-h-screen flex items-center justify-center p-4",
            div { class: "w-full max-w-sm rounded-2xl shadow-2xl p-6 flex flex-col gap-4 surface",
                h1 { class: "text-3xl font-bold text-center text-red-500", "Uno Pow Zero" }

                div { class: "flex flex-col gap-1",
                    label { class: "text-sm", "Room key" }
                    input {
                        class: "rounded-lg px-4 py-2 uppercase outline-none focus:ring-2 focus:ring-emerald-500",
                        r#type: "text",
                        placeholder: "e.g. ABCD",
                        value: "{room_key}",
                        oninput: move |e| room_key.set(e.value()),
                    }
                }

                if !val_err.is_empty() {
                    p { class: "text-red-400 text-sm text-center", "{val_err}" }
                }

                div { class: "flex gap-3",
                    button {
                        class: "flex-1 bg-blue-600 hover:bg-blue-500 text-white font-semibold rounded-lg py-2 transition",
                        onclick: on_join,
                        "Join Room"
                    }
                    button {
                        class: "flex-1 bg-emerald-600 hover:bg-emerald-500 text-white font-semibold rounded-lg py-2 transition",
                        onclick: move |_| coroutine.send(UiMessage::CreateRoom),
                        "Create Room"
                    }
                }
            }
        }
    }
}

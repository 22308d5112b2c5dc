//! Username and avatar picker shown on `/{roomId}/login`.
//!
//! Keeps the only client-side state that is not mirrored from the store:
//! the form being filled in. Validation and sign-in happen in the session
//! coroutine so errors come back as notices.

use dioxus::prelude::*;
use uno_core::docs::Pfp;
use uno_core::presentation::avatar_src;
use uno_core::username::UsernameForm;

use crate::UiMessage;

#[component]
pub fn ChooseUsername(submitting: Signal<bool>) -> Element {
    let mut username = use_signal(String::new);
    let mut pfp = use_signal(|| None::<Pfp>);
    let coroutine = use_coroutine_handle::<UiMessage>();

    let on_submit = move |_: MouseEvent| {
        coroutine.send(UiMessage::Submit(UsernameForm {
            username: username.read().clone(),
            pfp: *pfp.read(),
        }));
    };

    let busy = *submitting.read();
    let selected = *pfp.read();

    rsx! {
        div { class: "min-h-screen flex items-center justify-center p-4",
            div { class: "w-full max-w-md rounded-2xl shadow-2xl p-6 flex flex-col gap-5 surface",
                h1 { class: "text-2xl font-bold text-center", "Choose your player" }

                div { class: "flex flex-col gap-1",
                    label { class: "text-sm", "Username" }
                    input {
                        class: "rounded-lg px-4 py-2 outline-none focus:ring-2 focus:ring-emerald-500",
                        r#type: "text",
                        maxlength: "20",
                        value: "{username}",
                        oninput: move |e| username.set(e.value()),
                    }
                }

                div { class: "grid grid-cols-7 gap-2",
                    for animal in Pfp::ALL {
                        {
                            let ring = if selected == Some(animal) { "ring-4 ring-emerald-500" } else { "" };
                            rsx! {
                                button {
                                    key: "{animal}",
                                    class: "rounded-full overflow-hidden {ring}",
                                    title: "{animal}",
                                    onclick: move |_| pfp.set(Some(animal)),
                                    img { src: avatar_src(animal), alt: "{animal}" }
                                }
                            }
                        }
                    }
                }

                button {
                    class: "bg-emerald-600 hover:bg-emerald-500 text-white font-semibold rounded-lg py-2 transition disabled:opacity-50",
                    disabled: busy,
                    onclick: on_submit,
                    if busy { "Loading…" } else { "Let's play" }
                }
            }
        }
    }
}

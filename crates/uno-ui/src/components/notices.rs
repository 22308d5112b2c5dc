//! Toast for the latest notice.

use dioxus::prelude::*;
use uno_core::error::{Notice, NoticeLevel};

#[component]
pub fn Notices(notice: Signal<Option<Notice>>) -> Element {
    let mut notice = notice;
    let current = notice.read().clone();
    let Some(current) = current else {
        return rsx! {};
    };
    let color = match current.level {
        NoticeLevel::Success => "bg-emerald-600",
        NoticeLevel::Info => "bg-blue-600",
        NoticeLevel::Error => "bg-red-600",
    };

    rsx! {
        div { class: "fixed bottom-4 right-4 rounded-lg px-4 py-3 text-white shadow-lg flex items-center gap-3 {color}",
            span { "{current.text}" }
            button {
                class: "text-white/80 hover:text-white",
                onclick: move |_| notice.set(None),
                "✕"
            }
        }
    }
}

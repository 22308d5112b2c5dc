//! Root application component for the web frontend.
//!
//! Provides the browser side of the client's seams: the URL is the router
//! (`history.pushState` plus `popstate`), `navigator.clipboard` is the
//! clipboard, and the anonymous identity lives in `sessionStorage` so a
//! reload keeps the user's seats.

use dioxus::prelude::*;
use uno_client::landing::{Clipboard, Router};
use uno_client::session::{SessionStore, StoredIdentity, connect_with_retry};
use uno_core::docs_context::DocsState;
use uno_core::error::Notice;
use uno_core::guard::{GuardDecision, Route};
use uno_ui::app_logic::{AppSignals, run_app_session};
use uno_ui::components::{
    choose_username::ChooseUsername, game_screen::GameScreen, notices::Notices,
    room_entry::RoomEntry, room_landing::RoomLanding,
};
use uno_ui::{Screen, Theme, UiMessage};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

const IDENTITY_KEY: &str = "uno_identity";

// ---------------------------------------------------------------------------
// Browser adapters
// ---------------------------------------------------------------------------

/// Router backed by the History API. Mirrors the path into a signal so the
/// root component re-renders.
#[derive(Clone, Copy)]
struct BrowserRouter {
    route: Signal<Route>,
}

impl Router for BrowserRouter {
    fn navigate(&self, route: &Route) {
        if let Some(history) = web_sys::window().and_then(|w| w.history().ok()) {
            let path = route.to_string();
            if let Err(e) =
                history.push_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(&path))
            {
                tracing::warn!(?e, %path, "pushState failed");
            }
        }
        let mut signal = self.route;
        signal.set(route.clone());
    }
}

struct BrowserClipboard;

impl Clipboard for BrowserClipboard {
    fn write_text(&self, text: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let promise = window.navigator().clipboard().write_text(text);
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
                tracing::warn!(?e, "clipboard write failed");
            }
        });
    }
}

/// `sessionStorage`-backed identity persistence.
struct SessionStorage;

impl SessionStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.session_storage().ok()?
    }
}

impl SessionStore for SessionStorage {
    fn save(&self, identity: &StoredIdentity) {
        let (Some(storage), Ok(json)) = (Self::storage(), serde_json::to_string(identity)) else {
            return;
        };
        let _ = storage.set_item(IDENTITY_KEY, &json);
    }

    fn load(&self) -> Option<StoredIdentity> {
        let json = Self::storage()?.get_item(IDENTITY_KEY).ok()??;
        serde_json::from_str(&json).ok()
    }

    fn clear(&self) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(IDENTITY_KEY);
        }
    }
}

/// Route for the page's current path; unknown paths land on home.
fn current_route() -> Route {
    web_sys::window()
        .and_then(|w| w.location().pathname().ok())
        .and_then(|path| path.parse().ok())
        .unwrap_or(Route::Home)
}

/// Derive the WebSocket URL from the browser's current page origin.
///
/// `http://host:port` → `ws://host:port`, `https://…` → `wss://…`.
fn default_ws_origin() -> String {
    let Some(window) = web_sys::window() else {
        return "ws://127.0.0.1:8080".to_string();
    };
    let location = window.location();
    let protocol = location.protocol().unwrap_or_default();
    let host = location.host().unwrap_or_default();
    let ws_scheme = if protocol == "https:" { "wss" } else { "ws" };
    format!("{ws_scheme}://{host}")
}

fn sleep_ms(ms: u64) -> gloo_timers::future::TimeoutFuture {
    gloo_timers::future::TimeoutFuture::new(u32::try_from(ms).unwrap_or(u32::MAX))
}

// ---------------------------------------------------------------------------
// Root component
// ---------------------------------------------------------------------------

#[component]
pub fn App() -> Element {
    let mut route = use_signal(current_route);
    let docs = use_signal(DocsState::default);
    let decision = use_signal(|| GuardDecision::Wait);
    let notice = use_signal(|| None::<Notice>);
    let submitting = use_signal(|| false);
    let uid = use_signal(String::new);
    let theme = use_context_provider(|| Signal::new(Theme::default()));

    let coroutine = use_coroutine(move |rx: UnboundedReceiver<UiMessage>| {
        let signals = AppSignals {
            docs,
            decision,
            notice,
            submitting,
            uid,
        };
        let ws_url = format!("{}/ws", default_ws_origin());
        let initial = route.peek().clone();
        run_app_session(
            rx,
            signals,
            initial,
            BrowserRouter { route },
            BrowserClipboard,
            SessionStorage,
            move || {
                let url = ws_url.clone();
                async move { connect_with_retry(&url, sleep_ms).await }
            },
        )
    });

    // Back/forward buttons.
    use_hook(move || {
        let Some(window) = web_sys::window() else {
            return;
        };
        let on_pop = Closure::<dyn FnMut()>::new(move || {
            let path = current_route();
            route.set(path.clone());
            coroutine.send(UiMessage::RouteChanged(path));
        });
        let _ = window.add_event_listener_with_callback("popstate", on_pop.as_ref().unchecked_ref());
        on_pop.forget();
    });

    let current = route.read().clone();
    let body = match current.room_id() {
        None => rsx! { RoomEntry {} },
        Some(room_id) => {
            let view = match Screen::from(&current) {
                Screen::Game => rsx! { GameScreen { docs, uid } },
                _ => rsx! { ChooseUsername { submitting } },
            };
            rsx! {
                RoomLanding { room_id: room_id.to_string(), decision, {view} }
            }
        }
    };

    rsx! {
        document::Stylesheet { href: "/assets/main.css" }
        div { class: "app min-h-screen {theme.read().class()}",
            {body}
            Notices { notice }
        }
    }
}

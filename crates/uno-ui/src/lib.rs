//! Shared Dioxus UI for Uno Pow Zero.
//!
//! Platform-agnostic: components, the [`UiMessage`] type the components send
//! to the session coroutine, and the [`Screen`] / [`Theme`] types. The web
//! crate supplies the router, clipboard and session storage.

pub mod app_logic;
pub mod components;

use uno_core::guard::{Route, View};
use uno_core::username::UsernameForm;

// ---------------------------------------------------------------------------
// Shared types
// ---------------------------------------------------------------------------

/// Which screen the app is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// Enter or create a room key.
    RoomEntry,
    /// Pick a username and avatar for the room in the URL.
    ChooseUsername,
    Game,
}

impl From<&Route> for Screen {
    fn from(route: &Route) -> Self {
        match route {
            Route::Home => Screen::RoomEntry,
            Route::Room {
                view: View::Login, ..
            } => Screen::ChooseUsername,
            Route::Room {
                view: View::Game, ..
            } => Screen::Game,
        }
    }
}

/// Messages sent from UI components to the session coroutine.
#[derive(Debug, Clone)]
pub enum UiMessage {
    /// Go to the room with this (raw, user-typed) key.
    OpenRoom(String),
    CreateRoom,
    /// Username form submitted.
    Submit(UsernameForm),
    /// Ask the store again after a failed room check or subscription.
    Retry,
    CopyRoomKey,
    SignOut,
    /// Leave the room for the home page.
    Exit,
    /// The browser location changed (back/forward, first load).
    RouteChanged(Route),
}

/// Colour scheme, shared through the Dioxus context as a `Signal<Theme>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// CSS class applied to the app root.
    pub fn class(self) -> &'static str {
        match self {
            Theme::Light => "theme-light",
            Theme::Dark => "theme-dark",
        }
    }
}

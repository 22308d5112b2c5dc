//! Room landing navigation guard.
//!
//! Decides where a user who opened a room URL belongs: the game view if they
//! are seated in the room, the login view otherwise. Nothing is decided until
//! both the existence check and the room subscription have produced their
//! first answer, and a room that fails the existence check is never scanned.

use std::fmt;
use std::str::FromStr;

use crate::docs::{RoomDoc, RoomId};
use crate::docs_context::DocState;
use crate::error::{StoreError, ValidationError};
use crate::room_check::RoomStatus;

/// Which page of a room to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Login,
    Game,
}

impl View {
    pub fn as_str(self) -> &'static str {
        match self {
            View::Login => "login",
            View::Game => "game",
        }
    }
}

/// Application path: `/`, `/{roomId}/login` or `/{roomId}/game`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Room { room_id: RoomId, view: View },
}

impl Route {
    pub fn room(room_id: &RoomId, view: View) -> Self {
        Route::Room {
            room_id: room_id.clone(),
            view,
        }
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Route::Home => None,
            Route::Room { room_id, .. } => Some(room_id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => f.write_str("/"),
            Route::Room { room_id, view } => write!(f, "/{room_id}/{}", view.as_str()),
        }
    }
}

impl FromStr for Route {
    type Err = ValidationError;

    /// Parse a browser path. A bare `/{roomId}` lands on the login view.
    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Ok(Route::Home),
            [room_id] | [room_id, "login"] => Ok(Route::room(&RoomId::parse(room_id)?, View::Login)),
            [room_id, "game"] => Ok(Route::room(&RoomId::parse(room_id)?, View::Game)),
            _ => Err(ValidationError::InvalidRoomKey("Unknown page")),
        }
    }
}

/// What the landing page should do right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Existence check or first room value still pending.
    Wait,
    /// The room key does not resolve to a room.
    InvalidRoom,
    /// The store failed; the user may retry.
    Failed(StoreError),
    /// Go to this route.
    Navigate(Route),
}

/// Whether `uid` is seated in `room`.
pub fn is_member(room: &RoomDoc, uid: &str) -> bool {
    !uid.is_empty() && room.has_player(uid)
}

/// Compute the guard decision for `room_id` and the signed-in `uid` (empty
/// when signed out).
pub fn decide(
    status: &RoomStatus,
    room: &DocState<RoomDoc>,
    room_id: &RoomId,
    uid: &str,
) -> GuardDecision {
    match status {
        RoomStatus::Loading => GuardDecision::Wait,
        RoomStatus::Invalid => GuardDecision::InvalidRoom,
        RoomStatus::Error(err) => GuardDecision::Failed(err.clone()),
        RoomStatus::Valid => {
            if room.loading {
                return GuardDecision::Wait;
            }
            match (&room.doc, &room.error) {
                // Mirror still shows another room: not ours to judge yet.
                (Some(doc), _) if &doc.room_id != room_id => GuardDecision::Wait,
                (Some(doc), _) => {
                    let view = if is_member(doc, uid) {
                        View::Game
                    } else {
                        View::Login
                    };
                    GuardDecision::Navigate(Route::room(room_id, view))
                }
                (None, Some(err)) => GuardDecision::Failed(err.clone()),
                // Deleted after the check succeeded.
                (None, None) => GuardDecision::InvalidRoom,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::{Pfp, Player};

    fn room_id(id: &str) -> RoomId {
        RoomId::parse(id).unwrap()
    }

    fn abcd_with_u1() -> DocState<RoomDoc> {
        let mut doc = RoomDoc::new(room_id("ABCD"));
        doc.players.push(Player {
            uid: "u1".into(),
            username: "ana".into(),
            pfp: Pfp::Cat,
            room_id: room_id("ABCD"),
            cards: Vec::new(),
        });
        DocState {
            doc: Some(doc),
            loading: false,
            error: None,
        }
    }

    #[test]
    fn member_goes_to_game() {
        let decision = decide(&RoomStatus::Valid, &abcd_with_u1(), &room_id("ABCD"), "u1");
        assert_eq!(
            decision,
            GuardDecision::Navigate(Route::room(&room_id("ABCD"), View::Game))
        );
        assert_eq!(
            decision,
            GuardDecision::Navigate("/ABCD/game".parse().unwrap())
        );
    }

    #[test]
    fn stranger_goes_to_login() {
        let decision = decide(&RoomStatus::Valid, &abcd_with_u1(), &room_id("ABCD"), "u2");
        assert_eq!(
            decision,
            GuardDecision::Navigate(Route::room(&room_id("ABCD"), View::Login))
        );
        // Signed out users are never members.
        let decision = decide(&RoomStatus::Valid, &abcd_with_u1(), &room_id("ABCD"), "");
        assert!(matches!(
            decision,
            GuardDecision::Navigate(Route::Room { view: View::Login, .. })
        ));
    }

    #[test]
    fn waits_while_anything_is_loading() {
        let loaded = abcd_with_u1();
        assert_eq!(
            decide(&RoomStatus::Loading, &loaded, &room_id("ABCD"), "u1"),
            GuardDecision::Wait
        );
        let loading = DocState {
            loading: true,
            ..DocState::default()
        };
        assert_eq!(
            decide(&RoomStatus::Valid, &loading, &room_id("ABCD"), "u1"),
            GuardDecision::Wait
        );
    }

    #[test]
    fn invalid_room_short_circuits() {
        // Even a mirror that claims membership is ignored.
        assert_eq!(
            decide(&RoomStatus::Invalid, &abcd_with_u1(), &room_id("ZZZZ"), "u1"),
            GuardDecision::InvalidRoom
        );
    }

    #[test]
    fn failures_are_not_invalid() {
        let err = StoreError::Unavailable("offline".into());
        assert_eq!(
            decide(&RoomStatus::Error(err.clone()), &DocState::default(), &room_id("ABCD"), "u1"),
            GuardDecision::Failed(err.clone())
        );
        let broken = DocState {
            error: Some(err.clone()),
            ..DocState::default()
        };
        assert_eq!(
            decide(&RoomStatus::Valid, &broken, &room_id("ABCD"), "u1"),
            GuardDecision::Failed(err)
        );
    }

    #[test]
    fn mirror_of_other_room_waits() {
        assert_eq!(
            decide(&RoomStatus::Valid, &abcd_with_u1(), &room_id("WXYZ"), "u1"),
            GuardDecision::Wait
        );
    }

    #[test]
    fn routes_parse_and_print() {
        assert_eq!("/".parse::<Route>().unwrap(), Route::Home);
        assert_eq!("".parse::<Route>().unwrap(), Route::Home);
        assert_eq!(
            "/abcd".parse::<Route>().unwrap(),
            Route::room(&room_id("ABCD"), View::Login)
        );
        assert_eq!(
            "/ABCD/game/".parse::<Route>().unwrap().to_string(),
            "/ABCD/game"
        );
        assert!("/ABCD/lobby".parse::<Route>().is_err());
        assert!("/AB-CD/game".parse::<Route>().is_err());
    }
}

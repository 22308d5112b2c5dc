//! Room landing controller.
//!
//! Owns the existence check for the room in the URL, opens the room
//! subscription once the room is known to exist, and redirects between
//! `/{roomId}/login` and `/{roomId}/game` as membership changes. Also hosts
//! the lobby drawer actions (copy key, sign out, exit).

use uno_core::docs::RoomId;
use uno_core::docs_context::DocsContext;
use uno_core::error::Notice;
use uno_core::guard::{GuardDecision, Route, decide};
use uno_core::room_check::{RoomCheck, RoomStatus};
use uno_core::store::DocumentStore;

use crate::auth::AuthProvider;

/// System clipboard.
pub trait Clipboard {
    fn write_text(&self, text: &str);
}

/// Client-side router.
pub trait Router {
    fn navigate(&self, route: &Route);
}

impl<R: Router + ?Sized> Router for &R {
    fn navigate(&self, route: &Route) {
        (**self).navigate(route)
    }
}

pub struct RoomLanding<S: DocumentStore, R: Router> {
    check: RoomCheck<S>,
    router: R,
    uid: String,
    decision: GuardDecision,
    last_route: Option<Route>,
}

impl<S: DocumentStore, R: Router> RoomLanding<S, R> {
    /// Start landing on `room_id` as `uid` (empty when signed out).
    pub fn new(store: S, router: R, room_id: RoomId, uid: impl Into<String>) -> Self {
        Self {
            check: RoomCheck::new(store, room_id),
            router,
            uid: uid.into(),
            decision: GuardDecision::Wait,
            last_route: None,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        self.check.room_id()
    }

    pub fn status(&self) -> &RoomStatus {
        self.check.status()
    }

    pub fn decision(&self) -> &GuardDecision {
        &self.decision
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    /// Follow a different room key from the URL.
    pub fn set_room(&mut self, room_id: RoomId) {
        if self.check.set_room(room_id) {
            self.decision = GuardDecision::Wait;
            self.last_route = None;
        }
    }

    /// The router moved to `route` without us, e.g. back/forward or a typed
    /// URL. The next [`update`](Self::update) redirects again if the
    /// membership says the user belongs elsewhere.
    pub fn route_changed(&mut self, route: &Route) {
        self.last_route = Some(route.clone());
    }

    /// Re-run whatever failed: the existence check, the room subscription, or
    /// both. Returns `true` if the decision changed.
    pub fn retry<D: DocumentStore>(&mut self, docs: &mut DocsContext<D>) -> bool {
        let rechecking = self.check.retry();
        if docs.state().room.error.is_some() {
            // Same key, so subscribing again would be a no-op.
            docs.unsubscribe_room();
        }
        tracing::info!(room = %self.check.room_id(), rechecking, "retrying room");
        self.last_route = None;
        self.update(docs)
    }

    /// The signed-in uid changed.
    pub fn set_uid(&mut self, uid: impl Into<String>) {
        self.uid = uid.into();
    }

    /// Apply whatever has arrived (check answer, room pushes) and navigate
    /// if the target route changed. Returns `true` if the decision changed.
    pub fn update<D: DocumentStore>(&mut self, docs: &mut DocsContext<D>) -> bool {
        self.check.poll();
        let room_id = self.check.room_id();
        if *self.check.status() == RoomStatus::Valid {
            docs.subscribe_room(room_id);
        } else if docs.room_key().is_some_and(|key| key.room_id() != room_id) {
            docs.unsubscribe_room();
        }
        docs.try_recv();

        let decision = decide(self.check.status(), &docs.state().room, room_id, &self.uid);
        if let GuardDecision::Navigate(route) = &decision
            && self.last_route.as_ref() != Some(route)
        {
            tracing::info!(%route, "redirecting");
            self.router.navigate(route);
            self.last_route = Some(route.clone());
        }
        if decision == self.decision {
            return false;
        }
        tracing::debug!(room = %room_id, ?decision, "landing decision");
        self.decision = decision;
        true
    }

    /// Wait for the next input (the check's answer, or a room push once the
    /// check has resolved) and apply it. Returns `true` if the decision
    /// changed.
    ///
    /// Never completes while the room is invalid, since nothing is
    /// subscribed then.
    pub async fn next_change<D: DocumentStore>(&mut self, docs: &mut DocsContext<D>) -> bool {
        if self.check.status().is_resolved() {
            docs.recv().await;
        } else {
            self.check.resolved().await;
        }
        self.update(docs)
    }

    /// Drive the landing until the decision is no longer
    /// [`GuardDecision::Wait`].
    pub async fn settle<D: DocumentStore>(&mut self, docs: &mut DocsContext<D>) -> &GuardDecision {
        self.update(docs);
        while self.decision == GuardDecision::Wait {
            self.next_change(docs).await;
        }
        &self.decision
    }

    /// Copy the room key to the clipboard.
    pub fn copy_room_key<C: Clipboard>(&self, clipboard: &C) -> Notice {
        clipboard.write_text(self.room_id().as_str());
        Notice::success("Room key successfully copied!")
    }

    /// Sign out. The room document is left alone; the next
    /// [`update`](Self::update) sends the user to the login view.
    pub fn sign_out<A: AuthProvider>(&mut self, auth: &A) {
        auth.sign_out();
        self.uid.clear();
    }

    /// Leave the room for the home page.
    pub fn exit(&mut self) {
        self.router.navigate(&Route::Home);
        self.last_route = Some(Route::Home);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    use serde_json::json;
    use uno_core::docs::{Pfp, Player, RoomDoc};
    use uno_core::error::{NoticeLevel, StoreError};
    use uno_core::guard::View;
    use uno_core::memory_store::MemoryStore;
    use uno_core::store::DocKey;

    use crate::auth::tests::FakeAuth;

    #[derive(Default)]
    pub(crate) struct RecordingRouter {
        pub routes: RefCell<Vec<Route>>,
    }

    impl Router for RecordingRouter {
        fn navigate(&self, route: &Route) {
            self.routes.borrow_mut().push(route.clone());
        }
    }

    #[derive(Default)]
    struct RecordingClipboard {
        text: RefCell<Option<String>>,
    }

    impl Clipboard for RecordingClipboard {
        fn write_text(&self, text: &str) {
            *self.text.borrow_mut() = Some(text.to_string());
        }
    }

    fn room(id: &str) -> RoomId {
        RoomId::parse(id).unwrap()
    }

    fn seat(uid: &str, room_id: &str) -> Player {
        Player {
            uid: uid.into(),
            username: uid.to_uppercase(),
            pfp: Pfp::Dog,
            room_id: room(room_id),
            cards: Vec::new(),
        }
    }

    fn abcd_with_u1() -> MemoryStore {
        let store = MemoryStore::new();
        let mut doc = RoomDoc::new(room("ABCD"));
        doc.players.push(seat("u1", "ABCD"));
        store.insert_room(&doc).unwrap();
        store
    }

    #[test]
    fn member_is_sent_to_game_once() {
        let store = abcd_with_u1();
        let router = RecordingRouter::default();
        let mut docs = DocsContext::new(store.clone());
        let mut landing = RoomLanding::new(store.clone(), &router, room("ABCD"), "u1");

        assert!(landing.update(&mut docs));
        assert_eq!(*router.routes.borrow(), vec![Route::room(&room("ABCD"), View::Game)]);

        // A push that does not change membership does not navigate again.
        store.write(&DocKey::room(&room("ABCD")), json!({ "started": true }));
        assert!(!landing.update(&mut docs));
        assert_eq!(router.routes.borrow().len(), 1);
    }

    #[test]
    fn stranger_goes_to_login_then_game_after_joining() {
        let store = abcd_with_u1();
        let router = RecordingRouter::default();
        let mut docs = DocsContext::new(store.clone());
        let mut landing = RoomLanding::new(store.clone(), &router, room("ABCD"), "u2");

        landing.update(&mut docs);
        let players = json!([
            serde_json::to_value(seat("u1", "ABCD")).unwrap(),
            serde_json::to_value(seat("u2", "ABCD")).unwrap(),
        ]);
        store.write(&DocKey::room(&room("ABCD")), json!({ "players": players }));
        landing.update(&mut docs);

        assert_eq!(
            router.routes.borrow().iter().map(ToString::to_string).collect::<Vec<_>>(),
            ["/ABCD/login", "/ABCD/game"]
        );
    }

    #[test]
    fn missing_room_is_invalid_without_subscribing() {
        let store = abcd_with_u1();
        let router = RecordingRouter::default();
        let mut docs = DocsContext::new(store.clone());
        let mut landing = RoomLanding::new(store.clone(), &router, room("ZZZZ"), "u1");

        landing.update(&mut docs);
        assert_eq!(landing.decision(), &GuardDecision::InvalidRoom);
        assert!(docs.room_key().is_none());
        assert_eq!(store.subscriber_count(&DocKey::room(&room("ZZZZ"))), 0);
        assert!(router.routes.borrow().is_empty());
    }

    #[test]
    fn store_failure_is_not_invalid() {
        let store = abcd_with_u1();
        store.set_failure(Some(StoreError::Unavailable("offline".into())));
        let router = RecordingRouter::default();
        let mut docs = DocsContext::new(store.clone());
        let mut landing = RoomLanding::new(store.clone(), &router, room("ABCD"), "u1");

        landing.update(&mut docs);
        assert!(matches!(landing.decision(), GuardDecision::Failed(_)));
        assert!(router.routes.borrow().is_empty());
    }

    #[test]
    fn retry_recovers_from_a_failed_check() {
        let store = abcd_with_u1();
        store.set_failure(Some(StoreError::Unavailable("offline".into())));
        let router = RecordingRouter::default();
        let mut docs = DocsContext::new(store.clone());
        let mut landing = RoomLanding::new(store.clone(), &router, room("ABCD"), "u1");
        landing.update(&mut docs);
        assert_eq!(
            landing.decision(),
            &GuardDecision::Failed(StoreError::Unavailable("offline".into()))
        );

        store.set_failure(None);
        assert!(landing.retry(&mut docs));
        assert_eq!(
            landing.decision(),
            &GuardDecision::Navigate(Route::room(&room("ABCD"), View::Game))
        );
        assert_eq!(router.routes.borrow().len(), 1);
    }

    #[test]
    fn retry_reopens_a_failed_room_subscription() {
        let store = abcd_with_u1();
        let router = RecordingRouter::default();
        let mut docs = DocsContext::new(store.clone());
        let mut landing = RoomLanding::new(store.clone(), &router, room("ABCD"), "u1");

        // The check passes, then the subscription's first answer fails.
        store.set_failure(Some(StoreError::Unavailable("offline".into())));
        landing.update(&mut docs);
        assert!(matches!(landing.decision(), GuardDecision::Failed(_)));
        assert_eq!(landing.status(), &RoomStatus::Valid);

        store.set_failure(None);
        landing.retry(&mut docs);
        assert_eq!(store.subscriber_count(&DocKey::room(&room("ABCD"))), 1);
        assert_eq!(
            router.routes.borrow().last(),
            Some(&Route::room(&room("ABCD"), View::Game))
        );
    }

    #[test]
    fn seated_user_is_sent_back_to_game_after_leaving_it() {
        let store = abcd_with_u1();
        let router = RecordingRouter::default();
        let mut docs = DocsContext::new(store.clone());
        let mut landing = RoomLanding::new(store.clone(), &router, room("ABCD"), "u1");
        landing.update(&mut docs);

        // Browser back to the login page of the same room.
        let login = Route::room(&room("ABCD"), View::Login);
        landing.set_room(room("ABCD"));
        landing.route_changed(&login);
        store.write(&DocKey::room(&room("ABCD")), json!({ "started": true }));
        tokio_test::block_on(landing.next_change(&mut docs));

        assert_eq!(
            router.routes.borrow().iter().map(ToString::to_string).collect::<Vec<_>>(),
            ["/ABCD/game", "/ABCD/game"]
        );
    }

    #[test]
    fn switching_rooms_drops_old_subscription() {
        let store = abcd_with_u1();
        store.insert_room(&RoomDoc::new(room("WXYZ"))).unwrap();
        let router = RecordingRouter::default();
        let mut docs = DocsContext::new(store.clone());
        let mut landing = RoomLanding::new(store.clone(), &router, room("ABCD"), "u1");
        landing.update(&mut docs);

        landing.set_room(room("WXYZ"));
        assert_eq!(landing.decision(), &GuardDecision::Wait);
        landing.update(&mut docs);
        assert_eq!(store.subscriber_count(&DocKey::room(&room("ABCD"))), 0);
        assert_eq!(
            router.routes.borrow().last(),
            Some(&Route::room(&room("WXYZ"), View::Login))
        );
    }

    #[test]
    fn drawer_actions() {
        let store = abcd_with_u1();
        let router = RecordingRouter::default();
        let mut docs = DocsContext::new(store.clone());
        let mut landing = RoomLanding::new(store.clone(), &router, room("ABCD"), "u1");
        landing.update(&mut docs);

        let clipboard = RecordingClipboard::default();
        let notice = landing.copy_room_key(&clipboard);
        assert_eq!(clipboard.text.borrow().as_deref(), Some("ABCD"));
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(notice.text, "Room key successfully copied!");

        let before = store.get(&DocKey::room(&room("ABCD")));
        let auth = FakeAuth::ok("u1");
        *auth.uid.borrow_mut() = Some("u1".into());
        landing.sign_out(&auth);
        assert!(auth.current_uid().is_none());
        assert_eq!(store.get(&DocKey::room(&room("ABCD"))), before);
        landing.update(&mut docs);
        assert_eq!(
            router.routes.borrow().last(),
            Some(&Route::room(&room("ABCD"), View::Login))
        );

        landing.exit();
        assert_eq!(router.routes.borrow().last(), Some(&Route::Home));
    }

    #[tokio::test]
    async fn settle_waits_for_late_answers() {
        let store = MemoryStore::paused();
        let mut doc = RoomDoc::new(room("ABCD"));
        doc.players.push(seat("u1", "ABCD"));
        store.insert_room(&doc).unwrap();

        let router = RecordingRouter::default();
        let mut docs = DocsContext::new(store.clone());
        let mut landing = RoomLanding::new(store.clone(), &router, room("ABCD"), "u1");
        assert!(!landing.update(&mut docs));

        let resumer = store.clone();
        tokio::spawn(async move { resumer.resume() });
        let decision = landing.settle(&mut docs).await.clone();
        assert_eq!(
            decision,
            GuardDecision::Navigate(Route::room(&room("ABCD"), View::Game))
        );
    }
}

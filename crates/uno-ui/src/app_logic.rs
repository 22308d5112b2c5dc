//! Platform-agnostic session coroutine.
//!
//! Owns the relay connection, the [`DocsContext`] and the current
//! [`RoomLanding`], reacts to [`UiMessage`]s and publishes the mirrored state
//! into signals after every step. Parameterised over the platform's
//! [`Router`], [`Clipboard`], [`SessionStore`] and a connect function, so the
//! web crate only provides thin adapters.

use std::future::Future;

use dioxus::prelude::*;
use futures_util::StreamExt;
use uno_client::actions::{create_room, join_room};
use uno_client::auth::{AuthProvider, Identity, submit_username};
use uno_client::landing::{Clipboard, RoomLanding, Router};
use uno_client::remote::RemoteStore;
use uno_client::session::{SessionStore, StoredIdentity, restore_identity};
use uno_client::transport::TransportError;
use uno_core::docs::RoomId;
use uno_core::docs_context::{DocsContext, DocsState};
use uno_core::error::{AppError, Notice};
use uno_core::guard::{GuardDecision, Route, View};
use uno_core::username::UsernameForm;

use crate::UiMessage;

/// Signals the coroutine writes and the components read.
#[derive(Clone, Copy)]
pub struct AppSignals {
    pub docs: Signal<DocsState>,
    pub decision: Signal<GuardDecision>,
    pub notice: Signal<Option<Notice>>,
    /// A username submission is in flight.
    pub submitting: Signal<bool>,
    /// Signed-in uid, empty when signed out.
    pub uid: Signal<String>,
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

struct Session<R: Router + Clone> {
    store: RemoteStore,
    router: R,
    docs: DocsContext<RemoteStore>,
    landing: Option<RoomLanding<RemoteStore, R>>,
    identity: Option<Identity>,
}

impl<R: Router + Clone> Session<R> {
    fn new(store: RemoteStore, router: R, identity: Option<Identity>) -> Self {
        Self {
            docs: DocsContext::new(store.clone()),
            store,
            router,
            landing: None,
            identity,
        }
    }

    fn uid(&self) -> &str {
        self.identity.as_ref().map_or("", |identity| identity.uid.as_str())
    }

    /// Show `route`: land on its room, or leave the room for the home page.
    fn show(&mut self, route: &Route) {
        match route.room_id() {
            Some(room_id) => {
                let uid = self.uid().to_string();
                let landing = self.landing.get_or_insert_with(|| {
                    RoomLanding::new(self.store.clone(), self.router.clone(), room_id.clone(), uid)
                });
                landing.set_room(room_id.clone());
                // The router is already at `route`; redirect from there.
                landing.route_changed(route);
            }
            None => {
                self.landing = None;
                self.docs.leave();
            }
        }
        self.refresh();
    }

    /// Navigate and show.
    fn go(&mut self, route: Route) {
        self.router.navigate(&route);
        self.show(&route);
    }

    fn set_identity(&mut self, identity: Option<Identity>) {
        self.identity = identity;
        let uid = self.uid().to_string();
        if let Some(landing) = self.landing.as_mut() {
            landing.set_uid(uid);
        }
        self.refresh();
    }

    fn refresh(&mut self) {
        if let Some(landing) = self.landing.as_mut() {
            landing.update(&mut self.docs);
        }
        self.sync_player();
    }

    /// Follow our own player document while we are in the game view.
    fn sync_player(&mut self) {
        let seat = match (&self.landing, &self.identity) {
            (Some(landing), Some(identity)) => match landing.decision() {
                GuardDecision::Navigate(Route::Room {
                    room_id,
                    view: View::Game,
                }) => Some((identity.uid.clone(), room_id.clone())),
                _ => None,
            },
            _ => None,
        };
        match seat {
            Some((uid, room_id)) => self.docs.subscribe_player(&uid, &room_id),
            None => self.docs.unsubscribe_player(),
        }
    }

    /// Wait for the next change from the store and apply it.
    async fn progress(&mut self) {
        match self.landing.as_mut() {
            Some(landing) => {
                landing.next_change(&mut self.docs).await;
            }
            None => {
                self.docs.recv().await;
            }
        }
        self.sync_player();
    }

    /// Where the user currently is, for re-landing after a reconnect.
    fn current_route(&self) -> Route {
        match &self.landing {
            Some(landing) => match landing.decision() {
                GuardDecision::Navigate(route) => route.clone(),
                _ => Route::room(landing.room_id(), View::Login),
            },
            None => Route::Home,
        }
    }

    fn publish(&self, signals: &mut AppSignals) {
        signals.docs.set(self.docs.state().clone());
        signals.decision.set(
            self.landing
                .as_ref()
                .map_or(GuardDecision::Wait, |landing| landing.decision().clone()),
        );
        signals.uid.set(self.uid().to_string());
    }
}

// ---------------------------------------------------------------------------
// Message handling
// ---------------------------------------------------------------------------

async fn handle_message<R: Router + Clone>(
    session: &mut Session<R>,
    msg: UiMessage,
    clipboard: &impl Clipboard,
    session_store: &impl SessionStore,
    signals: &mut AppSignals,
) -> Result<(), AppError> {
    match msg {
        UiMessage::OpenRoom(raw) => {
            let room_id = RoomId::parse(&raw)?;
            session.go(Route::room(&room_id, View::Login));
        }
        UiMessage::CreateRoom => {
            let room_id = create_room(&session.store).await?;
            session.go(Route::room(&room_id, View::Login));
        }
        UiMessage::Submit(form) => {
            signals.submitting.set(true);
            let result = submit_and_join(session, &form, session_store).await;
            signals.submitting.set(false);
            result?;
        }
        UiMessage::Retry => {
            if let Some(landing) = session.landing.as_mut() {
                landing.retry(&mut session.docs);
            }
            session.sync_player();
        }
        UiMessage::CopyRoomKey => {
            if let Some(landing) = &session.landing {
                signals.notice.set(Some(landing.copy_room_key(clipboard)));
            }
        }
        UiMessage::SignOut => {
            match session.landing.as_mut() {
                Some(landing) => landing.sign_out(&session.store),
                None => session.store.sign_out(),
            }
            session_store.clear();
            session.set_identity(None);
        }
        UiMessage::Exit => {
            match session.landing.as_mut() {
                Some(landing) => landing.exit(),
                None => session.router.navigate(&Route::Home),
            }
            session.show(&Route::Home);
        }
        UiMessage::RouteChanged(route) => session.show(&route),
    }
    Ok(())
}

/// Sign in with the submitted profile and take a seat in the current room.
/// The landing then moves us to the game view once the seat shows up.
async fn submit_and_join<R: Router + Clone>(
    session: &mut Session<R>,
    form: &UsernameForm,
    session_store: &impl SessionStore,
) -> Result<(), AppError> {
    let identity = submit_username(form, &session.store).await?;
    session_store.save(&StoredIdentity::from(&identity));
    session.set_identity(Some(identity.clone()));
    if let Some(room_id) = session.landing.as_ref().map(|l| l.room_id().clone()) {
        join_room(&session.store, &room_id, &identity).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Coroutine
// ---------------------------------------------------------------------------

enum Step {
    Ui(Option<UiMessage>),
    Synced,
}

async fn open_session<R, F, Fut>(
    connect: &F,
    router: R,
    session_store: &impl SessionStore,
    signals: &mut AppSignals,
) -> Option<Session<R>>
where
    R: Router + Clone,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<RemoteStore, TransportError>>,
{
    match connect().await {
        Ok(store) => {
            let identity = restore_identity(&store, session_store);
            Some(Session::new(store, router, identity))
        }
        Err(e) => {
            tracing::error!(error = %e, "could not reach the document relay");
            signals
                .notice
                .set(Some(Notice::error("Could not reach the game server")));
            None
        }
    }
}

/// Drive the whole client session.
///
/// This is the async body a Dioxus `use_coroutine` should run. It connects,
/// lands on `initial`, then loops over UI messages and store pushes until
/// the UI goes away or the relay cannot be reached again.
pub async fn run_app_session<R, C, S, F, Fut>(
    mut rx: UnboundedReceiver<UiMessage>,
    mut signals: AppSignals,
    initial: Route,
    router: R,
    clipboard: C,
    session_store: S,
    connect: F,
) where
    R: Router + Clone,
    C: Clipboard,
    S: SessionStore,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<RemoteStore, TransportError>>,
{
    let Some(mut session) = open_session(&connect, router.clone(), &session_store, &mut signals).await
    else {
        return;
    };
    session.show(&initial);
    session.publish(&mut signals);

    loop {
        let step = tokio::select! {
            msg = rx.next() => Step::Ui(msg),
            _ = session.progress() => Step::Synced,
        };
        match step {
            Step::Ui(None) => return,
            Step::Ui(Some(msg)) => {
                if let Err(e) =
                    handle_message(&mut session, msg, &clipboard, &session_store, &mut signals).await
                {
                    tracing::warn!(error = %e, "action failed");
                    signals.notice.set(Some(e.notice()));
                }
            }
            Step::Synced => {}
        }

        if session.store.is_closed() {
            signals
                .notice
                .set(Some(Notice::info("Connection lost. Reconnecting…")));
            let route = session.current_route();
            match open_session(&connect, router.clone(), &session_store, &mut signals).await {
                Some(fresh) => {
                    session = fresh;
                    session.show(&route);
                    signals.notice.set(None);
                }
                None => {
                    session.publish(&mut signals);
                    return;
                }
            }
        }
        session.publish(&mut signals);
    }
}

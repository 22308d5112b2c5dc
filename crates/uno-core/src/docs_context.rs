//! Docs context: the live mirror of the current room document and the current
//! player's own document.
//!
//! One [`DocsContext`] is constructed per UI tree and shared with everything
//! beneath it, so components never open their own subscriptions. It keeps at
//! most one room subscription and one player subscription; switching keys
//! drops the old handle before the new one is opened. Updates are applied
//! only through [`DocsContext::try_recv`] / [`DocsContext::recv`]; an update
//! whose key is not the one currently wanted is discarded.

use serde::de::DeserializeOwned;

use crate::docs::{Player, RoomDoc, RoomId};
use crate::error::StoreError;
use crate::store::{DocEvent, DocKey, DocumentStore, Subscription, decode};

/// Latest known value of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocState<T> {
    /// Most recent decoded value; `None` before the first value or when the
    /// document does not exist.
    pub doc: Option<T>,
    /// Subscribed but no value received yet.
    pub loading: bool,
    /// Last error reported for the subscription.
    pub error: Option<StoreError>,
}

impl<T> Default for DocState<T> {
    fn default() -> Self {
        Self {
            doc: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> DocState<T> {
    fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }
}

/// Snapshot of everything the context mirrors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocsState {
    pub room: DocState<RoomDoc>,
    pub player: DocState<Player>,
}

/// Which halves of [`DocsState`] changed while processing events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextUpdate {
    pub room: bool,
    pub player: bool,
}

impl ContextUpdate {
    pub fn any(self) -> bool {
        self.room || self.player
    }
}

/// Owner of the room and player subscriptions.
pub struct DocsContext<S: DocumentStore> {
    store: S,
    state: DocsState,
    room_sub: Option<Subscription>,
    player_sub: Option<Subscription>,
}

impl<S: DocumentStore> DocsContext<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: DocsState::default(),
            room_sub: None,
            player_sub: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> &DocsState {
        &self.state
    }

    /// Key of the active room subscription.
    pub fn room_key(&self) -> Option<&DocKey> {
        self.room_sub.as_ref().map(Subscription::key)
    }

    /// Key of the active player subscription.
    pub fn player_key(&self) -> Option<&DocKey> {
        self.player_sub.as_ref().map(Subscription::key)
    }

    /// Follow `rooms/{room_id}`. No-op if already following it.
    pub fn subscribe_room(&mut self, room_id: &RoomId) {
        let key = DocKey::room(room_id);
        Self::resubscribe(&self.store, &mut self.room_sub, &mut self.state.room, key);
    }

    /// Follow `rooms/{room_id}/players/{uid}`. No-op if already following it.
    pub fn subscribe_player(&mut self, uid: &str, room_id: &RoomId) {
        let key = DocKey::player(room_id, uid);
        Self::resubscribe(&self.store, &mut self.player_sub, &mut self.state.player, key);
    }

    pub fn unsubscribe_room(&mut self) {
        if let Some(sub) = self.room_sub.take() {
            tracing::debug!(key = %sub.key(), "unsubscribing");
        }
        self.state.room = DocState::default();
    }

    pub fn unsubscribe_player(&mut self) {
        if let Some(sub) = self.player_sub.take() {
            tracing::debug!(key = %sub.key(), "unsubscribing");
        }
        self.state.player = DocState::default();
    }

    /// Drop both subscriptions, e.g. when leaving the room.
    pub fn leave(&mut self) {
        self.unsubscribe_room();
        self.unsubscribe_player();
    }

    /// Apply every update that is already queued, without waiting.
    pub fn try_recv(&mut self) -> ContextUpdate {
        ContextUpdate {
            room: Self::drain(&mut self.room_sub, &mut self.state.room),
            player: Self::drain(&mut self.player_sub, &mut self.state.player),
        }
    }

    /// Wait for at least one update on either subscription and apply it,
    /// together with anything else already queued.
    ///
    /// Never completes while nothing is subscribed.
    pub async fn recv(&mut self) -> ContextUpdate {
        let mut update = ContextUpdate::default();
        tokio::select! {
            event = next_event(&mut self.room_sub) => {
                update.room = Self::settle(&mut self.room_sub, &mut self.state.room, event);
            }
            event = next_event(&mut self.player_sub) => {
                update.player = Self::settle(&mut self.player_sub, &mut self.state.player, event);
            }
        }
        let queued = self.try_recv();
        update.room |= queued.room;
        update.player |= queued.player;
        update
    }

    // -- private -----------------------------------------------------------

    fn resubscribe<T>(
        store: &S,
        slot: &mut Option<Subscription>,
        state: &mut DocState<T>,
        key: DocKey,
    ) {
        if slot.as_ref().is_some_and(|sub| sub.key() == &key) {
            return;
        }
        // Release the old subscription before acquiring the new one.
        if let Some(old) = slot.take() {
            tracing::debug!(from = %old.key(), to = %key, "switching subscription");
        }
        *state = DocState::loading();
        *slot = Some(store.subscribe(&key));
        tracing::debug!(%key, "subscribed");
    }

    fn drain<T: DeserializeOwned>(
        slot: &mut Option<Subscription>,
        state: &mut DocState<T>,
    ) -> bool {
        let mut changed = false;
        while let Some(sub) = slot.as_mut() {
            match sub.try_next() {
                Ok(Some(event)) => changed |= apply(sub.key(), state, event),
                Ok(None) => break,
                Err(err) => {
                    changed |= Self::settle(slot, state, Err(err));
                    break;
                }
            }
        }
        changed
    }

    fn settle<T: DeserializeOwned>(
        slot: &mut Option<Subscription>,
        state: &mut DocState<T>,
        event: Result<DocEvent, StoreError>,
    ) -> bool {
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                // The channel is gone; the subscription can never deliver again.
                tracing::warn!(error = %err, "subscription closed");
                *slot = None;
                state.loading = false;
                state.error = Some(err);
                return true;
            }
        };
        match slot.as_ref() {
            Some(sub) => apply(sub.key(), state, event),
            None => false,
        }
    }
}

async fn next_event(slot: &mut Option<Subscription>) -> Result<DocEvent, StoreError> {
    match slot {
        Some(sub) => sub.next().await,
        None => std::future::pending().await,
    }
}

/// Apply one event to `state` if it belongs to `wanted`.
fn apply<T: DeserializeOwned>(wanted: &DocKey, state: &mut DocState<T>, event: DocEvent) -> bool {
    if &event.key != wanted {
        tracing::debug!(stale = %event.key, %wanted, "discarding update for superseded key");
        return false;
    }
    match event.update {
        Ok(Some(value)) => match decode::<T>(&event.key, value) {
            Ok(doc) => {
                state.doc = Some(doc);
                state.error = None;
            }
            Err(err) => {
                tracing::warn!(key = %event.key, error = %err, "undecodable document");
                state.doc = None;
                state.error = Some(err);
            }
        },
        Ok(None) => {
            state.doc = None;
            state.error = None;
        }
        // Transient backend error: keep the last good value alongside it.
        Err(err) => state.error = Some(err),
    }
    state.loading = false;
    true
}

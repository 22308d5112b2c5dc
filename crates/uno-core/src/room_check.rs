//! Room existence check.
//!
//! Answers "does `rooms/{roomId}` currently exist?" once per room key. The
//! answer starts as [`RoomStatus::Loading`] and moves exactly once to
//! `Valid`, `Invalid` or `Error`; changing the key cancels the outstanding
//! query and starts over.

use crate::docs::RoomId;
use crate::error::StoreError;
use crate::store::{DocKey, DocumentStore, Fetch};

/// Resolution of a room key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomStatus {
    /// The query is still in flight.
    Loading,
    /// A room document exists.
    Valid,
    /// No room document exists.
    Invalid,
    /// The store could not answer. Not the same as `Invalid`.
    Error(StoreError),
}

impl RoomStatus {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, RoomStatus::Loading)
    }
}

/// Owns the existence query for one room key at a time.
pub struct RoomCheck<S: DocumentStore> {
    store: S,
    room_id: RoomId,
    status: RoomStatus,
    query: Option<Fetch>,
}

impl<S: DocumentStore> RoomCheck<S> {
    /// Start checking `room_id`.
    pub fn new(store: S, room_id: RoomId) -> Self {
        let query = store.fetch(&DocKey::room(&room_id));
        tracing::debug!(room = %room_id, "checking room");
        Self {
            store,
            room_id,
            status: RoomStatus::Loading,
            query: Some(query),
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn status(&self) -> &RoomStatus {
        &self.status
    }

    /// Switch to another room key. Returns `false` if the key is unchanged.
    ///
    /// The previous query is dropped before the new one is issued, so a late
    /// answer for the old key can never be applied.
    pub fn set_room(&mut self, room_id: RoomId) -> bool {
        if room_id == self.room_id {
            return false;
        }
        self.query = None;
        tracing::debug!(from = %self.room_id, to = %room_id, "room key changed");
        self.status = RoomStatus::Loading;
        self.query = Some(self.store.fetch(&DocKey::room(&room_id)));
        self.room_id = room_id;
        true
    }

    /// Ask again after the store failed to answer. Does nothing unless the
    /// status is [`RoomStatus::Error`]; a definite answer is never re-checked.
    pub fn retry(&mut self) -> bool {
        if !matches!(self.status, RoomStatus::Error(_)) {
            return false;
        }
        tracing::debug!(room = %self.room_id, "retrying room check");
        self.status = RoomStatus::Loading;
        self.query = Some(self.store.fetch(&DocKey::room(&self.room_id)));
        true
    }

    /// Apply the answer if it has arrived. Returns `true` if the status
    /// changed during this call.
    pub fn poll(&mut self) -> bool {
        let Some(result) = self.query.as_mut().and_then(Fetch::try_take) else {
            return false;
        };
        self.settle(result);
        true
    }

    /// Wait until the current key is resolved and return the status.
    ///
    /// Cancel-safe: if the returned future is dropped the query stays
    /// outstanding.
    pub async fn resolved(&mut self) -> &RoomStatus {
        if let Some(query) = self.query.as_mut() {
            let result = query.recv().await;
            self.settle(result);
        }
        &self.status
    }

    fn settle(&mut self, result: Result<Option<serde_json::Value>, StoreError>) {
        self.query = None;
        self.status = match result {
            Ok(Some(_)) => RoomStatus::Valid,
            Ok(None) => RoomStatus::Invalid,
            Err(err) => {
                tracing::warn!(room = %self.room_id, error = %err, "room check failed");
                RoomStatus::Error(err)
            }
        };
        tracing::debug!(room = %self.room_id, status = ?self.status, "room check resolved");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::RoomDoc;
    use crate::memory_store::MemoryStore;

    fn room(id: &str) -> RoomId {
        RoomId::parse(id).unwrap()
    }

    fn store_with(ids: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for id in ids {
            store.insert_room(&RoomDoc::new(room(id))).unwrap();
        }
        store
    }

    #[test]
    fn existing_room_resolves_valid_once() {
        let store = store_with(&["ABCD"]);
        let mut check = RoomCheck::new(store.clone(), room("ABCD"));
        assert_eq!(check.status(), &RoomStatus::Loading);

        assert!(check.poll());
        assert_eq!(check.status(), &RoomStatus::Valid);

        // Later changes to the store do not make the answer flap.
        store.remove(&DocKey::room(&room("ABCD")));
        assert!(!check.poll());
        assert_eq!(check.status(), &RoomStatus::Valid);
    }

    #[test]
    fn missing_room_never_becomes_valid() {
        let store = store_with(&["ABCD"]);
        let mut check = RoomCheck::new(store.clone(), room("ZZZZ"));
        check.poll();
        assert_eq!(check.status(), &RoomStatus::Invalid);

        store.insert_room(&RoomDoc::new(room("ZZZZ"))).unwrap();
        check.poll();
        assert_eq!(check.status(), &RoomStatus::Invalid);
    }

    #[test]
    fn store_failure_is_not_invalid() {
        let store = store_with(&["ABCD"]);
        store.set_failure(Some(StoreError::PermissionDenied("rules".into())));
        let mut check = RoomCheck::new(store, room("ABCD"));
        check.poll();
        assert_eq!(
            check.status(),
            &RoomStatus::Error(StoreError::PermissionDenied("rules".into()))
        );
    }

    #[test]
    fn key_change_cancels_pending_answer() {
        let store = MemoryStore::paused();
        store.insert_room(&RoomDoc::new(room("ABCD"))).unwrap();
        let mut check = RoomCheck::new(store.clone(), room("ABCD"));

        assert!(check.set_room(room("ZZZZ")));
        assert!(!check.set_room(room("ZZZZ")));
        store.resume();

        check.poll();
        assert_eq!(check.room_id(), &room("ZZZZ"));
        assert_eq!(check.status(), &RoomStatus::Invalid);
    }

    #[test]
    fn failed_check_can_be_retried() {
        let store = store_with(&["ABCD"]);
        store.set_failure(Some(StoreError::Unavailable("offline".into())));
        let mut check = RoomCheck::new(store.clone(), room("ABCD"));
        check.poll();
        assert!(matches!(check.status(), RoomStatus::Error(_)));

        store.set_failure(None);
        assert!(check.retry());
        assert_eq!(check.status(), &RoomStatus::Loading);
        check.poll();
        assert_eq!(check.status(), &RoomStatus::Valid);

        // Resolved answers stay put.
        assert!(!check.retry());
        assert_eq!(check.status(), &RoomStatus::Valid);
    }

    #[test]
    fn resolved_is_pending_until_the_answer_arrives() {
        let store = MemoryStore::paused();
        store.insert_room(&RoomDoc::new(room("ABCD"))).unwrap();
        let mut check = RoomCheck::new(store.clone(), room("ABCD"));

        let mut resolved = tokio_test::task::spawn(check.resolved());
        tokio_test::assert_pending!(resolved.poll());
        store.resume();
        assert!(resolved.is_woken());
        assert_eq!(tokio_test::assert_ready!(resolved.poll()), &RoomStatus::Valid);
    }

    #[tokio::test]
    async fn resolved_waits_for_deferred_answer() {
        let store = MemoryStore::paused();
        store.insert_room(&RoomDoc::new(room("ABCD"))).unwrap();
        let mut check = RoomCheck::new(store.clone(), room("ABCD"));
        assert!(!check.poll());

        store.resume();
        assert_eq!(check.resolved().await, &RoomStatus::Valid);
        // Already resolved: returns immediately.
        assert_eq!(check.resolved().await, &RoomStatus::Valid);
    }
}

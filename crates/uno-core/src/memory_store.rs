//! In-process [`DocumentStore`].
//!
//! Backs the development relay server and every view-model test. A store can
//! be created *paused* so that fetch answers and initial snapshots queue up
//! until [`MemoryStore::resume`], which lets tests observe loading states and
//! key changes that happen before the first value arrives.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::docs::{RoomDoc, RoomId};
use crate::error::StoreError;
use crate::store::{
    DocEvent, DocKey, DocumentStore, Fetch, PendingWrite, Query, Release, Subscription, encode,
    merge_patch,
};

type Subscriber = mpsc::UnboundedSender<DocEvent>;

/// Work held back while the store is paused.
enum Deferred {
    Fetch(DocKey, oneshot::Sender<Result<Option<Value>, StoreError>>),
    Snapshot(DocKey, u64),
}

#[derive(Default)]
struct Inner {
    docs: HashMap<DocKey, Value>,
    subscribers: HashMap<DocKey, HashMap<u64, Subscriber>>,
    next_id: u64,
    paused: bool,
    deferred: Vec<Deferred>,
    /// When set, every fetch and new subscription fails with this error.
    failure: Option<StoreError>,
}

impl Inner {
    fn snapshot(&self, key: &DocKey) -> Result<Option<Value>, StoreError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.docs.get(key).cloned()),
        }
    }

    fn send_snapshot(&self, key: &DocKey, id: u64) {
        if let Some(tx) = self.subscribers.get(key).and_then(|subs| subs.get(&id)) {
            let _ = tx.send(DocEvent {
                key: key.clone(),
                update: self.snapshot(key),
            });
        }
    }

    fn notify(&mut self, key: &DocKey) {
        let Some(subs) = self.subscribers.get_mut(key) else {
            return;
        };
        let doc = self.docs.get(key).cloned();
        // Drop subscribers whose receiver is gone.
        subs.retain(|_, tx| {
            tx.send(DocEvent {
                key: key.clone(),
                update: Ok(doc.clone()),
            })
            .is_ok()
        });
    }
}

/// Shared, cloneable in-memory document store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that holds fetch answers and initial snapshots until
    /// [`resume`](Self::resume) is called.
    pub fn paused() -> Self {
        let store = Self::default();
        store.inner.lock().paused = true;
        store
    }

    /// Deliver everything held back and stop deferring.
    pub fn resume(&self) {
        let mut inner = self.inner.lock();
        inner.paused = false;
        for work in std::mem::take(&mut inner.deferred) {
            match work {
                Deferred::Fetch(key, tx) => {
                    let _ = tx.send(inner.snapshot(&key));
                }
                Deferred::Snapshot(key, id) => inner.send_snapshot(&key, id),
            }
        }
    }

    /// Make subsequent fetches and subscriptions fail (or succeed again with
    /// `None`).
    pub fn set_failure(&self, failure: Option<StoreError>) {
        self.inner.lock().failure = failure;
    }

    /// Seed or replace a document and notify its subscribers.
    pub fn insert(&self, key: DocKey, value: Value) {
        let mut inner = self.inner.lock();
        inner.docs.insert(key.clone(), value);
        inner.notify(&key);
    }

    /// Seed a room document.
    pub fn insert_room(&self, room: &RoomDoc) -> Result<(), StoreError> {
        self.insert(DocKey::room(&room.room_id), encode(room)?);
        Ok(())
    }

    /// Delete a document and notify its subscribers.
    pub fn remove(&self, key: &DocKey) {
        let mut inner = self.inner.lock();
        if inner.docs.remove(key).is_some() {
            inner.notify(key);
        }
    }

    /// Current value of a document.
    pub fn get(&self, key: &DocKey) -> Option<Value> {
        self.inner.lock().docs.get(key).cloned()
    }

    /// Keys of every stored room document.
    pub fn room_ids(&self) -> Vec<RoomId> {
        let inner = self.inner.lock();
        let mut ids: Vec<RoomId> = inner
            .docs
            .keys()
            .filter_map(|key| match key {
                DocKey::Room(room_id) => Some(room_id.clone()),
                DocKey::Player { .. } => None,
            })
            .collect();
        ids.sort();
        ids
    }

    /// Number of live subscriptions on `key`.
    pub fn subscriber_count(&self, key: &DocKey) -> usize {
        self.inner
            .lock()
            .subscribers
            .get(key)
            .map_or(0, HashMap::len)
    }

    fn unsubscribe(inner: &Weak<Mutex<Inner>>, key: &DocKey, id: u64) {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let mut inner = inner.lock();
        if let Some(subs) = inner.subscribers.get_mut(key) {
            subs.remove(&id);
            if subs.is_empty() {
                inner.subscribers.remove(key);
            }
        }
        tracing::trace!(%key, id, "memory store subscription released");
    }
}

impl DocumentStore for MemoryStore {
    fn fetch(&self, key: &DocKey) -> Fetch {
        let mut inner = self.inner.lock();
        let (tx, rx) = oneshot::channel();
        if inner.paused {
            inner.deferred.push(Deferred::Fetch(key.clone(), tx));
        } else {
            let _ = tx.send(inner.snapshot(key));
        }
        Query::new(rx, Release::noop())
    }

    fn subscribe(&self, key: &DocKey) -> Subscription {
        let mut inner = self.inner.lock();
        let (tx, rx) = mpsc::unbounded_channel();
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .subscribers
            .entry(key.clone())
            .or_default()
            .insert(id, tx);

        if inner.paused {
            inner.deferred.push(Deferred::Snapshot(key.clone(), id));
        } else {
            inner.send_snapshot(key, id);
        }

        let weak = Arc::downgrade(&self.inner);
        let release_key = key.clone();
        Subscription::new(
            key.clone(),
            rx,
            Release::new(move || Self::unsubscribe(&weak, &release_key, id)),
        )
    }

    fn write(&self, key: &DocKey, patch: Value) -> PendingWrite {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.failure.clone() {
            return Query::ready(Err(err));
        }
        let mut doc = inner.docs.remove(key).unwrap_or(Value::Null);
        merge_patch(&mut doc, &patch);
        if !doc.is_null() {
            inner.docs.insert(key.clone(), doc);
        }
        inner.notify(key);
        Query::ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(id: &str) -> DocKey {
        DocKey::room(&RoomId::parse(id).unwrap())
    }

    #[test]
    fn fetch_distinguishes_missing_from_failure() {
        let store = MemoryStore::new();
        store.insert(key("ABCD"), json!({ "roomId": "ABCD" }));

        assert!(matches!(store.fetch(&key("ABCD")).try_take(), Some(Ok(Some(_)))));
        assert_eq!(store.fetch(&key("ZZZZ")).try_take(), Some(Ok(None)));

        store.set_failure(Some(StoreError::Unavailable("offline".into())));
        assert_eq!(
            store.fetch(&key("ABCD")).try_take(),
            Some(Err(StoreError::Unavailable("offline".into())))
        );
    }

    #[test]
    fn subscription_gets_snapshot_then_changes() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(&key("ABCD"));

        let first = sub.try_next().unwrap().unwrap();
        assert_eq!(first.update, Ok(None));

        store.write(&key("ABCD"), json!({ "roomId": "ABCD", "started": false }));
        store.write(&key("ABCD"), json!({ "started": true }));

        let second = sub.try_next().unwrap().unwrap();
        assert_eq!(second.update.unwrap().unwrap()["started"], false);
        let third = sub.try_next().unwrap().unwrap();
        assert_eq!(third.update.unwrap().unwrap()["started"], true);
        assert!(sub.try_next().unwrap().is_none());
    }

    #[test]
    fn dropping_subscription_releases_it() {
        let store = MemoryStore::new();
        let sub = store.subscribe(&key("ABCD"));
        let other = store.subscribe(&key("ABCD"));
        assert_eq!(store.subscriber_count(&key("ABCD")), 2);

        drop(sub);
        assert_eq!(store.subscriber_count(&key("ABCD")), 1);
        drop(other);
        assert_eq!(store.subscriber_count(&key("ABCD")), 0);

        // Writes after release reach nobody and do not fail.
        assert_eq!(
            store.write(&key("ABCD"), json!({ "roomId": "ABCD" })).try_take(),
            Some(Ok(()))
        );
    }

    #[test]
    fn paused_store_defers_until_resume() {
        let store = MemoryStore::paused();
        store.insert(key("ABCD"), json!({ "roomId": "ABCD" }));

        let mut fetch = store.fetch(&key("ABCD"));
        let mut sub = store.subscribe(&key("ABCD"));
        assert!(fetch.try_take().is_none());
        assert!(sub.try_next().unwrap().is_none());

        store.resume();
        assert!(matches!(fetch.try_take(), Some(Ok(Some(_)))));
        assert!(sub.try_next().unwrap().is_some());
    }

    #[test]
    fn null_patch_deletes_document() {
        let store = MemoryStore::new();
        store.insert(key("ABCD"), json!({ "roomId": "ABCD" }));
        store.write(&key("ABCD"), Value::Null);
        assert!(store.get(&key("ABCD")).is_none());
        assert!(store.room_ids().is_empty());
    }
}

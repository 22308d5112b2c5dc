//! Document-store abstraction.
//!
//! The realtime backend is consumed through [`DocumentStore`]: a one-shot
//! [`fetch`](DocumentStore::fetch), a live [`subscribe`](DocumentStore::subscribe)
//! and a merge-patch [`write`](DocumentStore::write). Every call hands back an
//! owned handle ([`Query`] or [`Subscription`]); dropping the handle releases
//! the backend resources, and because the receiving half of the channel goes
//! with it, nothing is delivered after the drop.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};

use crate::docs::RoomId;
use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Address of a document: `rooms/{roomId}` or `rooms/{roomId}/players/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DocKey {
    Room(RoomId),
    Player { room_id: RoomId, uid: String },
}

impl DocKey {
    pub fn room(room_id: &RoomId) -> Self {
        Self::Room(room_id.clone())
    }

    pub fn player(room_id: &RoomId, uid: &str) -> Self {
        Self::Player {
            room_id: room_id.clone(),
            uid: uid.to_string(),
        }
    }

    /// The room this key lives under.
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::Room(room_id) | Self::Player { room_id, .. } => room_id,
        }
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Room(room_id) => write!(f, "rooms/{room_id}"),
            Self::Player { room_id, uid } => write!(f, "rooms/{room_id}/players/{uid}"),
        }
    }
}

impl FromStr for DocKey {
    type Err = StoreError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = path.split('/').collect();
        let room = |raw: &str| {
            RoomId::parse(raw).map_err(|e| StoreError::Malformed(format!("{path}: {e}")))
        };
        match segments.as_slice() {
            ["rooms", room_id] => Ok(Self::Room(room(*room_id)?)),
            ["rooms", room_id, "players", uid] if !uid.is_empty() => Ok(Self::Player {
                room_id: room(*room_id)?,
                uid: (*uid).to_string(),
            }),
            _ => Err(StoreError::Malformed(format!("not a document path: {path}"))),
        }
    }
}

impl TryFrom<String> for DocKey {
    type Error = StoreError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        path.parse()
    }
}

impl From<DocKey> for String {
    fn from(key: DocKey) -> Self {
        key.to_string()
    }
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Runs a cleanup closure exactly once, when dropped.
pub struct Release(Option<Box<dyn FnOnce() + Send>>);

impl Release {
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    /// A release with nothing to clean up.
    pub fn noop() -> Self {
        Self(None)
    }
}

impl Drop for Release {
    fn drop(&mut self) {
        if let Some(release) = self.0.take() {
            release();
        }
    }
}

impl fmt::Debug for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Release").field(&self.0.is_some()).finish()
    }
}

/// One pushed change: the latest value of `key` (`None` if it was deleted),
/// or the error the backend reported for the subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct DocEvent {
    pub key: DocKey,
    pub update: Result<Option<Value>, StoreError>,
}

/// Live subscription to a single document.
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    key: DocKey,
    rx: mpsc::UnboundedReceiver<DocEvent>,
    _release: Release,
}

impl Subscription {
    pub fn new(key: DocKey, rx: mpsc::UnboundedReceiver<DocEvent>, release: Release) -> Self {
        Self {
            key,
            rx,
            _release: release,
        }
    }

    /// The key this subscription was opened for.
    pub fn key(&self) -> &DocKey {
        &self.key
    }

    /// Take the next queued event without waiting.
    ///
    /// `Ok(None)` means nothing is queued; `Err(Disconnected)` means the store
    /// will never deliver again.
    pub fn try_next(&mut self) -> Result<Option<DocEvent>, StoreError> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(StoreError::Disconnected),
        }
    }

    /// Wait for the next event.
    pub async fn next(&mut self) -> Result<DocEvent, StoreError> {
        self.rx.recv().await.ok_or(StoreError::Disconnected)
    }
}

/// A single pending request (fetch or write). Dropping it cancels interest in
/// the answer.
#[derive(Debug)]
pub struct Query<T> {
    rx: oneshot::Receiver<Result<T, StoreError>>,
    _release: Release,
}

/// Outcome of [`DocumentStore::fetch`]: the document, or `None` if absent.
pub type Fetch = Query<Option<Value>>;

/// Outcome of [`DocumentStore::write`].
pub type PendingWrite = Query<()>;

impl<T> Query<T> {
    pub fn new(rx: oneshot::Receiver<Result<T, StoreError>>, release: Release) -> Self {
        Self {
            rx,
            _release: release,
        }
    }

    /// A query that is already answered.
    pub fn ready(result: Result<T, StoreError>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self::new(rx, Release::noop())
    }

    /// Take the answer if it has arrived.
    pub fn try_take(&mut self) -> Option<Result<T, StoreError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(StoreError::Disconnected)),
        }
    }

    /// Wait for the answer. Cancel-safe: dropping the future keeps the query
    /// pending.
    pub async fn recv(&mut self) -> Result<T, StoreError> {
        (&mut self.rx)
            .await
            .unwrap_or(Err(StoreError::Disconnected))
    }
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// A realtime key/value document service.
pub trait DocumentStore {
    /// Read a document once.
    fn fetch(&self, key: &DocKey) -> Fetch;

    /// Follow a document. The current value is pushed first, then every
    /// change, in the order the backend emits them.
    fn subscribe(&self, key: &DocKey) -> Subscription;

    /// Apply a JSON merge patch (see [`merge_patch`]). Writing to an absent
    /// document creates it.
    fn write(&self, key: &DocKey, patch: Value) -> PendingWrite;
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn fetch(&self, key: &DocKey) -> Fetch {
        (**self).fetch(key)
    }

    fn subscribe(&self, key: &DocKey) -> Subscription {
        (**self).subscribe(key)
    }

    fn write(&self, key: &DocKey, patch: Value) -> PendingWrite {
        (**self).write(key, patch)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn fetch(&self, key: &DocKey) -> Fetch {
        (**self).fetch(key)
    }

    fn subscribe(&self, key: &DocKey) -> Subscription {
        (**self).subscribe(key)
    }

    fn write(&self, key: &DocKey, patch: Value) -> PendingWrite {
        (**self).write(key, patch)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Decode a stored document into its typed form.
pub fn decode<T: DeserializeOwned>(key: &DocKey, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Malformed(format!("{key}: {e}")))
}

/// Encode a typed document for [`DocumentStore::write`].
pub fn encode<T: Serialize>(doc: &T) -> Result<Value, StoreError> {
    serde_json::to_value(doc).map_err(|e| StoreError::Malformed(e.to_string()))
}

/// Apply an RFC 7386 JSON merge patch in place.
///
/// Objects merge key by key, `null` removes a key, and any other patch value
/// replaces the target outright.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target) = target {
        for (name, value) in patch {
            if value.is_null() {
                target.remove(name);
            } else {
                merge_patch(target.entry(name.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

//! [`DocumentStore`] and [`AuthProvider`] backed by the document relay.
//!
//! Requests go out as [`ClientMessage`] frames on a background writer task;
//! a reader task feeds every [`ServerMessage`] into [`RemoteStore::dispatch`],
//! which routes it to the waiting [`Query`] or [`Subscription`] by id.
//!
//! Use [`RemoteStore::from_transport`] with any
//! [`Transport`](crate::transport::Transport), or [`RemoteStore::connect_ws`].

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use uno_core::error::{AuthError, StoreError};
use uno_core::protocol::{ClientMessage, ServerMessage};
use uno_core::store::{
    DocEvent, DocKey, DocumentStore, Fetch, PendingWrite, Query, Release, Subscription,
};

use crate::auth::AuthProvider;
#[cfg(feature = "native")]
use crate::transport::{FrameReader, FrameWriter, Transport};

type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    fetches: HashMap<u64, Reply<Option<Value>>>,
    writes: HashMap<u64, Reply<()>>,
    sign_ins: HashMap<u64, oneshot::Sender<Result<String, AuthError>>>,
    subscriptions: HashMap<u64, (DocKey, mpsc::UnboundedSender<DocEvent>)>,
    uid: Option<String>,
    closed: bool,
}

impl Registry {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

struct Shared {
    outgoing: mpsc::UnboundedSender<ClientMessage>,
    registry: Mutex<Registry>,
}

/// Handle to one relay connection. Cheap to clone; every clone shares the
/// same connection and pending requests.
#[derive(Clone)]
pub struct RemoteStore {
    shared: Arc<Shared>,
}

impl RemoteStore {
    /// A store with no I/O attached. Frames to send appear on the returned
    /// receiver; replies are fed in through [`dispatch`](Self::dispatch).
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<ClientMessage>) {
        let (outgoing, rx) = mpsc::unbounded_channel();
        let store = Self {
            shared: Arc::new(Shared {
                outgoing,
                registry: Mutex::new(Registry::default()),
            }),
        };
        (store, rx)
    }

    /// Run a store over any [`Transport`], spawning the reader and writer
    /// tasks.
    #[cfg(feature = "native")]
    pub fn from_transport<T: Transport>(transport: T) -> Self {
        let (reader, writer) = transport.split();
        let (store, outgoing) = Self::detached();
        Self::spawn_reader_task(reader, Arc::downgrade(&store.shared));
        Self::spawn_writer_task(writer, outgoing);
        store
    }

    /// Connect to the relay's WebSocket endpoint.
    #[cfg(feature = "native")]
    pub async fn connect_ws(url: &str) -> Result<Self, crate::transport::TransportError> {
        let transport = crate::ws_transport::WsTransport::connect(url).await?;
        Ok(Self::from_transport(transport))
    }

    /// Connect from the browser. Uses `gloo-net` and `spawn_local`, so the
    /// I/O tasks need not be `Send`.
    #[cfg(all(feature = "web", not(feature = "native")))]
    pub async fn connect_ws(url: &str) -> Result<Self, crate::transport::TransportError> {
        use crate::transport::TransportError;
        use futures_util::{SinkExt, StreamExt};
        use gloo_net::websocket::{Message, futures::WebSocket};

        let ws = WebSocket::open(url).map_err(|e| TransportError::Connect(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();
        let (store, mut outgoing) = Self::detached();
        let weak = Arc::downgrade(&store.shared);

        wasm_bindgen_futures::spawn_local(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if !Self::deliver(&weak, &text) {
                            return;
                        }
                    }
                    Ok(Message::Bytes(_)) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "relay connection failed");
                        break;
                    }
                }
            }
            if let Some(shared) = weak.upgrade() {
                Self { shared }.close();
            }
        });

        wasm_bindgen_futures::spawn_local(async move {
            while let Some(msg) = outgoing.recv().await {
                let Ok(json) = serde_json::to_string(&msg) else {
                    continue;
                };
                if sink.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        });

        Ok(store)
    }

    /// Route one relay message to whoever is waiting for it.
    pub fn dispatch(&self, msg: ServerMessage) {
        let mut registry = self.shared.registry.lock();
        match msg {
            ServerMessage::Document { request_id, doc } => {
                if let Some(tx) = registry.fetches.remove(&request_id) {
                    let _ = tx.send(Ok(doc));
                }
            }
            ServerMessage::Changed { sub_id, key, doc } => match registry.subscriptions.get(&sub_id) {
                Some((_, tx)) => {
                    let _ = tx.send(DocEvent {
                        key,
                        update: Ok(doc),
                    });
                }
                None => tracing::trace!(sub_id, %key, "change for released subscription"),
            },
            ServerMessage::WriteAck { request_id } => {
                if let Some(tx) = registry.writes.remove(&request_id) {
                    let _ = tx.send(Ok(()));
                }
            }
            ServerMessage::SignedIn { request_id, uid } => {
                tracing::info!(%uid, "signed in");
                registry.uid = Some(uid.clone());
                if let Some(tx) = registry.sign_ins.remove(&request_id) {
                    let _ = tx.send(Ok(uid));
                }
            }
            ServerMessage::Error {
                request_id,
                sub_id,
                kind,
                message,
            } => {
                tracing::debug!(?request_id, ?sub_id, ?kind, %message, "relay error");
                if let Some(id) = request_id {
                    if let Some(tx) = registry.fetches.remove(&id) {
                        let _ = tx.send(Err(kind.store_error(message.clone())));
                    } else if let Some(tx) = registry.writes.remove(&id) {
                        let _ = tx.send(Err(kind.store_error(message.clone())));
                    } else if let Some(tx) = registry.sign_ins.remove(&id) {
                        let _ = tx.send(Err(kind.auth_error(message.clone())));
                    }
                }
                if let Some((key, tx)) = sub_id.and_then(|id| registry.subscriptions.get(&id)) {
                    let _ = tx.send(DocEvent {
                        key: key.clone(),
                        update: Err(kind.store_error(message)),
                    });
                }
            }
        }
    }

    /// Mark the connection as gone. Pending requests fail with
    /// [`StoreError::Disconnected`] and every subscription ends.
    pub fn close(&self) {
        let mut registry = self.shared.registry.lock();
        if registry.closed {
            return;
        }
        registry.closed = true;
        tracing::warn!("relay connection closed");
        for (_, tx) in registry.fetches.drain() {
            let _ = tx.send(Err(StoreError::Disconnected));
        }
        for (_, tx) in registry.writes.drain() {
            let _ = tx.send(Err(StoreError::Disconnected));
        }
        for (_, tx) in registry.sign_ins.drain() {
            let _ = tx.send(Err(AuthError::Unavailable("connection closed".into())));
        }
        // Dropping the senders ends each subscription's channel.
        registry.subscriptions.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.registry.lock().closed
    }

    /// Reuse a uid from an earlier session instead of signing in again.
    pub fn restore_uid(&self, uid: String) {
        self.shared.registry.lock().uid = Some(uid);
    }

    // -- private -----------------------------------------------------------

    fn send(&self, msg: ClientMessage) {
        if self.shared.outgoing.send(msg).is_err() {
            self.close();
        }
    }

    /// Parse and dispatch one frame. Returns `false` once the store is gone.
    fn deliver(weak: &Weak<Shared>, frame: &str) -> bool {
        let Some(shared) = weak.upgrade() else {
            return false;
        };
        match uno_core::protocol::parse_server_frame(frame) {
            Some(msg) => Self { shared }.dispatch(msg),
            None => tracing::warn!(%frame, "unrecognised relay frame"),
        }
        true
    }

    fn forget_request(weak: Weak<Shared>, id: u64) -> Release {
        Release::new(move || {
            if let Some(shared) = weak.upgrade() {
                let mut registry = shared.registry.lock();
                registry.fetches.remove(&id);
                registry.writes.remove(&id);
            }
        })
    }

    #[cfg(feature = "native")]
    fn spawn_reader_task<R: FrameReader>(mut reader: R, weak: Weak<Shared>) {
        tokio::spawn(async move {
            loop {
                match reader.next_frame().await {
                    Ok(Some(frame)) => {
                        if !Self::deliver(&weak, &frame) {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "relay connection failed");
                        break;
                    }
                }
            }
            if let Some(shared) = weak.upgrade() {
                Self { shared }.close();
            }
        });
    }

    #[cfg(feature = "native")]
    fn spawn_writer_task<W: FrameWriter>(
        mut writer: W,
        mut outgoing: mpsc::UnboundedReceiver<ClientMessage>,
    ) {
        tokio::spawn(async move {
            while let Some(msg) = outgoing.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(error = %e, "unserializable client frame");
                        continue;
                    }
                };
                if writer.send_frame(json).await.is_err() {
                    break;
                }
            }
        });
    }
}

impl DocumentStore for RemoteStore {
    fn fetch(&self, key: &DocKey) -> Fetch {
        let (tx, rx) = oneshot::channel();
        let request_id = {
            let mut registry = self.shared.registry.lock();
            if registry.closed {
                return Query::ready(Err(StoreError::Disconnected));
            }
            let id = registry.next_id();
            registry.fetches.insert(id, tx);
            id
        };
        self.send(ClientMessage::Get {
            request_id,
            key: key.clone(),
        });
        Query::new(rx, Self::forget_request(Arc::downgrade(&self.shared), request_id))
    }

    fn subscribe(&self, key: &DocKey) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let sub_id = {
            let mut registry = self.shared.registry.lock();
            if registry.closed {
                // `tx` is dropped here, so the subscription reports
                // `Disconnected` on first read.
                return Subscription::new(key.clone(), rx, Release::noop());
            }
            let id = registry.next_id();
            registry.subscriptions.insert(id, (key.clone(), tx));
            id
        };
        self.send(ClientMessage::Subscribe {
            sub_id,
            key: key.clone(),
        });

        let weak = Arc::downgrade(&self.shared);
        let release = Release::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let live = {
                let mut registry = shared.registry.lock();
                registry.subscriptions.remove(&sub_id).is_some() && !registry.closed
            };
            if live {
                let _ = shared.outgoing.send(ClientMessage::Unsubscribe { sub_id });
            }
        });
        Subscription::new(key.clone(), rx, release)
    }

    fn write(&self, key: &DocKey, patch: Value) -> PendingWrite {
        let (tx, rx) = oneshot::channel();
        let request_id = {
            let mut registry = self.shared.registry.lock();
            if registry.closed {
                return Query::ready(Err(StoreError::Disconnected));
            }
            let id = registry.next_id();
            registry.writes.insert(id, tx);
            id
        };
        self.send(ClientMessage::Write {
            request_id,
            key: key.clone(),
            patch,
        });
        Query::new(rx, Self::forget_request(Arc::downgrade(&self.shared), request_id))
    }
}

impl AuthProvider for RemoteStore {
    async fn sign_in(&self) -> Result<String, AuthError> {
        let (tx, rx) = oneshot::channel();
        let request_id = {
            let mut registry = self.shared.registry.lock();
            if let Some(uid) = &registry.uid {
                return Ok(uid.clone());
            }
            if registry.closed {
                return Err(AuthError::Unavailable("connection closed".into()));
            }
            let id = registry.next_id();
            registry.sign_ins.insert(id, tx);
            id
        };
        self.send(ClientMessage::SignIn { request_id });
        rx.await
            .unwrap_or_else(|_| Err(AuthError::Unavailable("connection closed".into())))
    }

    fn sign_out(&self) {
        if let Some(uid) = self.shared.registry.lock().uid.take() {
            tracing::info!(%uid, "signed out");
        }
    }

    fn current_uid(&self) -> Option<String> {
        self.shared.registry.lock().uid.clone()
    }
}

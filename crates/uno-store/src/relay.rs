//! Per-connection request handling.
//!
//! A [`Connection`] answers every [`ClientMessage`] from one socket against
//! the shared [`MemoryStore`]. Each subscription is forwarded by its own task,
//! which owns the store [`Subscription`](uno_core::store::Subscription);
//! aborting the task releases it.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uno_core::error::StoreError;
use uno_core::memory_store::MemoryStore;
use uno_core::protocol::{ClientMessage, ServerMessage};
use uno_core::store::{DocumentStore, Query};

pub struct Connection {
    store: MemoryStore,
    out: mpsc::UnboundedSender<ServerMessage>,
    subscriptions: HashMap<u64, JoinHandle<()>>,
}

impl Connection {
    pub fn new(store: MemoryStore, out: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            store,
            out,
            subscriptions: HashMap::new(),
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Process one client message. Replies go to the outgoing channel.
    pub fn handle(&mut self, msg: ClientMessage) {
        match msg {
            ClientMessage::Get { request_id, key } => {
                tracing::debug!(request_id, %key, "get");
                self.answer(self.store.fetch(&key), move |result| match result {
                    Ok(doc) => ServerMessage::Document { request_id, doc },
                    Err(e) => ServerMessage::request_error(request_id, &e),
                });
            }
            ClientMessage::Subscribe { sub_id, key } => {
                tracing::debug!(sub_id, %key, "subscribe");
                let mut sub = self.store.subscribe(&key);
                let out = self.out.clone();
                let task = tokio::spawn(async move {
                    while let Ok(event) = sub.next().await {
                        let msg = match event.update {
                            Ok(doc) => ServerMessage::Changed {
                                sub_id,
                                key: event.key,
                                doc,
                            },
                            Err(e) => ServerMessage::subscription_error(sub_id, &e),
                        };
                        if out.send(msg).is_err() {
                            break;
                        }
                    }
                });
                if let Some(previous) = self.subscriptions.insert(sub_id, task) {
                    previous.abort();
                }
            }
            ClientMessage::Unsubscribe { sub_id } => {
                tracing::debug!(sub_id, "unsubscribe");
                if let Some(task) = self.subscriptions.remove(&sub_id) {
                    task.abort();
                }
            }
            ClientMessage::Write {
                request_id,
                key,
                patch,
            } => {
                tracing::debug!(request_id, %key, "write");
                self.answer(self.store.write(&key, patch), move |result| match result {
                    Ok(()) => ServerMessage::WriteAck { request_id },
                    Err(e) => ServerMessage::request_error(request_id, &e),
                });
            }
            ClientMessage::SignIn { request_id } => {
                let uid = generate_uid();
                tracing::info!(%uid, "anonymous sign-in");
                let _ = self.out.send(ServerMessage::SignedIn { request_id, uid });
            }
        }
    }

    /// Reply as soon as `query` resolves: immediately if it already has.
    fn answer<T: Send + 'static>(
        &self,
        mut query: Query<T>,
        reply: impl FnOnce(Result<T, StoreError>) -> ServerMessage + Send + 'static,
    ) {
        if let Some(result) = query.try_take() {
            let _ = self.out.send(reply(result));
            return;
        }
        let out = self.out.clone();
        tokio::spawn(async move {
            let result = query.recv().await;
            let _ = out.send(reply(result));
        });
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        for (_, task) in self.subscriptions.drain() {
            task.abort();
        }
    }
}

/// Random hex uid for an anonymous user.
fn generate_uid() -> String {
    use rand::RngExt;
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uno_core::docs::{RoomDoc, RoomId};
    use uno_core::protocol::ErrorKind;
    use uno_core::store::DocKey;

    fn abcd() -> DocKey {
        DocKey::room(&RoomId::parse("ABCD").unwrap())
    }

    fn connection() -> (Connection, MemoryStore, mpsc::UnboundedReceiver<ServerMessage>) {
        let store = MemoryStore::new();
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::new(store.clone(), tx), store, rx)
    }

    #[tokio::test]
    async fn get_answers_with_document_or_nothing() {
        let (mut conn, store, mut rx) = connection();
        conn.handle(ClientMessage::Get {
            request_id: 1,
            key: abcd(),
        });
        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::Document {
                request_id: 1,
                doc: None
            })
        );

        store
            .insert_room(&RoomDoc::new(RoomId::parse("ABCD").unwrap()))
            .unwrap();
        conn.handle(ClientMessage::Get {
            request_id: 2,
            key: abcd(),
        });
        let Some(ServerMessage::Document { request_id: 2, doc: Some(doc) }) = rx.recv().await
        else {
            panic!("expected document");
        };
        assert_eq!(doc["roomId"], "ABCD");
    }

    #[tokio::test]
    async fn write_is_acked_and_pushed_to_subscribers() {
        let (mut conn, _store, mut rx) = connection();
        conn.handle(ClientMessage::Subscribe {
            sub_id: 9,
            key: abcd(),
        });
        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::Changed {
                sub_id: 9,
                key: abcd(),
                doc: None
            })
        );

        conn.handle(ClientMessage::Write {
            request_id: 3,
            key: abcd(),
            patch: json!({ "roomId": "ABCD" }),
        });
        assert_eq!(rx.recv().await, Some(ServerMessage::WriteAck { request_id: 3 }));
        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::Changed {
                sub_id: 9,
                key: abcd(),
                doc: Some(json!({ "roomId": "ABCD" }))
            })
        );
    }

    #[tokio::test]
    async fn unsubscribe_and_disconnect_release_store_subscriptions() {
        let (mut conn, store, mut rx) = connection();
        conn.handle(ClientMessage::Subscribe {
            sub_id: 1,
            key: abcd(),
        });
        conn.handle(ClientMessage::Subscribe {
            sub_id: 2,
            key: abcd(),
        });
        rx.recv().await;
        rx.recv().await;
        assert_eq!(store.subscriber_count(&abcd()), 2);

        conn.handle(ClientMessage::Unsubscribe { sub_id: 1 });
        assert_eq!(conn.subscription_count(), 1);
        drop(conn);
        // Aborted tasks drop their subscriptions once the scheduler runs them.
        for _ in 0..10 {
            if store.subscriber_count(&abcd()) == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(store.subscriber_count(&abcd()), 0);
    }

    #[tokio::test]
    async fn store_failures_are_reported_by_kind() {
        let (mut conn, store, mut rx) = connection();
        store.set_failure(Some(StoreError::PermissionDenied("read only".into())));
        conn.handle(ClientMessage::Write {
            request_id: 4,
            key: abcd(),
            patch: json!({}),
        });
        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::Error {
                request_id: Some(4),
                sub_id: None,
                kind: ErrorKind::PermissionDenied,
                message: "read only".into(),
            })
        );
    }

    #[tokio::test]
    async fn sign_in_issues_fresh_uids() {
        let (mut conn, _store, mut rx) = connection();
        conn.handle(ClientMessage::SignIn { request_id: 5 });
        conn.handle(ClientMessage::SignIn { request_id: 6 });
        let Some(ServerMessage::SignedIn { uid: first, .. }) = rx.recv().await else {
            panic!("expected SignedIn");
        };
        let Some(ServerMessage::SignedIn { uid: second, .. }) = rx.recv().await else {
            panic!("expected SignedIn");
        };
        assert_eq!(first.len(), 32);
        assert_ne!(first, second);
    }
}

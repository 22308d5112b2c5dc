//! WebSocket connection loop.
//!
//! Frames are parsed into [`ClientMessage`]s and handed to the connection's
//! [`Connection`]; everything it answers is serialized by a writer task.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uno_core::memory_store::MemoryStore;
use uno_core::protocol::{ClientMessage, ErrorKind, ServerMessage};

use crate::relay::Connection;

pub async fn handle_socket(socket: WebSocket, store: MemoryStore) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let write_handle = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(_) => continue,
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    tracing::info!("client connected");
    let mut conn = Connection::new(store, tx.clone());
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => conn.handle(msg),
                Err(e) => {
                    tracing::debug!(error = %e, "rejecting frame");
                    let _ = tx.send(ServerMessage::Error {
                        request_id: None,
                        sub_id: None,
                        kind: ErrorKind::Malformed,
                        message: format!("Invalid message: {e}"),
                    });
                }
            },
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    tracing::info!(subscriptions = conn.subscription_count(), "client disconnected");
    drop(conn);
    write_handle.abort();
}

//! Wire protocol between the client and the document relay.
//!
//! JSON text frames, one message per frame, tagged by `type`. Requests carry
//! a client-chosen `request_id` (or `sub_id` for subscriptions) that the
//! relay echoes back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AuthError, StoreError};
use crate::store::DocKey;

/// Messages sent from client to relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Read a document once.
    Get { request_id: u64, key: DocKey },

    /// Follow a document until `Unsubscribe`.
    Subscribe { sub_id: u64, key: DocKey },

    Unsubscribe { sub_id: u64 },

    /// Apply a JSON merge patch.
    Write {
        request_id: u64,
        key: DocKey,
        patch: Value,
    },

    /// Anonymous sign-in.
    SignIn { request_id: u64 },
}

/// Messages sent from relay to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Answer to `Get`; `doc` is absent if the document does not exist.
    Document {
        request_id: u64,
        doc: Option<Value>,
    },

    /// Current value of a subscribed document.
    Changed {
        sub_id: u64,
        key: DocKey,
        doc: Option<Value>,
    },

    WriteAck { request_id: u64 },

    SignedIn { request_id: u64, uid: String },

    /// Failure of the request or subscription named by the ids.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sub_id: Option<u64>,
        kind: ErrorKind,
        message: String,
    },
}

/// Category of a relay-reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unavailable,
    PermissionDenied,
    Malformed,
}

impl ErrorKind {
    pub fn store_error(self, message: String) -> StoreError {
        match self {
            ErrorKind::Unavailable => StoreError::Unavailable(message),
            ErrorKind::PermissionDenied => StoreError::PermissionDenied(message),
            ErrorKind::Malformed => StoreError::Malformed(message),
        }
    }

    pub fn auth_error(self, message: String) -> AuthError {
        match self {
            ErrorKind::Unavailable => AuthError::Unavailable(message),
            ErrorKind::PermissionDenied | ErrorKind::Malformed => AuthError::Rejected(message),
        }
    }
}

impl From<&StoreError> for ErrorKind {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::Unavailable(_) | StoreError::Disconnected => ErrorKind::Unavailable,
            StoreError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            StoreError::Malformed(_) => ErrorKind::Malformed,
        }
    }
}

impl ServerMessage {
    /// Build an `Error` reply for a failed request.
    pub fn request_error(request_id: u64, err: &StoreError) -> Self {
        ServerMessage::Error {
            request_id: Some(request_id),
            sub_id: None,
            kind: err.into(),
            message: err.detail().to_string(),
        }
    }

    /// Build an `Error` reply for a failed subscription.
    pub fn subscription_error(sub_id: u64, err: &StoreError) -> Self {
        ServerMessage::Error {
            request_id: None,
            sub_id: Some(sub_id),
            kind: err.into(),
            message: err.detail().to_string(),
        }
    }
}

/// Parse a raw text frame from the relay.
///
/// Returns `None` for empty input or unrecognised JSON.
pub fn parse_server_frame(frame: &str) -> Option<ServerMessage> {
    let trimmed = frame.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::RoomId;
    use serde_json::json;

    #[test]
    fn client_frames_use_type_tag_and_paths() {
        let msg = ClientMessage::Subscribe {
            sub_id: 7,
            key: DocKey::room(&RoomId::parse("ABCD").unwrap()),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "type": "Subscribe", "sub_id": 7, "key": "rooms/ABCD" })
        );
    }

    #[test]
    fn server_frames_parse() {
        let frame = r#"{"type":"Changed","sub_id":3,"key":"rooms/ABCD/players/u1","doc":null}"#;
        assert_eq!(
            parse_server_frame(frame),
            Some(ServerMessage::Changed {
                sub_id: 3,
                key: DocKey::player(&RoomId::parse("ABCD").unwrap(), "u1"),
                doc: None,
            })
        );
        assert!(parse_server_frame("   ").is_none());
        assert!(parse_server_frame(r#"{"type":"Nope"}"#).is_none());
        assert!(parse_server_frame(r#"{"type":"Changed","sub_id":1,"key":"bad","doc":null}"#).is_none());
    }

    #[test]
    fn errors_keep_their_category() {
        let err = StoreError::PermissionDenied("rules".into());
        let ServerMessage::Error { kind, message, .. } = ServerMessage::request_error(1, &err) else {
            panic!("expected error frame");
        };
        assert_eq!(kind.store_error(message), err);
        assert_eq!(ErrorKind::from(&StoreError::Disconnected), ErrorKind::Unavailable);
    }
}

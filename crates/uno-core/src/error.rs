//! Error taxonomy shared by every layer of the client.
//!
//! Store failures are kept apart from "room not found": a missing document is
//! `Ok(None)` at the store level and [`AppError::NotFound`] at the app level,
//! while [`StoreError`] always means the backend itself misbehaved.

use thiserror::Error;

use crate::docs::RoomId;

/// Failures reported by a [`DocumentStore`](crate::store::DocumentStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Network or backend failure. Retrying may succeed.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the read or write.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A document exists but does not match the expected schema.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// The connection to the store was closed.
    #[error("document store connection closed")]
    Disconnected,
}

impl StoreError {
    /// Whether re-issuing the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Disconnected)
    }

    /// The backend's message without the category prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::Unavailable(msg) | Self::PermissionDenied(msg) | Self::Malformed(msg) => msg,
            Self::Disconnected => "connection closed",
        }
    }
}

/// User input that must be corrected before anything is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid username")]
    MissingUsername,

    #[error("Invalid profile picture!")]
    MissingAvatar,

    #[error("{0}")]
    InvalidRoomKey(&'static str),
}

/// Anonymous sign-in failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("sign-in rejected: {0}")]
    Rejected(String),

    #[error("auth provider unavailable: {0}")]
    Unavailable(String),
}

/// Top-level error for user-triggered operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Room {room_id} does not exist")]
    NotFound { room_id: RoomId },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl AppError {
    /// The toast shown to the user for this error.
    ///
    /// Auth failures are deliberately vague; the detail goes to the log.
    pub fn notice(&self) -> Notice {
        match self {
            Self::Auth(_) => Notice::error("Something went wrong"),
            Self::Store(e) if e.is_retryable() => {
                Notice::error("Connection problem, please try again")
            }
            other => Notice::error(other.to_string()),
        }
    }
}

/// How a [`Notice`] should be styled. The UI layer decides what that means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A short user-visible notification (toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

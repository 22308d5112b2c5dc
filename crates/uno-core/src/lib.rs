//! Room documents, the document-store abstraction and the view models that
//! keep a client's mirror of a room in sync.

pub mod docs;
pub mod docs_context;
pub mod error;
pub mod guard;
pub mod memory_store;
pub mod presentation;
pub mod protocol;
pub mod room_check;
pub mod store;
pub mod username;

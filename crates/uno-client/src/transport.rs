//! Frame transport between the client and the document relay.
//!
//! [`RemoteStore`](crate::remote::RemoteStore) only needs something that
//! carries text frames both ways; the WebSocket implementation lives in
//! [`ws_transport`](crate::ws_transport).

use std::future::Future;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach the relay.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The relay closed the connection.
    #[error("connection closed")]
    Closed,

    #[error("{0}")]
    Io(String),
}

/// Receiving half of a connection.
pub trait FrameReader: Send + 'static {
    /// Next text frame. `Ok(None)` on a clean close.
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;
}

/// Sending half of a connection.
pub trait FrameWriter: Send + 'static {
    fn send_frame(&mut self, frame: String) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// A connection that can be split so reading and writing run as separate
/// tasks.
pub trait Transport: Send + 'static {
    type Reader: FrameReader;
    type Writer: FrameWriter;

    fn split(self) -> (Self::Reader, Self::Writer);
}

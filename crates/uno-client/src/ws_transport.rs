//! WebSocket [`Transport`] for native targets (CLI, tests against a local
//! relay).

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::transport::{FrameReader, FrameWriter, Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A connected WebSocket, not yet split into halves.
pub struct WsTransport {
    stream: WsStream,
}

impl WsTransport {
    /// Open a `ws://` or `wss://` connection.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        tracing::debug!(%url, "websocket connected");
        Ok(Self { stream })
    }
}

impl Transport for WsTransport {
    type Reader = WsReader;
    type Writer = WsWriter;

    fn split(self) -> (Self::Reader, Self::Writer) {
        let (sink, stream) = self.stream.split();
        (WsReader { stream }, WsWriter { sink })
    }
}

/// Receiving half. Yields one relay frame per text message; binary, ping and
/// pong frames are skipped, and a close frame ends the stream.
pub struct WsReader {
    stream: SplitStream<WsStream>,
}

impl FrameReader for WsReader {
    async fn next_frame(&mut self) -> Result<Option<String>, TransportError> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => return Ok(Some(text.to_string())),
                Ok(Message::Close(_)) => return Ok(None),
                // Binary and control frames carry nothing for us.
                Ok(_) => {}
                Err(e) => return Err(TransportError::Io(e.to_string())),
            }
        }
        Ok(None)
    }
}

/// Sending half. Each frame goes out as a single text message; writing to a
/// closed socket reports [`TransportError::Closed`].
pub struct WsWriter {
    sink: SplitSink<WsStream, Message>,
}

impl FrameWriter for WsWriter {
    async fn send_frame(&mut self, frame: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::text(frame))
            .await
            .map_err(|e| match e {
                tokio_tungstenite::tungstenite::Error::ConnectionClosed
                | tokio_tungstenite::tungstenite::Error::AlreadyClosed => TransportError::Closed,
                other => TransportError::Io(other.to_string()),
            })
    }
}

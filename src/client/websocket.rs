//! WebSocket line transport.
//!
//! Each text frame received is treated as one feed line. Pings are answered
//! automatically and a close frame ends the stream.
//!
//! # Example
//!
//! ```rust,no_run
//! use poloniex_book::client::{LineTransport, WebSocketTransport};
//!
//! # async fn example() -> poloniex_book::Result<()> {
//! let mut ws = WebSocketTransport::new("wss://feed.example.com/stream")
//!     .with_subscribe_frame(r#"{"command":"subscribe","channel":"BTC_ETH"}"#);
//!
//! ws.start().await?;
//! while let Some(line) = ws.next_line().await? {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use super::transport::LineTransport;
use crate::error::Error;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default limit on the TCP, TLS and WebSocket handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

struct Connection {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
}

/// A [`LineTransport`] over a WebSocket connection
pub struct WebSocketTransport {
    url: String,
    subscribe_frame: Option<String>,
    connect_timeout: Duration,
    connection: Option<Connection>,
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("url", &self.url)
            .field("subscribe_frame", &self.subscribe_frame)
            .field("connect_timeout", &self.connect_timeout)
            .field("connected", &self.connection.is_some())
            .finish()
    }
}

impl WebSocketTransport {
    /// Create a transport for `url` (`ws://` or `wss://`)
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            subscribe_frame: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            connection: None,
        }
    }

    /// Text frame to send right after every (re)connect
    #[must_use]
    pub fn with_subscribe_frame(mut self, frame: impl Into<String>) -> Self {
        self.subscribe_frame = Some(frame.into());
        self
    }

    /// Set how long [`start`](LineTransport::start) waits for the handshake
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Get the endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether a connection is open
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

#[async_trait]
impl LineTransport for WebSocketTransport {
    async fn start(&mut self) -> Result<(), Error> {
        if self.connection.is_some() {
            return Err(Error::InvalidState("websocket transport already started".into()));
        }

        let connect = tokio_tungstenite::connect_async(self.url.as_str());
        let (ws_stream, _response) = tokio::time::timeout(self.connect_timeout, connect).await??;
        let (mut write, read) = ws_stream.split();

        if let Some(frame) = &self.subscribe_frame {
            write.send(Message::Text(frame.clone())).await?;
        }

        info!(url = %self.url, "websocket connected");
        self.connection = Some(Connection { write, read });
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>, Error> {
        let conn = self
            .connection
            .as_mut()
            .ok_or_else(|| Error::Transport("websocket transport not started".into()))?;

        loop {
            let Some(frame) = conn.read.next().await else {
                return Ok(None);
            };
            match frame? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Ping(data) => conn.write.send(Message::Pong(data)).await?,
                Message::Close(frame) => {
                    debug!(?frame, "websocket closed by peer");
                    return Ok(None);
                }
                // Binary, Pong and raw frames carry no feed lines
                _ => continue,
            }
        }
    }

    async fn stop(&mut self) -> Result<(), Error> {
        let Some(mut conn) = self.connection.take() else {
            return Ok(());
        };
        // The peer may already be gone
        if let Err(e) = conn.write.close().await {
            debug!(error = %e, "websocket close failed");
        }
        info!(url = %self.url, "websocket disconnected");
        Ok(())
    }
}

// Rust guideline compliant 2026-10-16

//! WebSocket adapter for the `PushTransport` and `PushConnection` ports.
//!
//! Only text frames reach the Connection Manager. Binary frames are skipped,
//! protocol-level ping/pong control frames are answered by `tungstenite`
//! itself, and a close frame ends the stream.

use domain::{ChannelError, PushConnection, PushTransport};
use futures_util::{SinkExt as _, StreamExt as _};
use std::fmt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// `PushTransport` adapter dialing one WebSocket URL.
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl PushTransport for WsTransport {
    type Connection = WsConnection;

    async fn connect(&self) -> Result<WsConnection, ChannelError> {
        let (stream, response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::ConnectFailed { reason: e.to_string() })?;
        tracing::debug!(url = %self.url, status = %response.status(), "ws_transport.connected");
        Ok(WsConnection { stream })
    }
}

/// One open WebSocket.
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl fmt::Debug for WsConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsConnection").finish_non_exhaustive()
    }
}

impl PushConnection for WsConnection {
    async fn send_text(&mut self, text: &str) -> Result<(), ChannelError> {
        self.stream
            .send(Message::Text(text.to_owned()))
            .await
            .map_err(|e| ChannelError::Transport { reason: e.to_string() })
    }

    async fn next_text(&mut self) -> Option<Result<String, ChannelError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "ws_transport.closed_by_peer");
                    return None;
                }
                Ok(_) => {}
                Err(e) => return Some(Err(ChannelError::Transport { reason: e.to_string() })),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "ws_transport.close_failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

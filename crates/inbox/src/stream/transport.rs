//! Frame transports: the seam between the streaming state machine and the wire.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{HeaderValue, header::COOKIE},
        protocol::Message,
    },
};
use tracing::{debug, trace, warn};
use url::Url;

use crate::api::install_rustls_provider;
use crate::error::{NotificationError, Result};

/// An open, text-framed, bidirectional channel.
#[async_trait]
pub trait FrameChannel: Send {
    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Next text frame; `None` once the peer closed the channel.
    async fn next_text(&mut self) -> Option<Result<String>>;

    /// Close the channel, ignoring errors.
    async fn close(&mut self) {}
}

/// Opens frame channels.
#[async_trait]
pub trait FrameTransport: Send + Sync + 'static {
    async fn open(&self, url: &Url) -> Result<Box<dyn FrameChannel>>;
}

/// WebSocket transport backed by tokio-tungstenite.
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport {
    cookies: Option<String>,
}

impl WebSocketTransport {
    /// `cookies` is sent as the `Cookie` header of the upgrade request.
    pub fn new(cookies: Option<String>) -> Self {
        Self {
            cookies: cookies.filter(|c| !c.trim().is_empty()),
        }
    }
}

#[async_trait]
impl FrameTransport for WebSocketTransport {
    async fn open(&self, url: &Url) -> Result<Box<dyn FrameChannel>> {
        install_rustls_provider();

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| NotificationError::connection(format!("Invalid WebSocket request: {e}")))?;

        if let Some(cookies) = &self.cookies {
            match HeaderValue::from_str(cookies) {
                Ok(value) => {
                    request.headers_mut().insert(COOKIE, value);
                }
                Err(e) => warn!(error = %e, "Ignoring cookies that are not a valid header value"),
            }
        }

        let (stream, response) = connect_async(request)
            .await
            .map_err(|e| NotificationError::connection(e.to_string()))?;
        debug!(%url, status = %response.status(), "WebSocket handshake complete");

        Ok(Box::new(WebSocketChannel { stream }))
    }
}

struct WebSocketChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameChannel for WebSocketChannel {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| NotificationError::connection(e.to_string()))
    }

    async fn next_text(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => warn!("Skipping non-UTF-8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "WebSocket closed by peer");
                    return None;
                }
                // Pings are answered by tungstenite on the next read/write.
                Ok(other) => trace!(len = other.len(), "Skipping control frame"),
                Err(e) => return Some(Err(NotificationError::connection(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}

// jmap-client/src/push.rs
//! Push notifications over the JMAP WebSocket transport (RFC 8887).
use crate::client::JmapClient;
use crate::error::{JmapError, Result};
use crate::http::HttpClient;
use crate::session::CAPABILITY_WEBSOCKET;
use futures_util::{SinkExt, Stream, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{AUTHORIZATION, SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const WEBSOCKET_PROTOCOL: &str = "jmap";
pub const PUSH_ENABLE_TYPE: &str = "WebSocketPushEnable";
pub const DEFAULT_DATA_TYPES: &[&str] = &["Email"];

/// Lifecycle of an open channel. Connecting is the `connect` future
/// itself; a channel only exists once the enable message is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    Open,
    Receiving,
    Closed,
}

/// A live push connection. Relays every inbound frame as JSON until the
/// server closes, the transport fails, or the channel is cancelled. It
/// never reconnects.
pub struct PushChannel {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    cancel: CancellationToken,
    state: PushState,
}

fn push_error(context: &str, e: impl std::fmt::Display) -> JmapError {
    JmapError::Push(format!("{}: {}", context, e))
}

fn decode(payload: &[u8]) -> Result<Value> {
    serde_json::from_slice(payload).map_err(|e| push_error("invalid notification", e))
}

impl PushChannel {
    /// Open the connection and enable push for `data_types`.
    pub async fn connect(url: &str, auth: &str, data_types: &[&str]) -> Result<Self> {
        let mut request = url
            .into_client_request()
            .map_err(|e| push_error("invalid push URL", e))?;
        let headers = request.headers_mut();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(auth).map_err(|e| push_error("invalid auth header", e))?,
        );
        headers.insert(
            SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static(WEBSOCKET_PROTOCOL),
        );

        debug!(url, "connecting push channel");
        let (mut ws, _) = connect_async(request)
            .await
            .map_err(|e| push_error("connect", e))?;

        let enable = json!({
            "@type": PUSH_ENABLE_TYPE,
            "dataTypes": data_types,
        });
        ws.send(Message::Text(enable.to_string()))
            .await
            .map_err(|e| push_error("enable push", e))?;

        info!(?data_types, "push channel open");
        Ok(Self {
            ws,
            cancel: CancellationToken::new(),
            state: PushState::Open,
        })
    }

    pub fn state(&self) -> PushState {
        self.state
    }

    /// Token that stops the channel from any task
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn shutdown(&mut self) {
        if self.state != PushState::Closed {
            if let Err(e) = self.ws.close(None).await {
                debug!(error = %e, "push close handshake failed");
            }
            self.state = PushState::Closed;
            info!("push channel closed");
        }
    }

    /// Next notification. `None` once the channel is closed or cancelled.
    ///
    /// A frame that is not JSON yields an error but keeps the channel
    /// open; a transport error yields one error and then closes it.
    pub async fn next(&mut self) -> Option<Result<Value>> {
        loop {
            if self.state == PushState::Closed {
                return None;
            }
            self.state = PushState::Receiving;

            let received = tokio::select! {
                _ = self.cancel.cancelled() => None,
                frame = self.ws.next() => Some(frame),
            };
            let Some(frame) = received else {
                self.shutdown().await;
                return None;
            };

            match frame {
                Some(Ok(Message::Text(text))) => return Some(decode(text.as_bytes())),
                Some(Ok(Message::Binary(data))) => return Some(decode(&data)),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "server closed push channel");
                    self.shutdown().await;
                    return None;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!(error = %e, "push transport failed");
                    self.state = PushState::Closed;
                    return Some(Err(push_error("receive", e)));
                }
                None => {
                    self.state = PushState::Closed;
                    return None;
                }
            }
        }
    }

    /// Close the connection
    pub async fn close(mut self) {
        self.shutdown().await;
    }

    /// Notifications as a lazy stream; consuming the channel makes it
    /// single-use.
    pub fn into_stream(self) -> impl Stream<Item = Result<Value>> {
        futures_util::stream::unfold(self, |mut channel| async move {
            channel.next().await.map(|item| (item, channel))
        })
    }
}

impl<C: HttpClient> JmapClient<C> {
    /// Discover the push endpoint and open a channel for `data_types`
    /// (`Email` when empty).
    pub async fn listen(&self, data_types: &[&str]) -> Result<PushChannel> {
        let session = self.session().await?;
        let capability = session
            .websocket()
            .filter(|ws| ws.supports_push)
            .ok_or_else(|| JmapError::Capability(CAPABILITY_WEBSOCKET.to_string()))?;

        let auth = self.auth_header().await?;
        let data_types = if data_types.is_empty() {
            DEFAULT_DATA_TYPES
        } else {
            data_types
        };
        PushChannel::connect(&capability.url, &auth, data_types).await
    }
}

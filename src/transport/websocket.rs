//! WebSocket transport using tokio-tungstenite.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use super::{Connection, Connector, Frame, FrameSink, FrameSource};
use crate::config::{ClientConfig, RoomCredential, PASSWORD_HEADER};
use crate::error::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Writing half of a WebSocket connection.
pub struct WsSink {
    inner: SplitSink<WsStream, Message>,
}

/// Reading half of a WebSocket connection.
pub struct WsSource {
    inner: SplitStream<WsStream>,
}

/// Opens `ws://<host>/ws/<room>` with the room password as a header.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    config: ClientConfig,
}

impl WebSocketConnector {
    /// Connector for the configured host.
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Sink = WsSink;
    type Source = WsSource;

    async fn connect(
        &self,
        credential: &RoomCredential,
    ) -> Result<Connection<WsSink, WsSource>, TransportError> {
        let url = self.config.endpoint(credential.room_id());

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        let password = HeaderValue::from_str(credential.password())
            .map_err(|_| TransportError::ConnectFailed("password is not a valid header value".to_string()))?;
        request.headers_mut().insert(PASSWORD_HEADER, password);

        let (stream, response) = connect_async(request)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        info!(%url, status = %response.status(), "connected to room");

        let (sink, source) = stream.split();
        Ok(Connection::new(WsSink { inner: sink }, WsSource { inner: source }))
    }
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let message = match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(data) => Message::Binary(data),
        };
        self.inner
            .send(message)
            .await
            .map_err(|e| TransportError::WriteFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner
            .close()
            .await
            .map_err(|e| TransportError::WriteFailed(e.to_string()))
    }
}

#[async_trait]
impl FrameSource for WsSource {
    async fn receive(&mut self) -> Result<Frame, TransportError> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text)),
                Some(Ok(Message::Binary(data))) => return Ok(Frame::Binary(data)),
                Some(Ok(Message::Close(reason))) => {
                    debug!(?reason, "server closed connection");
                    return Err(TransportError::ConnectionClosed);
                }
                // Ping/pong and raw frames are handled by tungstenite.
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    debug!(error = %e, "websocket read failed");
                    return Err(TransportError::ConnectionClosed);
                }
                None => return Err(TransportError::ConnectionClosed),
            }
        }
    }
}

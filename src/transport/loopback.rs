//! In-memory transport.
//!
//! Two connections wired back to back with bounded channels. Closing (or
//! dropping) one side's sink ends the other side's source, the same way a
//! socket close is observed by the peer.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Connection, Connector, Frame, FrameSink, FrameSource};
use crate::config::RoomCredential;
use crate::error::TransportError;

/// Writing half of a loopback connection.
pub struct LoopbackSink {
    tx: Option<mpsc::Sender<Frame>>,
}

/// Reading half of a loopback connection.
pub struct LoopbackSource {
    rx: mpsc::Receiver<Frame>,
}

/// A loopback connection.
pub type LoopbackConnection = Connection<LoopbackSink, LoopbackSource>;

/// Create two connected endpoints, each buffering up to `capacity` frames.
pub fn pair(capacity: usize) -> (LoopbackConnection, LoopbackConnection) {
    let (a_tx, b_rx) = mpsc::channel(capacity);
    let (b_tx, a_rx) = mpsc::channel(capacity);

    let a = Connection::new(LoopbackSink { tx: Some(a_tx) }, LoopbackSource { rx: a_rx });
    let b = Connection::new(LoopbackSink { tx: Some(b_tx) }, LoopbackSource { rx: b_rx });
    (a, b)
}

#[async_trait]
impl FrameSink for LoopbackSink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::ConnectionClosed)?;
        tx.send(frame)
            .await
            .map_err(|_| TransportError::WriteFailed("peer dropped".to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.tx.take();
        Ok(())
    }
}

#[async_trait]
impl FrameSource for LoopbackSource {
    async fn receive(&mut self) -> Result<Frame, TransportError> {
        self.rx.recv().await.ok_or(TransportError::ConnectionClosed)
    }
}

/// Connector handing out one pre-built loopback connection.
pub struct LoopbackConnector {
    conn: Mutex<Option<LoopbackConnection>>,
}

impl LoopbackConnector {
    /// Wrap a connection for a single `connect` call.
    pub fn new(conn: LoopbackConnection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }
}

#[async_trait]
impl Connector for LoopbackConnector {
    type Sink = LoopbackSink;
    type Source = LoopbackSource;

    async fn connect(&self, _credential: &RoomCredential) -> Result<LoopbackConnection, TransportError> {
        self.conn
            .lock()
            .map_err(|_| TransportError::ConnectFailed("connector poisoned".to_string()))?
            .take()
            .ok_or_else(|| TransportError::ConnectFailed("already connected".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_cross_over() {
        let (mut a, mut b) = pair(4);

        a.send(Frame::Text("ping".to_string())).await.unwrap();
        b.send(Frame::Binary(vec![1, 2])).await.unwrap();

        assert_eq!(b.receive().await.unwrap(), Frame::Text("ping".to_string()));
        assert_eq!(a.receive().await.unwrap(), Frame::Binary(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_close_ends_peer_source() {
        let (mut a, mut b) = pair(4);

        a.send(Frame::Text("last".to_string())).await.unwrap();
        a.close().await.unwrap();

        assert_eq!(b.receive().await.unwrap(), Frame::Text("last".to_string()));
        assert_eq!(b.receive().await.unwrap_err(), TransportError::ConnectionClosed);
        assert_eq!(
            a.send(Frame::Text("late".to_string())).await.unwrap_err(),
            TransportError::ConnectionClosed
        );
    }

    #[tokio::test]
    async fn test_connector_is_single_use() {
        let (a, _b) = pair(1);
        let connector = LoopbackConnector::new(a);
        let cred = RoomCredential::new("room", "pw").unwrap();

        assert!(connector.connect(&cred).await.is_ok());
        assert!(matches!(
            connector.connect(&cred).await,
            Err(TransportError::ConnectFailed(_))
        ));
    }
}

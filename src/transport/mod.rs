//! Transport layer for room connections.
//!
//! A connection is a pair of halves: a [`FrameSink`] for writing and a
//! [`FrameSource`] for reading. The handshake drives both halves together;
//! afterwards they are split and handed to the pump loops.

pub mod loopback;
mod websocket;

pub use loopback::{LoopbackConnector, LoopbackSink, LoopbackSource};
pub use websocket::{WebSocketConnector, WsSink, WsSource};

use async_trait::async_trait;

use crate::config::RoomCredential;
use crate::error::TransportError;

/// One transport frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame (JSON envelopes).
    Text(String),
    /// Binary frame (handshake values).
    Binary(Vec<u8>),
}

impl Frame {
    /// Frame payload as bytes, whatever the frame kind.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Text(text) => text.as_bytes(),
            Frame::Binary(data) => data,
        }
    }
}

/// Writing half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one frame.
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Close the connection. Further sends fail.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Reading half of a connection.
#[async_trait]
pub trait FrameSource: Send {
    /// Wait for the next frame.
    async fn receive(&mut self) -> Result<Frame, TransportError>;
}

/// Opens room connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Writing half produced by this connector.
    type Sink: FrameSink + 'static;
    /// Reading half produced by this connector.
    type Source: FrameSource + 'static;

    /// Connect to the room named in `credential`, presenting its password.
    async fn connect(
        &self,
        credential: &RoomCredential,
    ) -> Result<Connection<Self::Sink, Self::Source>, TransportError>;
}

/// A bidirectional connection made of two halves.
pub struct Connection<K, S> {
    sink: K,
    source: S,
}

impl<K: FrameSink, S: FrameSource> Connection<K, S> {
    /// Join two halves.
    pub fn new(sink: K, source: S) -> Self {
        Self { sink, source }
    }

    /// Send one frame.
    pub async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.sink.send(frame).await
    }

    /// Wait for the next frame.
    pub async fn receive(&mut self) -> Result<Frame, TransportError> {
        self.source.receive().await
    }

    /// Close the writing half.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.sink.close().await
    }

    /// Split into independent halves.
    pub fn into_split(self) -> (K, S) {
        (self.sink, self.source)
    }
}

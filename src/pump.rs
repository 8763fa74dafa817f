//! Inbound and outbound loops between a connection and the state machine.
//!
//! The inbound loop turns frames into [`SessionEvent`]s and forwards them in
//! order. The outbound loop drains the [`OutboundQueue`] onto the sink.
//! Enqueueing never blocks: a full queue drops the newest item.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::DecodeError;
use crate::events::{ErrorKind, SessionEvent};
use crate::protocol::{self, Envelope};
use crate::transport::{Frame, FrameSink, FrameSource};

/// Result of a non-blocking enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// Accepted for sending.
    Queued,
    /// Queue full; the item was discarded.
    Dropped,
    /// The outbound loop is gone; the item was discarded.
    Closed,
}

/// Producer side of the bounded outbound queue.
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    tx: mpsc::Sender<String>,
}

/// Consumer side of the outbound queue, owned by the outbound loop.
#[derive(Debug)]
pub struct OutboundReceiver {
    rx: mpsc::Receiver<String>,
}

impl OutboundQueue {
    /// Create a queue holding at most `capacity` pending items.
    pub fn bounded(capacity: usize) -> (Self, OutboundReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, OutboundReceiver { rx })
    }

    /// Enqueue a serialized envelope without waiting.
    pub fn enqueue(&self, payload: String) -> Enqueued {
        match self.tx.try_send(payload) {
            Ok(()) => Enqueued::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("outbound queue full, dropping newest item");
                Enqueued::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Enqueued::Closed,
        }
    }

    /// Encode and enqueue an envelope.
    pub fn enqueue_envelope(&self, envelope: &Envelope) -> Result<Enqueued, serde_json::Error> {
        Ok(self.enqueue(protocol::encode(envelope)?))
    }
}

impl OutboundReceiver {
    /// Wait for the next queued item. `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

/// Handles to the two running loops.
#[derive(Debug)]
pub struct PumpHandle {
    /// Inbound loop task.
    pub inbound: JoinHandle<()>,
    /// Outbound loop task.
    pub outbound: JoinHandle<()>,
}

impl PumpHandle {
    /// Wait for both loops to finish.
    pub async fn join(self) {
        let _ = self.outbound.await;
        let _ = self.inbound.await;
    }
}

/// Spawns the inbound and outbound loops for one connection.
pub struct DuplexPump;

impl DuplexPump {
    /// Start both loops on the current runtime.
    pub fn spawn<K, S>(
        sink: K,
        source: S,
        queue: OutboundReceiver,
        events: mpsc::Sender<SessionEvent>,
    ) -> PumpHandle
    where
        K: FrameSink + 'static,
        S: FrameSource + 'static,
    {
        PumpHandle {
            inbound: tokio::spawn(inbound_loop(source, events)),
            outbound: tokio::spawn(outbound_loop(sink, queue)),
        }
    }
}

/// Read frames until the connection fails, forwarding decoded events.
pub async fn inbound_loop<S: FrameSource>(mut source: S, events: mpsc::Sender<SessionEvent>) {
    loop {
        let frame = match source.receive().await {
            Ok(frame) => frame,
            Err(e) => {
                info!(error = %e, "inbound loop stopping");
                let _ = events.send(SessionEvent::ConnectionLost(e)).await;
                return;
            }
        };

        let event = match protocol::dispatch(frame.as_bytes()) {
            Ok(event) => event,
            Err(DecodeError::UnknownType(name)) => {
                warn!(%name, "skipping envelope of unknown type");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "skipping malformed frame");
                SessionEvent::Error {
                    kind: ErrorKind::Decode,
                    detail: e.to_string(),
                }
            }
        };

        if events.send(event).await.is_err() {
            debug!("event consumer gone, inbound loop stopping");
            return;
        }
    }
}

/// Write queued items until the queue closes or a write fails.
pub async fn outbound_loop<K: FrameSink>(mut sink: K, mut queue: OutboundReceiver) {
    while let Some(payload) = queue.recv().await {
        if let Err(e) = sink.send(Frame::Text(payload)).await {
            // The inbound loop reports the broken connection.
            debug!(error = %e, "outbound loop stopping");
            return;
        }
    }

    debug!("outbound queue closed, closing connection");
    let _ = sink.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::loopback;

    #[test]
    fn test_enqueue_drops_newest_when_full() {
        let (queue, mut receiver) = OutboundQueue::bounded(2);

        assert_eq!(queue.enqueue("a".to_string()), Enqueued::Queued);
        assert_eq!(queue.enqueue("b".to_string()), Enqueued::Queued);
        assert_eq!(queue.enqueue("c".to_string()), Enqueued::Dropped);

        assert_eq!(receiver.rx.try_recv().unwrap(), "a");
        assert_eq!(receiver.rx.try_recv().unwrap(), "b");
        assert!(receiver.rx.try_recv().is_err());
    }

    #[test]
    fn test_enqueue_after_consumer_gone() {
        let (queue, receiver) = OutboundQueue::bounded(2);
        drop(receiver);
        assert_eq!(queue.enqueue("a".to_string()), Enqueued::Closed);
    }

    #[tokio::test]
    async fn test_n_plus_one_delivers_n() {
        const N: usize = 5;
        let (queue, receiver) = OutboundQueue::bounded(N);

        let outcomes: Vec<_> = (0..=N).map(|i| queue.enqueue(format!("item{}", i))).collect();
        assert_eq!(outcomes.iter().filter(|o| **o == Enqueued::Queued).count(), N);
        assert_eq!(outcomes[N], Enqueued::Dropped);

        let (client, mut server) = loopback::pair(16);
        let (sink, _source) = client.into_split();
        let task = tokio::spawn(outbound_loop(sink, receiver));
        drop(queue);

        let mut delivered = Vec::new();
        while let Ok(frame) = server.receive().await {
            delivered.push(frame);
        }
        task.await.unwrap();

        assert_eq!(delivered.len(), N);
        assert_eq!(delivered[0], Frame::Text("item0".to_string()));
        assert_eq!(delivered[N - 1], Frame::Text(format!("item{}", N - 1)));
    }

    #[tokio::test]
    async fn test_inbound_preserves_order_and_skips_bad_frames() {
        let (client, mut server) = loopback::pair(16);
        let (_sink, source) = client.into_split();
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let task = tokio::spawn(inbound_loop(source, events_tx));

        server
            .send(Frame::Text(r#"{"type":"ACK","payload":"1"}"#.to_string()))
            .await
            .unwrap();
        server
            .send(Frame::Text(r#"{"type":"NOPE"}"#.to_string()))
            .await
            .unwrap();
        server.send(Frame::Text("{broken".to_string())).await.unwrap();
        server
            .send(Frame::Text(r#"{"type":"ACK","payload":"2"}"#.to_string()))
            .await
            .unwrap();
        server.close().await.unwrap();

        match events_rx.recv().await.unwrap() {
            SessionEvent::AckReceived(ack) => assert_eq!(ack.payload, "1"),
            other => panic!("unexpected event: {:?}", other),
        }
        match events_rx.recv().await.unwrap() {
            SessionEvent::Error { kind, .. } => assert_eq!(kind, ErrorKind::Decode),
            other => panic!("unexpected event: {:?}", other),
        }
        match events_rx.recv().await.unwrap() {
            SessionEvent::AckReceived(ack) => assert_eq!(ack.payload, "2"),
            other => panic!("unexpected event: {:?}", other),
        }
        match events_rx.recv().await.unwrap() {
            SessionEvent::ConnectionLost(e) => assert_eq!(e, TransportError::ConnectionClosed),
            other => panic!("unexpected event: {:?}", other),
        }

        task.await.unwrap();
        assert!(events_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_outbound_stops_on_write_failure() {
        let (client, server) = loopback::pair(1);
        let (sink, _source) = client.into_split();
        drop(server);

        let (queue, receiver) = OutboundQueue::bounded(4);
        queue.enqueue("x".to_string());
        let task = tokio::spawn(outbound_loop(sink, receiver));

        task.await.unwrap();
        assert_eq!(queue.enqueue("y".to_string()), Enqueued::Closed);
    }
}

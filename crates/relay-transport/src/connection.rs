//! Per-connection handles.
//!
//! Every connection owns exactly one outbound queue, drained by a single
//! writer task that holds the socket sink. A [`ConnectionHandle`] is a
//! cloneable sender into that queue, so the owning session and any number
//! of routers can target the same connection without interleaving frames.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::BoxStream;
use relay_protocol::Notification;
use tokio::sync::mpsc;

/// Default capacity of a connection's outbound queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Transport-level failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The connection's writer has gone away; nothing more can be delivered.
    #[error("connection {0} is closed")]
    ChannelClosed(String),

    /// Receiving from the socket failed.
    #[error("websocket error: {0}")]
    WebSocket(String),
}

/// An item in a connection's outbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Notify(Notification),
    /// Flush what is queued ahead of this, then close the socket.
    Close,
}

/// Receiving end of an outbound queue. Owned by the writer task.
pub type OutboundReceiver = mpsc::Receiver<Outbound>;

/// Inbound text frames for one connection, ending on peer close.
pub type InboundFrames = BoxStream<'static, Result<String, TransportError>>;

/// Cloneable sender into one connection's outbound queue.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Arc<str>,
    tx: mpsc::Sender<Outbound>,
    connected_at: Instant,
}

impl ConnectionHandle {
    /// Create a handle and the queue receiver its writer will drain.
    pub fn channel(id: impl Into<Arc<str>>, capacity: usize) -> (Self, OutboundReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: id.into(),
            tx,
            connected_at: Instant::now(),
        };
        (handle, rx)
    }

    /// Transport-assigned connection id (not the chat identity).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Queue a notification. Waits while the queue is full, for as long as
    /// the peer leaves it full; there is no timeout.
    pub async fn send(&self, notification: Notification) -> Result<(), TransportError> {
        self.tx
            .send(Outbound::Notify(notification))
            .await
            .map_err(|_| TransportError::ChannelClosed(self.id.to_string()))
    }

    /// Ask the writer to close the socket once earlier messages are flushed.
    /// Closing an already-closed connection is a no-op.
    pub async fn close(&self) {
        let _ = self.tx.send(Outbound::Close).await;
    }

    /// Whether the writer has stopped accepting messages.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Whether two handles feed the same connection.
    pub fn same_connection(&self, other: &ConnectionHandle) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

//! Connection handle and per-connection state.
//!
//! A [`WebSocketConn`] is the minimal capability object representing one open
//! socket: identity, monotonic state, and an outbound send capability. It
//! owns no protocol logic. Frames queued through the handle are drained by a
//! single writer owned by the transport collaborator, so frame boundaries
//! never interleave even when multiple asynchronous responses write back
//! concurrently.
//!
//! Sends are fire-and-forget from the adapter's point of view: once the
//! connection is closing, or the writer has fallen behind, the frame is
//! dropped with a warning rather than blocking the event-processing slot.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    time::SystemTime,
};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::frame::OutboundFrame;

/// Opaque identifier assigned to a connection by the transport layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create a new [`ConnectionId`] with the provided value.
    #[must_use]
    pub fn new(id: u64) -> Self { Self(id) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub fn as_u64(&self) -> u64 { self.0 }
}

impl From<u64> for ConnectionId {
    fn from(value: u64) -> Self { Self(value) }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

/// Connection state, monotonic from handshake to teardown.
///
/// Transitions only ever move forward: `Connecting → Open → Closing →
/// Closed`. A connection transitions to `Open` exactly once and to `Closed`
/// exactly once; closing is idempotent and `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConnectionState {
    /// Handshake complete, not yet announced to the adapter.
    Connecting = 0,
    /// Ready for traffic.
    Open = 1,
    /// Close requested; no new messages are processed.
    Closing = 2,
    /// Permanently gone. Never reused.
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

struct ConnInner {
    id: ConnectionId,
    created_at: SystemTime,
    state: AtomicU8,
    outbound: mpsc::Sender<OutboundFrame>,
    close_requested: CancellationToken,
}

/// Cloneable handle to one open WebSocket connection.
#[derive(Clone)]
pub struct WebSocketConn {
    inner: Arc<ConnInner>,
}

impl WebSocketConn {
    /// Create a handle and the receiver its writer drains.
    ///
    /// The transport collaborator owns the returned receiver and writes each
    /// [`OutboundFrame`] to the socket in queue order. `capacity` bounds the
    /// number of frames buffered ahead of the writer.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero, mirroring [`mpsc::channel`].
    #[must_use]
    pub fn channel(
        id: ConnectionId,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        let conn = Self {
            inner: Arc::new(ConnInner {
                id,
                created_at: SystemTime::now(),
                state: AtomicU8::new(ConnectionState::Connecting as u8),
                outbound: tx,
                close_requested: CancellationToken::new(),
            }),
        };
        (conn, rx)
    }

    /// Identifier assigned by the transport layer.
    #[must_use]
    pub fn id(&self) -> ConnectionId { self.inner.id }

    /// Wall-clock time the handle was created.
    #[must_use]
    pub fn created_at(&self) -> SystemTime { self.inner.created_at }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Whether the connection is open for traffic.
    #[must_use]
    pub fn is_open(&self) -> bool { self.state() == ConnectionState::Open }

    /// Queue a text frame for the writer.
    ///
    /// Fire-and-forget: frames sent while closing, or while the writer queue
    /// is full, are dropped with a warning.
    pub fn send_text(&self, text: impl Into<String>) {
        self.send(OutboundFrame::Text(text.into()));
    }

    /// Queue a binary frame for the writer.
    ///
    /// Same fire-and-forget contract as [`WebSocketConn::send_text`].
    pub fn send_binary(&self, bytes: Bytes) { self.send(OutboundFrame::Binary(bytes)); }

    /// Request that the connection close.
    ///
    /// Advances the state to `Closing` and signals the lifecycle
    /// coordinator, which stops delivering messages and drives teardown;
    /// the transition to `Closed` happens once teardown completes.
    /// Idempotent.
    pub fn request_close(&self) {
        self.advance(ConnectionState::Closing);
        self.inner.close_requested.cancel();
    }

    /// Token cancelled once a close has been requested through this handle.
    pub(crate) fn close_signal(&self) -> CancellationToken {
        self.inner.close_requested.clone()
    }

    fn send(&self, frame: OutboundFrame) {
        if self.state() > ConnectionState::Open {
            debug!(conn = %self.id(), "dropping outbound frame on closing connection");
            return;
        }
        if let Err(err) = self.inner.outbound.try_send(frame) {
            warn!(conn = %self.id(), %err, "dropping outbound frame");
            return;
        }
        #[cfg(feature = "metrics")]
        crate::metrics::inc_frames(crate::metrics::Direction::Outbound);
    }

    /// Advance the state machine, never regressing.
    ///
    /// Returns `true` when this call performed the transition, `false` when
    /// the connection was already at or past `target`.
    pub(crate) fn advance(&self, target: ConnectionState) -> bool {
        let mut current = self.inner.state.load(Ordering::Acquire);
        loop {
            if current >= target as u8 {
                return false;
            }
            match self.inner.state.compare_exchange_weak(
                current,
                target as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }
}

impl std::fmt::Debug for WebSocketConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketConn")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn conn() -> (WebSocketConn, mpsc::Receiver<OutboundFrame>) {
        WebSocketConn::channel(ConnectionId::new(7), 4)
    }

    #[rstest]
    fn starts_connecting() {
        let (conn, _rx) = conn();
        assert_eq!(conn.state(), ConnectionState::Connecting);
        assert!(!conn.is_open());
    }

    #[rstest]
    fn state_advances_monotonically() {
        let (conn, _rx) = conn();
        assert!(conn.advance(ConnectionState::Open));
        assert!(conn.advance(ConnectionState::Closed));
        // Never regresses.
        assert!(!conn.advance(ConnectionState::Open));
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[rstest]
    fn open_happens_once() {
        let (conn, _rx) = conn();
        assert!(conn.advance(ConnectionState::Open));
        assert!(!conn.advance(ConnectionState::Open));
    }

    #[rstest]
    fn request_close_is_idempotent() {
        let (conn, _rx) = conn();
        conn.advance(ConnectionState::Open);
        conn.request_close();
        conn.request_close();
        assert_eq!(conn.state(), ConnectionState::Closing);
    }

    #[rstest]
    fn request_close_fires_the_close_signal() {
        let (conn, _rx) = conn();
        conn.advance(ConnectionState::Open);
        let signal = conn.close_signal();
        assert!(!signal.is_cancelled());
        conn.request_close();
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn sent_frames_reach_the_writer_in_order() {
        let (conn, mut rx) = conn();
        conn.advance(ConnectionState::Open);
        conn.send_text("one");
        conn.send_binary(Bytes::from_static(b"two"));
        assert_eq!(rx.recv().await, Some(OutboundFrame::Text("one".into())));
        assert_eq!(
            rx.recv().await,
            Some(OutboundFrame::Binary(Bytes::from_static(b"two")))
        );
    }

    #[tokio::test]
    async fn sends_after_close_are_dropped() {
        let (conn, mut rx) = conn();
        conn.advance(ConnectionState::Open);
        conn.advance(ConnectionState::Closing);
        conn.send_text("late");
        drop(conn);
        assert_eq!(rx.recv().await, None);
    }

    #[rstest]
    fn id_round_trips() {
        let id = ConnectionId::from(42u64);
        assert_eq!(id.as_u64(), 42);
        assert_eq!(id.to_string(), "ConnectionId(42)");
    }
}

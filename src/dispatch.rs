//! Downstream request dispatcher seam.
//!
//! The dispatcher is an external collaborator: it routes synthesized
//! requests to application handlers and writes any responses back through
//! the [`WebSocketConn`] handle. Its response handling and error policy are
//! out of scope here; this module only defines the boundary the coordinator
//! hands batches across, plus a recording double for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    connection::{ConnectionId, WebSocketConn},
    request::SyntheticRequest,
};

/// Consumer of ordered request batches synthesized from WebSocket messages.
///
/// One batch corresponds to one inbound message; the batch order matches the
/// order of logical sub-messages within the frame and must be preserved by
/// implementations.
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    /// Route one ordered batch for `conn`.
    ///
    /// Dispatch may run asynchronously; responses are written back through
    /// `conn` at the dispatcher's discretion. Requests already handed over
    /// are not retracted when the connection later closes.
    async fn dispatch(&self, conn: &WebSocketConn, batch: Vec<SyntheticRequest>);
}

/// Dispatcher double that records every batch it receives.
///
/// Used throughout the test suite to assert on dispatch order and batch
/// composition.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    batches: Mutex<Vec<(ConnectionId, Vec<SyntheticRequest>)>>,
}

impl RecordingDispatcher {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Snapshot of all recorded batches in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if a previous holder of the internal lock panicked.
    #[must_use]
    pub fn batches(&self) -> Vec<(ConnectionId, Vec<SyntheticRequest>)> {
        self.batches.lock().expect("recorder lock poisoned").clone()
    }

    /// All recorded requests flattened in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<SyntheticRequest> {
        self.batches()
            .into_iter()
            .flat_map(|(_, batch)| batch)
            .collect()
    }
}

#[async_trait]
impl RequestDispatcher for RecordingDispatcher {
    async fn dispatch(&self, conn: &WebSocketConn, batch: Vec<SyntheticRequest>) {
        self.batches
            .lock()
            .expect("recorder lock poisoned")
            .push((conn.id(), batch));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recorder_preserves_batch_order() {
        let (conn, _rx) = WebSocketConn::channel(ConnectionId::new(3), 1);
        let recorder = RecordingDispatcher::new();

        let first = SyntheticRequest::builder().path("/a").build();
        let second = SyntheticRequest::builder().path("/b").build();
        recorder.dispatch(&conn, vec![first.clone()]).await;
        recorder.dispatch(&conn, vec![second.clone()]).await;

        assert_eq!(recorder.requests(), vec![first, second]);
        assert!(
            recorder
                .batches()
                .iter()
                .all(|(id, _)| *id == ConnectionId::new(3))
        );
    }
}

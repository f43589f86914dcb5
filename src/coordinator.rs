//! Lifecycle coordinator: sequential event delivery per connection.
//!
//! The coordinator reconciles the long-lived, asynchronous transport with
//! the request-scoped dispatch model. Each adopted connection gets its own
//! [`ConnectionDriver`] task draining a bounded event queue, so for any one
//! connection `on_open`, each message hook, `on_error`, and `on_close` never
//! overlap in time and always preserve arrival order. Distinct connections
//! run on separate tasks and may execute concurrently.
//!
//! Ordering guarantees enforced here:
//!
//! - `on_open` runs exactly once, strictly before the first message hook.
//! - No message hook runs after `on_close`; events arriving after teardown
//!   are dropped.
//! - `on_close` runs at most once, through every exit path, including a
//!   failed `on_open`.
//!
//! Closing cancels the driver's [`CancellationToken`] so work spawned on
//! behalf of the connection can stop promptly; batches already handed to
//! the dispatcher are not retracted.

mod event;
mod phase;

use std::sync::Arc;

use bytes::Bytes;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use self::{event::ConnEvent, phase::DriverPhase};
use crate::{
    adapter::{Disposition, ErrorVerdict, ProtocolAdapter},
    connection::{ConnectionId, ConnectionState, WebSocketConn},
    dispatch::RequestDispatcher,
    error::{AdapterError, Severity},
    frame::BinaryWindow,
    registry::AdapterRegistry,
};

/// Default bound on events buffered ahead of a connection's driver.
pub const DEFAULT_EVENT_CAPACITY: usize = 32;

/// Whether the driver keeps processing after an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Handle used by the transport collaborator to feed one connection.
///
/// Sends apply back-pressure once the driver's queue is full; this queuing
/// discipline, not adapter blocking, is what preserves per-connection
/// ordering. Events offered after the connection closed are dropped.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<ConnEvent>,
    conn_id: ConnectionId,
}

impl EventSender {
    /// Deliver a complete text frame.
    pub async fn text(&self, text: impl Into<String>) {
        self.forward(ConnEvent::Text(text.into())).await;
    }

    /// Deliver a complete binary frame addressed by `[offset, offset + len)`.
    ///
    /// The window bounds are validated when the driver hands the frame to
    /// the adapter; a window that does not fit inside `buffer` is treated as
    /// a fatal transport fault.
    pub async fn binary(&self, buffer: Bytes, offset: usize, len: usize) {
        self.forward(ConnEvent::Binary {
            buffer,
            offset,
            len,
        })
        .await;
    }

    /// Report a transport-detected fault.
    pub async fn error(&self, error: AdapterError) {
        self.forward(ConnEvent::Error(error)).await;
    }

    /// Signal that the connection is gone.
    pub async fn close(&self) { self.forward(ConnEvent::Close).await; }

    async fn forward(&self, event: ConnEvent) {
        if self.tx.send(event).await.is_err() {
            debug!(conn = %self.conn_id, "event dropped: connection already closed");
        }
    }
}

/// Drives one connection's lifecycle against its adapter.
pub struct ConnectionDriver {
    adapter: Arc<dyn ProtocolAdapter>,
    conn: WebSocketConn,
    dispatcher: Arc<dyn RequestDispatcher>,
    events: mpsc::Receiver<ConnEvent>,
    cancel: CancellationToken,
    phase: DriverPhase,
}

impl ConnectionDriver {
    /// Build a driver and the [`EventSender`] that feeds it.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero, mirroring [`mpsc::channel`].
    #[must_use]
    pub fn new(
        adapter: Arc<dyn ProtocolAdapter>,
        conn: WebSocketConn,
        dispatcher: Arc<dyn RequestDispatcher>,
        capacity: usize,
    ) -> (Self, EventSender) {
        let (tx, rx) = mpsc::channel(capacity);
        let sender = EventSender {
            tx,
            conn_id: conn.id(),
        };
        let driver = Self {
            adapter,
            conn,
            dispatcher,
            events: rx,
            cancel: CancellationToken::new(),
            phase: DriverPhase::new(),
        };
        (driver, sender)
    }

    /// Token cancelled at teardown.
    ///
    /// Work spawned on behalf of this connection should watch it and stop
    /// promptly once the connection closes.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken { self.cancel.clone() }

    /// Run the connection to completion.
    ///
    /// Delivers `on_open`, then drains events sequentially until a close
    /// event, a fatal error, cancellation, or the sender going away, and
    /// finally performs teardown.
    pub async fn run(mut self) {
        if let Err(error) = self.adapter.on_open(&self.conn) {
            // Open failures are always connection-fatal, whatever the
            // adapter's verdict; surface before closing.
            warn!(conn = %self.conn.id(), %error, "on_open failed; closing connection");
            let _ = self.adapter.on_error(&self.conn, &error);
            self.teardown();
            return;
        }
        self.conn.advance(ConnectionState::Open);
        #[cfg(feature = "metrics")]
        crate::metrics::inc_connections();
        debug!(conn = %self.conn.id(), "connection open");

        let close_requested = self.conn.close_signal();
        loop {
            let event = tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,
                () = close_requested.cancelled() => break,
                event = self.events.recv() => event,
            };
            match event {
                None => break,
                Some(event) => {
                    if self.handle_event(event).await == Flow::Stop {
                        break;
                    }
                }
            }
        }

        #[cfg(feature = "metrics")]
        crate::metrics::dec_connections();
        self.teardown();
    }

    async fn handle_event(&mut self, event: ConnEvent) -> Flow {
        match event {
            ConnEvent::Text(text) => {
                #[cfg(feature = "metrics")]
                crate::metrics::inc_frames(crate::metrics::Direction::Inbound);
                let result = self.adapter.on_message(&self.conn, &text);
                self.settle(result).await
            }
            ConnEvent::Binary {
                buffer,
                offset,
                len,
            } => {
                #[cfg(feature = "metrics")]
                crate::metrics::inc_frames(crate::metrics::Direction::Inbound);
                match BinaryWindow::new(&buffer, offset, len) {
                    Ok(window) => {
                        let result = self.adapter.on_binary(&self.conn, window);
                        self.settle(result).await
                    }
                    // The transport handed us a window it cannot back; the
                    // stream can no longer be trusted.
                    Err(err) => self.report(AdapterError::transport(
                        err.to_string(),
                        Severity::Fatal,
                    )),
                }
            }
            ConnEvent::Error(error) => self.report(error),
            ConnEvent::Close => Flow::Stop,
        }
    }

    async fn settle(&mut self, result: Result<Disposition, AdapterError>) -> Flow {
        match result {
            Ok(Disposition::Dispatch(batch)) if !batch.is_empty() => {
                self.dispatcher.dispatch(&self.conn, batch).await;
                Flow::Continue
            }
            Ok(_) => Flow::Continue,
            Err(error) => self.report(error),
        }
    }

    fn report(&self, error: AdapterError) -> Flow {
        #[cfg(feature = "metrics")]
        crate::metrics::inc_errors();
        match self.adapter.on_error(&self.conn, &error) {
            ErrorVerdict::Recoverable => {
                debug!(conn = %self.conn.id(), %error, "recoverable error; stream continues");
                Flow::Continue
            }
            ErrorVerdict::Fatal => {
                warn!(conn = %self.conn.id(), %error, "fatal error; closing connection");
                Flow::Stop
            }
        }
    }

    fn teardown(&mut self) {
        if self.phase.is_closed() {
            return;
        }
        self.phase.mark_closed();
        self.conn.advance(ConnectionState::Closing);
        self.conn.advance(ConnectionState::Closed);
        self.cancel.cancel();
        self.events.close();
        self.adapter.on_close(&self.conn);
        debug!(conn = %self.conn.id(), "connection closed");
    }
}

/// Binds the registry, the dispatcher, and driver spawning together.
///
/// The connection manager hands each accepted connection to
/// [`LifecycleCoordinator::adopt`] with its negotiated sub-protocol name;
/// the coordinator activates the adapter and spawns the driver task.
pub struct LifecycleCoordinator {
    registry: Arc<AdapterRegistry>,
    dispatcher: Arc<dyn RequestDispatcher>,
    event_capacity: usize,
}

impl LifecycleCoordinator {
    /// Create a coordinator with [`DEFAULT_EVENT_CAPACITY`].
    #[must_use]
    pub fn new(registry: Arc<AdapterRegistry>, dispatcher: Arc<dyn RequestDispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Override the per-connection event queue bound.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Adopt a freshly accepted connection under `sub_protocol`.
    ///
    /// Activates the adapter, spawns the driver task, and returns the
    /// handles the transport uses to feed and await the connection.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] when the sub-protocol is
    /// unknown or the adapter fails to configure; the connection is then
    /// never opened.
    pub fn adopt(
        &self,
        sub_protocol: &str,
        conn: WebSocketConn,
    ) -> Result<AdoptedConnection, AdapterError> {
        let adapter = self.registry.activate(sub_protocol)?;
        let (driver, events) = ConnectionDriver::new(
            adapter,
            conn,
            Arc::clone(&self.dispatcher),
            self.event_capacity,
        );
        let cancel = driver.cancellation_token();
        let task = tokio::spawn(driver.run());
        Ok(AdoptedConnection {
            events,
            cancel,
            task,
        })
    }
}

/// A connection adopted by the coordinator.
pub struct AdoptedConnection {
    events: EventSender,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl AdoptedConnection {
    /// Sender the transport uses to feed events.
    #[must_use]
    pub fn events(&self) -> &EventSender { &self.events }

    /// Token cancelled once the connection closes.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken { self.cancel.clone() }

    /// Wait for the driver task to finish.
    pub async fn finished(self) {
        if let Err(err) = self.task.await {
            warn!(%err, "connection driver task failed");
        }
    }
}

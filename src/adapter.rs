//! The protocol adapter contract.
//!
//! A [`ProtocolAdapter`] translates inbound frames on one connection into
//! zero or more [`SyntheticRequest`]s for downstream dispatch, or consumes
//! the frame itself, and receives the connection's lifecycle notifications.
//! The lifecycle coordinator invokes the hooks strictly sequentially for any
//! one connection; hooks for distinct connections may run concurrently, so
//! an adapter shared across connections must partition any mutable state per
//! connection.
//!
//! Hooks must not block on I/O. Long-running work belongs to the downstream
//! dispatcher; the adapter's job is to return quickly so the connection's
//! event slot stays free.

use crate::{
    config::AdapterConfig,
    connection::WebSocketConn,
    error::{AdapterError, Severity},
    frame::BinaryWindow,
    request::SyntheticRequest,
};

/// Outcome of processing one inbound message.
///
/// The two variants are deliberately distinct: `Dispatch(vec![])` means the
/// message parsed but yielded nothing to route, while `Handled` means the
/// adapter fully consumed the message (for example a heartbeat answered
/// in-line) and the dispatcher must not be involved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Hand the ordered batch to the request dispatcher.
    Dispatch(Vec<SyntheticRequest>),
    /// The adapter handled the message itself; nothing to dispatch.
    Handled,
}

impl Disposition {
    /// Convenience constructor for a single-request dispatch.
    #[must_use]
    pub fn single(request: SyntheticRequest) -> Self { Self::Dispatch(vec![request]) }

    /// Requests to dispatch, if any.
    #[must_use]
    pub fn requests(&self) -> &[SyntheticRequest] {
        match self {
            Self::Dispatch(requests) => requests,
            Self::Handled => &[],
        }
    }
}

/// The adapter's ruling on a reported error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorVerdict {
    /// Processing continues; the offending message is skipped.
    Recoverable,
    /// The connection must close; an `on_close` follows.
    Fatal,
}

impl From<Severity> for ErrorVerdict {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Recoverable => Self::Recoverable,
            Severity::Fatal => Self::Fatal,
        }
    }
}

/// Per-connection (or shared, stateless) translator between WebSocket frames
/// and dispatchable requests.
///
/// Implementations are selected by the [`crate::registry::AdapterRegistry`]
/// at connection setup, keyed by sub-protocol name. The registry calls
/// [`configure`](ProtocolAdapter::configure) at most once per instance,
/// before any lifecycle event.
///
/// Translation must be deterministic within a connection's message stream: a
/// fixed sequence of prior messages plus the same new payload always yields
/// the same requests, with no dependence on wall-clock time or unrelated
/// global state.
pub trait ProtocolAdapter: Send + Sync {
    /// Bind the effective configuration before any traffic.
    ///
    /// Called at most once per instance, before `on_open`. Must not block on
    /// I/O.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] when a required option is
    /// missing or malformed; the connection is then never opened.
    fn configure(&mut self, _config: &AdapterConfig) -> Result<(), AdapterError> { Ok(()) }

    /// The connection is ready for traffic.
    ///
    /// Per-connection initialization (handshake acknowledgements, session
    /// tokens) belongs here.
    ///
    /// # Errors
    ///
    /// Any error is fatal for the connection: the coordinator skips message
    /// processing and drives a close. `on_close` is still delivered.
    fn on_open(&self, _conn: &WebSocketConn) -> Result<(), AdapterError> { Ok(()) }

    /// Process a text frame.
    ///
    /// # Errors
    ///
    /// Malformed input is reported as [`AdapterError::MalformedMessage`]
    /// (recoverable by default), never a panic. A stateful sub-protocol
    /// whose state was left inconsistent escalates to
    /// [`AdapterError::ProtocolState`].
    fn on_message(&self, conn: &WebSocketConn, text: &str) -> Result<Disposition, AdapterError>;

    /// Process a binary frame addressed through `window`.
    ///
    /// The backing buffer may be reused after this call returns; retained
    /// bytes must be copied out of the window.
    ///
    /// The default implementation decodes the window as UTF-8 and delegates
    /// to [`on_message`](ProtocolAdapter::on_message). Sub-protocols with a
    /// true binary grammar override this.
    ///
    /// # Errors
    ///
    /// Same contract as [`on_message`](ProtocolAdapter::on_message); the
    /// default implementation reports invalid UTF-8 as a malformed message.
    fn on_binary(
        &self,
        conn: &WebSocketConn,
        window: BinaryWindow<'_>,
    ) -> Result<Disposition, AdapterError> {
        let text = window
            .as_str()
            .map_err(|err| AdapterError::malformed(format!("binary frame is not UTF-8: {err}")))?;
        self.on_message(conn, text)
    }

    /// The connection is permanently gone; release per-connection state.
    ///
    /// Called at most once per connection and safe to call even when
    /// `on_open` never completed successfully.
    fn on_close(&self, _conn: &WebSocketConn) {}

    /// A transport- or processing-level fault was reported.
    ///
    /// The adapter rules whether the fault is connection-fatal (a close
    /// follows) or recoverable (processing continues). The error may have
    /// originated from any prior call; implementations must not assume a
    /// particular origin.
    ///
    /// The default verdict follows [`AdapterError::severity`].
    fn on_error(&self, _conn: &WebSocketConn, error: &AdapterError) -> ErrorVerdict {
        error.severity().into()
    }
}

//! Internal event types for the per-connection driver loop.

use bytes::Bytes;

use crate::error::AdapterError;

/// Events delivered to one connection's driver, in arrival order.
///
/// Binary payloads carry the transport buffer plus the authoritative
/// `offset`/`len` window; the driver constructs the borrowed
/// [`crate::frame::BinaryWindow`] at the adapter call boundary.
#[derive(Debug)]
pub(super) enum ConnEvent {
    /// A complete text frame.
    Text(String),
    /// A complete binary frame addressed by window.
    Binary {
        buffer: Bytes,
        offset: usize,
        len: usize,
    },
    /// A fault reported by the transport collaborator.
    Error(AdapterError),
    /// The connection is gone.
    Close,
}

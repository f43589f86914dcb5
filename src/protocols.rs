//! Built-in sub-protocol adapters.
//!
//! [`SimpleDispatchAdapter`] is the default: one inbound message becomes one
//! synthetic request. [`JsonEnvelopeAdapter`] implements a JSON grammar with
//! optional envelope multiplexing and sequence checking. Both document their
//! malformed-message policy and behave deterministically within a
//! connection's message stream.

pub mod json;
pub mod simple;

pub use json::JsonEnvelopeAdapter;
pub use simple::SimpleDispatchAdapter;

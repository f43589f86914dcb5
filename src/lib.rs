//! Public API for the `wsbridge` library.
//!
//! `wsbridge` is a WebSocket-to-request protocol adapter: it sits between a
//! transport that delivers discrete text or binary frames on long-lived
//! connections and a request/response dispatch pipeline. A pluggable
//! [`ProtocolAdapter`] interprets each frame under its sub-protocol grammar
//! and either synthesizes an ordered batch of requests for downstream
//! dispatch or handles the frame itself. The [`LifecycleCoordinator`] owns
//! event ordering: per-connection hooks run strictly sequentially, `on_open`
//! always precedes the first message, and nothing is delivered after close.

pub mod adapter;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod frame;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod prelude;
pub mod protocols;
pub mod registry;
pub mod request;

pub use adapter::{Disposition, ErrorVerdict, ProtocolAdapter};
pub use config::AdapterConfig;
pub use connection::{ConnectionId, ConnectionState, WebSocketConn};
pub use coordinator::{
    AdoptedConnection,
    ConnectionDriver,
    DEFAULT_EVENT_CAPACITY,
    EventSender,
    LifecycleCoordinator,
};
pub use dispatch::{RecordingDispatcher, RequestDispatcher};
pub use error::{AdapterError, Severity};
pub use frame::{BinaryWindow, OutboundFrame, WindowError};
#[cfg(feature = "metrics")]
pub use metrics::{CONNECTIONS_ACTIVE, Direction, ERRORS_TOTAL, FRAMES_PROCESSED};
pub use registry::{Activation, AdapterFactory, AdapterRegistry};
pub use request::{SyntheticRequest, SyntheticRequestBuilder};

//! Optional convenience imports for common `wsbridge` workflows.
//!
//! This module is intentionally small and focused on high-frequency types.
//! Prefer importing specialised APIs directly from their owning modules.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use wsbridge::prelude::*;
//!
//! let registry = Arc::new(AdapterRegistry::new());
//! let dispatcher = Arc::new(RecordingDispatcher::new());
//! let coordinator = LifecycleCoordinator::new(registry, dispatcher);
//! # let _ = coordinator;
//! ```

pub use crate::{
    adapter::{Disposition, ErrorVerdict, ProtocolAdapter},
    config::AdapterConfig,
    connection::{ConnectionId, ConnectionState, WebSocketConn},
    coordinator::{EventSender, LifecycleCoordinator},
    dispatch::{RecordingDispatcher, RequestDispatcher},
    error::{AdapterError, Severity},
    frame::BinaryWindow,
    registry::{Activation, AdapterRegistry},
    request::SyntheticRequest,
};

//! Error taxonomy for the adapter boundary.
//!
//! This module distinguishes configuration faults (detected before any
//! traffic flows), malformed payloads (a single-message condition), protocol
//! state corruption (the adapter can no longer trust its own per-connection
//! state), and transport faults reported by the collaborator below the
//! adapter.
//!
//! # Recovery
//!
//! Each error carries a default [`Severity`] accessible via
//! [`AdapterError::severity`]:
//!
//! - [`Severity::Recoverable`]: skip the offending message and continue the stream.
//! - [`Severity::Fatal`]: the connection must transition to closed.
//!
//! Adapters may override the default per incident through
//! [`crate::adapter::ProtocolAdapter::on_error`]; the coordinator never
//! silently drops a fatal condition.

use std::io;

use thiserror::Error;

/// How severely an error affects the connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Severity {
    /// The offending message is skipped and the stream continues.
    #[default]
    Recoverable,
    /// The connection must be closed; no further messages are processed.
    Fatal,
}

impl Severity {
    fn as_str(self) -> &'static str {
        match self {
            Severity::Recoverable => "recoverable",
            Severity::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised at the adapter boundary.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A required option was missing or malformed at configure time.
    ///
    /// Configuration errors are fatal: the adapter must not proceed to
    /// `on_open`.
    #[error("configuration error: {reason}")]
    Configuration {
        /// Human-readable description of the invalid or missing option.
        reason: String,
    },

    /// The payload does not parse under the sub-protocol grammar.
    ///
    /// Recoverable by default; a stateful sub-protocol escalates to
    /// [`AdapterError::ProtocolState`] when the failure leaves its state
    /// undefined.
    #[error("malformed message: {detail}")]
    MalformedMessage {
        /// What failed to parse.
        detail: String,
    },

    /// Per-connection protocol state is inconsistent.
    ///
    /// Connection-fatal; the coordinator forces a close rather than
    /// continuing with undefined state.
    #[error("protocol state inconsistent: {detail}")]
    ProtocolState {
        /// Description of the inconsistency.
        detail: String,
    },

    /// A fault reported by the transport collaborator below the adapter.
    #[error("transport fault ({severity}): {reason}")]
    Transport {
        /// Description supplied by the transport layer.
        reason: String,
        /// Severity reported by the transport layer.
        severity: Severity,
        /// Underlying I/O error, when one was captured.
        #[source]
        source: Option<io::Error>,
    },
}

impl AdapterError {
    /// Build a configuration error from any displayable reason.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Configuration error for a missing required init param.
    #[must_use]
    pub fn missing_key(key: &str) -> Self {
        Self::Configuration {
            reason: format!("required init param `{key}` is missing"),
        }
    }

    /// Build a malformed-message error.
    #[must_use]
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedMessage {
            detail: detail.into(),
        }
    }

    /// Build a protocol-state error.
    #[must_use]
    pub fn protocol_state(detail: impl Into<String>) -> Self {
        Self::ProtocolState {
            detail: detail.into(),
        }
    }

    /// Build a transport fault without a captured I/O source.
    #[must_use]
    pub fn transport(reason: impl Into<String>, severity: Severity) -> Self {
        Self::Transport {
            reason: reason.into(),
            severity,
            source: None,
        }
    }

    /// Wrap an I/O error as a transport fault.
    #[must_use]
    pub fn transport_io(error: io::Error, severity: Severity) -> Self {
        Self::Transport {
            reason: error.to_string(),
            severity,
            source: Some(error),
        }
    }

    /// Default severity for this error per the recovery policy.
    ///
    /// Malformed messages are recoverable; configuration and protocol-state
    /// errors are fatal; transport faults carry the severity the transport
    /// reported.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::MalformedMessage { .. } => Severity::Recoverable,
            Self::Configuration { .. } | Self::ProtocolState { .. } => Severity::Fatal,
            Self::Transport { severity, .. } => *severity,
        }
    }
}

/// Canonical result alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(AdapterError::malformed("bad json"), Severity::Recoverable)]
    #[case(AdapterError::configuration("missing key"), Severity::Fatal)]
    #[case(AdapterError::protocol_state("seq out of order"), Severity::Fatal)]
    #[case(
        AdapterError::transport("peer reset", Severity::Fatal),
        Severity::Fatal
    )]
    #[case(
        AdapterError::transport("slow consumer", Severity::Recoverable),
        Severity::Recoverable
    )]
    fn default_severity_follows_taxonomy(#[case] error: AdapterError, #[case] expected: Severity) {
        assert_eq!(error.severity(), expected);
    }

    #[rstest]
    fn missing_key_names_the_param() {
        let error = AdapterError::missing_key("method");
        assert!(error.to_string().contains("`method`"));
    }

    #[rstest]
    fn transport_io_preserves_source() {
        let inner = io::Error::new(io::ErrorKind::BrokenPipe, "gone");
        let error = AdapterError::transport_io(inner, Severity::Fatal);
        let source = std::error::Error::source(&error);
        assert!(source.is_some(), "io source should be preserved");
    }
}

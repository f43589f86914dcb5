//! JSON envelope sub-protocol.
//!
//! Payloads are JSON. A single object synthesizes one request; an array is a
//! multiplexing envelope whose elements synthesize one request each, in
//! envelope order. Malformed JSON is skipped: the adapter reports a
//! recoverable [`AdapterError::MalformedMessage`], dispatches nothing, and
//! the next valid message is processed normally.
//!
//! With `require-seq` enabled every message must carry a `seq` number
//! strictly greater than the last accepted one for the connection. A batch
//! is validated in full before any request is emitted or any state is
//! committed, so parse failures never leave the sequence state inconsistent.
//! A sequence regression, however, means the peer and adapter no longer
//! agree on the stream and escalates to the connection-fatal
//! [`AdapterError::ProtocolState`].

use std::collections::BTreeMap;

use bytes::Bytes;
use dashmap::DashMap;
use serde::Deserialize;

use crate::{
    adapter::{Disposition, ProtocolAdapter},
    config::AdapterConfig,
    connection::{ConnectionId, WebSocketConn},
    error::AdapterError,
    request::SyntheticRequest,
};

/// One logical message in the JSON grammar.
#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: serde_json::Value,
    #[serde(default)]
    seq: Option<u64>,
}

/// A payload is either one message or an envelope of messages.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope {
    Batch(Vec<WireMessage>),
    Single(WireMessage),
}

impl Envelope {
    fn into_messages(self) -> Vec<WireMessage> {
        match self {
            Envelope::Batch(messages) => messages,
            Envelope::Single(message) => vec![message],
        }
    }
}

/// Adapter for the JSON envelope sub-protocol.
///
/// Recognized init params (all optional):
///
/// - `path`: default request path for messages that carry none. Default `/`.
/// - `require-seq`: `true` enables per-connection sequence checking.
///   Default `false`.
///
/// Sequence state is partitioned per connection, so one instance is safe to
/// register as [`crate::registry::Activation::Shared`]; state for a
/// connection is released in `on_close`.
#[derive(Debug)]
pub struct JsonEnvelopeAdapter {
    default_path: String,
    require_seq: bool,
    last_seq: DashMap<ConnectionId, u64>,
}

impl Default for JsonEnvelopeAdapter {
    fn default() -> Self { Self::new() }
}

impl JsonEnvelopeAdapter {
    /// An adapter with default options, before `configure`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_path: "/".to_owned(),
            require_seq: false,
            last_seq: DashMap::new(),
        }
    }

    /// Boxed constructor for registry factories.
    #[must_use]
    pub fn boxed() -> Box<dyn ProtocolAdapter> { Box::new(Self::new()) }

    /// Validate the batch's sequence numbers against the connection state.
    ///
    /// Returns the highest sequence number in the batch without committing
    /// anything, so a rejected batch leaves the last known-good state
    /// untouched.
    fn check_sequence(
        &self,
        conn: ConnectionId,
        messages: &[WireMessage],
    ) -> Result<Option<u64>, AdapterError> {
        if !self.require_seq {
            return Ok(None);
        }
        let mut floor = self.last_seq.get(&conn).map(|entry| *entry.value());
        for message in messages {
            let seq = message.seq.ok_or_else(|| {
                AdapterError::malformed("message is missing required `seq` field")
            })?;
            if let Some(last) = floor {
                if seq <= last {
                    return Err(AdapterError::protocol_state(format!(
                        "sequence regressed: got {seq} after {last}"
                    )));
                }
            }
            floor = Some(seq);
        }
        Ok(floor)
    }

    fn synthesize(&self, message: WireMessage) -> Result<SyntheticRequest, AdapterError> {
        let body = if message.body.is_null() {
            Bytes::new()
        } else {
            serde_json::to_vec(&message.body)
                .map_err(|err| AdapterError::malformed(format!("unserializable body: {err}")))?
                .into()
        };
        let mut builder = SyntheticRequest::builder()
            .method(message.method.unwrap_or_else(|| "POST".to_owned()))
            .path(message.path.unwrap_or_else(|| self.default_path.clone()))
            .body(body);
        if !message.headers.contains_key("content-type") {
            builder = builder.header("content-type", "application/json");
        }
        for (name, value) in message.headers {
            builder = builder.header(name, value);
        }
        Ok(builder.build())
    }
}

impl ProtocolAdapter for JsonEnvelopeAdapter {
    fn configure(&mut self, config: &AdapterConfig) -> Result<(), AdapterError> {
        if let Some(path) = config.get("path") {
            if !path.starts_with('/') {
                return Err(AdapterError::configuration(format!(
                    "init param `path` must begin with `/`, got `{path}`"
                )));
            }
            self.default_path = path.to_owned();
        }
        if let Some(require_seq) = config.parse::<bool>("require-seq")? {
            self.require_seq = require_seq;
        }
        Ok(())
    }

    fn on_message(&self, conn: &WebSocketConn, text: &str) -> Result<Disposition, AdapterError> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|err| AdapterError::malformed(format!("invalid envelope json: {err}")))?;
        let messages = envelope.into_messages();

        let committed_seq = self.check_sequence(conn.id(), &messages)?;

        let requests = messages
            .into_iter()
            .map(|message| self.synthesize(message))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(seq) = committed_seq {
            self.last_seq.insert(conn.id(), seq);
        }
        Ok(Disposition::Dispatch(requests))
    }

    fn on_close(&self, conn: &WebSocketConn) { self.last_seq.remove(&conn.id()); }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{adapter::ErrorVerdict, connection::ConnectionState};

    fn open_conn(id: u64) -> WebSocketConn {
        let (conn, _rx) = WebSocketConn::channel(ConnectionId::new(id), 4);
        conn.advance(ConnectionState::Open);
        conn
    }

    fn strict() -> JsonEnvelopeAdapter {
        let mut adapter = JsonEnvelopeAdapter::new();
        adapter
            .configure(&AdapterConfig::new().with_option("require-seq", "true"))
            .expect("valid config");
        adapter
    }

    #[rstest]
    fn single_object_becomes_one_request() {
        let adapter = JsonEnvelopeAdapter::new();
        let conn = open_conn(1);
        let disposition = adapter
            .on_message(&conn, r#"{"method":"GET","path":"/users","body":{"id":7}}"#)
            .expect("valid json");
        let requests = disposition.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method(), "GET");
        assert_eq!(requests[0].path(), "/users");
        assert_eq!(&requests[0].body()[..], br#"{"id":7}"#);
        assert_eq!(requests[0].header("content-type"), Some("application/json"));
    }

    #[rstest]
    fn envelope_preserves_element_order() {
        let adapter = JsonEnvelopeAdapter::new();
        let conn = open_conn(1);
        let disposition = adapter
            .on_message(
                &conn,
                r#"[{"path":"/a"},{"path":"/b"},{"path":"/c"}]"#,
            )
            .expect("valid envelope");
        let paths: Vec<_> = disposition
            .requests()
            .iter()
            .map(SyntheticRequest::path)
            .collect();
        assert_eq!(paths, vec!["/a", "/b", "/c"]);
    }

    #[rstest]
    fn empty_envelope_is_an_empty_dispatch_not_handled() {
        let adapter = JsonEnvelopeAdapter::new();
        let conn = open_conn(1);
        let disposition = adapter.on_message(&conn, "[]").expect("valid envelope");
        assert_eq!(disposition, Disposition::Dispatch(vec![]));
    }

    #[rstest]
    fn malformed_json_is_recoverable_and_leaves_next_message_fine() {
        let adapter = JsonEnvelopeAdapter::new();
        let conn = open_conn(1);

        let error = adapter
            .on_message(&conn, "{invalid")
            .expect_err("malformed payload");
        assert!(matches!(error, AdapterError::MalformedMessage { .. }));
        assert_eq!(adapter.on_error(&conn, &error), ErrorVerdict::Recoverable);

        let disposition = adapter
            .on_message(&conn, r#"{"path":"/ok"}"#)
            .expect("stream continues");
        assert_eq!(disposition.requests()[0].path(), "/ok");
    }

    #[rstest]
    fn translation_is_deterministic() {
        let payload = r#"[{"path":"/a","body":{"n":1}},{"path":"/b"}]"#;
        let first = {
            let adapter = JsonEnvelopeAdapter::new();
            let conn = open_conn(1);
            adapter.on_message(&conn, payload).expect("valid")
        };
        let second = {
            let adapter = JsonEnvelopeAdapter::new();
            let conn = open_conn(1);
            adapter.on_message(&conn, payload).expect("valid")
        };
        assert_eq!(first, second);
    }

    #[rstest]
    fn explicit_content_type_wins_over_default() {
        let adapter = JsonEnvelopeAdapter::new();
        let conn = open_conn(1);
        let disposition = adapter
            .on_message(&conn, r#"{"headers":{"content-type":"text/csv"}}"#)
            .expect("valid json");
        assert_eq!(
            disposition.requests()[0].header("content-type"),
            Some("text/csv")
        );
    }

    #[rstest]
    fn sequence_must_increase_strictly() {
        let adapter = strict();
        let conn = open_conn(1);
        adapter
            .on_message(&conn, r#"{"seq":1,"path":"/a"}"#)
            .expect("first message");
        let error = adapter
            .on_message(&conn, r#"{"seq":1,"path":"/b"}"#)
            .expect_err("duplicate seq");
        assert!(matches!(error, AdapterError::ProtocolState { .. }));
        assert_eq!(adapter.on_error(&conn, &error), ErrorVerdict::Fatal);
    }

    #[rstest]
    fn missing_seq_is_malformed_and_commits_nothing() {
        let adapter = strict();
        let conn = open_conn(1);
        adapter
            .on_message(&conn, r#"{"seq":5}"#)
            .expect("first message");

        // Second element lacks seq: the whole batch is rejected and the
        // floor stays at 5.
        let error = adapter
            .on_message(&conn, r#"[{"seq":6},{"path":"/no-seq"}]"#)
            .expect_err("missing seq");
        assert!(matches!(error, AdapterError::MalformedMessage { .. }));

        adapter
            .on_message(&conn, r#"{"seq":6}"#)
            .expect("seq 6 was never committed");
    }

    #[rstest]
    fn sequence_state_is_partitioned_per_connection() {
        let adapter = strict();
        let first = open_conn(1);
        let second = open_conn(2);
        adapter
            .on_message(&first, r#"{"seq":9}"#)
            .expect("conn 1 seq 9");
        adapter
            .on_message(&second, r#"{"seq":1}"#)
            .expect("conn 2 starts fresh");
    }

    #[rstest]
    fn on_close_releases_sequence_state() {
        let adapter = strict();
        let conn = open_conn(1);
        adapter
            .on_message(&conn, r#"{"seq":9}"#)
            .expect("seed state");
        adapter.on_close(&conn);
        assert!(adapter.last_seq.is_empty());
    }

    #[rstest]
    fn null_body_yields_empty_bytes() {
        let adapter = JsonEnvelopeAdapter::new();
        let conn = open_conn(1);
        let disposition = adapter
            .on_message(&conn, r#"{"path":"/x","body":null}"#)
            .expect("valid json");
        assert!(disposition.requests()[0].body().is_empty());
    }
}

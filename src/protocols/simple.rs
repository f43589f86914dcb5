//! Default dispatching adapter: one message, one request.

use crate::{
    adapter::{Disposition, ProtocolAdapter},
    config::AdapterConfig,
    connection::WebSocketConn,
    error::AdapterError,
    frame::BinaryWindow,
};

/// Default content type for text frames.
const TEXT_CONTENT_TYPE: &str = "text/plain";
/// Default content type for binary frames.
const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Maps every inbound message to exactly one synthetic request.
///
/// Recognized init params (all optional):
///
/// - `method`: request method, an uppercase ASCII token. Default `POST`.
/// - `path`: request path, must begin with `/`. Default `/`.
/// - `content-type`: overrides the content type for both text and binary
///   frames. Defaults are `text/plain` for text and
///   `application/octet-stream` for binary.
///
/// A text frame consisting of exactly `PING` is answered in-line with a
/// `PONG` text frame and never dispatched. All other frames are dispatched
/// verbatim as the request body. The adapter is stateless and registers well
/// as [`crate::registry::Activation::Shared`].
#[derive(Debug)]
pub struct SimpleDispatchAdapter {
    method: String,
    path: String,
    content_type: Option<String>,
}

impl SimpleDispatchAdapter {
    /// An adapter with default options, before `configure`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            method: "POST".to_owned(),
            path: "/".to_owned(),
            content_type: None,
        }
    }

    /// Boxed constructor for registry factories.
    #[must_use]
    pub fn boxed() -> Box<dyn ProtocolAdapter> { Box::new(Self::new()) }

    fn content_type_for(&self, default: &str) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| default.to_owned())
    }
}

impl Default for SimpleDispatchAdapter {
    fn default() -> Self { Self::new() }
}

impl ProtocolAdapter for SimpleDispatchAdapter {
    fn configure(&mut self, config: &AdapterConfig) -> Result<(), AdapterError> {
        if let Some(method) = config.get("method") {
            if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
                return Err(AdapterError::configuration(format!(
                    "init param `method` must be an uppercase ASCII token, got `{method}`"
                )));
            }
            self.method = method.to_owned();
        }
        if let Some(path) = config.get("path") {
            if !path.starts_with('/') {
                return Err(AdapterError::configuration(format!(
                    "init param `path` must begin with `/`, got `{path}`"
                )));
            }
            self.path = path.to_owned();
        }
        if let Some(content_type) = config.get("content-type") {
            self.content_type = Some(content_type.to_owned());
        }
        Ok(())
    }

    fn on_message(&self, conn: &WebSocketConn, text: &str) -> Result<Disposition, AdapterError> {
        if text == "PING" {
            conn.send_text("PONG");
            return Ok(Disposition::Handled);
        }
        Ok(Disposition::single(
            crate::request::SyntheticRequest::builder()
                .method(self.method.as_str())
                .path(self.path.as_str())
                .header("content-type", self.content_type_for(TEXT_CONTENT_TYPE))
                .body(text.to_owned())
                .build(),
        ))
    }

    fn on_binary(
        &self,
        _conn: &WebSocketConn,
        window: BinaryWindow<'_>,
    ) -> Result<Disposition, AdapterError> {
        Ok(Disposition::single(
            crate::request::SyntheticRequest::builder()
                .method(self.method.as_str())
                .path(self.path.as_str())
                .header("content-type", self.content_type_for(BINARY_CONTENT_TYPE))
                .body(window.to_bytes())
                .build(),
        ))
    }
}

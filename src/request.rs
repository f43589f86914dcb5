//! Synthetic requests handed to the downstream dispatcher.
//!
//! A [`SyntheticRequest`] is the request-shaped value an adapter derives from
//! an inbound frame. Adapters return an ordered batch per message and the
//! coordinator preserves that order through dispatch.

use std::collections::BTreeMap;

use bytes::Bytes;

/// A request synthesized from a WebSocket message.
///
/// # Examples
///
/// ```
/// use wsbridge::request::SyntheticRequest;
///
/// let request = SyntheticRequest::builder()
///     .method("POST")
///     .path("/chat")
///     .header("content-type", "application/json")
///     .body(r#"{"hello":"world"}"#)
///     .build();
/// assert_eq!(request.method(), "POST");
/// assert_eq!(request.header("content-type"), Some("application/json"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntheticRequest {
    method: String,
    path: String,
    headers: BTreeMap<String, String>,
    body: Bytes,
}

impl SyntheticRequest {
    /// Start building a request.
    #[must_use]
    pub fn builder() -> SyntheticRequestBuilder { SyntheticRequestBuilder::default() }

    /// Request method used for downstream routing.
    #[must_use]
    pub fn method(&self) -> &str { &self.method }

    /// Request path used for downstream routing.
    #[must_use]
    pub fn path(&self) -> &str { &self.path }

    /// Look up a header by exact name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// All headers in name order.
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> { &self.headers }

    /// Request body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes { &self.body }

    /// Consume the request and return the body.
    #[must_use]
    pub fn into_body(self) -> Bytes { self.body }
}

/// Builder for [`SyntheticRequest`].
#[derive(Debug, Default)]
pub struct SyntheticRequestBuilder {
    method: Option<String>,
    path: Option<String>,
    headers: BTreeMap<String, String>,
    body: Bytes,
}

impl SyntheticRequestBuilder {
    /// Set the request method. Defaults to `POST` when unset.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the request path. Defaults to `/` when unset.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add a header, replacing any previous value for the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Finish building the request.
    #[must_use]
    pub fn build(self) -> SyntheticRequest {
        SyntheticRequest {
            method: self.method.unwrap_or_else(|| "POST".to_owned()),
            path: self.path.unwrap_or_else(|| "/".to_owned()),
            headers: self.headers,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn builder_applies_defaults() {
        let request = SyntheticRequest::builder().build();
        assert_eq!(request.method(), "POST");
        assert_eq!(request.path(), "/");
        assert!(request.headers().is_empty());
        assert!(request.body().is_empty());
    }

    #[rstest]
    fn builder_sets_all_fields() {
        let request = SyntheticRequest::builder()
            .method("GET")
            .path("/status")
            .header("x-proto", "json")
            .body(Bytes::from_static(b"payload"))
            .build();
        assert_eq!(request.method(), "GET");
        assert_eq!(request.path(), "/status");
        assert_eq!(request.header("x-proto"), Some("json"));
        assert_eq!(&request.into_body()[..], b"payload");
    }

    #[rstest]
    fn duplicate_header_keeps_last_value() {
        let request = SyntheticRequest::builder()
            .header("content-type", "text/plain")
            .header("content-type", "application/json")
            .build();
        assert_eq!(request.header("content-type"), Some("application/json"));
    }

    #[rstest]
    fn missing_header_is_none() {
        let request = SyntheticRequest::builder().build();
        assert_eq!(request.header("absent"), None);
    }
}

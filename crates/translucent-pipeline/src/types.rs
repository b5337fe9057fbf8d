//! Resource request and response types carried through the pipeline.
//!
//! Requests address a resource by URI (`file:///etc/hosts`,
//! `config:app.timeout`, `https://example.com/data`) and reuse HTTP method and
//! status vocabulary, whatever the underlying transport.

use bytes::Bytes;
use http::{Method, StatusCode};
use std::collections::BTreeMap;

/// A request for a resource.
///
/// # Example
///
/// ```
/// use translucent_pipeline::Request;
///
/// let request = Request::put("file:///tmp/notes.txt")
///     .with_body("hello")
///     .with_metadata("content-type", "text/plain");
///
/// assert_eq!(request.scheme(), Some("file"));
/// assert_eq!(request.body_str(), Some("hello"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// What to do with the resource.
    pub method: Method,
    /// Address of the resource.
    pub uri: String,
    /// Request payload, empty for reads.
    pub body: Bytes,
    /// Free-form request metadata.
    pub metadata: BTreeMap<String, String>,
}

impl Request {
    /// Creates a request with an empty body.
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            body: Bytes::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Creates a `GET` request.
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Creates a `POST` request.
    pub fn post(uri: impl Into<String>) -> Self {
        Self::new(Method::POST, uri)
    }

    /// Creates a `PUT` request.
    pub fn put(uri: impl Into<String>) -> Self {
        Self::new(Method::PUT, uri)
    }

    /// Creates a `DELETE` request.
    pub fn delete(uri: impl Into<String>) -> Self {
        Self::new(Method::DELETE, uri)
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the URI scheme, the part before the first `:`.
    pub fn scheme(&self) -> Option<&str> {
        self.uri
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .filter(|scheme| !scheme.is_empty())
    }

    /// Returns the body as UTF-8, if it is valid UTF-8.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// The outcome of handling a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Outcome status.
    pub status: StatusCode,
    /// Response payload.
    pub body: Bytes,
    /// Free-form response metadata.
    pub metadata: BTreeMap<String, String>,
}

impl Response {
    /// Creates an empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            body: Bytes::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Creates a `200 OK` response with a body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK).with_body(body)
    }

    /// Creates a `404 Not Found` response.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the body as UTF-8, if it is valid UTF-8.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

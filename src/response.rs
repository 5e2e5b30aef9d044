//! The response sink handed to every handler.
//!
//! A handler does not return a response; it writes into the one it is given.
//! Middleware wrapped around the handler sees the same sink before and after
//! the handler runs.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;

/// Common content-type values for [`Response::bytes`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }
}

/// An outgoing HTTP response under construction. Starts as `200 OK` with
/// no headers and an empty body.
///
/// ```rust
/// use restop::{Response, StatusCode};
///
/// let mut res = Response::new();
/// res.set_status(StatusCode::CREATED);
/// res.set_header("location", "/person/42");
/// res.json(br#"{"uid":"42"}"#.to_vec());
/// assert_eq!(res.status(), StatusCode::CREATED);
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: Vec::new(), body: Vec::new() }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Sets a header, replacing any existing value under the same name.
    pub fn set_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value.to_owned(),
            None => self.headers.push((name.to_owned(), value.to_owned())),
        }
    }

    /// Appends raw bytes to the body.
    pub fn write(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    /// Replaces the body with JSON bytes (`application/json`).
    pub fn json(&mut self, body: Vec<u8>) {
        self.bytes(ContentType::Json, body);
    }

    /// Replaces the body with text (`text/plain; charset=utf-8`).
    pub fn text(&mut self, body: impl Into<String>) {
        self.bytes(ContentType::Text, body.into().into_bytes());
    }

    /// Replaces the body and sets its content type.
    pub fn bytes(&mut self, content_type: ContentType, body: Vec<u8>) {
        self.set_header("content-type", content_type.as_str());
        self.body = body;
    }

    /// Sets an error status with a plain-text reason, like `http.Error`.
    pub fn error(&mut self, status: StatusCode, message: &str) {
        self.set_status(status);
        self.text(message);
    }

    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut out = http::Response::new(Full::new(Bytes::from(self.body)));
        *out.status_mut() = self.status;
        for (name, value) in self.headers {
            match (
                http::HeaderName::from_bytes(name.as_bytes()),
                http::HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    out.headers_mut().append(name, value);
                }
                _ => tracing::warn!(header = %name, "dropping header that is not valid HTTP"),
            }
        }
        out
    }
}

impl Default for Response {
    fn default() -> Self { Self::new() }
}

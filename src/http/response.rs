//! HTTP response value and its wire serializer.

use crate::http::types::{Headers, StatusCode, Version};
use std::fmt::Display;

/// HTTP response built by a handler.
///
/// Headers keep insertion order and never repeat a name. The serializer
/// writes exactly what the response holds: no `Content-Length` is added on
/// the handler's behalf, set it with [`content_length()`](Response::content_length)
/// or build the response with [`text()`](Response::text) /
/// [`bytes()`](Response::bytes).
///
/// # Examples
/// ```
/// use scratch_http::{Response, StatusCode};
///
/// let resp = Response::new(StatusCode::Ok)
///     .header("Content-Type", "text/plain")
///     .body("abc")
///     .content_length();
///
/// assert_eq!(
///     resp.to_bytes(),
///     b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 3\r\n\r\nabc"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub(crate) version: Version,
    status: StatusCode,
    headers: Headers,
    pub(crate) body: Vec<u8>,
}

impl Response {
    /// Creates a response with no headers and an empty body.
    #[inline]
    pub fn new(status: StatusCode) -> Self {
        Self {
            version: Version::Http11,
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// `404 Not Found` with empty headers and body.
    #[inline]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NotFound)
    }

    /// `text/plain` response with `Content-Length` set.
    pub fn text<B: Into<Vec<u8>>>(status: StatusCode, body: B) -> Self {
        Self::new(status)
            .header("Content-Type", "text/plain")
            .body(body)
            .content_length()
    }

    /// `application/octet-stream` response with `Content-Length` set.
    pub fn bytes<B: Into<Vec<u8>>>(status: StatusCode, body: B) -> Self {
        Self::new(status)
            .header("Content-Type", "application/octet-stream")
            .body(body)
            .content_length()
    }

    /// Adds a header, replacing any earlier value with the same name.
    #[inline]
    pub fn header<V: Display>(mut self, name: &str, value: V) -> Self {
        self.set_header(name, value);
        self
    }

    /// Replaces the body.
    #[inline]
    pub fn body<B: Into<Vec<u8>>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// Sets `Content-Length` to the current body length.
    #[inline]
    pub fn content_length(mut self) -> Self {
        let len = self.body.len();
        self.set_header("Content-Length", len);
        self
    }

    #[inline]
    pub fn set_header<V: Display>(&mut self, name: &str, value: V) {
        self.headers.insert(name, value.to_string());
    }
}

// Accessors
impl Response {
    #[inline(always)]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[inline(always)]
    pub const fn version(&self) -> Version {
        self.version
    }

    #[inline(always)]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    #[inline(always)]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    #[inline(always)]
    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }
}

// Serialization
impl Response {
    /// Appends the wire form of the response to `buffer`.
    ///
    /// ```text
    /// [VERSION] SP [CODE] SP [REASON] CRLF
    /// ([NAME] ": " [VALUE] CRLF)*
    /// CRLF
    /// [BODY]
    /// ```
    pub fn write_to(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(self.status.to_first_line(self.version));

        for (name, value) in self.headers.iter() {
            buffer.extend_from_slice(name.as_bytes());
            buffer.extend_from_slice(b": ");
            buffer.extend_from_slice(value.as_bytes());
            buffer.extend_from_slice(b"\r\n");
        }

        buffer.extend_from_slice(b"\r\n");
        buffer.extend_from_slice(&self.body);
    }

    /// Returns the wire form of the response.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.estimated_len());
        self.write_to(&mut buffer);
        buffer
    }

    #[inline]
    fn estimated_len(&self) -> usize {
        let head: usize = self
            .headers
            .iter()
            .map(|(name, value)| name.len() + value.len() + 4)
            .sum();

        32 + head + 2 + self.body.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::*;

    #[test]
    fn status_line_only() {
        #[rustfmt::skip]
        let cases = [
            (StatusCode::Ok,                  "HTTP/1.1 200 OK\r\n\r\n"),
            (StatusCode::Created,             "HTTP/1.1 201 Created\r\n\r\n"),
            (StatusCode::NotFound,            "HTTP/1.1 404 Not Found\r\n\r\n"),
            (StatusCode::InternalServerError, "HTTP/1.1 500 Internal Server Error\r\n\r\n"),
        ];

        for (status, expected) in cases {
            assert_eq!(str_op(&Response::new(status).to_bytes()), expected);
        }
    }

    #[test]
    fn headers_in_insertion_order() {
        let resp = Response::new(StatusCode::Ok)
            .header("X-First", 1)
            .header("Content-Type", "text/plain")
            .header("X-Last", true)
            .header("x-first", "replaced");

        assert_eq!(
            str_op(&resp.to_bytes()),
            "HTTP/1.1 200 OK\r\nX-First: replaced\r\nContent-Type: text/plain\r\nX-Last: true\r\n\r\n"
        );
    }

    #[test]
    fn no_implicit_content_length() {
        let resp = Response::new(StatusCode::Ok).body("abc");

        assert_eq!(str_op(&resp.to_bytes()), "HTTP/1.1 200 OK\r\n\r\nabc");
        assert_eq!(resp.header_value("content-length"), None);
    }

    #[test]
    fn text_and_bytes_helpers() {
        let text = Response::text(StatusCode::Ok, "abc");
        assert_eq!(
            str_op(&text.to_bytes()),
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 3\r\n\r\nabc"
        );

        let bytes = Response::bytes(StatusCode::Ok, vec![0u8, 1, 2, 3]);
        assert_eq!(bytes.header_value("content-type"), Some("application/octet-stream"));
        assert_eq!(bytes.header_value("content-length"), Some("4"));
        assert!(bytes.to_bytes().ends_with(&[b'\n', 0, 1, 2, 3]));
    }

    #[test]
    fn binary_body_is_written_verbatim() {
        let body = vec![0x1f, 0x8b, 0x00, 0xff];
        let resp = Response::new(StatusCode::Ok).body(body.clone());
        let wire = resp.to_bytes();

        assert_eq!(&wire[wire.len() - body.len()..], body.as_slice());
    }

    #[test]
    fn serialization_is_idempotent() {
        let resp = Response::text(StatusCode::Created, "hello").header("X-Id", 7);

        assert_eq!(resp.to_bytes(), resp.to_bytes());

        let mut buffer = b"prefix".to_vec();
        resp.write_to(&mut buffer);
        assert_eq!(&buffer[6..], resp.to_bytes().as_slice());
    }

    #[test]
    fn not_found_is_empty() {
        let resp = Response::not_found();

        assert_eq!(resp.status(), StatusCode::NotFound);
        assert!(resp.headers().is_empty());
        assert!(resp.body_bytes().is_empty());
        assert_eq!(str_op(&resp.to_bytes()), "HTTP/1.1 404 Not Found\r\n\r\n");
    }
}

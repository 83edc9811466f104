use crate::{
    errors::{Malformed, ParseError},
    http::types::{self, Headers, Method, Version},
    limits::ReqLimits,
    server::router::Params,
};
use memchr::memchr;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// A parsed HTTP request.
///
/// Immutable once parsed; the only thing added afterwards are the path
/// parameters bound by the [`Router`](crate::Router).
///
/// # Input format
///
/// - `SP`: ASCII space (0x20)
/// - `EOL`: `"\r\n"` or a bare `"\n"`
///
/// ## First line
/// ```text
/// [METHOD] SP [TARGET] SP [VERSION] EOL
/// ```
/// Exactly three tokens separated by single spaces. `[METHOD]` is one of
/// [`Method`], `[TARGET]` starts with `/`, `[VERSION]` is `HTTP/1.1`.
///
/// ## Header
/// ```text
/// [NAME] ":" [VALUE] EOL
/// ```
/// Split on the first colon. Name and value are trimmed, the name is
/// lower-cased. A repeated name overwrites the earlier value.
///
/// ## End of headers
/// ```text
/// EOL
/// ```
///
/// ## Body
///
/// Exactly `Content-Length` bytes, or nothing when the header is absent.
///
/// **Not supported**:
/// - `Transfer-Encoding: chunked`
/// - Implicit-length bodies (read until connection close)
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    target: String,
    version: Version,
    headers: Headers,
    params: Params,
    body: Vec<u8>,
}

// Public API
impl Request {
    /// Reads one request from `reader`.
    ///
    /// # Examples
    /// ```
    /// use scratch_http::{limits::ReqLimits, Method, Request};
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let mut raw: &[u8] = b"GET /echo/abc HTTP/1.1\r\nHost: localhost\r\n\r\n";
    /// let req = Request::parse(&mut raw, &ReqLimits::default()).await.unwrap();
    ///
    /// assert_eq!(req.method(), Method::Get);
    /// assert_eq!(req.target(), "/echo/abc");
    /// assert_eq!(req.header("host"), Some("localhost"));
    /// # }
    /// ```
    pub async fn parse<R>(reader: &mut R, limits: &ReqLimits) -> Result<Request, ParseError>
    where
        R: AsyncBufRead + Unpin,
    {
        Parser::new(reader, limits).parse().await
    }

    #[inline(always)]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// The request target exactly as sent, always beginning with `/`.
    #[inline(always)]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[inline(always)]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Returns a header value with case-insensitive name matching.
    #[inline(always)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    #[inline(always)]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns a path parameter bound by the matched route pattern.
    #[inline(always)]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    #[inline(always)]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// The request body, empty when no `Content-Length` was sent.
    #[inline(always)]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl Request {
    #[inline]
    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }
}

//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    StatusLine,
    Headers,
    Body,
    Done,
}

pub(crate) struct Parser<'a, R> {
    reader: &'a mut R,
    limits: &'a ReqLimits,
    line: Vec<u8>,
    state: ParseState,
}

impl<'a, R: AsyncBufRead + Unpin> Parser<'a, R> {
    #[inline]
    pub(crate) fn new(reader: &'a mut R, limits: &'a ReqLimits) -> Self {
        Self {
            reader,
            limits,
            line: Vec::with_capacity(256),
            state: ParseState::StatusLine,
        }
    }

    pub(crate) async fn parse(mut self) -> Result<Request, ParseError> {
        let mut first_line = None;
        let mut headers = Headers::new();
        let mut header_lines = 0;
        let mut body = Vec::new();

        loop {
            match self.state {
                ParseState::StatusLine => {
                    let line = self.next_line().await?;
                    first_line = Some(parse_status_line(line)?);

                    self.state = ParseState::Headers;
                }
                ParseState::Headers => {
                    let line = self.next_line().await?;
                    if line.is_empty() {
                        self.state = ParseState::Body;
                        continue;
                    }

                    let (name, value) = parse_header(line)?;

                    header_lines += 1;
                    if header_lines > self.limits.header_count {
                        return Err(Malformed::TooManyHeaders.into());
                    }
                    headers.insert(name, value);
                }
                ParseState::Body => {
                    body = self.read_body(&headers).await?;

                    self.state = ParseState::Done;
                }
                ParseState::Done => break,
            }
        }

        let (method, target, version) = first_line.ok_or(Malformed::StatusLine)?;

        Ok(Request {
            method,
            target,
            version,
            headers,
            params: Params::default(),
            body,
        })
    }

    // Reads up to the next `\n` and returns the line without its terminator.
    async fn next_line(&mut self) -> Result<&str, ParseError> {
        self.line.clear();

        // `+ 2` leaves room for the `\r\n` terminator
        let limit = self.limits.line_size as u64 + 2;
        let read = (&mut *self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.line)
            .await?;

        if self.line.last() != Some(&b'\n') {
            return Err(match read as u64 == limit {
                true => Malformed::LineTooLong.into(),
                false => io::Error::from(io::ErrorKind::UnexpectedEof).into(),
            });
        }

        let mut end = self.line.len() - 1;
        if end > 0 && self.line[end - 1] == b'\r' {
            end -= 1;
        }
        if end > self.limits.line_size {
            return Err(Malformed::LineTooLong.into());
        }

        simdutf8::basic::from_utf8(&self.line[..end]).map_err(|_| Malformed::InvalidEncoding.into())
    }

    async fn read_body(&mut self, headers: &Headers) -> Result<Vec<u8>, ParseError> {
        let Some(value) = headers.get("content-length") else {
            return Ok(Vec::new());
        };

        let len = types::slice_to_usize(value.as_bytes()).ok_or(Malformed::InvalidContentLength)?;
        if len > self.limits.body_size {
            return Err(Malformed::BodyTooLarge.into());
        }

        let mut body = vec![0; len];
        self.reader.read_exact(&mut body).await?;

        Ok(body)
    }
}

#[inline]
fn parse_status_line(line: &str) -> Result<(Method, String, Version), Malformed> {
    let mut tokens = line.split(' ');

    let (Some(method), Some(target), Some(version), None) =
        (tokens.next(), tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(Malformed::StatusLine);
    };

    let method = Method::from_bytes(method.as_bytes())?;
    if !target.starts_with('/') {
        return Err(Malformed::InvalidTarget);
    }
    let version = Version::from_bytes(version.as_bytes())?;

    Ok((method, target.to_owned(), version))
}

#[inline]
fn parse_header(line: &str) -> Result<(String, String), Malformed> {
    let colon = memchr(b':', line.as_bytes()).ok_or(Malformed::InvalidHeader)?;

    let name = line[..colon].trim();
    if name.is_empty() {
        return Err(Malformed::InvalidHeader);
    }
    let value = line[colon + 1..].trim();

    Ok((name.to_ascii_lowercase(), value.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse(raw: &str) -> Result<Request, ParseError> {
        parse_with(raw, &ReqLimits::default()).await
    }

    async fn parse_with(raw: &str, limits: &ReqLimits) -> Result<Request, ParseError> {
        let mut reader = raw.as_bytes();
        Request::parse(&mut reader, limits).await
    }

    fn eof() -> ParseError {
        io::Error::from(io::ErrorKind::UnexpectedEof).into()
    }

    #[tokio::test]
    async fn minimal_request() {
        let req = parse("GET / HTTP/1.1\r\n\r\n").await.unwrap();

        assert_eq!(req.method(), Method::Get);
        assert_eq!(req.target(), "/");
        assert_eq!(req.version(), Version::Http11);
        assert!(req.headers().is_empty());
        assert!(req.params().is_empty());
        assert!(req.body().is_empty());
    }

    #[tokio::test]
    async fn status_line() {
        #[rustfmt::skip]
        let cases = [
            ("GET /echo/abc HTTP/1.1", Ok((Method::Get, "/echo/abc"))),
            ("POST /files/a HTTP/1.1", Ok((Method::Post, "/files/a"))),
            ("GET /a?b=c HTTP/1.1",    Ok((Method::Get, "/a?b=c"))),

            ("GET /",                  Err(Malformed::StatusLine)),
            ("GET",                    Err(Malformed::StatusLine)),
            ("",                       Err(Malformed::StatusLine)),
            ("GET / HTTP/1.1 extra",   Err(Malformed::StatusLine)),
            ("GET  / HTTP/1.1",        Err(Malformed::StatusLine)),
            ("PUT / HTTP/1.1",         Err(Malformed::InvalidMethod)),
            ("get / HTTP/1.1",         Err(Malformed::InvalidMethod)),
            ("GET echo HTTP/1.1",      Err(Malformed::InvalidTarget)),
            ("GET / HTTP/1.0",         Err(Malformed::UnsupportedVersion)),
            ("GET / HTTP/2",           Err(Malformed::UnsupportedVersion)),
        ];

        for (line, expected) in cases {
            let result = parse(&format!("{line}\r\n\r\n")).await;

            match expected {
                Ok((method, target)) => {
                    let req = result.unwrap();
                    assert_eq!(req.method(), method, "{line:?}");
                    assert_eq!(req.target(), target, "{line:?}");
                }
                Err(kind) => assert_eq!(result, Err(kind.into()), "{line:?}"),
            }
        }
    }

    #[tokio::test]
    async fn header_line() {
        #[rustfmt::skip]
        let cases = [
            ("Host: localhost",         Some(("host", "localhost"))),
            ("HOST: localhost",         Some(("host", "localhost"))),
            ("host:localhost",          Some(("host", "localhost"))),
            ("  X-Pad  :   padded   ",  Some(("x-pad", "padded"))),
            ("X-Empty:",                Some(("x-empty", ""))),
            ("X-Time: 12:30:00",        Some(("x-time", "12:30:00"))),
            ("User-Agent: Foo/1.2.3",   Some(("user-agent", "Foo/1.2.3"))),

            ("No-Colon value",          None),
            (": value",                 None),
            ("   : value",              None),
        ];

        for (header, expected) in cases {
            let result = parse(&format!("GET / HTTP/1.1\r\n{header}\r\n\r\n")).await;

            match expected {
                Some((name, value)) => {
                    let req = result.unwrap();
                    assert_eq!(req.headers().len(), 1, "{header:?}");
                    assert_eq!(req.headers().iter().next(), Some((name, value)), "{header:?}");
                }
                None => assert_eq!(result, Err(Malformed::InvalidHeader.into()), "{header:?}"),
            }
        }
    }

    #[tokio::test]
    async fn header_count_matches_lines() {
        let req = parse(concat!(
            "GET / HTTP/1.1\r\n",
            "Host: localhost:4221\r\n",
            "User-Agent: curl/8.0\r\n",
            "Accept: */*\r\n",
            "Accept-Encoding: gzip\r\n",
            "\r\n",
        ))
        .await
        .unwrap();

        assert_eq!(req.headers().len(), 4);
        assert_eq!(req.header("Accept-Encoding"), Some("gzip"));
        assert_eq!(req.header("accept"), Some("*/*"));
    }

    #[tokio::test]
    async fn duplicate_headers_last_wins() {
        let req = parse("GET / HTTP/1.1\r\nX-Id: 1\r\nx-id: 2\r\nX-ID: 3\r\n\r\n")
            .await
            .unwrap();

        assert_eq!(req.headers().len(), 1);
        assert_eq!(req.header("x-id"), Some("3"));
    }

    #[tokio::test]
    async fn bare_lf_line_endings() {
        let req = parse("GET /user-agent HTTP/1.1\nUser-Agent: test\n\n")
            .await
            .unwrap();

        assert_eq!(req.target(), "/user-agent");
        assert_eq!(req.header("user-agent"), Some("test"));
    }

    #[tokio::test]
    async fn body() {
        #[rustfmt::skip]
        let cases = [
            ("Content-Length: 5\r\n\r\nhello",       Ok("hello")),
            ("Content-Length: 0\r\n\r\n",            Ok("")),
            ("content-length:  3 \r\n\r\nabcdef",    Ok("abc")),
            ("\r\nignored without content-length",   Ok("")),
            ("Content-Length: 4\r\n\r\nbin\0",       Ok("bin\0")),

            ("Content-Length: 5\r\n\r\nhel",         Err(eof())),
            ("Content-Length: -1\r\n\r\n",           Err(Malformed::InvalidContentLength.into())),
            ("Content-Length: 12a\r\n\r\n",          Err(Malformed::InvalidContentLength.into())),
            ("Content-Length:\r\n\r\n",              Err(Malformed::InvalidContentLength.into())),
            ("Content-Length: 1048577\r\n\r\n",      Err(Malformed::BodyTooLarge.into())),
        ];

        for (rest, expected) in cases {
            let result = parse(&format!("POST /files/a HTTP/1.1\r\n{rest}")).await;

            match expected {
                Ok(body) => assert_eq!(result.unwrap().body(), body.as_bytes(), "{rest:?}"),
                Err(err) => assert_eq!(result, Err(err), "{rest:?}"),
            }
        }
    }

    #[tokio::test]
    async fn body_stops_at_content_length() {
        let mut reader: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nokNEXT";
        let req = Request::parse(&mut reader, &ReqLimits::default())
            .await
            .unwrap();

        assert_eq!(req.body(), b"ok");
        assert_eq!(reader, b"NEXT");
    }

    #[tokio::test]
    async fn truncated_input_is_io() {
        #[rustfmt::skip]
        let cases = [
            "",
            "GET / HTTP/1.1",
            "GET / HTTP/1.1\r\n",
            "GET / HTTP/1.1\r\nHost: x\r\n",
        ];

        for raw in cases {
            let err = parse(raw).await.unwrap_err();
            assert!(err.is_io(), "{raw:?}");
            assert_eq!(err, eof(), "{raw:?}");
        }
    }

    #[tokio::test]
    async fn limits() {
        let limits = ReqLimits {
            line_size: 32,
            header_count: 2,
            body_size: 4,
            ..ReqLimits::default()
        };

        #[rustfmt::skip]
        let cases = [
            ("GET /a HTTP/1.1\r\nA: 1\r\nB: 2\r\n\r\n",          Ok(())),
            ("GET /a HTTP/1.1\r\nA: 1\r\nA: 2\r\nA: 3\r\n\r\n",  Err(Malformed::TooManyHeaders)),
            ("GET /aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa HTTP/1.1\r\n\r\n", Err(Malformed::LineTooLong)),
            ("GET /a HTTP/1.1\r\nX-Long: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\r\n\r\n", Err(Malformed::LineTooLong)),
            ("POST /a HTTP/1.1\r\nContent-Length: 5\r\n\r\n12345", Err(Malformed::BodyTooLarge)),
        ];

        for (raw, expected) in cases {
            let result = parse_with(raw, &limits).await.map(|_| ());
            assert_eq!(result, expected.map_err(ParseError::from), "{raw:?}");
        }
    }

    #[tokio::test]
    async fn invalid_utf8_head() {
        let mut reader: &[u8] = b"GET /\xff HTTP/1.1\r\n\r\n";
        let result = Request::parse(&mut reader, &ReqLimits::default()).await;

        assert_eq!(result, Err(Malformed::InvalidEncoding.into()));
    }
}

//! Content negotiation for response bodies.
//!
//! The client lists acceptable encodings in `Accept-Encoding`; every listed
//! encoding the server supports is applied to the body in the order the
//! client gave, and the applied ones are announced in `Content-Encoding`.

use crate::{errors::EncodingError, http::response::Response};
use flate2::{write::GzEncoder, Compression};
use std::{fmt, io::Write, mem};
use tracing::warn;

/// Content encoding token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// `gzip` - DEFLATE in a gzip container
    /// [[RFC1952](https://datatracker.ietf.org/doc/html/rfc1952)]
    Gzip,
    /// Anything the server does not implement. Never applied or echoed.
    Unknown,
}

impl Encoding {
    /// Maps a single `Accept-Encoding` token, ignoring case and surrounding
    /// whitespace.
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            t if t.eq_ignore_ascii_case("gzip") => Encoding::Gzip,
            _ => Encoding::Unknown,
        }
    }

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Encoding::Gzip => "gzip",
            Encoding::Unknown => "unknown",
        }
    }

    /// Encodes `data` with this encoding.
    pub fn apply(self, data: &[u8], level: Compression) -> Result<Vec<u8>, EncodingError> {
        match self {
            Encoding::Gzip => {
                let compression = |source| EncodingError::Compression {
                    encoding: self,
                    source,
                };

                let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 32), level);
                encoder.write_all(data).map_err(compression)?;
                encoder.finish().map_err(compression)
            }
            Encoding::Unknown => Err(EncodingError::Unsupported(self)),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported encodings from an `Accept-Encoding` value, in client order.
///
/// # Examples
/// ```
/// use scratch_http::{negotiate, Encoding};
///
/// assert_eq!(negotiate(Some("gzip, br")), [Encoding::Gzip]);
/// assert!(negotiate(Some("br, deflate")).is_empty());
/// assert!(negotiate(None).is_empty());
/// ```
pub fn negotiate(accept_encoding: Option<&str>) -> Vec<Encoding> {
    let Some(value) = accept_encoding else {
        return Vec::new();
    };

    value
        .split(',')
        .map(Encoding::from_token)
        .filter(|enc| *enc != Encoding::Unknown)
        .collect()
}

/// Compresses the response body for the encodings the client accepts.
///
/// Returns the response unchanged when nothing supported was requested.
/// An encoding that fails is logged and skipped; it does not appear in
/// `Content-Encoding`. If the response already carries `Content-Length`,
/// it is updated to the encoded length.
pub fn encode_response(
    response: Response,
    accept_encoding: Option<&str>,
    level: Compression,
) -> Response {
    let encodings = negotiate(accept_encoding);

    apply_encodings(response, &encodings, |enc, data| enc.apply(data, level))
}

pub(crate) fn apply_encodings<F>(mut response: Response, encodings: &[Encoding], mut coder: F) -> Response
where
    F: FnMut(Encoding, &[u8]) -> Result<Vec<u8>, EncodingError>,
{
    if encodings.is_empty() {
        return response;
    }

    let mut body = mem::take(&mut response.body);
    let mut applied = Vec::with_capacity(encodings.len());

    for &encoding in encodings {
        match coder(encoding, &body) {
            Ok(encoded) => {
                body = encoded;
                applied.push(encoding.as_str());
            }
            Err(err) => warn!(%encoding, error = %err, "skipping content encoding"),
        }
    }

    response.body = body;

    if !applied.is_empty() {
        response.set_header("Content-Encoding", applied.join(", "));

        if response.header_value("content-length").is_some() {
            let len = response.body.len();
            response.set_header("Content-Length", len);
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::types::StatusCode;
    use flate2::read::GzDecoder;
    use std::io::{self, Read};

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn tokens() {
        #[rustfmt::skip]
        let cases = [
            ("gzip",     Encoding::Gzip),
            (" GZIP ",   Encoding::Gzip),
            ("Gzip",     Encoding::Gzip),

            ("br",       Encoding::Unknown),
            ("deflate",  Encoding::Unknown),
            ("gzip;q=1", Encoding::Unknown),
            ("",         Encoding::Unknown),
        ];

        for (token, expected) in cases {
            assert_eq!(Encoding::from_token(token), expected, "{token:?}");
        }
    }

    #[test]
    fn negotiation() {
        #[rustfmt::skip]
        let cases: [(Option<&str>, &[Encoding]); 6] = [
            (None,                       &[]),
            (Some(""),                   &[]),
            (Some("gzip"),               &[Encoding::Gzip]),
            (Some("gzip, br"),           &[Encoding::Gzip]),
            (Some("invalid-1, invalid-2"), &[]),
            (Some("br,GZIP , zstd"),     &[Encoding::Gzip]),
        ];

        for (value, expected) in cases {
            assert_eq!(negotiate(value), expected, "{value:?}");
        }
    }

    #[test]
    fn gzip_round_trip() {
        let body = "abc".repeat(100);
        let resp = Response::text(StatusCode::Ok, body.clone());

        let encoded = encode_response(resp, Some("gzip, br"), Compression::default());

        assert_eq!(encoded.header_value("content-encoding"), Some("gzip"));
        assert_ne!(encoded.body_bytes(), body.as_bytes());
        assert_eq!(gunzip(encoded.body_bytes()), body.as_bytes());
        assert_eq!(
            encoded.header_value("content-length"),
            Some(encoded.body_bytes().len().to_string().as_str())
        );
    }

    #[test]
    fn empty_body_round_trip() {
        let resp = Response::new(StatusCode::Ok);
        let encoded = encode_response(resp, Some("gzip"), Compression::fast());

        assert_eq!(encoded.header_value("content-encoding"), Some("gzip"));
        assert_eq!(encoded.header_value("content-length"), None);
        assert_eq!(gunzip(encoded.body_bytes()), b"");
    }

    #[test]
    fn repeated_gzip_is_applied_in_order() {
        let resp = Response::new(StatusCode::Ok).body("hello");
        let encoded = encode_response(resp, Some("gzip, gzip"), Compression::default());

        assert_eq!(encoded.header_value("content-encoding"), Some("gzip, gzip"));
        assert_eq!(gunzip(&gunzip(encoded.body_bytes())), b"hello");
    }

    #[test]
    fn unsupported_only_is_unchanged() {
        let resp = Response::text(StatusCode::Ok, "abc");
        let encoded = encode_response(resp.clone(), Some("br, deflate"), Compression::default());

        assert_eq!(encoded, resp);

        let encoded = encode_response(resp.clone(), None, Compression::default());
        assert_eq!(encoded, resp);
    }

    #[test]
    fn failed_encoding_is_skipped() {
        let resp = Response::text(StatusCode::Ok, "abc");

        let encoded = apply_encodings(resp.clone(), &[Encoding::Gzip], |enc, _| {
            Err(EncodingError::Compression {
                encoding: enc,
                source: io::Error::new(io::ErrorKind::Other, "boom"),
            })
        });

        assert_eq!(encoded, resp);
        assert_eq!(encoded.header_value("content-encoding"), None);
    }

    #[test]
    fn partial_failure_keeps_successful_encodings() {
        let resp = Response::new(StatusCode::Ok).body("abc");
        let mut calls = 0;

        let encoded = apply_encodings(resp, &[Encoding::Gzip, Encoding::Gzip], |enc, data| {
            calls += 1;
            match calls {
                1 => enc.apply(data, Compression::default()),
                _ => Err(EncodingError::Unsupported(enc)),
            }
        });

        assert_eq!(encoded.header_value("content-encoding"), Some("gzip"));
        assert_eq!(gunzip(encoded.body_bytes()), b"abc");
    }

    #[test]
    fn unknown_cannot_be_applied() {
        assert!(matches!(
            Encoding::Unknown.apply(b"abc", Compression::default()),
            Err(EncodingError::Unsupported(Encoding::Unknown))
        ));
    }
}

use crate::http::encoding::Encoding;
use std::{fmt, io};

/// Failure to turn a byte stream into a [`Request`](crate::Request).
///
/// The two variants let callers tell a bad request apart from a client that
/// went away (or a socket that failed) while the request was being read.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed request: {0}")]
    Malformed(#[from] Malformed),
    #[error("i/o failure while reading request: {0}")]
    Io(IoError),
}

impl ParseError {
    /// Returns `true` when the request could not be read, as opposed to
    /// being read and rejected.
    #[inline]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl From<io::Error> for ParseError {
    fn from(err: io::Error) -> Self {
        ParseError::Io(IoError(err))
    }
}

/// What exactly was wrong with a malformed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Malformed {
    #[error("status line must have exactly three space separated tokens")]
    StatusLine,
    #[error("unsupported request method")]
    InvalidMethod,
    #[error("request target must start with `/`")]
    InvalidTarget,
    #[error("unsupported protocol version")]
    UnsupportedVersion,

    #[error("header line must be `name: value`")]
    InvalidHeader,
    #[error("too many header lines")]
    TooManyHeaders,
    #[error("line exceeds the configured length")]
    LineTooLong,
    #[error("request head is not valid UTF-8")]
    InvalidEncoding,

    #[error("content-length is not a non-negative integer")]
    InvalidContentLength,
    #[error("request body exceeds the configured size")]
    BodyTooLarge,
}

/// A requested, supported encoding that could not be applied to a body.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("{0} is not a supported content encoding")]
    Unsupported(Encoding),
    #[error("{encoding} compression failed: {source}")]
    Compression {
        encoding: Encoding,
        #[source]
        source: io::Error,
    },
}

/// `io::Error` wrapper comparable by [`io::ErrorKind`].
#[derive(Debug)]
pub struct IoError(pub io::Error);

impl IoError {
    #[inline]
    pub fn kind(&self) -> io::ErrorKind {
        self.0.kind()
    }
}

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

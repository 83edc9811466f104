//! Server configuration limits and timeouts
//!
//! Every limit has a conservative default and is set through the matching
//! [`ServerBuilder`](crate::ServerBuilder) method.
//!
//! # Examples
//!
//! ```no_run
//! use scratch_http::{app, limits::{ConnLimits, ReqLimits, ServerLimits}, Server};
//! use tokio::net::TcpListener;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     Server::builder()
//!         .listener(TcpListener::bind("127.0.0.1:4221").await.unwrap())
//!         .router(app::router())
//!         .context(app::Context::new("/tmp/files"))
//!         .server_limits(ServerLimits {
//!             max_connections: Some(256), // Bounded worker pool
//!             ..ServerLimits::default()
//!         })
//!         .connection_limits(ConnLimits {
//!             socket_read_timeout: Duration::from_secs(2),
//!             ..ConnLimits::default()
//!         })
//!         .request_limits(ReqLimits {
//!             body_size: 16 * 1024,
//!             ..ReqLimits::default()
//!         })
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```

use std::time::Duration;

/// Controls how accepted connections are scheduled.
///
/// # Scheduling
///
/// With `max_connections: None` (the default) every accepted connection is
/// handed to its own [tokio::spawn]ed task. Nothing bounds the number of
/// tasks alive at once.
///
/// With `max_connections: Some(n)` exactly `n` worker tasks are created when
/// the server is built. Accepted connections go into a shared queue first:
/// ```text
///                            [------------]
///                            [ Tcp accept ]
///                            [------------]
///                                  ||
///                                  || TCP_STREAM
///                                  \/
/// [--------------]   Yes   /-----------------\   No   [-------------]
/// [ Add to queue ] <====== | Room in queue?  | =====> [ Sending 503 ]
/// [--------------]         \-----------------/        [-------------]
///        ||
///        \\=================> [ Idle worker picks it up ]
/// ```
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Number of worker tasks, or `None` for one task per connection (default: `None`).
    pub max_connections: Option<usize>,

    /// Maximum number of accepted connections waiting for a worker (default: `256`).
    ///
    /// Only used when `max_connections` is set. Connections beyond it receive
    /// `503 Service Unavailable` and are closed.
    pub max_pending_connections: usize,

    /// Strategy for idle worker tasks (default: `Sleep(50μs)`).
    pub wait_strategy: WaitStrategy,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            max_connections: None,
            max_pending_connections: 256,
            wait_strategy: WaitStrategy::Sleep(Duration::from_micros(50)),

            _priv: (),
        }
    }
}

/// Strategy for worker task waiting when no connections are available
#[derive(Debug, Clone)]
pub enum WaitStrategy {
    /// While waiting, uses [`tokio::task::yield_now()`].
    ///
    /// Lowest latency, but keeps the CPU busy.
    Yield,

    /// While waiting, uses [`tokio::time::sleep()`].
    Sleep(Duration),
}

/// Per-connection timeouts.
#[derive(Debug, Clone)]
pub struct ConnLimits {
    /// Deadline for reading the complete request (default: `5 seconds`)
    ///
    /// Starts before the first byte is read. When it expires, the connection
    /// is closed without a response.
    pub socket_read_timeout: Duration,

    /// Deadline for writing the response (default: `5 seconds`)
    pub socket_write_timeout: Duration,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ConnLimits {
    fn default() -> Self {
        Self {
            socket_read_timeout: Duration::from_secs(5),
            socket_write_timeout: Duration::from_secs(5),

            _priv: (),
        }
    }
}

/// Request parsing limits.
///
/// Exceeding any of them makes the request malformed, which closes the
/// connection without a response.
#[derive(Debug, Clone)]
pub struct ReqLimits {
    /// Maximum length of the status line or a header line, without the line
    /// terminator (default: `8 KB`)
    pub line_size: usize,

    /// Maximum number of header lines (default: `64`)
    ///
    /// Repeated names count once per line, even though only the last
    /// value is kept.
    pub header_count: usize,

    /// Maximum `Content-Length` accepted (default: `1 MB`)
    pub body_size: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ReqLimits {
    fn default() -> Self {
        Self {
            line_size: 8 * 1024,
            header_count: 64,
            body_size: 1024 * 1024,

            _priv: (),
        }
    }
}

/// Response encoding settings.
#[derive(Debug, Clone)]
pub struct RespLimits {
    /// gzip compression level, `0..=9` (default: `6`)
    pub compression_level: u32,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for RespLimits {
    fn default() -> Self {
        Self {
            compression_level: 6,

            _priv: (),
        }
    }
}

impl RespLimits {
    #[inline]
    pub(crate) fn compression(&self) -> flate2::Compression {
        flate2::Compression::new(self.compression_level.min(9))
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct AllLimits {
    pub(crate) server: ServerLimits,
    pub(crate) conn: ConnLimits,
    pub(crate) req: ReqLimits,
    pub(crate) resp: RespLimits,
}

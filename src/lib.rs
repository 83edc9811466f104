//! scratch_http - a small HTTP/1.1 server built from its parts
//!
//! One request per connection: the request is parsed, matched against an
//! ordered route table, handed to an async handler, compressed for the
//! encodings the client accepts and written back before the connection is
//! closed.
//!
//! # Pieces
//!
//! - [`Request::parse`] - status line, headers and a `Content-Length` body
//!   from any [`AsyncBufRead`](tokio::io::AsyncBufRead)
//! - [`Router`] - `/echo/{str}` style patterns, first registered match wins
//! - [`encode_response`] - `Accept-Encoding` negotiation (gzip)
//! - [`Response::to_bytes`] - the wire serializer
//! - [`Server`] - task per connection, or a bounded worker pool
//!
//! # Examples
//!
//! ```no_run
//! use scratch_http::{Method, Request, Response, Router, Server, StatusCode};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! async fn echo(req: Request, _: Arc<()>) -> Response {
//!     let text = req.param("str").unwrap_or_default().to_owned();
//!     Response::text(StatusCode::Ok, text)
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     Server::builder()
//!         .listener(TcpListener::bind("127.0.0.1:4221").await.unwrap())
//!         .router(Router::new().route(Method::Get, "/echo/{str}", echo))
//!         .context(())
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```
//!
//! Failure handling:
//!
//! - malformed or unreadable request - connection closed, nothing written
//! - no matching route - `404 Not Found` with no headers or body
//! - failed compression - that encoding is skipped
//! - handler failure - whatever status the handler returns, usually `500`

pub(crate) mod http {
    pub(crate) mod encoding;
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod router;
    pub(crate) mod server_impl;
}
pub mod app;
pub(crate) mod errors;
pub(crate) mod files;
pub mod limits;

pub use crate::{
    errors::{EncodingError, IoError, Malformed, ParseError},
    files::{FileError, FileStore, LocalFiles},
    http::{
        encoding::{encode_response, negotiate, Encoding},
        request::Request,
        response::Response,
        types::{Headers, Method, StatusCode, Version},
    },
    server::{
        router::{BoxFuture, Handler, Params, RouteMatch, RouteMiss, Router},
        server_impl::{bind, Server, ServerBuilder},
    },
};

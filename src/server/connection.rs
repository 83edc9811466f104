use crate::{
    errors::ParseError,
    http::{encoding::encode_response, request::Request, response::Response, types::Method},
    limits::{AllLimits, ConnLimits, ReqLimits, RespLimits},
    server::router::Router,
};
use std::{io, net::SocketAddr, sync::Arc, time::Instant};
use tokio::{
    io::{AsyncBufRead, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    time::timeout,
};
use tracing::{debug, info, warn};

/// Serves exactly one request per accepted stream:
/// parse, route, handle, encode, write, close.
pub(crate) struct HttpConnection<C> {
    router: Arc<Router<C>>,
    context: Arc<C>,

    conn_limits: ConnLimits,
    req_limits: ReqLimits,
    resp_limits: RespLimits,
}

impl<C: Send + Sync + 'static> HttpConnection<C> {
    #[inline]
    pub(crate) fn new(router: Arc<Router<C>>, context: Arc<C>, limits: &AllLimits) -> Self {
        Self {
            router,
            context,

            conn_limits: limits.conn.clone(),
            req_limits: limits.req.clone(),
            resp_limits: limits.resp.clone(),
        }
    }

    /// Runs the connection to completion.
    ///
    /// A request that cannot be parsed closes the stream without writing
    /// anything. Write and close failures are only logged.
    pub(crate) async fn run<S>(&self, stream: S, peer: SocketAddr)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let started = Instant::now();
        let (read_half, mut write_half) = tokio::io::split(stream);
        let mut reader = BufReader::with_capacity(self.req_limits.line_size.min(64 * 1024), read_half);

        let (summary, response) = match self.respond(&mut reader).await {
            Ok(value) => value,
            Err(err) if err.is_io() => {
                debug!(%peer, error = %err, "connection dropped before a full request");
                return;
            }
            Err(err) => {
                warn!(%peer, error = %err, "rejecting malformed request");
                return;
            }
        };

        let status = response.status();
        let bytes = response.to_bytes();

        if let Err(err) = self.write(&mut write_half, &bytes).await {
            debug!(%peer, error = %err, "failed to write response");
        }
        if let Err(err) = write_half.shutdown().await {
            debug!(%peer, error = %err, "failed to close connection");
        }

        info!(
            %peer,
            method = %summary.0,
            target = %summary.1,
            status = status.as_u16(),
            bytes = bytes.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "request served"
        );
    }

    /// Parses one request from `reader` and builds the encoded response.
    pub(crate) async fn respond<R>(&self, reader: &mut R) -> Result<(Summary, Response), ParseError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut request = timeout(
            self.conn_limits.socket_read_timeout,
            Request::parse(reader, &self.req_limits),
        )
        .await
        .map_err(io::Error::from)??;

        let summary = (request.method(), request.target().to_owned());
        let accept_encoding = request.header("accept-encoding").map(str::to_owned);

        let response = match self.router.find(request.method(), request.target()) {
            Ok(found) => {
                request.set_params(found.params);
                found.handler.call(request, self.context.clone()).await
            }
            Err(miss) => {
                debug!(method = %summary.0, target = %summary.1, reason = %miss, "no route");
                Response::not_found()
            }
        };

        let response = encode_response(
            response,
            accept_encoding.as_deref(),
            self.resp_limits.compression(),
        );

        Ok((summary, response))
    }

    #[inline]
    async fn write<W: AsyncWrite + Unpin>(&self, writer: &mut W, bytes: &[u8]) -> io::Result<()> {
        timeout(self.conn_limits.socket_write_timeout, async {
            writer.write_all(bytes).await?;
            writer.flush().await
        })
        .await?
    }
}

pub(crate) type Summary = (Method, String);

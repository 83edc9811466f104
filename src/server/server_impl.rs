use crate::{
    http::{response::Response, types::StatusCode},
    limits::{AllLimits, ConnLimits, ReqLimits, RespLimits, ServerLimits, WaitStrategy},
    server::{connection::HttpConnection, router::Router},
};
use crossbeam::queue::SegQueue;
use socket2::{Domain, Protocol, Socket, Type};
use std::{io, net::SocketAddr, sync::Arc};
use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    task::yield_now,
    time::{sleep as tokio_sleep, timeout},
};
use tracing::{debug, error, info, warn};

/// An HTTP server that accepts connections and answers one request on each.
///
/// # Examples
///
/// ```no_run
/// use scratch_http::{Method, Request, Response, Router, Server, StatusCode};
/// use std::sync::Arc;
/// use tokio::net::TcpListener;
///
/// async fn hello(_: Request, _: Arc<()>) -> Response {
///     Response::text(StatusCode::Ok, "Hello world!")
/// }
///
/// #[tokio::main]
/// async fn main() {
///     Server::builder()
///         .listener(TcpListener::bind("127.0.0.1:4221").await.unwrap())
///         .router(Router::new().route(Method::Get, "/", hello))
///         .context(())
///         .build()
///         .launch()
///         .await
/// }
/// ```
pub struct Server<C> {
    listener: TcpListener,
    connection: Arc<HttpConnection<C>>,
    pool: Option<Pool>,
}

struct Pool {
    streams: TcpQueue,
    overflow: TcpQueue,
    max_pending: usize,
}

impl<C: Send + Sync + 'static> Server<C> {
    /// Creates a new builder for configuring the server instance.
    #[inline]
    pub fn builder() -> ServerBuilder<C> {
        ServerBuilder {
            listener: None,
            router: None,
            context: None,

            server_limits: None,
            connection_limits: None,
            request_limits: None,
            response_limits: None,
        }
    }

    /// Local address the server accepts on.
    #[inline]
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever.
    ///
    /// An accept failure is logged and the loop keeps going.
    pub async fn launch(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, pooled = self.pool.is_some(), "server listening");
        }

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(value) => value,
                Err(err) => {
                    error!(error = %err, "failed to accept connection");
                    continue;
                }
            };
            debug!(%peer, "accepted connection");

            match &self.pool {
                Some(pool) if pool.streams.len() < pool.max_pending => {
                    pool.streams.push((stream, peer))
                }
                Some(pool) => pool.overflow.push((stream, peer)),
                None => {
                    let conn = self.connection.clone();
                    tokio::spawn(async move { conn.run(stream, peer).await });
                }
            }
        }
    }
}

//

/// Builder for configuring and creating [`Server`] instances.
///
/// `listener`, `router` and `context` are required; every limit falls back
/// to its `Default`.
pub struct ServerBuilder<C> {
    listener: Option<TcpListener>,
    router: Option<Router<C>>,
    context: Option<C>,

    server_limits: Option<ServerLimits>,
    connection_limits: Option<ConnLimits>,
    request_limits: Option<ReqLimits>,
    response_limits: Option<RespLimits>,
}

impl<C: Send + Sync + 'static> ServerBuilder<C> {
    /// Sets the TCP listener that the server will use to accept connections.
    ///
    /// **This is a required component.** See [`bind`] for a listener with
    /// `SO_REUSEADDR` and a custom backlog.
    #[inline(always)]
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets the route table. **This is a required component.**
    #[inline(always)]
    pub fn router(mut self, router: Router<C>) -> Self {
        self.router = Some(router);
        self
    }

    /// Sets the application context handed to every handler.
    /// **This is a required component.**
    #[inline(always)]
    pub fn context(mut self, context: C) -> Self {
        self.context = Some(context);
        self
    }

    /// Configures connection scheduling.
    ///
    /// ```no_run
    /// # use scratch_http::{app, Server, limits::ServerLimits};
    /// # use tokio::net::TcpListener;
    /// # #[tokio::main]
    /// # async fn main() {
    /// let server = Server::builder()
    ///     .listener(TcpListener::bind("127.0.0.1:4221").await.unwrap())
    ///     .router(app::router())
    ///     .context(app::Context::new("files"))
    ///     .server_limits(ServerLimits {
    ///         max_connections: Some(128),
    ///         max_pending_connections: 1024,
    ///         ..ServerLimits::default()
    ///     })
    ///     .build();
    /// # }
    /// ```
    #[inline(always)]
    pub fn server_limits(mut self, limits: ServerLimits) -> Self {
        self.server_limits = Some(limits);
        self
    }

    /// Configures socket timeouts.
    #[inline(always)]
    pub fn connection_limits(mut self, limits: ConnLimits) -> Self {
        self.connection_limits = Some(limits);
        self
    }

    /// Configures request parsing limits.
    #[inline(always)]
    pub fn request_limits(mut self, limits: ReqLimits) -> Self {
        self.request_limits = Some(limits);
        self
    }

    /// Configures response encoding.
    #[inline(always)]
    pub fn response_limits(mut self, limits: RespLimits) -> Self {
        self.response_limits = Some(limits);
        self
    }

    /// Finalizes the builder and constructs a [`Server`] instance.
    ///
    /// With [`ServerLimits::max_connections`] set, this spawns the worker
    /// tasks, so it must be called inside a Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when `listener`, `router` or `context` was not called.
    #[inline]
    #[track_caller]
    pub fn build(self) -> Server<C> {
        let (listener, router, context, limits) = self.get_all_parts();
        let connection = Arc::new(HttpConnection::new(Arc::new(router), Arc::new(context), &limits));

        let pool = limits.server.max_connections.map(|workers| {
            let streams = Arc::new(SegQueue::new());
            let overflow = Arc::new(SegQueue::new());

            for _ in 0..workers.max(1) {
                spawn_worker(&streams, &connection, &limits.server.wait_strategy);
            }
            spawn_alarmist(&overflow, &limits);

            Pool {
                streams,
                overflow,
                max_pending: limits.server.max_pending_connections,
            }
        });

        Server {
            listener,
            connection,
            pool,
        }
    }

    #[inline]
    #[track_caller]
    fn get_all_parts(self) -> (TcpListener, Router<C>, C, AllLimits) {
        (
            self.listener
                .expect("The `listener` method must be called to create"),
            self.router
                .expect("The `router` method must be called to create"),
            self.context
                .expect("The `context` method must be called to create"),
            AllLimits {
                server: self.server_limits.unwrap_or_default(),
                conn: self.connection_limits.unwrap_or_default(),
                req: self.request_limits.unwrap_or_default(),
                resp: self.response_limits.unwrap_or_default(),
            },
        )
    }
}

#[inline]
fn spawn_worker<C: Send + Sync + 'static>(
    queue: &TcpQueue,
    connection: &Arc<HttpConnection<C>>,
    wait: &WaitStrategy,
) {
    let queue = queue.clone();
    let connection = connection.clone();
    let wait = wait.clone();

    tokio::spawn(async move {
        loop {
            let (stream, peer) = get_stream(&queue, &wait).await;
            connection.run(stream, peer).await;
        }
    });
}

/// Answers queue overflow with `503 Service Unavailable`.
#[inline]
fn spawn_alarmist(queue: &TcpQueue, limits: &AllLimits) {
    let queue = queue.clone();
    let wait = limits.server.wait_strategy.clone();
    let write_timeout = limits.conn.socket_write_timeout;
    let busy = Response::new(StatusCode::ServiceUnavailable)
        .content_length()
        .to_bytes();

    tokio::spawn(async move {
        loop {
            let (mut stream, peer) = get_stream(&queue, &wait).await;
            warn!(%peer, "connection queue is full, answering 503");

            let sent = timeout(write_timeout, async {
                stream.write_all(&busy).await?;
                stream.shutdown().await
            })
            .await;

            if let Ok(Err(err)) | Err(err) = sent.map_err(io::Error::from) {
                debug!(%peer, error = %err, "failed to send 503");
            }
        }
    });
}

#[inline]
async fn get_stream(queue: &TcpQueue, wait: &WaitStrategy) -> (TcpStream, SocketAddr) {
    loop {
        if let Some(value) = queue.pop() {
            return value;
        }

        match wait {
            WaitStrategy::Yield => yield_now().await,
            WaitStrategy::Sleep(time) => tokio_sleep(*time).await,
        }
    }
}

/// Binds a listener with `SO_REUSEADDR` set and the given accept backlog.
///
/// Must be called inside a Tokio runtime.
pub fn bind(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    TcpListener::from_std(socket.into())
}

type TcpQueue = Arc<SegQueue<(TcpStream, SocketAddr)>>;

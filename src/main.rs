//! scratch_http: serves the echo, user-agent and file routes.
//!
//! # Usage
//!
//! ```text
//! scratch_http --directory /tmp/files --addr 0.0.0.0:4221
//! ```

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use scratch_http::{
    app, bind,
    limits::{ConnLimits, ServerLimits},
    Server,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "scratch_http", about = "Minimal HTTP/1.1 file and echo server")]
struct Cli {
    /// Directory served by `/files/{fileName}`.
    #[arg(long, default_value = ".")]
    directory: PathBuf,

    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:4221")]
    addr: SocketAddr,

    /// Seconds a client has to send its full request.
    #[arg(long, default_value = "5")]
    read_timeout_secs: u64,

    /// Serve with a fixed pool of this many workers instead of a task per
    /// connection.
    #[arg(long)]
    max_connections: Option<usize>,

    /// Accept backlog.
    #[arg(long, default_value = "1024")]
    backlog: i32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let listener = bind(cli.addr, cli.backlog)
        .with_context(|| format!("failed to bind {}", cli.addr))?;

    info!(
        addr = %cli.addr,
        directory = %cli.directory.display(),
        "starting server"
    );

    Server::builder()
        .listener(listener)
        .router(app::router())
        .context(app::Context::new(cli.directory))
        .server_limits(ServerLimits {
            max_connections: cli.max_connections,
            ..ServerLimits::default()
        })
        .connection_limits(ConnLimits {
            socket_read_timeout: Duration::from_secs(cli.read_timeout_secs),
            ..ConnLimits::default()
        })
        .build()
        .launch()
        .await;

    Ok(())
}

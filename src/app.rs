//! Routes served by the `scratch_http` binary.

use crate::{
    files::{FileError, FileStore, LocalFiles},
    http::{request::Request, response::Response, types::{Method, StatusCode}},
    server::router::Router,
};
use std::{path::PathBuf, sync::Arc};
use tracing::error;

/// Application state shared by every connection.
#[derive(Debug, Clone)]
pub struct Context {
    pub files: LocalFiles,
}

impl Context {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            files: LocalFiles::new(directory),
        }
    }
}

/// Route table of the application, in matching order.
pub fn router() -> Router<Context> {
    Router::new()
        .route(Method::Get, "/", index)
        .route(Method::Get, "/echo/{str}", echo)
        .route(Method::Get, "/user-agent", user_agent)
        .route(Method::Get, "/files/{fileName}", get_file)
        .route(Method::Post, "/files/{fileName}", post_file)
}

async fn index(_: Request, _: Arc<Context>) -> Response {
    Response::new(StatusCode::Ok)
}

async fn echo(req: Request, _: Arc<Context>) -> Response {
    let text = req.param("str").unwrap_or_default();
    Response::text(StatusCode::Ok, text)
}

async fn user_agent(req: Request, _: Arc<Context>) -> Response {
    let agent = req.header("user-agent").unwrap_or_default();
    Response::text(StatusCode::Ok, agent)
}

async fn get_file(req: Request, ctx: Arc<Context>) -> Response {
    let name = req.param("fileName").unwrap_or_default();

    match ctx.files.read_file(name).await {
        Ok(data) => Response::bytes(StatusCode::Ok, data),
        Err(FileError::NotFound) => Response::not_found(),
        Err(err) => {
            error!(file = name, error = %err, "failed to read file");
            Response::new(StatusCode::InternalServerError)
        }
    }
}

async fn post_file(req: Request, ctx: Arc<Context>) -> Response {
    let name = req.param("fileName").unwrap_or_default();

    if let Err(err) = ctx.files.ensure_directory().await {
        error!(dir = %ctx.files.root().display(), error = %err, "failed to create directory");
        return Response::new(StatusCode::InternalServerError);
    }

    match ctx.files.write_file(name, req.body()).await {
        Ok(()) => Response::new(StatusCode::Created),
        Err(err) => {
            error!(file = name, error = %err, "failed to write file");
            Response::new(StatusCode::InternalServerError)
        }
    }
}

//! Path-parameterized routing.

use crate::http::{request::Request, response::Response, types::Method};
use std::{future::Future, pin::Pin, sync::Arc};

/// Boxed future returned by a [`Handler`].
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// A trait for handling HTTP requests and generating responses.
///
/// `C` is the application context shared by every connection (for example
/// the directory served by the file handlers). It is read-only for the
/// lifetime of the server.
///
/// Any async function taking the request and the context implements it:
/// ```
/// use scratch_http::{Request, Response, Router, Method, StatusCode};
/// use std::sync::Arc;
///
/// struct Context {
///     greeting: String,
/// }
///
/// async fn hello(req: Request, ctx: Arc<Context>) -> Response {
///     let name = req.param("name").unwrap_or("world");
///     Response::text(StatusCode::Ok, format!("{}, {name}!", ctx.greeting))
/// }
///
/// let router = Router::new().route(Method::Get, "/hello/{name}", hello);
/// ```
pub trait Handler<C>: Send + Sync + 'static {
    /// Processes a routed request.
    ///
    /// Handlers report their own failures through the response status
    /// (usually [`InternalServerError`](crate::StatusCode::InternalServerError)).
    fn call(&self, request: Request, context: Arc<C>) -> BoxFuture;
}

impl<C, F, Fut> Handler<C> for F
where
    C: Send + Sync + 'static,
    F: Fn(Request, Arc<C>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    #[inline]
    fn call(&self, request: Request, context: Arc<C>) -> BoxFuture {
        Box::pin(self(request, context))
    }
}

// PARAMS

/// Path parameters bound while matching a route pattern.
///
/// Names are case-sensitive and follow the order of the pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    #[inline]
    fn bind(&mut self, name: &str, value: &str) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_owned(),
            None => self.entries.push((name.to_owned(), value.to_owned())),
        }
    }
}

// PATTERN

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Route pattern split on `/`. A segment written as `{name}` binds the
/// matching target segment to `name`; every other segment must match
/// exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    pub(crate) fn compile(source: &str) -> Self {
        let segments = source
            .split('/')
            .map(|seg| match seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => Segment::Param(name.to_owned()),
                None => Segment::Literal(seg.to_owned()),
            })
            .collect();

        Self {
            source: source.to_owned(),
            segments,
        }
    }

    pub(crate) fn matches(&self, target: &str) -> Option<Params> {
        if target.split('/').count() != self.segments.len() {
            return None;
        }

        let mut params = Params::default();

        for (pattern, value) in self.segments.iter().zip(target.split('/')) {
            match pattern {
                Segment::Literal(literal) if literal == value => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.bind(name, value),
            }
        }

        Some(params)
    }
}

// ROUTER

struct Route<C> {
    method: Method,
    pattern: Pattern,
    handler: Box<dyn Handler<C>>,
}

/// Ordered route table.
///
/// Routes are tried in registration order and the first one matching both
/// method and path wins. The table is built once, before the server starts,
/// and only read afterwards.
pub struct Router<C> {
    routes: Vec<Route<C>>,
}

/// Result of a successful lookup.
pub struct RouteMatch<'a, C> {
    pub handler: &'a dyn Handler<C>,
    pub params: Params,
    pub pattern: &'a str,
}

/// Why no route matched. Both cases are answered with `404 Not Found`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RouteMiss {
    #[error("no route registered for this method")]
    MethodNotRegistered,
    #[error("no route pattern matches this path")]
    PathNotFound,
}

impl<C: Send + Sync + 'static> Router<C> {
    #[inline]
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registers `handler` for `method` and `pattern`.
    ///
    /// Patterns registered earlier take priority over later ones.
    pub fn route<H: Handler<C>>(mut self, method: Method, pattern: &str, handler: H) -> Self {
        self.routes.push(Route {
            method,
            pattern: Pattern::compile(pattern),
            handler: Box::new(handler),
        });
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Finds the first route for `method` whose pattern matches `target`.
    pub fn find(&self, method: Method, target: &str) -> Result<RouteMatch<'_, C>, RouteMiss> {
        let mut candidates = self.routes.iter().filter(|r| r.method == method).peekable();

        if candidates.peek().is_none() {
            return Err(RouteMiss::MethodNotRegistered);
        }

        candidates
            .find_map(|route| {
                route.pattern.matches(target).map(|params| RouteMatch {
                    handler: route.handler.as_ref(),
                    params,
                    pattern: &route.pattern.source,
                })
            })
            .ok_or(RouteMiss::PathNotFound)
    }
}

impl<C: Send + Sync + 'static> Default for Router<C> {
    fn default() -> Self {
        Self::new()
    }
}

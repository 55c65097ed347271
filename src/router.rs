//! [`Route`](crate::Route) runs a handler only for requests that satisfy a condition.
//!
//! A route is built from a [`Condition`] and a [`Target`]. When the condition
//! matches, the route writes the condition's patch onto the request (the
//! unconsumed path and the accumulated path parameters), runs the target, and
//! puts the replaced fields back once the target has finished, whether it
//! answered, passed the request on, or failed. When the condition does not
//! match, the route passes the request on untouched.
//!
//! ```rust,no_run
//! use httproute::{handler_fn, Chain, Flow, RequestExt, Route};
//! use hyper::{Body, Response};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let user = handler_fn(|req| Box::pin(async move {
//!     let id = req.params().and_then(|p| p.get("id")).unwrap_or("?").to_owned();
//!     Ok(Flow::Done(Response::new(Body::from(format!("user {}", id)))))
//! }));
//!
//! let users = Chain::new().route("GET /:id", user)?;
//! let app = Chain::new().route("/users", users)?;
//!
//! hyper::Server::bind(&([127, 0, 0, 1], 3000).into())
//!     .serve(app.into_service())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Mounting rewrites the path seen by the target:
//! ```ignore
//!  Mount: /users          Request: /users/7/posts
//!
//!   path           "/7/posts"        restored to "/users/7/posts" afterwards
//!   original_path  "/users/7/posts"  set once, never restored
//!   params         {}                merged over the enclosing params, restored afterwards
//! ```
//!
//! A request that no route answers reaches the service's `not_found` handler,
//! or the default `404 Not Found` response.
use crate::condition::{Condition, Conditions, Match};
use crate::error::{BoxError, ConfigError};
use crate::handler::{Dispatch, Flow, Handler, HandlerFuture, Target};
use crate::overlay::{self, RequestExt};

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::{self, BoxFuture};
use hyper::header::{self, HeaderValue};
use hyper::service::Service;
use hyper::{Body, Method, Request, Response, StatusCode};
use tracing::{debug, error, trace};

/// A handler guarded by a condition.
///
/// Routes hold no per-request state and can serve any number of requests at
/// once.
#[derive(Clone)]
pub struct Route {
    conditions: Conditions,
    handler: Arc<dyn Handler>,
}

impl Route {
    /// Build a route, failing if the condition or the target is malformed.
    /// ```rust
    /// use httproute::{handler_fn, Flow, Route, Structured};
    ///
    /// let api = Route::new(
    ///     Structured::new().method("GET").mount("/api"),
    ///     handler_fn(|_| Box::pin(async { Ok(Flow::Next) })),
    /// );
    /// assert!(api.is_ok());
    ///
    /// let broken = Route::new("", handler_fn(|_| Box::pin(async { Ok(Flow::Next) })));
    /// assert!(broken.is_err());
    /// ```
    pub fn new(
        condition: impl Into<Condition>,
        target: impl Into<Target>,
    ) -> Result<Self, ConfigError> {
        let conditions = Conditions::parse(condition)?;
        let handler = target.into().adapt()?;
        Ok(Self {
            conditions,
            handler,
        })
    }

    /// Converts the `Route` into a `Service` which you can serve directly with `Hyper`.
    pub fn into_service(self) -> MakeRouteService {
        RouteService::new(self).into_make_service()
    }
}

/// Shorthand for [`Route::new`].
pub fn route(
    condition: impl Into<Condition>,
    target: impl Into<Target>,
) -> Result<Route, ConfigError> {
    Route::new(condition, target)
}

impl Handler for Route {
    fn handle<'a>(&'a self, req: &'a mut Request<Body>) -> HandlerFuture<'a> {
        Box::pin(async move {
            let patch = match self.conditions.evaluate(req) {
                Match::Matched(patch) => patch,
                Match::NoMatch => {
                    trace!(method = %req.method(), path = %req.path(), "route skipped");
                    return Ok(Flow::Next);
                }
            };

            debug!(
                method = %req.method(),
                path = %req.path(),
                rewritten = ?patch.path,
                "route matched"
            );

            let undo = overlay::apply(req, patch);
            let outcome = self.handler.handle(req).await;
            undo.restore(req);

            outcome
        })
    }
}

impl From<Route> for Target {
    fn from(route: Route) -> Self {
        Target::handler(route)
    }
}

/// An ordered list of handlers run one after another.
///
/// Each handler either answers the request, which ends the chain, or passes
/// it on with [`Flow::Next`]. An error ends the chain and is returned as is.
/// A chain that runs out of handlers passes the request on itself, so chains
/// nest inside routes and other chains.
#[derive(Clone, Default)]
pub struct Chain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler.
    pub fn with(mut self, handler: impl Handler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Append a [`Route`].
    pub fn route(
        self,
        condition: impl Into<Condition>,
        target: impl Into<Target>,
    ) -> Result<Self, ConfigError> {
        Ok(self.with(Route::new(condition, target)?))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Converts the `Chain` into a `Service` which you can serve directly with `Hyper`.
    pub fn into_service(self) -> MakeRouteService {
        RouteService::new(self).into_make_service()
    }
}

impl Dispatch for Chain {
    fn dispatch<'a>(&'a self, req: &'a mut Request<Body>) -> HandlerFuture<'a> {
        Box::pin(async move {
            for handler in &self.handlers {
                match handler.handle(req).await {
                    Ok(Flow::Next) => continue,
                    outcome => return outcome,
                }
            }
            Ok(Flow::Next)
        })
    }
}

impl Handler for Chain {
    fn handle<'a>(&'a self, req: &'a mut Request<Body>) -> HandlerFuture<'a> {
        self.dispatch(req)
    }
}

impl From<Chain> for Target {
    fn from(chain: Chain) -> Self {
        Target::dispatch(chain)
    }
}

/// The response sent when nothing answered a request.
///
/// `404 Not Found` as `text/plain`, with no body for `HEAD` requests.
pub fn not_found(method: &Method) -> Response<Body> {
    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        Body::from("Not Found")
    };

    let mut res = Response::new(body);
    *res.status_mut() = StatusCode::NOT_FOUND;
    res.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    res
}

pub type ResponseFut = BoxFuture<'static, Result<Response<Body>, BoxError>>;

/// Serves requests with a handler, answering whatever it passes on with a
/// not found response.
#[derive(Clone)]
pub struct RouteService {
    handler: Arc<dyn Handler>,
    not_found: Option<Arc<dyn Handler>>,
}

impl RouteService {
    pub fn new(handler: impl Handler + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
            not_found: None,
        }
    }

    /// Configurable handler which is called when no route answered the
    /// request. If it passes the request on as well, the default
    /// [`not_found`] response is sent.
    pub fn not_found(mut self, handler: impl Handler + 'static) -> Self {
        self.not_found = Some(Arc::new(handler));
        self
    }

    pub fn into_make_service(self) -> MakeRouteService {
        MakeRouteService(self)
    }

    /// Run a request through the handler and produce its response.
    /// ```rust
    /// use httproute::{handler_fn, Flow, Route, RouteService};
    /// use hyper::{Body, Request, StatusCode};
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let route = Route::new("/foo", handler_fn(|_| Box::pin(async { Ok(Flow::Next) }))).unwrap();
    /// let service = RouteService::new(route);
    ///
    /// let req = Request::get("/foo").body(Body::empty()).unwrap();
    /// let res = service.serve(req).await.unwrap();
    /// assert_eq!(res.status(), StatusCode::NOT_FOUND);
    /// # }
    /// ```
    pub fn serve(&self, mut req: Request<Body>) -> ResponseFut {
        let handler = Arc::clone(&self.handler);
        let fallback = self.not_found.clone();

        Box::pin(async move {
            let mut outcome = handler.handle(&mut req).await;

            if matches!(outcome, Ok(Flow::Next)) {
                if let Some(fallback) = &fallback {
                    outcome = fallback.handle(&mut req).await;
                }
            }

            match outcome {
                Ok(Flow::Done(res)) => Ok(res),
                Ok(Flow::Next) => {
                    debug!(method = %req.method(), path = %req.uri().path(), "no route answered");
                    Ok(not_found(req.method()))
                }
                Err(err) => {
                    error!(method = %req.method(), path = %req.uri().path(), error = %err, "handler failed");
                    Err(err)
                }
            }
        })
    }
}

impl Service<Request<Body>> for RouteService {
    type Response = Response<Body>;
    type Error = BoxError;
    type Future = ResponseFut;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        self.serve(req)
    }
}

#[doc(hidden)]
pub struct MakeRouteService(RouteService);

impl<T> Service<T> for MakeRouteService {
    type Response = RouteService;
    type Error = Infallible;
    type Future = future::Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _: T) -> Self::Future {
        future::ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_not_found() {
        let res = not_found(&Method::GET);
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "text/plain");
    }

    #[tokio::test]
    async fn head_not_found_has_no_body() {
        let body = hyper::body::to_bytes(not_found(&Method::HEAD).into_body())
            .await
            .unwrap();
        assert!(body.is_empty());

        let body = hyper::body::to_bytes(not_found(&Method::POST).into_body())
            .await
            .unwrap();
        assert_eq!(&body[..], b"Not Found");
    }

    #[test]
    fn chain_builders() {
        let chain = Chain::new()
            .route("GET", Chain::new())
            .unwrap()
            .with(Chain::new());
        assert_eq!(chain.len(), 2);
        assert!(!chain.is_empty());
        assert!(Chain::new().route("", Chain::new()).is_err());
    }
}

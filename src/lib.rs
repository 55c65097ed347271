//! # HttpRoute
//!
//! HttpRoute runs request handlers only when a request satisfies a condition, and
//! lets routers be mounted inside each other.
//!
//! A [`Route`] wraps a handler with a condition: a method, a mounted path prefix,
//! an exact path, a predicate, or any combination of those. When the condition
//! matches, the route rewrites the request's routing state before the handler
//! runs (the path still to be matched, and the path parameters captured so far)
//! and puts it back once the handler is done. A router mounted at `/api` therefore
//! only ever sees the part of the path after `/api`, and the handlers that come
//! after the route see the request exactly as it was.
//!
//! ## Features
//!
//! **Mounting:** A route mounted at `/users` matches `/users`, `/users/` and
//! `/users/7/posts`, but never `/usersx`. Inside, [`RequestExt::path`] reads
//! `/7/posts` and [`RequestExt::original_path`] reads `/users/7/posts`.
//!
//! **Parameters in your routing pattern:** Give a path segment a name with `:name`
//! and the value is delivered to you through [`RequestExt::params`]. Parameters
//! accumulate across nested routes; when two routes capture the same name the
//! inner one wins.
//!
//! **Nothing leaks:** Every field a route rewrote is restored when its handler
//! finishes, answers, or fails.
//!
//! **Mistakes fail early:** An empty condition, a bad method or a listener with
//! the wrong number of callbacks is a [`ConfigError`] when the route is built,
//! never while serving a request.
//!
//! ## Usage
//!
//! Here is a simple example:
//!
//! ```rust,no_run
//! use httproute::{handler_fn, Chain, Flow, RequestExt};
//! use hyper::{Body, Response};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let index = handler_fn(|_| Box::pin(async {
//!         Ok(Flow::Done(Response::new(Body::from("Hello, World!"))))
//!     }));
//!
//!     let hello = handler_fn(|req| Box::pin(async move {
//!         let user = req.params().and_then(|p| p.get("user")).unwrap_or_default().to_owned();
//!         Ok(Flow::Done(Response::new(Body::from(format!("Hello, {}", user)))))
//!     }));
//!
//!     let app = Chain::new()
//!         .route("GET /", index)?
//!         .route("GET /hello/:user", hello)?;
//!
//!     hyper::Server::bind(&([127, 0, 0, 1], 3000).into())
//!         .serve(app.into_service())
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Conditions
//!
//! ```ignore
//!  "GET"                                      any GET request
//!  "GET /hello/:user"                         GET with exactly this path
//!  "/api"                                     any request under /api
//!  Structured::new().method("POST").mount("/api")
//!  Condition::predicate(|req| req.headers().contains_key("x-admin"))
//!  vec![Condition::from("/api"), admin]       all of them
//! ```
//!
//! Named parameters only match a single path segment:
//!
//! ```ignore
//! Pattern: /user/:user
//!
//!  /user/gordon              match
//!  /user/you                 match
//!  /user/gordon/profile      no match (exact), match with rest "/profile" (mounted)
//!  /user/                    no match
//! ```
//!
//! ### Nesting
//!
//! A [`Chain`] is itself a route target, so routers nest:
//!
//! ```rust
//! use httproute::{handler_fn, Chain, Flow, RequestExt, Route, RouteService};
//! use hyper::{Body, Request, Response};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let show = handler_fn(|req| Box::pin(async move {
//!     let body = format!("{} {}", req.path(), req.original_path().unwrap_or_default());
//!     Ok(Flow::Done(Response::new(Body::from(body))))
//! }));
//!
//! let inner = Chain::new().route("/bar", show).unwrap();
//! let outer = Route::new("/foo", inner).unwrap();
//!
//! let req = Request::get("/foo/bar").body(Body::empty()).unwrap();
//! let res = RouteService::new(outer).serve(req).await.unwrap();
//! let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
//! assert_eq!(&body[..], b"/ /foo/bar");
//! # }
//! ```
//!
//! ### Not Found Handler
//!
//! Requests that no route answers get a `404 Not Found`. A custom handler can
//! be set with [`RouteService::not_found`].

#![forbid(unsafe_code)]

pub mod condition;
pub mod error;
pub mod handler;
pub mod overlay;
pub mod pattern;

#[doc(hidden)]
pub mod router;

#[doc(inline)]
pub use condition::{Condition, Match, Predicate, Structured, METHODS};

#[doc(inline)]
pub use error::{BoxError, ConfigError};

#[doc(inline)]
pub use handler::{handler_fn, Dispatch, Flow, Handler, HandlerFuture, Listener, Target};

#[doc(inline)]
pub use overlay::{Params, Patch, RequestExt};

#[doc(inline)]
pub use router::{not_found, route, Chain, Route, RouteService};

//! Handlers and the targets a [`Route`](crate::Route) can wrap.
use crate::error::{BoxError, ConfigError};
use crate::router::{MakeRouteService, RouteService};

use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use hyper::{Body, Request, Response};
use tracing::info;

/// How a handler finished with a request.
#[derive(Debug)]
pub enum Flow {
    /// Pass the request on to whatever comes next.
    Next,
    /// The request was answered.
    Done(Response<Body>),
}

/// The future returned by [`Handler::handle`].
///
/// Resolving the future is the handler's completion signal: `Ok(Flow::Next)`
/// continues, `Ok(Flow::Done(..))` answers and `Err(..)` hands an error back
/// to the caller.
pub type HandlerFuture<'a> = BoxFuture<'a, Result<Flow, BoxError>>;

/// Represents a request handler.
///
/// The handler borrows the request for as long as it runs, so changes it makes
/// are seen by the handlers after it.
/// ```rust
/// use httproute::{Flow, Handler, HandlerFuture};
/// use hyper::{Body, Request, Response};
///
/// struct Hello;
///
/// impl Handler for Hello {
///     fn handle<'a>(&'a self, _: &'a mut Request<Body>) -> HandlerFuture<'a> {
///         Box::pin(async { Ok(Flow::Done(Response::new(Body::from("hello")))) })
///     }
/// }
/// ```
pub trait Handler: Send + Sync {
    fn handle<'a>(&'a self, req: &'a mut Request<Body>) -> HandlerFuture<'a>;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn handle<'a>(&'a self, req: &'a mut Request<Body>) -> HandlerFuture<'a> {
        (**self).handle(req)
    }
}

/// A [`Handler`] made from a closure, see [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Build a handler from a closure returning a boxed future.
/// ```rust
/// use httproute::{handler_fn, Flow, RequestExt};
/// use hyper::{Body, Response};
///
/// let echo = handler_fn(|req| {
///     Box::pin(async move {
///         let body = Body::from(req.path().to_owned());
///         Ok(Flow::Done(Response::new(body)))
///     })
/// });
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Request<Body>) -> HandlerFuture<'a> + Send + Sync,
{
    HandlerFn { f }
}

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Request<Body>) -> HandlerFuture<'a> + Send + Sync,
{
    fn handle<'a>(&'a self, req: &'a mut Request<Body>) -> HandlerFuture<'a> {
        (self.f)(req)
    }
}

/// A composite of handlers, such as a nested [`Chain`](crate::Chain), that
/// runs a request through itself.
pub trait Dispatch: Send + Sync {
    fn dispatch<'a>(&'a self, req: &'a mut Request<Body>) -> HandlerFuture<'a>;
}

/// Calls a composite through its [`Dispatch`] capability.
struct Dispatcher(Arc<dyn Dispatch>);

impl Handler for Dispatcher {
    fn handle<'a>(&'a self, req: &'a mut Request<Body>) -> HandlerFuture<'a> {
        self.0.dispatch(req)
    }
}

/// A bound TCP listener with its request callbacks.
///
/// Served on its own it answers every connection with its single callback.
/// Given to a [`Route`](crate::Route) it is reduced to that callback and the
/// socket is closed.
pub struct Listener {
    socket: TcpListener,
    callbacks: Vec<Arc<dyn Handler>>,
}

impl Listener {
    /// Bind a listener to `addr`.
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Ok(Self {
            socket: TcpListener::bind(addr)?,
            callbacks: Vec::new(),
        })
    }

    /// Register a request callback.
    pub fn on_request(mut self, handler: impl Handler + 'static) -> Self {
        self.callbacks.push(Arc::new(handler));
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn into_callback(self) -> Result<Arc<dyn Handler>, ConfigError> {
        single(self.callbacks)
    }

    /// Serve connections with hyper until the server fails.
    /// ```rust,no_run
    /// use httproute::{Listener, Route, handler_fn, Flow};
    /// use hyper::{Body, Response};
    ///
    /// # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    /// let hello = Route::new("GET /", handler_fn(|_| Box::pin(async {
    ///     Ok(Flow::Done(Response::new(Body::from("Hello, World!"))))
    /// })))?;
    ///
    /// Listener::bind("127.0.0.1:3000")?.on_request(hello).serve().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn serve(self) -> Result<(), BoxError> {
        let addr = self.local_addr()?;
        let Listener { socket, callbacks } = self;
        let callback = single(callbacks)?;

        info!(%addr, "listening");

        let service: MakeRouteService = RouteService::new(callback).into_make_service();
        hyper::Server::from_tcp(socket)?.serve(service).await?;
        Ok(())
    }
}

fn single(mut callbacks: Vec<Arc<dyn Handler>>) -> Result<Arc<dyn Handler>, ConfigError> {
    if callbacks.len() != 1 {
        return Err(ConfigError::Listener {
            count: callbacks.len(),
        });
    }
    callbacks.pop().ok_or(ConfigError::Listener { count: 0 })
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("socket", &self.socket)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

/// Something a [`Route`](crate::Route) can run when its condition matches.
pub enum Target {
    /// A plain handler.
    Handler(Arc<dyn Handler>),
    /// A nested composite, called through [`Dispatch`].
    Dispatch(Arc<dyn Dispatch>),
    /// A listener with exactly one request callback.
    Listener(Listener),
}

impl Target {
    pub fn handler(handler: impl Handler + 'static) -> Self {
        Target::Handler(Arc::new(handler))
    }

    pub fn dispatch(composite: impl Dispatch + 'static) -> Self {
        Target::Dispatch(Arc::new(composite))
    }

    /// Resolve the target to a single handler.
    pub(crate) fn adapt(self) -> Result<Arc<dyn Handler>, ConfigError> {
        match self {
            Target::Handler(handler) => Ok(handler),
            Target::Dispatch(composite) => Ok(Arc::new(Dispatcher(composite))),
            Target::Listener(listener) => listener.into_callback(),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Handler(_) => f.write_str("Target::Handler"),
            Target::Dispatch(_) => f.write_str("Target::Dispatch"),
            Target::Listener(listener) => f.debug_tuple("Target::Listener").field(listener).finish(),
        }
    }
}

impl<F> From<HandlerFn<F>> for Target
where
    F: for<'a> Fn(&'a mut Request<Body>) -> HandlerFuture<'a> + Send + Sync + 'static,
{
    fn from(handler: HandlerFn<F>) -> Self {
        Target::handler(handler)
    }
}

impl From<Arc<dyn Handler>> for Target {
    fn from(handler: Arc<dyn Handler>) -> Self {
        Target::Handler(handler)
    }
}

impl From<Arc<dyn Dispatch>> for Target {
    fn from(composite: Arc<dyn Dispatch>) -> Self {
        Target::Dispatch(composite)
    }
}

impl From<Listener> for Target {
    fn from(listener: Listener) -> Self {
        Target::Listener(listener)
    }
}

//! Errors raised while building routes.

use thiserror::Error;

/// Boxed error produced by a handler and forwarded untouched through routes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A route that cannot be built.
///
/// These are returned when a [`Route`](crate::Route) is constructed, never while a
/// request is being dispatched: a malformed condition or handler target means the
/// program composing the routes is wrong.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A string condition was empty or only whitespace.
    #[error("condition string is empty")]
    EmptyCondition,

    /// A structured condition set none of `method`, `mount` or `path`.
    #[error("structured condition needs at least one of `method`, `mount` or `path`")]
    EmptyStructured,

    /// The method is not a valid HTTP method token.
    #[error("invalid method `{0}`")]
    InvalidMethod(String),

    /// The path template could not be compiled.
    #[error("invalid path template `{template}`: {source}")]
    InvalidPattern {
        template: String,
        #[source]
        source: regex::Error,
    },

    /// A listener used as a route target must have exactly one request callback.
    #[error("listener has {count} request callbacks, expected exactly one")]
    Listener { count: usize },
}

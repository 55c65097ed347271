//! Conditions deciding whether a [`Route`](crate::Route) applies to a request.
//!
//! A [`Condition`] is one of:
//! ```ignore
//!  Form                                Meaning
//!  "GET"                               method only, any path
//!  "GET /users/:id"                    method and exact path
//!  "/users"                            mounted path prefix
//!  Structured { method, mount, path }  any combination of the three
//!  Condition::predicate(f)             arbitrary test, may return a Patch
//!  vec![a, b, ..]                      every condition must match
//! ```
//!
//! Conditions are compiled once into [`Conditions`], a flat list of
//! evaluators. Evaluating it runs every evaluator and succeeds only if all of
//! them matched, merging their patches from left to right.
use crate::error::ConfigError;
use crate::overlay::{tag_original_path, Patch, RequestExt};
use crate::pattern::PathPattern;

use std::fmt;
use std::sync::Arc;

use hyper::{Body, Method, Request};

/// The HTTP methods accepted as a method-only string condition.
pub static METHODS: [Method; 8] = [
    Method::HEAD,
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
    Method::TRACE,
    Method::CONNECT,
];

/// Returns `true` if `token` names one of [`METHODS`]. Case-sensitive.
pub fn is_method(token: &str) -> bool {
    METHODS.iter().any(|method| method.as_str() == token)
}

/// The outcome of evaluating a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    NoMatch,
    Matched(Patch),
}

impl Match {
    pub fn is_match(&self) -> bool {
        matches!(self, Match::Matched(_))
    }
}

impl From<bool> for Match {
    fn from(matched: bool) -> Self {
        if matched {
            Match::Matched(Patch::default())
        } else {
            Match::NoMatch
        }
    }
}

impl From<Patch> for Match {
    fn from(patch: Patch) -> Self {
        Match::Matched(patch)
    }
}

impl From<Option<Patch>> for Match {
    fn from(patch: Option<Patch>) -> Self {
        patch.map_or(Match::NoMatch, Match::Matched)
    }
}

type PredicateFn = dyn Fn(&Request<Body>) -> Match + Send + Sync;

/// A user supplied condition function.
#[derive(Clone)]
pub struct Predicate(Arc<PredicateFn>);

impl Predicate {
    pub fn new<F, M>(f: F) -> Self
    where
        F: Fn(&Request<Body>) -> M + Send + Sync + 'static,
        M: Into<Match>,
    {
        Predicate(Arc::new(move |req: &Request<Body>| -> Match { f(req).into() }))
    }

    pub fn test(&self, req: &Request<Body>) -> Match {
        (self.0)(req)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// Method and path constraints; fields left unset impose nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Structured {
    /// Exact, case-sensitive method.
    pub method: Option<String>,
    /// Path prefix; the matched part is cut from the request path.
    pub mount: Option<String>,
    /// Whole path.
    pub path: Option<String>,
}

impl Structured {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn mount(mut self, template: impl Into<String>) -> Self {
        self.mount = Some(template.into());
        self
    }

    pub fn path(mut self, template: impl Into<String>) -> Self {
        self.path = Some(template.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.method.is_none() && self.mount.is_none() && self.path.is_none()
    }
}

/// A condition as written by the user, before compilation.
#[derive(Debug, Clone)]
pub enum Condition {
    Predicate(Predicate),
    Str(String),
    Structured(Structured),
    All(Vec<Condition>),
}

impl Condition {
    /// A condition backed by a function. The function may return a `bool`, a
    /// [`Patch`], an `Option<Patch>` or a [`Match`].
    /// ```rust
    /// use httproute::Condition;
    ///
    /// let admin = Condition::predicate(|req| req.headers().contains_key("x-admin"));
    /// ```
    pub fn predicate<F, M>(f: F) -> Self
    where
        F: Fn(&Request<Body>) -> M + Send + Sync + 'static,
        M: Into<Match>,
    {
        Condition::Predicate(Predicate::new(f))
    }
}

impl From<&str> for Condition {
    fn from(spec: &str) -> Self {
        Condition::Str(spec.to_owned())
    }
}

impl From<String> for Condition {
    fn from(spec: String) -> Self {
        Condition::Str(spec)
    }
}

impl From<Structured> for Condition {
    fn from(spec: Structured) -> Self {
        Condition::Structured(spec)
    }
}

impl From<Predicate> for Condition {
    fn from(predicate: Predicate) -> Self {
        Condition::Predicate(predicate)
    }
}

impl From<Vec<Condition>> for Condition {
    fn from(all: Vec<Condition>) -> Self {
        Condition::All(all)
    }
}

impl<const N: usize> From<[Condition; N]> for Condition {
    fn from(all: [Condition; N]) -> Self {
        Condition::All(all.into())
    }
}

/// Turn a string condition into its structured equivalent.
fn parse_str(spec: &str) -> Result<Structured, ConfigError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(ConfigError::EmptyCondition);
    }

    let structured = match spec.split_once(char::is_whitespace) {
        Some((method, path)) => Structured::new().method(method).path(path.trim_start()),
        None if is_method(spec) => Structured::new().method(spec),
        None => Structured::new().mount(spec),
    };

    Ok(structured)
}

#[derive(Debug, Clone)]
enum Evaluator {
    Method(Method),
    Path(PathPattern),
    Predicate(Predicate),
}

impl Evaluator {
    /// Any evaluator whose patch rewrites the path tags the request with its
    /// current path first, whether or not the whole condition matches.
    fn evaluate(&self, req: &mut Request<Body>) -> Match {
        let outcome = match self {
            Evaluator::Method(method) => (req.method() == method).into(),
            Evaluator::Path(pattern) => match pattern.matches(req.path()) {
                Some(m) => {
                    let mut params = req.params().cloned().unwrap_or_default();
                    params.extend(m.captures());
                    Match::Matched(Patch::new().path(m.rest()).params(params))
                }
                None => Match::NoMatch,
            },
            Evaluator::Predicate(predicate) => predicate.test(req),
        };

        if let Match::Matched(Patch { path: Some(_), .. }) = &outcome {
            tag_original_path(req);
        }
        outcome
    }
}

/// A compiled condition.
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    evaluators: Vec<Evaluator>,
}

impl Conditions {
    /// Compile a condition.
    ///
    /// Structured conditions produce their evaluators in the order method,
    /// mount, path, so on a collision the exact path's patch wins over the
    /// mount's.
    pub fn parse(condition: impl Into<Condition>) -> Result<Self, ConfigError> {
        let mut evaluators = Vec::new();
        compile(condition.into(), &mut evaluators)?;
        Ok(Self { evaluators })
    }

    /// Number of primitive evaluators.
    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }

    /// Evaluate every condition against `req`.
    ///
    /// All evaluators run even after one of them missed, so their side
    /// effects on the request (the `original_path` tag) are the same whatever
    /// the order. Patches of matching evaluators are discarded on a miss.
    pub fn evaluate(&self, req: &mut Request<Body>) -> Match {
        let mut matched = true;
        let mut patch = Patch::new();

        for evaluator in &self.evaluators {
            match evaluator.evaluate(req) {
                Match::Matched(next) => patch.merge(next),
                Match::NoMatch => matched = false,
            }
        }

        if matched {
            Match::Matched(patch)
        } else {
            Match::NoMatch
        }
    }
}

fn compile(condition: Condition, out: &mut Vec<Evaluator>) -> Result<(), ConfigError> {
    match condition {
        Condition::Predicate(predicate) => out.push(Evaluator::Predicate(predicate)),
        Condition::Str(spec) => compile_structured(parse_str(&spec)?, out)?,
        Condition::Structured(spec) => compile_structured(spec, out)?,
        Condition::All(all) => {
            for condition in all {
                compile(condition, out)?;
            }
        }
    }
    Ok(())
}

fn compile_structured(spec: Structured, out: &mut Vec<Evaluator>) -> Result<(), ConfigError> {
    if spec.is_empty() {
        return Err(ConfigError::EmptyStructured);
    }

    if let Some(method) = spec.method {
        let parsed =
            Method::from_bytes(method.as_bytes()).map_err(|_| ConfigError::InvalidMethod(method))?;
        out.push(Evaluator::Method(parsed));
    }
    if let Some(mount) = spec.mount {
        out.push(Evaluator::Path(PathPattern::mount(&mount)?));
    }
    if let Some(path) = spec.path {
        out.push(Evaluator::Path(PathPattern::exact(&path)?));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::Params;

    fn request(method: Method, path: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap()
    }

    fn patch_of(conditions: &Conditions, req: &mut Request<Body>) -> Option<Patch> {
        match conditions.evaluate(req) {
            Match::Matched(patch) => Some(patch),
            Match::NoMatch => None,
        }
    }

    #[test]
    fn method_table() {
        for method in ["HEAD", "GET", "POST", "PUT", "DELETE", "OPTIONS", "TRACE", "CONNECT"] {
            assert!(is_method(method), "{}", method);
        }
        assert!(!is_method("PATCH"));
        assert!(!is_method("get"));
    }

    #[test]
    fn method_only_string() {
        let conditions = Conditions::parse("GET").unwrap();
        assert_eq!(conditions.len(), 1);

        let patch = patch_of(&conditions, &mut request(Method::GET, "/anything")).unwrap();
        assert!(patch.is_empty());
        assert!(patch_of(&conditions, &mut request(Method::GET, "/")).is_some());
        assert!(patch_of(&conditions, &mut request(Method::POST, "/")).is_none());
    }

    #[test]
    fn method_and_exact_path_string() {
        let conditions = Conditions::parse("PUT  /users/:id").unwrap();
        assert_eq!(conditions.len(), 2);

        let patch = patch_of(&conditions, &mut request(Method::PUT, "/users/3")).unwrap();
        assert_eq!(patch.path.as_deref(), Some("/"));
        assert_eq!(patch.params.unwrap().get("id"), Some("3"));

        assert!(patch_of(&conditions, &mut request(Method::PUT, "/users/3/x")).is_none());
        assert!(patch_of(&conditions, &mut request(Method::GET, "/users/3")).is_none());
    }

    #[test]
    fn single_non_method_token_is_a_mount() {
        let conditions = Conditions::parse("/foo").unwrap();
        let patch = patch_of(&conditions, &mut request(Method::DELETE, "/foo/bar")).unwrap();
        assert_eq!(patch.path.as_deref(), Some("/bar"));
        assert!(patch.params.unwrap().is_empty());

        // not a recognised method, so it is treated as the path "/PATCH"
        let conditions = Conditions::parse("PATCH").unwrap();
        assert!(patch_of(&conditions, &mut request(Method::PATCH, "/")).is_none());
        assert!(patch_of(&conditions, &mut request(Method::GET, "/PATCH/x")).is_some());
    }

    #[test]
    fn method_match_is_case_sensitive() {
        let conditions = Conditions::parse(Structured::new().method("get")).unwrap();
        assert!(patch_of(&conditions, &mut request(Method::GET, "/")).is_none());
    }

    #[test]
    fn rejects_empty_specs() {
        assert!(matches!(
            Conditions::parse(""),
            Err(ConfigError::EmptyCondition)
        ));
        assert!(matches!(
            Conditions::parse("   "),
            Err(ConfigError::EmptyCondition)
        ));
        assert!(matches!(
            Conditions::parse(Structured::new()),
            Err(ConfigError::EmptyStructured)
        ));
        assert!(matches!(
            Conditions::parse(Structured::new().method("BAD METHOD")),
            Err(ConfigError::InvalidMethod(_))
        ));
        assert!(matches!(
            Conditions::parse(vec![Condition::from("GET"), Condition::from("")]),
            Err(ConfigError::EmptyCondition)
        ));
    }

    #[test]
    fn structured_path_overrides_mount() {
        let conditions = Conditions::parse(
            Structured::new()
                .method("GET")
                .mount("/a/:id")
                .path("/a/:id/b"),
        )
        .unwrap();
        assert_eq!(conditions.len(), 3);

        let patch = patch_of(&conditions, &mut request(Method::GET, "/a/1/b")).unwrap();
        assert_eq!(patch.path.as_deref(), Some("/"));
        assert_eq!(patch.params.unwrap().get("id"), Some("1"));
    }

    #[test]
    fn params_merge_over_current_params() {
        let conditions = Conditions::parse("/users/:id/:key/:id").unwrap();
        let mut req = request(Method::GET, "/users/1/address/2");
        crate::overlay::with_state(&mut req, |state| {
            state.params = Some([("org", "acme"), ("id", "0")].into_iter().collect::<Params>());
        });

        let params = patch_of(&conditions, &mut req).unwrap().params.unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params.get("org"), Some("acme"));
        assert_eq!(params.get("id"), Some("2"));
        assert_eq!(params.get("key"), Some("address"));
    }

    #[test]
    fn predicate_return_forms() {
        let yes = Conditions::parse(Condition::predicate(|_| true)).unwrap();
        let no = Conditions::parse(Condition::predicate(|_| false)).unwrap();
        let with_patch = Conditions::parse(Condition::predicate(|req: &Request<Body>| {
            req.headers()
                .get("x-user")
                .and_then(|value| value.to_str().ok())
                .map(|user| Patch::new().var("user", user))
        }))
        .unwrap();

        let mut req = request(Method::GET, "/");
        assert_eq!(patch_of(&yes, &mut req), Some(Patch::new()));
        assert_eq!(patch_of(&no, &mut req), None);
        assert_eq!(patch_of(&with_patch, &mut req), None);

        req.headers_mut().insert("x-user", "ann".parse().unwrap());
        let patch = patch_of(&with_patch, &mut req).unwrap();
        assert_eq!(patch.vars.get("user").map(String::as_str), Some("ann"));
    }

    #[test]
    fn composite_merges_left_to_right() {
        let conditions = Conditions::parse(vec![
            Condition::predicate(|_| Patch::new().var("role", "guest").var("a", "1")),
            Condition::from("/foo"),
            Condition::predicate(|_| Patch::new().var("role", "admin")),
        ])
        .unwrap();

        let patch = patch_of(&conditions, &mut request(Method::GET, "/foo/bar")).unwrap();
        assert_eq!(patch.vars.get("role").map(String::as_str), Some("admin"));
        assert_eq!(patch.vars.get("a").map(String::as_str), Some("1"));
        assert_eq!(patch.path.as_deref(), Some("/bar"));
    }

    #[test]
    fn every_evaluator_runs_after_a_miss() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let conditions = Conditions::parse(vec![
            Condition::from("POST"),
            Condition::from("/foo"),
            Condition::predicate(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }),
        ])
        .unwrap();

        let mut req = request(Method::GET, "/foo/bar");
        assert_eq!(conditions.evaluate(&mut req), Match::NoMatch);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // the mount evaluator matched and tagged the request even though the
        // condition as a whole did not
        assert_eq!(req.original_path(), Some("/foo/bar"));
        assert_eq!(req.path(), "/foo/bar");
        assert!(req.params().is_none());
    }

    #[test]
    fn predicate_path_rewrite_tags_original_path() {
        let conditions =
            Conditions::parse(Condition::predicate(|_| Patch::new().path("/v2/users"))).unwrap();

        let mut req = request(Method::GET, "/users");
        let patch = patch_of(&conditions, &mut req).unwrap();
        assert_eq!(patch.path.as_deref(), Some("/v2/users"));
        assert_eq!(req.original_path(), Some("/users"));

        let vars_only =
            Conditions::parse(Condition::predicate(|_| Patch::new().var("a", "1"))).unwrap();
        let mut req = request(Method::GET, "/users");
        assert!(patch_of(&vars_only, &mut req).is_some());
        assert_eq!(req.original_path(), None);
    }

    #[test]
    fn empty_composite_always_matches() {
        let conditions = Conditions::parse(Vec::<Condition>::new()).unwrap();
        assert!(conditions.is_empty());
        assert!(conditions.evaluate(&mut request(Method::GET, "/x")).is_match());
    }
}

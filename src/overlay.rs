//! Per-request routing state and the overlay applied around a matched handler.
//!
//! Routing fields are kept in a [`RouteState`] stored in the request's
//! extensions, and read through [`RequestExt`]. A matched route writes a
//! [`Patch`] over those fields with [`apply`], which hands back an [`Undo`]
//! holding exactly the values the patch replaced. Consuming the `Undo` with
//! [`Undo::restore`] puts them back, whatever the handler did to those fields
//! in between.
//!
//! The one-time `original_path` tag is not part of any patch, so it stays
//! visible after the route has finished.
use hyper::{Body, Request};

use std::collections::{hash_map, BTreeMap, HashMap};

/// Path parameters collected from every enclosing route.
///
/// Keys are unique; inserting an existing key replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    map: HashMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of the parameter `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.map.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Params {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        params.extend(iter);
        params
    }
}

impl IntoIterator for Params {
    type Item = (String, String);
    type IntoIter = hash_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.into_iter()
    }
}

/// Routing fields attached to a request.
///
/// `None` means the field is absent. An absent `path` reads as the request
/// URI's path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteState {
    pub path: Option<String>,
    pub original_path: Option<String>,
    pub params: Option<Params>,
    pub vars: HashMap<String, String>,
}

/// Routing accessors for [`hyper::Request`].
pub trait RequestExt {
    /// The path not yet consumed by enclosing mounts.
    fn path(&self) -> &str;

    /// The full path, recorded the first time a route rewrote [`path`](RequestExt::path).
    fn original_path(&self) -> Option<&str>;

    /// Parameters captured by enclosing routes, absent until a path condition matched.
    fn params(&self) -> Option<&Params>;

    /// A named field set by a predicate condition's patch.
    fn var(&self, name: &str) -> Option<&str>;
}

impl RequestExt for Request<Body> {
    fn path(&self) -> &str {
        match self.extensions().get::<RouteState>() {
            Some(RouteState { path: Some(path), .. }) => path.as_str(),
            _ => self.uri().path(),
        }
    }

    fn original_path(&self) -> Option<&str> {
        self.extensions()
            .get::<RouteState>()
            .and_then(|state| state.original_path.as_deref())
    }

    fn params(&self) -> Option<&Params> {
        self.extensions()
            .get::<RouteState>()
            .and_then(|state| state.params.as_ref())
    }

    fn var(&self, name: &str) -> Option<&str> {
        self.extensions()
            .get::<RouteState>()
            .and_then(|state| state.vars.get(name))
            .map(String::as_str)
    }
}

/// Run `f` against the request's route state, creating it if needed.
pub(crate) fn with_state<R>(req: &mut Request<Body>, f: impl FnOnce(&mut RouteState) -> R) -> R {
    let mut state = req
        .extensions_mut()
        .remove::<RouteState>()
        .unwrap_or_default();
    let out = f(&mut state);
    req.extensions_mut().insert(state);
    out
}

/// Record the current path as the original path, unless one is already recorded.
pub(crate) fn tag_original_path(req: &mut Request<Body>) {
    if req.original_path().is_some() {
        return;
    }
    let path = req.path().to_owned();
    with_state(req, |state| state.original_path = Some(path));
}

/// New values for routing fields. Fields left as `None` (or vars not listed)
/// are not touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    pub path: Option<String>,
    pub params: Option<Params>,
    pub vars: BTreeMap<String, String>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.params.is_none() && self.vars.is_empty()
    }

    /// Overlay `other` on top of `self`; `other` wins on every field it sets.
    pub fn merge(&mut self, other: Patch) {
        if other.path.is_some() {
            self.path = other.path;
        }
        if other.params.is_some() {
            self.params = other.params;
        }
        self.vars.extend(other.vars);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot<T> {
    Untouched,
    Saved(Option<T>),
}

/// The values a [`Patch`] replaced, limited to the fields it named.
///
/// Restoring consumes the token, so a snapshot is put back at most once.
#[must_use = "dropping an Undo leaves the patched fields in place"]
#[derive(Debug, PartialEq, Eq)]
pub struct Undo {
    path: Slot<String>,
    params: Slot<Params>,
    vars: Vec<(String, Option<String>)>,
}

/// Record the current value of every field `patch` names. Absent fields are
/// recorded as absent.
pub fn snapshot(req: &Request<Body>, patch: &Patch) -> Undo {
    let state = req.extensions().get::<RouteState>();

    let path = match patch.path {
        Some(_) => Slot::Saved(state.and_then(|state| state.path.clone())),
        None => Slot::Untouched,
    };
    let params = match patch.params {
        Some(_) => Slot::Saved(state.and_then(|state| state.params.clone())),
        None => Slot::Untouched,
    };
    let vars = patch
        .vars
        .keys()
        .map(|name| {
            let old = state.and_then(|state| state.vars.get(name).cloned());
            (name.clone(), old)
        })
        .collect();

    Undo { path, params, vars }
}

/// Snapshot the fields named by `patch`, then write the patch over them.
pub fn apply(req: &mut Request<Body>, patch: Patch) -> Undo {
    let undo = snapshot(req, &patch);

    with_state(req, |state| {
        if let Some(path) = patch.path {
            state.path = Some(path);
        }
        if let Some(params) = patch.params {
            state.params = Some(params);
        }
        state.vars.extend(patch.vars);
    });

    undo
}

impl Undo {
    /// Put the snapshotted values back, removing fields that were absent.
    pub fn restore(self, req: &mut Request<Body>) {
        with_state(req, |state| {
            if let Slot::Saved(path) = self.path {
                state.path = path;
            }
            if let Slot::Saved(params) = self.params {
                state.params = params;
            }
            for (name, old) in self.vars {
                match old {
                    Some(value) => {
                        state.vars.insert(name, value);
                    }
                    None => {
                        state.vars.remove(&name);
                    }
                }
            }
        });
    }
}

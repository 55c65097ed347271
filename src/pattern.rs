//! Path templates compiled into prefix or exact matchers.
//!
//! A template is a `/`-separated path in which a segment of the form `:name`
//! captures one non-empty path segment:
//! ```ignore
//!  Syntax    Type
//!  :name     named parameter
//! ```
//!
//! Named parameters match anything until the next '/' or the path end:
//! ```ignore
//!  Template: /blog/:category/:post
//! ```
//!
//! Exact requests:
//! ```ignore
//!   /blog/rust/request-routers            match: category="rust", post="request-routers"
//!   /blog/rust/                           no match
//!   /blog/rust/request-routers/comments   no match
//! ```
//!
//! Mounted (prefix) requests:
//! ```ignore
//!   /blog/rust/request-routers            match, rest="/"
//!   /blog/rust/request-routers/comments   match, rest="/comments"
//!   /blog/rust/request-routers-2          match: post="request-routers-2", rest="/"
//! ```
//!
//! A prefix only matches on a segment boundary, so `/foo` mounted does not
//! match `/foobar`. Exact templates keep a trailing slash (`/foo/` matches
//! only `/foo/`), while mounts drop it. A template may repeat a parameter name; when the captures
//! are merged into a parameter map the last occurrence wins.
use crate::error::ConfigError;

use regex::Regex;

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    regex: Regex,
    names: Vec<String>,
    exact: bool,
}

impl PathPattern {
    /// Compile a template that matches a prefix of the path, as used by mounts.
    /// ```rust
    /// use httproute::pattern::PathPattern;
    ///
    /// let pattern = PathPattern::mount("/users/:id").unwrap();
    /// let m = pattern.matches("/users/7/posts").unwrap();
    /// assert_eq!(m.rest(), "/posts");
    /// assert_eq!(m.captures().collect::<Vec<_>>(), vec![("id", "7")]);
    /// ```
    pub fn mount(template: &str) -> Result<Self, ConfigError> {
        Self::compile(template, false)
    }

    /// Compile a template that must match the whole path.
    pub fn exact(template: &str) -> Result<Self, ConfigError> {
        Self::compile(template, true)
    }

    fn compile(template: &str, exact: bool) -> Result<Self, ConfigError> {
        let normalized = if template.starts_with('/') {
            template.to_owned()
        } else {
            format!("/{}", template)
        };

        // a mount ignores trailing slashes; an exact template keeps them, except
        // for the bare root. An empty body prefixes every path.
        let body = if exact && normalized != "/" {
            normalized.as_str()
        } else {
            normalized.trim_end_matches('/')
        };

        let mut source = String::with_capacity(body.len() + 8);
        source.push('^');
        let mut names = Vec::with_capacity(body.matches(':').count());

        for segment in body.split('/').skip(1) {
            source.push('/');
            match segment.strip_prefix(':') {
                Some(name) if !name.is_empty() => {
                    source.push_str("([^/]+)");
                    names.push(name.to_owned());
                }
                _ => source.push_str(&regex::escape(segment)),
            }
        }

        if exact {
            if body.is_empty() {
                source.push('/');
            }
            source.push('$');
        }

        let regex = Regex::new(&source).map_err(|source| ConfigError::InvalidPattern {
            template: template.to_owned(),
            source,
        })?;

        Ok(Self {
            template: normalized,
            regex,
            names,
            exact,
        })
    }

    /// The normalized template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names in template order, repeats included.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// Match `path` against this pattern.
    ///
    /// Returns `None` when the path does not match, or when a prefix match ends
    /// in the middle of a segment.
    pub fn matches<'a>(&'a self, path: &'a str) -> Option<PathMatch<'a>> {
        let captures = self.regex.captures(path)?;
        let len = captures.get(0)?.end();

        let rest = match &path[len..] {
            "" => "/",
            rest if rest.starts_with('/') => rest,
            _ => return None,
        };

        let values = captures
            .iter()
            .skip(1)
            .map(|value| value.map_or("", |value| value.as_str()))
            .collect();

        Some(PathMatch {
            len,
            rest,
            names: &self.names,
            values,
        })
    }
}

/// The result of a successful [`PathPattern::matches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch<'a> {
    len: usize,
    rest: &'a str,
    names: &'a [String],
    values: Vec<&'a str>,
}

impl<'a> PathMatch<'a> {
    /// Length of the matched prefix.
    pub fn prefix_len(&self) -> usize {
        self.len
    }

    /// The unmatched remainder of the path, always starting with `/`.
    pub fn rest(&self) -> &'a str {
        self.rest
    }

    /// Captured values, aligned with [`PathPattern::names`].
    pub fn values(&self) -> &[&'a str] {
        &self.values
    }

    /// `(name, value)` pairs in template order.
    pub fn captures(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_missing_root() {
        let pattern = PathPattern::mount("foo").unwrap();
        assert_eq!(pattern.template(), "/foo");
        assert_eq!(pattern.matches("/foo/bar").unwrap().rest(), "/bar");
    }

    #[test]
    fn mount_requires_segment_boundary() {
        let pattern = PathPattern::mount("/foo").unwrap();

        let m = pattern.matches("/foo").unwrap();
        assert_eq!(m.prefix_len(), 4);
        assert_eq!(m.rest(), "/");

        assert_eq!(pattern.matches("/foo/").unwrap().rest(), "/");
        assert_eq!(pattern.matches("/foo/bar/baz").unwrap().rest(), "/bar/baz");
        assert!(pattern.matches("/foobar").is_none());
        assert!(pattern.matches("/bar/foo").is_none());
    }

    #[test]
    fn exact_anchors_the_end() {
        let pattern = PathPattern::exact("/foo").unwrap();
        assert!(pattern.is_exact());
        assert_eq!(pattern.matches("/foo").unwrap().rest(), "/");
        assert!(pattern.matches("/foo/bar").is_none());
        assert!(pattern.matches("/foobar").is_none());
    }

    #[test]
    fn exact_keeps_trailing_slash() {
        let pattern = PathPattern::exact("/users/").unwrap();
        assert_eq!(pattern.template(), "/users/");
        assert_eq!(pattern.matches("/users/").unwrap().rest(), "/");
        assert!(pattern.matches("/users").is_none());

        let pattern = PathPattern::exact("/users").unwrap();
        assert!(pattern.matches("/users/").is_none());

        // mounts ignore it either way
        let mount = PathPattern::mount("/users/").unwrap();
        assert_eq!(mount.matches("/users").unwrap().rest(), "/");
        assert_eq!(mount.matches("/users/7").unwrap().rest(), "/7");
    }

    #[test]
    fn root_template() {
        let mount = PathPattern::mount("").unwrap();
        assert_eq!(mount.template(), "/");
        assert_eq!(mount.matches("/").unwrap().rest(), "/");
        assert_eq!(mount.matches("/anything/else").unwrap().rest(), "/anything/else");

        let exact = PathPattern::exact("/").unwrap();
        assert!(exact.matches("/").is_some());
        assert!(exact.matches("/anything").is_none());
    }

    #[test]
    fn captures_named_segments() {
        let pattern = PathPattern::mount("/blog/:category/:post").unwrap();
        assert_eq!(pattern.names(), ["category", "post"]);

        let m = pattern.matches("/blog/rust/routers/comments").unwrap();
        assert_eq!(m.values(), ["rust", "routers"]);
        assert_eq!(m.rest(), "/comments");
        assert!(pattern.matches("/blog/rust").is_none());
        assert!(pattern.matches("/blog/rust/").is_none());
    }

    #[test]
    fn repeated_names_keep_every_capture() {
        let pattern = PathPattern::exact("/users/:id/:key/:id").unwrap();
        let m = pattern.matches("/users/1/address/2").unwrap();
        assert_eq!(
            m.captures().collect::<Vec<_>>(),
            vec![("id", "1"), ("key", "address"), ("id", "2")]
        );
    }

    #[test]
    fn literal_segments_are_escaped() {
        let pattern = PathPattern::exact("/files/a.b+c").unwrap();
        assert!(pattern.matches("/files/a.b+c").is_some());
        assert!(pattern.matches("/files/aXbbc").is_none());
    }

    #[test]
    fn bare_colon_is_literal() {
        let pattern = PathPattern::exact("/a/:").unwrap();
        assert!(pattern.names().is_empty());
        assert!(pattern.matches("/a/:").is_some());
        assert!(pattern.matches("/a/b").is_none());
    }
}

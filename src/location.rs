//! Navigation targets and their normalization.
//!
//! Callers describe where to go with a [`RawLocation`]: either a path string
//! (`"/users/42?tab=posts#top"`, `"../settings"`) or a structured
//! [`Location`] (named route, params-only, explicit query). Before matching,
//! [`normalize_location`] turns it into a canonical `{path, query, hash}`
//! triple relative to the current route.
//!
//! # Path normalization
//!
//! | Input | Base | Result |
//! |-------|------|--------|
//! | `/abs` | anything | `/abs` |
//! | `rel` | `/a/b` | `/a/rel` |
//! | `rel` (append) | `/a/b` | `/a/b/rel` |
//! | `../up` | `/a/b/c` | `/a/up` |
//! | `?q=1` | `/a` | `/a?q=1` before splitting |
//!
//! ```
//! use nav_transition::location::resolve_path;
//!
//! assert_eq!(resolve_path("c", "/a/b", false), "/a/c");
//! assert_eq!(resolve_path("c", "/a/b", true), "/a/b/c");
//! assert_eq!(resolve_path("../c", "/a/b/d", false), "/a/c");
//! ```

use crate::params::{fill_params, RouteParams};
use crate::query::{resolve_query, Query, QueryParser, QueryValue};
use crate::route::Route;
use crate::warn_log;
use std::fmt;

/// Structured navigation target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    /// Target route name; takes precedence over `path`.
    pub name: Option<String>,
    /// Target path, possibly relative and possibly carrying `?query#hash`.
    pub path: Option<String>,
    /// Hash fragment; empty when absent.
    pub hash: String,
    /// Explicit query, merged over any query embedded in `path`.
    pub query: Query,
    /// Params for named routes, or params-only navigation when `path` and
    /// `name` are both absent.
    pub params: Option<RouteParams>,
    /// Resolve a relative `path` under the current path instead of beside it.
    pub append: bool,
    /// When used as a guard redirect, replace instead of push.
    pub replace: bool,
    pub(crate) normalized: bool,
}

impl Location {
    /// Target a path.
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Target a named route.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Target the current route with changed params.
    pub fn params_only() -> Self {
        Self {
            params: Some(RouteParams::new()),
            ..Self::default()
        }
    }

    /// Add a param.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params
            .get_or_insert_with(RouteParams::new)
            .insert(key.into(), value.into());
        self
    }

    /// Add a query entry.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.insert(key, value);
        self
    }

    /// Set the hash fragment (with or without the leading `#`).
    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into();
        self
    }

    /// Resolve a relative path by appending to the current path.
    pub fn append(mut self) -> Self {
        self.append = true;
        self
    }

    /// Mark as replace-style when used as a redirect.
    pub fn replace(mut self) -> Self {
        self.replace = true;
        self
    }

    /// `true` once [`normalize_location`] has produced this value.
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{{name: {name}}}")
        } else {
            write!(
                f,
                "{}{}{}",
                self.path.as_deref().unwrap_or(""),
                self.query,
                self.hash
            )
        }
    }
}

/// Anything that can be navigated to.
#[derive(Debug, Clone, PartialEq)]
pub enum RawLocation {
    /// A path string, possibly relative, possibly carrying `?query#hash`.
    Path(String),
    /// A structured target.
    Location(Location),
}

impl RawLocation {
    /// `true` when a redirect to this target should replace the history entry.
    pub fn wants_replace(&self) -> bool {
        matches!(self, Self::Location(loc) if loc.replace)
    }
}

impl fmt::Display for RawLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.write_str(path),
            Self::Location(loc) => loc.fmt(f),
        }
    }
}

impl From<&str> for RawLocation {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for RawLocation {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<&String> for RawLocation {
    fn from(path: &String) -> Self {
        Self::Path(path.clone())
    }
}

impl From<Location> for RawLocation {
    fn from(loc: Location) -> Self {
        Self::Location(loc)
    }
}

/// A path split into its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedPath<'a> {
    /// Path without query or hash.
    pub path: &'a str,
    /// Query without the leading `?`.
    pub query: &'a str,
    /// Hash including the leading `#`, or empty.
    pub hash: &'a str,
}

/// Split `path` into path, query and hash.
pub fn parse_path(path: &str) -> ParsedPath<'_> {
    let (rest, hash) = match path.find('#') {
        Some(index) => path.split_at(index),
        None => (path, ""),
    };
    let (path, query) = match rest.find('?') {
        Some(index) => (&rest[..index], &rest[index + 1..]),
        None => (rest, ""),
    };
    ParsedPath { path, query, hash }
}

/// Resolve `relative` against `base`, honoring `.`, `..` and leading `/`.
pub fn resolve_path(relative: &str, base: &str, append: bool) -> String {
    if relative.starts_with('/') {
        return relative.to_string();
    }
    if relative.starts_with('?') || relative.starts_with('#') {
        return format!("{base}{relative}");
    }

    let mut stack: Vec<&str> = base.split('/').collect();
    // Drop the last base segment unless appending to a non-empty one.
    if !append || stack.last().is_some_and(|last| last.is_empty()) {
        stack.pop();
    }

    for segment in relative.trim_start_matches('/').split('/') {
        match segment {
            ".." => {
                stack.pop();
            }
            "." => {}
            _ => stack.push(segment),
        }
    }

    if stack.first() != Some(&"") {
        stack.insert(0, "");
    }
    stack.join("/")
}

/// Collapse doubled slashes.
pub fn clean_path(path: &str) -> String {
    let mut cleaned = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && cleaned.ends_with('/') {
            continue;
        }
        cleaned.push(c);
    }
    cleaned
}

/// Canonicalize `raw` relative to `current`.
///
/// Priority:
/// 1. Named or already-normalized locations are returned unchanged.
/// 2. Params-only locations merge onto `current.params`; a named current route
///    keeps its name, otherwise the last matched record's template is filled
///    (an empty path with a warning when params are missing).
/// 3. Everything else is split into path, query and hash, with the path
///    resolved against `current.path` and the explicit query winning over the
///    embedded one.
pub fn normalize_location(
    raw: &RawLocation,
    current: Option<&Route>,
    append: bool,
    parser: Option<&QueryParser>,
) -> Location {
    let next = match raw {
        RawLocation::Path(path) => Location::path(path.clone()),
        RawLocation::Location(loc) => loc.clone(),
    };

    if next.name.is_some() || next.normalized {
        return next;
    }

    if next.path.is_none() {
        if let (Some(params), Some(current)) = (&next.params, current) {
            return normalize_params_only(next.clone(), params, current);
        }
    }

    let raw_path = next.path.as_deref().unwrap_or("");
    let parsed = parse_path(raw_path);
    let base_path = current.map_or("/", |route| route.path.as_str());
    let path = if parsed.path.is_empty() {
        base_path.to_string()
    } else {
        resolve_path(parsed.path, base_path, append || next.append)
    };

    let query = resolve_query(parsed.query, &next.query, parser);

    let hash = if next.hash.is_empty() {
        parsed.hash
    } else {
        next.hash.as_str()
    };
    let hash = if hash.is_empty() || hash.starts_with('#') {
        hash.to_string()
    } else {
        format!("#{hash}")
    };

    Location {
        path: Some(path),
        query,
        hash,
        replace: next.replace,
        normalized: true,
        ..Location::default()
    }
}

fn normalize_params_only(mut next: Location, params: &RouteParams, current: &Route) -> Location {
    next.normalized = true;
    let merged = RouteParams::merge(&current.params, params);

    if let Some(name) = &current.name {
        next.name = Some(name.clone());
        next.params = Some(merged);
    } else if let Some(record) = current.matched.last() {
        next.path = Some(fill_params(&record.path, &merged).unwrap_or_else(|err| {
            warn_log!("{} (while resolving params for '{}')", err, current.path);
            String::new()
        }));
    } else {
        warn_log!("Params-only navigation from unmatched route '{}'", current.path);
    }

    next
}

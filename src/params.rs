//! Route parameters and path templating.
//!
//! [`RouteParams`] holds the values captured by dynamic segments (`:id` in
//! `/users/:id`). [`fill_params`] runs the other direction: it substitutes
//! params back into a record's path template, which the normalizer uses for
//! params-only navigation and the route table uses for named routes.
//!
//! # Template syntax
//!
//! | Segment | Meaning |
//! |---------|---------|
//! | `users` | literal |
//! | `:id` | required param |
//! | `:id?` | optional param, segment dropped when absent |
//! | `:id<u32>` | required param with a type hint (hint ignored here) |
//! | `*` | catch-all, captured as `pathMatch` |
//!
//! # Example
//!
//! ```
//! use nav_transition::{fill_params, RouteParams};
//!
//! let mut params = RouteParams::new();
//! params.insert("id".to_string(), "42".to_string());
//! assert_eq!(fill_params("/users/:id/:tab?", &params).unwrap(), "/users/42");
//! assert!(fill_params("/posts/:slug", &params).is_err());
//! ```

use crate::error::MissingParamError;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::borrow::Cow;
use std::collections::HashMap;

/// Param name used for the value captured by a `*` segment.
pub const CATCH_ALL_PARAM: &str = "pathMatch";

/// Characters escaped when a param value is written into a path: `encodeURI`
/// rules with `/`, `?` and `#` also escaped.
const PATH_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Catch-all values may span segments, so `/` stays literal.
const CATCH_ALL_VALUE: &AsciiSet = &PATH_VALUE.remove(b'/');

/// Values captured by the dynamic segments of a matched route.
///
/// ```
/// use nav_transition::RouteParams;
///
/// let params: RouteParams = [("id", "123"), ("tab", "posts")].into_iter().collect();
///
/// assert_eq!(params.get_as::<u32>("id"), Some(123));
/// assert_eq!(params.get("tab").map(String::as_str), Some("posts"));
/// assert!(params.get_as::<u32>("tab").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: HashMap<String, String>,
}

impl RouteParams {
    /// No params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a map of captured values.
    pub fn from_map(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Raw value of `key`.
    pub fn get(&self, key: &str) -> Option<&String> {
        self.params.get(key)
    }

    /// Value of `key` parsed as `T`; `None` when absent or unparsable.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.params.get(key)?.parse().ok()
    }

    /// Set `key`, replacing any previous value.
    pub fn insert(&mut self, key: String, value: String) {
        self.params.insert(key, value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Captured pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.params.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Merge `overrides` on top of `base`.
    ///
    /// Keys in `overrides` win on collision. Params-only navigation uses this
    /// to carry the current route's params forward.
    ///
    /// # Example
    ///
    /// ```
    /// use nav_transition::RouteParams;
    ///
    /// let base: RouteParams = [("org", "acme"), ("tab", "list")].into_iter().collect();
    /// let overrides: RouteParams = [("tab", "grid")].into_iter().collect();
    ///
    /// let merged = RouteParams::merge(&base, &overrides);
    /// assert_eq!(merged.get("org"), Some(&"acme".to_string()));
    /// assert_eq!(merged.get("tab"), Some(&"grid".to_string()));
    /// ```
    pub fn merge(base: &RouteParams, overrides: &RouteParams) -> RouteParams {
        let mut merged = base.clone();
        for (key, value) in overrides.iter() {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

impl<K, V> FromIterator<(K, V)> for RouteParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A parsed dynamic segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParamSegment<'a> {
    pub name: Cow<'a, str>,
    pub optional: bool,
}

/// Parse `segment` as a dynamic segment, if it is one.
///
/// `:id` → required `id`, `:id?` → optional `id`, `:id<i32>` → `id`,
/// `*` → required `pathMatch`.
pub(crate) fn parse_param_segment(segment: &str) -> Option<ParamSegment<'_>> {
    if segment == "*" {
        return Some(ParamSegment {
            name: Cow::Borrowed(CATCH_ALL_PARAM),
            optional: false,
        });
    }

    let name = segment.strip_prefix(':')?;
    let (name, optional) = match name.strip_suffix('?') {
        Some(stripped) => (stripped, true),
        None => (name, false),
    };
    let name = name.find('<').map_or(name, |pos| &name[..pos]);
    Some(ParamSegment {
        name: Cow::Borrowed(name),
        optional,
    })
}

/// Names of every dynamic segment in a path template, in order.
pub fn param_names(template: &str) -> Vec<String> {
    template
        .split('/')
        .filter_map(parse_param_segment)
        .map(|segment| segment.name.into_owned())
        .collect()
}

/// Substitute `params` into a path template.
///
/// Values are percent-encoded for use in a path. A missing optional param
/// drops its segment; a missing required param is a [`MissingParamError`].
pub fn fill_params(template: &str, params: &RouteParams) -> Result<String, MissingParamError> {
    let mut segments = Vec::new();

    for segment in template.split('/') {
        let Some(param) = parse_param_segment(segment) else {
            segments.push(segment.to_string());
            continue;
        };

        match params.get(&param.name) {
            Some(value) => {
                let set = if segment == "*" {
                    CATCH_ALL_VALUE
                } else {
                    PATH_VALUE
                };
                segments.push(utf8_percent_encode(value, set).to_string());
            }
            None if param.optional => {}
            None => {
                return Err(MissingParamError {
                    path: template.to_string(),
                    param: param.name.into_owned(),
                })
            }
        }
    }

    Ok(segments.join("/"))
}

// ============================================================================
// Tests
// ============================================================================

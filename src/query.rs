//! Query string codec.
//!
//! [`Query`] keeps keys in insertion order and stores each value as a
//! [`QueryValue`]: a bare key (`?flag`), a scalar (`?page=2`), or a list built
//! up when a key repeats (`?tag=a&tag=b`). A key that is absent from the map is
//! simply omitted when encoding.
//!
//! Encoding is URI-component percent-encoding with `! ' ( ) *` also escaped
//! and commas left literal, so list-like values such as `?ids=1,2,3` stay
//! compact.
//!
//! # Example
//!
//! ```
//! use nav_transition::query::{parse_query, stringify_query, QueryValue};
//!
//! let query = parse_query("?tag=a&tag=b&flag&q=hello+world").unwrap();
//! assert_eq!(query.get("q"), Some(&QueryValue::from("hello world")));
//! assert_eq!(query.get("flag"), Some(&QueryValue::Null));
//! assert_eq!(query.get_all("tag"), vec!["a", "b"]);
//!
//! assert_eq!(stringify_query(&query), "?tag=a&tag=b&flag&q=hello%20world");
//! ```

use crate::error::DecodeError;
use crate::warn_log;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;
use std::rc::Rc;

/// Characters escaped in a query component: everything but `A-Z a-z 0-9 - _ . ~`
/// and the comma.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b',');

/// Custom query string parser installed through
/// [`RouterBuilder::parse_query`](crate::RouterBuilder::parse_query).
pub type QueryParser = Rc<dyn Fn(&str) -> Result<Query, DecodeError>>;

/// Custom query serializer installed through
/// [`RouterBuilder::stringify_query`](crate::RouterBuilder::stringify_query).
/// The result must include the leading `?` when non-empty.
pub type QueryStringifier = Rc<dyn Fn(&Query) -> String>;

/// Value stored under one query key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// Key present without `=` (`?flag`).
    Null,
    /// Single `key=value`.
    Value(String),
    /// Repeated key; `None` elements are bare occurrences.
    List(Vec<Option<String>>),
}

impl QueryValue {
    /// First concrete value, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Null => None,
            Self::Value(v) => Some(v),
            Self::List(items) => items.iter().flatten().next().map(String::as_str),
        }
    }

    /// String form used for value equality: lists join with `,`, bare
    /// occurrences inside a list render empty.
    pub fn to_repr(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Value(v) => v.clone(),
            Self::List(items) => items
                .iter()
                .map(|item| item.as_deref().unwrap_or(""))
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Value equality: lists compare element-wise, everything else by string
    /// form.
    pub fn loosely_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::List(a), Self::List(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y),
            _ => self.to_repr() == other.to_repr(),
        }
    }

    fn push(&mut self, value: Option<String>) {
        let previous = std::mem::replace(self, Self::Null);
        *self = match previous {
            Self::Null => Self::List(vec![None, value]),
            Self::Value(v) => Self::List(vec![Some(v), value]),
            Self::List(mut items) => {
                items.push(value);
                Self::List(items)
            }
        };
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

impl From<Vec<&str>> for QueryValue {
    fn from(values: Vec<&str>) -> Self {
        Self::List(values.into_iter().map(|v| Some(v.to_string())).collect())
    }
}

/// Insertion-ordered query mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    entries: Vec<(String, QueryValue)>,
}

impl Query {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// All concrete values for `key`, in order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        match self.get(key) {
            Some(QueryValue::Value(v)) => vec![v.as_str()],
            Some(QueryValue::List(items)) => items.iter().flatten().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Insert or overwrite `key`, keeping its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// `true` if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy every entry of `other` over this query; `other` wins on collision.
    pub fn extend_from(&mut self, other: &Query) {
        for (key, value) in other.iter() {
            self.insert(key, value.clone());
        }
    }

    /// Value equality: same key count, and every key value-equal.
    pub fn loosely_equals(&self, other: &Query) -> bool {
        self.len() == other.len()
            && self.iter().all(|(key, value)| {
                other
                    .get(key)
                    .is_some_and(|theirs| value.loosely_equals(theirs))
            })
    }

    fn append(&mut self, key: String, value: Option<String>) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1.push(value);
        } else {
            let value = value.map_or(QueryValue::Null, QueryValue::Value);
            self.entries.push((key, value));
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Query::new();
        for (key, value) in iter {
            query.insert(key, value);
        }
        query
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&stringify_query(self))
    }
}

/// Percent-encode one query component.
pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, QUERY_COMPONENT).to_string()
}

/// Decode one percent-encoded component, rejecting malformed escapes.
pub fn decode_component(s: &str) -> Result<String, DecodeError> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let well_formed = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !well_formed {
                return Err(DecodeError {
                    input: s.to_string(),
                    reason: format!("malformed percent-escape at byte {i}"),
                });
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(s)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|err| DecodeError {
            input: s.to_string(),
            reason: err.to_string(),
        })
}

/// Parse a query string into a [`Query`].
///
/// A single leading `?`, `#` or `&` is ignored. `+` decodes to a space. The
/// first repeat of a key turns its scalar into a two-element list; later
/// repeats append.
pub fn parse_query(query: &str) -> Result<Query, DecodeError> {
    let mut result = Query::new();
    let trimmed = query.trim();
    let trimmed = trimmed
        .strip_prefix(['?', '#', '&'])
        .unwrap_or(trimmed);

    if trimmed.is_empty() {
        return Ok(result);
    }

    for param in trimmed.split('&').filter(|p| !p.is_empty()) {
        let param = param.replace('+', " ");
        let (key, value) = match param.split_once('=') {
            Some((key, value)) => (decode_component(key)?, Some(decode_component(value)?)),
            None => (decode_component(&param)?, None),
        };
        result.append(key, value);
    }

    Ok(result)
}

/// Serialize a [`Query`], prefixed with `?` when non-empty.
pub fn stringify_query(query: &Query) -> String {
    let segments: Vec<String> = query
        .iter()
        .map(|(key, value)| {
            let key = encode_component(key);
            match value {
                QueryValue::Null => key,
                QueryValue::Value(v) => format!("{key}={}", encode_component(v)),
                QueryValue::List(items) => items
                    .iter()
                    .map(|item| match item {
                        Some(v) => format!("{key}={}", encode_component(v)),
                        None => key.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join("&"),
            }
        })
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.is_empty() {
        String::new()
    } else {
        format!("?{}", segments.join("&"))
    }
}

/// Parse `query` (with `parser` or [`parse_query`]) and overlay `extra`.
///
/// A malformed query string is recovered as an empty query with a warning;
/// keys in `extra` win on collision.
pub fn resolve_query(query: &str, extra: &Query, parser: Option<&QueryParser>) -> Query {
    let parsed = match parser {
        Some(parse) => parse(query),
        None => parse_query(query),
    };

    let mut resolved = parsed.unwrap_or_else(|err| {
        warn_log!("{}; falling back to an empty query", err);
        Query::new()
    });
    resolved.extend_from(extra);
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_single_leading_marker() {
        for input in ["?a=1", "#a=1", "&a=1", "a=1"] {
            let query = parse_query(input).unwrap();
            assert_eq!(query.get("a"), Some(&QueryValue::from("1")), "{input}");
        }
        let query = parse_query("??a=1").unwrap();
        assert!(query.contains_key("?a"));
    }

    #[test]
    fn test_parse_escalates_repeated_keys() {
        let query = parse_query("k=1").unwrap();
        assert_eq!(query.get("k"), Some(&QueryValue::from("1")));

        let query = parse_query("k=1&k=2").unwrap();
        assert_eq!(
            query.get("k"),
            Some(&QueryValue::List(vec![Some("1".into()), Some("2".into())]))
        );

        let query = parse_query("k=1&k=2&k").unwrap();
        assert_eq!(
            query.get("k"),
            Some(&QueryValue::List(vec![
                Some("1".into()),
                Some("2".into()),
                None
            ]))
        );
    }

    #[test]
    fn test_parse_value_keeps_later_equals() {
        let query = parse_query("expr=a=b").unwrap();
        assert_eq!(query.get("expr"), Some(&QueryValue::from("a=b")));
    }

    #[test]
    fn test_parse_rejects_malformed_escape() {
        assert!(parse_query("a=%zz").is_err());
        assert!(parse_query("a=%2").is_err());
        assert!(parse_query("%=1").is_err());
        assert!(parse_query("a=%FF").is_err());
    }

    #[test]
    fn test_stringify_shapes() {
        let mut query = Query::new();
        query.insert("a", "1");
        query.insert("flag", QueryValue::Null);
        query.insert("list", QueryValue::List(vec![Some("x".into()), None]));
        query.insert("empty", QueryValue::List(vec![]));
        assert_eq!(stringify_query(&query), "?a=1&flag&list=x&list");
        assert_eq!(stringify_query(&Query::new()), "");
    }

    #[test]
    fn test_encoding_reserved_and_commas() {
        assert_eq!(encode_component("!'()*"), "%21%27%28%29%2A");
        assert_eq!(encode_component("1,2,3"), "1,2,3");
        assert_eq!(encode_component("a b/c"), "a%20b%2Fc");
        assert_eq!(encode_component("-_.~"), "-_.~");
    }

    #[test]
    fn test_round_trip_preserves_values() {
        let query: Query = vec![
            ("plain", QueryValue::from("v")),
            ("bare", QueryValue::Null),
            ("many", QueryValue::from(vec!["1", "2"])),
            ("odd!'()*", QueryValue::from("x,y")),
            ("sp ace", QueryValue::from("é ü")),
        ]
        .into_iter()
        .collect();

        let decoded = parse_query(&stringify_query(&query)).unwrap();
        assert_eq!(decoded, query);
    }

    #[test]
    fn test_loose_equality() {
        let a = parse_query("x=1&y=2").unwrap();
        let b = parse_query("y=2&x=1").unwrap();
        assert!(a.loosely_equals(&b));

        let c = parse_query("x=1").unwrap();
        assert!(!a.loosely_equals(&c));

        let list = QueryValue::from(vec!["1", "2"]);
        assert!(list.loosely_equals(&QueryValue::from(vec!["1", "2"])));
        assert!(list.loosely_equals(&QueryValue::from("1,2")));
        assert!(!list.loosely_equals(&QueryValue::from(vec!["2", "1"])));
    }

    #[test]
    fn test_resolve_query_recovers_and_overlays() {
        let mut extra = Query::new();
        extra.insert("b", "explicit");

        let resolved = resolve_query("a=%zz", &extra, None);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.get("b"), Some(&QueryValue::from("explicit")));

        let resolved = resolve_query("a=1&b=2", &extra, None);
        assert_eq!(resolved.get("a"), Some(&QueryValue::from("1")));
        assert_eq!(resolved.get("b"), Some(&QueryValue::from("explicit")));
    }

    #[test]
    fn test_resolve_query_custom_parser() {
        let parser: QueryParser = Rc::new(|raw| {
            let mut query = Query::new();
            query.insert("raw", raw);
            Ok(query)
        });
        let resolved = resolve_query("anything", &Query::new(), Some(&parser));
        assert_eq!(resolved.get("raw"), Some(&QueryValue::from("anything")));
    }

    #[test]
    fn test_insert_keeps_position() {
        let mut query = Query::new();
        query.insert("a", "1");
        query.insert("b", "2");
        query.insert("a", "3");
        let keys: Vec<&str> = query.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(query.remove("a"), Some(QueryValue::from("3")));
        assert_eq!(query.len(), 1);
    }
}

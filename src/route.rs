//! Route snapshots and route records.
//!
//! A [`Route`] is the immutable answer to "where is navigation right now": the
//! normalized path, query, hash and params plus the root-to-leaf chain of
//! [`RouteRecord`]s it resolved through. Routes are shared as `Rc<Route>` and
//! never mutated; every navigation produces a new one.
//!
//! Records belong to the [`RouteTable`](crate::RouteTable). A route only holds
//! shared handles to them, and a record's parent is a [`RecordId`] index into
//! the table rather than a pointer, so the record tree has no ownership
//! cycles. Two matched chains are compared by record identity.
//!
//! # The start route
//!
//! Before the first transition commits, the engine sits on a distinguished
//! start route (`path = "/"`, nothing matched). It is only ever equal to
//! itself:
//!
//! ```
//! use nav_transition::route::{is_same_route, start_route, Route};
//!
//! let start = start_route();
//! assert!(is_same_route(&start, &start_route()));
//! assert!(start.is_start());
//! ```

use crate::components::{Component, ComponentDef, ViewInstance};
use crate::guards::NavigationGuard;
use crate::location::{Location, RawLocation};
use crate::params::RouteParams;
use crate::query::{stringify_query, Query, QueryStringifier};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

// ============================================================================
// RouteMeta
// ============================================================================

/// Arbitrary per-record metadata, surfaced on the leaf's [`Route::meta`].
///
/// Values are of any `'static` type and read back by type:
///
/// ```
/// use nav_transition::route::RouteMeta;
///
/// let mut meta = RouteMeta::new();
/// meta.insert("auth", "required");
/// meta.insert("roles", vec!["admin".to_string()]);
///
/// assert_eq!(meta.get_str("auth"), Some("required"));
/// assert_eq!(meta.get::<Vec<String>>("roles").map(Vec::len), Some(1));
/// assert!(meta.get::<u32>("auth").is_none());
/// ```
#[derive(Clone, Default)]
pub struct RouteMeta {
    values: HashMap<String, Rc<dyn Any>>,
}

impl RouteMeta {
    /// Empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any previous value.
    pub fn insert<V: Any>(&mut self, key: impl Into<String>, value: V) {
        self.values.insert(key.into(), Rc::new(value));
    }

    /// Value of `key` if it is a `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref::<T>()
    }

    /// Value of `key` if it is a `String` or `&'static str`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        let value = self.values.get(key)?;
        value
            .downcast_ref::<&'static str>()
            .copied()
            .or_else(|| value.downcast_ref::<String>().map(String::as_str))
    }

    /// The untyped value of `key`.
    pub fn get_any(&self, key: &str) -> Option<&Rc<dyn Any>> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for RouteMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("RouteMeta").field("keys", &keys).finish()
    }
}

/// Index of a record in its route table. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub usize);

/// One configured route definition, flattened out of the config tree.
pub struct RouteRecord {
    /// Position in the owning table.
    pub id: RecordId,
    /// Full path template, e.g. `/users/:id/posts`.
    pub path: String,
    /// Route name, if any.
    pub name: Option<String>,
    /// Parent record; `None` for top-level records.
    pub parent: Option<RecordId>,
    /// Per-record guard run when the record is activated.
    pub before_enter: Option<Rc<dyn NavigationGuard>>,
    /// Redirect target; matching this record re-matches against it.
    pub redirect: Option<RawLocation>,
    /// Metadata copied onto routes ending at this record.
    pub meta: RouteMeta,
    components: RefCell<Vec<(String, Component)>>,
    instances: RefCell<HashMap<String, ViewInstance>>,
}

impl RouteRecord {
    pub(crate) fn new(id: RecordId, path: String) -> Self {
        Self {
            id,
            path,
            name: None,
            parent: None,
            before_enter: None,
            redirect: None,
            meta: RouteMeta::new(),
            components: RefCell::new(Vec::new()),
            instances: RefCell::new(HashMap::new()),
        }
    }

    pub(crate) fn with_components(self, components: Vec<(String, Component)>) -> Self {
        *self.components.borrow_mut() = components;
        self
    }

    /// View keys declared on this record, in declaration order.
    pub fn view_keys(&self) -> Vec<String> {
        self.components
            .borrow()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Snapshot of this record's components.
    pub fn components(&self) -> Vec<(String, Component)> {
        self.components.borrow().clone()
    }

    /// The resolved definition for `view_key`, if it has finished loading.
    pub fn resolved_component(&self, view_key: &str) -> Option<Rc<ComponentDef>> {
        self.components
            .borrow()
            .iter()
            .find(|(key, _)| key == view_key)
            .and_then(|(_, component)| component.resolved())
    }

    /// Replace a lazy component with its loaded definition.
    pub fn set_resolved_component(&self, view_key: &str, def: Rc<ComponentDef>) {
        let mut components = self.components.borrow_mut();
        if let Some(slot) = components.iter_mut().find(|(key, _)| key == view_key) {
            slot.1 = Component::Ready(def);
        }
    }

    /// The mounted view instance for `view_key`.
    pub fn instance(&self, view_key: &str) -> Option<ViewInstance> {
        self.instances.borrow().get(view_key).cloned()
    }

    /// Attach a mounted view instance. Called by the host after rendering.
    pub fn set_instance(&self, view_key: impl Into<String>, instance: ViewInstance) {
        self.instances.borrow_mut().insert(view_key.into(), instance);
    }

    /// Detach the view instance for `view_key`.
    pub fn clear_instance(&self, view_key: &str) -> Option<ViewInstance> {
        self.instances.borrow_mut().remove(view_key)
    }
}

impl fmt::Debug for RouteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRecord")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("has_before_enter", &self.before_enter.is_some())
            .field("redirect", &self.redirect)
            .field("views", &self.view_keys())
            .finish_non_exhaustive()
    }
}

/// Immutable snapshot of a resolved navigation target.
#[derive(Debug)]
pub struct Route {
    /// Name of the leaf record, if named.
    pub name: Option<String>,
    /// Normalized path (`/` when empty).
    pub path: String,
    /// Hash fragment including `#`, or empty.
    pub hash: String,
    /// Parsed query.
    pub query: Query,
    /// Params captured by the match.
    pub params: RouteParams,
    /// Metadata of the leaf record.
    pub meta: RouteMeta,
    /// Root-to-leaf matched records.
    pub matched: Vec<Rc<RouteRecord>>,
    /// Full path of the location that redirected here.
    pub redirected_from: Option<String>,
    /// `path` + query string + `hash`.
    pub full_path: String,
}

thread_local! {
    static START: Rc<Route> = Rc::new(Route {
        name: None,
        path: "/".to_string(),
        hash: String::new(),
        query: Query::new(),
        params: RouteParams::new(),
        meta: RouteMeta::new(),
        matched: Vec::new(),
        redirected_from: None,
        full_path: "/".to_string(),
    });
}

/// The distinguished "nowhere yet" route.
pub fn start_route() -> Rc<Route> {
    START.with(Rc::clone)
}

impl Route {
    /// `true` if this is the start route itself (by identity).
    pub fn is_start(&self) -> bool {
        START.with(|start| std::ptr::eq(Rc::as_ptr(start), self))
    }

    /// The deepest matched record.
    pub fn leaf(&self) -> Option<&Rc<RouteRecord>> {
        self.matched.last()
    }

    /// Active-link containment: `self`'s path starts with `target`'s path, the
    /// hash matches when `target` has one, and every query key of `target` is
    /// present in `self`.
    pub fn contains(&self, target: &Route) -> bool {
        let own = with_trailing_slash(&self.path);
        let theirs = with_trailing_slash(&target.path);
        own.starts_with(&theirs)
            && (target.hash.is_empty() || self.hash == target.hash)
            && target
                .query
                .iter()
                .all(|(key, _)| self.query.contains_key(key))
    }
}

fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

fn without_trailing_slash(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

/// Route equality used for the same-route short-circuit.
///
/// The start route equals only itself. Otherwise two routes are the same when
/// their paths match after dropping one trailing slash and their hash and query
/// agree; for routes without paths, name, hash, query and params must agree.
pub fn is_same_route(a: &Rc<Route>, b: &Rc<Route>) -> bool {
    if a.is_start() || b.is_start() {
        return Rc::ptr_eq(a, b);
    }

    if !a.path.is_empty() && !b.path.is_empty() {
        without_trailing_slash(&a.path) == without_trailing_slash(&b.path)
            && a.hash == b.hash
            && a.query.loosely_equals(&b.query)
    } else if let (Some(name_a), Some(name_b)) = (&a.name, &b.name) {
        name_a == name_b
            && a.hash == b.hash
            && a.query.loosely_equals(&b.query)
            && a.params == b.params
    } else {
        false
    }
}

/// Root-to-leaf chain ending at `leaf`, walking parent ids through `records`.
pub fn format_match(leaf: Option<&Rc<RouteRecord>>, records: &[Rc<RouteRecord>]) -> Vec<Rc<RouteRecord>> {
    let mut chain = Vec::new();
    let mut cursor = leaf.cloned();
    while let Some(record) = cursor {
        cursor = record.parent.and_then(|id| records.get(id.0).cloned());
        chain.push(record);
    }
    chain.reverse();
    chain
}

/// `path` + serialized query + `hash` for a location.
pub fn full_path(location: &Location, stringify: Option<&QueryStringifier>) -> String {
    let path = location.path.as_deref().filter(|p| !p.is_empty()).unwrap_or("/");
    let query = match stringify {
        Some(stringify) => stringify(&location.query),
        None => stringify_query(&location.query),
    };
    format!("{path}{query}{}", location.hash)
}

/// Build a frozen route for `location` ending at `record`.
pub fn create_route(
    record: Option<&Rc<RouteRecord>>,
    records: &[Rc<RouteRecord>],
    location: &Location,
    redirected_from: Option<&Location>,
    stringify: Option<&QueryStringifier>,
) -> Rc<Route> {
    Rc::new(Route {
        name: location
            .name
            .clone()
            .or_else(|| record.and_then(|r| r.name.clone())),
        path: location
            .path
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "/".to_string()),
        hash: location.hash.clone(),
        query: location.query.clone(),
        params: location.params.clone().unwrap_or_default(),
        meta: record.map(|r| r.meta.clone()).unwrap_or_default(),
        matched: format_match(record, records),
        redirected_from: redirected_from.map(|from| full_path(from, stringify)),
        full_path: full_path(location, stringify),
    })
}

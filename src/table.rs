//! In-memory route table.
//!
//! [`RouteConfig`] trees are flattened into [`RouteRecord`]s addressed by
//! [`RecordId`]. Each record stores its parent's id, and the matched chain of
//! a route is rebuilt by walking those ids upwards.
//!
//! # Matching order
//!
//! - children are tried before their parent, so an index child (`""`) wins
//!   over its parent for the parent's own path
//! - the first record registered for a path wins
//! - catch-all `*` records are tried last
//!
//! # Example
//!
//! ```
//! use nav_transition::{RawLocation, RouteConfig, RouteTable};
//!
//! let table = RouteTable::new(vec![
//!     RouteConfig::new("/users/:id")
//!         .name("user")
//!         .children(vec![RouteConfig::new("posts").name("user-posts")]),
//! ]);
//!
//! let route = table.match_route(&RawLocation::from("/users/7/posts"), None);
//! assert_eq!(route.name.as_deref(), Some("user-posts"));
//! assert_eq!(route.matched.len(), 2);
//! assert_eq!(route.params.get("id"), Some(&"7".to_string()));
//! ```

#[cfg(feature = "cache")]
use crate::cache::{CacheStats, CachedMatch, MatchCache};
use crate::components::{Component, ComponentDef, LazyComponent, DEFAULT_VIEW};
use crate::guards::NavigationGuard;
use crate::location::{clean_path, normalize_location, resolve_path, Location, RawLocation};
use crate::matching::{is_wildcard_segment, match_path};
use crate::params::{fill_params, parse_param_segment, RouteParams};
use crate::query::{QueryParser, QueryStringifier};
use crate::route::{create_route, RecordId, Route, RouteMeta, RouteRecord};
use crate::{debug_log, info_log, warn_log};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Nested redirects followed before a record redirect is treated as unmatched.
const MAX_RECORD_REDIRECTS: usize = 16;

// ============================================================================
// RouteConfig
// ============================================================================

/// Declarative route definition.
#[must_use]
pub struct RouteConfig {
    path: String,
    name: Option<String>,
    children: Vec<RouteConfig>,
    before_enter: Option<Rc<dyn NavigationGuard>>,
    components: Vec<(String, Component)>,
    meta: RouteMeta,
    redirect: Option<RawLocation>,
}

impl RouteConfig {
    /// Route for `path`. Child paths without a leading `/` are relative to
    /// their parent.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            children: Vec::new(),
            before_enter: None,
            components: Vec::new(),
            meta: RouteMeta::new(),
            redirect: None,
        }
    }

    /// Name the route.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Nested routes.
    pub fn children(mut self, children: Vec<RouteConfig>) -> Self {
        self.children = children;
        self
    }

    /// Guard run when this route is activated.
    pub fn before_enter<G: NavigationGuard>(mut self, guard: G) -> Self {
        self.before_enter = Some(Rc::new(guard));
        self
    }

    /// Component for the default view.
    pub fn component(self, def: ComponentDef) -> Self {
        self.named_component(DEFAULT_VIEW, def)
    }

    /// Component for a named view.
    pub fn named_component(mut self, view_key: impl Into<String>, def: ComponentDef) -> Self {
        self.components
            .push((view_key.into(), Component::Ready(Rc::new(def))));
        self
    }

    /// Lazily loaded component for a view.
    pub fn lazy_component<L: LazyComponent>(mut self, view_key: impl Into<String>, loader: L) -> Self {
        self.components
            .push((view_key.into(), Component::Lazy(Rc::new(loader))));
        self
    }

    /// Attach metadata. Any `'static` value works; guards read it back with
    /// [`RouteMeta::get`].
    pub fn meta<V: Any>(mut self, key: impl Into<String>, value: V) -> Self {
        self.meta.insert(key, value);
        self
    }

    /// Redirect matches of this route to `target`.
    pub fn redirect(mut self, target: impl Into<RawLocation>) -> Self {
        self.redirect = Some(target.into());
        self
    }
}

impl fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteConfig")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("children", &self.children)
            .field("components", &self.components)
            .field("redirect", &self.redirect)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// RouteMatcher
// ============================================================================

/// Resolves navigation targets to routes.
pub trait RouteMatcher {
    /// Match `raw` relative to `current`. Never fails: unmatched targets give a
    /// route with an empty matched chain.
    fn match_route(&self, raw: &RawLocation, current: Option<&Rc<Route>>) -> Rc<Route>;
}

impl RouteMatcher for RefCell<RouteTable> {
    fn match_route(&self, raw: &RawLocation, current: Option<&Rc<Route>>) -> Rc<Route> {
        self.borrow().match_route(raw, current)
    }
}

// ============================================================================
// RouteTable
// ============================================================================

/// Flattened route records plus lookup indexes.
pub struct RouteTable {
    records: Vec<Rc<RouteRecord>>,
    path_order: Vec<RecordId>,
    paths: HashMap<String, RecordId>,
    names: HashMap<String, RecordId>,
    parse_query: Option<QueryParser>,
    stringify_query: Option<QueryStringifier>,
    #[cfg(feature = "cache")]
    cache: RefCell<MatchCache>,
}

impl RouteTable {
    /// Build a table from `configs`.
    pub fn new(configs: Vec<RouteConfig>) -> Self {
        let mut table = Self {
            records: Vec::new(),
            path_order: Vec::new(),
            paths: HashMap::new(),
            names: HashMap::new(),
            parse_query: None,
            stringify_query: None,
            #[cfg(feature = "cache")]
            cache: RefCell::new(MatchCache::new()),
        };
        table.add_routes(configs);
        table
    }

    /// Use a custom query codec.
    pub fn with_query_codec(
        mut self,
        parse: Option<QueryParser>,
        stringify: Option<QueryStringifier>,
    ) -> Self {
        self.parse_query = parse;
        self.stringify_query = stringify;
        self
    }

    /// Register more routes. Existing records keep their ids.
    pub fn add_routes(&mut self, configs: Vec<RouteConfig>) {
        let before = self.records.len();
        for config in configs {
            self.add_record(config, None);
        }

        // Catch-alls go last.
        let (wildcards, mut ordered): (Vec<RecordId>, Vec<RecordId>) = self
            .path_order
            .iter()
            .copied()
            .partition(|id| self.records[id.0].path == "*");
        ordered.extend(wildcards);
        self.path_order = ordered;

        #[cfg(feature = "cache")]
        self.cache.get_mut().clear();

        info_log!(
            "Registered {} route record(s) ({} total)",
            self.records.len() - before,
            self.records.len()
        );
    }

    fn add_record(&mut self, config: RouteConfig, parent: Option<RecordId>) {
        let RouteConfig {
            path,
            name,
            children,
            before_enter,
            components,
            meta,
            redirect,
        } = config;

        let parent_path = parent.map(|id| self.records[id.0].path.clone());
        let path = normalize_record_path(&path, parent_path.as_deref());

        let id = RecordId(self.records.len());
        let mut record = RouteRecord::new(id, path.clone()).with_components(components);
        record.name = name.clone();
        record.parent = parent;
        record.before_enter = before_enter;
        record.meta = meta;
        record.redirect = redirect;
        self.records.push(Rc::new(record));

        for child in children {
            self.add_record(child, Some(id));
        }

        if self.paths.contains_key(&path) {
            debug_log!("Duplicate route path '{}' ignored for matching", path);
        } else {
            self.paths.insert(path, id);
            self.path_order.push(id);
        }

        if let Some(name) = name {
            if self.names.contains_key(&name) {
                warn_log!("Duplicate route name '{}'; keeping the first", name);
            } else {
                self.names.insert(name, id);
            }
        }
    }

    /// Record by id.
    pub fn record(&self, id: RecordId) -> Option<&Rc<RouteRecord>> {
        self.records.get(id.0)
    }

    /// All records, in registration order.
    pub fn records(&self) -> &[Rc<RouteRecord>] {
        &self.records
    }

    /// Record registered under `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&Rc<RouteRecord>> {
        self.names.get(name).and_then(|id| self.record(*id))
    }

    /// Match statistics of the path cache.
    #[cfg(feature = "cache")]
    #[cfg_attr(docsrs, doc(cfg(feature = "cache")))]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.borrow().stats().clone()
    }

    /// The configured query parser, if any.
    pub fn query_parser(&self) -> Option<&QueryParser> {
        self.parse_query.as_ref()
    }

    /// The configured query stringifier, if any.
    pub fn query_stringifier(&self) -> Option<&QueryStringifier> {
        self.stringify_query.as_ref()
    }

    /// Match `raw` relative to `current`.
    pub fn match_route(&self, raw: &RawLocation, current: Option<&Rc<Route>>) -> Rc<Route> {
        self.match_location(raw, current.map(Rc::as_ref), None, 0)
    }

    fn match_location(
        &self,
        raw: &RawLocation,
        current: Option<&Route>,
        redirected_from: Option<&Location>,
        depth: usize,
    ) -> Rc<Route> {
        let mut location = normalize_location(raw, current, false, self.parse_query.as_ref());

        if let Some(name) = location.name.clone() {
            let Some(record) = self.find_by_name(&name).cloned() else {
                warn_log!("Route with name '{}' does not exist", name);
                return self.create(None, &location, None);
            };

            let mut params = location.params.take().unwrap_or_default();
            if let Some(current) = current {
                for key in required_params(&record.path) {
                    if !params.contains(&key) {
                        if let Some(value) = current.params.get(&key) {
                            params.insert(key, value.clone());
                        }
                    }
                }
            }
            location.path = Some(fill_params(&record.path, &params).unwrap_or_else(|err| {
                warn_log!("{} (named route '{}')", err, name);
                String::new()
            }));
            location.params = Some(params);
            return self.finish_match(Some(record), location, redirected_from, depth);
        }

        if let Some(path) = location.path.clone().filter(|p| !p.is_empty()) {
            if let Some((record, params)) = self.match_path_cached(&path) {
                location.params = Some(params);
                return self.finish_match(Some(record), location, redirected_from, depth);
            }
        }

        self.create(None, &location, None)
    }

    fn match_path_cached(&self, path: &str) -> Option<(Rc<RouteRecord>, RouteParams)> {
        #[cfg(feature = "cache")]
        let cached = self.cache.borrow_mut().get(path);
        #[cfg(feature = "cache")]
        if let Some(hit) = cached {
            return hit
                .record
                .and_then(|id| self.record(id).cloned())
                .map(|record| (record, hit.params));
        }

        let found = self.path_order.iter().find_map(|id| {
            let record = &self.records[id.0];
            match_path(path, &record.path).map(|params| (record.clone(), params))
        });

        #[cfg(feature = "cache")]
        self.cache.borrow_mut().insert(
            path.to_string(),
            CachedMatch {
                record: found.as_ref().map(|(record, _)| record.id),
                params: found
                    .as_ref()
                    .map(|(_, params)| params.clone())
                    .unwrap_or_default(),
            },
        );

        found
    }

    fn finish_match(
        &self,
        record: Option<Rc<RouteRecord>>,
        location: Location,
        redirected_from: Option<&Location>,
        depth: usize,
    ) -> Rc<Route> {
        match record {
            Some(record) if record.redirect.is_some() => {
                let origin = redirected_from.cloned().unwrap_or_else(|| location.clone());
                self.follow_redirect(&record, &location, &origin, depth)
            }
            record => self.create(record.as_ref(), &location, redirected_from),
        }
    }

    fn follow_redirect(
        &self,
        record: &Rc<RouteRecord>,
        location: &Location,
        origin: &Location,
        depth: usize,
    ) -> Rc<Route> {
        if depth >= MAX_RECORD_REDIRECTS {
            warn_log!("Too many nested redirects while matching '{}'", record.path);
            return self.create(None, location, None);
        }

        let target = match &record.redirect {
            Some(RawLocation::Path(path)) => Location::path(path.clone()),
            Some(RawLocation::Location(loc)) => loc.clone(),
            None => return self.create(Some(record), location, Some(origin)),
        };

        let query = if target.query.is_empty() {
            location.query.clone()
        } else {
            target.query.clone()
        };
        let hash = if target.hash.is_empty() {
            location.hash.clone()
        } else {
            target.hash.clone()
        };
        let params = target
            .params
            .clone()
            .or_else(|| location.params.clone())
            .unwrap_or_default();

        let next = if let Some(name) = target.name {
            if self.find_by_name(&name).is_none() {
                warn_log!("Redirect of '{}' targets unknown route '{}'", record.path, name);
                return self.create(None, location, None);
            }
            Location {
                name: Some(name),
                query,
                hash,
                params: Some(params),
                normalized: true,
                ..Location::default()
            }
        } else if let Some(path) = target.path {
            let base = record
                .parent
                .and_then(|id| self.record(id))
                .map_or_else(|| "/".to_string(), |parent| parent.path.clone());
            let raw_path = resolve_path(&path, &base, true);
            let filled = fill_params(&raw_path, &params).unwrap_or_else(|err| {
                warn_log!("{} (redirect of '{}')", err, record.path);
                String::new()
            });
            Location {
                path: Some(filled),
                query,
                hash,
                normalized: true,
                ..Location::default()
            }
        } else {
            warn_log!("Invalid redirect on '{}'", record.path);
            return self.create(None, location, None);
        };

        debug_log!("Record '{}' redirects to {}", record.path, next);
        self.match_location(&RawLocation::Location(next), None, Some(origin), depth + 1)
    }

    fn create(
        &self,
        record: Option<&Rc<RouteRecord>>,
        location: &Location,
        redirected_from: Option<&Location>,
    ) -> Rc<Route> {
        create_route(
            record,
            &self.records,
            location,
            redirected_from,
            self.stringify_query.as_ref(),
        )
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("records", &self.records)
            .field("path_order", &self.path_order)
            .finish_non_exhaustive()
    }
}

/// Join a record path onto its parent and drop the trailing slash.
fn normalize_record_path(path: &str, parent: Option<&str>) -> String {
    if is_wildcard_segment(path) && parent.is_none() {
        return path.to_string();
    }
    let joined = match parent {
        _ if path.starts_with('/') => path.to_string(),
        Some(parent) => clean_path(&format!("{parent}/{path}")),
        None => format!("/{path}"),
    };
    match joined.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => joined,
    }
}

fn required_params(template: &str) -> Vec<String> {
    template
        .split('/')
        .filter_map(parse_param_segment)
        .filter(|segment| !segment.optional)
        .map(|segment| segment.name.into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CATCH_ALL_PARAM;

    fn table() -> RouteTable {
        RouteTable::new(vec![
            RouteConfig::new("/").name("home"),
            RouteConfig::new("/users/:id").name("user").children(vec![
                RouteConfig::new("").name("user-home"),
                RouteConfig::new("posts").name("user-posts"),
            ]),
            RouteConfig::new("/old").redirect("/users/1"),
            RouteConfig::new("/legacy/:id").redirect(Location::named("user-posts")),
            RouteConfig::new("*").name("not-found"),
        ])
    }

    #[test]
    fn test_normalize_record_path() {
        assert_eq!(normalize_record_path("/a/", None), "/a");
        assert_eq!(normalize_record_path("b", Some("/a")), "/a/b");
        assert_eq!(normalize_record_path("", Some("/a")), "/a");
        assert_eq!(normalize_record_path("/abs", Some("/a")), "/abs");
        assert_eq!(normalize_record_path("/", None), "/");
        assert_eq!(normalize_record_path("*", None), "*");
        assert_eq!(normalize_record_path("rel", None), "/rel");
    }

    #[test]
    fn test_children_match_before_parent() {
        let table = table();
        let route = table.match_route(&"/users/5".into(), None);
        assert_eq!(route.name.as_deref(), Some("user-home"));
        let chain: Vec<_> = route.matched.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(chain, vec!["/users/:id", "/users/:id"]);
    }

    #[test]
    fn test_named_match_fills_params_from_current() {
        let table = table();
        let current = table.match_route(&"/users/9".into(), None);
        let route = table.match_route(&Location::named("user-posts").into(), Some(&current));
        assert_eq!(route.path, "/users/9/posts");
        assert_eq!(route.params.get("id"), Some(&"9".to_string()));
    }

    #[test]
    fn test_named_match_missing_param_falls_back_to_root_path() {
        let table = table();
        let route = table.match_route(&Location::named("user").into(), None);
        assert_eq!(route.path, "/");
        assert_eq!(route.name.as_deref(), Some("user"));
        assert_eq!(route.leaf().map(|r| r.path.as_str()), Some("/users/:id"));
        assert!(route.params.is_empty());
    }

    #[test]
    fn test_unknown_name_is_unmatched() {
        let table = table();
        let route = table.match_route(&Location::named("missing").into(), None);
        assert!(route.matched.is_empty());
    }

    #[test]
    fn test_catch_all_is_last() {
        let mut table = table();
        let route = table.match_route(&"/nope/deeper".into(), None);
        assert_eq!(route.name.as_deref(), Some("not-found"));
        assert_eq!(route.params.get(CATCH_ALL_PARAM), Some(&"nope/deeper".to_string()));

        table.add_routes(vec![RouteConfig::new("/late").name("late")]);
        let route = table.match_route(&"/late".into(), None);
        assert_eq!(route.name.as_deref(), Some("late"));
    }

    #[test]
    fn test_path_redirect() {
        let table = table();
        let route = table.match_route(&"/old?x=1#h".into(), None);
        assert_eq!(route.path, "/users/1");
        assert_eq!(route.full_path, "/users/1?x=1#h");
        assert_eq!(route.redirected_from.as_deref(), Some("/old?x=1#h"));
    }

    #[test]
    fn test_named_redirect_keeps_params() {
        let table = table();
        let route = table.match_route(&"/legacy/4".into(), None);
        assert_eq!(route.name.as_deref(), Some("user-posts"));
        assert_eq!(route.path, "/users/4/posts");
        assert_eq!(route.redirected_from.as_deref(), Some("/legacy/4"));
    }

    #[test]
    fn test_params_only_navigation() {
        let table = table();
        let current = table.match_route(&"/users/3/posts".into(), None);
        let route = table.match_route(&Location::params_only().param("id", "8").into(), Some(&current));
        assert_eq!(route.path, "/users/8/posts");
    }

    #[test]
    fn test_add_routes_never_reuses_ids() {
        let mut table = table();
        let before = table.records().len();
        table.add_routes(vec![RouteConfig::new("/extra")]);
        assert_eq!(table.records().len(), before + 1);
        assert_eq!(table.records()[before].id, RecordId(before));
    }

    #[cfg(feature = "cache")]
    #[test]
    fn test_cache_hits_and_invalidation() {
        let mut table = table();
        table.match_route(&"/users/1".into(), None);
        table.match_route(&"/users/1".into(), None);
        assert_eq!(table.cache_stats().hits, 1);

        let invalidations = table.cache_stats().invalidations;
        table.add_routes(vec![RouteConfig::new("/more")]);
        assert_eq!(table.cache_stats().invalidations, invalidations + 1);
    }
}

//! The router facade.
//!
//! [`Router`] ties a [`RouteTable`], a [`HistoryBackend`], a
//! [`ComponentBinding`] and the transition engine together. Build one with
//! [`RouterBuilder`]:
//!
//! ```
//! use nav_transition::{RouteConfig, RouterBuilder};
//!
//! let router = RouterBuilder::new()
//!     .routes(vec![
//!         RouteConfig::new("/").name("home"),
//!         RouteConfig::new("/users/:id").name("user"),
//!     ])
//!     .build();
//!
//! router.init();
//! router.push("/users/7");
//! assert_eq!(router.current_route().params.get("id").map(String::as_str), Some("7"));
//! ```

use crate::backend::{HistoryBackend, MemoryBackend};
use crate::components::{ComponentBinding, ComponentDef, RenderQueue};
use crate::error::{DecodeError, NavigationError};
use crate::guards::{AfterHook, NavigationGuard};
use crate::history::{AbortCallback, CompleteCallback, History, DEFAULT_REDIRECT_LIMIT};
use crate::hooks::HookHandle;
use crate::location::{normalize_location, Location, RawLocation};
use crate::query::{Query, QueryParser, QueryStringifier};
use crate::route::Route;
use crate::table::{RouteConfig, RouteTable};
use crate::{debug_log, info_log};
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

// ============================================================================
// Resolved
// ============================================================================

/// Result of [`Router::resolve`].
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The normalized location.
    pub location: Location,
    /// The route it matches.
    pub route: Rc<Route>,
    /// Link target: base path plus the full path the user asked for.
    pub href: String,
}

// ============================================================================
// RouterBuilder
// ============================================================================

/// Configures and builds a [`Router`].
pub struct RouterBuilder {
    routes: Vec<RouteConfig>,
    base: String,
    backend: Option<Box<dyn HistoryBackend>>,
    binding: Option<Rc<dyn ComponentBinding>>,
    parse_query: Option<QueryParser>,
    stringify_query: Option<QueryStringifier>,
    redirect_limit: Option<usize>,
}

impl RouterBuilder {
    /// Start with no routes, an in-memory backend and a [`RenderQueue`] binding.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            base: String::new(),
            backend: None,
            binding: None,
            parse_query: None,
            stringify_query: None,
            redirect_limit: Some(DEFAULT_REDIRECT_LIMIT),
        }
    }

    /// Route configuration tree.
    pub fn routes(mut self, routes: Vec<RouteConfig>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Prefix for every `href` produced by [`Router::resolve`].
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = normalize_base(&base.into());
        self
    }

    /// Where the external location lives.
    pub fn backend(mut self, backend: Box<dyn HistoryBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// The host UI layer.
    pub fn binding(mut self, binding: Rc<dyn ComponentBinding>) -> Self {
        self.binding = Some(binding);
        self
    }

    /// Replace the query string parser.
    ///
    /// The parser runs while the route table is borrowed for matching. It may
    /// call [`Router::resolve`] or [`Router::routes`], but
    /// [`Router::add_routes`] from inside it panics.
    pub fn parse_query<F>(mut self, parse: F) -> Self
    where
        F: Fn(&str) -> Result<Query, DecodeError> + 'static,
    {
        self.parse_query = Some(Rc::new(parse));
        self
    }

    /// Replace the query string serializer. The same re-entrancy rules as for
    /// [`parse_query`](Self::parse_query) apply.
    pub fn stringify_query<F>(mut self, stringify: F) -> Self
    where
        F: Fn(&Query) -> String + 'static,
    {
        self.stringify_query = Some(Rc::new(stringify));
        self
    }

    /// Longest accepted chain of guard redirects; `None` disables the check.
    pub fn redirect_limit(mut self, limit: Option<usize>) -> Self {
        self.redirect_limit = limit;
        self
    }

    /// Build the router. No transition runs until [`Router::init`].
    pub fn build(self) -> Router {
        let table = Rc::new(RefCell::new(
            RouteTable::new(self.routes).with_query_codec(self.parse_query, self.stringify_query),
        ));
        let backend = self
            .backend
            .unwrap_or_else(|| Box::new(MemoryBackend::new()));
        let binding = self
            .binding
            .unwrap_or_else(|| Rc::new(RenderQueue::new()));
        let history = History::new(table.clone(), backend, binding, self.redirect_limit);

        debug_log!(
            "Router built (base '{}', redirect limit {:?})",
            self.base,
            self.redirect_limit
        );

        Router {
            table,
            history,
            base: self.base,
        }
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("routes", &self.routes.len())
            .field("base", &self.base)
            .field("redirect_limit", &self.redirect_limit)
            .finish_non_exhaustive()
    }
}

fn normalize_base(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

// ============================================================================
// Router
// ============================================================================

/// Navigation entry point for the host application.
///
/// Cloning yields another handle to the same router.
#[derive(Clone)]
pub struct Router {
    table: Rc<RefCell<RouteTable>>,
    history: History,
    base: String,
}

impl Router {
    /// Shorthand for [`RouterBuilder::new`].
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Run the initial transition to whatever the backend currently shows.
    pub fn init(&self) {
        let location = self.history.current_location();
        info_log!("Router starting at '{}'", location);
        self.history.transition_to(location, None, None);
    }

    // ------------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------------

    /// Guard run before every transition, after leave guards.
    pub fn before_each<G: NavigationGuard>(&self, guard: G) -> HookHandle {
        self.history.hooks().before_each.register(Rc::new(guard))
    }

    /// Guard run last, once enter guards passed and lazy views are loaded.
    pub fn before_resolve<G: NavigationGuard>(&self, guard: G) -> HookHandle {
        self.history.hooks().before_resolve.register(Rc::new(guard))
    }

    /// Hook run after every commit.
    pub fn after_each<H: AfterHook>(&self, hook: H) -> HookHandle {
        self.history.hooks().after_each.register(Rc::new(hook))
    }

    /// Be told about every committed route.
    pub fn listen<F>(&self, listener: F) -> HookHandle
    where
        F: Fn(&Rc<Route>) + 'static,
    {
        self.history.listen(listener)
    }

    /// Be told about every error-like transition failure.
    pub fn on_error<F>(&self, callback: F) -> HookHandle
    where
        F: Fn(&NavigationError) + 'static,
    {
        self.history.on_error(callback)
    }

    /// Run `callback` once the initial navigation settled, or right away.
    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce(&Rc<Route>) + 'static,
    {
        self.history.on_ready(Box::new(callback), None);
    }

    /// Like [`on_ready`](Self::on_ready), with a callback for an initial
    /// navigation that fails with an error.
    pub fn on_ready_or_error<F, E>(&self, callback: F, error_callback: E)
    where
        F: FnOnce(&Rc<Route>) + 'static,
        E: FnOnce(&NavigationError) + 'static,
    {
        self.history
            .on_ready(Box::new(callback), Some(Box::new(error_callback)));
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    /// Navigate to `to`, adding a history entry.
    pub fn push(&self, to: impl Into<RawLocation>) {
        self.history.push(to, None, None);
    }

    /// Navigate to `to`, adding a history entry, and report the outcome.
    pub fn push_with<C, A>(&self, to: impl Into<RawLocation>, on_complete: C, on_abort: A)
    where
        C: FnOnce(&Rc<Route>) + 'static,
        A: FnOnce(&NavigationError) + 'static,
    {
        let on_complete: CompleteCallback = Box::new(on_complete);
        let on_abort: AbortCallback = Box::new(on_abort);
        self.history.push(to, Some(on_complete), Some(on_abort));
    }

    /// Navigate to `to`, overwriting the current history entry.
    pub fn replace(&self, to: impl Into<RawLocation>) {
        self.history.replace(to, None, None);
    }

    /// Navigate to `to`, overwriting the current entry, and report the outcome.
    pub fn replace_with<C, A>(&self, to: impl Into<RawLocation>, on_complete: C, on_abort: A)
    where
        C: FnOnce(&Rc<Route>) + 'static,
        A: FnOnce(&NavigationError) + 'static,
    {
        let on_complete: CompleteCallback = Box::new(on_complete);
        let on_abort: AbortCallback = Box::new(on_abort);
        self.history.replace(to, Some(on_complete), Some(on_abort));
    }

    /// Move `n` entries through the history stack. Out-of-range moves do nothing.
    pub fn go(&self, n: isize) {
        self.history.go(n);
    }

    /// `go(-1)`.
    pub fn back(&self) {
        self.go(-1);
    }

    /// `go(1)`.
    pub fn forward(&self) {
        self.go(1);
    }

    /// Re-resolve the backend's location after it changed behind our back.
    pub fn sync_external_location(&self) {
        self.history.sync_external_location();
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    /// Last committed route.
    pub fn current_route(&self) -> Rc<Route> {
        self.history.current()
    }

    /// Target of the transition in flight.
    pub fn pending_route(&self) -> Option<Rc<Route>> {
        self.history.pending()
    }

    /// `true` once the initial navigation settled.
    pub fn is_ready(&self) -> bool {
        self.history.is_ready()
    }

    /// The transition engine.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Base path prepended to resolved links.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Borrow the route table.
    ///
    /// Release the borrow before navigating; matching needs it mutably.
    pub fn routes(&self) -> Ref<'_, RouteTable> {
        self.table.borrow()
    }

    // ------------------------------------------------------------------------
    // Routes
    // ------------------------------------------------------------------------

    /// Register more routes and re-resolve the current location against them.
    pub fn add_routes(&self, configs: Vec<RouteConfig>) {
        self.table.borrow_mut().add_routes(configs);
        if !self.history.current().is_start() {
            self.history.sync_external_location();
        }
    }

    /// Resolve `to` without navigating.
    ///
    /// `current` defaults to the current route. With `append` set, relative
    /// paths are appended to the current path instead of replacing its last
    /// segment.
    pub fn resolve(
        &self,
        to: impl Into<RawLocation>,
        current: Option<&Rc<Route>>,
        append: bool,
    ) -> Resolved {
        let current = current.cloned().unwrap_or_else(|| self.history.current());
        let raw = to.into();

        let table = self.table.borrow();
        let location = normalize_location(&raw, Some(current.as_ref()), append, table.query_parser());
        let route = table.match_route(&RawLocation::Location(location.clone()), Some(&current));
        drop(table);

        let full_path = route.redirected_from.as_deref().unwrap_or(&route.full_path);
        let href = format!("{}{}", self.base, full_path);

        Resolved {
            location,
            route,
            href,
        }
    }

    /// Component definitions of `route` (default: current route), root to
    /// leaf. Lazy components that have not loaded yet are skipped.
    pub fn matched_components(&self, route: Option<&Rc<Route>>) -> Vec<Rc<ComponentDef>> {
        let route = route.cloned().unwrap_or_else(|| self.history.current());
        route
            .matched
            .iter()
            .flat_map(|record| {
                record
                    .view_keys()
                    .into_iter()
                    .filter_map(|key| record.resolved_component(&key))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("base", &self.base)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guards::{after_fn, sync_guard_fn, NextAction};
    use crate::params::RouteParams;

    fn router() -> Router {
        RouterBuilder::new()
            .base("/app/")
            .routes(vec![
                RouteConfig::new("/").name("home"),
                RouteConfig::new("/users/:id")
                    .name("user")
                    .component(ComponentDef::new("User"))
                    .children(vec![RouteConfig::new("posts").name("posts")]),
            ])
            .build()
    }

    #[test]
    fn test_normalize_base() {
        assert_eq!(normalize_base(""), "");
        assert_eq!(normalize_base("/"), "");
        assert_eq!(normalize_base("app/"), "/app");
        assert_eq!(normalize_base("/app"), "/app");
    }

    #[test]
    fn test_init_commits_backend_location() {
        let router = router();
        assert!(!router.is_ready());
        router.init();
        assert!(router.is_ready());
        assert_eq!(router.current_route().name.as_deref(), Some("home"));
    }

    #[test]
    fn test_resolve_builds_href() {
        let router = router();
        router.init();

        let resolved = router.resolve("/users/3?tab=info", None, false);
        assert_eq!(resolved.href, "/app/users/3?tab=info");
        assert_eq!(resolved.route.name.as_deref(), Some("user"));
        assert_eq!(resolved.route.params.get("id").map(String::as_str), Some("3"));
        assert!(router.current_route().name.as_deref() == Some("home"));
    }

    #[test]
    fn test_resolve_named_with_params() {
        let router = router();
        let params: RouteParams = [("id".to_string(), "9".to_string())].into_iter().collect();
        let resolved = router.resolve(
            Location {
                params: Some(params),
                ..Location::named("posts")
            },
            None,
            false,
        );
        assert_eq!(resolved.route.path, "/users/9/posts");
        assert_eq!(resolved.route.matched.len(), 2);
    }

    #[test]
    fn test_matched_components() {
        let router = router();
        router.init();
        router.push("/users/1/posts");
        let names: Vec<String> = router
            .matched_components(None)
            .iter()
            .map(|def| def.name.clone())
            .collect();
        assert_eq!(names, vec!["User".to_string()]);
    }

    #[test]
    fn test_hook_handles_deregister() {
        let router = router();
        router.init();

        let blocker = router.before_each(sync_guard_fn(|_| NextAction::abort()));
        router.push("/users/1");
        assert_eq!(router.current_route().path, "/");

        assert!(blocker.remove());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _after = router.after_each(after_fn(move |to, from| {
            sink.borrow_mut().push(format!("{} <- {}", to.path, from.path));
        }));
        router.push("/users/1");
        assert_eq!(*seen.borrow(), vec!["/users/1 <- /".to_string()]);
    }

    #[test]
    fn test_add_routes_re_resolves_current() {
        let router = RouterBuilder::new()
            .backend(Box::new(MemoryBackend::with_initial("/late")))
            .build();
        router.init();
        assert!(router.current_route().matched.is_empty());

        router.add_routes(vec![RouteConfig::new("/late").name("late")]);
        assert_eq!(router.current_route().name.as_deref(), Some("late"));
    }
}

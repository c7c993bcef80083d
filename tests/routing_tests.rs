//! Integration tests for route resolution through the router: nested and
//! named routes, relative targets, record redirects, query handling.

mod common;

use common::*;
use nav_transition::query::parse_query;
use nav_transition::*;
use std::cell::RefCell;
use std::rc::Rc;

fn app_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("/").name("home"),
        RouteConfig::new("/users/:id")
            .name("user")
            .component(ComponentDef::new("User"))
            .children(vec![
                RouteConfig::new("posts")
                    .name("posts")
                    .component(ComponentDef::new("Posts")),
            ]),
        RouteConfig::new("/dashboard")
            .component(ComponentDef::new("Dashboard"))
            .children(vec![
                RouteConfig::new("").name("dash-index"),
                RouteConfig::new("settings").name("dash-settings"),
            ]),
        RouteConfig::new("/docs/:page"),
        RouteConfig::new("/docs/:page/:section"),
        RouteConfig::new("/old").redirect("/users/1"),
        RouteConfig::new("/profile/:id").redirect(Location::named("user")),
        RouteConfig::new("*").name("not-found"),
    ]
}

fn param(route: &Route, key: &str) -> Option<String> {
    route.params.get(key).cloned()
}

// ---- matching ----

#[test]
fn test_nested_route_matches_chain() {
    let app = TestApp::started(app_routes());
    app.router.push("/users/5/posts");

    let route = app.router.current_route();
    assert_eq!(route.name.as_deref(), Some("posts"));
    assert_eq!(route.matched.len(), 2);
    assert_eq!(route.matched[0].path, "/users/:id");
    assert_eq!(route.matched[1].path, "/users/:id/posts");
    assert_eq!(param(&route, "id").as_deref(), Some("5"));

    let names: Vec<String> = app
        .router
        .matched_components(None)
        .iter()
        .map(|def| def.name.clone())
        .collect();
    assert_eq!(names, ["User", "Posts"]);
}

#[test]
fn test_index_child_matches_parent_path() {
    let app = TestApp::started(app_routes());
    app.router.push("/dashboard");

    let route = app.router.current_route();
    assert_eq!(route.name.as_deref(), Some("dash-index"));
    assert_eq!(route.matched.len(), 2);
}

#[test]
fn test_catch_all_captures_rest() {
    let app = TestApp::started(app_routes());
    app.router.push("/no/such/page");

    let route = app.router.current_route();
    assert_eq!(route.name.as_deref(), Some("not-found"));
    assert_eq!(
        param(&route, CATCH_ALL_PARAM).as_deref(),
        Some("no/such/page")
    );
}

#[test]
fn test_unmatched_without_catch_all() {
    let app = TestApp::started(vec![RouteConfig::new("/")]);
    app.router.push("/nowhere");

    let route = app.router.current_route();
    assert_eq!(route.path, "/nowhere");
    assert!(route.matched.is_empty());
}

// ---- targets ----

#[test]
fn test_named_navigation_inherits_params() {
    let app = TestApp::started(app_routes());
    app.router.push("/users/5");
    app.router.push(Location::named("posts"));

    assert_eq!(app.path(), "/users/5/posts");
}

#[test]
fn test_params_only_navigation() {
    let app = TestApp::started(app_routes());
    app.router.push("/users/5/posts");
    app.router.push(Location::params_only().param("id", "6"));

    let route = app.router.current_route();
    assert_eq!(route.path, "/users/6/posts");
    assert_eq!(route.name.as_deref(), Some("posts"));
}

#[test]
fn test_relative_and_appended_paths() {
    let app = TestApp::started(app_routes());
    app.router.push("/docs/intro");

    app.router.push("guide");
    assert_eq!(app.path(), "/docs/guide");

    app.router.push(Location::path("setup").append());
    let route = app.router.current_route();
    assert_eq!(route.path, "/docs/guide/setup");
    assert_eq!(param(&route, "section").as_deref(), Some("setup"));
}

#[test]
fn test_query_and_hash() {
    let app = TestApp::started(app_routes());
    app.router.push(
        Location::path("/users/5?tab=info")
            .query("sort", "desc")
            .hash("bio"),
    );

    let route = app.router.current_route();
    assert_eq!(route.full_path, "/users/5?tab=info&sort=desc#bio");
    assert_eq!(route.query.get_all("tab"), ["info"]);
    assert_eq!(route.hash, "#bio");
    assert_eq!(app.backend.entries().last().map(String::as_str), Some("/users/5?tab=info&sort=desc#bio"));
}

#[test]
fn test_explicit_query_wins() {
    let app = TestApp::started(app_routes());
    app.router.push(Location::path("/docs/a?v=1").query("v", "2"));
    assert_eq!(app.path(), "/docs/a?v=2");
}

// ---- record redirects ----

#[test]
fn test_record_redirect_keeps_query() {
    let app = TestApp::started(app_routes());
    app.router.push("/old?ref=mail");

    let route = app.router.current_route();
    assert_eq!(route.full_path, "/users/1?ref=mail");
    assert_eq!(route.redirected_from.as_deref(), Some("/old?ref=mail"));
    assert_eq!(app.backend.entries(), ["/", "/users/1?ref=mail"]);
}

#[test]
fn test_named_record_redirect_keeps_params() {
    let app = TestApp::started(app_routes());
    app.router.push("/profile/4");

    let route = app.router.current_route();
    assert_eq!(route.name.as_deref(), Some("user"));
    assert_eq!(route.path, "/users/4");
}

// ---- resolve ----

#[test]
fn test_resolve_does_not_navigate() {
    let app = TestApp::with_builder(RouterBuilder::new().routes(app_routes()).base("/app"));
    app.router.init();

    let resolved = app.router.resolve("/users/3/posts", None, false);
    assert_eq!(resolved.route.name.as_deref(), Some("posts"));
    assert_eq!(resolved.href, "/app/users/3/posts");
    assert!(resolved.location.is_normalized());
    assert_eq!(app.path(), "/");

    let redirected = app.router.resolve("/old", None, false);
    assert_eq!(redirected.route.path, "/users/1");
    assert_eq!(redirected.href, "/app/old");
}

#[test]
fn test_resolve_relative_to_given_route() {
    let app = TestApp::started(app_routes());
    let base = app.router.resolve("/docs/intro", None, false).route;

    let resolved = app.router.resolve("faq", Some(&base), true);
    assert_eq!(resolved.route.path, "/docs/intro/faq");
}

#[test]
fn test_contains_for_active_links() {
    let app = TestApp::started(app_routes());
    app.router.push("/users/5/posts?tab=1");
    let current = app.router.current_route();

    let parent = app.router.resolve("/users/5", None, false).route;
    let other = app.router.resolve("/users/50", None, false).route;
    let needs_query = app.router.resolve("/users/5?sort=asc", None, false).route;

    assert!(current.contains(&parent));
    assert!(!current.contains(&other));
    assert!(!current.contains(&needs_query));
}

// ---- configuration ----

#[test]
fn test_custom_query_codec() {
    let app = TestApp::with_builder(
        RouterBuilder::new()
            .routes(vec![RouteConfig::new("/"), RouteConfig::new("/search")])
            .parse_query(|raw: &str| {
                let mut query = Query::new();
                for pair in raw.split(';').filter(|p| !p.is_empty()) {
                    let (key, value) = pair.split_once(':').unwrap_or((pair, ""));
                    query.insert(key, value);
                }
                Ok(query)
            })
            .stringify_query(|query: &Query| {
                if query.is_empty() {
                    return String::new();
                }
                let pairs: Vec<String> = query
                    .iter()
                    .map(|(key, value)| format!("{key}:{}", value.as_str().unwrap_or("")))
                    .collect();
                format!("?{}", pairs.join(";"))
            }),
    );
    app.router.init();
    app.router.push("/search?q:rust;page:2");

    let route = app.router.current_route();
    assert_eq!(route.query.get_all("q"), ["rust"]);
    assert_eq!(route.query.get_all("page"), ["2"]);
    assert_eq!(route.full_path, "/search?q:rust;page:2");
}

#[test]
fn test_query_parser_may_read_router() {
    let slot: Rc<RefCell<Option<Router>>> = Rc::default();
    let seen = Recorder::new();
    let (router_slot, log) = (slot.clone(), seen.clone());
    let app = TestApp::with_builder(
        RouterBuilder::new()
            .routes(vec![RouteConfig::new("/"), RouteConfig::new("/search")])
            .parse_query(move |raw: &str| {
                let router = router_slot.borrow().clone();
                if let Some(router) = router.filter(|_| !raw.is_empty()) {
                    let home = router.resolve("/", None, false);
                    log.push(format!("{} of {}", home.href, router.routes().records().len()));
                }
                parse_query(raw)
            }),
    );
    *slot.borrow_mut() = Some(app.router.clone());
    app.router.init();

    app.router.push("/search?q=rust");
    assert_eq!(app.router.current_route().query.get_all("q"), ["rust"]);
    assert!(seen.entries().iter().all(|entry| entry == "/ of 2"));
    assert!(!seen.entries().is_empty());

    slot.borrow_mut().take();
}

#[test]
fn test_add_routes_at_runtime() {
    let app = TestApp::started(vec![RouteConfig::new("/")]);
    app.router.push("/reports");
    assert!(app.router.current_route().matched.is_empty());

    app.router
        .add_routes(vec![RouteConfig::new("/reports").name("reports")]);

    assert_eq!(app.router.current_route().name.as_deref(), Some("reports"));
    assert_eq!(app.router.routes().records().len(), 2);
}

#[cfg(feature = "cache")]
#[test]
fn test_match_cache_counts_repeat_lookups() {
    let app = TestApp::started(app_routes());
    let hits = app.router.routes().cache_stats().hits;
    let invalidations = app.router.routes().cache_stats().invalidations;

    app.router.resolve("/users/9", None, false);
    app.router.resolve("/users/9", None, false);
    assert_eq!(app.router.routes().cache_stats().hits, hits + 1);

    app.router.add_routes(vec![RouteConfig::new("/extra")]);
    assert_eq!(
        app.router.routes().cache_stats().invalidations,
        invalidations + 1
    );
}

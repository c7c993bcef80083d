//! # nav-transition
//!
//! A navigation transition engine for UI hosts with nested routes:
//!
//! - **Route table** - nested route configs, named routes, record redirects,
//!   `:param`, `:param?` and `*` segments, optional LRU match cache
//! - **Location normalization** - relative paths, params-only targets, query
//!   and hash merging
//! - **Guard pipeline** - leave, global before, update, before-enter, lazy
//!   component loading, enter and resolve guards, in that order
//! - **Async guards** - every guard resumes a one-shot continuation, now or
//!   later; superseded transitions are dropped silently
//! - **Commit** - history backend sync, change listeners, after hooks, ready
//!   callbacks and post-enter callbacks run once the view is mounted
//!
//! # Quick Start
//!
//! ```
//! use nav_transition::{sync_guard_fn, NextAction, RouteConfig, RouterBuilder};
//!
//! let router = RouterBuilder::new()
//!     .routes(vec![
//!         RouteConfig::new("/"),
//!         RouteConfig::new("/login").name("login"),
//!         RouteConfig::new("/admin").meta("auth", "required"),
//!     ])
//!     .build();
//!
//! let _auth = router.before_each(sync_guard_fn(|ctx| {
//!     if ctx.to.meta.contains_key("auth") {
//!         NextAction::redirect("/login")
//!     } else {
//!         NextAction::Proceed
//!     }
//! }));
//!
//! router.init();
//! router.push("/admin");
//! assert_eq!(router.current_route().path, "/login");
//! ```
//!
//! # Features
//!
//! - `log` (default) - log through the `log` crate
//! - `tracing` - log through the `tracing` crate instead
//! - `cache` (default) - memoize path matches in an LRU cache

#![cfg_attr(docsrs, feature(doc_cfg))]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Error handling
pub mod error;

// Locations and routes
pub mod location;
pub mod params;
pub mod query;
pub mod route;

// Route table
#[cfg(feature = "cache")]
pub mod cache;
pub mod matching;
pub mod table;

// Guards and components
pub mod components;
pub mod guards;
pub mod hooks;
pub mod pipeline;
pub mod queue;

// Engine
pub mod backend;
pub mod history;
pub mod router;

// Re-export main types for convenient access
pub use backend::{HistoryBackend, MemoryBackend};
#[cfg(feature = "cache")]
pub use cache::{CacheStats, MatchCache};
pub use components::{
    lazy_fn, Component, ComponentBinding, ComponentDef, GuardKind, LazyComponent, RenderQueue,
    ViewInstance, DEFAULT_VIEW,
};
pub use error::{DecodeError, GuardError, MissingParamError, NavigationError};
pub use guards::{
    after_fn, guard_fn, sync_guard_fn, AfterHook, GuardContext, NavigationGuard, Next, NextAction,
};
pub use history::{History, DEFAULT_REDIRECT_LIMIT};
pub use hooks::HookHandle;
pub use location::{normalize_location, Location, RawLocation};
pub use params::{fill_params, RouteParams, CATCH_ALL_PARAM};
pub use query::{Query, QueryValue};
pub use queue::{run_queue, Continue};
pub use route::{is_same_route, start_route, RecordId, Route, RouteMeta, RouteRecord};
pub use router::{Resolved, Router, RouterBuilder};
pub use table::{RouteConfig, RouteMatcher, RouteTable};

//! Test utilities for transition and routing tests
//!
//! Provides a host simulation (render queue plus mounted views), a shared
//! in-memory backend the test can poke at, and recording guards.

#![allow(dead_code)]

use nav_transition::route::RouteRecord;
use nav_transition::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Route `RUST_LOG` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Recorder
// ============================================================================

/// Ordered log of labels written by guards and hooks.
#[derive(Clone, Default)]
pub struct Recorder(Rc<RefCell<Vec<String>>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, label: impl Into<String>) {
        self.0.borrow_mut().push(label.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Guard that logs `label` and proceeds.
    pub fn guard(&self, label: &str) -> impl NavigationGuard {
        let log = self.clone();
        let label = label.to_string();
        sync_guard_fn(move |_| {
            log.push(label.clone());
            NextAction::Proceed
        })
    }
}

/// Component whose enter, update and leave guards log `{name}:enter` etc.
pub fn component(name: &str, log: &Recorder) -> ComponentDef {
    ComponentDef::new(name)
        .before_enter(log.guard(&format!("{name}:enter")))
        .before_update(log.guard(&format!("{name}:update")))
        .before_leave(log.guard(&format!("{name}:leave")))
}

/// Compare recorded labels against string literals.
pub fn assert_log(log: &Recorder, expected: &[&str]) {
    let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    assert_eq!(log.entries(), expected);
}

// ============================================================================
// SharedBackend
// ============================================================================

/// Memory backend the test keeps a handle to, e.g. to simulate the user
/// typing a URL.
#[derive(Clone, Default)]
pub struct SharedBackend(Rc<RefCell<MemoryBackend>>);

impl SharedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial(path: &str) -> Self {
        Self(Rc::new(RefCell::new(MemoryBackend::with_initial(path))))
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().entries().to_vec()
    }

    pub fn index(&self) -> usize {
        self.0.borrow().index()
    }

    /// Change the location without telling the router.
    pub fn external_push(&self, path: &str) {
        self.0.borrow_mut().push_location(path);
    }
}

impl HistoryBackend for SharedBackend {
    fn current_location(&self) -> String {
        self.0.borrow().current_location()
    }

    fn push_location(&mut self, full_path: &str) {
        self.0.borrow_mut().push_location(full_path);
    }

    fn replace_location(&mut self, full_path: &str) {
        self.0.borrow_mut().replace_location(full_path);
    }

    fn go(&self, n: isize) -> Option<String> {
        self.0.borrow().go(n)
    }

    fn commit_go(&mut self, n: isize) {
        self.0.borrow_mut().commit_go(n);
    }
}

// ============================================================================
// PollOnlyBinding
// ============================================================================

/// Binding for a host that never reports finished renders; the engine has to
/// fall back to timed polls.
#[derive(Default)]
pub struct PollOnlyBinding {
    polls: RefCell<Vec<(Duration, Box<dyn FnOnce()>)>>,
}

impl PollOnlyBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intervals of the polls scheduled and not yet run.
    pub fn intervals(&self) -> Vec<Duration> {
        self.polls.borrow().iter().map(|(interval, _)| *interval).collect()
    }

    /// Fire every scheduled poll as if its interval elapsed. Returns how many
    /// ran; polls scheduled meanwhile wait for the next call.
    pub fn elapse(&self) -> usize {
        let polls = std::mem::take(&mut *self.polls.borrow_mut());
        let count = polls.len();
        for (_, callback) in polls {
            callback();
        }
        count
    }
}

impl ComponentBinding for PollOnlyBinding {
    fn defer_until_next_render(&self, _callback: Box<dyn FnOnce()>) {
        panic!("host without a render signal was asked to wait for a render");
    }

    fn has_render_signal(&self) -> bool {
        false
    }

    fn schedule_poll(&self, interval: Duration, callback: Box<dyn FnOnce()>) {
        self.polls.borrow_mut().push((interval, callback));
    }
}

// ============================================================================
// TestApp
// ============================================================================

/// A router wired to a render queue and a shared backend.
pub struct TestApp {
    pub router: Router,
    pub render_queue: Rc<RenderQueue>,
    pub backend: SharedBackend,
}

impl TestApp {
    pub fn new(routes: Vec<RouteConfig>) -> Self {
        Self::with_builder(RouterBuilder::new().routes(routes))
    }

    pub fn with_builder(builder: RouterBuilder) -> Self {
        Self::with_backend(builder, SharedBackend::new())
    }

    pub fn with_backend(builder: RouterBuilder, backend: SharedBackend) -> Self {
        init_logging();
        let render_queue = Rc::new(RenderQueue::new());
        let router = builder
            .backend(Box::new(backend.clone()))
            .binding(render_queue.clone())
            .build();
        Self {
            router,
            render_queue,
            backend,
        }
    }

    /// Build and run the initial navigation.
    pub fn started(routes: Vec<RouteConfig>) -> Self {
        let app = Self::new(routes);
        app.router.init();
        app
    }

    /// Full path of the current route.
    pub fn path(&self) -> String {
        self.router.current_route().full_path.clone()
    }

    /// Mount the views of the current route, unmount the rest, then flush.
    /// Returns how many deferred callbacks ran.
    pub fn render(&self) -> usize {
        let current = self.router.current_route();
        let records: Vec<Rc<RouteRecord>> = self.router.routes().records().to_vec();
        for record in records {
            let active = current.matched.iter().any(|m| Rc::ptr_eq(m, &record));
            for key in record.view_keys() {
                if !active {
                    record.clear_instance(&key);
                } else if record.instance(&key).is_none() {
                    record.set_instance(key.clone(), Rc::new(format!("{}#{}", record.path, key)));
                }
            }
        }
        self.render_queue.flush_render()
    }
}

/// Capture abort reasons delivered to `push_with` / `replace_with`.
#[derive(Clone, Default)]
pub struct Outcome {
    pub completed: Rc<RefCell<Vec<String>>>,
    pub aborted: Rc<RefCell<Vec<NavigationError>>>,
}

impl Outcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, router: &Router, to: impl Into<RawLocation>) {
        let completed = self.completed.clone();
        let aborted = self.aborted.clone();
        router.push_with(
            to,
            move |route| completed.borrow_mut().push(route.full_path.clone()),
            move |err| aborted.borrow_mut().push(err.clone()),
        );
    }

    pub fn completed(&self) -> Vec<String> {
        self.completed.borrow().clone()
    }

    pub fn aborted(&self) -> Vec<NavigationError> {
        self.aborted.borrow().clone()
    }
}

//! The navigation transition engine.
//!
//! [`History`] owns the authoritative `current` route and the in-flight
//! `pending` one. Every navigation request becomes a transition:
//!
//! ```text
//! match ──► same route? ──yes──► no-op abort (ready fires)
//!              │ no
//!              ▼
//!       pending = target
//!              │
//!   phase one: leave → before_each → update → before_enter → lazy load
//!              │
//!   phase two: enter → before_resolve
//!              │
//!       commit: pending = None, on_complete, sync location,
//!               current = target, listeners, after_each,
//!               post-enter callbacks, ready
//! ```
//!
//! Guards may resume their continuation at any time. Before acting on it the
//! engine checks that `pending` still is the transition's target; a newer
//! transition silently supersedes an older one, which then produces no
//! callbacks, no commit and no location re-sync.
//!
//! Everything here is single-threaded: state lives in `Cell`/`RefCell`, and
//! no borrow is held while user code runs.

use crate::backend::HistoryBackend;
use crate::components::{ComponentBinding, GuardStep};
use crate::error::NavigationError;
use crate::guards::{Next, NextAction};
use crate::hooks::{HookHandle, Hooks};
use crate::location::RawLocation;
use crate::pipeline::{build_phase_one, build_phase_two, diff_matched, PostEnter, PostEnterList};
use crate::queue::{run_queue, Continue};
use crate::route::{is_same_route, start_route, Route, RouteRecord};
use crate::table::RouteMatcher;
use crate::{debug_log, error_log, info_log, trace_log, warn_log};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Called with the committed route when a transition completes.
pub type CompleteCallback = Box<dyn FnOnce(&Rc<Route>)>;

/// Called with the reason when a transition does not commit.
pub type AbortCallback = Box<dyn FnOnce(&NavigationError)>;

/// Default length of a guard redirect chain before it is treated as an error.
pub const DEFAULT_REDIRECT_LIMIT: usize = 16;

/// Poll interval for post-enter callbacks when the binding has no render signal.
pub const POST_ENTER_POLL_INTERVAL: Duration = Duration::from_millis(16);

struct Transition {
    route: Rc<Route>,
    from: Rc<Route>,
    redirects: usize,
    on_complete: RefCell<Option<CompleteCallback>>,
    on_abort: RefCell<Option<AbortCallback>>,
}

struct HistoryInner {
    matcher: Rc<dyn RouteMatcher>,
    backend: RefCell<Box<dyn HistoryBackend>>,
    binding: Rc<dyn ComponentBinding>,
    hooks: Hooks,
    current: RefCell<Rc<Route>>,
    pending: RefCell<Option<Rc<Route>>>,
    ready: Cell<bool>,
    ready_callbacks: RefCell<Vec<CompleteCallback>>,
    ready_error_callbacks: RefCell<Vec<AbortCallback>>,
    redirect_limit: Option<usize>,
}

/// Transition state machine. Cloning yields another handle to the same engine.
#[derive(Clone)]
pub struct History {
    inner: Rc<HistoryInner>,
}

impl History {
    /// Create an engine sitting on the start route.
    ///
    /// `redirect_limit` caps guard redirect chains; `None` leaves them unbounded.
    pub fn new(
        matcher: Rc<dyn RouteMatcher>,
        backend: Box<dyn HistoryBackend>,
        binding: Rc<dyn ComponentBinding>,
        redirect_limit: Option<usize>,
    ) -> Self {
        Self {
            inner: Rc::new(HistoryInner {
                matcher,
                backend: RefCell::new(backend),
                binding,
                hooks: Hooks::default(),
                current: RefCell::new(start_route()),
                pending: RefCell::new(None),
                ready: Cell::new(false),
                ready_callbacks: RefCell::new(Vec::new()),
                ready_error_callbacks: RefCell::new(Vec::new()),
                redirect_limit,
            }),
        }
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    /// Last committed route.
    pub fn current(&self) -> Rc<Route> {
        self.inner.current.borrow().clone()
    }

    /// Target of the transition in flight, if any.
    pub fn pending(&self) -> Option<Rc<Route>> {
        self.inner.pending.borrow().clone()
    }

    /// `true` once the first transition has settled.
    pub fn is_ready(&self) -> bool {
        self.inner.ready.get()
    }

    /// Hook registries of this engine.
    pub fn hooks(&self) -> &Hooks {
        &self.inner.hooks
    }

    /// The binding this engine defers post-enter callbacks through.
    pub fn binding(&self) -> &Rc<dyn ComponentBinding> {
        &self.inner.binding
    }

    /// Full path the external location currently shows.
    pub fn current_location(&self) -> String {
        self.inner.backend.borrow().current_location()
    }

    /// Inspect the backend.
    pub fn with_backend<R>(&self, f: impl FnOnce(&dyn HistoryBackend) -> R) -> R {
        f(self.inner.backend.borrow().as_ref())
    }

    fn is_pending(&self, route: &Rc<Route>) -> bool {
        self.inner
            .pending
            .borrow()
            .as_ref()
            .is_some_and(|pending| Rc::ptr_eq(pending, route))
    }

    fn clear_pending(&self, route: &Rc<Route>) {
        if self.is_pending(route) {
            *self.inner.pending.borrow_mut() = None;
        }
    }

    fn ensure_location(&self, full_path: &str, push: bool) {
        self.inner
            .backend
            .borrow_mut()
            .ensure_location(full_path, push);
    }

    // ------------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------------

    /// Be told about every committed route.
    pub fn listen<F>(&self, listener: F) -> HookHandle
    where
        F: Fn(&Rc<Route>) + 'static,
    {
        self.inner.hooks.listeners.register(Rc::new(listener))
    }

    /// Be told about every error-like transition failure.
    pub fn on_error<F>(&self, callback: F) -> HookHandle
    where
        F: Fn(&NavigationError) + 'static,
    {
        self.inner.hooks.errors.register(Rc::new(callback))
    }

    /// Run `callback` once the first transition settles, or right away if it
    /// already has. `error_callback` runs instead if that first settlement is
    /// an error.
    pub fn on_ready(&self, callback: CompleteCallback, error_callback: Option<AbortCallback>) {
        if self.is_ready() {
            callback(&self.current());
            return;
        }
        self.inner.ready_callbacks.borrow_mut().push(callback);
        if let Some(error_callback) = error_callback {
            self.inner
                .ready_error_callbacks
                .borrow_mut()
                .push(error_callback);
        }
    }

    fn mark_ready(&self, route: &Rc<Route>) {
        if self.inner.ready.replace(true) {
            return;
        }
        self.inner.ready_error_callbacks.borrow_mut().clear();
        let callbacks = std::mem::take(&mut *self.inner.ready_callbacks.borrow_mut());
        debug_log!("Ready at '{}' ({} callback(s))", route.full_path, callbacks.len());
        for callback in callbacks {
            callback(route);
        }
    }

    fn mark_ready_error(&self, err: &NavigationError) {
        if self.inner.ready.replace(true) {
            return;
        }
        self.inner.ready_callbacks.borrow_mut().clear();
        let callbacks = std::mem::take(&mut *self.inner.ready_error_callbacks.borrow_mut());
        for callback in callbacks {
            callback(err);
        }
    }

    // ------------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------------

    /// Start a transition to `to` without touching the history stack on commit.
    pub fn transition_to(
        &self,
        to: impl Into<RawLocation>,
        on_complete: Option<CompleteCallback>,
        on_abort: Option<AbortCallback>,
    ) {
        self.navigate(to.into(), on_complete, on_abort, 0);
    }

    /// Navigate to `to`, adding a history entry on commit.
    pub fn push(
        &self,
        to: impl Into<RawLocation>,
        on_complete: Option<CompleteCallback>,
        on_abort: Option<AbortCallback>,
    ) {
        self.push_chain(to.into(), on_complete, on_abort, 0);
    }

    /// Navigate to `to`, overwriting the current history entry on commit.
    pub fn replace(
        &self,
        to: impl Into<RawLocation>,
        on_complete: Option<CompleteCallback>,
        on_abort: Option<AbortCallback>,
    ) {
        self.replace_chain(to.into(), on_complete, on_abort, 0);
    }

    /// Move `n` entries through the history stack.
    pub fn go(&self, n: isize) {
        let target = self.inner.backend.borrow().go(n);
        let Some(target) = target else {
            return;
        };

        let engine = self.clone();
        let on_complete: CompleteCallback = Box::new(move |_: &Rc<Route>| {
            engine.inner.backend.borrow_mut().commit_go(n);
        });

        let engine = self.clone();
        let target_path = target.clone();
        let on_abort: AbortCallback = Box::new(move |err: &NavigationError| {
            // Landing on the entry we already show still moves the position.
            if matches!(err, NavigationError::Aborted { reason: None })
                && engine.current().full_path == target_path
            {
                engine.inner.backend.borrow_mut().commit_go(n);
            }
        });

        self.navigate(RawLocation::Path(target), Some(on_complete), Some(on_abort), 0);
    }

    /// Re-resolve whatever the external location shows now, e.g. after the
    /// user pressed back in a browser.
    pub fn sync_external_location(&self) {
        let location = self.current_location();
        self.navigate(RawLocation::Path(location), None, None, 0);
    }

    fn push_chain(
        &self,
        to: RawLocation,
        on_complete: Option<CompleteCallback>,
        on_abort: Option<AbortCallback>,
        redirects: usize,
    ) {
        let engine = self.clone();
        let complete: CompleteCallback = Box::new(move |route: &Rc<Route>| {
            engine
                .inner
                .backend
                .borrow_mut()
                .push_location(&route.full_path);
            if let Some(on_complete) = on_complete {
                on_complete(route);
            }
        });
        self.navigate(to, Some(complete), on_abort, redirects);
    }

    fn replace_chain(
        &self,
        to: RawLocation,
        on_complete: Option<CompleteCallback>,
        on_abort: Option<AbortCallback>,
        redirects: usize,
    ) {
        let engine = self.clone();
        let complete: CompleteCallback = Box::new(move |route: &Rc<Route>| {
            engine
                .inner
                .backend
                .borrow_mut()
                .replace_location(&route.full_path);
            if let Some(on_complete) = on_complete {
                on_complete(route);
            }
        });
        self.navigate(to, Some(complete), on_abort, redirects);
    }

    // ------------------------------------------------------------------------
    // Transition
    // ------------------------------------------------------------------------

    fn navigate(
        &self,
        to: RawLocation,
        on_complete: Option<CompleteCallback>,
        on_abort: Option<AbortCallback>,
        redirects: usize,
    ) {
        let from = self.current();
        let route = self.inner.matcher.match_route(&to, Some(&from));
        debug_log!("Transition '{}' -> '{}' started", from.full_path, route.full_path);

        self.confirm(Rc::new(Transition {
            route,
            from,
            redirects,
            on_complete: RefCell::new(on_complete),
            on_abort: RefCell::new(on_abort),
        }));
    }

    fn confirm(&self, transition: Rc<Transition>) {
        let route = &transition.route;
        let from = &transition.from;

        if is_same_route(route, from) && route.matched.len() == from.matched.len() {
            debug_log!("Already at '{}'; navigation ignored", from.full_path);
            self.ensure_location(&from.full_path, false);
            let on_abort = transition.on_abort.borrow_mut().take();
            if let Some(on_abort) = on_abort {
                on_abort(&NavigationError::Aborted { reason: None });
            }
            self.mark_ready(from);
            return;
        }

        *self.inner.pending.borrow_mut() = Some(route.clone());

        let diff = diff_matched(&from.matched, &route.matched);
        trace_log!(
            "Diff for '{}': {} updated, {} activated, {} deactivated",
            route.full_path,
            diff.updated.len(),
            diff.activated.len(),
            diff.deactivated.len()
        );
        let queue = build_phase_one(
            &diff,
            self.inner.hooks.before_each.snapshot(),
            self.inner.binding.as_ref(),
        );

        let engine = self.clone();
        let phase_two = transition.clone();
        let activated = diff.activated;
        run_queue(queue, self.guard_runner(&transition), move || {
            engine.run_phase_two(phase_two, activated);
        });
    }

    fn run_phase_two(&self, transition: Rc<Transition>, activated: Vec<Rc<RouteRecord>>) {
        if !self.is_pending(&transition.route) {
            debug_log!(
                "Transition to '{}' superseded before enter guards",
                transition.route.full_path
            );
            return;
        }

        let post_enter: PostEnterList = Rc::new(RefCell::new(Vec::new()));
        let queue = build_phase_two(
            &activated,
            self.inner.hooks.before_resolve.snapshot(),
            self.inner.binding.as_ref(),
            &post_enter,
        );

        let engine = self.clone();
        let committing = transition.clone();
        run_queue(queue, self.guard_runner(&transition), move || {
            engine.commit(&committing, &post_enter);
        });
    }

    fn guard_runner(&self, transition: &Rc<Transition>) -> impl Fn(GuardStep, Continue) + 'static {
        let engine = self.clone();
        let transition = transition.clone();
        move |step: GuardStep, cont: Continue| {
            if !engine.is_pending(&transition.route) {
                debug_log!(
                    "Transition to '{}' superseded; remaining guards skipped",
                    transition.route.full_path
                );
                return;
            }

            let handler = engine.clone();
            let owner = transition.clone();
            let next = Next::new(move |action| handler.resolve_action(&owner, action, cont));

            if let Err(err) = step(&transition.route, &transition.from, next.clone()) {
                if next.is_resolved() {
                    debug_log!("Guard error after its continuation was resumed: {}", err);
                } else {
                    next.error(err);
                }
            }
        }
    }

    fn resolve_action(&self, transition: &Rc<Transition>, action: NextAction, cont: Continue) {
        if !self.is_pending(&transition.route) {
            debug_log!(
                "Ignoring {:?} from superseded transition to '{}'",
                action,
                transition.route.full_path
            );
            return;
        }

        match action {
            NextAction::Proceed => cont.resume(),
            NextAction::ProceedThen(_) => {
                trace_log!("Post-enter callback outside an enter guard dropped");
                cont.resume();
            }
            NextAction::Abort { reason } => {
                self.ensure_location(&self.current().full_path, true);
                self.abort(transition, NavigationError::Aborted { reason });
            }
            NextAction::Error(err) => {
                self.ensure_location(&self.current().full_path, true);
                self.abort(transition, NavigationError::Guard(err));
            }
            NextAction::Redirect { to } => self.redirect(transition, to),
        }
    }

    fn redirect(&self, transition: &Rc<Transition>, to: RawLocation) {
        let redirects = transition.redirects + 1;
        if let Some(limit) = self.inner.redirect_limit {
            if redirects > limit {
                warn_log!(
                    "Redirect chain exceeded {} while navigating to '{}'",
                    limit,
                    to
                );
                self.ensure_location(&self.current().full_path, true);
                self.abort(
                    transition,
                    NavigationError::RedirectLimit {
                        limit,
                        to: to.to_string(),
                    },
                );
                return;
            }
        }

        debug_log!(
            "Transition to '{}' redirected to '{}'",
            transition.route.full_path,
            to
        );
        self.abort(
            transition,
            NavigationError::Redirected { to: to.to_string() },
        );
        if to.wants_replace() {
            self.replace_chain(to, None, None, redirects);
        } else {
            self.push_chain(to, None, None, redirects);
        }
    }

    fn abort(&self, transition: &Transition, err: NavigationError) {
        self.clear_pending(&transition.route);

        if err.is_error() {
            let callbacks = self.inner.hooks.errors.snapshot();
            if callbacks.is_empty() {
                error_log!(
                    "Uncaught error during navigation to '{}': {}",
                    transition.route.full_path,
                    err
                );
            }
            for callback in callbacks {
                callback(&err);
            }
        } else {
            debug_log!(
                "Transition to '{}' aborted: {}",
                transition.route.full_path,
                err
            );
        }

        let on_abort = transition.on_abort.borrow_mut().take();
        if let Some(on_abort) = on_abort {
            on_abort(&err);
        }

        if err.is_error() {
            self.mark_ready_error(&err);
        }
    }

    fn commit(&self, transition: &Transition, post_enter: &PostEnterList) {
        let route = transition.route.clone();
        if !self.is_pending(&route) {
            debug_log!("Transition to '{}' superseded before commit", route.full_path);
            return;
        }
        *self.inner.pending.borrow_mut() = None;

        let on_complete = transition.on_complete.borrow_mut().take();
        if let Some(on_complete) = on_complete {
            on_complete(&route);
        }
        self.ensure_location(&route.full_path, false);

        let previous = self.inner.current.replace(route.clone());
        info_log!("Navigated '{}' -> '{}'", previous.full_path, route.full_path);

        for listener in self.inner.hooks.listeners.snapshot() {
            listener(&route);
        }
        for hook in self.inner.hooks.after_each.snapshot() {
            trace_log!("Running after hook {}", hook.name());
            hook.after_navigation(&route, &previous);
        }

        let entries = std::mem::take(&mut *post_enter.borrow_mut());
        for entry in entries {
            self.await_instance(route.clone(), entry);
        }

        self.mark_ready(&route);
    }

    // ------------------------------------------------------------------------
    // Post-enter callbacks
    // ------------------------------------------------------------------------

    fn await_instance(&self, route: Rc<Route>, entry: PostEnter) {
        let weak = Rc::downgrade(&self.inner);
        let wake: Box<dyn FnOnce()> = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                History { inner }.deliver_post_enter(route, entry);
            }
        });

        if self.inner.binding.has_render_signal() {
            self.inner.binding.defer_until_next_render(wake);
        } else {
            self.inner
                .binding
                .schedule_poll(POST_ENTER_POLL_INTERVAL, wake);
        }
    }

    fn deliver_post_enter(&self, route: Rc<Route>, entry: PostEnter) {
        if !Rc::ptr_eq(&self.current(), &route) {
            debug_log!(
                "Dropping post-enter callback for '{}': route changed",
                entry.record.path
            );
            return;
        }

        match entry.record.instance(&entry.view_key) {
            Some(instance) => (entry.callback)(instance),
            None => {
                trace_log!(
                    "View '{}' of '{}' not mounted yet; waiting",
                    entry.view_key,
                    entry.record.path
                );
                self.await_instance(route, entry);
            }
        }
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("current", &self.current().full_path)
            .field(
                "pending",
                &self.pending().map(|route| route.full_path.clone()),
            )
            .field("ready", &self.is_ready())
            .field("redirect_limit", &self.inner.redirect_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::components::RenderQueue;
    use crate::guards::{guard_fn, sync_guard_fn};
    use crate::table::{RouteConfig, RouteTable};

    fn engine(limit: Option<usize>) -> History {
        let table = RouteTable::new(vec![
            RouteConfig::new("/"),
            RouteConfig::new("/a"),
            RouteConfig::new("/b"),
            RouteConfig::new("/loop"),
        ]);
        History::new(
            Rc::new(RefCell::new(table)),
            Box::new(MemoryBackend::new()),
            Rc::new(RenderQueue::new()),
            limit,
        )
    }

    #[test]
    fn test_starts_on_start_route() {
        let history = engine(None);
        assert!(history.current().is_start());
        assert!(history.pending().is_none());
        assert!(!history.is_ready());
    }

    #[test]
    fn test_push_commits_and_records_entry() {
        let history = engine(None);
        history.push("/a", None, None);
        assert_eq!(history.current().full_path, "/a");
        assert!(history.is_ready());
        assert_eq!(history.current_location(), "/a");
        assert_eq!(history.with_backend(|b| b.go(-1)), Some("/".to_string()));
    }

    #[test]
    fn test_redirect_limit_stops_loops() {
        let history = engine(Some(3));
        let _loop = history
            .hooks()
            .before_each
            .register(Rc::new(sync_guard_fn(|ctx| {
                if ctx.to.path == "/loop" {
                    NextAction::redirect("/loop?again")
                } else {
                    NextAction::Proceed
                }
            })));
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        let _errors = history.on_error(move |err| sink.borrow_mut().push(err.to_string()));

        history.push("/loop", None, None);

        assert!(history.current().is_start());
        assert!(history.pending().is_none());
        assert_eq!(errors.borrow().len(), 1);
        assert!(errors.borrow()[0].contains("redirect limit of 3"));
    }

    #[test]
    fn test_guard_error_return_is_reported() {
        let history = engine(None);
        let _guard = history
            .hooks()
            .before_each
            .register(Rc::new(guard_fn(|_, _| Err("boom".into()))));
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        history.push(
            "/a",
            None,
            Some(Box::new(move |err: &NavigationError| {
                *sink.borrow_mut() = Some(err.to_string());
            })),
        );
        assert_eq!(seen.borrow().as_deref(), Some("guard failed: boom"));
        assert!(history.current().is_start());
    }
}

//! View components and the binding to the host UI layer.
//!
//! The engine never renders anything. It only needs three things from the
//! host, captured by [`ComponentBinding`]:
//!
//! - the component guards declared on matched records, in a given order
//! - a queue step that finishes once every lazy component is loaded
//! - a way to be woken after the next render pass
//!
//! The default implementations cover the first two from the
//! [`ComponentDef`]s stored on each [`RouteRecord`]. [`RenderQueue`] is a
//! minimal binding for hosts that can call [`RenderQueue::flush_render`] after
//! each frame.
//!
//! # Example
//!
//! ```
//! use nav_transition::{sync_guard_fn, ComponentDef, NextAction};
//!
//! let editor = ComponentDef::new("Editor")
//!     .before_leave(sync_guard_fn(|_| NextAction::deny("unsaved changes")));
//! assert_eq!(editor.before_route_leave.len(), 1);
//! ```

use crate::error::GuardError;
use crate::guards::{GuardContext, NavigationGuard, Next};
use crate::route::{Route, RouteRecord};
use crate::{debug_log, trace_log, warn_log};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// A mounted view, opaque to the engine.
pub type ViewInstance = Rc<dyn Any>;

/// View key used by [`RouteConfig::component`](crate::RouteConfig::component).
pub const DEFAULT_VIEW: &str = "default";

/// One step of a guard queue: called with `(to, from, next)`.
pub type GuardStep = Box<dyn FnOnce(&Rc<Route>, &Rc<Route>, Next) -> Result<(), GuardError>>;

/// Completion callback handed to a [`LazyComponent`].
pub type LoadCallback = Box<dyn FnOnce(Result<Rc<ComponentDef>, GuardError>)>;

// ============================================================================
// ComponentDef
// ============================================================================

/// A view definition with its in-component guards.
#[derive(Default)]
pub struct ComponentDef {
    /// Display name, used in logs.
    pub name: String,
    /// Run when a record using this component is activated. No instance yet.
    pub before_route_enter: Vec<Rc<dyn NavigationGuard>>,
    /// Run when the record stays matched but the route changes.
    pub before_route_update: Vec<Rc<dyn NavigationGuard>>,
    /// Run when the record is deactivated.
    pub before_route_leave: Vec<Rc<dyn NavigationGuard>>,
}

impl ComponentDef {
    /// Create a component with no guards.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an enter guard.
    pub fn before_enter<G: NavigationGuard>(mut self, guard: G) -> Self {
        self.before_route_enter.push(Rc::new(guard));
        self
    }

    /// Add an update guard.
    pub fn before_update<G: NavigationGuard>(mut self, guard: G) -> Self {
        self.before_route_update.push(Rc::new(guard));
        self
    }

    /// Add a leave guard.
    pub fn before_leave<G: NavigationGuard>(mut self, guard: G) -> Self {
        self.before_route_leave.push(Rc::new(guard));
        self
    }

    /// Guards of `kind`, in declaration order.
    pub fn guards(&self, kind: GuardKind) -> &[Rc<dyn NavigationGuard>] {
        match kind {
            GuardKind::Enter => &self.before_route_enter,
            GuardKind::Update => &self.before_route_update,
            GuardKind::Leave => &self.before_route_leave,
        }
    }
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef")
            .field("name", &self.name)
            .field("enter_guards", &self.before_route_enter.len())
            .field("update_guards", &self.before_route_update.len())
            .field("leave_guards", &self.before_route_leave.len())
            .finish()
    }
}

/// Which in-component guard list to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardKind {
    /// `before_route_enter`
    Enter,
    /// `before_route_update`
    Update,
    /// `before_route_leave`
    Leave,
}

// ============================================================================
// Lazy components
// ============================================================================

/// A component whose definition is loaded on demand.
///
/// `load` may call `done` synchronously or at any later point.
pub trait LazyComponent: 'static {
    /// Start loading and report the result through `done`.
    fn load(&self, done: LoadCallback);
}

/// Create a lazy component from a closure.
pub const fn lazy_fn<F>(f: F) -> FnLazy<F>
where
    F: Fn(LoadCallback) + 'static,
{
    FnLazy { f }
}

/// Lazy component created from a closure via [`lazy_fn`].
pub struct FnLazy<F> {
    f: F,
}

impl<F> LazyComponent for FnLazy<F>
where
    F: Fn(LoadCallback) + 'static,
{
    fn load(&self, done: LoadCallback) {
        (self.f)(done);
    }
}

/// A component slot on a record: loaded or still lazy.
#[derive(Clone)]
pub enum Component {
    /// Definition available.
    Ready(Rc<ComponentDef>),
    /// Definition must be loaded first.
    Lazy(Rc<dyn LazyComponent>),
}

impl Component {
    /// The definition, if loaded.
    pub fn resolved(&self) -> Option<Rc<ComponentDef>> {
        match self {
            Self::Ready(def) => Some(def.clone()),
            Self::Lazy(_) => None,
        }
    }

    /// `true` while the definition still has to be loaded.
    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Lazy(_))
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(def) => f.debug_tuple("Ready").field(&def.name).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

// ============================================================================
// Guard extraction
// ============================================================================

/// A component guard together with the record and view it belongs to.
#[derive(Clone)]
pub struct ExtractedGuard {
    /// The guard itself.
    pub guard: Rc<dyn NavigationGuard>,
    /// Record whose component declared it.
    pub record: Rc<RouteRecord>,
    /// View key of that component.
    pub view_key: String,
}

impl fmt::Debug for ExtractedGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractedGuard")
            .field("guard", &self.guard.name())
            .field("record", &self.record.path)
            .field("view_key", &self.view_key)
            .finish()
    }
}

/// Collect `kind` guards from the resolved components of `records`.
///
/// Guards come out root-to-leaf, components in declaration order; `reverse`
/// flips the whole list. Components that are still lazy contribute nothing.
pub fn extract_component_guards(
    records: &[Rc<RouteRecord>],
    kind: GuardKind,
    reverse: bool,
) -> Vec<ExtractedGuard> {
    let mut guards = Vec::new();
    for record in records {
        for (view_key, component) in record.components() {
            let Some(def) = component.resolved() else {
                continue;
            };
            for guard in def.guards(kind) {
                guards.push(ExtractedGuard {
                    guard: guard.clone(),
                    record: record.clone(),
                    view_key: view_key.clone(),
                });
            }
        }
    }
    if reverse {
        guards.reverse();
    }
    guards
}

/// Queue step that loads every lazy component of `records`.
///
/// Loads start together. Each result is stored on its record as it arrives;
/// the step proceeds once all have loaded, or fails with the first error.
pub fn resolve_lazy_components(records: Vec<Rc<RouteRecord>>) -> GuardStep {
    Box::new(move |_to: &Rc<Route>, _from: &Rc<Route>, next: Next| {
        let lazies: Vec<_> = records
            .iter()
            .flat_map(|record| {
                record
                    .components()
                    .into_iter()
                    .filter_map(move |(key, component)| match component {
                        Component::Lazy(loader) => Some((record.clone(), key, loader)),
                        Component::Ready(_) => None,
                    })
            })
            .collect();

        if lazies.is_empty() {
            next.proceed();
            return Ok(());
        }

        debug_log!("Loading {} lazy component(s)", lazies.len());
        let remaining = Rc::new(Cell::new(lazies.len()));
        let failed = Rc::new(Cell::new(false));

        for (record, key, loader) in lazies {
            let remaining = remaining.clone();
            let failed = failed.clone();
            let next = next.clone();
            loader.load(Box::new(move |result: Result<Rc<ComponentDef>, GuardError>| match result {
                Ok(def) => {
                    trace_log!("Lazy component '{}' loaded for '{}'", key, record.path);
                    record.set_resolved_component(&key, def);
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 && !failed.get() {
                        next.proceed();
                    }
                }
                Err(err) => {
                    if !failed.replace(true) {
                        next.error(err);
                    }
                }
            }));
        }
        Ok(())
    })
}

// ============================================================================
// ComponentBinding
// ============================================================================

/// The host UI layer, as seen by the engine.
pub trait ComponentBinding {
    /// Guards of `kind` declared on `records`.
    fn extract_guards(
        &self,
        records: &[Rc<RouteRecord>],
        kind: GuardKind,
        reverse: bool,
    ) -> Vec<ExtractedGuard> {
        extract_component_guards(records, kind, reverse)
    }

    /// A single queue step that completes when every lazy component of
    /// `records` is loaded.
    fn resolve_async_components(&self, records: &[Rc<RouteRecord>]) -> GuardStep {
        resolve_lazy_components(records.to_vec())
    }

    /// Run `callback` after the next render pass.
    fn defer_until_next_render(&self, callback: Box<dyn FnOnce()>);

    /// `false` if the host never signals render completion, in which case the
    /// engine polls through [`schedule_poll`](Self::schedule_poll).
    fn has_render_signal(&self) -> bool {
        true
    }

    /// Run `callback` after roughly `interval`.
    ///
    /// Bindings that return `false` from
    /// [`has_render_signal`](Self::has_render_signal) must override this.
    /// The default waits for the next render instead, which such a host never
    /// reports, so the callback would not run.
    fn schedule_poll(&self, interval: Duration, callback: Box<dyn FnOnce()>) {
        if !self.has_render_signal() {
            warn_log!(
                "Binding has no render signal and no schedule_poll; poll after {:?} waits for a render",
                interval
            );
        }
        self.defer_until_next_render(callback);
    }
}

/// Binding for hosts that report each finished frame.
///
/// Deferred callbacks accumulate until [`flush_render`](Self::flush_render);
/// callbacks deferred while flushing wait for the following flush.
#[derive(Default)]
pub struct RenderQueue {
    pending: RefCell<Vec<Box<dyn FnOnce()>>>,
    renders: Cell<usize>,
}

impl RenderQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that a render pass finished and run what was waiting for it.
    /// Returns how many callbacks ran.
    pub fn flush_render(&self) -> usize {
        let batch = std::mem::take(&mut *self.pending.borrow_mut());
        self.renders.set(self.renders.get() + 1);
        let count = batch.len();
        for callback in batch {
            callback();
        }
        count
    }

    /// Callbacks waiting for the next render.
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Number of render passes flushed so far.
    pub fn renders(&self) -> usize {
        self.renders.get()
    }
}

impl fmt::Debug for RenderQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderQueue")
            .field("pending", &self.pending())
            .field("renders", &self.renders())
            .finish()
    }
}

impl ComponentBinding for RenderQueue {
    fn defer_until_next_render(&self, callback: Box<dyn FnOnce()>) {
        self.pending.borrow_mut().push(callback);
    }
}

/// Bind a leave or update guard to its mounted instance.
///
/// Without an instance there is nothing to guard, so no step is produced.
pub fn bind_instance_guard(extracted: ExtractedGuard) -> Option<GuardStep> {
    let instance = extracted.record.instance(&extracted.view_key)?;
    Some(Box::new(move |to: &Rc<Route>, from: &Rc<Route>, next: Next| {
        trace_log!(
            "Running {} for view '{}' of '{}'",
            extracted.guard.name(),
            extracted.view_key,
            extracted.record.path
        );
        let ctx = GuardContext {
            to,
            from,
            instance: Some(&instance),
        };
        extracted.guard.check(&ctx, next)
    }))
}

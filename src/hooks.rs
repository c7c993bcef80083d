//! Hook registries owned by one engine instance.
//!
//! Every registration returns a [`HookHandle`]. Dropping the handle keeps the
//! hook registered; call [`HookHandle::remove`] to take it out. Invocation
//! always works on a snapshot, so hooks may register or remove hooks while
//! running without affecting the current round.

use crate::error::NavigationError;
use crate::guards::{AfterHook, NavigationGuard};
use crate::route::Route;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Listener told about every committed route.
pub type RouteListener = dyn Fn(&Rc<Route>);

/// Callback told about every error-like transition failure.
pub type ErrorCallback = dyn Fn(&NavigationError);

type Entries<T> = RefCell<Vec<(u64, Rc<T>)>>;

/// Ordered list of hooks of one kind.
pub struct HookList<T: ?Sized> {
    entries: Rc<Entries<T>>,
    next_id: Cell<u64>,
}

impl<T: ?Sized + 'static> HookList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(Vec::new())),
            next_id: Cell::new(0),
        }
    }

    /// Append `hook`; it runs after every hook registered before it.
    pub fn register(&self, hook: Rc<T>) -> HookHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push((id, hook));

        let entries: Weak<Entries<T>> = Rc::downgrade(&self.entries);
        HookHandle {
            remove: Some(Box::new(move || {
                let Some(entries) = entries.upgrade() else {
                    return false;
                };
                let mut entries = entries.borrow_mut();
                let before = entries.len();
                entries.retain(|(entry_id, _)| *entry_id != id);
                entries.len() != before
            })),
        }
    }

    /// The hooks currently registered, in registration order.
    pub fn snapshot(&self) -> Vec<Rc<T>> {
        self.entries
            .borrow()
            .iter()
            .map(|(_, hook)| hook.clone())
            .collect()
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<T: ?Sized + 'static> Default for HookList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for HookList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookList")
            .field("len", &self.entries.borrow().len())
            .finish()
    }
}

/// Deregistration handle for one hook.
#[must_use = "dropping the handle keeps the hook registered forever"]
pub struct HookHandle {
    remove: Option<Box<dyn FnOnce() -> bool>>,
}

impl HookHandle {
    /// Remove the hook. Returns `false` if it was already gone or its
    /// registry no longer exists.
    pub fn remove(mut self) -> bool {
        self.remove.take().is_some_and(|remove| remove())
    }
}

impl fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HookHandle")
    }
}

/// All hook lists of one engine.
#[derive(Debug, Default)]
pub struct Hooks {
    /// Global guards run in phase one, after leave guards.
    pub before_each: HookList<dyn NavigationGuard>,
    /// Global guards run at the end of phase two.
    pub before_resolve: HookList<dyn NavigationGuard>,
    /// Run after each commit.
    pub after_each: HookList<dyn AfterHook>,
    /// Change listeners, run after each commit before the after hooks.
    pub listeners: HookList<RouteListener>,
    /// Error callbacks.
    pub errors: HookList<ErrorCallback>,
}

//! Navigation guards and the continuation they resume.
//!
//! Guards run **before** a transition commits. Each one receives a
//! [`GuardContext`] (the target route, the route being left, and the bound
//! view instance for component guards) plus a [`Next`] continuation. The
//! guard decides by resuming `next` exactly once with a [`NextAction`]:
//!
//! | Action | Effect |
//! |--------|--------|
//! | [`Proceed`](NextAction::Proceed) | run the next guard |
//! | [`ProceedThen`](NextAction::ProceedThen) | proceed; enter guards also get the callback run with the mounted view |
//! | [`Abort`](NextAction::Abort) | stop, re-sync the external location |
//! | [`Redirect`](NextAction::Redirect) | stop and start a new transition |
//! | [`Error`](NextAction::Error) | stop, report to error callbacks |
//!
//! A guard may resume `next` synchronously or keep it and resume later (after
//! a timer, a network response, a confirmation dialog). Not resuming it at all
//! stalls the transition. Returning `Err` from [`NavigationGuard::check`]
//! before resuming is the same as `next.error(err)`.
//!
//! # Creating guards
//!
//! | Approach | When to use |
//! |----------|-------------|
//! | Implement [`NavigationGuard`] | Full control, named |
//! | [`guard_fn`] | Closure that drives `next` itself (sync or async) |
//! | [`sync_guard_fn`] | Closure that returns a [`NextAction`] immediately |
//!
//! # Example
//!
//! ```
//! use nav_transition::{sync_guard_fn, NavigationGuard, NextAction};
//!
//! let auth = sync_guard_fn(|ctx| {
//!     if ctx.to.meta.contains_key("requires_auth") {
//!         NextAction::redirect("/login")
//!     } else {
//!         NextAction::Proceed
//!     }
//! });
//! assert_eq!(auth.name(), "NavigationGuard");
//! ```

use crate::components::ViewInstance;
use crate::error::GuardError;
use crate::location::RawLocation;
use crate::route::Route;
use crate::warn_log;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Callback deferred by an enter guard until its view instance exists.
pub type PostEnterCallback = Box<dyn FnOnce(ViewInstance)>;

// ============================================================================
// NextAction
// ============================================================================

/// What a guard asks the engine to do.
pub enum NextAction {
    /// Continue with the next guard.
    Proceed,

    /// Continue, and once the entered view is mounted hand it to the callback.
    ///
    /// Only enter guards can defer callbacks; elsewhere this is a plain proceed.
    ProceedThen(PostEnterCallback),

    /// Stop the transition without an error.
    Abort {
        /// Optional human-readable reason.
        reason: Option<String>,
    },

    /// Stop and navigate somewhere else instead. A structured target with
    /// `replace` set replaces the history entry.
    Redirect {
        /// The new target.
        to: RawLocation,
    },

    /// Stop the transition with an error.
    Error(GuardError),
}

impl NextAction {
    /// Abort without a reason.
    pub fn abort() -> Self {
        Self::Abort { reason: None }
    }

    /// Abort with a human-readable reason.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Abort {
            reason: Some(reason.into()),
        }
    }

    /// Redirect to `to`.
    pub fn redirect(to: impl Into<RawLocation>) -> Self {
        Self::Redirect { to: to.into() }
    }

    /// Fail with `err`.
    pub fn error(err: impl Into<GuardError>) -> Self {
        Self::Error(err.into())
    }

    /// Proceed and run `callback` with the mounted view instance.
    pub fn then<F>(callback: F) -> Self
    where
        F: FnOnce(ViewInstance) + 'static,
    {
        Self::ProceedThen(Box::new(callback))
    }

    /// `true` for `Proceed` and `ProceedThen`.
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed | Self::ProceedThen(_))
    }

    /// `true` for `Abort`.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Abort { .. })
    }

    /// `true` for `Redirect`.
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }

    /// The redirect target, if this is a redirect.
    pub fn redirect_target(&self) -> Option<&RawLocation> {
        match self {
            Self::Redirect { to } => Some(to),
            _ => None,
        }
    }
}

impl fmt::Debug for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proceed => f.write_str("Proceed"),
            Self::ProceedThen(_) => f.write_str("ProceedThen(..)"),
            Self::Abort { reason } => f.debug_struct("Abort").field("reason", reason).finish(),
            Self::Redirect { to } => f.debug_struct("Redirect").field("to", to).finish(),
            Self::Error(err) => f.debug_tuple("Error").field(err).finish(),
        }
    }
}

// ============================================================================
// Next
// ============================================================================

type Resume = Box<dyn FnOnce(NextAction)>;

/// One-shot continuation handed to a guard.
///
/// Cloning shares the same slot, so whichever clone resumes first wins and
/// every later resume is ignored with a warning.
#[derive(Clone)]
pub struct Next {
    slot: Rc<RefCell<Option<Resume>>>,
}

impl Next {
    /// Wrap `resume` as a continuation.
    pub fn new<F>(resume: F) -> Self
    where
        F: FnOnce(NextAction) + 'static,
    {
        Self {
            slot: Rc::new(RefCell::new(Some(Box::new(resume)))),
        }
    }

    /// Resume with `action`.
    pub fn call(self, action: NextAction) {
        let resume = self.slot.borrow_mut().take();
        match resume {
            Some(resume) => resume(action),
            None => {
                warn_log!("Guard continuation resumed more than once; ignoring {:?}", action);
            }
        }
    }

    /// Resume with [`NextAction::Proceed`].
    pub fn proceed(self) {
        self.call(NextAction::Proceed);
    }

    /// Resume with an abort without a reason.
    pub fn abort(self) {
        self.call(NextAction::abort());
    }

    /// Resume with an abort carrying `reason`.
    pub fn deny(self, reason: impl Into<String>) {
        self.call(NextAction::deny(reason));
    }

    /// Resume with a redirect to `to`.
    pub fn redirect(self, to: impl Into<RawLocation>) {
        self.call(NextAction::redirect(to));
    }

    /// Resume with an error.
    pub fn error(self, err: impl Into<GuardError>) {
        self.call(NextAction::error(err));
    }

    /// Proceed and defer `callback` until the view is mounted.
    pub fn then<F>(self, callback: F)
    where
        F: FnOnce(ViewInstance) + 'static,
    {
        self.call(NextAction::then(callback));
    }

    /// `true` once any clone of this continuation has been resumed.
    pub fn is_resolved(&self) -> bool {
        self.slot.borrow().is_none()
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

// ============================================================================
// NavigationGuard trait
// ============================================================================

/// Everything a guard gets to look at.
#[derive(Clone, Copy)]
pub struct GuardContext<'a> {
    /// Route being navigated to.
    pub to: &'a Rc<Route>,
    /// Route being left.
    pub from: &'a Rc<Route>,
    /// Mounted view for leave and update guards; `None` for global, per-record
    /// and enter guards.
    pub instance: Option<&'a ViewInstance>,
}

impl fmt::Debug for GuardContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardContext")
            .field("to", &self.to.full_path)
            .field("from", &self.from.full_path)
            .field("has_instance", &self.instance.is_some())
            .finish()
    }
}

/// A guard that decides whether a transition may continue.
///
/// # Example
///
/// ```
/// use nav_transition::{GuardContext, GuardError, NavigationGuard, Next};
///
/// struct UnsavedChanges {
///     dirty: bool,
/// }
///
/// impl NavigationGuard for UnsavedChanges {
///     fn check(&self, _ctx: &GuardContext<'_>, next: Next) -> Result<(), GuardError> {
///         if self.dirty {
///             next.deny("unsaved changes");
///         } else {
///             next.proceed();
///         }
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "UnsavedChanges"
///     }
/// }
/// ```
pub trait NavigationGuard: 'static {
    /// Inspect the transition and resume `next`, now or later.
    fn check(&self, ctx: &GuardContext<'_>, next: Next) -> Result<(), GuardError>;

    /// Guard name for logs.
    fn name(&self) -> &'static str {
        "NavigationGuard"
    }
}

/// Create a guard from a closure that drives `next` itself.
///
/// ```
/// use nav_transition::guard_fn;
///
/// let guard = guard_fn(|_ctx, next| {
///     next.proceed();
///     Ok(())
/// });
/// ```
pub const fn guard_fn<F>(f: F) -> FnGuard<F>
where
    F: Fn(&GuardContext<'_>, Next) -> Result<(), GuardError> + 'static,
{
    FnGuard { f }
}

/// Guard created from a closure via [`guard_fn`].
pub struct FnGuard<F> {
    f: F,
}

impl<F> NavigationGuard for FnGuard<F>
where
    F: Fn(&GuardContext<'_>, Next) -> Result<(), GuardError> + 'static,
{
    fn check(&self, ctx: &GuardContext<'_>, next: Next) -> Result<(), GuardError> {
        (self.f)(ctx, next)
    }
}

/// Create a guard from a closure that decides synchronously.
pub const fn sync_guard_fn<F>(f: F) -> SyncGuard<F>
where
    F: Fn(&GuardContext<'_>) -> NextAction + 'static,
{
    SyncGuard { f }
}

/// Guard created from a closure via [`sync_guard_fn`].
pub struct SyncGuard<F> {
    f: F,
}

impl<F> NavigationGuard for SyncGuard<F>
where
    F: Fn(&GuardContext<'_>) -> NextAction + 'static,
{
    fn check(&self, ctx: &GuardContext<'_>, next: Next) -> Result<(), GuardError> {
        next.call((self.f)(ctx));
        Ok(())
    }
}

// ============================================================================
// AfterHook trait
// ============================================================================

/// Hook run after a transition commits. It cannot affect the navigation.
pub trait AfterHook: 'static {
    /// Called with the committed route and the route it replaced.
    fn after_navigation(&self, to: &Rc<Route>, from: &Rc<Route>);

    /// Hook name for logs.
    fn name(&self) -> &'static str {
        "AfterHook"
    }
}

/// Create an after hook from a closure.
///
/// ```
/// use nav_transition::after_fn;
///
/// let hook = after_fn(|to, from| {
///     println!("{} -> {}", from.full_path, to.full_path);
/// });
/// ```
pub const fn after_fn<F>(f: F) -> FnAfterHook<F>
where
    F: Fn(&Rc<Route>, &Rc<Route>) + 'static,
{
    FnAfterHook { f }
}

/// After hook created from a closure via [`after_fn`].
pub struct FnAfterHook<F> {
    f: F,
}

impl<F> AfterHook for FnAfterHook<F>
where
    F: Fn(&Rc<Route>, &Rc<Route>) + 'static,
{
    fn after_navigation(&self, to: &Rc<Route>, from: &Rc<Route>) {
        (self.f)(to, from);
    }
}

// ============================================================================
// Tests
// ============================================================================

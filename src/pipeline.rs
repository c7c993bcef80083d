//! Matched-chain diffing and guard queue construction.
//!
//! A transition only runs guards for the records whose identity changes. Given
//! the current and target matched chains, [`diff_matched`] splits them at the
//! first differing record:
//!
//! ```text
//! current: [A, B, C]      updated:     [A]
//! target:  [A, D]    ->   deactivated: [B, C]
//!                         activated:   [D]
//! ```
//!
//! Phase one ([`build_phase_one`]) runs leave guards of `deactivated` (leaf
//! first), global before hooks, update guards of `updated`, `before_enter` of
//! each activated record, and finally loads lazy components of `activated`.
//! Phase two ([`build_phase_two`]) runs enter guards of `activated` and the
//! global resolve hooks. Enter guards may proceed with a callback, which is
//! parked in a [`PostEnterList`] until the view is mounted.

use crate::components::{bind_instance_guard, ComponentBinding, ExtractedGuard, GuardKind, GuardStep};
use crate::guards::{GuardContext, NavigationGuard, Next, NextAction, PostEnterCallback};
use crate::route::{Route, RouteRecord};
use crate::trace_log;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// How two matched chains relate.
#[derive(Debug, Clone, Default)]
pub struct RouteDiff {
    /// Shared prefix, kept mounted.
    pub updated: Vec<Rc<RouteRecord>>,
    /// Records entered by the target.
    pub activated: Vec<Rc<RouteRecord>>,
    /// Records left behind by the current route.
    pub deactivated: Vec<Rc<RouteRecord>>,
}

/// Split `current` and `next` at the first index whose records differ by
/// identity.
pub fn diff_matched(current: &[Rc<RouteRecord>], next: &[Rc<RouteRecord>]) -> RouteDiff {
    let max = current.len().max(next.len());
    let split = (0..max)
        .find(|&i| match (current.get(i), next.get(i)) {
            (Some(a), Some(b)) => !Rc::ptr_eq(a, b),
            _ => true,
        })
        .unwrap_or(max);

    RouteDiff {
        updated: next[..split.min(next.len())].to_vec(),
        activated: next[split.min(next.len())..].to_vec(),
        deactivated: current[split.min(current.len())..].to_vec(),
    }
}

/// A deferred enter-guard callback waiting for its view.
pub struct PostEnter {
    /// Record whose view is awaited.
    pub record: Rc<RouteRecord>,
    /// View key on that record.
    pub view_key: String,
    /// Callback to run with the mounted instance.
    pub callback: PostEnterCallback,
}

impl fmt::Debug for PostEnter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostEnter")
            .field("record", &self.record.path)
            .field("view_key", &self.view_key)
            .finish()
    }
}

/// Callbacks collected by the enter guards of one transition.
pub type PostEnterList = Rc<RefCell<Vec<PostEnter>>>;

/// Wrap a guard that has no instance to bind (global hooks, `before_enter`).
pub fn bind_global_guard(guard: Rc<dyn NavigationGuard>) -> GuardStep {
    Box::new(move |to: &Rc<Route>, from: &Rc<Route>, next: Next| {
        trace_log!("Running {} for '{}'", guard.name(), to.full_path);
        let ctx = GuardContext {
            to,
            from,
            instance: None,
        };
        guard.check(&ctx, next)
    })
}

/// Wrap an enter guard so a `ProceedThen` callback lands in `post_enter`.
pub fn bind_enter_guard(extracted: ExtractedGuard, post_enter: PostEnterList) -> GuardStep {
    Box::new(move |to: &Rc<Route>, from: &Rc<Route>, next: Next| {
        trace_log!(
            "Running {} for view '{}' of '{}'",
            extracted.guard.name(),
            extracted.view_key,
            extracted.record.path
        );
        let record = extracted.record.clone();
        let view_key = extracted.view_key.clone();
        let wrapped = Next::new(move |action| match action {
            NextAction::ProceedThen(callback) => {
                post_enter.borrow_mut().push(PostEnter {
                    record,
                    view_key,
                    callback,
                });
                next.proceed();
            }
            other => next.call(other),
        });
        let ctx = GuardContext {
            to,
            from,
            instance: None,
        };
        extracted.guard.check(&ctx, wrapped)
    })
}

/// Phase one: leave, before-each, update, `before_enter`, lazy loading.
pub fn build_phase_one(
    diff: &RouteDiff,
    before_each: Vec<Rc<dyn NavigationGuard>>,
    binding: &dyn ComponentBinding,
) -> Vec<Option<GuardStep>> {
    let mut queue: Vec<Option<GuardStep>> = Vec::new();

    queue.extend(
        binding
            .extract_guards(&diff.deactivated, GuardKind::Leave, true)
            .into_iter()
            .map(bind_instance_guard),
    );
    queue.extend(before_each.into_iter().map(|hook| Some(bind_global_guard(hook))));
    queue.extend(
        binding
            .extract_guards(&diff.updated, GuardKind::Update, false)
            .into_iter()
            .map(bind_instance_guard),
    );
    queue.extend(
        diff.activated
            .iter()
            .map(|record| record.before_enter.clone().map(bind_global_guard)),
    );
    queue.push(Some(binding.resolve_async_components(&diff.activated)));

    queue
}

/// Phase two: enter guards of `activated`, then resolve hooks.
pub fn build_phase_two(
    activated: &[Rc<RouteRecord>],
    before_resolve: Vec<Rc<dyn NavigationGuard>>,
    binding: &dyn ComponentBinding,
    post_enter: &PostEnterList,
) -> Vec<Option<GuardStep>> {
    let mut queue: Vec<Option<GuardStep>> = binding
        .extract_guards(activated, GuardKind::Enter, false)
        .into_iter()
        .map(|extracted| Some(bind_enter_guard(extracted, post_enter.clone())))
        .collect();
    queue.extend(before_resolve.into_iter().map(|hook| Some(bind_global_guard(hook))));
    queue
}

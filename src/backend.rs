//! External location synchronization.
//!
//! A [`HistoryBackend`] is the engine's view of wherever the location lives
//! outside the engine: a browser URL, a hash fragment, a deep-link handler.
//! The engine reads it on startup, writes it when transitions commit, and
//! forces it back after aborted transitions.
//!
//! [`MemoryBackend`] keeps the entries in memory, for hosts without an
//! external location and for tests.

use crate::{debug_log, trace_log};

/// The external location, as seen by the engine.
pub trait HistoryBackend {
    /// Full path the external location currently shows.
    fn current_location(&self) -> String;

    /// Add a new entry.
    fn push_location(&mut self, full_path: &str);

    /// Overwrite the current entry.
    fn replace_location(&mut self, full_path: &str);

    /// Make the external location show `full_path` if it drifted, pushing a new
    /// entry when `push` is set and replacing the current one otherwise.
    fn ensure_location(&mut self, full_path: &str, push: bool) {
        if self.current_location() == full_path {
            return;
        }
        trace_log!("Re-syncing external location to '{}'", full_path);
        if push {
            self.push_location(full_path);
        } else {
            self.replace_location(full_path);
        }
    }

    /// Entry `n` steps away from the current one, or `None` if out of range.
    fn go(&self, n: isize) -> Option<String>;

    /// Move the current position by `n` once the engine accepted the target.
    fn commit_go(&mut self, n: isize);
}

/// In-memory entry stack.
///
/// Pushing drops every entry ahead of the current position. `go` only looks up
/// the target; the position moves on [`commit_go`](HistoryBackend::commit_go).
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    stack: Vec<String>,
    index: usize,
}

impl MemoryBackend {
    /// Start at `/`.
    pub fn new() -> Self {
        Self::with_initial("/")
    }

    /// Start at `full_path`.
    pub fn with_initial(full_path: impl Into<String>) -> Self {
        Self {
            stack: vec![full_path.into()],
            index: 0,
        }
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.stack
    }

    /// Position of the current entry.
    pub fn index(&self) -> usize {
        self.index
    }

    fn target_index(&self, n: isize) -> Option<usize> {
        self.index
            .checked_add_signed(n)
            .filter(|target| *target < self.stack.len())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryBackend for MemoryBackend {
    fn current_location(&self) -> String {
        self.stack.get(self.index).cloned().unwrap_or_else(|| "/".to_string())
    }

    fn push_location(&mut self, full_path: &str) {
        self.stack.truncate(self.index + 1);
        self.stack.push(full_path.to_string());
        self.index = self.stack.len() - 1;
    }

    fn replace_location(&mut self, full_path: &str) {
        match self.stack.get_mut(self.index) {
            Some(entry) => *entry = full_path.to_string(),
            None => self.stack.push(full_path.to_string()),
        }
    }

    fn go(&self, n: isize) -> Option<String> {
        let target = self.target_index(n);
        if target.is_none() {
            debug_log!("go({}) from entry {} is out of range", n, self.index);
        }
        target.map(|target| self.stack[target].clone())
    }

    fn commit_go(&mut self, n: isize) {
        if let Some(target) = self.target_index(n) {
            self.index = target;
        }
    }
}

//! Failure taxonomy for navigation.
//!
//! Nothing in this module is ever returned from a public engine entry point.
//! Transition failures are delivered to abort and error callbacks, and the two
//! recoverable utility failures ([`DecodeError`], [`MissingParamError`]) are
//! handled where they occur by logging a warning and substituting an empty
//! value.
//!
//! | Type | Raised when | Observed through |
//! |------|-------------|------------------|
//! | [`NavigationError::Aborted`] | same-route no-op, `next` aborted | `on_abort` |
//! | [`NavigationError::Redirected`] | a guard redirected | `on_abort` |
//! | [`NavigationError::Guard`] | a guard failed | `on_abort`, `on_error` |
//! | [`NavigationError::RedirectLimit`] | redirect chain too long | `on_abort`, `on_error` |
//! | [`DecodeError`] | malformed query string | warning, empty query |
//! | [`MissingParamError`] | path template lacks a param | warning, empty path |
//!
//! # Examples
//!
//! ```
//! use nav_transition::{GuardError, NavigationError};
//!
//! let err = NavigationError::Guard(GuardError::new("session expired"));
//! assert!(err.is_error());
//! assert_eq!(err.to_string(), "guard failed: session expired");
//!
//! let aborted = NavigationError::Aborted { reason: None };
//! assert!(!aborted.is_error());
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Why a single transition did not commit.
#[derive(Debug, Clone, Error)]
pub enum NavigationError {
    /// The transition stopped without an error (no-op or explicit abort).
    #[error("navigation aborted{}", reason_suffix(.reason))]
    Aborted {
        /// Optional human-readable reason supplied by the guard.
        reason: Option<String>,
    },

    /// A guard redirected; a new transition to `to` was started.
    #[error("navigation redirected to '{to}'")]
    Redirected {
        /// Description of the redirect target.
        to: String,
    },

    /// A guard failed or passed an error to its continuation.
    #[error("guard failed: {0}")]
    Guard(GuardError),

    /// The redirect chain exceeded the configured limit.
    #[error("redirect limit of {limit} exceeded while navigating to '{to}'")]
    RedirectLimit {
        /// Configured maximum chain length.
        limit: usize,
        /// Target of the redirect that was refused.
        to: String,
    },
}

impl NavigationError {
    /// `true` for error-like failures, which are routed to error callbacks.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Guard(_) | Self::RedirectLimit { .. })
    }

    /// `true` when the transition was replaced by a redirect.
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirected { .. })
    }

    /// The guard error, if this failure carries one.
    pub fn guard_error(&self) -> Option<&GuardError> {
        match self {
            Self::Guard(err) => Some(err),
            _ => None,
        }
    }
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {r}"))
        .unwrap_or_default()
}

/// Error raised by a guard, either returned from its `check` or passed to
/// [`Next::error`](crate::Next::error).
///
/// Cheap to clone so it can be fanned out to every error callback.
#[derive(Clone)]
pub struct GuardError {
    message: String,
    source: Option<Rc<dyn StdError + 'static>>,
}

impl GuardError {
    /// Create an error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an arbitrary error, keeping it as the source.
    pub fn from_error<E>(err: E) -> Self
    where
        E: StdError + 'static,
    {
        Self {
            message: err.to_string(),
            source: Some(Rc::new(err)),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardError")
            .field("message", &self.message)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for GuardError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref()
    }
}

impl From<&str> for GuardError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for GuardError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Malformed percent-escape or invalid UTF-8 in a query string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode '{input}': {reason}")]
pub struct DecodeError {
    /// The component that failed to decode.
    pub input: String,
    /// What was wrong with it.
    pub reason: String,
}

/// A path template could not be filled because a required param is absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing param '{param}' for path '{path}'")]
pub struct MissingParamError {
    /// The template being filled.
    pub path: String,
    /// The required param that was not supplied.
    pub param: String,
}

//! Log macros used throughout the engine.
//!
//! Each macro forwards to the [`log`](https://docs.rs/log) crate (feature
//! `log`, on by default) or to [`tracing`](https://docs.rs/tracing) (feature
//! `tracing`). Enable at most one of the two. With neither, the macros expand
//! to nothing.
//!
//! | Level   | Used for |
//! |---------|----------|
//! | `trace` | each guard run, cache lookups, views still waiting to mount |
//! | `debug` | transitions started, aborted, redirected or superseded |
//! | `info`  | commits and route registration |
//! | `warn`  | recovered failures: bad query strings, missing params, unknown names |
//! | `error` | guard errors nobody subscribed to |
//!
//! The macros expand to statements, so always terminate them with `;`:
//!
//! ```ignore
//! use nav_transition::{debug_log, info_log};
//!
//! debug_log!("Transition to '{}' superseded", route.full_path);
//! info_log!("Navigated '{}' -> '{}'", from.full_path, to.full_path);
//! ```

/// Log at trace level.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!($($arg)*);
        #[cfg(feature = "log")]
        ::log::trace!($($arg)*);
    };
}

/// Log at debug level.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!($($arg)*);
        #[cfg(feature = "log")]
        ::log::debug!($($arg)*);
    };
}

/// Log at info level.
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::info!($($arg)*);
        #[cfg(feature = "log")]
        ::log::info!($($arg)*);
    };
}

/// Log at warn level.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::warn!($($arg)*);
        #[cfg(feature = "log")]
        ::log::warn!($($arg)*);
    };
}

/// Log at error level. The engine uses it for guard errors that reach no
/// error callback.
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::error!($($arg)*);
        #[cfg(feature = "log")]
        ::log::error!($($arg)*);
    };
}

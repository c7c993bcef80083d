//! Path match caching.
//!
//! This module provides [`MatchCache`], an LRU-based cache that avoids
//! re-walking every record template when the same path is matched again
//! (re-renders, `resolve` for links, back/forward). It is gated behind the
//! `cache` feature flag and uses the [`lru`] crate internally.
//!
//! Entries map a normalized path to the [`RecordId`] it matched (or to "no
//! match") plus the captured [`RouteParams`]. The table clears the cache
//! whenever records are added.
//!
//! [`CacheStats`] tracks hits, misses, and invalidations so you can monitor
//! cache effectiveness at runtime.
//!
//! # Examples
//!
//! ```
//! use nav_transition::cache::{CachedMatch, MatchCache};
//! use nav_transition::{RecordId, RouteParams};
//!
//! let mut cache = MatchCache::new();
//! cache.insert(
//!     "/dashboard".to_string(),
//!     CachedMatch { record: Some(RecordId(3)), params: RouteParams::new() },
//! );
//!
//! assert_eq!(cache.get("/dashboard").unwrap().record, Some(RecordId(3)));
//! assert_eq!(cache.stats().hits, 1);
//! ```

use crate::params::RouteParams;
use crate::route::RecordId;
use crate::{debug_log, trace_log};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Cached result of matching one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMatch {
    /// Matched record, or `None` when no record matched.
    pub record: Option<RecordId>,
    /// Params captured by the match.
    pub params: RouteParams,
}

/// Counters tracking cache hit/miss rates and invalidations.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of lookups answered from the cache.
    pub hits: usize,
    /// Number of lookups that fell through to the matcher.
    pub misses: usize,
    /// Number of full cache invalidations (via [`MatchCache::clear`]).
    pub invalidations: usize,
}

impl CacheStats {
    /// Return the hit rate as a value in `0.0..=1.0`.
    ///
    /// Returns `0.0` if no lookups have been performed.
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache of path match results. Default capacity is 1000 entries.
#[derive(Debug)]
pub struct MatchCache {
    entries: LruCache<String, CachedMatch>,
    stats: CacheStats,
}

impl MatchCache {
    const DEFAULT_CAPACITY: usize = 1000;

    /// Create a cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a cache with a custom capacity. A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(cap),
            stats: CacheStats::default(),
        }
    }

    /// Drop every entry and increment the invalidation counter.
    pub fn clear(&mut self) {
        let len = self.entries.len();
        self.entries.clear();
        self.stats.invalidations += 1;
        debug_log!(
            "Match cache cleared: {} entries removed ({} total invalidations, hit rate: {:.1}%)",
            len,
            self.stats.invalidations,
            self.stats.hit_rate() * 100.0
        );
    }

    /// Look up the cached match for `path`. Updates hit/miss stats.
    pub fn get(&mut self, path: &str) -> Option<CachedMatch> {
        if let Some(entry) = self.entries.get(path) {
            self.stats.hits += 1;
            trace_log!("Match cache hit for path: '{}'", path);
            Some(entry.clone())
        } else {
            self.stats.misses += 1;
            trace_log!("Match cache miss for path: '{}'", path);
            None
        }
    }

    /// Store the match result for `path`.
    pub fn insert(&mut self, path: String, entry: CachedMatch) {
        trace_log!("Caching match {:?} for path '{}'", entry.record, path);
        self.entries.push(path, entry);
    }

    /// Return a reference to the current cache statistics.
    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Reset all counters in [`CacheStats`] to zero.
    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    /// Number of cached paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MatchCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: usize) -> CachedMatch {
        CachedMatch {
            record: Some(RecordId(id)),
            params: RouteParams::new(),
        }
    }

    #[test]
    fn test_cache_creation() {
        let cache = MatchCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_cache_miss() {
        let mut cache = MatchCache::new();
        assert!(cache.get("/dashboard").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_cache_hit_and_negative_entry() {
        let mut cache = MatchCache::new();
        cache.insert("/dashboard".to_string(), entry(1));
        cache.insert(
            "/nowhere".to_string(),
            CachedMatch {
                record: None,
                params: RouteParams::new(),
            },
        );

        assert_eq!(cache.get("/dashboard"), Some(entry(1)));
        assert_eq!(cache.get("/nowhere").unwrap().record, None);
        assert_eq!(cache.stats().hits, 2);
    }

    #[test]
    fn test_cache_clear() {
        let mut cache = MatchCache::new();
        cache.insert("/dashboard".to_string(), entry(0));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = MatchCache::with_capacity(2);
        cache.insert("/a".to_string(), entry(0));
        cache.insert("/b".to_string(), entry(1));
        cache.get("/a");
        cache.insert("/c".to_string(), entry(2));

        assert!(cache.get("/b").is_none());
        assert!(cache.get("/a").is_some());
    }

    #[test]
    fn test_hit_rate_calculation() {
        let mut cache = MatchCache::new();
        cache.get("/a");
        cache.get("/b");
        cache.get("/c");

        cache.insert("/a".to_string(), entry(0));
        cache.insert("/b".to_string(), entry(1));

        cache.get("/a");
        cache.get("/b");

        assert_eq!(cache.stats().hits, 2);
        assert_eq!(cache.stats().misses, 3);
        assert!((cache.stats().hit_rate() - 0.4).abs() < 0.001);
    }
}

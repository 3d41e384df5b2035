//! # Read-Through Cache
//!
//! Memoizes computed read models for a time window.
//!
//! A cached value is never a second source of truth: every mutation of the
//! underlying records clears the caches before it returns, and the TTL only
//! bounds how long an unchanged value is reused. A TTL of zero disables
//! caching entirely.
//!
//! Keys are a method prefix plus a BLAKE3 digest of the postcard-encoded
//! parameters, so equal parameters always map to the same entry.

use crate::MbkmError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Hex characters of the parameter digest kept in a key.
const KEY_DIGEST_LEN: usize = 16;

/// Build a cache key from a method prefix and its parameters.
pub fn cache_key<P: Serialize>(prefix: &str, params: &P) -> Result<String, MbkmError> {
    let bytes =
        postcard::to_allocvec(params).map_err(|e| MbkmError::SerializationError(e.to_string()))?;
    let digest = blake3::hash(&bytes).to_hex();
    Ok(format!("{}_{}", prefix, &digest.as_str()[..KEY_DIGEST_LEN]))
}

/// Hit and miss counters. Passive only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    /// `None` when `now + ttl` does not fit in an `Instant`.
    expires_at: Option<Instant>,
}

#[derive(Debug)]
struct Inner<V> {
    entries: BTreeMap<String, Entry<V>>,
    hits: u64,
    misses: u64,
}

/// A keyed cache with per-entry expiry.
#[derive(Debug)]
pub struct ReadThroughCache<V> {
    inner: Mutex<Inner<V>>,
    ttl: Duration,
}

impl<V: Clone> ReadThroughCache<V> {
    /// Cache whose entries live for `ttl` unless a call overrides it.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: BTreeMap::new(),
                hits: 0,
                misses: 0,
            }),
            ttl,
        }
    }

    /// A cache that never stores anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        // Poisoning only means a holder panicked; the map is still intact.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// `compute` runs without the lock held. Errors are returned and not
    /// cached.
    pub fn get_or_try_insert_with<F>(&self, key: &str, compute: F) -> Result<V, MbkmError>
    where
        F: FnOnce() -> Result<V, MbkmError>,
    {
        self.get_or_try_insert_for(key, self.ttl, compute)
    }

    /// Like [`get_or_try_insert_with`](Self::get_or_try_insert_with) with an
    /// explicit lifetime for a newly stored entry.
    pub fn get_or_try_insert_for<F>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<V, MbkmError>
    where
        F: FnOnce() -> Result<V, MbkmError>,
    {
        if !self.is_enabled() || ttl.is_zero() {
            return compute();
        }

        let now = Instant::now();
        {
            let mut inner = self.lock();
            let fresh = inner
                .entries
                .get(key)
                .filter(|e| e.expires_at.is_none_or(|at| at > now))
                .map(|e| e.value.clone());
            match fresh {
                Some(value) => {
                    inner.hits += 1;
                    return Ok(value);
                }
                None => {
                    inner.misses += 1;
                    inner.entries.remove(key);
                }
            }
        }

        let value = compute()?;
        let mut inner = self.lock();
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.clone(),
                expires_at: now.checked_add(ttl),
            },
        );
        Ok(value)
    }

    /// Drop every entry whose key starts with `prefix`. Returns the number
    /// removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !key.starts_with(prefix));
        before - inner.entries.len()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entries: inner.entries.len(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn second_read_is_a_hit() {
        let cache = ReadThroughCache::new(Duration::from_secs(60));
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok(42u32)
        };

        assert_eq!(cache.get_or_try_insert_with("k", compute).ok(), Some(42));
        assert_eq!(cache.get_or_try_insert_with("k", compute).ok(), Some(42));
        assert_eq!(calls.get(), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn disabled_cache_always_recomputes() {
        let cache = ReadThroughCache::disabled();
        let calls = Cell::new(0);
        for _ in 0..3 {
            let _ = cache.get_or_try_insert_with("k", || {
                calls.set(calls.get() + 1);
                Ok(1u8)
            });
        }
        assert_eq!(calls.get(), 3);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache: ReadThroughCache<u8> = ReadThroughCache::new(Duration::from_secs(60));
        let failed = cache.get_or_try_insert_with("k", || {
            Err(MbkmError::IoError("disk".to_string()))
        });
        assert!(failed.is_err());
        assert_eq!(cache.get_or_try_insert_with("k", || Ok(7)).ok(), Some(7));
    }

    #[test]
    fn prefix_invalidation() {
        let cache = ReadThroughCache::new(Duration::from_secs(60));
        let _ = cache.get_or_try_insert_with("dashboard_a", || Ok(1u8));
        let _ = cache.get_or_try_insert_with("dashboard_b", || Ok(2u8));
        let _ = cache.get_or_try_insert_with("logbook_a", || Ok(3u8));

        assert_eq!(cache.invalidate_prefix("dashboard_"), 2);
        assert_eq!(cache.stats().entries, 1);
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn expired_entries_recompute() {
        let cache = ReadThroughCache::new(Duration::from_secs(60));
        let _ = cache.get_or_try_insert_for("k", Duration::from_nanos(1), || Ok(1u8));
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.get_or_try_insert_with("k", || Ok(2u8)).ok(), Some(2));
    }

    #[test]
    fn huge_ttl_never_expires() {
        let cache = ReadThroughCache::new(Duration::MAX);
        assert_eq!(cache.get_or_try_insert_with("k", || Ok(1u8)).ok(), Some(1));
        assert_eq!(cache.get_or_try_insert_with("k", || Ok(2u8)).ok(), Some(1));
        assert_eq!(
            cache
                .get_or_try_insert_for("j", Duration::from_secs(u64::MAX / 2), || Ok(3u8))
                .ok(),
            Some(3)
        );
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn keys_depend_on_params() {
        let a = cache_key("dashboard", &("2024/2025", 1u32)).ok();
        let b = cache_key("dashboard", &("2024/2025", 1u32)).ok();
        let c = cache_key("dashboard", &("2023/2024", 1u32)).ok();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.is_some_and(|k| k.starts_with("dashboard_") && k.len() == 26));
    }
}

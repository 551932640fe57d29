// Memoized orderings keyed by item-set fingerprint and column variant
// Concurrent first access to one key computes once: the first caller takes the key's
// computation lock, later callers wait on it and then read the published entry.
// Entries are published only after a successful compute.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::items::set::{Fingerprint, ItemId};
use crate::layout::ColumnVariant;

/// Cached orderings are shared, never copied.
pub type SharedIds = Arc<[ItemId]>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    fingerprint: Fingerprint,
    variant: ColumnVariant,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    ids: SharedIds,
    created_at: Instant,
}

/// Counters since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub computes: u64,
    pub evictions: u64,
}

pub struct OrderingCache {
    entries: DashMap<CacheKey, CacheEntry>,
    /// Per-key computation locks
    inflight: DashMap<CacheKey, Arc<Mutex<()>>>,
    ttl: Option<Duration>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    computes: AtomicU64,
    evictions: AtomicU64,
}

impl Default for OrderingCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl OrderingCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            inflight: DashMap::new(),
            ttl: config.ttl(),
            max_entries: config.max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            computes: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Return the cached ordering for `(fingerprint, variant)`, or run `compute`
    /// once and publish its result. Errors from `compute` are passed through and
    /// nothing is cached.
    pub fn get_or_compute<E, F>(
        &self,
        fingerprint: &Fingerprint,
        variant: ColumnVariant,
        compute: F,
    ) -> Result<SharedIds, E>
    where
        F: FnOnce() -> Result<Vec<ItemId>, E>,
    {
        let key = CacheKey {
            fingerprint: fingerprint.clone(),
            variant,
        };
        if let Some(ids) = self.fresh(&key) {
            self.hits.fetch_add(1, AtomicOrdering::Relaxed);
            return Ok(ids);
        }

        let lock = self.key_lock(&key);
        let _guard = lock.lock();

        // Another caller may have published while we waited.
        if let Some(ids) = self.fresh(&key) {
            self.hits.fetch_add(1, AtomicOrdering::Relaxed);
            return Ok(ids);
        }
        self.misses.fetch_add(1, AtomicOrdering::Relaxed);
        self.compute_and_publish(key, &lock, compute)
    }

    /// Recompute `(fingerprint, variant)` even if an entry exists, e.g. after an
    /// upstream signal that the item set changed. The old entry stays readable
    /// until the new one is published.
    pub fn refresh<E, F>(
        &self,
        fingerprint: &Fingerprint,
        variant: ColumnVariant,
        compute: F,
    ) -> Result<SharedIds, E>
    where
        F: FnOnce() -> Result<Vec<ItemId>, E>,
    {
        let key = CacheKey {
            fingerprint: fingerprint.clone(),
            variant,
        };
        let lock = self.key_lock(&key);
        let _guard = lock.lock();
        self.misses.fetch_add(1, AtomicOrdering::Relaxed);
        self.compute_and_publish(key, &lock, compute)
    }

    /// Cached ordering without computing. Expired entries read as absent.
    pub fn get(&self, fingerprint: &Fingerprint, variant: ColumnVariant) -> Option<SharedIds> {
        self.fresh(&CacheKey {
            fingerprint: fingerprint.clone(),
            variant,
        })
    }

    /// Drop both variants of an item set. Returns how many entries were removed.
    pub fn invalidate(&self, fingerprint: &Fingerprint) -> usize {
        let removed = ColumnVariant::ALL
            .iter()
            .filter(|&&variant| {
                self.entries
                    .remove(&CacheKey {
                        fingerprint: fingerprint.clone(),
                        variant,
                    })
                    .is_some()
            })
            .count();
        if removed > 0 {
            tracing::debug!("Invalidated {} cached orderings for {}", removed, fingerprint);
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(AtomicOrdering::Relaxed),
            misses: self.misses.load(AtomicOrdering::Relaxed),
            computes: self.computes.load(AtomicOrdering::Relaxed),
            evictions: self.evictions.load(AtomicOrdering::Relaxed),
        }
    }

    fn fresh(&self, key: &CacheKey) -> Option<SharedIds> {
        let entry = self.entries.get(key)?;
        if self.is_expired(&entry) {
            drop(entry);
            self.entries.remove_if(key, |_, entry| self.is_expired(entry));
            return None;
        }
        Some(Arc::clone(&entry.ids))
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.ttl.is_some_and(|ttl| entry.created_at.elapsed() > ttl)
    }

    fn key_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        Arc::clone(self.inflight.entry(key.clone()).or_default().value())
    }

    /// Caller holds `lock`, the key's computation lock.
    fn compute_and_publish<E, F>(
        &self,
        key: CacheKey,
        lock: &Arc<Mutex<()>>,
        compute: F,
    ) -> Result<SharedIds, E>
    where
        F: FnOnce() -> Result<Vec<ItemId>, E>,
    {
        self.computes.fetch_add(1, AtomicOrdering::Relaxed);
        let started = Instant::now();
        let outcome = compute().map(|ids| {
            let ids: SharedIds = ids.into();
            self.entries.insert(
                key.clone(),
                CacheEntry {
                    ids: Arc::clone(&ids),
                    created_at: Instant::now(),
                },
            );
            self.evict_overflow(&key);
            tracing::debug!(
                "Cached {} ordering for {} ({} ids) in {:?}",
                key.variant,
                key.fingerprint,
                ids.len(),
                started.elapsed()
            );
            ids
        });
        // waiters re-check `entries` once the lock is released; a newer caller's lock stays
        self.inflight.remove_if(&key, |_, current| Arc::ptr_eq(current, lock));
        outcome
    }

    /// Evict the oldest entries other than `kept` until the cache is back at
    /// `max_entries`. Concurrent publishes of different keys may overshoot the
    /// limit until each of them has run this.
    fn evict_overflow(&self, kept: &CacheKey) {
        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .filter(|entry| entry.key() != kept)
                .min_by_key(|entry| entry.value().created_at)
                .map(|entry| entry.key().clone());
            let Some(victim) = oldest else {
                break;
            };
            if self.entries.remove(&victim).is_some() {
                self.evictions.fetch_add(1, AtomicOrdering::Relaxed);
                tracing::debug!("Evicted {} ordering for {}", victim.variant, victim.fingerprint);
            }
        }
    }
}

//! TTL response cache for listing pages and export mappings.
//! Sharded map keyed by blake3 fingerprints; expiry is lazy on read with
//! an optional background sweep. Eviction is TTL-only.

pub mod fingerprint;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info};

use crate::export::ExportMapping;
use crate::store::Page;
use fingerprint::Fingerprint;

/// A memoized read result.
#[derive(Debug, Clone)]
pub enum CachedPayload {
    Listing(Page),
    Export(ExportMapping),
}

struct CacheSlot {
    payload: CachedPayload,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheSlot {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }
}

/// Process-wide memoization of read results. Concurrent lookups never
/// block each other; inserts for distinct fingerprints land on separate
/// shards. Concurrent populate races for one fingerprint resolve
/// last-write-wins.
pub struct ResponseCache {
    slots: DashMap<Fingerprint, CacheSlot>,
    default_ttl: Duration,
    stats: CacheStats,
}

impl ResponseCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            default_ttl,
            stats: CacheStats::default(),
        }
    }

    /// Look up a fingerprint. An entry whose TTL has elapsed is removed
    /// and reported as a miss.
    pub fn get(&self, fp: &Fingerprint) -> Option<CachedPayload> {
        if let Some(slot) = self.slots.get(fp) {
            if !slot.is_expired() {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Some(slot.payload.clone());
            }
        }
        // Expired (or concurrently replaced): drop it only if still stale.
        self.slots.remove_if(fp, |_, slot| slot.is_expired());
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Memoize a result under the default TTL.
    pub fn insert(&self, fp: Fingerprint, payload: CachedPayload) {
        self.insert_with_ttl(fp, payload, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, fp: Fingerprint, payload: CachedPayload, ttl: Duration) {
        self.slots.insert(
            fp,
            CacheSlot {
                payload,
                inserted_at: Instant::now(),
                ttl,
            },
        );
        self.stats.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Write barrier: drop every memoized read result. Called after a
    /// successful create/update, before the write is acknowledged, so
    /// the next listing or export recomputes against the store.
    pub fn invalidate_reads(&self) {
        let dropped = self.slots.len();
        self.slots.clear();
        self.stats.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(dropped, "read caches invalidated after write");
    }

    /// Remove expired slots. Called from the sweep loop; correctness
    /// does not depend on it since `get` expires lazily.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.is_expired());
        before - self.slots.len()
    }

    /// Start a background sweep thread (skipped when `interval` is zero).
    pub fn start_sweep_loop(cache: Arc<Self>, interval: Duration) {
        if interval.is_zero() {
            return;
        }
        std::thread::Builder::new()
            .name("cache-sweep".into())
            .spawn(move || loop {
                std::thread::sleep(interval);
                let removed = cache.cleanup_expired();
                if removed > 0 {
                    info!(removed, "cache sweep");
                }
            })
            .expect("failed to spawn cache sweep thread");
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}

/// Hit/miss counters, readable without locking.
#[derive(Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheStats {
    fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub invalidations: u64,
}

impl CacheStatsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

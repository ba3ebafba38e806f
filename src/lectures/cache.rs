//! TTL cache of aggregated lecture records, keyed by query shape.
//!
//! Entries are fresh while younger than the TTL. Stale entries are not
//! evicted on read; a stale hit is a miss and the next `put` for the key
//! overwrites it. A separate periodic sweep removes entries older than twice
//! the TTL, so keys that are never queried again do not accumulate.
//!
//! Backed by a `DashMap`: lookups and inserts on different keys never block
//! each other, same-key inserts are last-writer-wins, and the sweep locks one
//! shard at a time.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::lms::LectureRecord;

/// Source of "now" for cache ageing.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub records: Arc<Vec<LectureRecord>>,
    pub stored_at: Instant,
}

/// A fresh cache entry and how old it is.
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub records: Arc<Vec<LectureRecord>>,
    pub age: Duration,
}

#[derive(Clone)]
pub struct QueryCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the entry for `key` if it is younger than the TTL.
    pub fn get(&self, key: &str) -> Option<CacheHit> {
        let entry = self.entries.get(key)?;
        let age = self.clock.now().saturating_duration_since(entry.stored_at);
        if age < self.ttl {
            Some(CacheHit {
                records: entry.records.clone(),
                age,
            })
        } else {
            None
        }
    }

    /// Store `records` under `key`, replacing whatever was there.
    pub fn put(&self, key: String, records: Vec<LectureRecord>) -> Arc<Vec<LectureRecord>> {
        let records = Arc::new(records);
        self.entries.insert(
            key,
            CacheEntry {
                records: records.clone(),
                stored_at: self.clock.now(),
            },
        );
        records
    }

    /// Remove every entry older than twice the TTL. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let limit = self.ttl.saturating_mul(2);
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = now.saturating_duration_since(entry.stored_at) <= limit;
            if !keep {
                removed += 1;
            }
            keep
        });
        debug!(removed, remaining = self.entries.len(), "Lecture cache swept");
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is stored at all, fresh or not.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Sweep every TTL until `cancel` fires.
    pub fn spawn_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let cache = self.clone();
        let period = self.ttl.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // skip the immediate first tick
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Lecture cache sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        cache.sweep();
                    }
                }
            }
        })
    }
}

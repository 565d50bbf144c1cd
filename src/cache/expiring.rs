//! In-memory TTL cache with capacity-bound LRU eviction.
//!
//! Layout follows Guava-style segmented caches: keys hash to one of `lanes`
//! shards, each behind its own mutex, so writer contention is bounded by the
//! lane count rather than a single global lock. LRU eviction is lane-local,
//! which makes the capacity bound exact when `lanes == 1` and approximate
//! (per-lane) otherwise.
//!
//! Two modes, fixed at build time:
//! - plain: values only ever arrive through `put`, a miss returns `None`;
//! - loading: a miss runs the configured loader and caches its result.
//!
//! In loading mode a per-key gate keeps simultaneous misses from running the
//! loader more than once for the same key. This is best effort, not a
//! correctness guarantee: callers must tolerate duplicate loads.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;
use tracing::{info, warn};

use super::store::{CacheStore, EXPIRE_ABSENT};

/// Loader invoked on a miss in loading mode.
pub type CacheLoader = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Listener invoked off the calling path for every removed entry.
pub type EvictionListener = Box<dyn Fn(RemovalNotice) + Send + 'static>;

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// TTL elapsed.
    Expired,
    /// Evicted to keep the lane under its capacity bound.
    Capacity,
    /// Removed by a `remove` call.
    Explicit,
    /// Overwritten by a `put` to the same key.
    Replaced,
}

/// Removal notification delivered to the eviction listener.
#[derive(Debug, Clone)]
pub struct RemovalNotice {
    pub key: String,
    pub value: String,
    pub cause: RemovalCause,
}

#[derive(Debug, Error)]
pub enum CacheError {
    /// Loading mode was requested without a loader. Startup-fatal: there is
    /// no safe default loader to fall back to.
    #[error("loading cache enabled without a loader")]
    Misconfigured,
}

/// Hit/miss/eviction/load counters, all monotonic.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    loads: AtomicU64,
    load_nanos: AtomicU64,
}

impl CacheStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            eviction_count: self.evictions.load(Ordering::Relaxed),
            load_count: self.loads.load(Ordering::Relaxed),
            total_load_time: Duration::from_nanos(self.load_nanos.load(Ordering::Relaxed)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
    pub load_count: u64,
    pub total_load_time: Duration,
}

struct Entry {
    value: String,
    written: Instant,
    ttl: Duration,
    /// Monotonic access stamp; the lane entry with the smallest stamp is the
    /// least recently used.
    stamp: u64,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.written) >= self.ttl
    }
}

struct Lane {
    map: HashMap<String, Entry>,
}

/// Builder for [`ExpiringCache`]. `ttl_secs` is the default TTL used for
/// loader-populated entries; `put` callers supply their own.
pub struct CacheBuilder {
    initial_capacity: usize,
    max_capacity: usize,
    lanes: usize,
    ttl_secs: u64,
    record_stats: bool,
    loading: bool,
    loader: Option<CacheLoader>,
    listener: Option<EvictionListener>,
}

impl CacheBuilder {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            initial_capacity: 0,
            max_capacity: 0,
            lanes: thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            ttl_secs,
            record_stats: false,
            loading: false,
            loader: None,
            listener: None,
        }
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Total capacity bound across all lanes; 0 means unbounded.
    pub fn max_capacity(mut self, capacity: usize) -> Self {
        self.max_capacity = capacity;
        self
    }

    /// Number of independently locked lanes. Bounds simultaneous writer
    /// throughput, not correctness.
    pub fn lanes(mut self, lanes: usize) -> Self {
        self.lanes = lanes.max(1);
        self
    }

    pub fn record_stats(mut self, enabled: bool) -> Self {
        self.record_stats = enabled;
        self
    }

    pub fn loading(mut self, enabled: bool) -> Self {
        self.loading = enabled;
        self
    }

    pub fn loader(mut self, loader: CacheLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn eviction_listener(mut self, listener: EvictionListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn build(self) -> Result<ExpiringCache, CacheError> {
        if self.loading && self.loader.is_none() {
            return Err(CacheError::Misconfigured);
        }

        let lanes = self.lanes.max(1);
        let lane_cap = if self.max_capacity == 0 {
            0
        } else {
            self.max_capacity.div_ceil(lanes)
        };
        let per_lane_initial = self.initial_capacity.div_ceil(lanes);
        let shards = (0..lanes)
            .map(|_| {
                Mutex::new(Lane {
                    map: HashMap::with_capacity(per_lane_initial),
                })
            })
            .collect();

        let notifier = self.listener.map(|listener| {
            let (tx, rx) = mpsc::channel::<RemovalNotice>();
            thread::Builder::new()
                .name("cache-removals".into())
                .spawn(move || {
                    for notice in rx {
                        listener(notice);
                    }
                })
                .expect("spawn removal notifier thread");
            tx
        });

        info!(
            lanes,
            max_capacity = self.max_capacity,
            ttl_secs = self.ttl_secs,
            loading = self.loading,
            stats = self.record_stats,
            "expiring cache ready"
        );

        Ok(ExpiringCache {
            shards,
            lane_cap,
            default_ttl_secs: self.ttl_secs,
            clock: AtomicU64::new(0),
            stats: self.record_stats.then(CacheStats::default),
            loader: if self.loading { self.loader } else { None },
            inflight: DashMap::new(),
            notifier,
        })
    }
}

pub struct ExpiringCache {
    shards: Vec<Mutex<Lane>>,
    /// Per-lane capacity bound; 0 means unbounded.
    lane_cap: usize,
    default_ttl_secs: u64,
    clock: AtomicU64,
    stats: Option<CacheStats>,
    loader: Option<CacheLoader>,
    /// Per-key gates serializing loader runs in loading mode.
    inflight: DashMap<String, Arc<Mutex<()>>>,
    notifier: Option<Sender<RemovalNotice>>,
}

impl ExpiringCache {
    pub fn builder(ttl_secs: u64) -> CacheBuilder {
        CacheBuilder::new(ttl_secs)
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|lane| lane.lock().expect("cache lane poisoned").map.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counter snapshot, `None` unless stats were enabled at build time.
    pub fn stats(&self) -> Option<StatsSnapshot> {
        self.stats.as_ref().map(CacheStats::snapshot)
    }

    /// Log the current counters at info level.
    pub fn log_stats(&self) {
        match self.stats() {
            Some(s) => info!(
                hits = s.hit_count,
                misses = s.miss_count,
                evictions = s.eviction_count,
                loads = s.load_count,
                total_load_time_ms = s.total_load_time.as_millis() as u64,
                "cache stats"
            ),
            None => warn!("cache statistics not enabled"),
        }
    }

    fn lane(&self, key: &str) -> MutexGuard<'_, Lane> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.shards.len();
        self.shards[idx].lock().expect("cache lane poisoned")
    }

    fn next_stamp(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn notify(&self, notice: RemovalNotice) {
        if let Some(tx) = &self.notifier {
            // The receiver thread does the delivery; send never blocks.
            let _ = tx.send(notice);
        }
    }

    fn record_hit(&self) {
        if let Some(stats) = &self.stats {
            stats.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_miss(&self) {
        if let Some(stats) = &self.stats {
            stats.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_eviction(&self) {
        if let Some(stats) = &self.stats {
            stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Live-entry lookup with lazy expiry. A hit refreshes the LRU stamp but
    /// never the TTL.
    fn lookup(&self, key: &str, record: bool) -> Option<String> {
        let now = Instant::now();
        let mut lane = self.lane(key);
        match lane.map.remove(key) {
            None => {
                drop(lane);
                if record {
                    self.record_miss();
                }
                None
            }
            Some(entry) if entry.is_expired(now) => {
                drop(lane);
                if record {
                    self.record_miss();
                }
                self.record_eviction();
                self.notify(RemovalNotice {
                    key: key.to_string(),
                    value: entry.value,
                    cause: RemovalCause::Expired,
                });
                None
            }
            Some(mut entry) => {
                entry.stamp = self.next_stamp();
                let value = entry.value.clone();
                lane.map.insert(key.to_string(), entry);
                drop(lane);
                if record {
                    self.record_hit();
                }
                Some(value)
            }
        }
    }

    fn write(&self, key: &str, value: String, ttl_secs: u64) {
        let entry = Entry {
            value,
            written: Instant::now(),
            ttl: Duration::from_secs(ttl_secs),
            stamp: self.next_stamp(),
        };
        let mut lane = self.lane(key);
        let mut notices = Vec::new();
        if let Some(old) = lane.map.insert(key.to_string(), entry) {
            notices.push(RemovalNotice {
                key: key.to_string(),
                value: old.value,
                cause: RemovalCause::Replaced,
            });
        } else if self.lane_cap > 0 && lane.map.len() > self.lane_cap {
            let victim = lane
                .map
                .iter()
                .min_by_key(|(_, e)| e.stamp)
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                if let Some(old) = lane.map.remove(&victim) {
                    self.record_eviction();
                    notices.push(RemovalNotice {
                        key: victim,
                        value: old.value,
                        cause: RemovalCause::Capacity,
                    });
                }
            }
        }
        drop(lane);
        for notice in notices {
            self.notify(notice);
        }
    }

    fn load(&self, key: &str) -> Option<String> {
        let loader = self.loader.as_ref()?;

        let gate = self
            .inflight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = gate.lock().expect("loader gate poisoned");

        // Another task may have finished loading while we waited on the gate.
        if let Some(value) = self.lookup(key, false) {
            self.inflight.remove(key);
            return Some(value);
        }

        let started = Instant::now();
        let loaded = loader(key);
        if let Some(stats) = &self.stats {
            stats.loads.fetch_add(1, Ordering::Relaxed);
            stats
                .load_nanos
                .fetch_add(started.elapsed().as_nanos() as u64, Ordering::Relaxed);
        }
        if let Some(value) = &loaded {
            self.write(key, value.clone(), self.default_ttl_secs);
        }
        self.inflight.remove(key);
        loaded
    }
}

impl CacheStore for ExpiringCache {
    fn put(&self, key: &str, value: String, ttl_secs: u64) {
        self.write(key, value, ttl_secs);
    }

    fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.lookup(key, true) {
            return Some(value);
        }
        self.load(key)
    }

    fn remove(&self, key: &str) {
        let mut lane = self.lane(key);
        let removed = lane.map.remove(key);
        drop(lane);
        if let Some(old) = removed {
            self.notify(RemovalNotice {
                key: key.to_string(),
                value: old.value,
                cause: RemovalCause::Explicit,
            });
        }
    }

    fn get_expire(&self, key: &str) -> i64 {
        let now = Instant::now();
        let mut lane = self.lane(key);
        match lane.map.remove(key) {
            None => EXPIRE_ABSENT,
            Some(entry) => {
                let elapsed = now.duration_since(entry.written);
                if elapsed >= entry.ttl {
                    drop(lane);
                    self.record_eviction();
                    self.notify(RemovalNotice {
                        key: key.to_string(),
                        value: entry.value,
                        cause: RemovalCause::Expired,
                    });
                    EXPIRE_ABSENT
                } else {
                    let remaining = entry.ttl - elapsed;
                    // Peek only: the stamp is untouched so get_expire does
                    // not count as a use for LRU purposes.
                    lane.map.insert(key.to_string(), entry);
                    // Round up so a live entry never reports zero.
                    (remaining.as_secs() as i64).max(1)
                }
            }
        }
    }
}

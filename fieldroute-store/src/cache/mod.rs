//! Two-tier distance cache.
//!
//! The memory tier is a bounded map with oldest-first eviction; the SQLite
//! tier survives restarts and repopulates the memory tier on hit. Expired
//! entries always behave as misses and are removed opportunistically.

mod sqlite;

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use log::debug;

use fieldroute_core::{
    CacheEntry, Coordinate, DistanceCache, DistanceOptions, DistanceResult, VolatilityClass,
    cache_key,
};

pub use sqlite::SqliteDistanceCache;

/// Default bound on the memory tier's entry count.
const DEFAULT_CAPACITY: usize = 1000;

/// Per-volatility-class time-to-live settings.
///
/// Road distances barely move, so static entries live for days; anything
/// traffic-aware rots in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Lifetime of static (road geometry) entries.
    pub static_ttl: Duration,
    /// Lifetime of traffic-aware entries.
    pub traffic_ttl: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            static_ttl: Duration::days(7),
            traffic_ttl: Duration::minutes(15),
        }
    }
}

impl CacheTtls {
    /// TTL for the given volatility class.
    #[must_use]
    pub const fn ttl_for(&self, volatility: VolatilityClass) -> Duration {
        match volatility {
            VolatilityClass::Static => self.static_ttl,
            VolatilityClass::Traffic => self.traffic_ttl,
        }
    }

    /// Build a fresh entry stamped with the right expiry.
    pub(crate) fn entry(
        &self,
        result: &DistanceResult,
        volatility: VolatilityClass,
        now: DateTime<Utc>,
    ) -> CacheEntry {
        CacheEntry {
            payload: result.clone(),
            created_at: now,
            expires_at: now + self.ttl_for(volatility),
            volatility,
        }
    }
}

struct MemoryInner {
    entries: HashMap<String, CacheEntry>,
    /// Insertion order for oldest-first eviction.
    order: VecDeque<String>,
}

/// Bounded in-process cache tier.
///
/// Oldest entries are evicted when the capacity is exceeded; expired
/// entries are removed on access.
pub struct MemoryDistanceCache {
    inner: Mutex<MemoryInner>,
    capacity: usize,
    ttls: CacheTtls,
}

impl MemoryDistanceCache {
    /// Cache bounded at the default capacity with default TTLs.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, CacheTtls::default())
    }

    /// Cache bounded at `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize, ttls: CacheTtls) -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
            ttls,
        }
    }

    /// Current entry count (expired entries included until touched).
    #[must_use]
    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.inner).entries.len()
    }

    /// Whether the tier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_entry(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        let mut inner = lock_unpoisoned(&self.inner);
        match inner.entries.get(key).map(|entry| entry.is_expired(now)) {
            None => None,
            Some(true) => {
                inner.entries.remove(key);
                inner.order.retain(|k| k != key);
                None
            }
            Some(false) => inner.entries.get(key).cloned(),
        }
    }

    fn insert_entry(&self, key: String, entry: CacheEntry) {
        let mut inner = lock_unpoisoned(&self.inner);
        if inner.entries.insert(key.clone(), entry).is_some() {
            inner.order.retain(|k| *k != key);
        }
        inner.order.push_back(key);
        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
    }
}

impl Default for MemoryDistanceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceCache for MemoryDistanceCache {
    fn get(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &DistanceOptions,
    ) -> Option<DistanceResult> {
        let key = cache_key(origin, destination, options);
        self.get_entry(&key, Utc::now()).map(|entry| entry.payload)
    }

    fn put(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &DistanceOptions,
        result: &DistanceResult,
        volatility: VolatilityClass,
    ) {
        let key = cache_key(origin, destination, options);
        let entry = self.ttls.entry(result, volatility, Utc::now());
        self.insert_entry(key, entry);
    }
}

/// The composed two-tier cache: memory in front, SQLite behind.
///
/// A durable hit repopulates the memory tier with the surviving expiry, so
/// a hot pair settles into the fast tier after one disk read per restart.
pub struct TieredDistanceCache {
    memory: MemoryDistanceCache,
    durable: SqliteDistanceCache,
}

impl TieredDistanceCache {
    /// Compose the two tiers.
    #[must_use]
    pub const fn new(memory: MemoryDistanceCache, durable: SqliteDistanceCache) -> Self {
        Self { memory, durable }
    }

    /// Entries currently held in the memory tier.
    #[must_use]
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }
}

impl DistanceCache for TieredDistanceCache {
    fn get(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &DistanceOptions,
    ) -> Option<DistanceResult> {
        let key = cache_key(origin, destination, options);
        let now = Utc::now();
        if let Some(entry) = self.memory.get_entry(&key, now) {
            return Some(entry.payload);
        }
        let entry = self.durable.get_entry(&key, now)?;
        debug!("cache: repopulating memory tier for {key}");
        self.memory.insert_entry(key, entry.clone());
        Some(entry.payload)
    }

    fn put(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &DistanceOptions,
        result: &DistanceResult,
        volatility: VolatilityClass,
    ) {
        let key = cache_key(origin, destination, options);
        let entry = self.durable.ttls().entry(result, volatility, Utc::now());
        self.durable.insert_entry(&key, &entry);
        self.memory.insert_entry(key, entry);
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

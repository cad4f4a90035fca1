//! Response caching shared by every tool.
//!
//! Avoids repeating identical provider calls and page fetches within a
//! bounded time window. Entries are keyed by a normalized string built with
//! [`cache_key`], expire after a fixed TTL, and the least-recently-used entry
//! is evicted once the cache is full.
//!
//! The cache is an explicitly constructed value. Servers create one
//! instance, wrap it in an `Arc`, and hand it to each tool, so tests can use
//! a fresh cache without touching global state.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default number of entries kept before LRU eviction.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default entry lifetime (30 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Maximum characters kept from each key part.
pub const KEY_PART_MAX_CHARS: usize = 100;

/// A cached response.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    stored_at: Instant,
    /// Monotonic recency stamp; the smallest stamp is the LRU entry.
    last_used: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    tick: u64,
    hits: u64,
    misses: u64,
}

impl Inner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn evict_lru(&mut self) {
        if let Some(oldest_key) = self
            .entries
            .iter()
            .min_by_key(|(_, v)| v.last_used)
            .map(|(k, _)| k.clone())
        {
            self.entries.remove(&oldest_key);
        }
    }
}

/// Fixed-capacity, time-bounded response cache.
///
/// All methods take `&self`; the map lives behind a mutex that is only held
/// for the duration of a lookup or insert, never across an `.await`.
#[derive(Debug)]
pub struct ResponseCache {
    inner: Mutex<Inner>,
    capacity: usize,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a cache with the given capacity and entry lifetime.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Look up a cached value. Returns `None` for unknown or expired keys.
    ///
    /// A hit marks the entry as most recently used.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<String> {
        let mut inner = self.lock();
        let expired = match inner.entries.get(key) {
            Some(entry) => now.saturating_duration_since(entry.stored_at) > self.ttl,
            None => {
                inner.misses += 1;
                return None;
            }
        };
        if expired {
            inner.entries.remove(key);
            inner.misses += 1;
            return None;
        }
        let tick = inner.next_tick();
        inner.hits += 1;
        inner.entries.get_mut(key).map(|entry| {
            entry.last_used = tick;
            entry.value.clone()
        })
    }

    /// Store a value, replacing any previous value under the same key.
    ///
    /// Overwriting refreshes both the timestamp and the recency. Inserting a
    /// new key into a full cache evicts the least-recently-used entry first.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.set_at(key.into(), value.into(), Instant::now());
    }

    pub(crate) fn set_at(&self, key: String, value: String, now: Instant) {
        let mut inner = self.lock();
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            inner.evict_lru();
        }
        let tick = inner.next_tick();
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
                last_used: tick,
            },
        );
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Number of stored entries (expired entries count until touched).
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache hit count.
    pub fn hits(&self) -> u64 {
        self.lock().hits
    }

    /// Cache miss count (unknown and expired keys).
    pub fn misses(&self) -> u64 {
        self.lock().misses
    }

    /// Hit rate as a fraction (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let inner = self.lock();
        let total = inner.hits + inner.misses;
        if total == 0 {
            0.0
        } else {
            inner.hits as f64 / total as f64
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the map half-updated,
        // so a poisoned mutex is still safe to use.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

/// Build a cache key from a tool prefix and an ordered list of parameters.
///
/// Each part is cut to its first [`KEY_PART_MAX_CHARS`] characters (absent
/// parts become empty), the parts are joined with `:`, and every character
/// outside `[A-Za-z0-9]` in the joined string is replaced by `-`. The prefix
/// is kept verbatim.
///
/// ```
/// use relay_core::cache::cache_key;
///
/// let key = cache_key("pplx", &[Some("sonar-pro"), None, Some("What is Rust?")]);
/// assert_eq!(key, "pplx:sonar-pro--What-is-Rust-");
/// ```
pub fn cache_key(prefix: &str, parts: &[Option<&str>]) -> String {
    let joined = parts
        .iter()
        .map(|p| {
            p.unwrap_or_default()
                .chars()
                .take(KEY_PART_MAX_CHARS)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(":");
    let normalized: String = joined
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("{prefix}:{normalized}")
}

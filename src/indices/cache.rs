use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::indices::IndexKind;
use crate::models::{Id, Value};

const DEFAULT_MAX_ENTRIES: usize = 1000;
const DEFAULT_MAX_AGE: Duration = Duration::from_millis(300_000);

/// Thresholds past which `recommendations` starts nagging.
const LOW_HIT_RATE: f64 = 0.2;
const HIGH_EVICTION_RATE: f64 = 0.5;
const HIGH_MEMORY_BYTES: usize = 50 * 1024 * 1024;

/// Identifies a cached lookup: which index kind answered it, the primary
/// key (composite keys joined with `,`), and the remaining parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: IndexKind,
    pub key: String,
    pub params: BTreeMap<String, Value>,
}

impl CacheKey {
    pub fn new(kind: IndexKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Whether the lookup key or any parameter mentions a property key.
    fn mentions(&self, key: &str) -> bool {
        self.key.split(',').any(|part| part == key) || self.params.keys().any(|name| name == key)
    }

    fn estimated_size(&self) -> usize {
        self.key.len()
            + self
                .params
                .iter()
                .map(|(name, value)| name.len() + value.estimated_size())
                .sum::<usize>()
    }
}

#[derive(Debug)]
struct CacheEntry {
    result: HashSet<Id>,
    inserted_at: Instant,
    last_used: u64,
}

/// Hit/miss/eviction counters for one cache instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub insertions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        self.hits as f64 / std::cmp::max(1, self.hits + self.misses) as f64
    }

    pub fn eviction_rate(&self) -> f64 {
        self.evictions as f64 / std::cmp::max(1, self.insertions) as f64
    }
}

/// A bounded, time-expiring cache of index lookup results.
///
/// Eviction is least-recently-used once `max_entries` is exceeded;
/// expiration is lazy on access, with `cleanup_expired` available as an
/// explicit sweep. Any graph mutation that touches a key or element flows
/// through the `invalidate_*` entry points, so a cached set is always what
/// a live lookup would return.
#[derive(Debug)]
pub struct IndexCache {
    entries: HashMap<CacheKey, CacheEntry>,
    max_entries: usize,
    max_age: Duration,
    tick: u64,
    stats: CacheStats,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_ENTRIES, DEFAULT_MAX_AGE)
    }

    pub fn with_limits(max_entries: usize, max_age: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries: std::cmp::max(1, max_entries),
            max_age,
            tick: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Caches a result set, evicting least-recently-used entries while over
    /// capacity.
    pub fn put(&mut self, key: CacheKey, result: HashSet<Id>) {
        self.tick += 1;
        self.stats.insertions += 1;
        self.entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
                last_used: self.tick,
            },
        );

        while self.entries.len() > self.max_entries {
            let lru = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            match lru {
                Some(key) => {
                    self.entries.remove(&key);
                    self.stats.evictions += 1;
                    log::debug!("index cache evicted entry for {}", key.key);
                }
                None => break,
            }
        }
    }

    /// Returns the cached set, counting a hit; an entry past `max_age` is
    /// dropped and counts as a miss.
    pub fn get(&mut self, key: &CacheKey) -> Option<HashSet<Id>> {
        self.tick += 1;
        let expired = match self.entries.get_mut(key) {
            Some(entry) => {
                if entry.inserted_at.elapsed() <= self.max_age {
                    entry.last_used = self.tick;
                    self.stats.hits += 1;
                    return Some(entry.result.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        self.stats.misses += 1;
        None
    }

    /// Whether a live (unexpired) entry exists, without touching counters.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .get(key)
            .map_or(false, |entry| entry.inserted_at.elapsed() <= self.max_age)
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<HashSet<Id>> {
        self.entries.remove(key).map(|entry| entry.result)
    }

    /// Sweeps out every expired entry, returning how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let max_age = self.max_age;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.inserted_at.elapsed() <= max_age);
        before - self.entries.len()
    }

    /// Drops every entry whose lookup key or parameters mention a property
    /// key.
    pub fn invalidate_key(&mut self, key: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|cache_key, _| !cache_key.mentions(key));
        before - self.entries.len()
    }

    /// Drops every entry answered by one index kind.
    pub fn invalidate_index_kind(&mut self, kind: IndexKind) -> usize {
        let before = self.entries.len();
        self.entries.retain(|cache_key, _| cache_key.kind != kind);
        before - self.entries.len()
    }

    /// Drops every entry whose cached result contains an element.
    pub fn invalidate_element(&mut self, id: Id) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.result.contains(&id));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// A rough accounting of the cache's heap footprint.
    pub fn estimated_bytes(&self) -> usize {
        self.entries
            .iter()
            .map(|(key, entry)| key.estimated_size() + entry.result.len() * std::mem::size_of::<Id>() + 64)
            .sum()
    }

    /// Human-readable tuning hints based on the counters.
    pub fn recommendations(&self) -> Vec<String> {
        let mut hints = Vec::new();
        let requests = self.stats.hits + self.stats.misses;

        if requests > 0 && self.stats.hit_rate() < LOW_HIT_RATE {
            hints.push(format!(
                "hit rate is {:.0}%; consider a longer max age or fewer distinct queries",
                self.stats.hit_rate() * 100.0
            ));
        }
        if self.stats.eviction_rate() > HIGH_EVICTION_RATE {
            hints.push(format!(
                "{} of {} insertions were evicted; consider raising max entries above {}",
                self.stats.evictions, self.stats.insertions, self.max_entries
            ));
        }
        let bytes = self.estimated_bytes();
        if bytes > HIGH_MEMORY_BYTES {
            hints.push(format!(
                "cache holds an estimated {} MB; consider lowering max entries",
                bytes / (1024 * 1024)
            ));
        }
        hints
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new()
    }
}

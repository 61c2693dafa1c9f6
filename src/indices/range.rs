use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;

use crate::errors::{Error, Result};
use crate::models::{Comparability, Id, Identifier, Value};

/// A value wrapper ordering range-index keys within their comparability
/// class: numerics by f64 total order regardless of variant, text
/// lexicographically. The class-conflict guard on insert keeps one class
/// per indexed key, so the cross-class fallback (global structural order)
/// only exists to keep the order total.
#[derive(Debug, Clone)]
pub(crate) struct RangeKey(pub Value);

impl Ord for RangeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .compare_comparable(&other.0)
            .unwrap_or_else(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for RangeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RangeKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RangeKey {}

/// An ordered secondary index over comparable values, supporting half-open
/// and closed interval scans.
#[derive(Debug, Default)]
pub struct RangeIndex {
    entries: HashMap<Identifier, BTreeMap<RangeKey, HashSet<Id>>>,
}

impl RangeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts indexing a key. Idempotent; returns whether the key was new.
    pub fn create(&mut self, key: Identifier) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, BTreeMap::new());
        true
    }

    /// Stops indexing a key. Idempotent.
    pub fn drop_key(&mut self, key: &Identifier) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn is_indexed(&self, key: &Identifier) -> bool {
        self.entries.contains_key(key)
    }

    pub fn indexed_keys(&self) -> Vec<Identifier> {
        let mut keys: Vec<Identifier> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// The comparability class of the values currently stored under a key.
    pub fn class_of(&self, key: &Identifier) -> Option<Comparability> {
        self.entries
            .get(key)?
            .keys()
            .next()
            .and_then(|k| k.0.comparability())
    }

    /// Checks that a value could be inserted under a key without a class
    /// conflict. Values with no comparability class always pass (they are
    /// skipped by `insert`).
    pub fn check_insertable(&self, key: &Identifier, value: &Value) -> Result<()> {
        let class = match value.comparability() {
            Some(class) => class,
            None => return Ok(()),
        };
        match self.class_of(key) {
            Some(existing) if existing != class => Err(Error::NonComparableRangeValue),
            _ => Ok(()),
        }
    }

    /// Indexes a value for an element. Values with no comparability class
    /// (booleans, containers, null) are skipped silently; a value whose
    /// class conflicts with the key's population is rejected.
    pub fn insert(&mut self, key: &Identifier, value: &Value, id: Id) -> Result<()> {
        if value.comparability().is_none() {
            return Ok(());
        }
        self.check_insertable(key, value)?;

        if let Some(buckets) = self.entries.get_mut(key) {
            buckets.entry(RangeKey(value.clone())).or_default().insert(id);
        }
        Ok(())
    }

    /// Unindexes a value for an element, pruning empty buckets.
    pub fn remove(&mut self, key: &Identifier, value: &Value, id: Id) {
        if let Some(buckets) = self.entries.get_mut(key) {
            let range_key = RangeKey(value.clone());
            if let Some(ids) = buckets.get_mut(&range_key) {
                ids.remove(&id);
                if ids.is_empty() {
                    buckets.remove(&range_key);
                }
            }
        }
    }

    /// Removes an element from every bucket under every key. Used on
    /// element removal.
    pub fn detach_element(&mut self, id: Id) {
        for buckets in self.entries.values_mut() {
            buckets.retain(|_, ids| {
                ids.remove(&id);
                !ids.is_empty()
            });
        }
    }

    /// The union of element sets in the interval. A missing bound is
    /// unbounded on that side; defaults follow `[min, max)` semantics when
    /// the caller passes `include_min = true, include_max = false`.
    pub fn range_query(
        &self,
        key: &Identifier,
        min: Option<&Value>,
        max: Option<&Value>,
        include_min: bool,
        include_max: bool,
    ) -> HashSet<Id> {
        let buckets = match self.entries.get(key) {
            Some(buckets) => buckets,
            None => return HashSet::new(),
        };

        // BTreeMap::range panics on inverted or doubly-excluded-equal
        // bounds, so degenerate intervals short-circuit to empty.
        if let (Some(min), Some(max)) = (min, max) {
            match RangeKey(min.clone()).cmp(&RangeKey(max.clone())) {
                Ordering::Greater => return HashSet::new(),
                Ordering::Equal if !(include_min && include_max) => return HashSet::new(),
                _ => {}
            }
        }

        let lower = match min {
            Some(v) if include_min => Bound::Included(RangeKey(v.clone())),
            Some(v) => Bound::Excluded(RangeKey(v.clone())),
            None => Bound::Unbounded,
        };
        let upper = match max {
            Some(v) if include_max => Bound::Included(RangeKey(v.clone())),
            Some(v) => Bound::Excluded(RangeKey(v.clone())),
            None => Bound::Unbounded,
        };

        let mut ids = HashSet::new();
        for (_, bucket) in buckets.range((lower, upper)) {
            ids.extend(bucket.iter().copied());
        }
        ids
    }

    /// The smallest value stored under a key.
    pub fn min_value(&self, key: &Identifier) -> Option<&Value> {
        self.entries.get(key)?.keys().next().map(|k| &k.0)
    }

    /// The largest value stored under a key.
    pub fn max_value(&self, key: &Identifier) -> Option<&Value> {
        self.entries.get(key)?.keys().next_back().map(|k| &k.0)
    }

    /// Clears a key's entries and refills them from an element scan.
    pub fn rebuild<I>(&mut self, key: &Identifier, elements: I) -> Result<()>
    where
        I: IntoIterator<Item = (Id, Vec<Value>)>,
    {
        if !self.entries.contains_key(key) {
            return Ok(());
        }
        self.entries.insert(key.clone(), BTreeMap::new());
        for (id, values) in elements {
            for value in values {
                self.insert(key, &value, id)?;
            }
        }
        Ok(())
    }
}
